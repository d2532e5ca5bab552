use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use maze_nest_runtime::config::{ControllerConfig, ROBOT_PORT};
use maze_nest_runtime::runtime::{self, RunOptions};

/// Explore a 4x4 maze, map it and settle in the nest
#[derive(Parser, Debug)]
#[command(name = "maze-nest-runtime")]
struct Args {
    /// JSON file overriding controller thresholds
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run against the built-in simulated maze instead of the robot
    #[arg(long)]
    simulate: bool,

    /// Serial port of the robot's motion board
    #[arg(short, long, default_value = ROBOT_PORT)]
    port: String,

    /// Give up after this many control cycles
    #[arg(long)]
    max_cycles: Option<u64>,

    /// Skip the zenoh telemetry publisher
    #[arg(long)]
    no_publish: bool,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match ControllerConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Config error: {}", e);
                std::process::exit(1);
            }
        },
        None => ControllerConfig::default(),
    };
    if args.max_cycles.is_some() {
        config.max_cycles = args.max_cycles;
    }

    let options = RunOptions {
        config,
        simulate: args.simulate,
        port: args.port,
        publish: !args.no_publish,
    };

    if let Err(e) = runtime::run(options).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
