// Exploration runtime: control thread plus telemetry publisher
// The controller owns all of its state and runs blocking on its own thread.
// The async side only ever sees copies of that state through a watch channel
// and publishes them over zenoh, with a watchdog flagging a stalled controller.
// Publishers are declared before the wheels turn, and a publishing failure
// cancels the controller so the robot is stopped before the error surfaces.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{info, warn};
use zenoh::pubsub::Publisher;

// local imports
use crate::config::{
    ControllerConfig, PUBLISH_HZ, STATUS_TIMEOUT, TOPIC_HEALTH, TOPIC_MAP, TOPIC_STATUS,
};
use crate::error::Result;
use crate::explore::{ExplorationController, GridPosition, Phase};
use crate::hardware::{Hardware, MazeSimulator, SerialRobot, SimMaze};
use crate::messages::{RuntimeHealth, Telemetry};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// How to run one exploration
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub config: ControllerConfig,
    /// Drive the built-in simulator instead of the serial robot
    pub simulate: bool,
    pub port: String,
    /// Publish telemetry over zenoh
    pub publish: bool,
}

/// Tracks how long ago the controller last made progress
pub struct StatusWatchdog {
    last_cycle: Option<u64>,
    updated_at: Instant,
    health: RuntimeHealth,
}

impl StatusWatchdog {
    pub fn new(now: Instant) -> Self {
        Self {
            last_cycle: None,
            updated_at: now,
            health: RuntimeHealth::Stalled, // Stalled until the first status
        }
    }

    /// Feed the latest cycle count seen on the watch channel
    pub fn observe(&mut self, cycle: Option<u64>, now: Instant) -> RuntimeHealth {
        if cycle.is_some() && cycle != self.last_cycle {
            self.last_cycle = cycle;
            self.updated_at = now;
        }

        let age = now.saturating_duration_since(self.updated_at);
        let health = if self.last_cycle.is_some() && age <= STATUS_TIMEOUT {
            RuntimeHealth::Ok
        } else {
            RuntimeHealth::Stalled
        };
        if health == RuntimeHealth::Stalled && self.health == RuntimeHealth::Ok {
            warn!("Controller stalled ({:?} since last cycle)", age);
        }
        self.health = health;
        health
    }

    pub fn health(&self) -> RuntimeHealth {
        self.health
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Topic {
    Status,
    Map,
    Health,
}

/// Destination for telemetry frames
trait TelemetrySink {
    async fn publish(&self, topic: Topic, payload: String) -> std::result::Result<(), BoxError>;
}

/// Zenoh session with one publisher per telemetry topic
struct ZenohTelemetry {
    _session: zenoh::Session,
    status: Publisher<'static>,
    map: Publisher<'static>,
    health: Publisher<'static>,
}

impl ZenohTelemetry {
    async fn open() -> std::result::Result<Self, BoxError> {
        info!("Opening Zenoh session...");
        let session = zenoh::open(zenoh::Config::default()).await?;

        info!("Setting up publishers...");
        let status = session.declare_publisher(TOPIC_STATUS).await?;
        let map = session.declare_publisher(TOPIC_MAP).await?;
        let health = session.declare_publisher(TOPIC_HEALTH).await?;
        info!("Publishing to: {}, {}, {}", TOPIC_STATUS, TOPIC_MAP, TOPIC_HEALTH);

        Ok(Self {
            _session: session,
            status,
            map,
            health,
        })
    }
}

impl TelemetrySink for ZenohTelemetry {
    async fn publish(&self, topic: Topic, payload: String) -> std::result::Result<(), BoxError> {
        let publisher = match topic {
            Topic::Status => &self.status,
            Topic::Map => &self.map,
            Topic::Health => &self.health,
        };
        publisher.put(payload).await?;
        Ok(())
    }
}

/// The simulated reference maze or the serial robot, as `options` ask
pub fn open_hardware(options: &RunOptions) -> Result<Box<dyn Hardware + Send>> {
    let config = &options.config;
    if options.simulate {
        info!("Using simulated reference maze");
        return Ok(Box::new(MazeSimulator::new(
            SimMaze::reference(),
            GridPosition::new(config.start_x, config.start_y),
            config.start_orientation,
        )));
    }

    info!("Opening robot on {}...", options.port);
    let mut robot = SerialRobot::new(&options.port)?;
    robot.initialize()?;
    Ok(Box::new(robot))
}

/// Run the controller to completion on a blocking thread. Every cycle
/// replaces the telemetry in `tx`; the final telemetry is returned. Setting
/// `cancel` stops the robot and ends the task with `Error::Cancelled`.
pub fn spawn_controller<F>(
    config: ControllerConfig,
    open: F,
    tx: watch::Sender<Option<Telemetry>>,
    cancel: Arc<AtomicBool>,
) -> JoinHandle<Result<Telemetry>>
where
    F: FnOnce() -> Result<Box<dyn Hardware + Send>> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut hw = open()?;
        let mut controller = ExplorationController::new(config);
        controller.run_until_cancelled(hw.as_mut(), &cancel, |c| {
            tx.send_replace(Some(Telemetry::from(c)));
        })?;
        Ok(Telemetry::from(&controller))
    })
}

pub async fn run(options: RunOptions) -> std::result::Result<(), BoxError> {
    let telemetry = if options.publish {
        let sink = ZenohTelemetry::open().await?;
        let config = options.config.clone();
        supervise(&sink, config, move || open_hardware(&options)).await?
    } else {
        let (tx, _rx) = watch::channel(None);
        let config = options.config.clone();
        let never = Arc::new(AtomicBool::new(false));
        spawn_controller(config, move || open_hardware(&options), tx, never).await??
    };

    info!(
        "Exploration finished: {:?}, {} cells, nest {}",
        telemetry.status.phase,
        telemetry.status.visited,
        telemetry
            .status
            .nest
            .map_or("not found".to_string(), |n| n.to_string())
    );
    info!("Final map:\n{}", telemetry.map);
    Ok(())
}

/// Run the controller while publishing its telemetry to `sink`. If
/// publishing fails, the controller is cancelled and joined before the
/// error is returned.
async fn supervise<S, F>(
    sink: &S,
    config: ControllerConfig,
    open: F,
) -> std::result::Result<Telemetry, BoxError>
where
    S: TelemetrySink,
    F: FnOnce() -> Result<Box<dyn Hardware + Send>> + Send + 'static,
{
    let (tx, rx) = watch::channel(None);
    let cancel = Arc::new(AtomicBool::new(false));
    let mut control = spawn_controller(config, open, tx, Arc::clone(&cancel));

    let result = publish_until_done(sink, rx, &mut control).await;
    if let Err(e) = &result {
        // A finished handle may already have been consumed by the select
        if !control.is_finished() {
            warn!("Telemetry failed ({}), stopping controller", e);
            cancel.store(true, Ordering::Release);
            match control.await {
                Ok(Err(end)) => info!("Controller ended: {}", end),
                Err(join) => warn!("Controller task failed: {}", join),
                Ok(Ok(_)) => {}
            }
        }
    }
    result
}

async fn publish_until_done<S: TelemetrySink>(
    sink: &S,
    mut rx: watch::Receiver<Option<Telemetry>>,
    control: &mut JoinHandle<Result<Telemetry>>,
) -> std::result::Result<Telemetry, BoxError> {
    let mut watchdog = StatusWatchdog::new(Instant::now());
    let mut tick = interval(Duration::from_millis(1000 / PUBLISH_HZ));
    // Map only goes out when it or the phase changed
    let mut last_map_key: Option<(u8, Phase)> = None;

    info!(
        "Publisher started: {}Hz, {}ms watchdog timeout",
        PUBLISH_HZ,
        STATUS_TIMEOUT.as_millis()
    );

    loop {
        tokio::select! {
            finished = &mut *control => {
                let telemetry = finished??;
                // One last frame so observers see the end state
                sink.publish(Topic::Status, serde_json::to_string(&telemetry.status)?).await?;
                sink.publish(Topic::Map, serde_json::to_string(&telemetry.map)?).await?;
                return Ok(telemetry);
            }
            _ = tick.tick() => {
                // 1. Copy out the latest telemetry, never holding the borrow
                let latest = *rx.borrow_and_update();

                // 2. Watchdog
                let health = watchdog.observe(latest.map(|t| t.status.cycle), Instant::now());

                // 3. Publish status and, when it moved on, the map
                if let Some(telemetry) = latest {
                    sink.publish(Topic::Status, serde_json::to_string(&telemetry.status)?).await?;

                    let key = (telemetry.status.visited, telemetry.status.phase);
                    if last_map_key != Some(key) {
                        sink.publish(Topic::Map, serde_json::to_string(&telemetry.map)?).await?;
                        last_map_key = Some(key);
                    }
                }

                // 4. Publish health
                sink.publish(Topic::Health, serde_json::to_string(&health)?).await?;
            }
        }
    }
}
