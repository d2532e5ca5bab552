// Crate-level error type

use crate::hardware::HardwareError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),

    #[error("Failed to read config {path}: {source}")]
    ConfigIo {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Exploration did not finish within {0} control cycles")]
    CycleBudgetExhausted(u64),

    #[error("Exploration cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;
