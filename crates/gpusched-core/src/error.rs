//! Error types for gpusched

use thiserror::Error;

/// Main error type for gpusched
#[derive(Error, Debug)]
pub enum SchedError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Device not present in the slot table
    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    /// Release on a device with no running jobs
    #[error("Slot underflow on device {0}: no running job to release")]
    SlotUnderflow(String),

    /// Command could not be spawned
    #[error("Launch error: {0}")]
    Launch(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for gpusched operations
pub type SchedResult<T> = Result<T, SchedError>;

impl From<toml::de::Error> for SchedError {
    fn from(err: toml::de::Error) -> Self {
        SchedError::Config(err.to_string())
    }
}
