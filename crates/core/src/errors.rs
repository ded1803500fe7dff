use std::io;

use thiserror::Error;

/// Supervisor error taxonomy
#[derive(Debug, Error)]
pub enum WardenError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("worker table is full (capacity {capacity})")]
    Capacity { capacity: usize },

    #[error("failed to spawn worker: {0}")]
    Spawn(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("network error: {0}")]
    Network(String),

    #[error("control protocol error: {0}")]
    Protocol(String),

    #[error("worker {worker_id} did not answer the status request")]
    WorkerUnresponsive { worker_id: String },

    #[error("invalid settings: {0}")]
    Configuration(String),
}

impl WardenError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    pub fn spawn<S: Into<String>>(msg: S) -> Self {
        Self::Spawn(msg.into())
    }

    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::Network(msg.into())
    }

    pub fn protocol<S: Into<String>>(msg: S) -> Self {
        Self::Protocol(msg.into())
    }

    pub fn settings<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn unresponsive<S: Into<String>>(worker_id: S) -> Self {
        Self::WorkerUnresponsive {
            worker_id: worker_id.into(),
        }
    }

    /// Errors that must stop the supervisor rather than be logged and skipped.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            WardenError::Spawn(_) | WardenError::Network(_) | WardenError::Configuration(_)
        )
    }
}

impl From<config::ConfigError> for WardenError {
    fn from(err: config::ConfigError) -> Self {
        WardenError::Configuration(err.to_string())
    }
}

impl From<toml::de::Error> for WardenError {
    fn from(err: toml::de::Error) -> Self {
        WardenError::Configuration(err.to_string())
    }
}

impl From<toml::ser::Error> for WardenError {
    fn from(err: toml::ser::Error) -> Self {
        WardenError::Configuration(err.to_string())
    }
}

pub type WardenResult<T> = std::result::Result<T, WardenError>;
