use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier assigned to a worker when its configuration is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WorkerId(u32);

impl WorkerId {
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

/// Observed by the supervisor once per poll; `Unknown` covers a missing
/// reply as well as a reply carrying a code outside the defined set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerStatus {
    Starting,
    Running,
    Error,
    Unknown,
}

impl WorkerStatus {
    const STARTING: u8 = 0;
    const RUNNING: u8 = 1;
    const ERROR: u8 = 2;
    const UNKNOWN: u8 = 0xFF;

    /// Wire code carried in a status reply frame.
    pub fn code(self) -> u8 {
        match self {
            WorkerStatus::Starting => Self::STARTING,
            WorkerStatus::Running => Self::RUNNING,
            WorkerStatus::Error => Self::ERROR,
            WorkerStatus::Unknown => Self::UNKNOWN,
        }
    }

    pub fn from_code(code: u8) -> Self {
        match code {
            Self::STARTING => WorkerStatus::Starting,
            Self::RUNNING => WorkerStatus::Running,
            Self::ERROR => WorkerStatus::Error,
            _ => WorkerStatus::Unknown,
        }
    }

    pub fn is_healthy(self) -> bool {
        matches!(self, WorkerStatus::Starting | WorkerStatus::Running)
    }
}

impl fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerStatus::Starting => write!(f, "Starting"),
            WorkerStatus::Running => write!(f, "Running"),
            WorkerStatus::Error => write!(f, "Error"),
            WorkerStatus::Unknown => write!(f, "Unknown"),
        }
    }
}
