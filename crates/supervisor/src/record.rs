use std::fmt;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;

use tokio::process::Child;
use warden_core::{ChannelEndpoint, WorkerConfig, WorkerId, WorkerStatus};

/// How a worker process ended, as observed when it was reaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    Exited(i32),
    Signaled(i32),
    Unknown,
}

impl From<ExitStatus> for ExitOutcome {
    fn from(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            ExitOutcome::Exited(code)
        } else if let Some(signal) = status.signal() {
            ExitOutcome::Signaled(signal)
        } else {
            ExitOutcome::Unknown
        }
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitOutcome::Exited(code) => write!(f, "exited with code {code}"),
            ExitOutcome::Signaled(signal) => write!(f, "terminated by signal {signal}"),
            ExitOutcome::Unknown => write!(f, "exit status unknown"),
        }
    }
}

/// A spawned worker as the supervisor sees it.
#[derive(Debug)]
pub struct WorkerRecord {
    pub(crate) id: WorkerId,
    pub(crate) config: WorkerConfig,
    pub(crate) pid: Option<u32>,
    pub(crate) child: Child,
    pub(crate) channel: ChannelEndpoint,
    pub(crate) status: WorkerStatus,
}

impl WorkerRecord {
    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Last status observed by a poll.
    pub fn status(&self) -> WorkerStatus {
        self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_outcome_from_status() {
        // raw wait statuses: exit code in the high byte, signal in the low bits
        assert_eq!(ExitOutcome::from(ExitStatus::from_raw(0)), ExitOutcome::Exited(0));
        assert_eq!(
            ExitOutcome::from(ExitStatus::from_raw(3 << 8)),
            ExitOutcome::Exited(3)
        );
        assert_eq!(
            ExitOutcome::from(ExitStatus::from_raw(15)),
            ExitOutcome::Signaled(15)
        );
    }

    #[test]
    fn test_exit_outcome_display() {
        assert_eq!(ExitOutcome::Exited(0).to_string(), "exited with code 0");
        assert_eq!(
            ExitOutcome::Signaled(9).to_string(),
            "terminated by signal 9"
        );
    }
}
