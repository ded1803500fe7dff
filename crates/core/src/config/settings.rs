use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::validation::{ConfigValidator, ValidationUtils};
use crate::errors::{WardenError, WardenResult};

pub const DEFAULT_MASTER_LOG: &str = "warden.log";
pub const DEFAULT_CONTROL_PORT: u16 = 4950;
pub const DEFAULT_CAPACITY: usize = 16;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SupervisorSettings {
    /// Maximum number of workers, fixed for the lifetime of the supervisor.
    pub capacity: usize,
    pub tick_interval_ms: u64,
    /// Upper bound on waiting for one worker's status reply.
    pub poll_timeout_ms: u64,
    pub master_log: PathBuf,
    /// Ask the operator before acting on an interrupt.
    pub confirm_quit: bool,
}

impl SupervisorSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            tick_interval_ms: 1000,
            poll_timeout_ms: 500,
            master_log: PathBuf::from(DEFAULT_MASTER_LOG),
            confirm_quit: true,
        }
    }
}

impl ConfigValidator for SupervisorSettings {
    fn validate(&self) -> WardenResult<()> {
        ValidationUtils::validate_count(self.capacity, "supervisor.capacity", 1024)?;
        ValidationUtils::validate_millis(
            self.tick_interval_ms,
            "supervisor.tick_interval_ms",
            10,
            60_000,
        )?;
        ValidationUtils::validate_millis(
            self.poll_timeout_ms,
            "supervisor.poll_timeout_ms",
            1,
            self.tick_interval_ms,
        )?;
        ValidationUtils::validate_not_empty(
            &self.master_log.to_string_lossy(),
            "supervisor.master_log",
        )?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ControlPlaneSettings {
    pub port: u16,
    /// Listen on this address only; otherwise every available family.
    pub bind_address: Option<IpAddr>,
    pub receive_timeout_ms: u64,
    pub connect_timeout_ms: u64,
}

impl ControlPlaneSettings {
    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for ControlPlaneSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_CONTROL_PORT,
            bind_address: None,
            receive_timeout_ms: 5000,
            connect_timeout_ms: 5000,
        }
    }
}

impl ConfigValidator for ControlPlaneSettings {
    fn validate(&self) -> WardenResult<()> {
        ValidationUtils::validate_port(self.port)?;
        ValidationUtils::validate_millis(
            self.receive_timeout_ms,
            "control_plane.receive_timeout_ms",
            1,
            600_000,
        )?;
        ValidationUtils::validate_millis(
            self.connect_timeout_ms,
            "control_plane.connect_timeout_ms",
            1,
            600_000,
        )?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl std::str::FromStr for LogLevel {
    type Err = WardenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(WardenError::settings(format!(
                "Invalid log level: {s}. Valid levels: trace, debug, info, warn, error"
            ))),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = WardenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(WardenError::settings(format!(
                "Invalid log format: {s}. Valid formats: pretty, compact, json"
            ))),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Compact => write!(f, "compact"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogSettings {
    pub level: LogLevel,
    pub format: LogFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        assert!(SupervisorSettings::default().validate().is_ok());
        assert!(ControlPlaneSettings::default().validate().is_ok());
    }

    #[test]
    fn test_poll_timeout_cannot_exceed_tick() {
        let settings = SupervisorSettings {
            tick_interval_ms: 200,
            poll_timeout_ms: 300,
            ..SupervisorSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let settings = SupervisorSettings {
            capacity: 0,
            ..SupervisorSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("WARN".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("verbose".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::Debug.to_string(), "debug");
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
    }
}
