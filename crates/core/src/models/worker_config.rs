use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::errors::{WardenError, WardenResult};

/// Measurement log used when a definition does not name one.
pub const DEFAULT_MEASUREMENT_LOG: &str = "measurement.txt";

/// Kind of sensor a worker drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    Ntc,
    Scc,
}

impl SensorKind {
    pub fn code(self) -> u8 {
        match self {
            SensorKind::Ntc => 1,
            SensorKind::Scc => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(SensorKind::Ntc),
            2 => Some(SensorKind::Scc),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SensorKind::Ntc => "NTC",
            SensorKind::Scc => "SCC",
        }
    }
}

impl FromStr for SensorKind {
    type Err = WardenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NTC" => Ok(SensorKind::Ntc),
            "SCC" | "SCC30" => Ok(SensorKind::Scc),
            _ => Err(WardenError::config(format!("unknown sensor type: {s}"))),
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a bus address written as `0x` followed by one or two hex digits.
pub fn parse_sensor_address(raw: &str) -> WardenResult<u8> {
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .ok_or_else(|| WardenError::config(format!("sensor address must start with 0x: {raw}")))?;

    if digits.is_empty() || digits.len() > 2 {
        return Err(WardenError::config(format!("malformed sensor address: {raw}")));
    }

    u8::from_str_radix(digits, 16)
        .map_err(|e| WardenError::config(format!("malformed sensor address {raw}: {e}")))
}

/// Immutable description of one measurement worker.
///
/// The interval is expressed in scheduler ticks and is always at least 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    kind: SensorKind,
    address: u8,
    log_path: PathBuf,
    echo: bool,
    interval: u32,
}

impl WorkerConfig {
    pub fn new(
        kind: SensorKind,
        address: u8,
        log_path: impl Into<PathBuf>,
        echo: bool,
        interval: i64,
    ) -> Self {
        Self {
            kind,
            address,
            log_path: log_path.into(),
            echo,
            interval: Self::effective_interval(interval),
        }
    }

    /// Non-positive intervals become 1; oversized ones saturate.
    pub fn effective_interval(requested: i64) -> u32 {
        if requested <= 0 {
            1
        } else {
            u32::try_from(requested).unwrap_or(u32::MAX)
        }
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn echo(&self) -> bool {
        self.echo
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }
}

impl fmt::Display for WorkerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ 0x{:02X} -> {} (echo {}, every {} ticks)",
            self.kind,
            self.address,
            self.log_path.display(),
            if self.echo { "on" } else { "off" },
            self.interval
        )
    }
}
