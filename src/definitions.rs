//! Worker definitions from the command line and from definitions files.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::warn;
use warden_core::{parse_sensor_address, SensorKind, WorkerConfig, DEFAULT_MEASUREMENT_LOG};

use crate::cli::DefinitionArgs;

#[derive(Debug, Parser)]
#[command(no_binary_name = true, disable_help_flag = true, disable_version_flag = true)]
struct DefinitionLine {
    #[command(flatten)]
    args: DefinitionArgs,
}

/// Build a configuration from one definition. A definition needs a known
/// sensor type and a well-formed address; other values fall back to
/// defaults with a warning.
pub fn build_definition(args: &DefinitionArgs) -> Option<WorkerConfig> {
    let kind = match args.sensor_type.as_deref() {
        Some(raw) => match raw.parse::<SensorKind>() {
            Ok(kind) => kind,
            Err(e) => {
                warn!("{e}");
                return None;
            }
        },
        None => {
            warn!("Definition without --sensor-type ignored");
            return None;
        }
    };
    let address = match args.sensor_address.as_deref() {
        Some(raw) => match parse_sensor_address(raw) {
            Ok(address) => address,
            Err(e) => {
                warn!("{e}");
                return None;
            }
        },
        None => {
            warn!("Definition without --sensor-address ignored");
            return None;
        }
    };

    let log_path = args
        .measurement_log
        .clone()
        .unwrap_or_else(|| DEFAULT_MEASUREMENT_LOG.into());

    let echo = match args.echo.as_deref() {
        None | Some("off") => false,
        Some("on") => true,
        Some(other) => {
            warn!("Invalid echo value {other:?}, echo is off");
            false
        }
    };

    let interval = match args.interval.as_deref() {
        None => 1,
        Some(raw) => match raw.trim().parse::<i64>() {
            Ok(n) => {
                if n <= 0 {
                    warn!("Interval cannot be 0 or negative, using 1");
                }
                n
            }
            Err(_) => {
                warn!("Invalid interval {raw:?}, using 1");
                1
            }
        },
    };

    Some(WorkerConfig::new(kind, address, log_path, echo, interval))
}

/// Parse one line of a definitions file. Blank lines, comments and lines
/// that do not form a valid definition yield `None`.
pub fn parse_definition_line(line: &str) -> Option<WorkerConfig> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    match DefinitionLine::try_parse_from(line.split_whitespace()) {
        Ok(parsed) => build_definition(&parsed.args),
        Err(e) => {
            warn!("Ignoring definition {line:?}: {}", e.kind());
            None
        }
    }
}

/// Read up to `limit` definitions from `path`.
pub fn read_definitions_file(path: &Path, limit: usize) -> Result<Vec<WorkerConfig>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read definitions file {}", path.display()))?;

    let mut configs = Vec::new();
    for line in content.lines() {
        let Some(config) = parse_definition_line(line) else {
            continue;
        };
        if configs.len() == limit {
            warn!(
                "{} holds more than {limit} definitions, the rest are ignored",
                path.display()
            );
            break;
        }
        configs.push(config);
    }
    Ok(configs)
}

/// All definitions given at startup: the command-line one first, then the
/// file's, at most `capacity` in total.
pub fn collect_definitions(
    args: &DefinitionArgs,
    file: Option<&Path>,
    capacity: usize,
) -> Result<Vec<WorkerConfig>> {
    let mut configs = Vec::new();
    if !args.is_empty() {
        configs.extend(build_definition(args));
    }
    if let Some(path) = file {
        let remaining = capacity.saturating_sub(configs.len());
        configs.extend(read_definitions_file(path, remaining)?);
    }
    if configs.len() > capacity {
        warn!("Only the first {capacity} definitions are used");
        configs.truncate(capacity);
    }
    Ok(configs)
}
