use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};
use warden_core::{
    parse_sensor_address, AppConfig, LogFormat, LogLevel, SensorKind, WardenResult,
    DEFAULT_MEASUREMENT_LOG,
};

/// Supervise long-running measurement workers, locally or over the network.
#[derive(Debug, Parser)]
#[command(
    name = "warden",
    version,
    disable_help_flag = true,
    after_help = "Without -a or -s the supervisor runs offline.\n\
Definitions files hold one worker per line using the worker flags above;\n\
lines starting with '#' are ignored. Sensor addresses are hexadecimal\n\
with a 0x prefix, e.g. 0xA8."
)]
pub struct Cli {
    /// Print usage and exit
    #[arg(short = 'h', long = "help")]
    pub help: bool,

    /// Master log file
    #[arg(short = 'l', long = "master-log", value_name = "FILE")]
    pub master_log: Option<PathBuf>,

    /// Send the worker definitions to the supervisor running at HOST[:PORT]
    #[arg(short = 'a', long = "address", value_name = "HOST", conflicts_with = "server")]
    pub address: Option<String>,

    /// Listen on the network for worker definitions
    #[arg(short = 's', long = "server")]
    pub server: bool,

    /// Read worker definitions from FILE
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    pub file: Option<PathBuf>,

    #[command(flatten)]
    pub definition: DefinitionArgs,

    /// TOML settings file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[arg(long, value_name = "LEVEL", value_parser = ["trace", "debug", "info", "warn", "error"])]
    pub log_level: Option<String>,

    #[arg(long, value_name = "FORMAT", value_parser = ["pretty", "compact", "json"])]
    pub log_format: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one measurement worker; started by the supervisor
    #[command(hide = true)]
    Worker(WorkerArgs),
}

/// One worker definition as written on the command line or in a
/// definitions file. Values are validated when the definition is built.
#[derive(Debug, Clone, Default, Args)]
pub struct DefinitionArgs {
    #[arg(long = "sensor-type", alias = "sensortype", value_name = "NTC|SCC")]
    pub sensor_type: Option<String>,

    #[arg(long = "sensor-address", alias = "sensoraddress", value_name = "0xNN")]
    pub sensor_address: Option<String>,

    #[arg(long = "measurement-log", alias = "mfile", value_name = "FILE")]
    pub measurement_log: Option<PathBuf>,

    #[arg(long, value_name = "on|off")]
    pub echo: Option<String>,

    /// Ticks between measurements
    #[arg(long, value_name = "TICKS", allow_hyphen_values = true)]
    pub interval: Option<String>,
}

impl DefinitionArgs {
    pub fn is_empty(&self) -> bool {
        self.sensor_type.is_none()
            && self.sensor_address.is_none()
            && self.measurement_log.is_none()
            && self.echo.is_none()
            && self.interval.is_none()
    }
}

#[derive(Debug, Clone, Args)]
pub struct WorkerArgs {
    #[arg(long)]
    pub sensor_type: SensorKind,

    #[arg(long, value_parser = address_arg)]
    pub sensor_address: u8,

    #[arg(long, default_value = DEFAULT_MEASUREMENT_LOG)]
    pub measurement_log: PathBuf,

    #[arg(long, default_value = "off", value_parser = ["on", "off"])]
    pub echo: String,

    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub interval: i64,

    #[arg(long, default_value_t = 1000)]
    pub tick_ms: u64,
}

fn address_arg(raw: &str) -> Result<u8, String> {
    parse_sensor_address(raw).map_err(|e| e.to_string())
}

/// Where worker definitions go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatingMode {
    Local,
    NetworkClient { target: String },
    NetworkServer,
}

impl Cli {
    pub fn mode(&self) -> OperatingMode {
        match (&self.address, self.server) {
            (Some(target), _) => OperatingMode::NetworkClient {
                target: target.clone(),
            },
            (None, true) => OperatingMode::NetworkServer,
            (None, false) => OperatingMode::Local,
        }
    }

    /// Command-line values win over the settings file and environment.
    pub fn apply_overrides(&self, config: &mut AppConfig) -> WardenResult<()> {
        if let Some(path) = &self.master_log {
            config.supervisor.master_log = path.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.parse::<LogLevel>()?;
        }
        if let Some(format) = &self.log_format {
            config.logging.format = format.parse::<LogFormat>()?;
        }
        Ok(())
    }

    pub fn usage() -> String {
        Cli::command().render_help().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_selection() {
        let cli = Cli::try_parse_from(["warden"]).unwrap();
        assert_eq!(cli.mode(), OperatingMode::Local);

        let cli = Cli::try_parse_from(["warden", "-s"]).unwrap();
        assert_eq!(cli.mode(), OperatingMode::NetworkServer);

        let cli = Cli::try_parse_from(["warden", "-a", "sensors.local"]).unwrap();
        assert_eq!(
            cli.mode(),
            OperatingMode::NetworkClient {
                target: "sensors.local".to_string()
            }
        );

        assert!(Cli::try_parse_from(["warden", "-a", "host", "-s"]).is_err());
    }

    #[test]
    fn test_help_flag_is_ours() {
        let cli = Cli::try_parse_from(["warden", "-h"]).unwrap();
        assert!(cli.help);
        assert!(Cli::usage().contains("--master-log"));
    }

    #[test]
    fn test_single_definition_flags() {
        let cli = Cli::try_parse_from([
            "warden",
            "--sensor-type",
            "NTC",
            "--sensoraddress",
            "0x48",
            "--interval",
            "-3",
        ])
        .unwrap();
        assert_eq!(cli.definition.sensor_type.as_deref(), Some("NTC"));
        assert_eq!(cli.definition.sensor_address.as_deref(), Some("0x48"));
        assert_eq!(cli.definition.interval.as_deref(), Some("-3"));
        assert!(!cli.definition.is_empty());
    }

    #[test]
    fn test_worker_subcommand() {
        let cli = Cli::try_parse_from([
            "warden",
            "--log-level",
            "debug",
            "worker",
            "--sensor-type",
            "SCC30",
            "--sensor-address",
            "0x61",
            "--echo",
            "on",
            "--interval",
            "5",
            "--tick-ms",
            "100",
        ])
        .unwrap();
        let Some(Command::Worker(args)) = cli.command else {
            panic!("worker subcommand not parsed");
        };
        assert_eq!(args.sensor_type, SensorKind::Scc);
        assert_eq!(args.sensor_address, 0x61);
        assert_eq!(args.measurement_log, PathBuf::from(DEFAULT_MEASUREMENT_LOG));
        assert_eq!(args.interval, 5);
        assert_eq!(args.tick_ms, 100);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from([
            "warden",
            "-l",
            "/tmp/master.log",
            "--log-format",
            "json",
        ])
        .unwrap();
        let mut config = AppConfig::default();
        cli.apply_overrides(&mut config).unwrap();
        assert_eq!(config.supervisor.master_log, PathBuf::from("/tmp/master.log"));
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, LogLevel::Info);
    }
}
