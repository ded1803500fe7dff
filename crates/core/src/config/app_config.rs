use std::path::Path;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use super::settings::{ControlPlaneSettings, LogSettings, SupervisorSettings};
use super::validation::ConfigValidator;
use crate::errors::{WardenError, WardenResult};

/// Settings built once at startup and handed to every component by value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub supervisor: SupervisorSettings,
    pub control_plane: ControlPlaneSettings,
    pub logging: LogSettings,
}

impl AppConfig {
    /// Defaults, then the optional TOML file, then `WARDEN_*` environment
    /// variables (`WARDEN_SUPERVISOR__CAPACITY=8`).
    pub fn load(config_path: Option<&Path>) -> WardenResult<Self> {
        let defaults = AppConfig::default();
        let mut builder = ConfigBuilder::builder()
            .set_default("supervisor.capacity", defaults.supervisor.capacity as u64)?
            .set_default(
                "supervisor.tick_interval_ms",
                defaults.supervisor.tick_interval_ms,
            )?
            .set_default(
                "supervisor.poll_timeout_ms",
                defaults.supervisor.poll_timeout_ms,
            )?
            .set_default(
                "supervisor.master_log",
                defaults.supervisor.master_log.to_string_lossy().into_owned(),
            )?
            .set_default("supervisor.confirm_quit", defaults.supervisor.confirm_quit)?
            .set_default("control_plane.port", defaults.control_plane.port as u64)?
            .set_default(
                "control_plane.receive_timeout_ms",
                defaults.control_plane.receive_timeout_ms,
            )?
            .set_default(
                "control_plane.connect_timeout_ms",
                defaults.control_plane.connect_timeout_ms,
            )?
            .set_default("logging.level", defaults.logging.level.to_string())?
            .set_default("logging.format", "pretty")?;

        if let Some(path) = config_path {
            if !path.exists() {
                return Err(WardenError::settings(format!(
                    "configuration file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix("WARDEN")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(toml_str: &str) -> WardenResult<Self> {
        let config: AppConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> WardenResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl ConfigValidator for AppConfig {
    fn validate(&self) -> WardenResult<()> {
        self.supervisor.validate()?;
        self.control_plane.validate()?;
        Ok(())
    }
}
