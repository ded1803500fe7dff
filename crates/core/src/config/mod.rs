//! Supervisor settings: defaults, TOML file and environment overrides.

pub mod app_config;
pub mod settings;
pub mod validation;

pub use app_config::AppConfig;
pub use settings::{
    ControlPlaneSettings, LogFormat, LogLevel, LogSettings, SupervisorSettings, DEFAULT_CAPACITY,
    DEFAULT_CONTROL_PORT, DEFAULT_MASTER_LOG,
};
pub use validation::{ConfigValidator, ValidationUtils};
