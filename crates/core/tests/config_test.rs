use std::env;
use std::fs;
use std::net::{IpAddr, Ipv4Addr};

use warden_core::config::*;

#[test]
fn test_default_config() {
    let config = AppConfig::default();
    assert!(config.validate().is_ok());

    assert_eq!(config.supervisor.capacity, DEFAULT_CAPACITY);
    assert_eq!(config.supervisor.tick_interval_ms, 1000);
    assert_eq!(config.control_plane.port, DEFAULT_CONTROL_PORT);
    assert!(config.control_plane.bind_address.is_none());
    assert_eq!(config.logging.format, LogFormat::Pretty);
}

#[test]
fn test_partial_toml_keeps_other_defaults() {
    let toml_content = r#"
[supervisor]
capacity = 5
master_log = "/tmp/warden-test.log"

[control_plane]
bind_address = "127.0.0.1"

[logging]
level = "debug"
format = "json"
"#;
    let config = AppConfig::from_toml(toml_content).unwrap();
    assert_eq!(config.supervisor.capacity, 5);
    assert_eq!(config.supervisor.poll_timeout_ms, 500);
    assert_eq!(
        config.control_plane.bind_address,
        Some(IpAddr::V4(Ipv4Addr::LOCALHOST))
    );
    assert_eq!(config.control_plane.port, 4950);
    assert_eq!(config.logging.level, LogLevel::Debug);
    assert_eq!(config.logging.format, LogFormat::Json);
}

#[test]
fn test_environment_overrides_file() {
    let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    fs::write(file.path(), "[supervisor]\ncapacity = 3\nconfirm_quit = true\n").unwrap();

    env::set_var("WARDEN_SUPERVISOR__CONFIRM_QUIT", "false");
    let config = AppConfig::load(Some(file.path()));
    env::remove_var("WARDEN_SUPERVISOR__CONFIRM_QUIT");

    let config = config.unwrap();
    assert_eq!(config.supervisor.capacity, 3);
    assert!(!config.supervisor.confirm_quit);
}

#[test]
fn test_invalid_file_values_fail_validation() {
    let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    fs::write(file.path(), "[supervisor]\ncapacity = 0\n").unwrap();
    assert!(AppConfig::load(Some(file.path())).is_err());
}
