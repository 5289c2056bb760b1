// Unit tests for config loading: defaults, partial files and parse errors.

use crate::config::HubConfig;
use crate::error::config::ConfigError;

use std::time::Duration;

#[test]
fn given_no_overrides_then_defaults_apply() {
    let config = HubConfig::default();

    assert_eq!(config.ipc_port, 4920);
    assert_eq!(config.shutdown_timeout(), Duration::from_secs(10));
    assert_eq!(config.request_timeout(), Duration::from_secs(30));
    assert!(config.log_dir.is_none());
}

#[test]
fn given_partial_file_when_loaded_then_missing_fields_default() {
    let dir = std::env::temp_dir().join("switchboard-test-config-1");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("hub.toml");
    std::fs::write(&path, "ipc_port = 5001\nshutdown_timeout_secs = 3\n").unwrap();

    let config = HubConfig::load_from(&path).unwrap();

    assert_eq!(config.ipc_port, 5001);
    assert_eq!(config.shutdown_timeout(), Duration::from_secs(3));
    assert_eq!(
        config.request_timeout(),
        Duration::from_secs(30),
        "Unset fields must fall back to defaults"
    );

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn given_invalid_toml_when_loaded_then_parse_error() {
    let dir = std::env::temp_dir().join("switchboard-test-config-2");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("hub.toml");
    std::fs::write(&path, "ipc_port = [not toml").unwrap();

    let result = HubConfig::load_from(&path);

    assert!(matches!(result, Err(ConfigError::ParseError { .. })));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn given_missing_file_when_loaded_then_read_error() {
    let path = std::env::temp_dir().join("switchboard-test-config-none/hub.toml");

    let result = HubConfig::load_from(&path);

    assert!(matches!(result, Err(ConfigError::ReadError { .. })));
}
