// Unit tests for config defaults, validation, and persistence.

use crate::config::ConnectionConfig;

#[test]
fn given_default_config_when_validated_then_ok() {
    let config = ConnectionConfig::default();

    assert!(config.validate().is_ok());
    assert_eq!(config.timing.poll_duration_secs, 300);
    assert_eq!(config.timing.poll_grace_secs, 5);
    assert_eq!(config.timing.idle_wait_secs, 60);
}

#[test]
fn given_empty_base_url_when_validated_then_error() {
    let config = ConnectionConfig::for_server("");

    assert!(config.validate().is_err());
}

#[test]
fn given_non_http_base_url_when_validated_then_error() {
    let config = ConnectionConfig::for_server("ftp://127.0.0.1/");

    assert!(config.validate().is_err());
}

#[test]
fn given_zero_poll_duration_when_validated_then_error() {
    let mut config = ConnectionConfig::default();
    config.timing.poll_duration_secs = 0;

    assert!(config.validate().is_err());
}

/// **VALUE**: Verifies partial config files pick up defaults for the timing
/// knobs they omit.
///
/// **WHY THIS MATTERS**: Users hand-edit this file to point at their server;
/// forcing them to spell out every timing constant would break upgrades that
/// introduce new knobs.
#[test]
fn given_partial_json_when_parsed_then_missing_timings_default() {
    // GIVEN: A config that only names the server
    let json = r#"{"base_url": "https://backup.example:8200"}"#;

    // WHEN: Parsing
    let config: ConnectionConfig = serde_json::from_str(json).unwrap();

    // THEN: Every timing knob has its default
    assert_eq!(config.base_url, "https://backup.example:8200");
    assert_eq!(config.timing.poll_duration_secs, 300);
    assert_eq!(config.timing.shutdown_grace_secs, 10);
    assert_eq!(config.timing.request_timeout_secs, 30);
}

#[test]
fn given_missing_file_when_loaded_then_defaults_returned() {
    let dir = tempfile::tempdir().unwrap();

    let config = ConnectionConfig::load(dir.path()).unwrap();

    assert_eq!(config.base_url, ConnectionConfig::default().base_url);
}

#[test]
fn given_saved_config_when_reloaded_then_round_trips() {
    let dir = tempfile::tempdir().unwrap();

    let mut config = ConnectionConfig::for_server("http://10.0.0.5:8200");
    config.timing.idle_wait_secs = 120;
    config.save(dir.path()).unwrap();

    let loaded = ConnectionConfig::load(dir.path()).unwrap();
    assert_eq!(loaded.base_url, "http://10.0.0.5:8200");
    assert_eq!(loaded.timing.idle_wait_secs, 120);
}

#[test]
fn given_corrupted_file_when_loaded_then_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("monitor.json"), "{not json").unwrap();

    assert!(ConnectionConfig::load(dir.path()).is_err());
}
