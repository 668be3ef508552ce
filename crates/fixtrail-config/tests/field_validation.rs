//! Field validation tests for fixtrail-config.
// crates/fixtrail-config/tests/field_validation.rs
// =============================================================================
// Module: Config Field Validation Tests
// Description: Validate per-section constraints and cross-field rules.
// Purpose: Ensure invalid settings fail closed with actionable messages.
// =============================================================================

use std::path::PathBuf;

use fixtrail_config::ConfigError;
use fixtrail_config::EventSinkKind;
use fixtrail_config::FixtrailConfig;
use fixtrail_config::validate_device_id;
use fixtrail_config::validate_server_url;

type TestResult = Result<(), String>;

fn assert_invalid<T>(result: Result<T, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}

fn config_from_toml(toml_str: &str) -> Result<FixtrailConfig, String> {
    toml::from_str(toml_str).map_err(|err: toml::de::Error| err.to_string())
}

#[test]
fn defaults_are_valid() -> TestResult {
    let mut config = FixtrailConfig::default();
    config.validate().map_err(|err| err.to_string())
}

#[test]
fn blank_server_url_is_rejected() -> TestResult {
    let mut config = config_from_toml("[collector]\nserver_url = \"   \"\n")?;
    assert_invalid(config.validate(), "collector.server_url must be non-empty")
}

#[test]
fn non_http_server_url_is_rejected() -> TestResult {
    assert_invalid(validate_server_url("ftp://collector"), "unsupported scheme")
}

#[test]
fn malformed_server_url_is_rejected() -> TestResult {
    assert_invalid(validate_server_url("192.168.1.100:5000"), "collector.server_url")
}

#[test]
fn device_id_must_not_be_blank() -> TestResult {
    let mut config = config_from_toml("[collector]\ndevice_id = \"\"\n")?;
    assert_invalid(config.validate(), "collector.device_id must be non-empty")
}

#[test]
fn device_id_rejects_control_characters() -> TestResult {
    assert_invalid(validate_device_id("abc\u{7}"), "control characters")
}

#[test]
fn device_id_rejects_overlong_values() -> TestResult {
    assert_invalid(validate_device_id(&"d".repeat(257)), "collector.device_id exceeds max length")
}

#[test]
fn sampling_rejects_zero_interval() -> TestResult {
    let mut config = config_from_toml("[sampling]\ninterval_ms = 0\n")?;
    assert_invalid(config.validate(), "sampling intervals must be greater than zero")
}

#[test]
fn sampling_rejects_fastest_above_interval() -> TestResult {
    let mut config =
        config_from_toml("[sampling]\ninterval_ms = 10000\nfastest_interval_ms = 20000\n")?;
    assert_invalid(config.validate(), "must not exceed sampling.interval_ms")
}

#[test]
fn upload_interval_has_a_floor() -> TestResult {
    let mut config = config_from_toml("[upload]\ninterval_secs = 5\n")?;
    assert_invalid(config.validate(), "upload.interval_secs must be at least 10")
}

#[test]
fn store_path_must_not_be_blank() -> TestResult {
    let mut config = FixtrailConfig::default();
    config.store.path = PathBuf::from("  ");
    assert_invalid(config.validate(), "store.path must be non-empty")
}

#[test]
fn store_busy_timeout_has_a_ceiling() -> TestResult {
    let mut config = config_from_toml("[store]\nbusy_timeout_ms = 900000\n")?;
    assert_invalid(config.validate(), "store.busy_timeout_ms must be at most")
}

#[test]
fn file_events_sink_requires_path() -> TestResult {
    let mut config = FixtrailConfig::default();
    config.events.sink = EventSinkKind::File;
    assert_invalid(config.validate(), "file events sink requires path")
}

#[test]
fn stderr_events_sink_rejects_path() -> TestResult {
    let mut config = config_from_toml("[events]\nsink = \"stderr\"\npath = \"events.jsonl\"\n")?;
    assert_invalid(config.validate(), "events.path is only valid for the file sink")
}
