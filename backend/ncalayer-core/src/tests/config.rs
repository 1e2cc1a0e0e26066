use crate::config::ClientConfig;
use crate::error::ConfigError;

use std::time::Duration;

/// **VALUE**: Verifies defaults point at the local agent and HTTP API ports.
#[test]
fn given_default_config_when_inspected_then_local_endpoints() {
    let config = ClientConfig::default();

    assert_eq!(config.ncalayer_url, "wss://127.0.0.1:13579");
    assert_eq!(config.kmd_http_api_url, "https://127.0.0.1:24680/");
    assert!(config.allow_kmd_http_api);
    assert_eq!(config.default_locale, "ru");
    assert_eq!(config.sidecar_probe_timeout(), Duration::from_secs(3));
    assert!(config.validate().is_ok());
}

/// **VALUE**: Verifies a missing config file falls back to defaults.
///
/// **WHY THIS MATTERS**: First run has no file; that must not be an error.
#[test]
fn given_no_config_file_when_load_then_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");

    let config = ClientConfig::load(dir.path()).expect("load should succeed");

    assert_eq!(config, ClientConfig::default());
}

/// **VALUE**: Verifies a saved config loads back identically and no temp file is left.
#[test]
fn given_saved_config_when_load_then_same_values() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = ClientConfig {
        ncalayer_url: "ws://127.0.0.1:14000".to_string(),
        allow_kmd_http_api: false,
        default_locale: "kk".to_string(),
        ..ClientConfig::default()
    };

    config.save(dir.path()).expect("save should succeed");
    let loaded = ClientConfig::load(dir.path()).expect("load should succeed");

    assert_eq!(loaded, config);
    assert!(!dir.path().join("ncalayer.json.tmp").exists());
}

/// **VALUE**: Verifies fields missing from an older file take their defaults.
#[test]
fn given_partial_config_file_when_load_then_missing_fields_defaulted() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(
        dir.path().join("ncalayer.json"),
        r#"{"allow_kmd_http_api": false}"#,
    )
    .expect("write config");

    let config = ClientConfig::load(dir.path()).expect("load should succeed");

    assert!(!config.allow_kmd_http_api);
    assert_eq!(config.ncalayer_url, "wss://127.0.0.1:13579");
}

/// **BUG THIS CATCHES**: Would catch a corrupted file being silently replaced by defaults.
#[test]
fn given_corrupted_config_file_when_load_then_parse_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("ncalayer.json"), "{ not json").expect("write config");

    let err = ClientConfig::load(dir.path()).expect_err("corrupted file");

    assert!(matches!(err, ConfigError::ParseError { .. }));
}

/// **VALUE**: Verifies config errors point at the config code that raised them.
///
/// **BUG THIS CATCHES**: Would catch the location being taken inside the shared
/// location helper instead of at the failing read/parse step.
#[test]
fn given_corrupted_config_file_when_load_then_error_location_in_config_module() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("ncalayer.json"), "{ not json").expect("write config");

    let err = ClientConfig::load(dir.path()).expect_err("corrupted file");

    let ConfigError::ParseError { location, .. } = err else {
        panic!("expected ParseError, got {err:?}");
    };
    assert!(
        location.file.replace('\\', "/").ends_with("config/mod.rs"),
        "location should be in the config module: {location}"
    );
    assert!(location.line > 0);
}

/// **VALUE**: Verifies each invalid value is rejected by validation.
///
/// **WHY THIS MATTERS**: Operation ids are appended to the HTTP API base URL as-is,
/// so a base URL without the trailing slash runs the id into its last path segment.
#[test]
fn given_invalid_values_when_validate_then_validation_error() {
    let invalid = [
        ClientConfig {
            version: 0,
            ..ClientConfig::default()
        },
        ClientConfig {
            ncalayer_url: "https://127.0.0.1:13579".to_string(),
            ..ClientConfig::default()
        },
        ClientConfig {
            ncalayer_url: "not a url".to_string(),
            ..ClientConfig::default()
        },
        ClientConfig {
            kmd_http_api_url: "https://127.0.0.1:24680/api".to_string(),
            ..ClientConfig::default()
        },
        ClientConfig {
            kmd_http_api_url: "ws://127.0.0.1:24680/".to_string(),
            ..ClientConfig::default()
        },
        ClientConfig {
            default_locale: "  ".to_string(),
            ..ClientConfig::default()
        },
        ClientConfig {
            sidecar_probe_timeout_ms: 0,
            ..ClientConfig::default()
        },
    ];

    for config in invalid {
        let err = config.validate().expect_err("config should be invalid");
        assert!(
            matches!(err, ConfigError::ValidationError { .. }),
            "expected ValidationError for {config:?}, got {err:?}"
        );
    }
}
