//! Config environment variable tests
//!
//! These tests verify that Config::from_env() correctly reads and applies
//! environment variable overrides. Config::from_env() also loads a .env file
//! via dotenvy when present, so every test sets the variables it asserts on.
//!
//! Tests use #[serial] to prevent race conditions with shared env vars.

use breach_investigator::config::{Config, LogFormat};
use serial_test::serial;
use std::env;

fn with_api_key() {
    env::set_var("LANGBASE_API_KEY", "test-key");
}

#[test]
#[serial]
fn test_config_from_env_requires_api_key() {
    let saved = env::var("LANGBASE_API_KEY").ok();
    env::remove_var("LANGBASE_API_KEY");

    // A .env file may still provide the key; only assert the error shape.
    if let Err(e) = Config::from_env() {
        assert!(e.to_string().contains("LANGBASE_API_KEY"));
    }

    if let Some(key) = saved {
        env::set_var("LANGBASE_API_KEY", key);
    }
}

#[test]
#[serial]
fn test_config_from_env_custom_base_url() {
    with_api_key();
    env::set_var("LANGBASE_BASE_URL", "https://custom.api.com");

    let config = Config::from_env().unwrap();
    assert_eq!(config.langbase.base_url, "https://custom.api.com");
    assert_eq!(config.langbase.api_key, "test-key");

    env::remove_var("LANGBASE_BASE_URL");
}

#[test]
#[serial]
fn test_config_from_env_custom_database() {
    with_api_key();
    env::set_var("DATABASE_PATH", "/custom/investigations.db");
    env::set_var("DATABASE_MAX_CONNECTIONS", "10");

    let config = Config::from_env().unwrap();
    assert_eq!(
        config.database.path.to_str().unwrap(),
        "/custom/investigations.db"
    );
    assert_eq!(config.database.max_connections, 10);

    env::remove_var("DATABASE_PATH");
    env::remove_var("DATABASE_MAX_CONNECTIONS");
}

#[test]
#[serial]
fn test_config_from_env_json_log_format() {
    with_api_key();
    env::set_var("LOG_FORMAT", "JSON");

    let config = Config::from_env().unwrap();
    assert_eq!(config.logging.format, LogFormat::Json);

    env::set_var("LOG_FORMAT", "anything-else");
    let config = Config::from_env().unwrap();
    assert_eq!(config.logging.format, LogFormat::Pretty);

    env::remove_var("LOG_FORMAT");
}

#[test]
#[serial]
fn test_config_from_env_request_settings() {
    with_api_key();
    env::set_var("REQUEST_TIMEOUT_MS", "5000");
    env::set_var("MAX_RETRIES", "1");
    env::set_var("RETRY_DELAY_MS", "not-a-number");

    let config = Config::from_env().unwrap();
    assert_eq!(config.request.timeout_ms, 5000);
    assert_eq!(config.request.max_retries, 1);
    assert_eq!(config.request.retry_delay_ms, 1000);

    env::remove_var("REQUEST_TIMEOUT_MS");
    env::remove_var("MAX_RETRIES");
    env::remove_var("RETRY_DELAY_MS");
}

#[test]
#[serial]
fn test_config_from_env_pipes() {
    with_api_key();
    env::set_var("PIPE_HYPOTHESIS", "custom-hypothesis");
    env::set_var("PIPE_REPORT", "custom-report");
    env::set_var("PIPE_RECOMMENDATIONS", "custom-recommendations");

    let config = Config::from_env().unwrap();
    assert_eq!(config.pipes.hypothesis, "custom-hypothesis");
    assert_eq!(config.pipes.report, "custom-report");
    assert_eq!(config.pipes.recommendations, "custom-recommendations");

    env::remove_var("PIPE_HYPOTHESIS");
    env::remove_var("PIPE_REPORT");
    env::remove_var("PIPE_RECOMMENDATIONS");
}

#[test]
#[serial]
fn test_config_from_env_nvd_and_investigation() {
    with_api_key();
    env::set_var("NVD_BASE_URL", "http://localhost:9999/cves");
    env::set_var("NVD_API_KEY", "nvd-key");
    env::set_var("NVD_RATE_LIMIT_MS", "0");
    env::set_var("NVD_MAX_RESULTS", "2");
    env::set_var("INVESTIGATION_FAN_OUT", "4");
    env::set_var("KEYWORD_LIMIT", "6");

    let config = Config::from_env().unwrap();
    assert_eq!(config.nvd.base_url, "http://localhost:9999/cves");
    assert_eq!(config.nvd.api_key.as_deref(), Some("nvd-key"));
    assert_eq!(config.nvd.rate_limit_ms, 0);
    assert_eq!(config.nvd.max_results, 2);
    assert_eq!(config.investigation.fan_out, 4);
    assert_eq!(config.investigation.keyword_limit, 6);

    for var in [
        "NVD_BASE_URL",
        "NVD_API_KEY",
        "NVD_RATE_LIMIT_MS",
        "NVD_MAX_RESULTS",
        "INVESTIGATION_FAN_OUT",
        "KEYWORD_LIMIT",
    ] {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_config_from_env_blank_nvd_key_is_none() {
    with_api_key();
    env::set_var("NVD_API_KEY", "   ");

    let config = Config::from_env().unwrap();
    assert!(config.nvd.api_key.is_none());

    env::remove_var("NVD_API_KEY");
}
