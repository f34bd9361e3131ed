//! Integration tests for configuration loading and validation
//!
//! Note: Tests that modify environment variables should be run with --test-threads=1
//! to avoid interference between tests.

use secrecy::ExposeSecret;
use std::io::Write;
use std::sync::Mutex;
use tempfile::NamedTempFile;
use veil::anonymization::anonymizer::NormalizationRule;
use veil::anonymization::config::UnknownLabelPolicy;
use veil::anonymization::{AnonymizationEngine, EntityType};
use veil::config::{load_config, load_config_from_str};

// Mutex to serialize tests that modify environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Helper function to clean up environment variables
fn cleanup_env_vars() {
    for var in [
        "VEIL_APPLICATION_LOG_LEVEL",
        "VEIL_ANONYMIZATION_PATTERN_LIBRARY",
        "VEIL_CONTEXTUAL_ENABLED",
        "VEIL_CONTEXTUAL_ENDPOINT",
        "VEIL_CONTEXTUAL_MODEL",
        "VEIL_CONTEXTUAL_TIMEOUT_MS",
        "VEIL_CONTEXTUAL_API_KEY",
        "VEIL_CONTEXTUAL_UNKNOWN_LABELS",
        "VEIL_AUDIT_ENABLED",
        "VEIL_AUDIT_LOG_PATH",
        "VEIL_LOGGING_LOCAL_ENABLED",
        "VEIL_LOGGING_LOCAL_PATH",
        "VEIL_LOGGING_LOCAL_ROTATION",
        "TEST_VEIL_MODEL_KEY",
    ] {
        std::env::remove_var(var);
    }
}

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_complete_config() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let file = write_config(
        r#"
[application]
name = "veil"
log_level = "debug"

[anonymization.normalization]
EMAIL = "case_insensitive"
PHONE = "digits_only"

[anonymization.contextual]
enabled = true
endpoint = "http://models.internal:11434"
model = "qwen2.5:7b"
timeout_ms = 5000
temperature = 0.1
unknown_labels = "reject"

[anonymization.audit]
enabled = true
log_path = "/var/log/veil/audit.log"

[logging]
local_enabled = true
local_path = "/var/log/veil"
local_rotation = "hourly"
"#,
    );

    let config = load_config(file.path()).unwrap();

    assert_eq!(config.application.log_level, "debug");
    let anonymization = &config.anonymization;
    assert_eq!(
        anonymization.normalization.rule_for(EntityType::Email),
        NormalizationRule::CaseInsensitive
    );
    assert_eq!(
        anonymization.normalization.rule_for(EntityType::Phone),
        NormalizationRule::DigitsOnly
    );
    assert_eq!(
        anonymization.normalization.rule_for(EntityType::Person),
        NormalizationRule::Exact
    );
    assert!(anonymization.contextual.enabled);
    assert_eq!(anonymization.contextual.model, "qwen2.5:7b");
    assert_eq!(anonymization.contextual.timeout_ms, 5000);
    assert_eq!(anonymization.contextual.unknown_labels, UnknownLabelPolicy::Reject);
    assert!(anonymization.audit.enabled);
    assert!(config.logging.local_enabled);
    assert_eq!(config.logging.local_rotation, "hourly");
}

#[test]
fn test_empty_config_uses_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let config = load_config_from_str("").unwrap();

    assert_eq!(config.application.log_level, "info");
    assert!(!config.anonymization.contextual.enabled);
    assert_eq!(config.anonymization.contextual.endpoint, "http://localhost:11434");
    assert_eq!(config.anonymization.contextual.timeout_ms, 30_000);
    assert!(config.anonymization.pattern_library.is_none());
    assert!(!config.anonymization.audit.enabled);
    assert!(AnonymizationEngine::new(&config.anonymization).is_ok());
}

#[test]
fn test_env_var_substitution_for_api_key() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();
    std::env::set_var("TEST_VEIL_MODEL_KEY", "sk-from-env");

    let config = load_config_from_str(
        r#"
[anonymization.contextual]
api_key = "${TEST_VEIL_MODEL_KEY}"
"#,
    )
    .unwrap();
    cleanup_env_vars();

    let key = config.anonymization.contextual.api_key.unwrap();
    assert_eq!(key.expose_secret(), "sk-from-env");
}

#[test]
fn test_missing_env_var_is_reported() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let err = load_config_from_str(
        r#"
[anonymization.contextual]
api_key = "${TEST_VEIL_MODEL_KEY}"
"#,
    )
    .unwrap_err();

    assert!(err.to_string().contains("TEST_VEIL_MODEL_KEY"));
}

#[test]
fn test_env_overrides_take_precedence() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();
    std::env::set_var("VEIL_APPLICATION_LOG_LEVEL", "warn");
    std::env::set_var("VEIL_CONTEXTUAL_ENABLED", "true");
    std::env::set_var("VEIL_CONTEXTUAL_MODEL", "mistral:7b");
    std::env::set_var("VEIL_CONTEXTUAL_TIMEOUT_MS", "1500");
    std::env::set_var("VEIL_CONTEXTUAL_UNKNOWN_LABELS", "reject");

    let result = load_config_from_str(
        r#"
[application]
log_level = "debug"

[anonymization.contextual]
enabled = false
model = "llama3.2:3b"
"#,
    );
    cleanup_env_vars();

    let config = result.unwrap();
    assert_eq!(config.application.log_level, "warn");
    assert!(config.anonymization.contextual.enabled);
    assert_eq!(config.anonymization.contextual.model, "mistral:7b");
    assert_eq!(config.anonymization.contextual.timeout_ms, 1500);
    assert_eq!(
        config.anonymization.contextual.unknown_labels,
        UnknownLabelPolicy::Reject
    );
}

#[test]
fn test_invalid_env_override_rejected() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();
    std::env::set_var("VEIL_CONTEXTUAL_TIMEOUT_MS", "soon");

    let result = load_config_from_str("");
    cleanup_env_vars();

    assert!(result.is_err());
}

#[test]
fn test_validation_errors() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    for invalid in [
        "[application]\nlog_level = \"verbose\"",
        "[anonymization.contextual]\nendpoint = \"not a url\"",
        "[anonymization.contextual]\nendpoint = \"ftp://models.local\"",
        "[anonymization.contextual]\ntimeout_ms = 0",
        "[anonymization.contextual]\nmodel = \"\"",
        "[anonymization.contextual]\ntemperature = 3.5",
        "[anonymization]\npattern_library = \"/nonexistent/patterns.toml\"",
        "[logging]\nlocal_rotation = \"weekly\"",
        "[anonymization.normalization]\nEMAIL = \"soundex\"",
    ] {
        assert!(
            load_config_from_str(invalid).is_err(),
            "config should be rejected:\n{invalid}"
        );
    }
}

#[test]
fn test_custom_pattern_library() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let patterns = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    std::fs::write(
        patterns.path(),
        r#"
[patterns.employee_id]
category = "OTHER"
patterns = ['\bEMP-[0-9]{6}\b']
"#,
    )
    .unwrap();

    let config = load_config_from_str(&format!(
        "[anonymization]\npattern_library = '{}'\n",
        patterns.path().display()
    ))
    .unwrap();

    let engine = AnonymizationEngine::new(&config.anonymization).unwrap();
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let outcome = runtime
        .block_on(engine.anonymize("badge EMP-123456, mail a@x.io", false))
        .unwrap();

    // Only the custom rule is loaded
    assert_eq!(outcome.anonymized_text, "badge [OTHER1], mail a@x.io");
}

#[test]
fn test_missing_config_file() {
    let result = load_config("/nonexistent/veil.toml");
    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("Configuration file not found"));
}
