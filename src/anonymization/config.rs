//! Anonymization configuration

use crate::anonymization::anonymizer::NormalizationTable;
use crate::config::{secret_string, SecretString};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What to do with contextual labels outside the entity vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnknownLabelPolicy {
    /// Keep the span and tag it `OTHER`
    #[default]
    Bucket,
    /// Drop the span and count it as discarded
    Reject,
}

/// Anonymization engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AnonymizationConfig {
    /// Path to pattern library TOML file (built-in rules when unset)
    #[serde(default)]
    pub pattern_library: Option<PathBuf>,

    /// Per-type rules for deciding when two surface forms are the same entity
    #[serde(default)]
    pub normalization: NormalizationTable,

    /// External model-backed detector
    #[serde(default)]
    pub contextual: ContextualConfig,

    /// Audit logging configuration
    #[serde(default)]
    pub audit: AuditConfig,
}

impl AnonymizationConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(ref path) = self.pattern_library {
            if !path.exists() {
                anyhow::bail!("Pattern library file not found: {}", path.display());
            }
            if path.extension().and_then(|s| s.to_str()) != Some("toml") {
                anyhow::bail!("Pattern library must be a TOML file: {}", path.display());
            }
        }

        self.contextual
            .validate()
            .context("Invalid contextual detector configuration")?;

        self.audit
            .validate()
            .context("Invalid audit configuration")?;

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("VEIL_ANONYMIZATION_PATTERN_LIBRARY") {
            self.pattern_library = Some(PathBuf::from(val));
        }

        self.contextual.apply_env_overrides()?;
        self.audit.apply_env_overrides()?;

        Ok(())
    }
}

/// Contextual detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextualConfig {
    /// Consult the model service by default
    #[serde(default)]
    pub enabled: bool,

    /// Base URL of the Ollama-compatible service
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model selector
    #[serde(default = "default_model")]
    pub model: String,

    /// Upper bound on one detection call
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Sampling temperature
    #[serde(default)]
    pub temperature: f32,

    /// Bearer token for hosted endpoints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<SecretString>,

    /// Handling of labels outside the entity vocabulary
    #[serde(default)]
    pub unknown_labels: UnknownLabelPolicy,
}

fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.2:3b".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for ContextualConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_endpoint(),
            model: default_model(),
            timeout_ms: default_timeout_ms(),
            temperature: 0.0,
            api_key: None,
            unknown_labels: UnknownLabelPolicy::default(),
        }
    }
}

impl ContextualConfig {
    /// Validate contextual detector configuration
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.endpoint)
            .with_context(|| format!("Invalid endpoint URL: {}", self.endpoint))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("Endpoint must use http or https: {}", self.endpoint);
        }
        if self.model.trim().is_empty() {
            anyhow::bail!("Model name cannot be empty");
        }
        if self.timeout_ms == 0 {
            anyhow::bail!("timeout_ms must be greater than 0");
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            anyhow::bail!("temperature must be between 0.0 and 2.0");
        }
        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("VEIL_CONTEXTUAL_ENABLED") {
            self.enabled = val.parse().context("Invalid VEIL_CONTEXTUAL_ENABLED value")?;
        }
        if let Ok(val) = std::env::var("VEIL_CONTEXTUAL_ENDPOINT") {
            self.endpoint = val;
        }
        if let Ok(val) = std::env::var("VEIL_CONTEXTUAL_MODEL") {
            self.model = val;
        }
        if let Ok(val) = std::env::var("VEIL_CONTEXTUAL_TIMEOUT_MS") {
            self.timeout_ms = val
                .parse()
                .context("Invalid VEIL_CONTEXTUAL_TIMEOUT_MS value")?;
        }
        if let Ok(val) = std::env::var("VEIL_CONTEXTUAL_API_KEY") {
            self.api_key = Some(secret_string(val));
        }
        if let Ok(val) = std::env::var("VEIL_CONTEXTUAL_UNKNOWN_LABELS") {
            self.unknown_labels = match val.to_lowercase().as_str() {
                "bucket" => UnknownLabelPolicy::Bucket,
                "reject" => UnknownLabelPolicy::Reject,
                _ => anyhow::bail!("Invalid VEIL_CONTEXTUAL_UNKNOWN_LABELS: {}", val),
            };
        }
        Ok(())
    }
}

/// Audit logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Enable audit logging
    #[serde(default)]
    pub enabled: bool,

    /// Audit log file path
    #[serde(default = "default_audit_log_path")]
    pub log_path: PathBuf,
}

fn default_audit_log_path() -> PathBuf {
    PathBuf::from("./audit/anonymization.log")
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_path: default_audit_log_path(),
        }
    }
}

impl AuditConfig {
    /// Validate audit configuration
    pub fn validate(&self) -> Result<()> {
        if self.enabled && self.log_path.as_os_str().is_empty() {
            anyhow::bail!("Audit log path cannot be empty when audit logging is enabled");
        }
        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("VEIL_AUDIT_ENABLED") {
            self.enabled = val.parse().context("Invalid VEIL_AUDIT_ENABLED value")?;
        }

        if let Ok(val) = std::env::var("VEIL_AUDIT_LOG_PATH") {
            self.log_path = PathBuf::from(val);
        }

        Ok(())
    }
}
