//! Configuration schema types

use crate::anonymization::config::AnonymizationConfig;
use serde::{Deserialize, Serialize};

/// Main Veil configuration
///
/// Root structure of `veil.toml`. Every section has defaults, so an empty file
/// is a valid pattern-only configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VeilConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Detection, placeholder and audit settings
    #[serde(default)]
    pub anonymization: AnonymizationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl VeilConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.anonymization
            .validate()
            .map_err(|e| format!("{e:#}"))?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    #[serde(default = "default_name")]
    pub name: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
        }
    }
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(format!(
                "log_level must be one of: {}, got '{}'",
                valid_levels.join(", "),
                self.log_level
            ));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Write JSON logs to files in addition to the console
    #[serde(default)]
    pub local_enabled: bool,

    /// Directory for log files
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log file rotation (daily, hourly, never)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("local_path cannot be empty when local logging is enabled".to_string());
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "local_rotation must be one of: {}, got '{}'",
                valid_rotations.join(", "),
                self.local_rotation
            ));
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

fn default_name() -> String {
    "veil".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_local_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}
