//! Validate config command implementation

use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config validates before returning
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration is invalid");
                println!("   Error: {e}");
                println!();
                return Ok(2);
            }
        };

        let anonymization = &config.anonymization;
        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Application: {}", config.application.name);
        println!("  Log Level: {}", config.application.log_level);
        println!(
            "  Pattern Library: {}",
            anonymization
                .pattern_library
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "built-in".to_string())
        );
        println!(
            "  Contextual Detector: {} ({} @ {})",
            if anonymization.contextual.enabled {
                "enabled"
            } else {
                "disabled"
            },
            anonymization.contextual.model,
            anonymization.contextual.endpoint
        );
        println!(
            "  Model API Key: {}",
            if anonymization.contextual.api_key.is_some() {
                "set"
            } else {
                "not set"
            }
        );
        println!(
            "  Audit Log: {}",
            if anonymization.audit.enabled {
                anonymization.audit.log_path.display().to_string()
            } else {
                "disabled".to_string()
            }
        );
        println!("  File Logging: {}", config.logging.local_enabled);
        println!();
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_validate_missing_file() {
        let args = ValidateArgs {};
        let code = args.execute("/nonexistent/veil.toml").await.unwrap();
        assert_eq!(code, 2);
    }

    #[tokio::test]
    async fn test_validate_bad_endpoint() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[anonymization.contextual]\nendpoint = \"nope\"").unwrap();

        let args = ValidateArgs {};
        let code = args
            .execute(file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, 2);
    }
}
