//! Deanonymize command implementation
//!
//! Restoration needs only the text, the mapping and (optionally) the audit log,
//! so no detector is loaded here.

use super::{load_config_or_default, read_input, write_output, InputArgs, EXIT_INTERRUPTED};
use crate::anonymization::audit::AuditLogger;
use crate::anonymization::restorer::Restorer;
use crate::domain::VeilError;
use clap::Args;
use std::path::PathBuf;
use tokio::sync::watch;
use uuid::Uuid;

/// Arguments for the deanonymize command
#[derive(Args, Debug)]
pub struct DeanonymizeArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Mapping JSON produced by `veil anonymize --mapping`
    #[arg(short, long)]
    pub mapping: PathBuf,

    /// Output file for the restored text (stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Exit with status 1 if any placeholder could not be restored
    #[arg(long)]
    pub strict: bool,
}

impl DeanonymizeArgs {
    /// Execute the deanonymize command
    pub async fn execute(
        &self,
        config_path: &str,
        mut shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        let config = match load_config_or_default(config_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("❌ Failed to load configuration: {e}");
                return Ok(2);
            }
        };

        let audit_logger = if config.anonymization.audit.enabled {
            match AuditLogger::new(config.anonymization.audit.log_path.clone()) {
                Ok(logger) => Some(logger),
                Err(e) => {
                    eprintln!("❌ Failed to open audit log: {e}");
                    return Ok(2);
                }
            }
        } else {
            None
        };

        let text = match read_input(self.input.input.as_deref(), &mut shutdown_signal).await {
            Ok(Some(text)) => text,
            Ok(None) => {
                eprintln!("⚠️  Interrupted before the input was read");
                return Ok(EXIT_INTERRUPTED);
            }
            Err(e @ VeilError::InvalidInput(_)) => {
                eprintln!("❌ {e}");
                return Ok(3);
            }
            Err(e) => return Err(e.into()),
        };

        let mapping: serde_json::Value = match std::fs::read_to_string(&self.mapping)
            .map_err(VeilError::from)
            .and_then(|raw| serde_json::from_str(&raw).map_err(VeilError::from))
        {
            Ok(value) => value,
            Err(e) => {
                eprintln!("❌ Failed to read mapping {}: {e}", self.mapping.display());
                return Ok(3);
            }
        };

        let outcome = match Restorer::new()?.restore_value(&text, &mapping) {
            Ok(outcome) => outcome,
            Err(e @ VeilError::InvalidMapping(_)) => {
                eprintln!("❌ {e}");
                return Ok(3);
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(ref logger) = audit_logger {
            if let Err(e) = logger.log_restoration(Uuid::new_v4(), &outcome) {
                crate::log_error_with_context!(&e, "Failed to write audit entry");
            }
        }

        for unresolved in &outcome.unresolved {
            eprintln!(
                "⚠️  No mapping entry for {} at offset {}",
                unresolved.token, unresolved.offset
            );
        }
        tracing::info!(
            replaced = outcome.replaced,
            unresolved = outcome.unresolved.len(),
            "Restoration completed"
        );

        write_output(self.output.as_deref(), &outcome.restored_text)?;

        if self.strict && !outcome.unresolved.is_empty() {
            return Ok(1);
        }
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn args(dir: &std::path::Path, text: &str, mapping: &str, strict: bool) -> DeanonymizeArgs {
        let input = dir.join("anon.txt");
        let mapping_path = dir.join("mapping.json");
        std::fs::write(&input, text).unwrap();
        std::fs::write(&mapping_path, mapping).unwrap();
        DeanonymizeArgs {
            input: InputArgs {
                input: Some(input),
            },
            mapping: mapping_path,
            output: Some(dir.join("restored.txt")),
            strict,
        }
    }

    async fn run(args: &DeanonymizeArgs, config_path: &str) -> i32 {
        let (_tx, rx) = watch::channel(false);
        args.execute(config_path, rx).await.unwrap()
    }

    #[tokio::test]
    async fn test_deanonymize_restores_text() {
        let dir = tempdir().unwrap();
        let args = args(
            dir.path(),
            "Mail [EMAIL1] today",
            r#"{"jane@example.com": "[EMAIL1]"}"#,
            false,
        );

        assert_eq!(run(&args, "/nonexistent/veil.toml").await, 0);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("restored.txt")).unwrap(),
            "Mail jane@example.com today"
        );
    }

    #[tokio::test]
    async fn test_strict_mode_flags_unresolved() {
        let dir = tempdir().unwrap();
        let args = args(dir.path(), "Hi [PERSON1]", "{}", true);

        assert_eq!(run(&args, "/nonexistent/veil.toml").await, 1);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("restored.txt")).unwrap(),
            "Hi [PERSON1]"
        );
    }

    #[tokio::test]
    async fn test_invalid_mapping_rejected() {
        let dir = tempdir().unwrap();
        let args = args(dir.path(), "Hi [PERSON1]", r#"{"Jane": 7}"#, false);

        assert_eq!(run(&args, "/nonexistent/veil.toml").await, 3);
        assert!(!dir.path().join("restored.txt").exists());
    }

    #[tokio::test]
    async fn test_restores_without_loading_detectors() {
        let dir = tempdir().unwrap();
        // Passes config validation but cannot be compiled into a registry
        let patterns = dir.path().join("broken_patterns.toml");
        std::fs::write(
            &patterns,
            "[patterns.salary]\ncategory = \"SALARY\"\npatterns = ['[0-9]+']\n",
        )
        .unwrap();
        let audit_log = dir.path().join("audit").join("restore.log");
        let config = dir.path().join("veil.toml");
        std::fs::write(
            &config,
            format!(
                "[anonymization]\npattern_library = '{}'\n\n[anonymization.audit]\nenabled = true\nlog_path = '{}'\n",
                patterns.display(),
                audit_log.display()
            ),
        )
        .unwrap();

        let args = args(
            dir.path(),
            "Mail [EMAIL1]",
            r#"{"jane@example.com": "[EMAIL1]"}"#,
            false,
        );

        assert_eq!(run(&args, config.to_str().unwrap()).await, 0);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("restored.txt")).unwrap(),
            "Mail jane@example.com"
        );
        let audit = std::fs::read_to_string(&audit_log).unwrap();
        assert!(audit.contains("\"event\":\"deanonymize\""));
        assert!(!audit.contains("jane@example.com"));
    }
}
