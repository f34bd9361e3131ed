//! Anonymize command implementation

use super::{
    load_config_or_default, read_input, write_output, ContextualFlags, InputArgs, EXIT_INTERRUPTED,
};
use crate::anonymization::AnonymizationEngine;
use crate::domain::VeilError;
use clap::Args;
use std::path::PathBuf;
use tokio::sync::watch;

/// Arguments for the anonymize command
#[derive(Args, Debug)]
pub struct AnonymizeArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Output file for the anonymized text (stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Where to write the mapping JSON needed for restoration
    #[arg(short, long)]
    pub mapping: Option<PathBuf>,

    /// Print the full result (text, mapping, spans, status) as JSON instead of plain text
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub detectors: ContextualFlags,
}

impl AnonymizeArgs {
    /// Execute the anonymize command
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

        let engine = match AnonymizationEngine::new(&config.anonymization) {
            Ok(engine) => engine,
            Err(e) => {
                eprintln!("❌ Failed to initialize anonymization engine: {e}");
                return Ok(2);
            }
        };

        let use_contextual = self
            .detectors
            .use_contextual(config.anonymization.contextual.enabled);
        tracing::info!(
            use_contextual,
            bytes = text.len(),
            "Starting anonymization"
        );

        let outcome = engine
            .anonymize_with_cancel(&text, use_contextual, shutdown_signal)
            .await?;

        for warning in &outcome.warnings {
            eprintln!("⚠️  {warning}");
        }

        if let Some(ref path) = self.mapping {
            outcome.mapping.save(path)?;
            eprintln!(
                "🔑 Mapping with {} entr{} written to {}",
                outcome.mapping.len(),
                if outcome.mapping.len() == 1 { "y" } else { "ies" },
                path.display()
            );
        } else if !self.json && !outcome.mapping.is_empty() {
            eprintln!("⚠️  No --mapping given: this anonymization cannot be reversed");
        }

        let rendered = if self.json {
            let mut json = serde_json::to_string_pretty(&outcome)?;
            json.push('\n');
            json
        } else {
            outcome.anonymized_text
        };
        write_output(self.output.as_deref(), &rendered)?;

        Ok(0)
    }
}
