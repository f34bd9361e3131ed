//! Scan command implementation
//!
//! Runs detection and resolution and prints a [`DetectionReport`](crate::anonymization::DetectionReport)
//! without producing anonymized text or a mapping.

use super::{
    load_config_or_default, read_input, write_output, ContextualFlags, InputArgs, EXIT_INTERRUPTED,
};
use crate::anonymization::AnonymizationEngine;
use crate::domain::VeilError;
use clap::{Args, ValueEnum};
use std::path::PathBuf;
use tokio::sync::watch;

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum ReportFormat {
    /// Human-readable summary
    #[default]
    Console,
    /// Pretty-printed JSON
    Json,
}

/// Arguments for the scan command
#[derive(Args, Debug)]
pub struct ScanArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Console)]
    pub format: ReportFormat,

    /// Also write the JSON report to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    #[command(flatten)]
    pub detectors: ContextualFlags,
}

impl ScanArgs {
    /// Execute the scan command
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
        let report = engine.scan(&text, use_contextual).await?;

        if let Some(ref path) = self.report {
            write_output(Some(path), &report.format_json()?)?;
            tracing::info!(path = %path.display(), "Detection report written");
        }

        let rendered = match self.format {
            ReportFormat::Console => report.format_console(),
            ReportFormat::Json => {
                let mut json = report.format_json()?;
                json.push('\n');
                json
            }
        };
        write_output(None, &rendered)?;

        Ok(0)
    }
}
