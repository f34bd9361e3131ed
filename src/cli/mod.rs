//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Veil using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Veil - reversible PII redaction for free text
#[derive(Parser, Debug)]
#[command(name = "veil")]
#[command(version, about, long_about = None)]
#[command(author = "Veil Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "veil.toml", env = "VEIL_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "VEIL_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replace PII in a document with placeholders and write the mapping
    Anonymize(commands::anonymize::AnonymizeArgs),

    /// Restore a document from anonymized text and its mapping
    Deanonymize(commands::deanonymize::DeanonymizeArgs),

    /// Report what would be redacted without changing anything
    Scan(commands::scan::ScanArgs),

    /// Show detector configuration and model service availability
    Status(commands::status::StatusArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
