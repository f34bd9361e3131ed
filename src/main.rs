// Veil - Reversible PII Redaction
// Copyright (c) 2025 Veil Contributors
// Licensed under the MIT License

use clap::Parser;
use std::process;
use tokio::sync::watch;
use veil::cli::commands::load_config_or_default;
use veil::cli::{Cli, Commands};
use veil::config::LoggingConfig;
use veil::logging::init_logging;

#[tokio::main]
async fn main() {
    // Optional; a missing .env file is ignored
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // File logging follows the config file when one is present
    let (config_level, logging_config) = match load_config_or_default(&cli.config) {
        Ok(config) => (config.application.log_level, config.logging),
        Err(_) => ("info".to_string(), LoggingConfig::default()),
    };
    let log_level = cli.log_level.clone().unwrap_or(config_level);
    let _guard = match init_logging(&log_level, &logging_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(5);
        }
    };

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        "Veil - Reversible PII Redaction"
    );

    // Ctrl+C stops a pending input read (exit 130); once the document is read it
    // abandons the contextual call and the document is still anonymized with patterns
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {
                            tracing::info!("Received SIGINT (Ctrl+C), cancelling contextual detection");
                        }
                        _ = sigterm.recv() => {
                            tracing::info!("Received SIGTERM, cancelling contextual detection");
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                    if tokio::signal::ctrl_c().await.is_err() {
                        return;
                    }
                    tracing::info!("Received SIGINT (Ctrl+C), cancelling contextual detection");
                }
            }
            let _ = shutdown_tx.send(true);
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            } else {
                tracing::info!("Received SIGINT (Ctrl+C), cancelling contextual detection");
                let _ = shutdown_tx.send(true);
            }
        }
    });

    let exit_code = match execute_command(&cli, shutdown_rx).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command execution failed");
            eprintln!("Error: {e:#}");
            5
        }
    };

    drop(_guard);
    process::exit(exit_code);
}

async fn execute_command(cli: &Cli, shutdown_signal: watch::Receiver<bool>) -> anyhow::Result<i32> {
    match &cli.command {
        Commands::Anonymize(args) => args.execute(&cli.config, shutdown_signal).await,
        Commands::Deanonymize(args) => args.execute(&cli.config, shutdown_signal).await,
        Commands::Scan(args) => args.execute(&cli.config, shutdown_signal).await,
        Commands::Status(args) => args.execute(&cli.config).await,
        Commands::ValidateConfig(args) => args.execute(&cli.config).await,
        Commands::Init(args) => args.execute().await,
    }
}
