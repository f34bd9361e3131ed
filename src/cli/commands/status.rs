//! Status command implementation
//!
//! Shows the loaded pattern rules and whether the model service answers.

use super::load_config_or_default;
use crate::anonymization::detector::contextual::ContextualDetector;
use crate::anonymization::detector::patterns::PatternRegistry;
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Skip the model service health check
    #[arg(long)]
    pub offline: bool,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking detector status");

        println!("📊 Veil Status");
        println!();

        let config = match load_config_or_default(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };
        let anonymization = &config.anonymization;

        let registry = match anonymization.pattern_library {
            Some(ref path) => PatternRegistry::from_file(path),
            None => PatternRegistry::default_patterns(),
        };
        let registry = match registry {
            Ok(r) => r,
            Err(e) => {
                println!("❌ Failed to load pattern library");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        println!(
            "Pattern library: {}",
            anonymization
                .pattern_library
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "built-in".to_string())
        );
        println!("{:<24} {:<16} {:>8}", "Rule", "Entity", "Regexes");
        println!("{}", "-".repeat(50));
        for rule in registry.rules() {
            println!(
                "{:<24} {:<16} {:>8}",
                rule.name,
                rule.entity.label(),
                rule.regexes.len()
            );
        }
        println!();

        let contextual = &anonymization.contextual;
        println!(
            "Contextual detector: {}",
            if contextual.enabled {
                "enabled by default"
            } else {
                "disabled by default"
            }
        );
        println!("  Endpoint: {}", contextual.endpoint);
        println!("  Model:    {}", contextual.model);
        println!("  Timeout:  {} ms", contextual.timeout_ms);

        if self.offline {
            println!();
            return Ok(0);
        }

        let detector = ContextualDetector::new(contextual)?;
        match detector.health_check().await {
            Ok(()) => {
                println!("  Service:  ✅ reachable");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("  Service:  ❌ {e}");
                println!();
                if contextual.enabled {
                    Ok(4)
                } else {
                    Ok(0)
                }
            }
        }
    }
}
