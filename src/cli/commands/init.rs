//! Init command implementation
//!
//! Writes a commented `veil.toml` with every setting at its default.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "veil.toml")]
    pub output: String,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing Veil configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2);
        }

        match fs::write(&self.output, Self::generate_config()) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your settings", self.output);
                println!("  2. To redact names and organizations, start an Ollama-compatible");
                println!("     model service and set [anonymization.contextual] enabled = true");
                println!("  3. Check the model service: veil status");
                println!("  4. Validate configuration: veil validate-config");
                println!("  5. Run: veil anonymize -i document.txt -m document.mapping.json");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(5)
            }
        }
    }

    /// Generate the default configuration file
    pub fn generate_config() -> &'static str {
        r#"# Veil Configuration File
# Reversible PII redaction

[application]
name = "veil"
log_level = "info"

[anonymization]
# Custom pattern library (built-in rules when omitted)
# pattern_library = "patterns/pii_patterns.toml"

# Which surface forms of a value share one placeholder.
# exact | case_insensitive | digits_only | collapse_whitespace
# Anything other than exact restores the first-seen form of a value.
[anonymization.normalization]
# EMAIL = "case_insensitive"
# PHONE = "digits_only"

[anonymization.contextual]
# Model-backed detection of names, organizations and locations
enabled = false
endpoint = "http://localhost:11434"
model = "llama3.2:3b"
timeout_ms = 30000
temperature = 0.0
# Labels outside the entity vocabulary: bucket (tag OTHER) | reject
unknown_labels = "bucket"
# api_key = "${VEIL_MODEL_API_KEY}"

[anonymization.audit]
# JSON-lines audit log; values are stored only as SHA-256 hashes
enabled = false
log_path = "./audit/anonymization.log"

[logging]
local_enabled = false
local_path = "./logs"
local_rotation = "daily"  # daily | hourly | never
"#
    }
}
