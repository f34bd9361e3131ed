//! Configuration management for Veil
//!
//! Veil reads an optional `veil.toml` with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `VEIL_*` environment overrides
//! - Defaults for every setting
//! - Validation on load
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [anonymization]
//! pattern_library = "patterns/pii_patterns.toml"
//!
//! [anonymization.normalization]
//! EMAIL = "case_insensitive"
//!
//! [anonymization.contextual]
//! enabled = true
//! endpoint = "http://localhost:11434"
//! model = "llama3.2:3b"
//! timeout_ms = 30000
//! api_key = "${VEIL_MODEL_API_KEY}"
//!
//! [anonymization.audit]
//! enabled = true
//! log_path = "./audit/anonymization.log"
//!
//! [logging]
//! local_enabled = false
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use veil::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("veil.toml")?;
//! println!("Model: {}", config.anonymization.contextual.model);
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::{load_config, load_config_from_str};
pub use schema::{ApplicationConfig, LoggingConfig, VeilConfig};
pub use secret::{secret_string, SecretString, SecretValue};
