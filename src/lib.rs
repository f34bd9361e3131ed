// Veil - Reversible PII Redaction
// Copyright (c) 2025 Veil Contributors
// Licensed under the MIT License

//! # Veil - Reversible PII Redaction
//!
//! Veil replaces personally identifiable information in free text with stable
//! placeholders such as `[EMAIL1]` or `[PERSON2]`, and restores the original
//! text from the anonymized text plus its mapping.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Detecting** PII with deterministic pattern rules and an optional
//!   model-backed contextual detector
//! - **Resolving** overlapping detections into one non-overlapping span set
//! - **Anonymizing** text with per-call placeholder counters and a bijective mapping
//! - **Restoring** anonymized text, leaving unknown placeholders untouched
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`anonymization`] - Detection, resolution, placeholders, restoration and audit
//! - [`domain`] - Error taxonomy and result alias
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use veil::anonymization::{AnonymizationConfig, AnonymizationEngine};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = AnonymizationEngine::new(&AnonymizationConfig::default())?;
//!
//!     let outcome = engine
//!         .anonymize("Reach me at jane@example.com or 555-123-4567", false)
//!         .await?;
//!     println!("{}", outcome.anonymized_text);
//!
//!     let restored = engine.deanonymize_with_mapping(&outcome.anonymized_text, &outcome.mapping);
//!     assert!(restored.unresolved.is_empty());
//!     Ok(())
//! }
//! ```
//!
//! ## Graceful Degradation
//!
//! When the contextual detector is unreachable, times out, or answers with
//! something unparseable, anonymization still completes with pattern
//! detections only. The outcome's [`anonymization::ContextualStatus`] says
//! which of these happened.
//!
//! ## Error Handling
//!
//! Veil uses the [`domain::VeilError`] type for all errors:
//!
//! ```rust,no_run
//! use veil::anonymization::Mapping;
//! use veil::domain::VeilError;
//!
//! fn example() -> Result<(), VeilError> {
//!     let mapping = Mapping::load("document.mapping.json")?;
//!     println!("{} entries", mapping.len());
//!     Ok(())
//! }
//! ```

pub mod anonymization;
pub mod cli;
pub mod config;
pub mod domain;
pub mod logging;
