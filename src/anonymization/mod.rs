//! Reversible PII anonymization
//!
//! Detects personal data in free text, replaces each distinct value with a
//! stable placeholder such as `[EMAIL1]`, and restores the original from the
//! anonymized text and its mapping alone.
//!
//! # Architecture
//!
//! - **Detection**: deterministic pattern rules plus an optional external model
//! - **Resolution**: merges both span sets into one non-overlapping set
//! - **Placeholders**: per-call, per-type counters and a bijective mapping
//! - **Restoration**: single-pass substitution that leaves unknown tokens alone
//! - **Audit**: JSON-lines log with hashed values
//!
//! # Usage
//!
//! ```rust,no_run
//! use veil::anonymization::{AnonymizationEngine, AnonymizationConfig};
//!
//! # async fn example() -> veil::domain::Result<()> {
//! let engine = AnonymizationEngine::new(&AnonymizationConfig::default())?;
//! let outcome = engine.anonymize("Call 555-123-4567", false).await?;
//! println!("{}", outcome.anonymized_text);
//! # Ok(())
//! # }
//! ```

pub mod anonymizer;
pub mod audit;
pub mod config;
pub mod detector;
pub mod engine;
pub mod models;
pub mod report;
pub mod resolver;
pub mod restorer;

pub use config::AnonymizationConfig;
pub use engine::AnonymizationEngine;
pub use models::{AnonymizationOutcome, ContextualStatus, EntityType, Mapping, Span, SpanSource};
pub use report::DetectionReport;
pub use restorer::{RestoreOutcome, UnresolvedPlaceholder};
