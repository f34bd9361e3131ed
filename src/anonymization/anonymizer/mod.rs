//! Placeholder assignment and text rewriting
//!
//! Turns a resolved span set into placeholders and the anonymized text.

pub mod normalize;
pub mod placeholder;
pub mod rewriter;

pub use normalize::{NormalizationRule, NormalizationTable};
pub use placeholder::{format_placeholder, Assignment, PlaceholderAssigner};
pub use rewriter::Rewriter;
