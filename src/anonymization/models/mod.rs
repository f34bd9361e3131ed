//! Data models for anonymization

pub mod entity;
pub mod mapping;
pub mod outcome;

pub use entity::{EntityType, Span, SpanSource};
pub use mapping::Mapping;
pub use outcome::{AnonymizationOutcome, ContextualStatus};
