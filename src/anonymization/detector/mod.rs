//! Entity detection module
//!
//! Provides the [`EntityDetector`] capability shared by the deterministic
//! [`RegexDetector`](regex::RegexDetector) and the model-backed
//! [`ContextualDetector`](contextual::ContextualDetector). The resolver only sees
//! spans, so any implementation (including synthetic test detectors) can be
//! plugged into the engine.

pub mod contextual;
pub mod patterns;
pub mod regex;

use crate::anonymization::models::{Span, SpanSource};
use crate::domain::DetectorError;
use async_trait::async_trait;

/// Spans produced by one detector run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectorOutput {
    /// Spans ordered by start offset
    pub spans: Vec<Span>,
    /// Records the detector received but could not validate
    pub discarded: usize,
}

impl DetectorOutput {
    /// Output with no discarded records
    pub fn from_spans(spans: Vec<Span>) -> Self {
        Self {
            spans,
            discarded: 0,
        }
    }
}

/// Trait for entity detector implementations
#[async_trait]
pub trait EntityDetector: Send + Sync {
    /// Detect entity spans in `text`
    ///
    /// Implementations return spans that do not overlap each other. Errors are
    /// reserved for detectors that could not run at all.
    async fn detect(&self, text: &str) -> Result<DetectorOutput, DetectorError>;

    /// Source tag carried by every span this detector emits
    fn source(&self) -> SpanSource;

    /// Short name used in logs
    fn name(&self) -> &str;
}

/// Keep the longest non-overlapping spans, earliest first on ties
///
/// Candidates are ordered by `(start, longer first)` and swept left to right; a
/// candidate survives if it starts at or after the end of the last kept span.
pub(crate) fn select_non_overlapping(mut candidates: Vec<Span>) -> Vec<Span> {
    candidates.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then_with(|| b.len().cmp(&a.len()))
            .then_with(|| a.label.cmp(&b.label))
    });

    let mut kept: Vec<Span> = Vec::with_capacity(candidates.len());
    for span in candidates {
        if kept.last().is_some_and(|last| span.start < last.end) {
            continue;
        }
        kept.push(span);
    }
    kept
}
