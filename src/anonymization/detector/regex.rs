//! Regex-based pattern detector

use super::{patterns::PatternRegistry, select_non_overlapping, DetectorOutput, EntityDetector};
use crate::anonymization::models::{Span, SpanSource};
use crate::domain::{DetectorError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Deterministic detector backed by a [`PatternRegistry`]
///
/// Detection is a pure function of the input text. Each rule contributes its own
/// non-overlapping matches (longest first, so a full phone number beats a bare
/// area code); matches from different rules may overlap and are left for the
/// resolver.
#[derive(Clone)]
pub struct RegexDetector {
    pattern_registry: Arc<PatternRegistry>,
}

impl RegexDetector {
    /// Create a new regex detector with default patterns
    pub fn new() -> Result<Self> {
        let registry = PatternRegistry::default_patterns()?;
        Ok(Self::with_registry(registry))
    }

    /// Create a new regex detector with custom pattern registry
    pub fn with_registry(registry: PatternRegistry) -> Self {
        Self {
            pattern_registry: Arc::new(registry),
        }
    }

    /// Access the underlying registry
    pub fn registry(&self) -> &PatternRegistry {
        &self.pattern_registry
    }

    /// Detect spans synchronously
    pub fn detect_spans(&self, text: &str) -> Vec<Span> {
        let mut spans = Vec::new();

        for rule in self.pattern_registry.rules() {
            let candidates: Vec<Span> = rule
                .regexes
                .iter()
                .flat_map(|regex| regex.find_iter(text))
                .filter_map(|m| {
                    Span::from_text(text, m.start(), m.end(), rule.entity, SpanSource::Pattern)
                })
                .collect();

            if candidates.is_empty() {
                continue;
            }

            let selected = select_non_overlapping(candidates);
            tracing::trace!(rule = %rule.name, matches = selected.len(), "Pattern rule matched");
            spans.extend(selected);
        }

        spans.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then_with(|| b.len().cmp(&a.len()))
                .then_with(|| a.label.cmp(&b.label))
        });
        spans
    }
}

#[async_trait]
impl EntityDetector for RegexDetector {
    async fn detect(&self, text: &str) -> std::result::Result<DetectorOutput, DetectorError> {
        Ok(DetectorOutput::from_spans(self.detect_spans(text)))
    }

    fn source(&self) -> SpanSource {
        SpanSource::Pattern
    }

    fn name(&self) -> &str {
        "pattern"
    }
}
