//! Property tests for the anonymize/restore pipeline
//!
//! Inputs mix pattern-detectable values, literal placeholder-shaped tokens,
//! stray brackets and multibyte text. The contextual detector is replaced by
//! one that reports arbitrary, freely overlapping spans.

use async_trait::async_trait;
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use veil::anonymization::detector::regex::RegexDetector;
use veil::anonymization::detector::{DetectorOutput, EntityDetector};
use veil::anonymization::{AnonymizationEngine, AnonymizationOutcome, EntityType, Span, SpanSource};
use veil::domain::DetectorError;

const CONTEXTUAL_LABELS: [EntityType; 4] = [
    EntityType::Person,
    EntityType::Org,
    EntityType::Location,
    EntityType::Other,
];

/// Contextual stand-in that returns a fixed span list
struct FixedSpans(Vec<Span>);

#[async_trait]
impl EntityDetector for FixedSpans {
    async fn detect(&self, _text: &str) -> Result<DetectorOutput, DetectorError> {
        Ok(DetectorOutput::from_spans(self.0.clone()))
    }

    fn source(&self) -> SpanSource {
        SpanSource::Contextual
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

fn fragment() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{1,6}@[a-z]{1,5}\\.(com|io)",
        "555-[0-9]{3}-[0-9]{4}",
        "10\\.[0-9]{1,2}\\.[0-9]{1,2}\\.[0-9]{1,2}",
        "\\[(EMAIL|PHONE|PERSON|OTHER)[0-9]{1,2}\\]",
        "[\\[\\]]{1,3}",
        "[äöü✓📞日本]{1,4}",
        "[A-Za-z ]{1,8}",
    ]
}

fn document() -> impl Strategy<Value = String> {
    prop::collection::vec(fragment(), 0..12).prop_map(|parts| parts.join(" "))
}

fn raw_spans() -> impl Strategy<Value = Vec<(usize, usize, usize)>> {
    prop::collection::vec((0usize..=1000, 0usize..=1000, 0..CONTEXTUAL_LABELS.len()), 0..10)
}

fn floor_boundary(text: &str, mut index: usize) -> usize {
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Turn per-mille positions into contextual spans over `text`
fn contextual_spans(text: &str, raw: &[(usize, usize, usize)]) -> Vec<Span> {
    raw.iter()
        .filter_map(|&(a, b, label)| {
            let a = floor_boundary(text, text.len() * a / 1000);
            let b = floor_boundary(text, text.len() * b / 1000);
            Span::from_text(
                text,
                a.min(b),
                a.max(b),
                CONTEXTUAL_LABELS[label],
                SpanSource::Contextual,
            )
        })
        .collect()
}

fn engine(spans: Vec<Span>) -> AnonymizationEngine {
    AnonymizationEngine::with_detectors(
        Arc::new(RegexDetector::new().unwrap()),
        Some(Arc::new(FixedSpans(spans))),
    )
    .unwrap()
}

fn anonymize(engine: &AnonymizationEngine, text: &str) -> AnonymizationOutcome {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(engine.anonymize(text, true))
        .unwrap()
}

proptest! {
    #[test]
    fn restore_inverts_anonymize(text in document(), raw in raw_spans()) {
        let engine = engine(contextual_spans(&text, &raw));
        let outcome = anonymize(&engine, &text);

        let restored = engine.deanonymize_with_mapping(&outcome.anonymized_text, &outcome.mapping);
        prop_assert_eq!(
            &restored.restored_text,
            &text,
            "anonymized as '{}'",
            outcome.anonymized_text
        );
    }

    #[test]
    fn resolved_spans_are_sorted_and_disjoint(text in document(), raw in raw_spans()) {
        let outcome = anonymize(&engine(contextual_spans(&text, &raw)), &text);

        for pair in outcome.spans.windows(2) {
            prop_assert!(
                pair[0].end <= pair[1].start,
                "{:?} and {:?} overlap or are out of order",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn placeholders_are_unique_and_fresh(text in document(), raw in raw_spans()) {
        let outcome = anonymize(&engine(contextual_spans(&text, &raw)), &text);

        let mut seen = HashSet::new();
        for (_, placeholder) in outcome.mapping.iter() {
            prop_assert!(seen.insert(placeholder.to_string()), "{} assigned twice", placeholder);
            prop_assert!(!text.contains(placeholder), "{} already in the input", placeholder);
            prop_assert!(outcome.anonymized_text.contains(placeholder));
        }
    }

    #[test]
    fn anonymization_is_deterministic(text in document(), raw in raw_spans()) {
        let engine = engine(contextual_spans(&text, &raw));

        let first = anonymize(&engine, &text);
        let second = anonymize(&engine, &text);

        prop_assert_eq!(first.anonymized_text, second.anonymized_text);
        prop_assert_eq!(first.mapping, second.mapping);
        prop_assert_eq!(first.spans, second.spans);
    }
}
