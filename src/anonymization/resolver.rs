//! Span resolution
//!
//! Merges the outputs of both detectors into one ordered, non-overlapping span set.
//!
//! Candidates are ranked by a total order and accepted greedily:
//!
//! 1. pattern spans before contextual spans,
//! 2. longer spans before shorter ones,
//! 3. earlier start before later start,
//!
//! with end offset and entity type as final tie-breakers. A candidate is kept iff
//! it overlaps nothing already kept. The result is sorted by start and depends
//! only on the two input sets, never on their order.

use crate::anonymization::models::Span;
use std::cmp::Ordering;
use tracing::debug;

/// Result of resolving two span sets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Accepted spans ordered by start
    pub spans: Vec<Span>,
    /// Candidates dropped because a higher-ranked span overlapped them
    pub overlap_losses: usize,
    /// Candidates dropped because they did not address the text
    pub invalid: usize,
}

/// Deterministic conflict resolution between detectors
#[derive(Debug, Clone, Copy, Default)]
pub struct SpanResolver;

impl SpanResolver {
    /// Resolve pattern and contextual spans for `text`
    ///
    /// Spans that are empty, out of range or whose raw value disagrees with `text`
    /// are dropped before ranking.
    pub fn resolve(&self, text: &str, pattern: Vec<Span>, contextual: Vec<Span>) -> Resolution {
        let total = pattern.len() + contextual.len();
        let mut candidates: Vec<Span> = pattern
            .into_iter()
            .chain(contextual)
            .filter(|span| span.is_valid_for(text))
            .collect();
        let invalid = total - candidates.len();

        candidates.sort_by(priority);

        let mut accepted: Vec<Span> = Vec::with_capacity(candidates.len());
        let mut overlap_losses = 0;
        for candidate in candidates {
            if accepted.iter().any(|kept| kept.overlaps(&candidate)) {
                overlap_losses += 1;
            } else {
                accepted.push(candidate);
            }
        }
        accepted.sort_by(|a, b| a.start.cmp(&b.start));

        if overlap_losses > 0 || invalid > 0 {
            debug!(
                accepted = accepted.len(),
                overlap_losses, invalid, "Resolved overlapping detections"
            );
        }

        Resolution {
            spans: accepted,
            overlap_losses,
            invalid,
        }
    }
}

fn priority(a: &Span, b: &Span) -> Ordering {
    a.source
        .rank()
        .cmp(&b.source.rank())
        .then_with(|| b.len().cmp(&a.len()))
        .then_with(|| a.start.cmp(&b.start))
        .then_with(|| a.end.cmp(&b.end))
        .then_with(|| a.label.cmp(&b.label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anonymization::models::{EntityType, SpanSource};
    use proptest::prelude::*;

    const TEXT: &str = "Reach Dr. Jane Roe on 555-123-4567 today, Jane Roe said.";

    fn pat(start: usize, end: usize, label: EntityType) -> Span {
        Span::from_text(TEXT, start, end, label, SpanSource::Pattern).unwrap()
    }

    fn ctx(start: usize, end: usize, label: EntityType) -> Span {
        Span::from_text(TEXT, start, end, label, SpanSource::Contextual).unwrap()
    }

    fn assert_disjoint(spans: &[Span]) {
        for (i, a) in spans.iter().enumerate() {
            for b in &spans[i + 1..] {
                assert!(!a.overlaps(b), "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn test_pattern_wins_over_longer_contextual() {
        // Contextual claims "on 555-123-4567" (19..34), pattern claims the number (22..34)
        let resolution = SpanResolver.resolve(
            TEXT,
            vec![pat(22, 34, EntityType::Phone)],
            vec![ctx(19, 34, EntityType::Other)],
        );
        assert_eq!(resolution.spans.len(), 1);
        assert_eq!(resolution.spans[0].source, SpanSource::Pattern);
        assert_eq!(resolution.overlap_losses, 1);
    }

    #[test]
    fn test_longer_wins_within_source() {
        let resolution = SpanResolver.resolve(
            TEXT,
            vec![],
            vec![ctx(10, 14, EntityType::Person), ctx(6, 18, EntityType::Person)],
        );
        assert_eq!(resolution.spans.len(), 1);
        assert_eq!(resolution.spans[0].raw_value, "Dr. Jane Roe");
    }

    #[test]
    fn test_earlier_start_wins_equal_length() {
        let resolution = SpanResolver.resolve(
            TEXT,
            vec![],
            vec![ctx(12, 18, EntityType::Other), ctx(10, 16, EntityType::Other)],
        );
        assert_eq!(resolution.spans.len(), 1);
        assert_eq!(resolution.spans[0].start, 10);
    }

    #[test]
    fn test_disjoint_spans_all_kept_sorted() {
        let resolution = SpanResolver.resolve(
            TEXT,
            vec![pat(22, 34, EntityType::Phone)],
            vec![ctx(42, 50, EntityType::Person), ctx(10, 18, EntityType::Person)],
        );
        let starts: Vec<usize> = resolution.spans.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![10, 22, 42]);
        assert_eq!(resolution.overlap_losses, 0);
    }

    #[test]
    fn test_order_independent() {
        let pattern = vec![pat(22, 34, EntityType::Phone), pat(26, 34, EntityType::Other)];
        let contextual = vec![
            ctx(6, 18, EntityType::Person),
            ctx(10, 18, EntityType::Person),
            ctx(19, 25, EntityType::Other),
        ];

        let forward = SpanResolver.resolve(TEXT, pattern.clone(), contextual.clone());
        let reversed = SpanResolver.resolve(
            TEXT,
            pattern.into_iter().rev().collect(),
            contextual.into_iter().rev().collect(),
        );
        assert_eq!(forward, reversed);
        assert_disjoint(&forward.spans);
    }

    #[test]
    fn test_identical_ranges_prefer_pattern() {
        let resolution = SpanResolver.resolve(
            TEXT,
            vec![pat(22, 34, EntityType::Phone)],
            vec![ctx(22, 34, EntityType::Other)],
        );
        assert_eq!(resolution.spans.len(), 1);
        assert_eq!(resolution.spans[0].label, EntityType::Phone);
    }

    #[test]
    fn test_invalid_spans_dropped() {
        let stale = Span {
            start: 0,
            end: 5,
            label: EntityType::Person,
            source: SpanSource::Contextual,
            raw_value: "Bogus".to_string(),
        };
        let out_of_range = Span {
            start: 50,
            end: 500,
            label: EntityType::Person,
            source: SpanSource::Contextual,
            raw_value: String::new(),
        };
        let resolution = SpanResolver.resolve(TEXT, vec![], vec![stale, out_of_range]);
        assert!(resolution.spans.is_empty());
        assert_eq!(resolution.invalid, 2);
    }

    #[test]
    fn test_dense_overlaps_never_survive() {
        let mut contextual = Vec::new();
        for start in 0..TEXT.len() - 4 {
            contextual.push(ctx(start, start + 1 + start % 4, EntityType::Other));
        }
        let pattern = vec![pat(22, 34, EntityType::Phone)];

        let resolution = SpanResolver.resolve(TEXT, pattern, contextual);
        assert_disjoint(&resolution.spans);
        assert!(resolution
            .spans
            .iter()
            .any(|s| s.source == SpanSource::Pattern));
        assert!(resolution.spans.windows(2).all(|w| w[0].start < w[1].start));
    }

    fn arbitrary_spans() -> impl Strategy<Value = Vec<(usize, usize, bool, usize)>> {
        prop::collection::vec((0..TEXT.len(), 1usize..16, any::<bool>(), 0usize..4), 0..24)
    }

    fn build(raw: &[(usize, usize, bool, usize)]) -> (Vec<Span>, Vec<Span>) {
        const LABELS: [EntityType; 4] = [
            EntityType::Person,
            EntityType::Phone,
            EntityType::Location,
            EntityType::Other,
        ];
        let mut pattern = Vec::new();
        let mut contextual = Vec::new();
        for &(start, width, from_pattern, label) in raw {
            let end = (start + width).min(TEXT.len());
            if from_pattern {
                pattern.push(pat(start, end, LABELS[label]));
            } else {
                contextual.push(ctx(start, end, LABELS[label]));
            }
        }
        (pattern, contextual)
    }

    proptest! {
        #[test]
        fn resolved_spans_are_disjoint_and_maximal(raw in arbitrary_spans()) {
            let (pattern, contextual) = build(&raw);
            let candidates: Vec<Span> = pattern.iter().chain(&contextual).cloned().collect();

            let resolution = SpanResolver.resolve(TEXT, pattern, contextual);

            assert_disjoint(&resolution.spans);
            prop_assert!(resolution.spans.windows(2).all(|w| w[0].start < w[1].start));
            prop_assert_eq!(
                resolution.spans.len() + resolution.overlap_losses + resolution.invalid,
                candidates.len()
            );
            for candidate in &candidates {
                prop_assert!(
                    resolution.spans.contains(candidate)
                        || resolution.spans.iter().any(|kept| kept.overlaps(candidate)),
                    "{:?} was dropped without a conflict",
                    candidate
                );
            }
        }

        #[test]
        fn resolution_ignores_input_order(raw in arbitrary_spans()) {
            let (pattern, contextual) = build(&raw);
            let forward = SpanResolver.resolve(TEXT, pattern.clone(), contextual.clone());

            let reversed = SpanResolver.resolve(
                TEXT,
                pattern.into_iter().rev().collect(),
                contextual.into_iter().rev().collect(),
            );

            prop_assert_eq!(forward.spans, reversed.spans);
        }

        #[test]
        fn contextual_never_displaces_pattern(raw in arbitrary_spans()) {
            let (pattern, contextual) = build(&raw);
            let resolution = SpanResolver.resolve(TEXT, pattern.clone(), contextual);

            let kept_pattern: Vec<&Span> = resolution
                .spans
                .iter()
                .filter(|s| s.source == SpanSource::Pattern)
                .collect();
            // A pattern span may only lose to another pattern span
            for candidate in &pattern {
                prop_assert!(kept_pattern.iter().any(|kept| kept.overlaps(candidate)));
            }
        }
    }
}
