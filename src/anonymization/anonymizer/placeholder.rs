//! Placeholder assignment
//!
//! Numbering state lives in one [`PlaceholderAssigner::assign`] call, so concurrent
//! requests never share counters.

use super::normalize::NormalizationTable;
use crate::anonymization::models::{EntityType, Mapping, Span};
use crate::domain::{Result, VeilError};
use std::collections::{BTreeMap, HashMap};

/// Result of assigning placeholders to a resolved span set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assignment {
    /// Raw value to placeholder mapping produced by this call
    pub mapping: Mapping,
    /// Placeholder for each input span, in input order
    pub placeholders: Vec<String>,
}

/// Mints `[<TYPE><N>]` placeholders with per-type counters starting at 1
#[derive(Debug, Clone, Default)]
pub struct PlaceholderAssigner {
    normalization: NormalizationTable,
}

impl PlaceholderAssigner {
    /// Create an assigner with the given normalization table
    pub fn new(normalization: NormalizationTable) -> Self {
        Self { normalization }
    }

    /// Assign placeholders to `spans` walking them in order
    ///
    /// A value seen before reuses its placeholder. A new value advances its
    /// type's counter; counters skip any candidate that already occurs verbatim
    /// in `text` so restoration cannot confuse it with pre-existing content.
    ///
    /// # Errors
    ///
    /// Returns [`VeilError::InvalidInput`] if a span does not address `text`.
    pub fn assign(&self, text: &str, spans: &[Span]) -> Result<Assignment> {
        let mut counters: BTreeMap<EntityType, u32> = BTreeMap::new();
        let mut by_key: HashMap<(EntityType, String), String> = HashMap::new();
        let mut mapping = Mapping::new();
        let mut placeholders = Vec::with_capacity(spans.len());

        for span in spans {
            let raw = text
                .get(span.start..span.end)
                .filter(|_| span.start < span.end)
                .ok_or_else(|| {
                    VeilError::InvalidInput(format!(
                        "span {}..{} does not address the input text",
                        span.start, span.end
                    ))
                })?;

            if let Some(existing) = mapping.placeholder_for(raw) {
                placeholders.push(existing.to_string());
                continue;
            }

            let key = (span.label, self.normalization.key_for(span.label, raw));
            if let Some(existing) = by_key.get(&key) {
                // Variant of an already-mapped value; the first surface form owns the placeholder
                placeholders.push(existing.clone());
                continue;
            }

            let counter = counters.entry(span.label).or_insert(0);
            let placeholder = loop {
                *counter += 1;
                let candidate = format_placeholder(span.label, *counter);
                if !text.contains(&candidate) {
                    break candidate;
                }
            };

            mapping.insert(raw, &placeholder)?;
            by_key.insert(key, placeholder.clone());
            placeholders.push(placeholder);
        }

        Ok(Assignment {
            mapping,
            placeholders,
        })
    }
}

/// Render the placeholder token for the `n`th value of `entity`
pub fn format_placeholder(entity: EntityType, n: u32) -> String {
    format!("[{}{}]", entity.label(), n)
}
