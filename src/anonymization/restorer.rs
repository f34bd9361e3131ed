//! Placeholder restoration
//!
//! Restoration is a single left-to-right scan for placeholder-shaped tokens.
//! Restored values are written straight to the output and never rescanned, so
//! a raw value that itself looks like a placeholder cannot trigger a second
//! substitution. Tokens with no mapping entry are left as they are.

use crate::anonymization::models::Mapping;
use crate::domain::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Placeholder-shaped token: `[` uppercase label segments, digits, `]`
pub const PLACEHOLDER_PATTERN: &str = r"\[[A-Z]+(?:_[A-Z]+)*[0-9]+\]";

/// Placeholder-shaped token with no mapping entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedPlaceholder {
    /// The token as it appears in the text
    pub token: String,
    /// Byte offset of the token in the anonymized text
    pub offset: usize,
}

/// Result of restoring a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreOutcome {
    /// Text with every known placeholder replaced
    pub restored_text: String,
    /// Number of placeholders replaced
    pub replaced: usize,
    /// Tokens left untouched, one entry per occurrence
    pub unresolved: Vec<UnresolvedPlaceholder>,
}

/// Inverse of anonymization given only the text and its mapping
#[derive(Debug, Clone)]
pub struct Restorer {
    token: Regex,
}

impl Restorer {
    /// Compile the placeholder scanner
    ///
    /// # Errors
    ///
    /// Returns [`VeilError::Configuration`](crate::domain::VeilError::Configuration) if the token pattern fails to compile.
    pub fn new() -> Result<Self> {
        Ok(Self {
            token: Regex::new(PLACEHOLDER_PATTERN)?,
        })
    }

    /// Replace placeholders in `anonymized` using `mapping`
    pub fn restore(&self, anonymized: &str, mapping: &Mapping) -> RestoreOutcome {
        let mut restored = String::with_capacity(anonymized.len());
        let mut unresolved = Vec::new();
        let mut replaced = 0;
        let mut cursor = 0;

        for found in self.token.find_iter(anonymized) {
            restored.push_str(&anonymized[cursor..found.start()]);
            match mapping.raw_value_for(found.as_str()) {
                Some(raw) => {
                    restored.push_str(raw);
                    replaced += 1;
                }
                None => {
                    crate::log_unresolved_placeholder!(found.as_str(), found.start());
                    restored.push_str(found.as_str());
                    unresolved.push(UnresolvedPlaceholder {
                        token: found.as_str().to_string(),
                        offset: found.start(),
                    });
                }
            }
            cursor = found.end();
        }
        restored.push_str(&anonymized[cursor..]);

        RestoreOutcome {
            restored_text: restored,
            replaced,
            unresolved,
        }
    }

    /// Parse a loosely-typed mapping and restore with it
    ///
    /// # Errors
    ///
    /// Returns [`VeilError::InvalidMapping`](crate::domain::VeilError::InvalidMapping) if `mapping` is not a flat object of
    /// strings or two keys share a placeholder.
    pub fn restore_value(
        &self,
        anonymized: &str,
        mapping: &serde_json::Value,
    ) -> Result<RestoreOutcome> {
        let mapping = Mapping::from_value(mapping)?;
        Ok(self.restore(anonymized, &mapping))
    }
}
