//! Per-type normalization of raw values into mapping keys
//!
//! Two surface forms with the same key are treated as one entity and share a
//! placeholder. Every type defaults to [`NormalizationRule::Exact`], which keeps
//! restoration byte-for-byte exact. Looser rules are opt-in per type:
//!
//! ```toml
//! [anonymization.normalization]
//! EMAIL = "case_insensitive"
//! PHONE = "digits_only"
//! ```

use crate::anonymization::models::EntityType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a raw value is reduced to its mapping key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationRule {
    /// Exact string identity
    #[default]
    Exact,
    /// Unicode lowercase
    CaseInsensitive,
    /// ASCII digits only; values without digits fall back to exact identity
    DigitsOnly,
    /// Runs of whitespace collapsed to one space, ends trimmed
    CollapseWhitespace,
}

impl NormalizationRule {
    /// Reduce `raw` to its key under this rule
    pub fn apply(&self, raw: &str) -> String {
        match self {
            Self::Exact => raw.to_string(),
            Self::CaseInsensitive => raw.to_lowercase(),
            Self::DigitsOnly => {
                let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
                if digits.is_empty() {
                    raw.to_string()
                } else {
                    digits
                }
            }
            Self::CollapseWhitespace => raw.split_whitespace().collect::<Vec<_>>().join(" "),
        }
    }
}

/// Normalization rule per entity type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizationTable {
    rules: BTreeMap<EntityType, NormalizationRule>,
}

impl NormalizationTable {
    /// Table with every type on exact identity
    pub fn exact() -> Self {
        Self::default()
    }

    /// Set the rule for one type
    pub fn with_rule(mut self, entity: EntityType, rule: NormalizationRule) -> Self {
        self.rules.insert(entity, rule);
        self
    }

    /// Rule in effect for `entity`
    pub fn rule_for(&self, entity: EntityType) -> NormalizationRule {
        self.rules.get(&entity).copied().unwrap_or_default()
    }

    /// Mapping key for `raw` detected as `entity`
    pub fn key_for(&self, entity: EntityType, raw: &str) -> String {
        self.rule_for(entity).apply(raw)
    }
}
