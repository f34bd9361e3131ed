//! Pattern library for PII detection

use crate::anonymization::models::EntityType;
use crate::domain::{Result, VeilError};
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Pattern definition from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct PatternDefinition {
    /// Regex patterns for this rule
    pub patterns: Vec<String>,
    /// Entity type label
    pub category: String,
    /// Rules can be switched off without deleting them
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// One detection rule: an entity type and the regexes that recognize it
#[derive(Debug, Clone)]
pub struct PatternRule {
    /// Rule name (the TOML table key)
    pub name: String,
    /// Entity type every match is tagged with
    pub entity: EntityType,
    /// Compiled regexes
    pub regexes: Vec<Regex>,
}

/// Pattern library container
#[derive(Debug, Deserialize)]
struct PatternLibrary {
    patterns: BTreeMap<String, PatternDefinition>,
}

/// Pattern registry for PII detection
///
/// Rules are kept in name order so detection output never depends on
/// hash-map iteration order.
#[derive(Debug, Clone)]
pub struct PatternRegistry {
    rules: Vec<PatternRule>,
}

impl PatternRegistry {
    /// Create a new pattern registry from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            VeilError::Configuration(format!(
                "Failed to read pattern library {}: {e}",
                path.as_ref().display()
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Create a pattern registry from TOML content
    pub fn from_toml(content: &str) -> Result<Self> {
        let library: PatternLibrary = toml::from_str(content)?;

        let mut rules = Vec::with_capacity(library.patterns.len());
        for (name, def) in library.patterns {
            if !def.enabled {
                tracing::debug!(rule = %name, "Pattern rule disabled");
                continue;
            }

            let entity = EntityType::from_label(&def.category).ok_or_else(|| {
                VeilError::Configuration(format!(
                    "Invalid category in pattern '{name}': {}",
                    def.category
                ))
            })?;

            let regexes = def
                .patterns
                .iter()
                .map(|pattern| {
                    Regex::new(pattern).map_err(|e| {
                        VeilError::Configuration(format!(
                            "Invalid regex in pattern '{name}': {pattern}: {e}"
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            if regexes.is_empty() {
                return Err(VeilError::Configuration(format!(
                    "Pattern '{name}' defines no regexes"
                )));
            }

            rules.push(PatternRule {
                name,
                entity,
                regexes,
            });
        }

        Ok(Self { rules })
    }

    /// Create a default pattern registry with built-in patterns
    pub fn default_patterns() -> Result<Self> {
        let default_toml = include_str!("../../../../patterns/pii_patterns.toml");
        Self::from_toml(default_toml)
    }

    /// Get all rules
    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }

    /// Get the rules for a specific entity type
    pub fn rules_for(&self, entity: EntityType) -> impl Iterator<Item = &PatternRule> {
        self.rules.iter().filter(move |rule| rule.entity == entity)
    }

    /// Entity types with at least one rule
    pub fn entity_types(&self) -> Vec<EntityType> {
        let mut types: Vec<EntityType> = self.rules.iter().map(|r| r.entity).collect();
        types.sort();
        types.dedup();
        types
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_default_patterns() {
        let registry = PatternRegistry::default_patterns().unwrap();
        assert!(!registry.rules().is_empty());
        assert!(!registry.entity_types().contains(&EntityType::Person));
    }

    #[test]
    fn test_email_pattern() {
        let registry = PatternRegistry::default_patterns().unwrap();
        let rule = registry.rules_for(EntityType::Email).next().unwrap();

        assert!(rule.regexes[0].is_match("test@example.com"));
        assert!(!rule.regexes[0].is_match("not-an-email"));
    }

    #[test]
    fn test_phone_pattern() {
        let registry = PatternRegistry::default_patterns().unwrap();
        let text = "Call me at (555) 123-4567";
        let has_match = registry
            .rules_for(EntityType::Phone)
            .flat_map(|r| r.regexes.iter())
            .any(|re| re.is_match(text));
        assert!(has_match);
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        let toml = r#"
[patterns.salary]
category = "SALARY"
patterns = ['\$[0-9]+']
"#;
        assert!(matches!(
            PatternRegistry::from_toml(toml),
            Err(VeilError::Configuration(_))
        ));
    }

    #[test]
    fn test_invalid_regex_is_rejected() {
        let toml = r#"
[patterns.broken]
category = "OTHER"
patterns = ['(unclosed']
"#;
        let err = PatternRegistry::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_disabled_rule_is_skipped() {
        let toml = r#"
[patterns.employee_id]
category = "OTHER"
patterns = ['EMP-[0-9]{5}']
enabled = false

[patterns.ssn]
category = "SSN"
patterns = ['\b[0-9]{3}-[0-9]{2}-[0-9]{4}\b']
"#;
        let registry = PatternRegistry::from_toml(toml).unwrap();
        assert_eq!(registry.rules().len(), 1);
        assert_eq!(registry.rules()[0].entity, EntityType::Ssn);
    }
}
