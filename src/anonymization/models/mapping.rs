//! Reversible value ⇄ placeholder mapping

use crate::domain::{Result, VeilError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Bijective association between raw PII values and placeholder tokens
///
/// This is the only state needed to restore an anonymized document. It persists as
/// a flat JSON object `{"<raw value>": "[TYPE<N>]"}`; keys are written in sorted
/// order so the same run always serializes to the same bytes.
///
/// # Examples
///
/// ```
/// use veil::anonymization::models::Mapping;
///
/// let mut mapping = Mapping::new();
/// mapping.insert("jane@example.com", "[EMAIL1]")?;
///
/// assert_eq!(mapping.placeholder_for("jane@example.com"), Some("[EMAIL1]"));
/// assert_eq!(mapping.raw_value_for("[EMAIL1]"), Some("jane@example.com"));
///
/// // A second value can never take an existing placeholder
/// assert!(mapping.insert("john@example.com", "[EMAIL1]").is_err());
/// # Ok::<(), veil::domain::VeilError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, String>",
    into = "BTreeMap<String, String>"
)]
pub struct Mapping {
    forward: BTreeMap<String, String>,
    reverse: HashMap<String, String>,
}

impl Mapping {
    /// Create an empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate a raw value with a placeholder
    ///
    /// Re-inserting an identical pair is a no-op. Any insert that would make a
    /// raw value carry two placeholders, or a placeholder stand for two raw
    /// values, fails with [`VeilError::InvalidMapping`].
    pub fn insert(&mut self, raw: impl Into<String>, placeholder: impl Into<String>) -> Result<()> {
        let raw = raw.into();
        let placeholder = placeholder.into();

        if let Some(existing) = self.forward.get(&raw) {
            if *existing == placeholder {
                return Ok(());
            }
            return Err(VeilError::InvalidMapping(format!(
                "value is already mapped to {existing}, cannot also map it to {placeholder}"
            )));
        }
        if self.reverse.contains_key(&placeholder) {
            return Err(VeilError::InvalidMapping(format!(
                "placeholder {placeholder} is assigned to more than one value"
            )));
        }

        self.reverse.insert(placeholder.clone(), raw.clone());
        self.forward.insert(raw, placeholder);
        Ok(())
    }

    /// Placeholder assigned to a raw value
    pub fn placeholder_for(&self, raw: &str) -> Option<&str> {
        self.forward.get(raw).map(String::as_str)
    }

    /// Raw value behind a placeholder
    pub fn raw_value_for(&self, placeholder: &str) -> Option<&str> {
        self.reverse.get(placeholder).map(String::as_str)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// Whether the mapping has no entries
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Iterate `(raw value, placeholder)` pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.forward.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Build a mapping from an untyped JSON value
    ///
    /// # Errors
    ///
    /// Returns [`VeilError::InvalidMapping`] if the value is not an object, any
    /// value is not a string, or two keys share a placeholder.
    pub fn from_value(value: &Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| {
            VeilError::InvalidMapping(format!(
                "expected a JSON object of string values, got {}",
                json_kind(value)
            ))
        })?;

        let mut mapping = Self::new();
        for (raw, placeholder) in object {
            let placeholder = placeholder.as_str().ok_or_else(|| {
                VeilError::InvalidMapping(format!(
                    "value for a mapping key is {}, expected a string",
                    json_kind(placeholder)
                ))
            })?;
            mapping.insert(raw.clone(), placeholder)?;
        }
        Ok(mapping)
    }

    /// Parse a mapping from JSON text
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| VeilError::InvalidMapping(format!("mapping is not valid JSON: {e}")))?;
        Self::from_value(&value)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.forward)?)
    }

    /// Write the mapping to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json_pretty()?).map_err(|e| {
            VeilError::Io(format!("Failed to write mapping {}: {e}", path.display()))
        })?;
        tracing::debug!(path = %path.display(), entries = self.len(), "Mapping saved");
        Ok(())
    }

    /// Read a mapping from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            VeilError::Io(format!("Failed to read mapping {}: {e}", path.display()))
        })?;
        Self::from_json_str(&content)
    }
}

impl TryFrom<BTreeMap<String, String>> for Mapping {
    type Error = VeilError;

    fn try_from(entries: BTreeMap<String, String>) -> Result<Self> {
        let mut mapping = Self::new();
        for (raw, placeholder) in entries {
            mapping.insert(raw, placeholder)?;
        }
        Ok(mapping)
    }
}

impl From<Mapping> for BTreeMap<String, String> {
    fn from(mapping: Mapping) -> Self {
        mapping.forward
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
