//! Domain error types
//!
//! This module defines the error hierarchy for Veil. Errors are domain-specific
//! and don't expose third-party types: HTTP and parser failures are converted
//! into [`DetectorError`] or [`VeilError`] variants at the boundary.

use thiserror::Error;

/// Main Veil error type
///
/// Detection problems never surface through this type from
/// [`anonymize`](crate::anonymization::AnonymizationEngine::anonymize); the engine
/// degrades to pattern-only detection instead. The fatal conditions are invalid
/// input, invalid mappings on restoration, and configuration errors.
#[derive(Debug, Error)]
pub enum VeilError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Entity detector errors
    #[error("Detector error: {0}")]
    Detector(#[from] DetectorError),

    /// Mapping supplied for restoration is not a well-formed string-to-string association
    #[error("Invalid mapping: {0}")]
    InvalidMapping(String),

    /// Structurally invalid input payload
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// Contextual detector errors
///
/// Every variant is recoverable: the engine logs it, records it in the
/// outcome status and continues with pattern-detected spans only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectorError {
    /// The external model service could not be reached
    #[error("Detector unavailable: {0}")]
    Unavailable(String),

    /// The external call exceeded its time budget
    #[error("Detector timed out after {0} ms")]
    Timeout(u64),

    /// The pending call was cancelled by the caller
    #[error("Detector call cancelled")]
    Cancelled,

    /// The response could not be parsed into entity records
    #[error("Malformed detector response: {0}")]
    MalformedResponse(String),
}

impl DetectorError {
    /// Whether this error means the service itself could not be used
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_) | Self::Cancelled)
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for VeilError {
    fn from(err: std::io::Error) -> Self {
        VeilError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for VeilError {
    fn from(err: serde_json::Error) -> Self {
        VeilError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for VeilError {
    fn from(err: toml::de::Error) -> Self {
        VeilError::Configuration(format!("TOML parse error: {err}"))
    }
}

// Conversion from regex compile errors (pattern libraries)
impl From<regex::Error> for VeilError {
    fn from(err: regex::Error) -> Self {
        VeilError::Configuration(format!("Invalid regex: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_veil_error_display() {
        let err = VeilError::InvalidMapping("expected an object".to_string());
        assert_eq!(err.to_string(), "Invalid mapping: expected an object");
    }

    #[test]
    fn test_detector_error_conversion() {
        let detector_err = DetectorError::Unavailable("connection refused".to_string());
        let veil_err: VeilError = detector_err.into();
        assert!(matches!(veil_err, VeilError::Detector(_)));
    }

    #[test]
    fn test_detector_error_availability() {
        assert!(DetectorError::Unavailable("down".into()).is_unavailable());
        assert!(DetectorError::Timeout(100).is_unavailable());
        assert!(DetectorError::Cancelled.is_unavailable());
        assert!(!DetectorError::MalformedResponse("bad".into()).is_unavailable());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let veil_err: VeilError = io_err.into();
        assert!(matches!(veil_err, VeilError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let veil_err: VeilError = json_err.into();
        assert!(matches!(veil_err, VeilError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let veil_err: VeilError = toml_err.into();
        assert!(matches!(veil_err, VeilError::Configuration(_)));
        assert!(veil_err.to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_regex_error_conversion() {
        let regex_err = regex::Regex::new("(unclosed").unwrap_err();
        let veil_err: VeilError = regex_err.into();
        assert!(matches!(veil_err, VeilError::Configuration(_)));
    }

    #[test]
    fn test_veil_error_implements_std_error() {
        let err = VeilError::InvalidInput("Test error".to_string());
        let _: &dyn std::error::Error = &err;
    }
}
