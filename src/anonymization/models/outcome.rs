//! Results returned by the anonymization engine

use super::{Mapping, Span};
use crate::domain::DetectorError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happened to the contextual detector during one call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ContextualStatus {
    /// Not requested, or no contextual detector configured
    Disabled,
    /// Ran to completion; `discarded` records failed validation
    Completed { discarded: usize },
    /// Service unreachable or returned an error status
    Unavailable { reason: String },
    /// Reply could not be interpreted at all
    MalformedResponse { reason: String },
    /// Call exceeded its time bound
    TimedOut { timeout_ms: u64 },
    /// Call was cancelled by the caller
    Cancelled,
}

impl ContextualStatus {
    /// Short machine-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Completed { .. } => "completed",
            Self::Unavailable { .. } => "unavailable",
            Self::MalformedResponse { .. } => "malformed_response",
            Self::TimedOut { .. } => "timed_out",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether the request fell back to pattern-only detection
    pub fn is_degraded(&self) -> bool {
        !matches!(self, Self::Disabled | Self::Completed { .. })
    }
}

impl From<&DetectorError> for ContextualStatus {
    fn from(err: &DetectorError) -> Self {
        match err {
            DetectorError::Unavailable(reason) => Self::Unavailable {
                reason: reason.clone(),
            },
            DetectorError::Timeout(ms) => Self::TimedOut { timeout_ms: *ms },
            DetectorError::Cancelled => Self::Cancelled,
            DetectorError::MalformedResponse(reason) => Self::MalformedResponse {
                reason: reason.clone(),
            },
        }
    }
}

/// Result of one anonymization call
///
/// The mapping is owned by the caller; the engine keeps nothing after returning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnonymizationOutcome {
    /// Identifier correlating logs and audit entries for this call
    pub request_id: Uuid,
    /// Text with every resolved span replaced by its placeholder
    pub anonymized_text: String,
    /// Raw value to placeholder mapping
    pub mapping: Mapping,
    /// Resolved spans, ordered by start, as byte offsets into the input
    pub spans: Vec<Span>,
    /// Contextual detector status
    pub contextual: ContextualStatus,
    /// Non-fatal problems encountered
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Wall-clock processing time
    pub processing_time_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_detector_error() {
        assert_eq!(
            ContextualStatus::from(&DetectorError::Timeout(500)),
            ContextualStatus::TimedOut { timeout_ms: 500 }
        );
        assert!(ContextualStatus::from(&DetectorError::Cancelled).is_degraded());
        assert!(!ContextualStatus::Completed { discarded: 2 }.is_degraded());
        assert!(!ContextualStatus::Disabled.is_degraded());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&ContextualStatus::Unavailable {
            reason: "connection refused".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"status":"unavailable","reason":"connection refused"}"#);

        for status in [
            ContextualStatus::Disabled,
            ContextualStatus::Completed { discarded: 0 },
            ContextualStatus::TimedOut { timeout_ms: 1 },
            ContextualStatus::Cancelled,
        ] {
            let value = serde_json::to_value(&status).unwrap();
            assert_eq!(value["status"], status.name());
        }
    }
}
