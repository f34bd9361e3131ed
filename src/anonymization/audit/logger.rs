//! Audit logger for anonymization operations

use crate::anonymization::models::{AnonymizationOutcome, EntityType, SpanSource};
use crate::anonymization::restorer::RestoreOutcome;
use crate::domain::{Result, VeilError};
use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum AuditLogEntry<'a> {
    Anonymize {
        timestamp: String,
        request_id: Uuid,
        span_count: usize,
        contextual_status: &'a str,
        processing_time_ms: u64,
        spans: Vec<AuditSpan>,
        entries: Vec<AuditEntry<'a>>,
    },
    Deanonymize {
        timestamp: String,
        request_id: Uuid,
        replaced: usize,
        unresolved: Vec<&'a str>,
    },
}

#[derive(Debug, Serialize)]
struct AuditSpan {
    start: usize,
    end: usize,
    label: EntityType,
    source: SpanSource,
}

#[derive(Debug, Serialize)]
struct AuditEntry<'a> {
    placeholder: &'a str,
    /// SHA-256 hash of the raw value (never log plaintext PII)
    value_hash: String,
}

/// Append-only JSON-lines audit log
pub struct AuditLogger {
    log_path: PathBuf,
    write_lock: Mutex<()>,
}

impl AuditLogger {
    /// Create a new audit logger, creating the parent directory if needed
    pub fn new(log_path: impl Into<PathBuf>) -> Result<Self> {
        let log_path = log_path.into();
        if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                VeilError::Configuration(format!(
                    "Failed to create audit log directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        Ok(Self {
            log_path,
            write_lock: Mutex::new(()),
        })
    }

    /// Path of the audit log file
    pub fn path(&self) -> &Path {
        &self.log_path
    }

    /// Record an anonymization call
    pub fn log_anonymization(&self, outcome: &AnonymizationOutcome) -> Result<()> {
        let entry = AuditLogEntry::Anonymize {
            timestamp: Utc::now().to_rfc3339(),
            request_id: outcome.request_id,
            span_count: outcome.spans.len(),
            contextual_status: outcome.contextual.name(),
            processing_time_ms: outcome.processing_time_ms,
            spans: outcome
                .spans
                .iter()
                .map(|s| AuditSpan {
                    start: s.start,
                    end: s.end,
                    label: s.label,
                    source: s.source,
                })
                .collect(),
            entries: outcome
                .mapping
                .iter()
                .map(|(raw, placeholder)| AuditEntry {
                    placeholder,
                    value_hash: hash_pii_value(raw),
                })
                .collect(),
        };

        self.write_entry(&entry)
    }

    /// Record a restoration call
    pub fn log_restoration(&self, request_id: Uuid, outcome: &RestoreOutcome) -> Result<()> {
        let entry = AuditLogEntry::Deanonymize {
            timestamp: Utc::now().to_rfc3339(),
            request_id,
            replaced: outcome.replaced,
            unresolved: outcome
                .unresolved
                .iter()
                .map(|u| u.token.as_str())
                .collect(),
        };

        self.write_entry(&entry)
    }

    fn write_entry(&self, entry: &AuditLogEntry<'_>) -> Result<()> {
        let json_line = serde_json::to_string(entry)?;

        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| VeilError::Other("audit log lock poisoned".to_string()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;
        writeln!(file, "{json_line}")?;

        Ok(())
    }
}

/// Hash a PII value using SHA-256
pub fn hash_pii_value(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    format!("{:x}", hasher.finalize())
}
