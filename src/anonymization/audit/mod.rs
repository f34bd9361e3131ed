//! Audit logging module
//!
//! Appends one JSON line per anonymize or deanonymize call. Raw values are
//! recorded only as SHA-256 hashes.

pub mod logger;

pub use logger::AuditLogger;
