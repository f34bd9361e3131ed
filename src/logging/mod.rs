//! Logging and observability
//!
//! Structured logging via `tracing`:
//! - Human-readable console output on stderr
//! - Optional JSON log files with daily or hourly rotation
//!
//! Raw PII never reaches the logs; detections are logged by label and offset.
//!
//! # Example
//!
//! ```no_run
//! use veil::logging::init_logging;
//! use veil::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log that a detector failed and the request fell back to pattern-only detection
///
/// # Example
///
/// ```no_run
/// use veil::log_detector_degraded;
/// use veil::domain::DetectorError;
///
/// let error = DetectorError::Timeout(30_000);
/// log_detector_degraded!("contextual", &error);
/// ```
#[macro_export]
macro_rules! log_detector_degraded {
    ($detector:expr, $error:expr) => {
        tracing::warn!(
            detector = $detector,
            error = %$error,
            "Detector unavailable, continuing with pattern detection only"
        );
    };
}

/// Log the completion of an anonymization call
///
/// # Example
///
/// ```no_run
/// use veil::log_anonymization_complete;
/// use std::time::Duration;
///
/// log_anonymization_complete!("3f1c", 4, 3, Duration::from_millis(12));
/// ```
#[macro_export]
macro_rules! log_anonymization_complete {
    ($request_id:expr, $spans:expr, $entries:expr, $duration:expr) => {
        tracing::info!(
            request_id = %$request_id,
            spans = $spans,
            mapping_entries = $entries,
            duration_ms = $duration.as_millis() as u64,
            "Anonymization completed"
        );
    };
}

/// Log a placeholder-shaped token that has no mapping entry
///
/// # Example
///
/// ```no_run
/// use veil::log_unresolved_placeholder;
///
/// log_unresolved_placeholder!("[PERSON9]", 42);
/// ```
#[macro_export]
macro_rules! log_unresolved_placeholder {
    ($token:expr, $offset:expr) => {
        tracing::warn!(
            token = $token,
            offset = $offset,
            "Placeholder has no mapping entry, leaving it in place"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use veil::log_error_with_context;
/// use veil::domain::VeilError;
///
/// let error = VeilError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}
