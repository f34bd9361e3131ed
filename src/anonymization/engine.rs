//! Main anonymization engine
//!
//! [`AnonymizationEngine`] runs the full pipeline for one document:
//!
//! ```text
//! text ─┬─ pattern detector ────┐
//!       └─ contextual detector ─┴─ resolver ─ placeholder assigner ─ rewriter
//! ```
//!
//! and the inverse path, which needs only the anonymized text and its mapping.
//!
//! Detection failures never fail a call. If the contextual detector is
//! unreachable, slow, cancelled or answers nonsense, the call completes with
//! pattern spans alone and reports the degradation in
//! [`AnonymizationOutcome::contextual`].
//!
//! Every call is self-contained: counters, mappings and buffers are local to the
//! call, so one engine can be shared across tasks behind an `Arc`.
//!
//! # Examples
//!
//! ```no_run
//! use veil::anonymization::{AnonymizationEngine, AnonymizationConfig};
//!
//! # async fn example() -> veil::domain::Result<()> {
//! let engine = AnonymizationEngine::new(&AnonymizationConfig::default())?;
//!
//! let outcome = engine
//!     .anonymize("Write to jane@example.com", false)
//!     .await?;
//! assert_eq!(outcome.anonymized_text, "Write to [EMAIL1]");
//!
//! let restored = engine.deanonymize_with_mapping(&outcome.anonymized_text, &outcome.mapping);
//! assert_eq!(restored.restored_text, "Write to jane@example.com");
//! # Ok(())
//! # }
//! ```

use crate::anonymization::{
    anonymizer::{NormalizationTable, PlaceholderAssigner, Rewriter},
    audit::AuditLogger,
    config::AnonymizationConfig,
    detector::{
        contextual::ContextualDetector, patterns::PatternRegistry, regex::RegexDetector,
        DetectorOutput, EntityDetector,
    },
    models::{AnonymizationOutcome, ContextualStatus, Mapping, Span},
    report::DetectionReport,
    resolver::{Resolution, SpanResolver},
    restorer::{RestoreOutcome, Restorer},
};
use crate::domain::{DetectorError, Result, VeilError};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, warn};
use uuid::Uuid;

/// Spans gathered from both detectors before resolution
struct Detection {
    pattern: Vec<Span>,
    contextual: Vec<Span>,
    status: ContextualStatus,
    warnings: Vec<String>,
}

/// Main anonymization engine
pub struct AnonymizationEngine {
    pattern_detector: Arc<dyn EntityDetector>,
    contextual_detector: Option<Arc<dyn EntityDetector>>,
    resolver: SpanResolver,
    assigner: PlaceholderAssigner,
    restorer: Restorer,
    audit_logger: Option<AuditLogger>,
}

impl AnonymizationEngine {
    /// Create an engine from configuration
    ///
    /// Loads the pattern library (built-in rules unless a file is configured),
    /// prepares the contextual detector client and opens the audit log if enabled.
    /// Whether the contextual detector is consulted is decided per call.
    ///
    /// # Errors
    ///
    /// Returns [`VeilError::Configuration`] if validation fails or the pattern
    /// library cannot be loaded.
    pub fn new(config: &AnonymizationConfig) -> Result<Self> {
        config.validate().map_err(|e| {
            VeilError::Configuration(format!("Invalid anonymization configuration: {e:#}"))
        })?;

        let pattern_detector: Arc<dyn EntityDetector> = match config.pattern_library {
            Some(ref path) => Arc::new(RegexDetector::with_registry(PatternRegistry::from_file(
                path,
            )?)),
            None => Arc::new(RegexDetector::new()?),
        };
        let contextual_detector: Arc<dyn EntityDetector> =
            Arc::new(ContextualDetector::new(&config.contextual)?);

        let mut engine = Self::with_detectors(pattern_detector, Some(contextual_detector))?
            .with_normalization(config.normalization.clone());

        if config.audit.enabled {
            engine = engine.with_audit_logger(AuditLogger::new(config.audit.log_path.clone())?);
        }

        Ok(engine)
    }

    /// Create an engine around arbitrary detectors
    pub fn with_detectors(
        pattern_detector: Arc<dyn EntityDetector>,
        contextual_detector: Option<Arc<dyn EntityDetector>>,
    ) -> Result<Self> {
        Ok(Self {
            pattern_detector,
            contextual_detector,
            resolver: SpanResolver,
            assigner: PlaceholderAssigner::default(),
            restorer: Restorer::new()?,
            audit_logger: None,
        })
    }

    /// Use `table` to decide which surface forms share a placeholder
    pub fn with_normalization(mut self, table: NormalizationTable) -> Self {
        self.assigner = PlaceholderAssigner::new(table);
        self
    }

    /// Record every call in `logger`
    pub fn with_audit_logger(mut self, logger: AuditLogger) -> Self {
        self.audit_logger = Some(logger);
        self
    }

    /// Whether a contextual detector is available
    pub fn has_contextual_detector(&self) -> bool {
        self.contextual_detector.is_some()
    }

    /// Anonymize `text`
    ///
    /// # Errors
    ///
    /// Detection problems are never errors. An error means a detector produced
    /// spans that cannot be applied to `text`.
    pub async fn anonymize(&self, text: &str, use_contextual: bool) -> Result<AnonymizationOutcome> {
        self.run(text, use_contextual, None).await
    }

    /// Anonymize `text`, abandoning the contextual call once `cancel` turns `true`
    ///
    /// A cancelled call still completes with pattern spans.
    pub async fn anonymize_with_cancel(
        &self,
        text: &str,
        use_contextual: bool,
        cancel: watch::Receiver<bool>,
    ) -> Result<AnonymizationOutcome> {
        self.run(text, use_contextual, Some(cancel)).await
    }

    /// Anonymize many documents, each as an independent call
    ///
    /// Results come back in input order. At most `concurrency` calls run at once.
    pub async fn anonymize_batch(
        &self,
        texts: Vec<String>,
        use_contextual: bool,
        concurrency: usize,
    ) -> Vec<Result<AnonymizationOutcome>> {
        let mut results: Vec<(usize, Result<AnonymizationOutcome>)> =
            stream::iter(texts.into_iter().enumerate())
                .map(|(index, text)| async move {
                    (index, self.anonymize(&text, use_contextual).await)
                })
                .buffer_unordered(concurrency.max(1))
                .collect()
                .await;

        results.sort_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, result)| result).collect()
    }

    /// Detect and resolve without rewriting
    pub async fn scan(&self, text: &str, use_contextual: bool) -> Result<DetectionReport> {
        let started = Instant::now();
        let detection = self.detect(text, use_contextual, None).await;
        let pattern_count = detection.pattern.len();
        let contextual_count = detection.contextual.len();
        let resolution = self
            .resolver
            .resolve(text, detection.pattern, detection.contextual);

        let mut report = DetectionReport::new(
            Uuid::new_v4(),
            text,
            pattern_count,
            contextual_count,
            &resolution,
            detection.status,
        );
        for warning in detection.warnings {
            report.add_warning(warning);
        }
        report.processing_time_ms = started.elapsed().as_millis() as u64;
        Ok(report)
    }

    /// Restore `anonymized` using a loosely-typed mapping
    ///
    /// # Errors
    ///
    /// Returns [`VeilError::InvalidMapping`] if `mapping` is not a flat object of
    /// string values with distinct placeholders.
    pub fn deanonymize(
        &self,
        anonymized: &str,
        mapping: &serde_json::Value,
    ) -> Result<RestoreOutcome> {
        let mapping = Mapping::from_value(mapping)?;
        Ok(self.deanonymize_with_mapping(anonymized, &mapping))
    }

    /// Restore `anonymized` using a typed mapping
    pub fn deanonymize_with_mapping(&self, anonymized: &str, mapping: &Mapping) -> RestoreOutcome {
        let outcome = self.restorer.restore(anonymized, mapping);

        if let Some(ref logger) = self.audit_logger {
            if let Err(e) = logger.log_restoration(Uuid::new_v4(), &outcome) {
                crate::log_error_with_context!(&e, "Failed to write audit entry");
            }
        }

        outcome
    }

    async fn run(
        &self,
        text: &str,
        use_contextual: bool,
        cancel: Option<watch::Receiver<bool>>,
    ) -> Result<AnonymizationOutcome> {
        let started = Instant::now();
        let request_id = Uuid::new_v4();

        let detection = self.detect(text, use_contextual, cancel).await;
        let Resolution { spans, .. } =
            self.resolver
                .resolve(text, detection.pattern, detection.contextual);

        let assignment = self.assigner.assign(text, &spans)?;
        let anonymized_text = Rewriter::rewrite(text, &spans, &assignment)?;

        let mut outcome = AnonymizationOutcome {
            request_id,
            anonymized_text,
            mapping: assignment.mapping,
            spans,
            contextual: detection.status,
            warnings: detection.warnings,
            processing_time_ms: started.elapsed().as_millis() as u64,
        };

        if let Some(ref logger) = self.audit_logger {
            if let Err(e) = logger.log_anonymization(&outcome) {
                crate::log_error_with_context!(&e, "Failed to write audit entry");
                outcome.warnings.push(format!("audit log not written: {e}"));
            }
        }

        crate::log_anonymization_complete!(
            request_id,
            outcome.spans.len(),
            outcome.mapping.len(),
            started.elapsed()
        );

        Ok(outcome)
    }

    async fn detect(
        &self,
        text: &str,
        use_contextual: bool,
        cancel: Option<watch::Receiver<bool>>,
    ) -> Detection {
        let (pattern, contextual) = tokio::join!(
            self.pattern_detector.detect(text),
            self.detect_contextual(text, use_contextual, cancel)
        );

        let mut warnings = Vec::new();
        let pattern = match pattern {
            Ok(output) => output.spans,
            Err(e) => {
                crate::log_detector_degraded!(self.pattern_detector.name(), &e);
                warnings.push(format!("pattern detector failed: {e}"));
                Vec::new()
            }
        };

        let (contextual, status) = match contextual {
            None => (Vec::new(), ContextualStatus::Disabled),
            Some(Ok(DetectorOutput { spans, discarded })) => {
                if discarded > 0 {
                    warnings.push(format!(
                        "contextual detector returned {discarded} record(s) that failed validation"
                    ));
                }
                (spans, ContextualStatus::Completed { discarded })
            }
            Some(Err(e)) => {
                crate::log_detector_degraded!("contextual", &e);
                warnings.push(format!(
                    "contextual detector unavailable, pattern detection only: {e}"
                ));
                (Vec::new(), ContextualStatus::from(&e))
            }
        };

        debug!(
            pattern_spans = pattern.len(),
            contextual_spans = contextual.len(),
            contextual_status = status.name(),
            "Detection finished"
        );

        Detection {
            pattern,
            contextual,
            status,
            warnings,
        }
    }

    async fn detect_contextual(
        &self,
        text: &str,
        use_contextual: bool,
        cancel: Option<watch::Receiver<bool>>,
    ) -> Option<std::result::Result<DetectorOutput, DetectorError>> {
        if !use_contextual {
            return None;
        }
        let Some(detector) = self.contextual_detector.as_ref() else {
            warn!("Contextual detection requested but no contextual detector is configured");
            return Some(Err(DetectorError::Unavailable(
                "no contextual detector configured".to_string(),
            )));
        };

        let Some(mut cancel) = cancel else {
            return Some(detector.detect(text).await);
        };
        if *cancel.borrow() {
            return Some(Err(DetectorError::Cancelled));
        }

        Some(tokio::select! {
            result = detector.detect(text) => result,
            _ = cancelled(&mut cancel) => Err(DetectorError::Cancelled),
        })
    }
}

/// Resolve once the watched flag becomes `true`; never resolve if the sender goes away
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
        if *cancel.borrow() {
            return;
        }
    }
}
