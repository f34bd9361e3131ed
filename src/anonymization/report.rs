//! Dry-run detection reporting
//!
//! A [`DetectionReport`] describes what an anonymization call would replace
//! without rewriting anything: counts per entity type and detector, spans lost
//! to overlap resolution, contextual detector status, and masked samples.

use crate::anonymization::models::{ContextualStatus, EntityType, Span, SpanSource};
use crate::anonymization::resolver::Resolution;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use uuid::Uuid;

const MAX_SAMPLES: usize = 20;

/// Detection statistics for one document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionReport {
    /// Request identifier
    pub request_id: Uuid,
    /// Input length in bytes
    pub text_length: usize,
    /// Spans reported by the pattern detector
    pub pattern_detections: usize,
    /// Spans reported by the contextual detector
    pub contextual_detections: usize,
    /// Spans that would be replaced
    pub resolved: usize,
    /// Candidates dropped in favour of an overlapping span
    pub overlap_losses: usize,
    /// Candidates dropped for not addressing the text
    pub invalid_spans: usize,
    /// Resolved spans per entity type
    pub detections_by_type: BTreeMap<EntityType, usize>,
    /// Resolved spans per detector
    pub detections_by_source: BTreeMap<SpanSource, usize>,
    /// Masked examples of resolved spans
    pub samples: Vec<DetectionSample>,
    /// Contextual detector status
    pub contextual: ContextualStatus,
    /// Non-fatal problems
    pub warnings: Vec<String>,
    /// Processing time
    pub processing_time_ms: u64,
}

/// One resolved span with its value masked
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionSample {
    /// Entity type
    pub label: EntityType,
    /// Detector that produced it
    pub source: SpanSource,
    /// Start byte offset
    pub start: usize,
    /// End byte offset
    pub end: usize,
    /// Value with its middle masked
    pub masked: String,
}

impl DetectionReport {
    /// Build a report from detector counts and a resolution
    pub fn new(
        request_id: Uuid,
        text: &str,
        pattern_detections: usize,
        contextual_detections: usize,
        resolution: &Resolution,
        contextual: ContextualStatus,
    ) -> Self {
        let mut detections_by_type = BTreeMap::new();
        let mut detections_by_source = BTreeMap::new();
        for span in &resolution.spans {
            *detections_by_type.entry(span.label).or_insert(0) += 1;
            *detections_by_source.entry(span.source).or_insert(0) += 1;
        }

        Self {
            request_id,
            text_length: text.len(),
            pattern_detections,
            contextual_detections,
            resolved: resolution.spans.len(),
            overlap_losses: resolution.overlap_losses,
            invalid_spans: resolution.invalid,
            detections_by_type,
            detections_by_source,
            samples: resolution
                .spans
                .iter()
                .take(MAX_SAMPLES)
                .map(DetectionSample::from)
                .collect(),
            contextual,
            warnings: Vec::new(),
            processing_time_ms: 0,
        }
    }

    /// Add a warning
    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Format report for console output
    pub fn format_console(&self) -> String {
        let mut output = String::new();
        let rule = "───────────────────────────────────────────────────────────────";

        let _ = writeln!(output);
        let _ = writeln!(output, "═══════════════════════════════════════════════════════════════");
        let _ = writeln!(output, "                   PII DETECTION DRY-RUN REPORT                ");
        let _ = writeln!(output, "═══════════════════════════════════════════════════════════════");
        let _ = writeln!(output);

        let _ = writeln!(output, "📊 SUMMARY");
        let _ = writeln!(output, "{rule}");
        let _ = writeln!(output, "  Request ID:                  {}", self.request_id);
        let _ = writeln!(output, "  Text Length (bytes):         {}", self.text_length);
        let _ = writeln!(output, "  Pattern Detections:          {}", self.pattern_detections);
        let _ = writeln!(output, "  Contextual Detections:       {}", self.contextual_detections);
        let _ = writeln!(output, "  Spans To Replace:            {}", self.resolved);
        let _ = writeln!(output, "  Lost To Overlap:             {}", self.overlap_losses);
        let _ = writeln!(output, "  Contextual Detector:         {}", self.contextual.name());
        let _ = writeln!(output, "  Processing Time:             {} ms", self.processing_time_ms);
        let _ = writeln!(output);

        if !self.detections_by_type.is_empty() {
            let _ = writeln!(output, "🔍 DETECTIONS BY TYPE");
            let _ = writeln!(output, "{rule}");

            let mut types: Vec<_> = self.detections_by_type.iter().collect();
            types.sort_by(|a, b| b.1.cmp(a.1));
            for (label, count) in types {
                let _ = writeln!(output, "  {:30} {:>5}", label.label(), count);
            }
            let _ = writeln!(output);
        }

        if !self.samples.is_empty() {
            let _ = writeln!(output, "📝 SAMPLES");
            let _ = writeln!(output, "{rule}");
            for sample in self.samples.iter().take(10) {
                let _ = writeln!(
                    output,
                    "  {:>6}..{:<6} {:14} {:10} \"{}\"",
                    sample.start,
                    sample.end,
                    sample.label.label(),
                    format!("{:?}", sample.source).to_lowercase(),
                    sample.masked
                );
            }
            let _ = writeln!(output);
        }

        if !self.warnings.is_empty() {
            let _ = writeln!(output, "⚠️  WARNINGS");
            let _ = writeln!(output, "{rule}");
            for warning in &self.warnings {
                let _ = writeln!(output, "  • {warning}");
            }
            let _ = writeln!(output);
        }

        let _ = writeln!(output, "═══════════════════════════════════════════════════════════════");
        output
    }

    /// Format report as JSON
    pub fn format_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl From<&Span> for DetectionSample {
    fn from(span: &Span) -> Self {
        Self {
            label: span.label,
            source: span.source,
            start: span.start,
            end: span.end,
            masked: mask_value(&span.raw_value),
        }
    }
}

/// Keep the first and last character of longer values, mask the rest
fn mask_value(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let mut masked = String::with_capacity(raw.len());
    masked.push(chars[0]);
    masked.push_str(&"*".repeat(chars.len() - 2));
    masked.push(chars[chars.len() - 1]);
    masked
}
