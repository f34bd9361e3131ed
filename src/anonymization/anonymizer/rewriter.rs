//! Placeholder substitution

use super::placeholder::Assignment;
use crate::anonymization::models::Span;
use crate::domain::{Result, VeilError};

/// Builds the anonymized text from resolved spans
pub struct Rewriter;

impl Rewriter {
    /// Copy the gaps between `spans` into a fresh buffer, splicing in each span's placeholder
    ///
    /// Spans must be ordered by start and disjoint, and `assignment.placeholders`
    /// must be aligned with them. Offsets always refer to the original `text`.
    ///
    /// # Errors
    ///
    /// Returns [`VeilError::InvalidInput`] if the spans are unordered, overlap,
    /// fall outside `text`, or do not line up with the assignment.
    pub fn rewrite(text: &str, spans: &[Span], assignment: &Assignment) -> Result<String> {
        if spans.len() != assignment.placeholders.len() {
            return Err(VeilError::InvalidInput(format!(
                "{} spans but {} placeholders",
                spans.len(),
                assignment.placeholders.len()
            )));
        }

        let mut output = String::with_capacity(text.len());
        let mut cursor = 0;

        for (span, placeholder) in spans.iter().zip(&assignment.placeholders) {
            if span.start < cursor {
                return Err(VeilError::InvalidInput(format!(
                    "span {}..{} overlaps or precedes offset {}",
                    span.start, span.end, cursor
                )));
            }
            let gap = text.get(cursor..span.start).ok_or_else(|| out_of_bounds(span))?;
            if text.get(span.start..span.end).is_none() || span.start >= span.end {
                return Err(out_of_bounds(span));
            }
            output.push_str(gap);
            output.push_str(placeholder);
            cursor = span.end;
        }

        output.push_str(&text[cursor..]);
        Ok(output)
    }
}

fn out_of_bounds(span: &Span) -> VeilError {
    VeilError::InvalidInput(format!(
        "span {}..{} does not address the input text",
        span.start, span.end
    ))
}
