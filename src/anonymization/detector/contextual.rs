//! Model-backed contextual detector
//!
//! Sends the document to an Ollama-compatible generation endpoint and turns the
//! reply into [`Span`]s. The model is treated as an untrusted black box:
//!
//! - transport failures, non-success statuses and timeouts become
//!   [`DetectorError::Unavailable`] / [`DetectorError::Timeout`];
//! - a reply with no recoverable JSON becomes [`DetectorError::MalformedResponse`];
//! - individual records with bad offsets, empty text, text that does not occur in
//!   the document, or (under [`UnknownLabelPolicy::Reject`]) unknown labels are
//!   dropped and counted in [`DetectorOutput::discarded`].
//!
//! # Wire format
//!
//! Request: `POST {endpoint}/api/generate` with
//! `{"model", "prompt", "stream": false, "format": "json", "options": {"temperature"}}`.
//!
//! Reply: either `{"response": "<json text>"}` (Ollama) or the entity envelope
//! directly. The envelope is `{"entities": [...]}` or a bare array of records:
//!
//! ```json
//! {"entities": [{"start": 8, "end": 16, "label": "PERSON", "matched_text": "John Doe"}]}
//! ```
//!
//! `start`/`end` are character offsets. Records may omit them and carry only
//! `text`/`matched_text`, in which case every occurrence in the document is
//! tagged. Unknown fields are ignored.

use super::{select_non_overlapping, DetectorOutput, EntityDetector};
use crate::anonymization::config::{ContextualConfig, UnknownLabelPolicy};
use crate::anonymization::models::{EntityType, Span, SpanSource};
use crate::config::SecretString;
use crate::domain::{DetectorError, Result, VeilError};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Request format for the generation endpoint
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    format: &'static str,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

/// One entity record as returned by the model
#[derive(Debug, Clone, Deserialize)]
struct EntityRecord {
    #[serde(default)]
    start: Option<i64>,
    #[serde(default)]
    end: Option<i64>,
    label: String,
    #[serde(default, alias = "text")]
    matched_text: Option<String>,
}

/// Model-backed entity detector
pub struct ContextualDetector {
    client: Client,
    endpoint: String,
    model: String,
    temperature: f32,
    timeout: Duration,
    api_key: Option<SecretString>,
    unknown_labels: UnknownLabelPolicy,
}

impl ContextualDetector {
    /// Create a detector from configuration
    ///
    /// # Errors
    ///
    /// Returns [`VeilError::Configuration`] if the HTTP client cannot be built.
    pub fn new(config: &ContextualConfig) -> Result<Self> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()
            .map_err(|e| VeilError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            timeout,
            api_key: config.api_key.clone(),
            unknown_labels: config.unknown_labels,
        })
    }

    /// Base URL of the model service
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Model selector sent with each request
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Check whether the model service is reachable
    pub async fn health_check(&self) -> std::result::Result<(), DetectorError> {
        let url = format!("{}/api/tags", self.endpoint);
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if response.status().is_success() {
            debug!(endpoint = %self.endpoint, "Model service health check passed");
            Ok(())
        } else {
            Err(DetectorError::Unavailable(format!(
                "health check returned {}",
                response.status()
            )))
        }
    }

    /// Ask the model for entities and return its raw reply body
    async fn request_entities(&self, text: &str) -> std::result::Result<Value, DetectorError> {
        let url = format!("{}/api/generate", self.endpoint);
        let request = GenerateRequest {
            model: &self.model,
            prompt: build_prompt(text),
            stream: false,
            format: "json",
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };

        let response = self
            .authorized(self.client.post(&url))
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DetectorError::Unavailable(format!(
                "model service returned {status}"
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| DetectorError::MalformedResponse(format!("reply body is not JSON: {e}")))
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key.expose_secret()),
            None => request,
        }
    }

    fn transport_error(&self, err: reqwest::Error) -> DetectorError {
        if err.is_timeout() {
            DetectorError::Timeout(self.timeout.as_millis() as u64)
        } else {
            DetectorError::Unavailable(err.to_string())
        }
    }

    /// Validate a reply body against `text` and convert it into spans
    pub fn parse_reply(
        &self,
        text: &str,
        body: &Value,
    ) -> std::result::Result<DetectorOutput, DetectorError> {
        let records = match body.get("response") {
            Some(Value::String(inner)) => extract_records(&parse_embedded_json(inner)?)?,
            _ => extract_records(body)?,
        };
        Ok(self.records_to_spans(text, records))
    }

    fn records_to_spans(&self, text: &str, records: Vec<Value>) -> DetectorOutput {
        let char_starts: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();

        let mut spans = Vec::new();
        let mut discarded = 0;

        for value in records {
            let record: EntityRecord = match serde_json::from_value(value) {
                Ok(record) => record,
                Err(e) => {
                    debug!(error = %e, "Dropping entity record with unexpected shape");
                    discarded += 1;
                    continue;
                }
            };

            let Some(entity) = self.map_label(&record.label) else {
                discarded += 1;
                continue;
            };

            match (record.start, record.end) {
                (Some(start), Some(end)) => {
                    match span_from_char_offsets(text, &char_starts, start, end, entity) {
                        Some(span)
                            if record
                                .matched_text
                                .as_deref()
                                .map_or(true, |m| m == span.raw_value) =>
                        {
                            spans.push(span)
                        }
                        _ => discarded += 1,
                    }
                }
                (None, None) => {
                    let located = record
                        .matched_text
                        .as_deref()
                        .map(|needle| locate_all(text, needle, entity))
                        .unwrap_or_default();
                    if located.is_empty() {
                        discarded += 1;
                    }
                    spans.extend(located);
                }
                _ => discarded += 1,
            }
        }

        DetectorOutput {
            spans: select_non_overlapping(spans),
            discarded,
        }
    }

    fn map_label(&self, label: &str) -> Option<EntityType> {
        match EntityType::from_label(label) {
            Some(entity) => Some(entity),
            None => match self.unknown_labels {
                UnknownLabelPolicy::Bucket => {
                    debug!(label = %label, "Bucketing unknown label into OTHER");
                    Some(EntityType::Other)
                }
                UnknownLabelPolicy::Reject => {
                    debug!(label = %label, "Rejecting unknown label");
                    None
                }
            },
        }
    }
}

#[async_trait]
impl EntityDetector for ContextualDetector {
    async fn detect(&self, text: &str) -> std::result::Result<DetectorOutput, DetectorError> {
        let started = Instant::now();

        let body = tokio::time::timeout(self.timeout, self.request_entities(text))
            .await
            .map_err(|_| DetectorError::Timeout(self.timeout.as_millis() as u64))??;

        let output = self.parse_reply(text, &body)?;

        if output.discarded > 0 {
            warn!(
                model = %self.model,
                discarded = output.discarded,
                "Contextual detector returned records that failed validation"
            );
        }
        debug!(
            model = %self.model,
            spans = output.spans.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Contextual detection finished"
        );

        Ok(output)
    }

    fn source(&self) -> SpanSource {
        SpanSource::Contextual
    }

    fn name(&self) -> &str {
        "contextual"
    }
}

fn build_prompt(text: &str) -> String {
    format!(
        r#"Extract personally identifying entities from the document below.

Document:
{text}

Entity labels:
- PERSON: names of people, e.g. "Jane Smith", "Mr. Doe"
- ORG: organization names, e.g. "Globex LLC"
- LOCATION: addresses, cities, regions, e.g. "742 Evergreen Terrace, Springfield, IL 62704"
- PHONE: phone numbers
- DATE: dates such as birth dates
- CREDIT_CARD: payment card numbers
- IP_ADDRESS: IP addresses
- PASSPORT, DRIVERS_LICENSE, BANK_ACCOUNT: document and account numbers

Reply with a single JSON object and nothing else:
{{"entities": [{{"text": "exact text from the document", "label": "PERSON"}}]}}

Rules:
- "text" must be copied exactly as it appears in the document
- do not include email addresses or social security numbers
- do not combine several entities into one record"#
    )
}

/// Parse JSON embedded in a model reply, tolerating chatter around it
fn parse_embedded_json(reply: &str) -> std::result::Result<Value, DetectorError> {
    if let Ok(value) = serde_json::from_str::<Value>(reply.trim()) {
        return Ok(value);
    }

    let (Some(open), Some(close)) = (reply.find('{'), reply.rfind('}')) else {
        return Err(DetectorError::MalformedResponse(
            "reply contains no JSON object".to_string(),
        ));
    };
    if open >= close {
        return Err(DetectorError::MalformedResponse(
            "reply contains no JSON object".to_string(),
        ));
    }

    serde_json::from_str::<Value>(&reply[open..=close])
        .map_err(|e| DetectorError::MalformedResponse(format!("embedded JSON is invalid: {e}")))
}

/// Pull the list of entity records out of an envelope
fn extract_records(envelope: &Value) -> std::result::Result<Vec<Value>, DetectorError> {
    match envelope {
        Value::Array(records) => Ok(records.clone()),
        Value::Object(map) => match map.get("entities") {
            Some(Value::Array(records)) => Ok(records.clone()),
            Some(other) => Err(DetectorError::MalformedResponse(format!(
                "\"entities\" must be an array, got {other}"
            ))),
            None => Err(DetectorError::MalformedResponse(
                "reply has no \"entities\" field".to_string(),
            )),
        },
        other => Err(DetectorError::MalformedResponse(format!(
            "unexpected reply shape: {other}"
        ))),
    }
}

fn span_from_char_offsets(
    text: &str,
    char_starts: &[usize],
    start: i64,
    end: i64,
    entity: EntityType,
) -> Option<Span> {
    let start = usize::try_from(start).ok()?;
    let end = usize::try_from(end).ok()?;
    if start >= end {
        return None;
    }
    let byte_start = *char_starts.get(start)?;
    let byte_end = *char_starts.get(end)?;
    Span::from_text(text, byte_start, byte_end, entity, SpanSource::Contextual)
}

/// Tag each non-overlapping occurrence of `needle`
///
/// Overlapping repeats (`"aa"` in `"aaa"`) would be collapsed by the
/// non-overlap sweep anyway, so only disjoint matches are produced.
fn locate_all(text: &str, needle: &str, entity: EntityType) -> Vec<Span> {
    if needle.trim().is_empty() {
        return Vec::new();
    }
    text.match_indices(needle)
        .filter_map(|(start, matched)| {
            Span::from_text(
                text,
                start,
                start + matched.len(),
                entity,
                SpanSource::Contextual,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn detector(policy: UnknownLabelPolicy) -> ContextualDetector {
        let config = ContextualConfig {
            enabled: true,
            unknown_labels: policy,
            ..ContextualConfig::default()
        };
        ContextualDetector::new(&config).unwrap()
    }

    #[test]
    fn test_parse_offsets_and_text() {
        let text = "Contact John Doe at Globex LLC.";
        let body = json!({"entities": [
            {"start": 8, "end": 16, "label": "PERSON", "matched_text": "John Doe"},
            {"text": "Globex LLC", "label": "ORGANIZATION", "confidence": 0.9}
        ]});

        let output = detector(UnknownLabelPolicy::Bucket)
            .parse_reply(text, &body)
            .unwrap();

        assert_eq!(output.discarded, 0);
        assert_eq!(output.spans.len(), 2);
        assert_eq!(output.spans[0].label, EntityType::Person);
        assert_eq!(output.spans[0].raw_value, "John Doe");
        assert_eq!(output.spans[1].label, EntityType::Org);
        assert_eq!(output.spans[1].source, SpanSource::Contextual);
    }

    #[test]
    fn test_ollama_envelope_with_chatter() {
        let text = "Jane Smith lives in Springfield.";
        let body = json!({
            "model": "llama3.2:3b",
            "response": "Sure! {\"entities\": [{\"text\": \"Jane Smith\", \"label\": \"PERSON\"}]} Hope this helps.",
            "done": true
        });

        let output = detector(UnknownLabelPolicy::Bucket)
            .parse_reply(text, &body)
            .unwrap();
        assert_eq!(output.spans.len(), 1);
        assert_eq!(output.spans[0].raw_value, "Jane Smith");
    }

    #[test]
    fn test_out_of_range_and_zero_length_are_discarded() {
        let text = "short";
        let body = json!([
            {"start": 2, "end": 99, "label": "PERSON"},
            {"start": 3, "end": 3, "label": "PERSON"},
            {"start": -1, "end": 2, "label": "PERSON"},
            {"start": 0, "end": 5, "label": "PERSON"}
        ]);

        let output = detector(UnknownLabelPolicy::Bucket)
            .parse_reply(text, &body)
            .unwrap();
        assert_eq!(output.discarded, 3);
        assert_eq!(output.spans.len(), 1);
    }

    #[test]
    fn test_offsets_are_character_based() {
        let text = "Café owner Zoë Martin";
        let body = json!([{"start": 11, "end": 21, "label": "PERSON", "matched_text": "Zoë Martin"}]);

        let output = detector(UnknownLabelPolicy::Bucket)
            .parse_reply(text, &body)
            .unwrap();
        assert_eq!(output.spans.len(), 1);
        assert_eq!(&text[output.spans[0].start..output.spans[0].end], "Zoë Martin");
    }

    #[test]
    fn test_mismatched_matched_text_is_discarded() {
        let text = "Contact John Doe";
        let body = json!([{"start": 0, "end": 7, "label": "PERSON", "matched_text": "John Doe"}]);

        let output = detector(UnknownLabelPolicy::Bucket)
            .parse_reply(text, &body)
            .unwrap();
        assert!(output.spans.is_empty());
        assert_eq!(output.discarded, 1);
    }

    #[test]
    fn test_unknown_label_policies() {
        let text = "Salary: 90000 USD";
        let body = json!([{"text": "90000 USD", "label": "MONEY"}]);

        let bucketed = detector(UnknownLabelPolicy::Bucket)
            .parse_reply(text, &body)
            .unwrap();
        assert_eq!(bucketed.spans[0].label, EntityType::Other);

        let rejected = detector(UnknownLabelPolicy::Reject)
            .parse_reply(text, &body)
            .unwrap();
        assert!(rejected.spans.is_empty());
        assert_eq!(rejected.discarded, 1);
    }

    #[test]
    fn test_hallucinated_text_is_discarded() {
        let body = json!([{"text": "Nobody Here", "label": "PERSON"}]);
        let output = detector(UnknownLabelPolicy::Bucket)
            .parse_reply("plain text", &body)
            .unwrap();
        assert!(output.spans.is_empty());
        assert_eq!(output.discarded, 1);
    }

    #[test]
    fn test_text_records_tag_every_occurrence() {
        let text = "Ann met Bob. Later Ann left.";
        let body = json!([{"text": "Ann", "label": "PERSON"}]);
        let output = detector(UnknownLabelPolicy::Bucket)
            .parse_reply(text, &body)
            .unwrap();
        assert_eq!(output.spans.len(), 2);
    }

    #[test]
    fn test_overlapping_records_are_deduplicated() {
        let text = "Mr. John Doe";
        let body = json!([
            {"text": "John Doe", "label": "PERSON"},
            {"text": "Mr. John Doe", "label": "PERSON"}
        ]);
        let output = detector(UnknownLabelPolicy::Bucket)
            .parse_reply(text, &body)
            .unwrap();
        assert_eq!(output.spans.len(), 1);
        assert_eq!(output.spans[0].raw_value, "Mr. John Doe");
    }

    #[test]
    fn test_text_only_record_tags_disjoint_repeats() {
        let spans = locate_all("Anna Annan Anna", "Anna", EntityType::Person);
        let starts: Vec<usize> = spans.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![0, 5, 11]);

        // "aa" inside "aaa" yields one span, not two overlapping ones
        let spans = locate_all("aaa", "aa", EntityType::Other);
        assert_eq!(spans.len(), 1);
        assert_eq!((spans[0].start, spans[0].end), (0, 2));
    }

    #[test]
    fn test_unparseable_reply_is_malformed() {
        let body = json!({"response": "I cannot help with that."});
        let result = detector(UnknownLabelPolicy::Bucket).parse_reply("text", &body);
        assert!(matches!(result, Err(DetectorError::MalformedResponse(_))));
    }

    #[test]
    fn test_missing_entities_field_is_malformed() {
        let body = json!({"items": []});
        let result = detector(UnknownLabelPolicy::Bucket).parse_reply("text", &body);
        assert!(matches!(result, Err(DetectorError::MalformedResponse(_))));
    }

    #[test]
    fn test_prompt_contains_document() {
        let prompt = build_prompt("Jane lives here");
        assert!(prompt.contains("Jane lives here"));
        assert!(prompt.contains("\"entities\""));
    }
}
