use super::newline::decode_newlines;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("JSON parse error: {0}")]
    Json(#[from] simd_json::Error),
    #[error("Envelope log payload is not valid JSON: {0}")]
    InnerJson(#[source] simd_json::Error),
}

/// Application-level attributes recovered from a JSON log line.
///
/// A key holding `null` reads the same as a missing key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsedFields {
    #[serde(deserialize_with = "null_as_default")]
    pub level: String,
    #[serde(deserialize_with = "null_as_default")]
    pub severity: String,
    #[serde(deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(deserialize_with = "null_as_default")]
    pub file: String,
    #[serde(deserialize_with = "null_as_default")]
    pub line: i64,
    #[serde(rename = "time", deserialize_with = "null_as_default")]
    pub raw_time: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Container runtime wrapper (`docker logs --log-driver=json-file` format).
#[derive(Debug, Deserialize)]
struct Envelope {
    log: String,
    stream: String,
}

#[derive(Debug)]
pub enum FieldsOutcome {
    Structured(ParsedFields),
    /// The line carries no usable fields; the message is the line text.
    Unstructured,
    /// The line looked like JSON but could not be decoded.
    DecodeError(ParseError),
}

#[derive(Debug)]
pub struct ParsedLine {
    /// Newline-decoded text to use as the message when there are no fields.
    pub text: String,
    /// `stdout`/`stderr` when the line was wrapped in an envelope.
    pub stream: Option<String>,
    pub outcome: FieldsOutcome,
}

impl ParsedLine {
    pub fn fields(&self) -> Option<&ParsedFields> {
        match &self.outcome {
            FieldsOutcome::Structured(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ParseError> {
        match &self.outcome {
            FieldsOutcome::DecodeError(e) => Some(e),
            _ => None,
        }
    }

    /// The message a document built from this line should carry.
    pub fn message(&self) -> String {
        match &self.outcome {
            FieldsOutcome::Structured(fields) => decode_newlines(&fields.message),
            _ => self.text.clone(),
        }
    }
}

pub struct FieldParser {}

impl Default for FieldParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldParser {
    pub fn new() -> Self {
        Self {}
    }

    /// Never fails: decode problems are reported through [`FieldsOutcome::DecodeError`]
    /// so the caller can still ship the line as plain text.
    pub fn parse(&self, raw: &[u8]) -> ParsedLine {
        let raw_text = String::from_utf8_lossy(raw);

        if !looks_like_json(&raw_text) {
            return ParsedLine {
                text: decode_newlines(&raw_text),
                stream: None,
                outcome: FieldsOutcome::Unstructured,
            };
        }

        if let Ok(envelope) = decode::<Envelope>(raw) {
            let inner = envelope.log.trim_end_matches(['\n', '\r']);
            let outcome = if looks_like_json(inner) {
                match decode::<ParsedFields>(inner.as_bytes()) {
                    Ok(fields) => structured_or_plain(fields),
                    Err(e) => FieldsOutcome::DecodeError(ParseError::InnerJson(e)),
                }
            } else {
                FieldsOutcome::Unstructured
            };
            return ParsedLine {
                text: decode_newlines(inner),
                stream: Some(envelope.stream),
                outcome,
            };
        }

        let outcome = match decode::<ParsedFields>(raw) {
            Ok(fields) => structured_or_plain(fields),
            Err(e) => FieldsOutcome::DecodeError(ParseError::Json(e)),
        };
        ParsedLine {
            text: decode_newlines(&raw_text),
            stream: None,
            outcome,
        }
    }
}

fn looks_like_json(text: &str) -> bool {
    text.trim_start().starts_with('{')
}

// simd-json parses in place, so every attempt works on its own copy.
fn decode<T>(bytes: &[u8]) -> Result<T, simd_json::Error>
where
    T: for<'de> Deserialize<'de>,
{
    let mut data = bytes.to_vec();
    simd_json::serde::from_slice(&mut data)
}

fn structured_or_plain(fields: ParsedFields) -> FieldsOutcome {
    if fields.message.is_empty() {
        FieldsOutcome::Unstructured
    } else {
        FieldsOutcome::Structured(fields)
    }
}
