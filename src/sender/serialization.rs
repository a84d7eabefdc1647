use crate::buffer::Batch;
use serde::Serialize;
use std::io::Write;
use thiserror::Error;

pub const DEFAULT_TTL: &str = "90d";

#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("JSON serialization failed: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("IO error during serialization: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Batch is empty")]
    EmptyBatch,
}

#[derive(Serialize)]
struct BulkAction<'a> {
    index: ActionMeta<'a>,
}

#[derive(Serialize)]
struct ActionMeta<'a> {
    #[serde(rename = "_index")]
    index: &'a str,
    #[serde(rename = "_type", skip_serializing_if = "Option::is_none")]
    doc_type: Option<&'a str>,
    #[serde(rename = "_ttl", skip_serializing_if = "Option::is_none")]
    ttl: Option<&'a str>,
    #[serde(rename = "_timestamp")]
    timestamp: String,
}

/// Renders batches as `_bulk` NDJSON: one action line, then the document.
#[derive(Debug, Clone)]
pub struct BulkSerializer {
    doc_type: Option<String>,
    ttl: Option<String>,
}

impl Default for BulkSerializer {
    fn default() -> Self {
        Self::new(
            Some(crate::builder::DEFAULT_DOC_TYPE.to_string()),
            Some(DEFAULT_TTL.to_string()),
        )
    }
}

impl BulkSerializer {
    pub fn new(doc_type: Option<String>, ttl: Option<String>) -> Self {
        Self {
            doc_type: doc_type.filter(|s| !s.is_empty()),
            ttl: ttl.filter(|s| !s.is_empty()),
        }
    }

    pub fn serialize_ndjson(&self, batch: &Batch) -> Result<String, SerializationError> {
        if batch.is_empty() {
            return Err(SerializationError::EmptyBatch);
        }

        // Two lines per document plus the action metadata.
        let mut buffer = String::with_capacity(batch.estimated_bytes() + batch.size() * 128);

        for entry in batch.entries() {
            let action = BulkAction {
                index: ActionMeta {
                    index: &entry.index,
                    doc_type: self.doc_type.as_deref(),
                    ttl: self.ttl.as_deref(),
                    timestamp: entry.event_time.to_rfc3339(),
                },
            };
            buffer.push_str(&serde_json::to_string(&action)?);
            buffer.push('\n');
            buffer.push_str(&entry.source);
            buffer.push('\n');
        }

        Ok(buffer)
    }

    pub fn serialize_compressed(&self, batch: &Batch) -> Result<Vec<u8>, SerializationError> {
        use flate2::{Compression, write::GzEncoder};

        let data = self.serialize_ndjson(batch)?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(data.as_bytes())?;
        Ok(encoder.finish()?)
    }
}
