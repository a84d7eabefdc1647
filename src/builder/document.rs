use super::index::IndexRouter;
use crate::domain::{FieldMap, IndexRequest, OutputDocument, RawMessage};
use crate::parser::ParsedLine;
use chrono::{DateTime, Utc};
use serde_json::Value;

pub const DEFAULT_DOC_TYPE: &str = "logspout";

#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    doc_type: String,
    tags: Vec<String>,
    router: IndexRouter,
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_DOC_TYPE, IndexRouter::default())
    }
}

impl DocumentBuilder {
    pub fn new(doc_type: impl Into<String>, router: IndexRouter) -> Self {
        Self {
            doc_type: doc_type.into(),
            tags: Vec::new(),
            router,
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn build(&self, msg: &RawMessage, line: &ParsedLine) -> IndexRequest {
        self.build_at(msg, line, Utc::now())
    }

    /// `now` becomes `@timestamp`; the index is always derived from the event time.
    pub fn build_at(
        &self,
        msg: &RawMessage,
        line: &ParsedLine,
        now: DateTime<Utc>,
    ) -> IndexRequest {
        let mut fields = FieldMap::new();

        if let Some(parsed) = line.fields() {
            fields.insert("level".to_string(), Value::from(parsed.level.clone()));
            fields.insert("severity".to_string(), Value::from(parsed.severity.clone()));
            fields.insert("line".to_string(), Value::from(parsed.line));
            fields.insert("file".to_string(), Value::from(parsed.file.clone()));
            fields.insert("rawtime".to_string(), Value::from(parsed.raw_time.clone()));
        }

        let host = msg.host().to_string();
        fields.insert("host".to_string(), Value::from(host.clone()));
        fields.insert("image".to_string(), Value::from(msg.image()));

        if let Some(source) = &msg.source {
            fields.insert(
                "container_id".to_string(),
                Value::from(source.container_id.clone()),
            );
            fields.insert(
                "container_name".to_string(),
                Value::from(source.container_name.clone()),
            );
        }
        if let Some(stream) = &line.stream {
            fields.insert("stream".to_string(), Value::from(stream.clone()));
        }

        IndexRequest {
            index: self.router.index_for(&msg.time),
            event_time: msg.time,
            document: OutputDocument {
                source: host,
                doc_type: self.doc_type.clone(),
                timestamp: now,
                message: line.message(),
                tags: self.tags.clone(),
                index_fields: None,
                fields,
            },
        }
    }
}
