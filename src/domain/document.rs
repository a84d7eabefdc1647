use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type FieldMap = BTreeMap<String, serde_json::Value>;

/// A document in the layout Logstash writes, so Kibana can search it as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDocument {
    #[serde(rename = "@source")]
    pub source: String,
    #[serde(rename = "@type")]
    pub doc_type: String,
    #[serde(rename = "@timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "@message")]
    pub message: String,
    #[serde(rename = "@tags", default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(rename = "@idx", default, skip_serializing_if = "Option::is_none")]
    pub index_fields: Option<FieldMap>,
    #[serde(rename = "@fields", default)]
    pub fields: FieldMap,
}

/// A built document together with where it has to be written.
#[derive(Debug, Clone)]
pub struct IndexRequest {
    pub index: String,
    pub event_time: DateTime<Utc>,
    pub document: OutputDocument,
}
