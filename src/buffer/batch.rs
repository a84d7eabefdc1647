use crate::domain::IndexRequest;
use chrono::{DateTime, Utc};
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    SizeBased,
    MemoryBased,
    TimeBased,
    Manual,
}

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub max_documents: usize,
    pub max_bytes: usize,
    pub flush_interval: Duration,
    /// Documents allowed to wait for delivery; further adds are dropped.
    pub max_pending: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_documents: 100,
            max_bytes: 5 * 1024 * 1024, // 5MB
            flush_interval: Duration::from_millis(1000),
            max_pending: 100_000,
        }
    }
}

/// A document already encoded for transport, plus its routing.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkEntry {
    pub index: String,
    pub event_time: DateTime<Utc>,
    pub source: String,
}

impl BulkEntry {
    pub fn from_request(request: &IndexRequest) -> Result<Self, serde_json::Error> {
        Ok(Self {
            index: request.index.clone(),
            event_time: request.event_time,
            source: serde_json::to_string(&request.document)?,
        })
    }

    pub fn size(&self) -> usize {
        self.index.len() + self.source.len()
    }
}

#[derive(Debug, Clone)]
pub struct Batch {
    id: String,
    entries: Vec<BulkEntry>,
    trigger: FlushTrigger,
}

impl Batch {
    pub fn new(entries: Vec<BulkEntry>, trigger: FlushTrigger) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            entries,
            trigger,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[BulkEntry] {
        &self.entries
    }

    pub fn trigger(&self) -> FlushTrigger {
        self.trigger
    }

    pub fn estimated_bytes(&self) -> usize {
        self.entries.iter().map(BulkEntry::size).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
