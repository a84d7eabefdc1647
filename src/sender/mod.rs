pub mod client;
pub mod endpoint;
pub mod memory;
pub mod serialization;

pub use client::{BulkClient, ClientConfig, ClientError, ConnectionStats};
pub use endpoint::{DEFAULT_PORT, Endpoint, EndpointError, resolve_endpoints};
pub use memory::MemoryIndexer;
pub use serialization::{BulkSerializer, DEFAULT_TTL, SerializationError};

use crate::buffer::Batch;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Serialization failed: {0}")]
    Serialization(#[from] SerializationError),
    #[error("Request error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Backend responded with HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

impl IndexError {
    /// Transport failures, throttling and server errors are worth another try.
    /// Anything else would fail the same way again.
    pub fn is_retryable(&self) -> bool {
        match self {
            IndexError::Transport(_) => true,
            IndexError::Status { status, .. } => *status == 429 || *status >= 500,
            IndexError::Serialization(_) => false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct IndexReport {
    pub status_code: u16,
    pub documents: usize,
    /// Documents the backend accepted the request for but refused individually.
    pub failed_items: usize,
    pub bytes_sent: usize,
    pub latency: Duration,
}

/// Where batches go once they leave the buffer.
pub trait Indexer: Send + Sync {
    fn accept(&self, batch: &Batch)
    -> impl Future<Output = Result<IndexReport, IndexError>> + Send;
}

/// The indexer an adapter was constructed with.
#[derive(Debug, Clone)]
pub enum IndexerBackend {
    Bulk(BulkClient),
    Memory(MemoryIndexer),
}

impl Indexer for IndexerBackend {
    async fn accept(&self, batch: &Batch) -> Result<IndexReport, IndexError> {
        match self {
            IndexerBackend::Bulk(client) => client.accept(batch).await,
            IndexerBackend::Memory(recorder) => recorder.accept(batch).await,
        }
    }
}

impl From<BulkClient> for IndexerBackend {
    fn from(client: BulkClient) -> Self {
        IndexerBackend::Bulk(client)
    }
}

impl From<MemoryIndexer> for IndexerBackend {
    fn from(recorder: MemoryIndexer) -> Self {
        IndexerBackend::Memory(recorder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        let status = |status| IndexError::Status {
            status,
            body: String::new(),
        };
        assert!(status(429).is_retryable());
        assert!(status(500).is_retryable());
        assert!(status(503).is_retryable());
        assert!(!status(400).is_retryable());
        assert!(!status(404).is_retryable());
        let empty = IndexError::Serialization(SerializationError::EmptyBatch);
        assert!(!empty.is_retryable());
    }
}
