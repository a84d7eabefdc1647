use super::{IndexError, IndexReport, Indexer};
use crate::buffer::{Batch, BulkEntry};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Records batches instead of sending them anywhere.
///
/// Clones share the same recording, so a test can keep one handle while the
/// adapter owns another. Failures can be injected for the first N calls.
#[derive(Debug, Clone, Default)]
pub struct MemoryIndexer {
    batches: Arc<Mutex<Vec<Batch>>>,
    calls: Arc<AtomicUsize>,
    fail_remaining: Arc<AtomicUsize>,
    failure_status: u16,
    delay: Option<Duration>,
}

impl MemoryIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The first `n` calls fail with a retryable `503`.
    pub fn fail_first(self, n: usize) -> Self {
        self.fail_first_with(n, 503)
    }

    pub fn fail_first_with(mut self, n: usize, status: u16) -> Self {
        self.fail_remaining.store(n, Ordering::SeqCst);
        self.failure_status = status;
        self
    }

    /// Every call waits this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn batches(&self) -> Vec<Batch> {
        self.batches.lock().clone()
    }

    pub fn documents(&self) -> Vec<BulkEntry> {
        self.batches
            .lock()
            .iter()
            .flat_map(|batch| batch.entries().iter().cloned())
            .collect()
    }

    fn take_failure(&self) -> bool {
        self.fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Indexer for MemoryIndexer {
    async fn accept(&self, batch: &Batch) -> Result<IndexReport, IndexError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.take_failure() {
            return Err(IndexError::Status {
                status: self.failure_status,
                body: "injected failure".to_string(),
            });
        }

        self.batches.lock().push(batch.clone());
        Ok(IndexReport {
            status_code: 200,
            documents: batch.size(),
            failed_items: 0,
            bytes_sent: batch.estimated_bytes(),
            latency: Duration::ZERO,
        })
    }
}
