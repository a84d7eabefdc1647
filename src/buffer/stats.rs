use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct BufferStats {
    documents_added: AtomicU64,
    documents_delivered: AtomicU64,
    documents_dropped: AtomicU64,
    documents_rejected: AtomicU64,
    batches_delivered: AtomicU64,
    batches_dropped: AtomicU64,
    retries: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferStatsSnapshot {
    pub documents_added: u64,
    pub documents_delivered: u64,
    pub documents_dropped: u64,
    /// Delivered in an accepted request but refused item by item.
    pub documents_rejected: u64,
    pub batches_delivered: u64,
    pub batches_dropped: u64,
    pub retries: u64,
}

impl BufferStats {
    pub fn record_added(&self) {
        self.documents_added.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivered(&self, documents: usize, rejected: usize) {
        self.batches_delivered.fetch_add(1, Ordering::Relaxed);
        self.documents_delivered
            .fetch_add(documents as u64, Ordering::Relaxed);
        self.documents_rejected
            .fetch_add(rejected as u64, Ordering::Relaxed);
    }

    pub fn record_dropped(&self, documents: usize) {
        self.batches_dropped.fetch_add(1, Ordering::Relaxed);
        self.documents_dropped
            .fetch_add(documents as u64, Ordering::Relaxed);
    }

    /// Documents dropped before they were ever put in a batch.
    pub fn record_discarded(&self, documents: usize) {
        self.documents_dropped
            .fetch_add(documents as u64, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> BufferStatsSnapshot {
        BufferStatsSnapshot {
            documents_added: self.documents_added.load(Ordering::Relaxed),
            documents_delivered: self.documents_delivered.load(Ordering::Relaxed),
            documents_dropped: self.documents_dropped.load(Ordering::Relaxed),
            documents_rejected: self.documents_rejected.load(Ordering::Relaxed),
            batches_delivered: self.batches_delivered.load(Ordering::Relaxed),
            batches_dropped: self.batches_dropped.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
        }
    }
}
