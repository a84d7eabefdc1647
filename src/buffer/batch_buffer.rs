use super::batch::{Batch, BatchConfig, BulkEntry, FlushTrigger};
use super::stats::{BufferStats, BufferStatsSnapshot};
use crate::reliability::RetryConfig;
use crate::sender::Indexer;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{Notify, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{debug, error, info, warn};

#[derive(Debug, Default)]
struct Pending {
    entries: Vec<BulkEntry>,
    bytes: usize,
    /// Adds refused since the last drain because the buffer was full.
    overflowed: u64,
}

struct Shared {
    pending: Mutex<Pending>,
    wake: Notify,
    stats: BufferStats,
    config: BatchConfig,
}

enum Command {
    Flush(oneshot::Sender<()>),
    Close(oneshot::Sender<()>),
}

enum Delivery {
    Delivered,
    Rejected,
    Exhausted,
}

/// Pending documents plus the background task that ships them.
///
/// `add` only takes the lock long enough to push. The worker drains a
/// snapshot under the same lock and delivers it after releasing it, so
/// documents added during a delivery wait for the next batch.
///
/// At most `max_pending` documents wait at once; adds beyond that are dropped
/// and counted. Dropping the buffer without [`BatchBuffer::close`] stops the
/// worker and loses whatever was still pending.
pub struct BatchBuffer {
    shared: Arc<Shared>,
    commands: mpsc::UnboundedSender<Command>,
    worker: Option<JoinHandle<()>>,
}

impl BatchBuffer {
    /// Spawns the delivery worker; must be called inside a tokio runtime.
    pub fn start<I>(indexer: I, config: BatchConfig, retry: RetryConfig) -> Self
    where
        I: Indexer + 'static,
    {
        let shared = Arc::new(Shared {
            pending: Mutex::new(Pending::default()),
            wake: Notify::new(),
            stats: BufferStats::default(),
            config,
        });
        let (commands, command_rx) = mpsc::unbounded_channel();

        let worker = Worker {
            shared: shared.clone(),
            indexer,
            retry,
        };
        let handle = tokio::spawn(worker.run(command_rx));

        Self {
            shared,
            commands,
            worker: Some(handle),
        }
    }

    pub fn add(&self, entry: BulkEntry) {
        let config = &self.shared.config;
        let mut pending = self.shared.pending.lock();

        if pending.entries.len() >= config.max_pending {
            pending.overflowed += 1;
            let first_overflow = pending.overflowed == 1;
            drop(pending);

            self.shared.stats.record_discarded(1);
            if first_overflow {
                warn!(
                    "Pending buffer full ({} documents), dropping new documents until it drains",
                    config.max_pending
                );
            }
            self.shared.wake.notify_one();
            return;
        }

        pending.bytes += entry.size();
        pending.entries.push(entry);
        let threshold_reached =
            pending.entries.len() >= config.max_documents || pending.bytes >= config.max_bytes;
        drop(pending);

        self.shared.stats.record_added();
        if threshold_reached {
            self.shared.wake.notify_one();
        }
    }

    /// Delivers everything pending right now and waits for the outcome.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.commands.send(Command::Flush(ack)).is_ok() {
            let _ = done.await;
        }
    }

    /// Final flush, then stops the worker. Returns the final counters.
    pub async fn close(mut self) -> BufferStatsSnapshot {
        let (ack, done) = oneshot::channel();
        if self.commands.send(Command::Close(ack)).is_ok() {
            let _ = done.await;
        }
        if let Some(handle) = self.worker.take()
            && let Err(e) = handle.await
        {
            error!("Batch buffer worker ended abnormally: {}", e);
        }
        self.shared.stats.snapshot()
    }

    pub fn pending_len(&self) -> usize {
        self.shared.pending.lock().entries.len()
    }

    pub fn stats(&self) -> BufferStatsSnapshot {
        self.shared.stats.snapshot()
    }
}

struct Worker<I> {
    shared: Arc<Shared>,
    indexer: I,
    retry: RetryConfig,
}

impl<I: Indexer> Worker<I> {
    async fn run(self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let interval = self.shared.config.flush_interval;
        let mut deadline = Instant::now() + interval;

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Flush(ack)) => {
                        self.drain(FlushTrigger::Manual).await;
                        deadline = Instant::now() + interval;
                        let _ = ack.send(());
                    }
                    Some(Command::Close(ack)) => {
                        self.drain(FlushTrigger::Manual).await;
                        let _ = ack.send(());
                        break;
                    }
                    None => {
                        let lost = self.shared.pending.lock().entries.len();
                        if lost > 0 {
                            warn!(
                                "Batch buffer dropped without close, {} pending documents lost",
                                lost
                            );
                        }
                        break;
                    }
                },
                () = self.shared.wake.notified() => {
                    if let Some(trigger) = self.threshold_trigger() {
                        self.drain(trigger).await;
                        deadline = Instant::now() + interval;
                    }
                }
                () = sleep_until(deadline) => {
                    self.drain(FlushTrigger::TimeBased).await;
                    deadline = Instant::now() + interval;
                }
            }
        }

        debug!("Batch buffer worker stopped");
    }

    fn threshold_trigger(&self) -> Option<FlushTrigger> {
        let config = &self.shared.config;
        let pending = self.shared.pending.lock();
        if pending.entries.len() >= config.max_documents {
            Some(FlushTrigger::SizeBased)
        } else if pending.bytes >= config.max_bytes {
            Some(FlushTrigger::MemoryBased)
        } else {
            None
        }
    }

    async fn drain(&self, trigger: FlushTrigger) {
        let (mut entries, overflowed) = {
            let mut pending = self.shared.pending.lock();
            pending.bytes = 0;
            (
                std::mem::take(&mut pending.entries),
                std::mem::take(&mut pending.overflowed),
            )
        };
        if overflowed > 0 {
            warn!(
                "{} documents were dropped while the pending buffer was full",
                overflowed
            );
        }
        if entries.is_empty() {
            return;
        }

        debug!("Flushing {} documents ({:?})", entries.len(), trigger);

        let max_documents = self.shared.config.max_documents.max(1);
        while !entries.is_empty() {
            let rest = if entries.len() > max_documents {
                entries.split_off(max_documents)
            } else {
                Vec::new()
            };
            let outcome = self.deliver(Batch::new(entries, trigger)).await;
            entries = rest;

            // The backend is down; the rest of this snapshot would wait out the
            // same budget chunk after chunk while new documents pile up.
            if matches!(outcome, Delivery::Exhausted) && !entries.is_empty() {
                warn!(
                    "Discarding {} more documents from this flush after retries ran out",
                    entries.len()
                );
                self.shared.stats.record_discarded(entries.len());
                return;
            }
        }
    }

    async fn deliver(&self, batch: Batch) -> Delivery {
        let mut backoff = self.retry.backoff();

        loop {
            match self.indexer.accept(&batch).await {
                Ok(report) => {
                    if report.failed_items > 0 {
                        warn!(
                            "Batch {}: backend refused {} of {} documents",
                            batch.id(),
                            report.failed_items,
                            batch.size()
                        );
                    }
                    info!(
                        "Delivered batch {} ({} documents, {} bytes) in {:?}",
                        batch.id(),
                        batch.size(),
                        report.bytes_sent,
                        report.latency
                    );
                    self.shared
                        .stats
                        .record_delivered(batch.size(), report.failed_items);
                    return Delivery::Delivered;
                }
                Err(e) if e.is_retryable() => match backoff.next_delay() {
                    Some(delay) => {
                        warn!(
                            "Batch {} attempt {} failed: {}, retrying in {:?}",
                            batch.id(),
                            backoff.attempts(),
                            e,
                            delay
                        );
                        self.shared.stats.record_retry();
                        sleep(delay).await;
                    }
                    None => {
                        error!(
                            "Dropping batch {} ({} documents) after {} attempts and {:?}: {}",
                            batch.id(),
                            batch.size(),
                            backoff.attempts(),
                            backoff.waited(),
                            e
                        );
                        self.shared.stats.record_dropped(batch.size());
                        return Delivery::Exhausted;
                    }
                },
                Err(e) => {
                    error!(
                        "Dropping batch {} ({} documents), backend rejected it: {}",
                        batch.id(),
                        batch.size(),
                        e
                    );
                    self.shared.stats.record_dropped(batch.size());
                    return Delivery::Rejected;
                }
            }
        }
    }
}
