use crate::buffer::{BatchBuffer, BatchConfig, BufferStatsSnapshot, BulkEntry};
use crate::builder::{DEFAULT_DOC_TYPE, DEFAULT_INDEX_PREFIX, DocumentBuilder, IndexRouter};
use crate::domain::{AdapterError, IndexRequest, RawMessage};
use crate::parser::FieldParser;
use crate::reliability::{DEFAULT_THROTTLE_WINDOW, ErrorThrottle, RetryConfig};
use crate::sender::serialization::DEFAULT_TTL;
use crate::sender::{
    BulkClient, BulkSerializer, ClientConfig, Endpoint, IndexerBackend, resolve_endpoints,
};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Everything needed to build a [`LogesAdapter`].
#[derive(Debug, Clone)]
pub struct AdapterSettings {
    pub address: String,
    pub port: Option<u16>,
    pub index_prefix: String,
    pub doc_type: String,
    pub ttl: Option<String>,
    pub tags: Vec<String>,
    pub batch: BatchConfig,
    pub retry: RetryConfig,
    pub client: ClientConfig,
    /// At most one decode error is logged per window.
    pub error_log_window: Duration,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            address: "localhost".to_string(),
            port: None,
            index_prefix: DEFAULT_INDEX_PREFIX.to_string(),
            doc_type: DEFAULT_DOC_TYPE.to_string(),
            ttl: Some(DEFAULT_TTL.to_string()),
            tags: Vec::new(),
            batch: BatchConfig::default(),
            retry: RetryConfig::default(),
            client: ClientConfig::default(),
            error_log_window: DEFAULT_THROTTLE_WINDOW,
        }
    }
}

type Encoder = fn(&IndexRequest) -> Result<BulkEntry, serde_json::Error>;

/// Turns raw container lines into Logstash documents and ships them.
///
/// One adapter runs one sequential stream loop. The buffer behind it delivers
/// on its own task, so a slow backend never stalls parsing.
pub struct LogesAdapter {
    parser: FieldParser,
    builder: DocumentBuilder,
    buffer: BatchBuffer,
    throttle: ErrorThrottle,
    endpoints: Vec<Endpoint>,
    encode: Encoder,
}

impl LogesAdapter {
    /// Resolves the backend address and starts delivery against it.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(settings: AdapterSettings) -> Result<Self, AdapterError> {
        let endpoints = resolve_endpoints(&settings.address, settings.port)?;
        let serializer =
            BulkSerializer::new(Some(settings.doc_type.clone()), settings.ttl.clone());
        let client = BulkClient::new(&endpoints, settings.client.clone(), serializer)?;

        info!(
            "Shipping to {} endpoint(s): {}",
            endpoints.len(),
            endpoints
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );

        let indexer = IndexerBackend::Bulk(client);
        Ok(Self::assemble(indexer, endpoints, &settings))
    }

    /// Starts delivery against an already built indexer; the address in
    /// `settings` is not used.
    pub fn with_indexer(indexer: impl Into<IndexerBackend>, settings: AdapterSettings) -> Self {
        Self::assemble(indexer.into(), Vec::new(), &settings)
    }

    fn assemble(
        indexer: IndexerBackend,
        endpoints: Vec<Endpoint>,
        settings: &AdapterSettings,
    ) -> Self {
        let builder = DocumentBuilder::new(
            settings.doc_type.clone(),
            IndexRouter::new(settings.index_prefix.clone()),
        )
        .with_tags(settings.tags.clone());

        Self {
            parser: FieldParser::new(),
            builder,
            buffer: BatchBuffer::start(indexer, settings.batch.clone(), settings.retry.clone()),
            throttle: ErrorThrottle::new(settings.error_log_window),
            endpoints,
            encode: BulkEntry::from_request,
        }
    }

    /// Consumes messages until the channel closes. Per-message failures are
    /// logged and never end the loop.
    pub async fn stream(&mut self, mut messages: mpsc::Receiver<RawMessage>) {
        debug!("Stream loop started");
        let mut received: u64 = 0;

        while let Some(msg) = messages.recv().await {
            self.process(&msg);
            received += 1;
        }

        info!("Input channel closed after {} messages", received);
    }

    /// Parses, builds and buffers a single message.
    pub fn process(&mut self, msg: &RawMessage) {
        let line = self.parser.parse(&msg.data);

        if let Some(err) = line.error()
            && let Some(suppressed) = self.throttle.check()
        {
            if suppressed > 0 {
                warn!(
                    "Could not decode line from {}: {} ({} similar errors suppressed)",
                    msg.host(),
                    err,
                    suppressed
                );
            } else {
                warn!("Could not decode line from {}: {}", msg.host(), err);
            }
        }

        let request = self.builder.build(msg, &line);
        match (self.encode)(&request) {
            Ok(entry) => self.buffer.add(entry),
            Err(e) => error!("Skipping document for {}: {}", request.index, e),
        }
    }

    pub async fn flush(&self) {
        self.buffer.flush().await;
    }

    /// Delivers what is still pending and stops the buffer.
    pub async fn close(self) -> BufferStatsSnapshot {
        debug!(
            "Closing adapter with {} pending documents",
            self.buffer.pending_len()
        );
        self.buffer.close().await
    }

    pub fn stats(&self) -> BufferStatsSnapshot {
        self.buffer.stats()
    }

    pub fn pending_len(&self) -> usize {
        self.buffer.pending_len()
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }
}
