use super::endpoint::Endpoint;
use super::serialization::BulkSerializer;
use super::{IndexError, IndexReport, Indexer};
use crate::buffer::Batch;
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE};
use reqwest::{Client, ClientBuilder};
use serde::Deserialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub tls: bool,
    pub timeout: Duration,
    pub connection_timeout: Duration,
    pub max_connections: usize,
    pub user_agent: String,
    pub enable_compression: bool,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            tls: false,
            timeout: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(10),
            max_connections: 10,
            user_agent: format!("loges-forwarder/{}", env!("CARGO_PKG_VERSION")),
            enable_compression: false,
            username: None,
            password: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionStats {
    pub endpoints: usize,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub average_response_time: Duration,
}

#[derive(Debug, Default)]
struct ClientStats {
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    total_response_time: AtomicU64,
}

impl ClientStats {
    fn record_request(&self, success: bool, response_time: Duration) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_response_time
            .fetch_add(response_time.as_millis() as u64, Ordering::Relaxed);

        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct BulkResponse {
    #[serde(default)]
    errors: bool,
    #[serde(default)]
    items: Vec<serde_json::Map<String, serde_json::Value>>,
}

impl BulkResponse {
    fn failed_items(&self) -> usize {
        if !self.errors {
            return 0;
        }
        self.items
            .iter()
            .filter_map(|item| item.values().next())
            .filter(|result| {
                result.get("error").is_some()
                    || result
                        .get("status")
                        .and_then(serde_json::Value::as_u64)
                        .is_some_and(|s| s >= 300)
            })
            .count()
    }
}

/// `_bulk` sender over HTTP. Requests rotate across the resolved endpoints so a
/// retry after a failure goes to the next host.
#[derive(Debug, Clone)]
pub struct BulkClient {
    client: Client,
    config: ClientConfig,
    bulk_urls: Arc<Vec<Url>>,
    next: Arc<AtomicUsize>,
    serializer: BulkSerializer,
    stats: Arc<ClientStats>,
}

impl BulkClient {
    pub fn new(
        endpoints: &[Endpoint],
        config: ClientConfig,
        serializer: BulkSerializer,
    ) -> Result<Self, ClientError> {
        if endpoints.is_empty() {
            return Err(ClientError::InvalidConfiguration(
                "At least one endpoint is required".to_string(),
            ));
        }

        let bulk_urls = endpoints
            .iter()
            .map(|endpoint| {
                let raw = format!("{}/_bulk", endpoint.base_url(config.tls));
                Url::parse(&raw).map_err(|e| {
                    ClientError::InvalidConfiguration(format!("Invalid endpoint URL '{raw}': {e}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut client_builder = ClientBuilder::new()
            .timeout(config.timeout)
            .connect_timeout(config.connection_timeout)
            .pool_max_idle_per_host(config.max_connections)
            .user_agent(&config.user_agent);

        if config.enable_compression {
            client_builder = client_builder.gzip(true);
        }

        let client = client_builder.build()?;

        Ok(Self {
            client,
            config,
            bulk_urls: Arc::new(bulk_urls),
            next: Arc::new(AtomicUsize::new(0)),
            serializer,
            stats: Arc::new(ClientStats::default()),
        })
    }

    fn next_url(&self) -> &Url {
        let i = self.next.fetch_add(1, Ordering::Relaxed) % self.bulk_urls.len();
        &self.bulk_urls[i]
    }

    pub fn connection_stats(&self) -> ConnectionStats {
        let total_requests = self.stats.total_requests.load(Ordering::Relaxed);
        let total_response_time = self.stats.total_response_time.load(Ordering::Relaxed);

        let average_response_time = if total_requests > 0 {
            Duration::from_millis(total_response_time / total_requests)
        } else {
            Duration::ZERO
        };

        ConnectionStats {
            endpoints: self.bulk_urls.len(),
            total_requests,
            successful_requests: self.stats.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.stats.failed_requests.load(Ordering::Relaxed),
            average_response_time,
        }
    }

    async fn post(&self, url: &Url, payload: Vec<u8>) -> Result<reqwest::Response, IndexError> {
        let mut request = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, "application/x-ndjson");

        if self.config.enable_compression {
            request = request.header(CONTENT_ENCODING, "gzip");
        }
        if let Some(username) = &self.config.username {
            request = request.basic_auth(username, self.config.password.as_ref());
        }

        Ok(request.body(payload).send().await?)
    }
}

impl Indexer for BulkClient {
    async fn accept(&self, batch: &Batch) -> Result<IndexReport, IndexError> {
        let start = Instant::now();
        let payload = if self.config.enable_compression {
            self.serializer.serialize_compressed(batch)?
        } else {
            self.serializer.serialize_ndjson(batch)?.into_bytes()
        };
        let bytes_sent = payload.len();
        let url = self.next_url();

        debug!(
            "Sending batch {} ({} documents, {} bytes) to {}",
            batch.id(),
            batch.size(),
            bytes_sent,
            url
        );

        let response = match self.post(url, payload).await {
            Ok(response) => response,
            Err(e) => {
                self.stats.record_request(false, start.elapsed());
                return Err(e);
            }
        };

        let status = response.status();
        let latency = start.elapsed();
        self.stats.record_request(status.is_success(), latency);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IndexError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let failed_items = match serde_json::from_str::<BulkResponse>(&body) {
            Ok(parsed) => parsed.failed_items(),
            Err(e) => {
                warn!("Could not decode bulk response from {}: {}", url, e);
                0
            }
        };

        Ok(IndexReport {
            status_code: status.as_u16(),
            documents: batch.size(),
            failed_items,
            bytes_sent,
            latency,
        })
    }
}
