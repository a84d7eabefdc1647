use crate::app::adapter::AdapterSettings;
use crate::buffer::BatchConfig;
use crate::builder::{DEFAULT_DOC_TYPE, DEFAULT_INDEX_PREFIX};
use crate::domain::SourceMetadata;
use crate::reliability::{DEFAULT_THROTTLE_WINDOW, RetryConfig};
use crate::sender::serialization::DEFAULT_TTL;
use crate::sender::{ClientConfig, EndpointError, resolve_endpoints};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable that forces debug logging when set to anything but
/// an empty string, `0` or `false`.
pub const DEBUG_ENV: &str = "DEBUG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Args(#[from] clap::Error),
    #[error("Invalid address: {0}")]
    InvalidAddress(#[from] EndpointError),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("File error: {0}")]
    FileError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable single-line output
    #[default]
    Compact,
    /// One JSON object per event
    Json,
}

#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(name = "loges-forwarder", author, version, about, long_about = None)]
#[serde(default)]
pub struct Config {
    /// Backend connection string; several hosts are joined with '+'
    #[arg(long, env = "LOGES_ADDRESS", default_value = "localhost")]
    pub address: String,

    /// Port for hosts that do not name their own
    #[arg(long, env = "LOGES_PORT")]
    pub port: Option<u16>,

    /// Talk HTTPS to the backend
    #[arg(long, env = "LOGES_TLS")]
    pub tls: bool,

    #[arg(long, env = "LOGES_USERNAME")]
    pub username: Option<String>,

    #[arg(long, env = "LOGES_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Prefix of the daily index name
    #[arg(long, env = "LOGES_INDEX_PREFIX", default_value = DEFAULT_INDEX_PREFIX)]
    pub index_prefix: String,

    /// Value of `@type` and of the bulk `_type`
    #[arg(long, env = "LOGES_DOC_TYPE", default_value = DEFAULT_DOC_TYPE)]
    pub doc_type: String,

    /// Bulk `_ttl`; an empty value leaves it out
    #[arg(long, env = "LOGES_TTL", default_value = DEFAULT_TTL)]
    pub ttl: String,

    /// Comma separated `@tags`
    #[arg(long, env = "LOGES_TAGS", value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Documents per batch
    #[arg(long, env = "LOGES_BATCH_SIZE", default_value = "100")]
    pub batch_size: usize,

    /// Pending bytes that force a flush
    #[arg(long, env = "LOGES_MAX_BATCH_BYTES", default_value = "5242880")]
    pub max_batch_bytes: usize,

    /// Flush interval in milliseconds
    #[arg(long, env = "LOGES_FLUSH_INTERVAL_MS", default_value = "1000")]
    pub flush_interval_ms: u64,

    /// Documents allowed to wait for delivery; further lines are dropped
    #[arg(long, env = "LOGES_MAX_PENDING", default_value = "100000")]
    pub max_pending: usize,

    /// Delivery attempts per batch, the first one included
    #[arg(long, env = "LOGES_MAX_RETRY_ATTEMPTS", default_value = "8")]
    pub max_retry_attempts: u32,

    #[arg(long, env = "LOGES_RETRY_BASE_DELAY_MS", default_value = "500")]
    pub retry_base_delay_ms: u64,

    #[arg(long, env = "LOGES_RETRY_MAX_DELAY_MS", default_value = "30000")]
    pub retry_max_delay_ms: u64,

    /// Total time a batch may spend waiting between attempts
    #[arg(long, env = "LOGES_RETRY_MAX_ELAPSED_SECS", default_value = "120")]
    pub retry_max_elapsed_secs: u64,

    /// Request timeout in seconds
    #[arg(long, env = "LOGES_REQUEST_TIMEOUT_SECS", default_value = "30")]
    pub request_timeout_secs: u64,

    #[arg(long, env = "LOGES_CONNECTION_TIMEOUT_SECS", default_value = "10")]
    pub connection_timeout_secs: u64,

    /// Maximum idle HTTP connections per host
    #[arg(long, env = "LOGES_MAX_CONNECTIONS", default_value = "10")]
    pub max_connections: usize,

    /// Gzip request bodies
    #[arg(long, env = "LOGES_ENABLE_COMPRESSION")]
    pub enable_compression: bool,

    /// Raw messages queued between the reader and the adapter
    #[arg(long, env = "LOGES_CHANNEL_CAPACITY", default_value = "10000")]
    pub channel_capacity: usize,

    /// Read lines from this file instead of stdin
    #[arg(long, env = "LOGES_INPUT")]
    pub input: Option<PathBuf>,

    /// Source host attached to every line read
    #[arg(long, env = "LOGES_HOSTNAME")]
    pub hostname: Option<String>,

    #[arg(long, env = "LOGES_CONTAINER_ID")]
    pub container_id: Option<String>,

    #[arg(long, env = "LOGES_CONTAINER_NAME")]
    pub container_name: Option<String>,

    #[arg(long, env = "LOGES_IMAGE")]
    pub image: Option<String>,

    #[arg(long, env = "LOGES_LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    #[arg(long, env = "LOGES_LOG_FORMAT", default_value = "compact")]
    pub log_format: LogFormat,

    /// Configuration file path (optional); replaces the flags when given
    #[arg(long, env = "LOGES_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Derived fields (not CLI arguments)
    #[serde(skip)]
    #[arg(skip)]
    pub batch_config: BatchConfig,

    #[serde(skip)]
    #[arg(skip)]
    pub retry_config: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: "localhost".to_string(),
            port: None,
            tls: false,
            username: None,
            password: None,
            index_prefix: DEFAULT_INDEX_PREFIX.to_string(),
            doc_type: DEFAULT_DOC_TYPE.to_string(),
            ttl: DEFAULT_TTL.to_string(),
            tags: Vec::new(),
            batch_size: 100,
            max_batch_bytes: 5 * 1024 * 1024,
            flush_interval_ms: 1000,
            max_pending: 100_000,
            max_retry_attempts: 8,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 30_000,
            retry_max_elapsed_secs: 120,
            request_timeout_secs: 30,
            connection_timeout_secs: 10,
            max_connections: 10,
            enable_compression: false,
            channel_capacity: 10_000,
            input: None,
            hostname: None,
            container_id: None,
            container_name: None,
            image: None,
            log_level: LogLevel::Info,
            log_format: LogFormat::Compact,
            config_file: None,
            batch_config: BatchConfig::default(),
            retry_config: RetryConfig::default(),
        }
    }
}

impl Config {
    /// Flags and `LOGES_*` variables, or the TOML file named by
    /// `--config-file` when one is given.
    pub fn load<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config = Self::from_args(args)?;
        match config.config_file.clone() {
            Some(path) => {
                let mut from_file = Self::from_file(&path)?;
                from_file.config_file = Some(path);
                Ok(from_file)
            }
            None => Ok(config),
        }
    }

    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let mut config = Config::try_parse_from(args)?;
        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    pub fn post_process(&mut self) -> Result<(), ConfigError> {
        self.batch_config = BatchConfig {
            max_documents: self.batch_size,
            max_bytes: self.max_batch_bytes,
            flush_interval: Duration::from_millis(self.flush_interval_ms),
            max_pending: self.max_pending,
        };

        self.retry_config = RetryConfig {
            max_attempts: self.max_retry_attempts,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
            max_elapsed: Duration::from_secs(self.retry_max_elapsed_secs),
            ..RetryConfig::default()
        };

        self.tags.retain(|tag| !tag.trim().is_empty());

        if debug_requested() {
            self.log_level = LogLevel::Debug;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        resolve_endpoints(&self.address, self.port)?;

        if self.batch_size == 0 {
            return Err(ConfigError::InvalidConfig(
                "Batch size must be greater than 0".to_string(),
            ));
        }

        if self.max_batch_bytes == 0 {
            return Err(ConfigError::InvalidConfig(
                "Max batch bytes must be greater than 0".to_string(),
            ));
        }

        if self.max_pending < self.batch_size {
            return Err(ConfigError::InvalidConfig(format!(
                "Max pending ({}) must be at least the batch size ({})",
                self.max_pending, self.batch_size
            )));
        }

        if self.flush_interval_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "Flush interval must be greater than 0".to_string(),
            ));
        }

        if self.channel_capacity == 0 {
            return Err(ConfigError::InvalidConfig(
                "Channel capacity must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 || self.connection_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "Timeouts must be greater than 0".to_string(),
            ));
        }

        if self.max_retry_attempts == 0 {
            return Err(ConfigError::InvalidConfig(
                "Retry max attempts must be greater than 0".to_string(),
            ));
        }

        if self.retry_base_delay_ms > self.retry_max_delay_ms {
            return Err(ConfigError::InvalidConfig(format!(
                "Retry base delay ({}ms) exceeds the max delay ({}ms)",
                self.retry_base_delay_ms, self.retry_max_delay_ms
            )));
        }

        if self.password.is_some() && self.username.is_none() {
            return Err(ConfigError::InvalidConfig(
                "A password was given without a username".to_string(),
            ));
        }

        Ok(())
    }

    pub fn adapter_settings(&self) -> AdapterSettings {
        let ttl = Some(self.ttl.trim().to_string()).filter(|ttl| !ttl.is_empty());

        AdapterSettings {
            address: self.address.clone(),
            port: self.port,
            index_prefix: self.index_prefix.clone(),
            doc_type: self.doc_type.clone(),
            ttl,
            tags: self.tags.clone(),
            batch: self.batch_config.clone(),
            retry: self.retry_config.clone(),
            client: ClientConfig {
                tls: self.tls,
                timeout: Duration::from_secs(self.request_timeout_secs),
                connection_timeout: Duration::from_secs(self.connection_timeout_secs),
                max_connections: self.max_connections,
                enable_compression: self.enable_compression,
                username: self.username.clone(),
                password: self.password.clone(),
                ..ClientConfig::default()
            },
            error_log_window: DEFAULT_THROTTLE_WINDOW,
        }
    }

    /// Metadata attached to every line read, `None` when nothing was configured.
    pub fn source_metadata(&self) -> Option<SourceMetadata> {
        if self.hostname.is_none()
            && self.container_id.is_none()
            && self.container_name.is_none()
            && self.image.is_none()
        {
            return None;
        }

        Some(SourceMetadata {
            hostname: self.hostname.clone().unwrap_or_default(),
            container_id: self.container_id.clone().unwrap_or_default(),
            container_name: self.container_name.clone().unwrap_or_default(),
            image: self.image.clone().unwrap_or_default(),
        })
    }
}

fn debug_requested() -> bool {
    std::env::var(DEBUG_ENV).is_ok_and(|value| is_truthy(&value))
}

fn is_truthy(value: &str) -> bool {
    let value = value.trim();
    !(value.is_empty() || value == "0" || value.eq_ignore_ascii_case("false"))
}
