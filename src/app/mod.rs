pub mod adapter;
pub mod config;
pub mod logging;

pub use adapter::{AdapterSettings, LogesAdapter};
pub use config::{Config, ConfigError, LogFormat, LogLevel};
pub use logging::{LoggingError, setup_logging};

use crate::collector::{LineCollector, open_input};
use anyhow::Context;
use tokio::signal;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal as unix_signal};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

pub struct App {
    config: Config,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Reads lines until the input ends or a shutdown signal arrives, then
    /// flushes what is left.
    pub async fn run(self) -> anyhow::Result<()> {
        let config = self.config;
        let mut adapter = LogesAdapter::new(config.adapter_settings())
            .context("Failed to construct the adapter")?;

        let reader = open_input(config.input.as_deref())
            .await
            .context("Failed to open input")?;
        let (tx, rx) = mpsc::channel(config.channel_capacity);
        let collector = LineCollector::new(config.source_metadata());
        let collector_task = tokio::spawn(async move { collector.run(reader, tx).await });

        info!("loges-forwarder is running. Press Ctrl+C to stop.");

        tokio::select! {
            () = adapter.stream(rx) => {
                match collector_task.await {
                    Ok(Ok(lines)) => info!("Input exhausted after {} lines", lines),
                    Ok(Err(e)) => error!("Collector failed: {}", e),
                    Err(e) => error!("Collector task ended abnormally: {}", e),
                }
            }
            () = shutdown_signal() => {
                collector_task.abort();
            }
        }

        let stats = adapter.close().await;
        info!(
            "Shutdown complete: {} added, {} delivered, {} rejected, {} dropped, {} retries",
            stats.documents_added,
            stats.documents_delivered,
            stats.documents_rejected,
            stats.documents_dropped,
            stats.retries
        );
        Ok(())
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        match unix_signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    () = wait_for_ctrl_c() => {}
                    _ = sigterm.recv() => info!("Received SIGTERM, initiating graceful shutdown"),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                wait_for_ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    wait_for_ctrl_c().await;
}

/// Never returns when the handler cannot be installed.
async fn wait_for_ctrl_c() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received SIGINT (Ctrl+C), initiating graceful shutdown"),
        Err(e) => {
            error!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

// Main entry point for the application
pub async fn main() -> anyhow::Result<()> {
    let config = match Config::load(std::env::args_os()) {
        Ok(config) => config,
        Err(ConfigError::Args(e)) => e.exit(),
        Err(e) => return Err(e).context("Invalid configuration"),
    };

    setup_logging(config.log_level, config.log_format).context("Failed to initialise logging")?;

    info!("Starting loges-forwarder v{}", crate::VERSION);
    info!(
        "Configuration: address={}, index_prefix={}, batch_size={}, flush_interval_ms={}",
        config.address, config.index_prefix, config.batch_size, config.flush_interval_ms
    );

    App::new(config).run().await
}
