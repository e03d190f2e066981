//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Connect the cache tiers
//! - Run the clear-cache administrative action, or
//! - Bind the listener and serve until shutdown

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::cache::{CacheError, TieredCache};
use crate::config::{load_config, ConfigError, ProxyConfig};
use crate::http::{HttpServer, Origin, OriginError};
use crate::lifecycle::Shutdown;
use crate::observability::{logging, metrics};

/// What the process was asked to do.
#[derive(Debug, Clone)]
pub struct StartupOptions {
    /// Port to listen on.
    pub port: u16,
    /// Origin server; required unless only clearing the cache.
    pub origin: Option<String>,
    /// Clear both cache tiers and exit without serving.
    pub clear_cache: bool,
    /// Path of the TOML config file.
    pub config_path: PathBuf,
}

/// Fatal startup failure.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("origin server URL is required")]
    MissingOrigin,

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Origin(#[from] OriginError),

    #[error("failed to build origin client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run the proxy to completion.
pub async fn run(options: StartupOptions) -> Result<(), StartupError> {
    if options.origin.is_none() && !options.clear_cache {
        return Err(StartupError::MissingOrigin);
    }

    let config = load_config(&options.config_path)?;
    logging::init(&config.observability.log_level);
    log_config(&options, &config);

    let cache = TieredCache::connect(&config.cache)
        .await?
        .with_remote_write_timeout(Duration::from_secs(config.timeouts.remote_write_secs));

    if options.clear_cache {
        cache.remove_all().await?;
        tracing::info!("Cache cleared");
        return Ok(());
    }

    let origin = Origin::parse(options.origin.as_deref().unwrap_or_default())?;

    if config.observability.metrics_enabled {
        // Validation already checked the address.
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        }
    }

    let server = HttpServer::new(&config, Arc::new(cache), origin)?;
    let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], options.port))).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    shutdown.trigger_on_signal();

    server.run(listener, server_shutdown).await?;
    tracing::info!("Shutdown complete");
    Ok(())
}

fn log_config(options: &StartupOptions, config: &ProxyConfig) {
    tracing::info!(
        config_path = %options.config_path.display(),
        capacity = config.cache.capacity,
        ttl = %humantime::format_duration(config.cache.ttl),
        remote_tier = config.cache.redis.is_enabled(),
        key_includes_query = config.cache.key_includes_query,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );
}
