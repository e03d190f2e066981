//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all proxy handler
//! - Build the origin HTTP client
//! - Wire up middleware (tracing, request ID, inbound body limits)
//!
//! # Design Decisions
//! - No whole-request deadline layer: the origin client's own timeout fails
//!   a slow origin as a 502 with the error text
//! - Inbound bodies are bounded in size and in read time
//! - Serve on a listener until shutdown

use axum::{http::HeaderName, routing::any, Router};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::RequestBodyTimeoutLayer,
    trace::TraceLayer,
};

use crate::cache::TieredCache;
use crate::config::ProxyConfig;
use crate::http::handler::proxy_handler;
use crate::http::origin::Origin;
use crate::http::request::{UuidRequestId, X_REQUEST_ID};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<TieredCache>,
    pub origin: Arc<Origin>,
    pub client: reqwest::Client,
    pub key_includes_query: bool,
    /// Largest inbound body relayed to the origin.
    pub max_body_bytes: usize,
}

/// HTTP server for the caching proxy.
pub struct HttpServer {
    router: Router,
    origin: Arc<Origin>,
}

impl HttpServer {
    /// Create a new HTTP server forwarding cache misses to `origin`.
    pub fn new(
        config: &ProxyConfig,
        cache: Arc<TieredCache>,
        origin: Origin,
    ) -> Result<Self, reqwest::Error> {
        // Redirects are relayed to the client, not followed.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        let origin = Arc::new(origin);
        let state = AppState {
            cache,
            origin: origin.clone(),
            client,
            key_includes_query: config.cache.key_includes_query,
            max_body_bytes: config.limits.max_body_bytes,
        };

        let router = Self::build_router(config, state);
        Ok(Self { router, origin })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let request_id = HeaderName::from_static(X_REQUEST_ID);
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(RequestBodyTimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(RequestBodyLimitLayer::new(config.limits.max_body_bytes))
            .layer(PropagateRequestIdLayer::new(request_id.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(request_id, UuidRequestId))
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            origin = %self.origin,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The router, for serving in-process without a listener.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}
