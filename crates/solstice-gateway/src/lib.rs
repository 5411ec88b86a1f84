//! # solstice-gateway
//!
//! HTTP gateway in front of an upstream "Responses API" provider.
//!
//! What it adds over a raw proxy:
//!
//! - **request normalization**: tool shorthand expansion, legacy
//!   reasoning fields, strict rejection of unknown body fields;
//! - **response caching**: content-addressed filesystem cache keyed by
//!   SHA-256 over the canonicalized request, TTL-evicted, never consulted
//!   for streaming or continuation requests;
//! - **bounded retries**: exponential backoff for timeouts, connection
//!   failures, and 5xx; provider 4xx surfaces immediately (404 is
//!   translated to a model-not-found validation error);
//! - **streaming passthrough**: upstream SSE re-framed as
//!   `data: <json>\n\n` events terminated by exactly one `data: [DONE]`.
//!
//! Handlers are independent; the cache is the only shared mutable
//! resource and it is safe for concurrent readers and writers.

pub mod api;
pub mod cache;
pub mod error;
pub mod handlers;
pub mod retry;
pub mod upstream;

pub use api::ResponsesRequest;
pub use cache::{ResponseCache, DEFAULT_TTL};
pub use error::{GatewayError, UpstreamError};
pub use retry::RetryPolicy;
pub use upstream::{ByteStream, OpenAiProvider, ResponsesProvider};

use axum::routing::{get, post};
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Gateway configuration, typically assembled from the environment.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Bind host (default `127.0.0.1`)
    pub host: String,
    /// Bind port (default `8106`)
    pub port: u16,
    /// Response cache directory; `None` disables caching
    pub cache_dir: Option<PathBuf>,
    /// Cache TTL
    pub cache_ttl: Duration,
    /// Upstream base URL
    pub base_url: String,
    /// Upstream credential
    pub api_key: String,
    /// Retry policy for upstream calls
    pub retry: RetryPolicy,
}

impl GatewayConfig {
    /// Read configuration from the environment: `SOLSTICE_GATEWAY_HOST`,
    /// `SOLSTICE_GATEWAY_PORT`, `FILESYSTEM_CACHE_DIR`, `OPENAI_API_KEY`.
    /// Unknown variables are ignored; unset ones fall back to defaults.
    #[must_use = "returns the assembled configuration"]
    pub fn from_env() -> Self {
        let host =
            std::env::var("SOLSTICE_GATEWAY_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = std::env::var("SOLSTICE_GATEWAY_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8106);
        let cache_dir = Some(
            std::env::var("FILESYSTEM_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("cache/llm_responses")),
        );
        let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();

        Self {
            host,
            port,
            cache_dir,
            cache_ttl: DEFAULT_TTL,
            base_url: OpenAiProvider::DEFAULT_BASE_URL.to_string(),
            api_key,
            retry: RetryPolicy::default(),
        }
    }

    /// `host:port` bind address.
    #[must_use = "returns the bind address"]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct GatewayState {
    /// Upstream provider (trait object so tests can script one)
    pub provider: Arc<dyn ResponsesProvider>,
    /// Response cache, if enabled
    pub cache: Option<Arc<ResponseCache>>,
    /// Retry policy wrapping every provider call
    pub retry: RetryPolicy,
}

impl GatewayState {
    /// Assemble state from a configuration, constructing the production
    /// provider.
    #[must_use = "returns the constructed state"]
    pub fn from_config(config: &GatewayConfig) -> Self {
        let cache = config
            .cache_dir
            .as_ref()
            .map(|dir| Arc::new(ResponseCache::new(dir.clone(), config.cache_ttl)));
        Self {
            provider: Arc::new(OpenAiProvider::new(
                config.base_url.clone(),
                config.api_key.clone(),
            )),
            cache,
            retry: config.retry,
        }
    }

    /// State over an explicit provider (tests, alternative upstreams).
    #[must_use = "returns the constructed state"]
    pub fn with_provider(
        provider: Arc<dyn ResponsesProvider>,
        cache: Option<Arc<ResponseCache>>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            provider,
            cache,
            retry,
        }
    }
}

/// Build the gateway router.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/v1/responses", post(handlers::create_response))
        .route(
            "/v1/responses/{id}",
            get(handlers::retrieve_response).delete(handlers::delete_response),
        )
        .route("/models", get(handlers::models))
        .route("/api-info", get(handlers::api_info))
        .route("/pricing", get(handlers::pricing))
        .layer(axum::middleware::from_fn(handlers::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the process exits.
///
/// # Errors
///
/// Returns an error if the listener cannot bind.
pub async fn serve(config: GatewayConfig) -> std::io::Result<()> {
    let addr = config.bind_addr();
    let state = GatewayState::from_config(&config);
    info!(
        addr = %addr,
        cache_enabled = state.cache.is_some(),
        "starting solstice gateway"
    );

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await
}
