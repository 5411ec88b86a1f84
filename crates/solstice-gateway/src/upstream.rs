//! Upstream Responses API provider.

use async_trait::async_trait;
use axum::body::Bytes;
use futures::stream::{Stream, StreamExt};
use serde_json::Value;
use std::pin::Pin;
use std::time::Duration;
use tracing::debug;

use crate::api::ResponsesRequest;
use crate::error::UpstreamError;

/// Raw byte stream from a streaming upstream response.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, UpstreamError>> + Send>>;

/// Provider interface the gateway dispatches to.
///
/// One production implementation talks to the OpenAI-compatible Responses
/// endpoint; tests substitute a scripted mock. The retry wrapper sits
/// outside this trait, so implementations report each attempt's outcome
/// faithfully.
#[async_trait]
pub trait ResponsesProvider: Send + Sync {
    /// Create a response (non-streaming).
    async fn create(&self, request: &ResponsesRequest) -> Result<Value, UpstreamError>;

    /// Create a response as a raw SSE byte stream.
    async fn create_stream(&self, request: &ResponsesRequest) -> Result<ByteStream, UpstreamError>;

    /// Retrieve a previously stored response.
    async fn retrieve(&self, response_id: &str) -> Result<Value, UpstreamError>;

    /// Delete a stored response.
    async fn delete(&self, response_id: &str) -> Result<Value, UpstreamError>;

    /// Provider name for `/health` and logs.
    fn name(&self) -> &str;
}

/// Reqwest-backed provider for an OpenAI-compatible Responses API.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAiProvider {
    /// Default upstream endpoint.
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";

    /// Create a provider for `base_url` with a bearer credential.
    #[must_use = "returns the constructed provider"]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    fn classify(error: reqwest::Error) -> UpstreamError {
        if error.is_timeout() {
            UpstreamError::Timeout
        } else if error.is_connect() {
            UpstreamError::Connect(error.to_string())
        } else {
            UpstreamError::Protocol(error.to_string())
        }
    }

    async fn error_from_status(response: reqwest::Response) -> UpstreamError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        UpstreamError::Status { status, body }
    }

    fn request_builder(
        &self,
        method: reqwest::Method,
        path: &str,
        timeout: Option<f64>,
    ) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(&self.api_key);
        if let Some(seconds) = timeout {
            builder = builder.timeout(Duration::from_secs_f64(seconds));
        }
        builder
    }
}

#[async_trait]
impl ResponsesProvider for OpenAiProvider {
    async fn create(&self, request: &ResponsesRequest) -> Result<Value, UpstreamError> {
        debug!(model = %request.model, "dispatching create to upstream");
        let response = self
            .request_builder(reqwest::Method::POST, "/responses", request.timeout)
            .json(request)
            .send()
            .await
            .map_err(Self::classify)?;

        if !response.status().is_success() {
            return Err(Self::error_from_status(response).await);
        }
        response
            .json()
            .await
            .map_err(|e| UpstreamError::Protocol(e.to_string()))
    }

    async fn create_stream(&self, request: &ResponsesRequest) -> Result<ByteStream, UpstreamError> {
        debug!(model = %request.model, "dispatching streaming create to upstream");
        let response = self
            .request_builder(reqwest::Method::POST, "/responses", request.timeout)
            .json(request)
            .send()
            .await
            .map_err(Self::classify)?;

        if !response.status().is_success() {
            return Err(Self::error_from_status(response).await);
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| UpstreamError::Protocol(e.to_string())));
        Ok(Box::pin(stream))
    }

    async fn retrieve(&self, response_id: &str) -> Result<Value, UpstreamError> {
        let response = self
            .request_builder(
                reqwest::Method::GET,
                &format!("/responses/{response_id}"),
                None,
            )
            .send()
            .await
            .map_err(Self::classify)?;

        if !response.status().is_success() {
            return Err(Self::error_from_status(response).await);
        }
        response
            .json()
            .await
            .map_err(|e| UpstreamError::Protocol(e.to_string()))
    }

    async fn delete(&self, response_id: &str) -> Result<Value, UpstreamError> {
        let response = self
            .request_builder(
                reqwest::Method::DELETE,
                &format!("/responses/{response_id}"),
                None,
            )
            .send()
            .await
            .map_err(Self::classify)?;

        if !response.status().is_success() {
            return Err(Self::error_from_status(response).await);
        }
        response
            .json()
            .await
            .map_err(|e| UpstreamError::Protocol(e.to_string()))
    }

    fn name(&self) -> &str {
        "openai"
    }
}
