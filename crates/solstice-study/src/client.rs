//! Gateway client seam.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, StudyError};

/// Client interface for creating responses through the gateway.
///
/// The evaluator takes this as a trait object so tests can script model
/// answers; production uses [`HttpGatewayClient`]. The gateway owns the
/// retry and caching behavior, so this client stays a thin transport.
#[async_trait]
pub trait ResponsesClient: Send + Sync {
    /// POST a Responses API body and return the response body.
    ///
    /// # Errors
    ///
    /// Returns [`StudyError::Gateway`] on transport failures or non-success
    /// statuses.
    async fn create(&self, request: Value) -> Result<Value>;
}

/// HTTP client for a running solstice gateway.
#[derive(Debug, Clone)]
pub struct HttpGatewayClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGatewayClient {
    /// Create a client for a gateway at `base_url` (e.g.
    /// `http://127.0.0.1:8106`).
    #[must_use = "returns the constructed client"]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ResponsesClient for HttpGatewayClient {
    async fn create(&self, request: Value) -> Result<Value> {
        let url = format!("{}/v1/responses", self.base_url);
        debug!(%url, "posting evaluation request to gateway");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| StudyError::Gateway(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StudyError::Gateway(format!("gateway returned {status}: {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| StudyError::Gateway(e.to_string()))
    }
}
