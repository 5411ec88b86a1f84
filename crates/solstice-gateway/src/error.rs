//! Gateway error types and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors raised while talking to the upstream provider.
///
/// The retry wrapper looks at [`UpstreamError::is_retryable`] to decide
/// whether another attempt is worth making.
#[derive(Error, Debug, Clone)]
pub enum UpstreamError {
    /// The request or response timed out.
    #[error("upstream request timed out")]
    Timeout,

    /// TCP/TLS connection failure.
    #[error("upstream connection failed: {0}")]
    Connect(String),

    /// Malformed response or transport-level protocol failure.
    #[error("upstream protocol error: {0}")]
    Protocol(String),

    /// The provider answered with a non-success status.
    #[error("upstream returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body (may be truncated)
        body: String,
    },
}

impl UpstreamError {
    /// Transient errors are retried with backoff; provider 4xx responses
    /// propagate immediately.
    #[must_use = "returns whether the error is retryable"]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::Connect(_) | Self::Protocol(_) => true,
            Self::Status { status, .. } => *status >= 500,
        }
    }
}

/// Errors surfaced to HTTP callers.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Malformed request body or unknown fields.
    #[error("validation error: {0}")]
    Validation(String),

    /// The provider does not know the requested model (upstream 404).
    #[error("model '{0}' not found")]
    ModelNotFound(String),

    /// Upstream 4xx other than 404; surfaced with the provider's status.
    #[error("upstream rejected the request ({status}): {body}")]
    UpstreamRejected {
        /// HTTP status code from the provider
        status: u16,
        /// Provider's response body
        body: String,
    },

    /// Transient upstream failure that survived the retry budget.
    #[error("upstream unavailable after retries: {0}")]
    UpstreamUnavailable(String),
}

impl GatewayError {
    /// Classify an exhausted upstream error for the HTTP caller, naming the
    /// model on 404s.
    #[must_use = "returns the mapped gateway error"]
    pub fn from_upstream(error: UpstreamError, model: &str) -> Self {
        match error {
            UpstreamError::Status { status: 404, .. } => Self::ModelNotFound(model.to_string()),
            UpstreamError::Status { status, body } if status < 500 => {
                Self::UpstreamRejected { status, body }
            }
            other => Self::UpstreamUnavailable(other.to_string()),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::ModelNotFound(_) => StatusCode::BAD_REQUEST,
            Self::UpstreamRejected { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": {
                "message": self.to_string(),
                "type": match &self {
                    Self::Validation(_) | Self::ModelNotFound(_) => "invalid_request_error",
                    Self::UpstreamRejected { .. } => "upstream_error",
                    Self::UpstreamUnavailable(_) => "upstream_unavailable",
                }
            }
        }));
        (status, body).into_response()
    }
}

/// Result alias for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(UpstreamError::Timeout.is_retryable());
        assert!(UpstreamError::Connect("refused".into()).is_retryable());
        assert!(UpstreamError::Protocol("bad chunk".into()).is_retryable());
        assert!(UpstreamError::Status { status: 503, body: String::new() }.is_retryable());
        assert!(!UpstreamError::Status { status: 400, body: String::new() }.is_retryable());
        assert!(!UpstreamError::Status { status: 404, body: String::new() }.is_retryable());
    }

    #[test]
    fn test_404_names_the_model() {
        let err = GatewayError::from_upstream(
            UpstreamError::Status { status: 404, body: "no such model".into() },
            "gpt-x",
        );
        assert!(matches!(err, GatewayError::ModelNotFound(ref m) if m == "gpt-x"));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_4xx_passes_status_through() {
        let err = GatewayError::from_upstream(
            UpstreamError::Status { status: 429, body: "rate limited".into() },
            "m",
        );
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_exhausted_transient_is_bad_gateway() {
        let err = GatewayError::from_upstream(UpstreamError::Timeout, "m");
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }
}
