//! HTTP request handlers.

use axum::extract::{Path, State};
use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use futures::stream::{Stream, StreamExt};
use serde_json::{json, Value};
use std::convert::Infallible;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::ResponsesRequest;
use crate::error::{GatewayError, Result, UpstreamError};
use crate::upstream::ByteStream;
use crate::GatewayState;

/// Request ID assigned on arrival and echoed in `X-Request-ID`.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Middleware: assign a request ID and stamp it on the response.
pub async fn request_id_middleware(mut request: Request<axum::body::Body>, next: Next) -> Response {
    let id = Uuid::new_v4().to_string();
    request.extensions_mut().insert(RequestId(id.clone()));
    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// `GET /health`
pub async fn health(State(state): State<GatewayState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "providers": [state.provider.name()],
        "cache_enabled": state.cache.is_some(),
        "api_version": "v1",
    }))
}

/// `POST /v1/responses`
pub async fn create_response(
    State(state): State<GatewayState>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Json(body): Json<Value>,
) -> Result<Response> {
    let mut request = ResponsesRequest::parse(body)?;
    request.normalize();

    info!(
        request_id = %request_id,
        provider = state.provider.name(),
        model = %request.model,
        input_bytes = request.input_bytes(),
        has_tools = request.tools.as_ref().is_some_and(|t| !t.is_empty()),
        has_previous_response = request.previous_response_id.is_some(),
        stream = request.wants_stream(),
        "responses request received"
    );

    if request.wants_stream() {
        // Streaming bypasses the cache entirely.
        let upstream = state
            .retry
            .run("responses.stream", |_| state.provider.create_stream(&request))
            .await
            .map_err(|e| GatewayError::from_upstream(e, &request.model))?;
        return Ok(Sse::new(relay_events(upstream)).into_response());
    }

    let cache_key = request.is_cacheable().then(|| request.cache_key());
    if let (Some(key), Some(cache)) = (&cache_key, &state.cache) {
        if let Some(hit) = cache.get(key) {
            info!(request_id = %request_id, "serving cached response");
            return Ok(Json(hit).into_response());
        }
    }

    let started = Instant::now();
    let body = state
        .retry
        .run("responses.create", |_| state.provider.create(&request))
        .await
        .map_err(|e| GatewayError::from_upstream(e, &request.model))?;

    let duration_ms = started.elapsed().as_millis() as u64;
    let input_tokens = body
        .pointer("/usage/input_tokens")
        .and_then(Value::as_u64)
        .unwrap_or(0);
    let output_tokens = body
        .pointer("/usage/output_tokens")
        .and_then(Value::as_u64)
        .unwrap_or(0);
    info!(
        request_id = %request_id,
        model = %request.model,
        input_tokens,
        output_tokens,
        duration_ms,
        "responses request completed"
    );

    if let (Some(key), Some(cache)) = (&cache_key, &state.cache) {
        cache.set(key, &body);
    }

    Ok(Json(body).into_response())
}

/// `GET /v1/responses/{id}`
pub async fn retrieve_response(
    State(state): State<GatewayState>,
    Path(response_id): Path<String>,
) -> Result<Response> {
    let body = state
        .retry
        .run("responses.retrieve", |_| state.provider.retrieve(&response_id))
        .await
        .map_err(|e| match e {
            UpstreamError::Status { status: 404, .. } => {
                GatewayError::Validation(format!("response '{response_id}' not found"))
            }
            other => GatewayError::from_upstream(other, ""),
        })?;
    Ok(Json(body).into_response())
}

/// `DELETE /v1/responses/{id}`
pub async fn delete_response(
    State(state): State<GatewayState>,
    Path(response_id): Path<String>,
) -> Result<Response> {
    let body = state
        .retry
        .run("responses.delete", |_| state.provider.delete(&response_id))
        .await
        .map_err(|e| match e {
            UpstreamError::Status { status: 404, .. } => {
                GatewayError::Validation(format!("response '{response_id}' not found"))
            }
            other => GatewayError::from_upstream(other, ""),
        })?;
    Ok(Json(body).into_response())
}

/// `GET /models`
pub async fn models() -> impl IntoResponse {
    Json(json!({
        "object": "list",
        "data": [
            {"id": "gpt-4o", "object": "model", "owned_by": "openai"},
            {"id": "gpt-4o-mini", "object": "model", "owned_by": "openai"},
            {"id": "o1", "object": "model", "owned_by": "openai"},
            {"id": "o3-mini", "object": "model", "owned_by": "openai"},
        ]
    }))
}

/// `GET /api-info`
pub async fn api_info(State(state): State<GatewayState>) -> impl IntoResponse {
    Json(json!({
        "name": "solstice-gateway",
        "api_version": "v1",
        "provider": state.provider.name(),
        "endpoints": [
            "GET /health",
            "POST /v1/responses",
            "GET /v1/responses/{id}",
            "DELETE /v1/responses/{id}",
            "GET /models",
            "GET /api-info",
            "GET /pricing",
        ],
    }))
}

/// `GET /pricing`: per-million-token rates for the models `/models` lists.
pub async fn pricing() -> impl IntoResponse {
    Json(json!({
        "currency": "USD",
        "per_million_tokens": {
            "gpt-4o": {"input": 2.50, "output": 10.00},
            "gpt-4o-mini": {"input": 0.15, "output": 0.60},
            "o1": {"input": 15.00, "output": 60.00},
            "o3-mini": {"input": 1.10, "output": 4.40},
        }
    }))
}

/// Re-emit upstream SSE bytes as well-formed `data:` frames, terminated by
/// exactly one `data: [DONE]`.
///
/// Upstream `[DONE]` markers are swallowed and replaced by the terminal
/// frame this function appends, so the discipline holds even when the
/// upstream ends abruptly. Dropping the returned stream (client
/// cancellation) drops the upstream connection with it.
fn relay_events(upstream: ByteStream) -> impl Stream<Item = std::result::Result<Event, Infallible>> {
    let payloads = upstream
        .scan(String::new(), |buffer, chunk| {
            let out = match chunk {
                Ok(bytes) => {
                    buffer.push_str(&String::from_utf8_lossy(&bytes));
                    drain_data_payloads(buffer)
                }
                Err(error) => {
                    warn!(%error, "upstream stream failed mid-flight");
                    vec![json!({"error": {"message": error.to_string()}}).to_string()]
                }
            };
            futures::future::ready(Some(out))
        })
        .map(futures::stream::iter)
        .flatten()
        .filter(|payload| futures::future::ready(payload.as_str() != "[DONE]"))
        .map(|payload| Ok(Event::default().data(payload)));

    payloads.chain(futures::stream::once(futures::future::ready(Ok(
        Event::default().data("[DONE]"),
    ))))
}

/// Pull complete `data:` payloads out of the buffer, leaving any partial
/// event in place.
fn drain_data_payloads(buffer: &mut String) -> Vec<String> {
    let mut payloads = Vec::new();

    while let Some(boundary) = buffer.find("\n\n") {
        let event: String = buffer.drain(..boundary + 2).collect();
        for line in event.lines() {
            if let Some(data) = line.strip_prefix("data:") {
                payloads.push(data.trim_start().to_string());
            }
        }
    }

    payloads
}
