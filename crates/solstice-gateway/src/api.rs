//! Responses API request model, normalization, and cache keys.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

use crate::error::{GatewayError, Result};

/// Request body for `POST /v1/responses`, mirroring the upstream Responses
/// API. Unknown fields are rejected with a validation error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResponsesRequest {
    /// Model identifier (required)
    pub model: String,
    /// String or list of content blocks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    /// System/developer instructions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    /// Tool definitions: strings or objects (normalized before dispatch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Value>>,
    /// Tool selection constraint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<Value>,
    /// Allow parallel tool invocation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel_tool_calls: Option<bool>,
    /// Ask the provider to store the response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<bool>,
    /// Run in background mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<bool>,
    /// Reasoning options (`{"effort": ...}`, legacy `{"level": ...}`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<Value>,
    /// Stream the response as Server-Sent Events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Output token cap
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u64>,
    /// Structured output format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<Value>,
    /// Continue from a stored response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_response_id: Option<String>,
    /// Free-form metadata passed through to the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    /// Per-request timeout in seconds, honored by the upstream client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<f64>,
}

impl ResponsesRequest {
    /// Parse and validate a raw JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Validation`] on malformed bodies, unknown
    /// fields, or a missing model.
    pub fn parse(body: Value) -> Result<Self> {
        let request: Self = serde_json::from_value(body)
            .map_err(|e| GatewayError::Validation(e.to_string()))?;
        if request.model.is_empty() {
            return Err(GatewayError::Validation("'model' must be non-empty".into()));
        }
        Ok(request)
    }

    /// Whether streaming was requested.
    #[inline]
    #[must_use = "returns whether streaming was requested"]
    pub fn wants_stream(&self) -> bool {
        self.stream.unwrap_or(false)
    }

    /// Whether this request may be served from / stored into the cache:
    /// non-streaming and not a continuation.
    #[inline]
    #[must_use = "returns whether the request is cacheable"]
    pub fn is_cacheable(&self) -> bool {
        !self.wants_stream() && self.previous_response_id.is_none()
    }

    /// Approximate input size for request logging.
    #[must_use = "returns the input byte size"]
    pub fn input_bytes(&self) -> usize {
        self.input
            .as_ref()
            .map(|v| v.to_string().len())
            .unwrap_or(0)
    }

    /// Normalize tools and reasoning in place.
    pub fn normalize(&mut self) {
        if let Some(tools) = &mut self.tools {
            for tool in tools.iter_mut() {
                *tool = normalize_tool(tool.take());
            }
        }
        if let Some(reasoning) = &mut self.reasoning {
            *reasoning = normalize_reasoning(reasoning.take());
        }
    }

    /// Deterministic cache key: SHA-256 over the canonical JSON of
    /// `{model, input, instructions, tools, temperature}`.
    ///
    /// `serde_json` objects serialize with sorted keys, so the key is
    /// independent of the order fields arrived in.
    #[must_use = "returns the cache key"]
    pub fn cache_key(&self) -> String {
        let canonical = json!({
            "model": self.model,
            "input": self.input,
            "instructions": self.instructions,
            "tools": self.tools,
            "temperature": self.temperature,
        });
        let digest = Sha256::digest(canonical.to_string().as_bytes());
        format!("{digest:x}")
    }
}

/// Normalize one tool definition:
///
/// - `"web_search"` → `{"type": "web-search"}` (built-in names hyphenated);
/// - function definitions missing the `"function"` wrapper are re-wrapped;
/// - `code_interpreter` without a container gets `{"type": "auto"}`.
fn normalize_tool(tool: Value) -> Value {
    match tool {
        Value::String(name) => {
            let hyphenated = name.replace('_', "-");
            let mut obj = Map::new();
            obj.insert("type".to_string(), Value::String(hyphenated.clone()));
            if hyphenated == "code-interpreter" {
                obj.insert("container".to_string(), json!({"type": "auto"}));
            }
            Value::Object(obj)
        }
        Value::Object(mut obj) => {
            let tool_type = obj.get("type").and_then(Value::as_str).map(str::to_string);
            match tool_type.as_deref() {
                None if obj.contains_key("name") => {
                    // Bare function definition: re-wrap
                    json!({"type": "function", "function": Value::Object(obj)})
                }
                Some("code_interpreter") | Some("code-interpreter") => {
                    obj.insert(
                        "type".to_string(),
                        Value::String("code-interpreter".to_string()),
                    );
                    obj.entry("container".to_string())
                        .or_insert_with(|| json!({"type": "auto"}));
                    Value::Object(obj)
                }
                _ => Value::Object(obj),
            }
        }
        other => other,
    }
}

/// Normalize reasoning options: legacy `{"level": ...}` maps to
/// `{"effort": ...}`.
fn normalize_reasoning(reasoning: Value) -> Value {
    match reasoning {
        Value::Object(mut obj) => {
            if let Some(level) = obj.remove("level") {
                obj.entry("effort".to_string()).or_insert(level);
            }
            Value::Object(obj)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_field_rejected() {
        let body = json!({"model": "m", "input": "hi", "bogus_field": 1});
        assert!(ResponsesRequest::parse(body).is_err());
    }

    #[test]
    fn test_missing_model_rejected() {
        assert!(ResponsesRequest::parse(json!({"input": "hi"})).is_err());
        assert!(ResponsesRequest::parse(json!({"model": "", "input": "hi"})).is_err());
    }

    #[test]
    fn test_string_tool_normalized() {
        let mut req =
            ResponsesRequest::parse(json!({"model": "m", "tools": ["web_search"]})).unwrap();
        req.normalize();
        assert_eq!(req.tools.unwrap()[0], json!({"type": "web-search"}));
    }

    #[test]
    fn test_code_interpreter_gets_container() {
        let mut req = ResponsesRequest::parse(
            json!({"model": "m", "tools": ["code_interpreter", {"type": "code_interpreter"}]}),
        )
        .unwrap();
        req.normalize();
        let tools = req.tools.unwrap();
        assert_eq!(tools[0]["container"], json!({"type": "auto"}));
        assert_eq!(tools[1]["type"], "code-interpreter");
        assert_eq!(tools[1]["container"], json!({"type": "auto"}));
    }

    #[test]
    fn test_bare_function_rewrapped() {
        let mut req = ResponsesRequest::parse(json!({
            "model": "m",
            "tools": [{"name": "lookup", "parameters": {"type": "object"}}]
        }))
        .unwrap();
        req.normalize();
        let tool = &req.tools.unwrap()[0];
        assert_eq!(tool["type"], "function");
        assert_eq!(tool["function"]["name"], "lookup");
    }

    #[test]
    fn test_reasoning_level_maps_to_effort() {
        let mut req =
            ResponsesRequest::parse(json!({"model": "m", "reasoning": {"level": "high"}})).unwrap();
        req.normalize();
        assert_eq!(req.reasoning.unwrap(), json!({"effort": "high"}));
    }

    #[test]
    fn test_cache_key_is_field_order_independent() {
        let a = ResponsesRequest::parse(
            json!({"model": "m", "input": "hi", "temperature": 0.0}),
        )
        .unwrap();
        let b = ResponsesRequest::parse(
            json!({"temperature": 0.0, "input": "hi", "model": "m"}),
        )
        .unwrap();
        assert_eq!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_cache_key_ignores_non_key_fields() {
        let a = ResponsesRequest::parse(json!({"model": "m", "input": "hi"})).unwrap();
        let b = ResponsesRequest::parse(
            json!({"model": "m", "input": "hi", "max_output_tokens": 5}),
        )
        .unwrap();
        assert_eq!(a.cache_key(), b.cache_key());

        let c = ResponsesRequest::parse(json!({"model": "m", "input": "other"})).unwrap();
        assert_ne!(a.cache_key(), c.cache_key());
    }

    #[test]
    fn test_cacheable_rules() {
        let plain = ResponsesRequest::parse(json!({"model": "m", "input": "x"})).unwrap();
        assert!(plain.is_cacheable());

        let streaming =
            ResponsesRequest::parse(json!({"model": "m", "input": "x", "stream": true})).unwrap();
        assert!(!streaming.is_cacheable());

        let continuation = ResponsesRequest::parse(
            json!({"model": "m", "input": "x", "previous_response_id": "resp_1"}),
        )
        .unwrap();
        assert!(!continuation.is_cacheable());
    }
}
