pub mod config;

use lambda_http::{Body, Request, RequestExt, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{error, warn};

use crate::error::{ApiError, ValidationError};

/// Lambda request id, or "local" outside of Lambda
pub fn request_id(event: &Request) -> String {
    event
        .lambda_context_ref()
        .map(|ctx| ctx.request_id.clone())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| "local".to_string())
}

/// Deserialize a JSON request body; an empty body reads as `{}`
pub fn parse_json_body<T: DeserializeOwned>(
    event: &Request,
    request_id: &str,
) -> Result<T, ApiError> {
    let body_bytes: &[u8] = match event.body() {
        Body::Text(text) => text.as_bytes(),
        Body::Binary(bytes) => bytes.as_slice(),
        Body::Empty => b"{}",
    };

    serde_json::from_slice(body_bytes).map_err(|e| {
        warn!(request_id = %request_id, error = %e, "Failed to parse request body");
        ValidationError::InvalidBody(format!("Invalid JSON: {}", e)).into()
    })
}

pub fn json_response<T: Serialize>(
    status: u16,
    payload: &T,
    request_id: &str,
) -> Result<Response<Body>, ApiError> {
    let response_body = serde_json::to_string(payload).map_err(|e| {
        error!(request_id = %request_id, error = %e, "Failed to serialize response");
        ApiError::Internal(format!("Failed to serialize response: {}", e))
    })?;

    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(response_body))
        .map_err(|e| ApiError::Internal(format!("Failed to build response: {}", e)))
}
