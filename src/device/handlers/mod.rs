pub mod batch;
pub mod bind;
pub mod devices;
pub mod register;

use lambda_http::{Body, Request, RequestExt, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{error, warn};
use url::form_urlencoded;

use crate::error::{ApiError, ValidationError};

/// Lambda request id, or "local" outside of Lambda
pub fn request_id(event: &Request) -> String {
    event
        .lambda_context_ref()
        .map(|ctx| ctx.request_id.clone())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| "local".to_string())
}

/// First value of a query parameter
///
/// API Gateway fills the query map; direct invocations only carry the URI.
pub fn query_param(event: &Request, name: &str) -> Option<String> {
    if let Some(value) = event
        .query_string_parameters_ref()
        .and_then(|params| params.first(name))
    {
        return Some(value.to_string());
    }

    event.uri().query().and_then(|query| {
        form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    })
}

/// Deserialize a JSON request body
pub fn parse_json_body<T: DeserializeOwned>(
    event: &Request,
    request_id: &str,
) -> Result<T, ApiError> {
    let body_bytes = match event.body() {
        Body::Text(text) => text.as_bytes(),
        Body::Binary(bytes) => bytes.as_slice(),
        Body::Empty => {
            return Err(ValidationError::MissingField("request body".to_string()).into());
        }
    };

    serde_json::from_slice(body_bytes).map_err(|e| {
        warn!(request_id = %request_id, error = %e, "Failed to parse request body");
        ValidationError::InvalidBody(format!("Invalid JSON: {}", e)).into()
    })
}

/// Serialize `payload` into a JSON response with `status`
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
