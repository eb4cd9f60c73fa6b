use lambda_http::{Body, Response};
use thiserror::Error;

use voice_device_backend::shared::error::{error_codes, ErrorResponse, ServiceError};

/// Main error type for the device API
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Authentication-specific errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authorization header is missing")]
    MissingToken,

    #[error("Authorization header format is invalid")]
    InvalidFormat,

    #[error("Token is invalid or not found")]
    InvalidToken,

    #[error("Token has been revoked")]
    TokenRevoked,
}

/// Request-shape errors raised before any service runs
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required field missing: {0}")]
    MissingField(String),

    #[error("Invalid format for field: {0}")]
    InvalidFormat(String),

    #[error("Invalid value for field: {0}")]
    InvalidValue(String),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),
}

impl ApiError {
    /// Convert error to HTTP response with appropriate status code and error payload
    pub fn to_http_response(&self, request_id: &str) -> Response<Body> {
        let (status, error_code, message): (u16, &str, String) = match self {
            ApiError::Auth(AuthError::MissingToken) => (
                401,
                error_codes::MISSING_TOKEN,
                "Authorization header is required".to_string(),
            ),
            ApiError::Auth(AuthError::InvalidFormat) => (
                401,
                error_codes::UNAUTHORIZED,
                "Authorization header must use the Bearer scheme".to_string(),
            ),
            ApiError::Auth(AuthError::InvalidToken) => (
                401,
                error_codes::INVALID_TOKEN,
                "Token is invalid or not found".to_string(),
            ),
            ApiError::Auth(AuthError::TokenRevoked) => (
                401,
                error_codes::TOKEN_REVOKED,
                "Token has been revoked".to_string(),
            ),
            ApiError::Validation(ValidationError::MissingField(field)) => (
                400,
                error_codes::MISSING_FIELD,
                format!("Required field missing: {}", field),
            ),
            ApiError::Validation(ValidationError::InvalidFormat(field)) => (
                400,
                error_codes::INVALID_FORMAT,
                format!("Invalid format for field: {}", field),
            ),
            ApiError::Validation(ValidationError::InvalidValue(field)) => (
                400,
                error_codes::INVALID_VALUE,
                format!("Invalid value for field: {}", field),
            ),
            ApiError::Validation(ValidationError::InvalidBody(msg)) => {
                (400, error_codes::INVALID_FORMAT, msg.clone())
            }
            ApiError::Service(err) => (err.status(), err.error_code(), err.public_message()),
            ApiError::Internal(_) => (
                500,
                error_codes::INTERNAL_ERROR,
                "Internal server error occurred".to_string(),
            ),
        };

        let error_response = ErrorResponse::new(error_code, &message, request_id);

        let body = error_response
            .to_json()
            .unwrap_or_else(|_| r#"{"error":"INTERNAL_ERROR","message":"Failed to serialize error response","request_id":""}"#.to_string());

        Response::builder()
            .status(status)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap_or_else(|_| {
                Response::new(Body::from(
                    r#"{"error":"INTERNAL_ERROR","message":"Failed to build response"}"#,
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voice_device_backend::shared::error::StoreError;

    fn body_json(response: &Response<Body>) -> serde_json::Value {
        match response.body() {
            Body::Text(text) => serde_json::from_str(text).unwrap(),
            _ => panic!("Expected text body"),
        }
    }

    #[test]
    fn test_auth_errors_are_401() {
        let cases = vec![
            (AuthError::MissingToken, "MISSING_TOKEN"),
            (AuthError::InvalidFormat, "UNAUTHORIZED"),
            (AuthError::InvalidToken, "INVALID_TOKEN"),
            (AuthError::TokenRevoked, "TOKEN_REVOKED"),
        ];

        for (error, code) in cases {
            let response = ApiError::Auth(error).to_http_response("req-1");
            assert_eq!(response.status(), 401);
            assert_eq!(body_json(&response)["error"], code);
        }
    }

    #[test]
    fn test_service_error_keeps_its_code_and_status() {
        let response = ApiError::Service(ServiceError::DeviceAlreadyBound(
            "AABBCCDDEEFF".to_string(),
        ))
        .to_http_response("req-2");

        assert_eq!(response.status(), 409);
        let body = body_json(&response);
        assert_eq!(body["error"], "DEVICE_ALREADY_BOUND");
        assert_eq!(body["request_id"], "req-2");
        assert!(body["message"].as_str().unwrap().contains("AABBCCDDEEFF"));
    }

    #[test]
    fn test_store_details_do_not_leak() {
        let response = ApiError::Service(ServiceError::Store(StoreError::DynamoDb(
            "AccessDenied on arn:aws:dynamodb:devices".to_string(),
        )))
        .to_http_response("req-3");

        assert_eq!(response.status(), 500);
        let body = body_json(&response);
        assert_eq!(body["error"], "DATABASE_ERROR");
        assert!(!body["message"].as_str().unwrap().contains("arn:aws"));
    }

    #[test]
    fn test_validation_error_response() {
        let response = ApiError::Validation(ValidationError::MissingField("agentId".to_string()))
            .to_http_response("req-4");

        assert_eq!(response.status(), 400);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
        assert_eq!(body_json(&response)["error"], "MISSING_FIELD");
    }
}
