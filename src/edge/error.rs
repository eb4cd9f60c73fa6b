use lambda_http::{Body, Response};
use thiserror::Error;

use voice_device_backend::shared::error::{error_codes, ErrorResponse, ServiceError};

/// Main error type for the edge config API
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

/// Server secret failures
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authorization header is missing")]
    MissingToken,

    #[error("Authorization header format is invalid")]
    InvalidFormat,

    #[error("Server secret does not match")]
    InvalidToken,
}

#[derive(Debug, Error)]
pub enum ValidationError {
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
                "Server secret is invalid".to_string(),
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

        let body = ErrorResponse::new(error_code, message, request_id)
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
