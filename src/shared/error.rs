use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validators::ValidationError;

/// Standard error response payload
/// Contains stable machine-readable error code, human-readable message, and request ID
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable machine-readable error code (e.g., "INVALID_MAC", "UNAUTHORIZED")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Request ID for tracing and debugging
    pub request_id: String,
}

impl ErrorResponse {
    pub fn new(
        error: impl Into<String>,
        message: impl Into<String>,
        request_id: impl Into<String>,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            request_id: request_id.into(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Common error codes used across the API
pub mod error_codes {
    // Authentication errors
    pub const MISSING_TOKEN: &str = "MISSING_TOKEN";
    pub const INVALID_TOKEN: &str = "INVALID_TOKEN";
    pub const TOKEN_REVOKED: &str = "TOKEN_REVOKED";
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";

    // Validation errors
    pub const MISSING_FIELD: &str = "MISSING_FIELD";
    pub const INVALID_FORMAT: &str = "INVALID_FORMAT";
    pub const INVALID_VALUE: &str = "INVALID_VALUE";
    pub const INVALID_MAC: &str = "INVALID_MAC";
    pub const INVALID_DEVICE_CODE: &str = "INVALID_DEVICE_CODE";

    // Binding errors
    pub const ACTIVATION_CODE_INVALID: &str = "ACTIVATION_CODE_INVALID";
    pub const DEVICE_ALREADY_BOUND: &str = "DEVICE_ALREADY_BOUND";
    pub const PAIRING_CODE_EXHAUSTED: &str = "PAIRING_CODE_EXHAUSTED";

    // Import errors
    pub const IMPORT_LIMIT_EXCEEDED: &str = "IMPORT_LIMIT_EXCEEDED";
    pub const EMPTY_IMPORT: &str = "EMPTY_IMPORT";
    pub const SPREADSHEET_ERROR: &str = "SPREADSHEET_ERROR";

    // Not found errors
    pub const DEVICE_NOT_FOUND: &str = "DEVICE_NOT_FOUND";
    pub const DEVICE_NOT_BOUND: &str = "DEVICE_NOT_BOUND";
    pub const AGENT_NOT_FOUND: &str = "AGENT_NOT_FOUND";
    pub const RESOURCE_NOT_FOUND: &str = "RESOURCE_NOT_FOUND";

    // Downstream errors
    pub const UPSTREAM_ERROR: &str = "UPSTREAM_ERROR";

    // Database errors
    pub const DATABASE_ERROR: &str = "DATABASE_ERROR";

    // Internal errors
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Persistence errors raised by the store implementations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("DynamoDB error: {0}")]
    DynamoDb(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl<E> From<aws_sdk_dynamodb::error::SdkError<E>> for StoreError
where
    E: std::fmt::Debug,
{
    fn from(err: aws_sdk_dynamodb::error::SdkError<E>) -> Self {
        StoreError::DynamoDb(format!("{:?}", err))
    }
}

impl From<serde_dynamo::Error> for StoreError {
    fn from(err: serde_dynamo::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Domain failures of the device, config and authorization operations
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Required field missing: {0}")]
    MissingField(String),

    #[error("Invalid value for field: {0}")]
    InvalidValue(String),

    #[error("{0}")]
    InvalidMac(ValidationError),

    #[error("Device code '{0}' is neither a pairing code nor a MAC-derived device code")]
    InvalidDeviceCode(String),

    #[error("Pairing code is unknown or has expired")]
    ActivationCodeInvalid,

    #[error("Device {0} is already bound")]
    DeviceAlreadyBound(String),

    #[error("No free pairing code after {0} attempts")]
    PairingCodeExhausted(usize),

    #[error("Device not found")]
    DeviceNotFound,

    #[error("Device {0} is not bound to any agent")]
    DeviceNotBound(String),

    #[error("Agent not found")]
    AgentNotFound,

    #[error("File contains more than {0} device codes")]
    ImportLimitExceeded(usize),

    #[error("No device codes found in file")]
    EmptyImport,

    #[error("Failed to parse file: {0}")]
    Spreadsheet(String),

    #[error("Authorization service error: {0}")]
    Upstream(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    /// Stable machine-readable code for this failure
    pub fn error_code(&self) -> &'static str {
        match self {
            ServiceError::MissingField(_) => error_codes::MISSING_FIELD,
            ServiceError::InvalidValue(_) => error_codes::INVALID_VALUE,
            ServiceError::InvalidMac(_) => error_codes::INVALID_MAC,
            ServiceError::InvalidDeviceCode(_) => error_codes::INVALID_DEVICE_CODE,
            ServiceError::ActivationCodeInvalid => error_codes::ACTIVATION_CODE_INVALID,
            ServiceError::DeviceAlreadyBound(_) => error_codes::DEVICE_ALREADY_BOUND,
            ServiceError::PairingCodeExhausted(_) => error_codes::PAIRING_CODE_EXHAUSTED,
            ServiceError::DeviceNotFound => error_codes::DEVICE_NOT_FOUND,
            ServiceError::DeviceNotBound(_) => error_codes::DEVICE_NOT_BOUND,
            ServiceError::AgentNotFound => error_codes::AGENT_NOT_FOUND,
            ServiceError::ImportLimitExceeded(_) => error_codes::IMPORT_LIMIT_EXCEEDED,
            ServiceError::EmptyImport => error_codes::EMPTY_IMPORT,
            ServiceError::Spreadsheet(_) => error_codes::SPREADSHEET_ERROR,
            ServiceError::Upstream(_) => error_codes::UPSTREAM_ERROR,
            ServiceError::Store(_) => error_codes::DATABASE_ERROR,
        }
    }

    /// HTTP status the failure maps to
    pub fn status(&self) -> u16 {
        match self {
            ServiceError::MissingField(_)
            | ServiceError::InvalidValue(_)
            | ServiceError::InvalidMac(_)
            | ServiceError::InvalidDeviceCode(_)
            | ServiceError::ActivationCodeInvalid
            | ServiceError::ImportLimitExceeded(_)
            | ServiceError::EmptyImport
            | ServiceError::Spreadsheet(_) => 400,
            ServiceError::DeviceNotFound
            | ServiceError::DeviceNotBound(_)
            | ServiceError::AgentNotFound => 404,
            ServiceError::DeviceAlreadyBound(_) => 409,
            ServiceError::Upstream(_) => 502,
            ServiceError::PairingCodeExhausted(_) => 503,
            ServiceError::Store(_) => 500,
        }
    }

    /// Message safe to return to callers; store details stay in the logs
    pub fn public_message(&self) -> String {
        match self {
            ServiceError::Store(_) => "Internal database error occurred".to_string(),
            other => other.to_string(),
        }
    }
}
