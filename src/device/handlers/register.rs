use lambda_http::{Body, Request, Response};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{json_response, parse_json_body, request_id};
use crate::config::AppState;
use crate::error::{ApiError, ValidationError};
use voice_device_backend::shared::error::ServiceError;
use voice_device_backend::shared::pairing::issue_pairing_code;
use voice_device_backend::shared::validators::normalize_mac;

/// Request payload sent by a device asking for a pairing code
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub mac_address: String,
}

/// Pairing code the device shows to its owner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub code: String,
    /// Seconds until the code stops resolving
    pub expires_in: i64,
}

/// Handler for POST /device/register
///
/// Open endpoint: a factory-fresh device has no credentials yet. The MAC is
/// normalized before the code is stored so any accepted spelling binds the
/// same device.
pub async fn handle_register(event: Request, state: &AppState) -> Result<Response<Body>, ApiError> {
    let request_id = request_id(&event);
    let request: RegisterRequest = parse_json_body(&event, &request_id)?;

    if request.mac_address.trim().is_empty() {
        return Err(ValidationError::MissingField("macAddress".to_string()).into());
    }

    let mac_address = normalize_mac(&request.mac_address).map_err(|e| {
        warn!(request_id = %request_id, mac = %request.mac_address, "Rejected MAC address");
        ServiceError::InvalidMac(e)
    })?;

    let pairing_code = issue_pairing_code(
        state.pairing_codes.as_ref(),
        state.id_generator.as_ref(),
        state.clock.as_ref(),
        &mac_address,
        state.pairing_code_ttl_seconds,
    )
    .await?;

    info!(
        request_id = %request_id,
        mac_address = %mac_address,
        "Pairing code issued"
    );

    json_response(
        200,
        &RegisterResponse {
            code: pairing_code.code,
            expires_in: state.pairing_code_ttl_seconds,
        },
        &request_id,
    )
}
