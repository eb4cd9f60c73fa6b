use lambda_http::{Body, Request, Response};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{json_response, parse_json_body, request_id};
use crate::auth::authenticate_user;
use crate::config::AppState;
use crate::error::{ApiError, ValidationError};

/// Request payload for POST /device/unbind
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnbindRequest {
    #[serde(default)]
    pub device_id: String,
}

/// Response payload for POST /device/unbind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnbindResponse {
    pub status: String,
    /// False when there was nothing of the caller's to remove
    pub removed: bool,
}

/// Handler for GET /device/bind/{agentId}
///
/// Lists the caller's devices bound to the agent, most recently bound first.
pub async fn list_devices(
    event: Request,
    state: &AppState,
    agent_id: &str,
) -> Result<Response<Body>, ApiError> {
    let request_id = request_id(&event);
    let user_id = authenticate_user(&event, state).await?;

    let devices = state.registry().list_devices(&user_id, agent_id).await?;

    info!(
        request_id = %request_id,
        agent_id = %agent_id,
        count = devices.len(),
        "Listed bound devices"
    );

    json_response(200, &devices, &request_id)
}

/// Handler for POST /device/unbind
///
/// Succeeds for unknown ids so a retried unbind is harmless.
pub async fn unbind_device(event: Request, state: &AppState) -> Result<Response<Body>, ApiError> {
    let request_id = request_id(&event);
    let user_id = authenticate_user(&event, state).await?;
    let request: UnbindRequest = parse_json_body(&event, &request_id)?;

    let device_id = request.device_id.trim();
    if device_id.is_empty() {
        return Err(ValidationError::MissingField("deviceId".to_string()).into());
    }

    let removed = state.registry().unbind_device(&user_id, device_id).await?;

    info!(
        request_id = %request_id,
        device_id = %device_id,
        removed = removed,
        "Processed unbind request"
    );

    json_response(
        200,
        &UnbindResponse {
            status: "ok".to_string(),
            removed,
        },
        &request_id,
    )
}

/// Handler for PUT /device/enableOta/{id}/{status}
///
/// `status` is `1` to enable OTA auto-update and `0` to disable it.
pub async fn enable_ota(
    event: Request,
    state: &AppState,
    device_id: &str,
    status: &str,
) -> Result<Response<Body>, ApiError> {
    let request_id = request_id(&event);
    let user_id = authenticate_user(&event, state).await?;

    let status: i64 = status
        .parse()
        .map_err(|_| ValidationError::InvalidValue("status".to_string()))?;

    let device = state
        .registry()
        .set_auto_update(&user_id, device_id, status)
        .await?;

    info!(
        request_id = %request_id,
        device_id = %device_id,
        auto_update = device.auto_update,
        "Updated OTA setting"
    );

    json_response(200, &device, &request_id)
}
