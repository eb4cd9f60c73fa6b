use lambda_http::{Body, Request, Response};
use tracing::info;

use super::{json_response, query_param, request_id};
use crate::auth::authenticate_user;
use crate::config::AppState;
use crate::error::{ApiError, ValidationError};

/// Handler for POST /device/bind/{agentId}/{deviceCode}
///
/// `deviceCode` is a live pairing code or the 12-digit MAC-derived code.
/// Optional `remark` query parameter.
///
/// # Returns
/// * HTTP 200 with the bound device
/// * HTTP 400 for an unknown or expired pairing code or a malformed code
/// * HTTP 404 if the agent is not the caller's
/// * HTTP 409 if the device is already bound
pub async fn handle_bind(
    event: Request,
    state: &AppState,
    agent_id: &str,
    device_code: &str,
) -> Result<Response<Body>, ApiError> {
    let request_id = request_id(&event);
    let user_id = authenticate_user(&event, state).await?;
    let remark = query_param(&event, "remark").unwrap_or_default();

    info!(
        request_id = %request_id,
        user_id = %user_id,
        agent_id = %agent_id,
        "Processing bind request"
    );

    let device = state
        .registry()
        .bind_device(&user_id, agent_id, device_code, &remark)
        .await?;

    json_response(200, &device, &request_id)
}

/// Handler for POST /device/updateRemark/{deviceCode}
///
/// The `remark` query parameter must be present; an empty value clears it.
pub async fn handle_update_remark(
    event: Request,
    state: &AppState,
    device_code: &str,
) -> Result<Response<Body>, ApiError> {
    let request_id = request_id(&event);
    let user_id = authenticate_user(&event, state).await?;
    let remark = query_param(&event, "remark")
        .ok_or_else(|| ValidationError::MissingField("remark".to_string()))?;

    info!(
        request_id = %request_id,
        user_id = %user_id,
        device_code = %device_code,
        "Processing remark update"
    );

    let device = state
        .registry()
        .update_remark(&user_id, device_code, &remark)
        .await?;

    json_response(200, &device, &request_id)
}
