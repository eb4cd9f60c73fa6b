use lambda_http::{Body, Request, Response};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::info;

use super::{json_response, parse_json_body, request_id};
use crate::auth::validate_server_secret;
use crate::config::EdgeState;
use crate::error::ApiError;
use voice_device_backend::shared::agent_config::{agent_models, server_base_config};
use voice_device_backend::shared::authorization::{check_mac_authorization, MacAuthRequest};
use voice_device_backend::shared::error::ServiceError;

/// Request payload for POST /config/agent-models
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentModelsRequest {
    #[serde(default)]
    pub mac_address: String,
    /// Connection id on the edge server, only logged
    #[serde(default)]
    pub client_id: Option<String>,
    /// Models the edge server already has loaded, by module type
    #[serde(default)]
    pub selected_module: BTreeMap<String, String>,
}

/// Handler for POST /config/server-base
///
/// Returns every system parameter folded into one nested object.
pub async fn server_base(event: Request, state: &EdgeState) -> Result<Response<Body>, ApiError> {
    let request_id = request_id(&event);
    validate_server_secret(&event, &state.server_secret)?;

    let params = state
        .params
        .list()
        .await
        .map_err(ServiceError::from)?;
    let param_count = params.len();
    let config = server_base_config(params);

    info!(
        request_id = %request_id,
        params = param_count,
        "Built server base config"
    );

    json_response(200, &config, &request_id)
}

/// Handler for POST /config/agent-models
///
/// # Returns
/// * HTTP 200 with the agent's prompt and the models the caller is missing
/// * HTTP 400 if the MAC is missing or malformed
/// * HTTP 404 if the device is not bound or its agent no longer exists
pub async fn agent_models_for_device(
    event: Request,
    state: &EdgeState,
) -> Result<Response<Body>, ApiError> {
    let request_id = request_id(&event);
    validate_server_secret(&event, &state.server_secret)?;
    let request: AgentModelsRequest = parse_json_body(&event, &request_id)?;

    info!(
        request_id = %request_id,
        mac_address = %request.mac_address,
        client_id = request.client_id.as_deref().unwrap_or("-"),
        "Resolving agent models"
    );

    let models = agent_models(
        state.devices.as_ref(),
        state.agents.as_ref(),
        state.clock.as_ref(),
        &request.mac_address,
        &request.selected_module,
    )
    .await?;

    json_response(200, &models, &request_id)
}

/// Handler for POST /config/get-mac
pub async fn get_mac(event: Request, state: &EdgeState) -> Result<Response<Body>, ApiError> {
    let request_id = request_id(&event);
    validate_server_secret(&event, &state.server_secret)?;
    let request: MacAuthRequest = parse_json_body(&event, &request_id)?;

    let verdict = check_mac_authorization(
        state.allow_list.as_ref(),
        state.authorizer.as_ref(),
        &request,
    )
    .await?;

    info!(
        request_id = %request_id,
        mac = %verdict.mac,
        authorized = verdict.authorized,
        source = ?verdict.source,
        "MAC authorization checked"
    );

    json_response(200, &verdict, &request_id)
}
