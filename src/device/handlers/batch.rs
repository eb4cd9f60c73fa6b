use bytes::Bytes;
use lambda_http::{Body, Request, Response};
use multer::Multipart;
use std::convert::Infallible;
use tracing::{info, warn};

use super::{json_response, query_param, request_id};
use crate::auth::authenticate_user;
use crate::config::AppState;
use crate::error::{ApiError, ValidationError};
use voice_device_backend::shared::bulk_import::{read_device_codes, MAX_IMPORT_ROWS};
use voice_device_backend::shared::error::ServiceError;

/// Multipart field carrying the uploaded file
const FILE_FIELD: &str = "file";

/// Handler for POST /device/bind/batch
///
/// Binds every device code in the first column of the uploaded CSV or
/// spreadsheet to `agentId`. Rows that fail are reported in the response and
/// do not stop the rest of the file.
///
/// # Query Parameters
/// * `agentId` - Agent to bind to (required)
/// * `remark` - Remark applied to every device (optional)
///
/// # Returns
/// * HTTP 200 with the batch report
/// * HTTP 400 if the file is missing, empty, unreadable or over 5000 codes
/// * HTTP 404 if the agent is not the caller's
pub async fn handle_batch_bind(
    event: Request,
    state: &AppState,
) -> Result<Response<Body>, ApiError> {
    let request_id = request_id(&event);
    let user_id = authenticate_user(&event, state).await?;

    let agent_id = query_param(&event, "agentId")
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ValidationError::MissingField("agentId".to_string()))?;
    let remark = query_param(&event, "remark").unwrap_or_default();

    let registry = state.registry();
    registry.require_owned_agent(&user_id, &agent_id).await?;

    let file = read_upload(&event, &request_id).await?;
    let codes = read_device_codes(&file, MAX_IMPORT_ROWS)?;
    if codes.is_empty() {
        return Err(ServiceError::EmptyImport.into());
    }

    info!(
        request_id = %request_id,
        agent_id = %agent_id,
        file_bytes = file.len(),
        codes = codes.len(),
        "Processing batch bind"
    );

    let report = registry
        .bind_batch(&user_id, &agent_id, &remark, &codes)
        .await;

    json_response(200, &report, &request_id)
}

/// Extract the `file` part of a multipart/form-data body
async fn read_upload(event: &Request, request_id: &str) -> Result<Bytes, ApiError> {
    let content_type = event
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ValidationError::MissingField("content-type".to_string()))?;

    let boundary = multer::parse_boundary(content_type).map_err(|e| {
        warn!(request_id = %request_id, error = %e, "Request is not multipart/form-data");
        ValidationError::InvalidFormat("content-type".to_string())
    })?;

    let body = match event.body() {
        Body::Text(text) => Bytes::copy_from_slice(text.as_bytes()),
        Body::Binary(bytes) => Bytes::copy_from_slice(bytes),
        Body::Empty => return Err(ValidationError::MissingField(FILE_FIELD.to_string()).into()),
    };

    let stream = futures::stream::once(async move { Ok::<_, Infallible>(body) });
    let mut multipart = Multipart::new(stream, boundary);

    while let Some(field) = multipart.next_field().await.map_err(invalid_multipart)? {
        if field.name() == Some(FILE_FIELD) {
            return field.bytes().await.map_err(invalid_multipart);
        }
    }

    Err(ValidationError::MissingField(FILE_FIELD.to_string()).into())
}

fn invalid_multipart(err: multer::Error) -> ApiError {
    ValidationError::InvalidBody(format!("Invalid multipart body: {}", err)).into()
}
