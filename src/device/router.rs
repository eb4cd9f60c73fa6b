use lambda_http::{http::Method, Body, Request, Response};
use tracing::{info, warn};

use crate::config::AppState;
use crate::cors;
use crate::error::ApiError;
use crate::handlers;
use voice_device_backend::shared::error::{error_codes, ErrorResponse};

pub async fn route_request(event: Request, state: &AppState) -> Response<Body> {
    let path = normalize_path(event.uri().path());
    let method = event.method().clone();
    let request_id = handlers::request_id(&event);

    info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        "Routing device request"
    );

    if method == Method::OPTIONS {
        info!(request_id = %request_id, "Handling CORS preflight request");
        return cors::preflight_response(&state.cors_allowed_origin);
    }

    let response = match (&method, path.as_str()) {
        (&Method::GET, "/health") => handle_health(&request_id),

        (&Method::POST, "/device/register") => {
            info!(request_id = %request_id, "Register endpoint");
            respond(handlers::register::handle_register(event, state).await, &request_id)
        }
        (&Method::POST, "/device/unbind") => {
            info!(request_id = %request_id, "Unbind endpoint");
            respond(handlers::devices::unbind_device(event, state).await, &request_id)
        }
        (&Method::POST, "/device/bind/batch") => {
            info!(request_id = %request_id, "Batch bind endpoint");
            respond(handlers::batch::handle_batch_bind(event, state).await, &request_id)
        }
        (_, path) if path.starts_with("/device/") => {
            route_device_path(event, state, &method, path, &request_id).await
        }

        _ => {
            warn!(
                request_id = %request_id,
                method = %method,
                path = %path,
                "Unknown route"
            );
            not_found(&request_id)
        }
    };

    cors::add_cors_headers(response, &state.cors_allowed_origin)
}

fn normalize_path(path: &str) -> String {
    if path == "/" {
        return path.to_string();
    }

    // Strip the API Gateway stage prefix if present
    let path = match path.strip_prefix("/api") {
        Some(rest) if rest.starts_with("/device") => rest,
        _ => path,
    };

    path.trim_end_matches('/').to_string()
}

async fn route_device_path(
    event: Request,
    state: &AppState,
    method: &Method,
    path: &str,
    request_id: &str,
) -> Response<Body> {
    let parts: Vec<&str> = path.trim_start_matches("/device/").split('/').collect();

    match (method, parts.as_slice()) {
        (&Method::POST, ["bind", agent_id, device_code]) => {
            info!(request_id = %request_id, agent_id = %agent_id, "Bind endpoint");
            respond(
                handlers::bind::handle_bind(event, state, agent_id, device_code).await,
                request_id,
            )
        }
        (&Method::GET, ["bind", agent_id]) => {
            info!(request_id = %request_id, agent_id = %agent_id, "List devices endpoint");
            respond(
                handlers::devices::list_devices(event, state, agent_id).await,
                request_id,
            )
        }
        (&Method::POST, ["updateRemark", device_code]) => {
            info!(request_id = %request_id, device_code = %device_code, "Update remark endpoint");
            respond(
                handlers::bind::handle_update_remark(event, state, device_code).await,
                request_id,
            )
        }
        (&Method::PUT, ["enableOta", device_id, status]) => {
            info!(request_id = %request_id, device_id = %device_id, "Enable OTA endpoint");
            respond(
                handlers::devices::enable_ota(event, state, device_id, status).await,
                request_id,
            )
        }
        _ => {
            warn!(request_id = %request_id, method = %method, path = %path, "Unknown device route");
            not_found(request_id)
        }
    }
}

fn respond(result: Result<Response<Body>, ApiError>, request_id: &str) -> Response<Body> {
    match result {
        Ok(response) => response,
        Err(e) => {
            warn!(request_id = %request_id, error = %e, "Request failed");
            e.to_http_response(request_id)
        }
    }
}

fn handle_health(request_id: &str) -> Response<Body> {
    let body = serde_json::json!({
        "status": "healthy",
        "service": "device-api",
        "request_id": request_id
    });

    json_body(200, body.to_string())
}

fn not_found(request_id: &str) -> Response<Body> {
    let body = ErrorResponse::new(
        error_codes::RESOURCE_NOT_FOUND,
        "The requested resource was not found",
        request_id,
    )
    .to_json()
    .unwrap_or_default();

    json_body(404, body)
}

fn json_body(status: u16, body: String) -> Response<Body> {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = lambda_http::http::StatusCode::from_u16(status)
        .unwrap_or(lambda_http::http::StatusCode::INTERNAL_SERVER_ERROR);
    response.headers_mut().insert(
        "content-type",
        lambda_http::http::HeaderValue::from_static("application/json"),
    );
    response
}
