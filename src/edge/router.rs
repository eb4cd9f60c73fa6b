use lambda_http::{http::Method, Body, Request, Response};
use tracing::{info, warn};

use crate::config::EdgeState;
use crate::cors;
use crate::error::ApiError;
use crate::handlers;
use voice_device_backend::shared::error::{error_codes, ErrorResponse};

pub async fn route_request(event: Request, state: &EdgeState) -> Response<Body> {
    let path = normalize_path(event.uri().path());
    let method = event.method().clone();
    let request_id = handlers::request_id(&event);

    info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        "Routing edge request"
    );

    if method == Method::OPTIONS {
        return cors::preflight_response(&state.cors_allowed_origin);
    }

    let response = match (&method, path.as_str()) {
        (&Method::GET, "/health") => handle_health(&request_id),

        (&Method::POST, "/config/server-base") => {
            info!(request_id = %request_id, "Server base config endpoint");
            respond(handlers::config::server_base(event, state).await, &request_id)
        }
        (&Method::POST, "/config/agent-models") => {
            info!(request_id = %request_id, "Agent models endpoint");
            respond(
                handlers::config::agent_models_for_device(event, state).await,
                &request_id,
            )
        }
        (&Method::POST, "/config/get-mac") => {
            info!(request_id = %request_id, "MAC authorization endpoint");
            respond(handlers::config::get_mac(event, state).await, &request_id)
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

    let path = match path.strip_prefix("/api") {
        Some(rest) if rest.starts_with("/config") => rest,
        _ => path,
    };

    path.trim_end_matches('/').to_string()
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
        "service": "edge-config-api",
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
