use lambda_http::{Body, Request, Response};
use std::time::Instant;
use tracing::info;

/// Characters of the response body kept in the exit log line
pub const BODY_PREVIEW_CHARS: usize = 200;

/// Headers echoed into the entry log line
pub const LOGGED_HEADERS: usize = 3;

/// Log method, path, query and the first few headers of an incoming request
pub fn log_request(event: &Request, request_id: &str) {
    let headers: Vec<String> = event
        .headers()
        .iter()
        .take(LOGGED_HEADERS)
        .map(|(name, value)| {
            let value = if is_secret_header(name.as_str()) {
                "[REDACTED]"
            } else {
                value.to_str().unwrap_or("[binary]")
            };
            format!("{}: {}", name, value)
        })
        .collect();

    info!(
        request_id = %request_id,
        method = %event.method(),
        path = %event.uri().path(),
        query = %event.uri().query().unwrap_or_default(),
        headers = ?headers,
        "Request received"
    );
}

/// Log status, latency and a truncated body preview of an outgoing response
pub fn log_response(response: &Response<Body>, request_id: &str, started: Instant) {
    info!(
        request_id = %request_id,
        status = %response.status(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        body = %body_preview(response.body()),
        "Response sent"
    );
}

/// First characters of a body, never splitting a multi-byte character
pub fn body_preview(body: &Body) -> String {
    let text = match body {
        Body::Empty => return String::new(),
        Body::Text(text) => text.as_str(),
        Body::Binary(bytes) => return format!("[{} bytes]", bytes.len()),
    };

    match text.char_indices().nth(BODY_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn is_secret_header(name: &str) -> bool {
    name.eq_ignore_ascii_case("authorization") || name.eq_ignore_ascii_case("cookie")
}
