// Edge config API binary entry point

#[path = "edge/error.rs"]
mod error;

#[path = "edge/config.rs"]
mod config;

#[path = "edge/auth.rs"]
mod auth;

#[path = "edge/router.rs"]
mod router;

#[path = "edge/handlers/mod.rs"]
mod handlers;

mod cors;
mod request_log;

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use config::EdgeState;

async fn function_handler(event: Request, state: &EdgeState) -> Result<Response<Body>, Error> {
    let started = Instant::now();
    let request_id = handlers::request_id(&event);

    request_log::log_request(&event, &request_id);
    let response = router::route_request(event, state).await;
    request_log::log_response(&response, &request_id, started);

    Ok(response)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .without_time()
        .init();

    let state = Arc::new(EdgeState::from_env().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        Error::from(format!("Configuration error: {}", e))
    })?);

    run(service_fn(move |event: Request| {
        let state = Arc::clone(&state);
        async move { function_handler(event, &state).await }
    }))
    .await
}
