use chrono::DateTime;
use lambda_http::Request;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::config::AppState;
use crate::error::{ApiError, AuthError};
use voice_device_backend::shared::error::ServiceError;
use voice_device_backend::shared::time::Clock;

/// Minutes between `last_used_at` writes for one token
const LAST_USED_THROTTLE_MINUTES: i64 = 5;

/// Hash a user token: hex SHA-256 of pepper || token
///
/// The pepper never reaches DynamoDB, so a leaked tokens table cannot be
/// used to verify guessed tokens.
pub fn hash_token(pepper: &str, token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(pepper.as_bytes());
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Extract the raw token from `Authorization: Bearer <token>`
pub fn bearer_token(event: &Request) -> Result<&str, AuthError> {
    let auth_header = event
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidFormat)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::InvalidToken);
    }

    Ok(token)
}

/// Authenticate the caller and return their user id
///
/// Looks the peppered hash up in the user tokens table, rejects inactive
/// tokens and records `last_used_at` at most every five minutes.
pub async fn authenticate_user(event: &Request, state: &AppState) -> Result<String, ApiError> {
    let token = bearer_token(event)?;
    let token_hash = hash_token(&state.token_pepper, token);

    let record = state
        .user_tokens
        .get_by_hash(&token_hash)
        .await
        .map_err(ServiceError::from)?
        .ok_or(AuthError::InvalidToken)?;

    if !record.is_active {
        return Err(AuthError::TokenRevoked.into());
    }

    if should_update_last_used(&record.last_used_at, state.clock.as_ref()) {
        // Validation already succeeded; the write is best-effort
        if let Err(e) = state
            .user_tokens
            .update_last_used(&token_hash, &state.clock.now_rfc3339())
            .await
        {
            warn!(user_id = %record.user_id, error = %e, "Failed to record token use");
        }
    }

    Ok(record.user_id)
}

/// True when `last_used_at` is missing, unparseable, or at least five minutes old
fn should_update_last_used(last_used_at: &Option<String>, clock: &dyn Clock) -> bool {
    let Some(ts) = last_used_at else {
        return true;
    };

    let last_used = match DateTime::parse_from_rfc3339(ts) {
        Ok(dt) => dt.with_timezone(&chrono::Utc),
        Err(_) => return true,
    };

    let now = match DateTime::parse_from_rfc3339(&clock.now_rfc3339()) {
        Ok(dt) => dt.with_timezone(&chrono::Utc),
        Err(_) => return true,
    };

    now.signed_duration_since(last_used).num_minutes() >= LAST_USED_THROTTLE_MINUTES
}
