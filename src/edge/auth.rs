use lambda_http::Request;

use crate::error::AuthError;

/// Validates the Bearer server secret shared with the voice edge servers
///
/// Uses constant-time comparison.
pub fn validate_server_secret(event: &Request, expected: &str) -> Result<(), AuthError> {
    let auth_header = event
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidFormat)?
        .trim();

    if token.is_empty() || !constant_time_compare(token, expected) {
        return Err(AuthError::InvalidToken);
    }

    Ok(())
}

/// Compares every byte of equal-length inputs regardless of where they differ
fn constant_time_compare(a: &str, b: &str) -> bool {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    if a_bytes.len() != b_bytes.len() {
        return false;
    }

    let mut result = 0u8;
    for (a_byte, b_byte) in a_bytes.iter().zip(b_bytes.iter()) {
        result |= a_byte ^ b_byte;
    }

    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use lambda_http::Body;

    fn create_test_request(auth_header: Option<&str>) -> Request {
        let mut builder = lambda_http::http::Request::builder()
            .method("POST")
            .uri("/config/server-base");

        if let Some(auth) = auth_header {
            builder = builder.header("authorization", auth);
        }

        builder.body(Body::Empty).unwrap()
    }

    #[test]
    fn test_validate_server_secret() {
        let secret = "edge-secret-123";

        assert!(validate_server_secret(&create_test_request(Some("Bearer edge-secret-123")), secret).is_ok());
        assert!(matches!(
            validate_server_secret(&create_test_request(Some("Bearer edge-secret-124")), secret),
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            validate_server_secret(&create_test_request(None), secret),
            Err(AuthError::MissingToken)
        ));
        assert!(matches!(
            validate_server_secret(&create_test_request(Some("edge-secret-123")), secret),
            Err(AuthError::InvalidFormat)
        ));
        assert!(matches!(
            validate_server_secret(&create_test_request(Some("Bearer ")), secret),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("secret", "secret"));
        assert!(!constant_time_compare("secret", "secreT"));
        assert!(!constant_time_compare("secret", "secret-longer"));
        assert!(constant_time_compare("", ""));
    }
}
