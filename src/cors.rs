use lambda_http::http::HeaderValue;
use lambda_http::{Body, Response};

/// Add CORS headers to a response
///
/// `allowed_origin` comes from `CORS_ALLOWED_ORIGIN` (default `*`). An origin
/// that is not a valid header value falls back to `*`.
pub fn add_cors_headers(mut response: Response<Body>, allowed_origin: &str) -> Response<Body> {
    let headers = response.headers_mut();

    headers.insert(
        "Access-Control-Allow-Origin",
        HeaderValue::from_str(allowed_origin).unwrap_or(HeaderValue::from_static("*")),
    );
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET, POST, PUT, OPTIONS"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    headers.insert("Access-Control-Max-Age", HeaderValue::from_static("3600"));

    response
}

/// Create a preflight response for OPTIONS requests
pub fn preflight_response(allowed_origin: &str) -> Response<Body> {
    let mut response = Response::new(Body::Empty);
    *response.status_mut() = lambda_http::http::StatusCode::OK;

    add_cors_headers(response, allowed_origin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_cors_headers_with_origin() {
        let response = add_cors_headers(Response::new(Body::Empty), "https://console.example.com");

        let headers = response.headers();
        assert_eq!(
            headers.get("Access-Control-Allow-Origin").unwrap(),
            "https://console.example.com"
        );
        assert_eq!(
            headers.get("Access-Control-Allow-Methods").unwrap(),
            "GET, POST, PUT, OPTIONS"
        );
        assert_eq!(
            headers.get("Access-Control-Allow-Headers").unwrap(),
            "Content-Type, Authorization"
        );
        assert_eq!(headers.get("Access-Control-Max-Age").unwrap(), "3600");
    }

    #[test]
    fn test_invalid_origin_falls_back_to_wildcard() {
        let response = add_cors_headers(Response::new(Body::Empty), "bad\norigin");
        assert_eq!(
            response.headers().get("Access-Control-Allow-Origin").unwrap(),
            "*"
        );
    }

    #[test]
    fn test_preflight_response() {
        let response = preflight_response("*");

        assert_eq!(response.status(), 200);
        assert!(matches!(response.body(), Body::Empty));
        assert_eq!(
            response.headers().get("Access-Control-Allow-Origin").unwrap(),
            "*"
        );
    }
}
