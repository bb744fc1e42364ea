use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use super::api::{error_response, ApiError};

/// Reject oversized requests and bodies that are not JSON
pub async fn request_validation_middleware(
    max_request_size: usize,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    validate_request_size(request.headers(), max_request_size)?;
    validate_content_type(request.method(), request.headers())?;

    Ok(next.run(request).await)
}

/// Bodies on POST/PUT/PATCH must be JSON. Requests without a body pass.
fn validate_content_type(method: &Method, headers: &HeaderMap) -> Result<(), ApiError> {
    if !matches!(*method, Method::POST | Method::PUT | Method::PATCH) || !has_body(headers) {
        return Ok(());
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    if !content_type.starts_with("application/json") {
        warn!("Invalid content type: {:?}", content_type);
        return Err(error_response(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Content-Type must be application/json",
        ));
    }

    Ok(())
}

fn has_body(headers: &HeaderMap) -> bool {
    if headers.contains_key(header::TRANSFER_ENCODING) {
        return true;
    }
    content_length(headers).is_some_and(|length| length > 0)
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
}

fn validate_request_size(headers: &HeaderMap, max_request_size: usize) -> Result<(), ApiError> {
    match content_length(headers) {
        Some(length) if length > max_request_size as u64 => {
            warn!("Request too large: {} bytes", length);
            Err(error_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                &format!(
                    "Request size {} bytes exceeds maximum of {} bytes",
                    length, max_request_size
                ),
            ))
        }
        _ => Ok(()),
    }
}

/// CORS headers for browser clients
pub async fn cors_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;

    insert_static(
        response.headers_mut(),
        &[
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (
                header::ACCESS_CONTROL_ALLOW_METHODS,
                "GET, POST, PUT, DELETE, OPTIONS",
            ),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
            (header::ACCESS_CONTROL_MAX_AGE, "86400"),
        ],
    );

    response
}

pub async fn security_headers_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;

    insert_static(
        response.headers_mut(),
        &[
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
            (header::X_FRAME_OPTIONS, "DENY"),
            (header::REFERRER_POLICY, "strict-origin-when-cross-origin"),
            (header::CONTENT_SECURITY_POLICY, "default-src 'self'"),
        ],
    );

    response
}

fn insert_static(headers: &mut HeaderMap, values: &[(HeaderName, &'static str)]) {
    for (name, value) in values {
        headers.insert(name.clone(), HeaderValue::from_static(value));
    }
}
