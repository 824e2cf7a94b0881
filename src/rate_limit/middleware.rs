use super::client_ip::client_ip;
use super::limiter::RateLimiter;
use super::types::RateLimitResult;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use tracing::{debug, error};

pub const LIMIT_HEADER: &str = "X-RateLimit-Limit";
pub const REMAINING_HEADER: &str = "X-RateLimit-Remaining";

/// Axum middleware guarding a handler with one limiter.
///
/// Install with `axum::middleware::from_fn_with_state(limiter, rate_limit_middleware)`.
/// A store error answers 500, an exceeded quota answers 403, and anything
/// else is forwarded to the inner handler.
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0);
    let identity = client_ip(request.headers(), remote);

    match limiter.check(&identity).await {
        Err(e) => {
            error!(limiter = %limiter.name(), "Rate limiter error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong").into_response()
        }
        Ok(result) if result.exceeded => create_exceeded_response(&result),
        Ok(result) => {
            debug!(
                limiter = %limiter.name(),
                "Forwarding request from {}, remaining: {}",
                identity,
                result.remaining()
            );
            let mut response = next.run(request).await;
            add_rate_limit_headers(response.headers_mut(), &result);
            response
        }
    }
}

/// Create a 403 Forbidden response for an identity over its quota
fn create_exceeded_response(result: &RateLimitResult) -> Response {
    let mut headers = HeaderMap::new();
    add_rate_limit_headers(&mut headers, result);

    (StatusCode::FORBIDDEN, headers, "Request limit exceeded").into_response()
}

/// Add rate limit headers to a response.
///
/// With several limiters stacked, the innermost one's values are kept.
pub fn add_rate_limit_headers(headers: &mut HeaderMap, result: &RateLimitResult) {
    if headers.contains_key(LIMIT_HEADER) {
        return;
    }
    headers.insert(LIMIT_HEADER, HeaderValue::from(result.limit));
    headers.insert(REMAINING_HEADER, HeaderValue::from(result.remaining()));
}
