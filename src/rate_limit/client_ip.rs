use axum::http::HeaderMap;
use std::net::SocketAddr;

/// Headers consulted for the client address, highest priority first
pub const FORWARDED_IP_HEADERS: [&str; 4] =
    ["X-Real-IP", "X-Forwarded-For", "X-Forwarded", "Client-IP"];

/// Identity used when neither headers nor the connection reveal an address
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Resolve the identity of the client behind a request.
///
/// The first non-empty proxy header wins and its value is used verbatim;
/// otherwise the connection's remote IP is used.
pub fn client_ip(headers: &HeaderMap, remote: Option<SocketAddr>) -> String {
    FORWARDED_IP_HEADERS
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .find(|value| !value.is_empty())
        .map(str::to_string)
        .or_else(|| remote.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}
