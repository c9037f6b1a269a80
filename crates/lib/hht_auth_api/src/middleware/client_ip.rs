//! Client address extraction for rate-limit keys.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::request::Parts;

use crate::AppState;

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Client address used in rate-limit keys.
///
/// The socket peer address, unless the server sits behind
/// `trusted_proxy_hops` reverse proxies. Then the `X-Forwarded-For` entry
/// that many hops from the right is used, since entries further left are
/// client-supplied. Falls back to `"unknown"` when neither is available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl ClientIp {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve the address from request parts.
    pub fn from_parts(parts: &Parts, trusted_proxy_hops: usize) -> Self {
        if trusted_proxy_hops > 0
            && let Some(ip) = forwarded_for(&parts.headers, trusted_proxy_hops)
        {
            return ClientIp(ip);
        }
        let ip = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".into());
        ClientIp(ip)
    }
}

/// The entry appended by the outermost trusted proxy.
///
/// With fewer entries than hops, the left-most one is the best available.
fn forwarded_for(headers: &HeaderMap, hops: usize) -> Option<String> {
    let entries: Vec<&str> = headers
        .get_all(FORWARDED_FOR)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    entries
        .iter()
        .rev()
        .nth(hops - 1)
        .or_else(|| entries.first())
        .map(|s| s.to_string())
}

impl FromRequestParts<AppState> for ClientIp {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(ClientIp::from_parts(parts, state.config.trusted_proxy_hops))
    }
}
