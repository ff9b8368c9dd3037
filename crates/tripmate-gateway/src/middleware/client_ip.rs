//! Client address resolution.

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use std::net::{IpAddr, SocketAddr};

/// Resolved client address, stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

/// State for the [`client_ip`] middleware.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientIpConfig {
    /// Take the first `X-Forwarded-For` entry instead of the peer address.
    pub trust_proxy: bool,
}

/// Pick the client address for a request.
///
/// Without `trust_proxy` forwarding headers are ignored entirely, so a
/// caller cannot choose its own rate-limit bucket.
pub fn resolve_client_ip(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> String {
    if trust_proxy {
        if let Some(ip) = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|first| first.trim().parse::<IpAddr>().ok())
        {
            return normalize(ip);
        }
    }
    peer.map(|addr| normalize(addr.ip()))
        .unwrap_or_else(|| "unknown".to_string())
}

fn normalize(ip: IpAddr) -> String {
    match ip {
        IpAddr::V6(v6) => v6
            .to_ipv4_mapped()
            .map(|v4| v4.to_string())
            .unwrap_or_else(|| v6.to_string()),
        IpAddr::V4(v4) => v4.to_string(),
    }
}

/// Insert a [`ClientIp`] extension for downstream middleware and handlers.
pub async fn client_ip(State(config): State<ClientIpConfig>, mut req: Request, next: Next) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = resolve_client_ip(req.headers(), peer, config.trust_proxy);
    req.extensions_mut().insert(ClientIp(ip));
    next.run(req).await
}
