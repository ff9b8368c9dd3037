//! Reverse proxy to the TripMate domain services.
//!
//! [`UpstreamProxy`] forwards a routed request to its upstream exactly once
//! and relays the response status, headers and body unchanged, including
//! upstream `4xx`/`5xx`. Only transport failures (refused connection,
//! timeout, broken stream) become errors.

use crate::error::{ProxyError, ProxyResult};
use axum::http::{HeaderMap, HeaderName, HeaderValue, header};
use reqwest::Client;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, instrument};
use tripmate_kernel::gateway::{GatewayContext, GatewayResponse, TRUST_HEADER};

/// Connection-scoped headers that are never forwarded in either direction.
pub const HOP_BY_HOP_HEADERS: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Proxies routed requests to their upstream service.
pub struct UpstreamProxy {
    client: Client,
}

impl UpstreamProxy {
    /// Create a proxy whose single forwarding attempt is bounded by `timeout`.
    ///
    /// Upstream redirects are relayed to the caller, never followed.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { client })
    }

    /// Forward the request held in `ctx` to its resolved upstream.
    #[instrument(skip(self, ctx), fields(request_id = %ctx.request.id, path = %ctx.request.path))]
    pub async fn forward(&self, ctx: &GatewayContext) -> ProxyResult<GatewayResponse> {
        let route = ctx
            .route_match
            .as_ref()
            .ok_or_else(|| ProxyError::Internal("request reached the proxy unrouted".to_string()))?;

        let mut url = format!("{}{}", route.upstream_base_url, route.upstream_path);
        if let Some(query) = ctx.request.query.as_deref().filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(query);
        }
        debug!(url = %url, upstream = %route.service, "Forwarding to upstream");

        let mut headers = strip_hop_by_hop(&ctx.request.headers);
        headers.remove(header::HOST);
        headers.remove(header::CONTENT_LENGTH);
        headers.remove(TRUST_HEADER);
        if let Some(principal) = &ctx.principal {
            if let Ok(value) = HeaderValue::from_str(&principal.id) {
                headers.insert(TRUST_HEADER, value);
            }
        }
        if let Ok(value) = HeaderValue::from_str(&ctx.request.id) {
            headers.insert("x-request-id", value);
        }
        let forwarded_for = match ctx.request.header("x-forwarded-for") {
            Some(chain) => format!("{chain}, {}", ctx.request.client_ip),
            None => ctx.request.client_ip.clone(),
        };
        if let Ok(value) = HeaderValue::from_str(&forwarded_for) {
            headers.insert("x-forwarded-for", value);
        }

        let mut builder = self
            .client
            .request(ctx.request.method.clone(), &url)
            .headers(headers);
        if !ctx.request.body.is_empty() {
            builder = builder.body(ctx.request.body.clone());
        }

        let start = Instant::now();
        let unavailable = |source: reqwest::Error| {
            error!(
                upstream = %route.service,
                prefix = %route.prefix,
                error = %source,
                "Proxy error"
            );
            ProxyError::UpstreamUnavailable {
                prefix: route.prefix.clone(),
                service: route.service.clone(),
                source,
            }
        };

        let upstream_resp = builder.send().await.map_err(unavailable)?;
        let status = upstream_resp.status();
        let mut resp_headers = strip_hop_by_hop(upstream_resp.headers());
        resp_headers.remove(header::CONTENT_LENGTH);
        let body = upstream_resp.bytes().await.map_err(unavailable)?;

        let mut resp = GatewayResponse::new(status, &route.service).with_body(body);
        resp.headers = resp_headers;
        resp.latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        Ok(resp)
    }
}

/// Copy `headers` without hop-by-hop entries or anything named in `Connection`.
fn strip_hop_by_hop(headers: &HeaderMap) -> HeaderMap {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::try_from(name.trim()).ok())
        .collect();

    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if HOP_BY_HOP_HEADERS.contains(&name.as_str()) || listed.contains(name) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}
