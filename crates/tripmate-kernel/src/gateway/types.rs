//! Core data types for the gateway kernel contract.
//!
//! These types are shared across all gateway traits
//! ([`GatewayRouter`](super::router::GatewayRouter),
//! [`GatewayFilter`](super::filter::GatewayFilter)) and carry no runtime
//! dependencies beyond `http`, `bytes` and `serde`.

use super::router::{AuthPolicy, PathRewrite};
use super::validation::RateLimitPolicy;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Trust-boundary header carrying the resolved principal id to upstreams.
///
/// Only the gateway may set it: any inbound copy is stripped before forwarding.
pub const TRUST_HEADER: &str = "x-user-id";

// ─────────────────────────────────────────────────────────────────────────────
// Principal
// ─────────────────────────────────────────────────────────────────────────────

/// Authenticated identity resolved from a bearer token.
///
/// Ephemeral: derived per request, never persisted by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Stable user id issued by the identity provider.
    pub id: String,
    /// Email address, when the identity provider returns one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request / Response
// ─────────────────────────────────────────────────────────────────────────────

/// An inbound request flowing through the gateway.
///
/// All fields are owned so the struct can be sent across async task
/// boundaries without lifetime complications.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    /// Unique identifier for correlating this request across logs.
    pub id: String,
    /// HTTP method.
    pub method: Method,
    /// Request path without the query string, e.g. `/api/weather/Paris`.
    pub path: String,
    /// Raw query string (without the leading `?`), if any.
    pub query: Option<String>,
    /// HTTP headers as received.
    pub headers: HeaderMap,
    /// Raw body bytes.
    pub body: Bytes,
    /// Address of the calling client, used for rate limiting and forwarding.
    pub client_ip: String,
}

impl GatewayRequest {
    /// Construct a minimal request with the given id, method, and path.
    pub fn new(id: impl Into<String>, method: Method, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            method,
            path: path.into(),
            query: None,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            client_ip: "unknown".to_string(),
        }
    }

    /// Builder helper: attach a header. Invalid names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Builder helper: set the query string.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Builder helper: set the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Builder helper: set the client address.
    pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = ip.into();
        self
    }

    /// First value of a header as UTF-8, if present and valid.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// An upstream response relayed back through the gateway.
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    /// HTTP status as returned by the upstream.
    pub status: StatusCode,
    /// Response headers (hop-by-hop headers already removed).
    pub headers: HeaderMap,
    /// Raw body bytes, relayed verbatim.
    pub body: Bytes,
    /// Name of the upstream service that produced this response.
    pub upstream: String,
    /// Round-trip latency in milliseconds (gateway → upstream → gateway).
    pub latency_ms: u64,
}

impl GatewayResponse {
    /// Construct an empty response.
    pub fn new(status: StatusCode, upstream: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            upstream: upstream.into(),
            latency_ms: 0,
        }
    }

    /// Builder helper: set the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Route match
// ─────────────────────────────────────────────────────────────────────────────

/// The result of a successful route lookup.
///
/// Carries the matched rule's settings plus the resolved upstream base URL
/// and the rewritten path the upstream will see.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// Id of the matched route.
    pub route_id: String,
    /// The prefix that matched, e.g. `/api/trips`.
    pub prefix: String,
    /// Name of the upstream service.
    pub service: String,
    /// Base URL of the upstream service.
    pub upstream_base_url: String,
    /// Authentication enforcement for this route.
    pub auth_policy: AuthPolicy,
    /// Path rewrite applied before forwarding.
    pub path_rewrite: PathRewrite,
    /// Optional per-route rate-limit policy.
    pub rate_limit: Option<RateLimitPolicy>,
    /// Request path after applying `path_rewrite`.
    pub upstream_path: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Request context
// ─────────────────────────────────────────────────────────────────────────────

/// Mutable context that flows through the filter chain for a single request.
///
/// Filters read from and write to this context, so downstream filters can
/// see decisions made upstream (e.g. the principal set by the auth filter is
/// read by the access logger and by the proxy).
#[derive(Debug, Clone)]
pub struct GatewayContext {
    /// The inbound request.
    pub request: GatewayRequest,
    /// Populated after routing; `None` if routing has not yet occurred.
    pub route_match: Option<RouteMatch>,
    /// Identity resolved by the auth filter; `None` if unauthenticated.
    pub principal: Option<Principal>,
    /// Free-form attributes written and read by filters.
    pub attributes: HashMap<String, serde_json::Value>,
}

impl GatewayContext {
    /// Create a fresh context from an inbound request.
    pub fn new(request: GatewayRequest) -> Self {
        Self {
            request,
            route_match: None,
            principal: None,
            attributes: HashMap::new(),
        }
    }

    /// Builder helper: attach a route match.
    pub fn with_route_match(mut self, route_match: RouteMatch) -> Self {
        self.route_match = Some(route_match);
        self
    }

    /// Convenience: read a typed attribute, returning `None` if absent or
    /// if deserialization fails.
    pub fn get_attr<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Convenience: write a serializable attribute.
    pub fn set_attr<T: serde::Serialize>(&mut self, key: impl Into<String>, val: &T) {
        if let Ok(v) = serde_json::to_value(val) {
            self.attributes.insert(key.into(), v);
        }
    }
}
