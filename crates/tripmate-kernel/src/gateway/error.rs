//! Gateway error types for `tripmate-kernel`.
//!
//! [`GatewayError`] covers every failure mode that can be detected at
//! *definition time*, before any network I/O occurs: empty ids, duplicate
//! registrations, missing service references, overlapping prefixes and
//! invalid configuration values. Runtime failures (connection refused, upstream
//! timeout, …) belong in the gateway implementation crate
//! (`tripmate-gateway`).

use thiserror::Error;

/// Configuration error type for the gateway kernel contract.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum GatewayError {
    // ── Identity ────────────────────────────────────────────────────────────
    /// The gateway configuration `id` field is empty or whitespace-only.
    #[error("gateway id cannot be empty")]
    EmptyGatewayId,

    // ── Routes ───────────────────────────────────────────────────────────────
    /// The configuration contains no routes.
    #[error("gateway config must define at least one route")]
    NoRoutes,

    /// A route `id` field is empty or whitespace-only.
    #[error("route id cannot be empty")]
    EmptyRouteId,

    /// A route with this id has already been registered.
    #[error("route '{0}' is already registered")]
    DuplicateRoute(String),

    /// A route references a service name that is not declared.
    #[error("route '{0}' references unknown service '{1}'")]
    UnknownService(String, String),

    /// A route prefix is syntactically invalid.
    #[error("route '{0}' has an invalid prefix: {1}")]
    InvalidPrefix(String, String),

    /// Two route prefixes can both match the same path.
    #[error("route prefixes '{0}' and '{1}' overlap")]
    OverlappingPrefixes(String, String),

    // ── Services ─────────────────────────────────────────────────────────────
    /// The configuration contains no upstream services.
    #[error("gateway config must define at least one service")]
    NoServices,

    /// A service `name` field is empty or whitespace-only.
    #[error("service name cannot be empty")]
    EmptyServiceName,

    /// A service with this name has already been declared.
    #[error("service '{0}' is already registered")]
    DuplicateService(String),

    /// A service base URL is syntactically invalid.
    #[error("service '{0}' has an invalid base URL: {1}")]
    InvalidBaseUrl(String, String),

    /// A service health path is syntactically invalid.
    #[error("service '{0}' has an invalid health path: {1}")]
    InvalidHealthPath(String, String),

    // ── Timeouts / rate-limits ────────────────────────────────────────────────
    /// A proxy or probe timeout is zero, which would fail every call.
    #[error("{0} timeout must be greater than 0 ms")]
    InvalidTimeout(&'static str),

    /// A rate-limit window or request budget is zero.
    #[error("rate limit window and max requests must be greater than 0")]
    InvalidRateLimit,
}
