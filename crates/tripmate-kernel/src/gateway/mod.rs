//! Gateway kernel contract.
//!
//! This module defines the *trait interfaces and configuration types* for the
//! TripMate edge gateway. No concrete implementations live here: those
//! belong in `tripmate-gateway`.
//!
//! # Architecture mapping
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              tripmate-kernel  (this module)                 │
//! │  GatewayRouter trait    GatewayFilter trait                 │
//! │  RouteRule / AuthPolicy / PathRewrite                       │
//! │  ServiceDescriptor / HealthReport   GatewayConfig::validate │
//! │  GatewayRequest/Response/Context    GatewayError            │
//! └──────────────────────────┬──────────────────────────────────┘
//!                            │  depends on
//! ┌──────────────────────────▼──────────────────────────────────┐
//! │              tripmate-gateway  (runtime crate)              │
//! │  PrefixRouter: impl GatewayRouter                           │
//! │  AuthFilter / RouteRateLimitFilter / LoggingFilter          │
//! │  RateLimiter  HealthAggregator  UpstreamProxy               │
//! │  GatewayServer  (axum HTTP server)                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust
//! use tripmate_kernel::gateway::{
//!     AuthPolicy, GatewayConfig, RouteRule, ServiceDescriptor,
//! };
//!
//! let config = GatewayConfig::new("tripmate-gateway")
//!     .with_service(ServiceDescriptor::new("weather-service", "http://localhost:3004"))
//!     .with_route(RouteRule::new(
//!         "weather",
//!         "/api/weather",
//!         "weather-service",
//!         AuthPolicy::Optional,
//!     ));
//!
//! config.validate().expect("gateway config is valid");
//! ```

pub mod error;
pub mod filter;
pub mod router;
pub mod service;
pub mod validation;

// ── Flat re-exports ────────────────────────────────────────────────────────

pub use error::GatewayError;
pub use filter::{FilterAction, FilterOrder, GatewayFilter, Rejection};
pub use router::{AuthPolicy, GatewayRouter, PathRewrite, RouteRule};
pub use service::{HealthReport, HealthStatus, ServiceDescriptor};
pub use validation::{GatewayConfig, RateLimitPolicy};

// types module is pub so implementors in tripmate-gateway can use the structs
pub mod types;
pub use types::{
    GatewayContext, GatewayRequest, GatewayResponse, Principal, RouteMatch, TRUST_HEADER,
};
