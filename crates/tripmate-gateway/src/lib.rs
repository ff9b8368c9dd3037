//! `tripmate-gateway`: TripMate edge gateway runtime.
//!
//! This crate provides the concrete implementations of the gateway kernel
//! contracts defined in `tripmate-kernel::gateway`:
//!
//! | Kernel contract | Implementation |
//! |----------------|----------------|
//! | [`GatewayRouter`](gateway::GatewayRouter) | [`router::PrefixRouter`] |
//! | [`GatewayFilter`](gateway::GatewayFilter) | [`filter::RouteRateLimitFilter`], [`filter::AuthFilter`], [`filter::LoggingFilter`] |
//!
//! Alongside them live the gateway-wide [`middleware::RateLimiter`], the
//! [`backend::UpstreamProxy`] and the [`health::HealthAggregator`]. The
//! [`server::GatewayServer`] wires everything together into an axum HTTP
//! service.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tripmate_gateway::filter::NoIdentityProvider;
//! use tripmate_gateway::server::{GatewayServer, GatewayServerConfig};
//! use tripmate_kernel::gateway::{
//!     AuthPolicy, GatewayConfig, RouteRule, ServiceDescriptor,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let gateway_config = GatewayConfig::new("api-gateway")
//!         .with_service(ServiceDescriptor::new("weather-service", "http://localhost:3004"))
//!         .with_route(RouteRule::new(
//!             "weather",
//!             "/api/weather",
//!             "weather-service",
//!             AuthPolicy::Optional,
//!         ));
//!
//!     let server = GatewayServer::new(
//!         GatewayServerConfig::default(),
//!         Arc::new(NoIdentityProvider),
//!     );
//!
//!     server.start(gateway_config).await.unwrap();
//! }
//! ```

pub mod backend;
pub mod error;
pub mod filter;
pub mod health;
pub mod middleware;
pub mod router;
pub mod server;

// Re-export the kernel gateway types for convenience.
pub use tripmate_kernel::gateway;
