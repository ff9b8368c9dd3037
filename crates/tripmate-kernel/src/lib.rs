//! `tripmate-kernel`: contracts for the TripMate edge gateway.
//!
//! The kernel holds the trait interfaces, data types and configuration
//! validation shared by the runtime crates. It performs no network I/O.
//!
//! - [`gateway`]: request/response types, route rules, filters, health
//!   reports and [`gateway::GatewayConfig::validate`].
//! - [`config`]: environment-driven settings (behind the `config` feature).

pub mod gateway;

#[cfg(feature = "config")]
pub mod config;
