//! axum middleware applied ahead of routing.

mod client_ip;
mod rate_limit;

pub use client_ip::{ClientIp, ClientIpConfig, client_ip, resolve_client_ip};
pub use rate_limit::{RateDecision, RateLimiter, rate_limit};
