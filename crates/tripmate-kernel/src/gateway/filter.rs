//! Gateway filter trait and filter-chain types.
//!
//! A filter chain is an ordered list of [`GatewayFilter`] instances applied
//! to every proxied request and response. Filters are sorted by their
//! declared [`FilterOrder`] and executed in ascending order on the request
//! path (lowest value first) and descending order on the response path.
//!
//! ```text
//! Request  ──► RateLimit ──► Auth ──► Logging
//!                  (upstream call happens here)
//! Response ◄── Logging ◄── Auth ◄── RateLimit
//! ```
//!
//! Per-route rate limiting runs before authentication so a throttled client
//! never reaches the identity provider.

use super::error::GatewayError;
use super::types::{GatewayContext, GatewayResponse};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

// ─────────────────────────────────────────────────────────────────────────────
// Filter ordering
// ─────────────────────────────────────────────────────────────────────────────

/// Numeric ordering slot for a filter in the chain.
///
/// The well-known slots below act as guidelines; any `u32` value is accepted
/// so implementors can slot in custom filters between the standard phases.
/// Filters with equal order values are executed in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FilterOrder(pub u32);

impl FilterOrder {
    /// Per-route rate-limiting slot.
    pub const RATE_LIMIT: FilterOrder = FilterOrder(100);
    /// Authentication slot.
    pub const AUTH: FilterOrder = FilterOrder(200);
    /// Access logging slot: runs once the principal is known.
    pub const LOGGING: FilterOrder = FilterOrder(400);
}

// ─────────────────────────────────────────────────────────────────────────────
// Filter action
// ─────────────────────────────────────────────────────────────────────────────

/// Why a filter refused to let a request through.
///
/// The runtime maps each variant onto the gateway's JSON error contract.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Rejection {
    /// Missing, malformed, invalid or expired credential (`401`).
    Unauthorized { message: String },
    /// The caller exhausted its request budget (`429`).
    TooManyRequests {
        message: String,
        /// Seconds until the current window resets.
        retry_after_secs: u64,
        /// Wall-clock time at which the current window resets.
        reset_at: DateTime<Utc>,
    },
    /// An unexpected fault; details stay in the logs (`500`).
    Internal { message: String },
}

/// Instruction returned by [`GatewayFilter::on_request`] controlling what
/// the gateway does with the request after the filter runs.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FilterAction {
    /// Pass the (possibly modified) request to the next filter or upstream.
    Continue,
    /// Short-circuit the chain. No upstream call is made.
    Reject(Rejection),
}

// ─────────────────────────────────────────────────────────────────────────────
// GatewayFilter trait
// ─────────────────────────────────────────────────────────────────────────────

/// Kernel contract for a single filter in the gateway pipeline.
///
/// Implementations must be `Send + Sync` so they can be shared across Tokio
/// tasks without additional synchronization by the caller.
#[async_trait]
pub trait GatewayFilter: Send + Sync {
    /// Stable, human-readable identifier for this filter (used in logs).
    fn name(&self) -> &str;

    /// Position in the filter chain. Lower values execute first on the
    /// request path.
    fn order(&self) -> FilterOrder;

    /// Called with the inbound request *before* it is forwarded upstream.
    ///
    /// Implementations may mutate `ctx` (e.g. set `ctx.principal`, remove
    /// sensitive headers, …). Return [`FilterAction::Continue`] to proceed,
    /// or [`FilterAction::Reject`] to short-circuit the chain.
    async fn on_request(&self, ctx: &mut GatewayContext) -> Result<FilterAction, GatewayError>;

    /// Called with the upstream response *before* it is returned to the
    /// caller. The default does nothing.
    async fn on_response(
        &self,
        _ctx: &GatewayContext,
        _resp: &mut GatewayResponse,
    ) -> Result<(), GatewayError> {
        Ok(())
    }
}
