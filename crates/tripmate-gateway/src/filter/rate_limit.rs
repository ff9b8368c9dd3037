//! Per-route rate-limit filter.
//!
//! Routes opt in through [`RouteRule::rate_limit`](tripmate_kernel::gateway::RouteRule).
//! Each route gets its own [`RateLimiter`] keyed by client address, created
//! on first use. Runs before authentication so throttled clients never reach
//! the identity provider.

use crate::middleware::{RateDecision, RateLimiter};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::warn;
use tripmate_kernel::gateway::{
    FilterAction, FilterOrder, GatewayContext, GatewayError, GatewayFilter, GatewayResponse,
    RateLimitPolicy, Rejection,
};

/// Rate-limit filter applying each route's own policy.
#[derive(Default)]
pub struct RouteRateLimitFilter {
    limiters: DashMap<String, Arc<RateLimiter>>,
}

impl RouteRateLimitFilter {
    pub fn new() -> Self {
        Self::default()
    }

    fn limiter_for(&self, route_id: &str, policy: &RateLimitPolicy) -> Arc<RateLimiter> {
        Arc::clone(
            self.limiters
                .entry(route_id.to_string())
                .or_insert_with(|| Arc::new(RateLimiter::new(policy.clone())))
                .value(),
        )
    }

    fn denial_message(policy: &RateLimitPolicy) -> &'static str {
        if policy.skip_successful_requests {
            "Too many failed attempts, please try again later."
        } else {
            "Rate limit exceeded for this endpoint."
        }
    }
}

#[async_trait]
impl GatewayFilter for RouteRateLimitFilter {
    fn name(&self) -> &str {
        "route-rate-limit"
    }

    fn order(&self) -> FilterOrder {
        FilterOrder::RATE_LIMIT
    }

    async fn on_request(&self, ctx: &mut GatewayContext) -> Result<FilterAction, GatewayError> {
        let Some(route) = ctx.route_match.as_ref() else {
            return Ok(FilterAction::Continue);
        };
        let Some(policy) = route.rate_limit.as_ref() else {
            return Ok(FilterAction::Continue);
        };

        let limiter = self.limiter_for(&route.route_id, policy);
        let decision = limiter.check(&ctx.request.client_ip);
        match decision {
            RateDecision::Allow { .. } => Ok(FilterAction::Continue),
            RateDecision::Deny { reset_at, .. } => {
                warn!(
                    request_id = %ctx.request.id,
                    route = %route.route_id,
                    client_ip = %ctx.request.client_ip,
                    "Route rate limit exceeded"
                );
                Ok(FilterAction::Reject(Rejection::TooManyRequests {
                    message: Self::denial_message(policy).to_string(),
                    retry_after_secs: decision.reset_secs(),
                    reset_at,
                }))
            }
        }
    }

    async fn on_response(
        &self,
        ctx: &GatewayContext,
        resp: &mut GatewayResponse,
    ) -> Result<(), GatewayError> {
        let Some(route) = ctx.route_match.as_ref() else {
            return Ok(());
        };
        let Some(policy) = route.rate_limit.as_ref() else {
            return Ok(());
        };
        let limiter = self.limiter_for(&route.route_id, policy);
        if policy.skip_successful_requests && resp.status.as_u16() < 400 {
            limiter.refund(&ctx.request.client_ip);
        }
        Ok(())
    }
}
