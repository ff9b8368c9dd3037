//! Structured access-logging filter.
//!
//! Emits one `tracing` event on the request path and one on the response
//! path, recording request id, route, client address, principal, upstream
//! status and round-trip latency.

use async_trait::async_trait;
use chrono::Utc;
use tracing::{error, info};
use tripmate_kernel::gateway::{
    FilterAction, FilterOrder, GatewayContext, GatewayError, GatewayFilter, GatewayResponse,
};

const START_ATTR: &str = "log.request_start_ms";

/// Logging filter: records inbound requests and outbound responses.
#[derive(Default)]
pub struct LoggingFilter;

impl LoggingFilter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl GatewayFilter for LoggingFilter {
    fn name(&self) -> &str {
        "access-log"
    }

    fn order(&self) -> FilterOrder {
        FilterOrder::LOGGING
    }

    async fn on_request(&self, ctx: &mut GatewayContext) -> Result<FilterAction, GatewayError> {
        info!(
            request_id  = %ctx.request.id,
            method      = %ctx.request.method,
            path        = %ctx.request.path,
            route       = ctx.route_match.as_ref().map(|m| m.route_id.as_str()),
            client_ip   = %ctx.request.client_ip,
            user_id     = ctx.principal.as_ref().map(|p| p.id.as_str()),
            "→ inbound request"
        );
        ctx.set_attr(START_ATTR, &Utc::now().timestamp_millis());
        Ok(FilterAction::Continue)
    }

    async fn on_response(
        &self,
        ctx: &GatewayContext,
        resp: &mut GatewayResponse,
    ) -> Result<(), GatewayError> {
        let start_ms: i64 = ctx.get_attr(START_ATTR).unwrap_or_default();
        let elapsed = u64::try_from(Utc::now().timestamp_millis() - start_ms).unwrap_or(0);

        if resp.status.is_server_error() {
            error!(
                request_id  = %ctx.request.id,
                path        = %ctx.request.path,
                status      = resp.status.as_u16(),
                upstream    = %resp.upstream,
                latency_ms  = elapsed,
                "← upstream error response"
            );
        } else {
            info!(
                request_id  = %ctx.request.id,
                path        = %ctx.request.path,
                status      = resp.status.as_u16(),
                upstream    = %resp.upstream,
                latency_ms  = elapsed,
                "← outbound response"
            );
        }
        Ok(())
    }
}
