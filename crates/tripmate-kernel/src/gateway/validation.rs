//! Gateway configuration container and startup validation.
//!
//! [`GatewayConfig`] aggregates routes, upstream services and global
//! settings, and exposes a single [`validate()`](GatewayConfig::validate)
//! method that checks all structural invariants *before* any runtime
//! resources are allocated.

use super::error::GatewayError;
use super::router::RouteRule;
use super::service::ServiceDescriptor;
use std::collections::HashSet;
use std::time::Duration;

/// Fixed-window length used by every built-in policy (15 minutes).
pub const DEFAULT_RATE_LIMIT_WINDOW: Duration = Duration::from_secs(15 * 60);

// ─────────────────────────────────────────────────────────────────────────────
// RateLimitPolicy
// ─────────────────────────────────────────────────────────────────────────────

/// Fixed-window rate-limit parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Window length.
    pub window: Duration,
    /// Requests allowed per client per window.
    pub max_requests: u32,
    /// When set, requests answered with a status below 400 are refunded so
    /// only failed attempts accumulate.
    pub skip_successful_requests: bool,
}

impl RateLimitPolicy {
    /// Create a policy counting every request.
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            skip_successful_requests: false,
        }
    }

    /// Builder: only count failed requests.
    pub fn skip_successful(mut self) -> Self {
        self.skip_successful_requests = true;
        self
    }

    /// Gateway-wide default: 100 requests per 15 minutes.
    pub fn general() -> Self {
        Self::new(DEFAULT_RATE_LIMIT_WINDOW, 100)
    }

    /// Tighter budget for expensive endpoints: 50 requests per 15 minutes.
    pub fn strict() -> Self {
        Self::new(DEFAULT_RATE_LIMIT_WINDOW, 50)
    }

    /// Brute-force guard for authentication endpoints: 5 failed attempts per
    /// 15 minutes. Not attached to any route by default.
    pub fn auth() -> Self {
        Self::new(DEFAULT_RATE_LIMIT_WINDOW, 5).skip_successful()
    }

    pub(crate) fn validate(&self) -> Result<(), GatewayError> {
        if self.window.is_zero() || self.max_requests == 0 {
            return Err(GatewayError::InvalidRateLimit);
        }
        Ok(())
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::general()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// GatewayConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Top-level gateway configuration.
///
/// Call [`validate()`](Self::validate) to check all structural invariants
/// before passing this config to the gateway runtime.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Name reported by the root and health endpoints.
    pub id: String,
    /// Route rules, in evaluation order.
    pub routes: Vec<RouteRule>,
    /// Upstream services.
    pub services: Vec<ServiceDescriptor>,
    /// Gateway-wide per-client rate limit.
    pub rate_limit: RateLimitPolicy,
    /// Upper bound on a single forwarding attempt.
    pub proxy_timeout: Duration,
    /// Upper bound on a single health probe.
    pub health_timeout: Duration,
}

impl GatewayConfig {
    /// Construct a config with default limits and no routes.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            routes: Vec::new(),
            services: Vec::new(),
            rate_limit: RateLimitPolicy::general(),
            proxy_timeout: Duration::from_secs(10),
            health_timeout: Duration::from_secs(3),
        }
    }

    /// Builder: append a route (evaluated after all earlier ones).
    pub fn with_route(mut self, route: RouteRule) -> Self {
        self.routes.push(route);
        self
    }

    /// Builder: add an upstream service.
    pub fn with_service(mut self, service: ServiceDescriptor) -> Self {
        self.services.push(service);
        self
    }

    /// Builder: set the gateway-wide rate limit.
    pub fn with_rate_limit(mut self, policy: RateLimitPolicy) -> Self {
        self.rate_limit = policy;
        self
    }

    /// Builder: set the forwarding timeout.
    pub fn with_proxy_timeout(mut self, timeout: Duration) -> Self {
        self.proxy_timeout = timeout;
        self
    }

    /// Builder: set the health-probe timeout.
    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    /// Look up a service by name.
    pub fn service(&self, name: &str) -> Option<&ServiceDescriptor> {
        self.services.iter().find(|s| s.name == name)
    }

    /// Route prefixes in evaluation order.
    pub fn prefixes(&self) -> Vec<&str> {
        self.routes.iter().map(|r| r.prefix.as_str()).collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Validation
    // ─────────────────────────────────────────────────────────────────────────

    /// Validate all structural invariants of this configuration.
    ///
    /// Returns the *first* detected [`GatewayError`].
    ///
    /// Checks performed (in order):
    /// 1. Gateway id is non-empty.
    /// 2. At least one route is defined.
    /// 3. At least one service is defined.
    /// 4. Proxy and health timeouts are non-zero.
    /// 5. The global rate-limit policy is non-zero.
    /// 6. Each service passes its own check and names are unique.
    /// 7. Each route passes its own check and ids are unique.
    /// 8. Every route references a declared service.
    /// 9. No two route prefixes overlap.
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.id.trim().is_empty() {
            return Err(GatewayError::EmptyGatewayId);
        }
        if self.routes.is_empty() {
            return Err(GatewayError::NoRoutes);
        }
        if self.services.is_empty() {
            return Err(GatewayError::NoServices);
        }
        if self.proxy_timeout.is_zero() {
            return Err(GatewayError::InvalidTimeout("proxy"));
        }
        if self.health_timeout.is_zero() {
            return Err(GatewayError::InvalidTimeout("health probe"));
        }
        self.rate_limit.validate()?;

        let mut service_names: HashSet<&str> = HashSet::new();
        for service in &self.services {
            service.validate()?;
            if !service_names.insert(service.name.as_str()) {
                return Err(GatewayError::DuplicateService(service.name.clone()));
            }
        }

        let mut route_ids: HashSet<&str> = HashSet::new();
        for (i, route) in self.routes.iter().enumerate() {
            route.validate()?;
            if !route_ids.insert(route.id.as_str()) {
                return Err(GatewayError::DuplicateRoute(route.id.clone()));
            }
            if !service_names.contains(route.service.as_str()) {
                return Err(GatewayError::UnknownService(
                    route.id.clone(),
                    route.service.clone(),
                ));
            }
            if let Some(earlier) = self.routes[..i].iter().find(|r| r.overlaps(route)) {
                return Err(GatewayError::OverlappingPrefixes(
                    earlier.prefix.clone(),
                    route.prefix.clone(),
                ));
            }
        }

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
