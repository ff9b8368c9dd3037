//! Gateway router trait and route rule types.
//!
//! The [`GatewayRouter`] trait is the single kernel-level abstraction for
//! request routing. Routes are plain path prefixes evaluated in registration
//! order: the first rule whose prefix matches the request path wins.
//!
//! ```text
//! /api/trips         : matches /api/trips, /api/trips/42, /api/trips/42/days
//!                       but not /api/tripsheet
//! ```

use super::error::GatewayError;
use super::service::ServiceDescriptor;
use super::types::RouteMatch;
use super::validation::RateLimitPolicy;
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Auth policy
// ─────────────────────────────────────────────────────────────────────────────

/// How strictly a route enforces bearer authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthPolicy {
    /// A valid bearer token must be presented.
    Required,
    /// Anonymous requests pass; a token that *is* presented must be valid.
    Optional,
    /// Credentials are not inspected.
    None,
}

impl AuthPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthPolicy::Required => "required",
            AuthPolicy::Optional => "optional",
            AuthPolicy::None => "none",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Path rewrite
// ─────────────────────────────────────────────────────────────────────────────

/// Rewrite applied to the request path before it is forwarded upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PathRewrite {
    /// Forward the path unchanged (the prefix lives in the upstream's own
    /// namespace).
    #[default]
    Identity,
    /// Remove the matched prefix.
    StripPrefix,
    /// Replace the matched prefix with another one.
    ReplacePrefix(String),
}

impl PathRewrite {
    /// Apply the rewrite to `path`, which must have matched `prefix`.
    pub fn apply(&self, prefix: &str, path: &str) -> String {
        let rest = path.strip_prefix(prefix).unwrap_or(path);
        let rewritten = match self {
            PathRewrite::Identity => return path.to_string(),
            PathRewrite::StripPrefix => rest.to_string(),
            PathRewrite::ReplacePrefix(replacement) => {
                format!("{}{}", replacement.trim_end_matches('/'), rest)
            }
        };
        if rewritten.is_empty() {
            "/".to_string()
        } else {
            rewritten
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Route rule
// ─────────────────────────────────────────────────────────────────────────────

/// A single routing rule mapping a path prefix to an upstream service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRule {
    /// Unique stable identifier for this route.
    pub id: String,
    /// Path prefix. Must begin with `/` and must not end with `/`.
    pub prefix: String,
    /// Name of the [`ServiceDescriptor`] this route forwards to.
    pub service: String,
    /// Authentication enforcement.
    pub auth_policy: AuthPolicy,
    /// Rewrite applied to the path before forwarding.
    pub path_rewrite: PathRewrite,
    /// Opt-in per-route rate limit, applied on top of the global limiter.
    pub rate_limit: Option<RateLimitPolicy>,
}

impl RouteRule {
    /// Create a route with an identity path rewrite and no extra rate limit.
    pub fn new(
        id: impl Into<String>,
        prefix: impl Into<String>,
        service: impl Into<String>,
        auth_policy: AuthPolicy,
    ) -> Self {
        Self {
            id: id.into(),
            prefix: prefix.into(),
            service: service.into(),
            auth_policy,
            path_rewrite: PathRewrite::Identity,
            rate_limit: None,
        }
    }

    /// Builder: set the path rewrite.
    pub fn with_path_rewrite(mut self, rewrite: PathRewrite) -> Self {
        self.path_rewrite = rewrite;
        self
    }

    /// Builder: attach a per-route rate-limit policy.
    pub fn with_rate_limit(mut self, policy: RateLimitPolicy) -> Self {
        self.rate_limit = Some(policy);
        self
    }

    /// Whether `path` falls under this rule's prefix on a segment boundary.
    pub fn matches(&self, path: &str) -> bool {
        if self.prefix == "/" {
            return path.starts_with('/');
        }
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// Whether this rule and `other` can both match a single path.
    pub fn overlaps(&self, other: &RouteRule) -> bool {
        self.matches(&other.prefix) || other.matches(&self.prefix)
    }

    /// Build the [`RouteMatch`] for a path this rule matched.
    pub fn to_match(&self, upstream: &ServiceDescriptor, path: &str) -> RouteMatch {
        RouteMatch {
            route_id: self.id.clone(),
            prefix: self.prefix.clone(),
            service: upstream.name.clone(),
            upstream_base_url: upstream.base_url.clone(),
            auth_policy: self.auth_policy,
            path_rewrite: self.path_rewrite.clone(),
            rate_limit: self.rate_limit.clone(),
            upstream_path: self.path_rewrite.apply(&self.prefix, path),
        }
    }

    /// Basic sanity checks run during [`GatewayConfig::validate()`](super::validation::GatewayConfig::validate).
    pub(crate) fn validate(&self) -> Result<(), GatewayError> {
        if self.id.trim().is_empty() {
            return Err(GatewayError::EmptyRouteId);
        }
        if !self.prefix.starts_with('/') {
            return Err(GatewayError::InvalidPrefix(
                self.id.clone(),
                "prefix must start with '/'".to_string(),
            ));
        }
        if self.prefix.len() > 1 && self.prefix.ends_with('/') {
            return Err(GatewayError::InvalidPrefix(
                self.id.clone(),
                "prefix must not end with '/'".to_string(),
            ));
        }
        if let Some(policy) = &self.rate_limit {
            policy.validate()?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Router trait
// ─────────────────────────────────────────────────────────────────────────────

/// Kernel contract for request routing.
///
/// Implementations receive [`RouteRule`] entries at startup (via
/// [`register`](GatewayRouter::register)) and resolve incoming paths to a
/// [`RouteMatch`] at request time.
///
/// The trait is intentionally synchronous: route lookups do no I/O.
pub trait GatewayRouter: Send + Sync {
    /// Append a rule bound to its upstream. Returns
    /// [`GatewayError::DuplicateRoute`] if the id is taken and
    /// [`GatewayError::OverlappingPrefixes`] if the prefix overlaps an
    /// existing rule.
    fn register(
        &mut self,
        rule: RouteRule,
        upstream: ServiceDescriptor,
    ) -> Result<(), GatewayError>;

    /// Resolve a request path to the first matching rule.
    /// Returns `None` when no rule matches.
    fn resolve(&self, path: &str) -> Option<RouteMatch>;

    /// All registered rules, in evaluation order.
    fn routes(&self) -> Vec<&RouteRule>;
}
