//! Ordered prefix router implementing [`GatewayRouter`].
//!
//! Rules are kept in registration order and resolved with a linear scan;
//! the first rule whose prefix matches on a segment boundary wins.

use tripmate_kernel::gateway::{
    GatewayConfig, GatewayError, GatewayRouter, RouteMatch, RouteRule, ServiceDescriptor,
};

/// [`GatewayRouter`] implementation over an ordered rule list.
#[derive(Debug, Default)]
pub struct PrefixRouter {
    rules: Vec<(RouteRule, ServiceDescriptor)>,
}

impl PrefixRouter {
    /// Create an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a router from a validated config, preserving route order.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let mut router = Self::new();
        for rule in &config.routes {
            let upstream = config.service(&rule.service).cloned().ok_or_else(|| {
                GatewayError::UnknownService(rule.id.clone(), rule.service.clone())
            })?;
            router.register(rule.clone(), upstream)?;
        }
        Ok(router)
    }

    /// Number of registered rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl GatewayRouter for PrefixRouter {
    fn register(&mut self, rule: RouteRule, upstream: ServiceDescriptor) -> Result<(), GatewayError> {
        if self.rules.iter().any(|(r, _)| r.id == rule.id) {
            return Err(GatewayError::DuplicateRoute(rule.id));
        }
        if let Some((existing, _)) = self.rules.iter().find(|(r, _)| r.overlaps(&rule)) {
            return Err(GatewayError::OverlappingPrefixes(
                existing.prefix.clone(),
                rule.prefix,
            ));
        }
        self.rules.push((rule, upstream));
        Ok(())
    }

    fn resolve(&self, path: &str) -> Option<RouteMatch> {
        self.rules
            .iter()
            .find(|(rule, _)| rule.matches(path))
            .map(|(rule, upstream)| rule.to_match(upstream, path))
    }

    fn routes(&self) -> Vec<&RouteRule> {
        self.rules.iter().map(|(rule, _)| rule).collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
