//! Upstream service descriptors and health reports.
//!
//! A [`ServiceDescriptor`] names one independently deployed domain service
//! and where to reach it. Descriptors are static, loaded once at startup.
//! A [`HealthReport`] is produced fresh on every probe and never cached.

use super::error::GatewayError;
use serde::{Deserialize, Serialize};

/// Default health endpoint exposed by every TripMate service.
pub const DEFAULT_HEALTH_PATH: &str = "/api/health";

// ─────────────────────────────────────────────────────────────────────────────
// ServiceDescriptor
// ─────────────────────────────────────────────────────────────────────────────

/// Static description of an upstream service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    /// Unique service name, e.g. `weather-service`.
    pub name: String,
    /// Base URL requests are forwarded to, e.g. `http://localhost:3004`.
    pub base_url: String,
    /// Path appended to `base_url` for health probes.
    pub health_path: String,
}

impl ServiceDescriptor {
    /// Construct a descriptor with the default health path.
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            health_path: DEFAULT_HEALTH_PATH.to_string(),
        }
    }

    /// Builder: set the health-check path.
    pub fn with_health_path(mut self, path: impl Into<String>) -> Self {
        self.health_path = path.into();
        self
    }

    /// Full URL probed by the health aggregator.
    pub fn health_url(&self) -> String {
        format!("{}{}", self.base_url, self.health_path)
    }

    /// Basic sanity checks run during [`GatewayConfig::validate()`](super::validation::GatewayConfig::validate).
    pub(crate) fn validate(&self) -> Result<(), GatewayError> {
        if self.name.trim().is_empty() {
            return Err(GatewayError::EmptyServiceName);
        }
        if self.base_url.trim().is_empty() {
            return Err(GatewayError::InvalidBaseUrl(
                self.name.clone(),
                "base URL cannot be empty".to_string(),
            ));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(GatewayError::InvalidBaseUrl(
                self.name.clone(),
                format!(
                    "base URL '{}' must start with http:// or https://",
                    self.base_url
                ),
            ));
        }
        if !self.health_path.starts_with('/') {
            return Err(GatewayError::InvalidHealthPath(
                self.name.clone(),
                "health path must start with '/'".to_string(),
            ));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Health
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome of a single health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Result of probing one upstream service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// Service name.
    pub name: String,
    /// Probe outcome.
    pub status: HealthStatus,
    /// Base URL of the probed service.
    pub url: String,
    /// Round trip measured by the gateway, in milliseconds.
    pub latency_ms: u64,
    /// Failure description when `status` is `Unhealthy`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// JSON payload returned by the service's health endpoint, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl HealthReport {
    /// A healthy report.
    pub fn healthy(
        service: &ServiceDescriptor,
        latency_ms: u64,
        data: Option<serde_json::Value>,
    ) -> Self {
        Self {
            name: service.name.clone(),
            status: HealthStatus::Healthy,
            url: service.base_url.clone(),
            latency_ms,
            error: None,
            data,
        }
    }

    /// An unhealthy report carrying the captured error.
    pub fn unhealthy(service: &ServiceDescriptor, latency_ms: u64, error: impl Into<String>) -> Self {
        Self {
            name: service.name.clone(),
            status: HealthStatus::Unhealthy,
            url: service.base_url.clone(),
            latency_ms,
            error: Some(error.into()),
            data: None,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}
