//! Concurrent upstream health aggregation.
//!
//! Every probe is bounded by its own timeout and all probes run at once;
//! the aggregate waits for all of them, so one slow service costs at most
//! one timeout and never hides the others' results.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;
use tracing::error;
use tripmate_kernel::gateway::{HealthReport, ServiceDescriptor};

/// Overall gateway health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateStatus {
    Healthy,
    Degraded,
}

/// The gateway's own entry in the health body.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayHealth {
    pub name: String,
    pub status: &'static str,
    /// Seconds since the aggregator was created.
    pub uptime: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthSummary {
    pub total: usize,
    pub healthy: usize,
    pub unhealthy: usize,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateHealth {
    pub status: AggregateStatus,
    pub gateway: GatewayHealth,
    pub services: Vec<HealthReport>,
    pub summary: HealthSummary,
}

impl AggregateHealth {
    pub fn is_healthy(&self) -> bool {
        self.status == AggregateStatus::Healthy
    }
}

/// Probes upstream health endpoints.
pub struct HealthAggregator {
    gateway_name: String,
    services: Vec<ServiceDescriptor>,
    timeout: Duration,
    client: reqwest::Client,
    started_at: Instant,
}

impl HealthAggregator {
    pub fn new(
        gateway_name: impl Into<String>,
        services: Vec<ServiceDescriptor>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            gateway_name: gateway_name.into(),
            services,
            timeout,
            client: reqwest::Client::builder().build()?,
            started_at: Instant::now(),
        })
    }

    /// Names of every probed service, in configuration order.
    pub fn service_names(&self) -> Vec<String> {
        self.services.iter().map(|s| s.name.clone()).collect()
    }

    /// Probe one service. Healthy iff it answers `2xx` within the timeout.
    pub async fn probe(&self, service: &ServiceDescriptor) -> HealthReport {
        let start = Instant::now();
        let url = service.health_url();
        let outcome = tokio::time::timeout(self.timeout, async {
            let resp = self.client.get(&url).send().await?;
            let status = resp.status();
            let data = resp.json::<Value>().await.ok();
            Ok::<_, reqwest::Error>((status, data))
        })
        .await;
        let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        let report = match outcome {
            Ok(Ok((status, data))) if status.is_success() => {
                return HealthReport::healthy(service, latency_ms, data);
            }
            Ok(Ok((status, _))) => HealthReport::unhealthy(
                service,
                latency_ms,
                format!("health endpoint returned {status}"),
            ),
            Ok(Err(e)) => HealthReport::unhealthy(service, latency_ms, e.to_string()),
            Err(_) => HealthReport::unhealthy(
                service,
                latency_ms,
                format!("probe timed out after {} ms", self.timeout.as_millis()),
            ),
        };
        error!(
            service = %service.name,
            error = report.error.as_deref().unwrap_or_default(),
            "Health check failed"
        );
        report
    }

    /// Probe a single service by name; `None` if it is not configured.
    pub async fn probe_one(&self, name: &str) -> Option<HealthReport> {
        let service = self.services.iter().find(|s| s.name == name)?;
        Some(self.probe(service).await)
    }

    /// Probe every service concurrently and summarise.
    pub async fn aggregate(&self) -> AggregateHealth {
        let services = join_all(self.services.iter().map(|s| self.probe(s))).await;
        let healthy = services.iter().filter(|r| r.is_healthy()).count();
        let total = services.len();
        let status = if healthy == total {
            AggregateStatus::Healthy
        } else {
            AggregateStatus::Degraded
        };

        AggregateHealth {
            status,
            gateway: GatewayHealth {
                name: self.gateway_name.clone(),
                status: "healthy",
                uptime: self.started_at.elapsed().as_secs_f64(),
                timestamp: Utc::now(),
            },
            services,
            summary: HealthSummary {
                total,
                healthy,
                unhealthy: total - healthy,
            },
        }
    }
}
