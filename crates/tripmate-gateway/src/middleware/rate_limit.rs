//! Per-client fixed-window rate limiting.

use super::client_ip::ClientIp;
use crate::error::ProxyError;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tripmate_kernel::gateway::RateLimitPolicy;

const GLOBAL_DENIAL_MESSAGE: &str = "Too many requests from this IP, please try again later.";

/// Fixed-window state per client.
struct ClientWindow {
    /// Requests counted in the current window
    count: u32,
    /// Start of the current window
    window_start: Instant,
}

/// Outcome of [`RateLimiter::check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateDecision {
    Allow {
        limit: u32,
        remaining: u32,
        /// Time until the window resets.
        reset_after: Duration,
    },
    Deny {
        limit: u32,
        /// Time until the window resets.
        retry_after: Duration,
        reset_at: DateTime<Utc>,
    },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allow { .. })
    }

    /// Whole seconds until reset, rounded up.
    pub fn reset_secs(&self) -> u64 {
        let d = match self {
            RateDecision::Allow { reset_after, .. } => reset_after,
            RateDecision::Deny { retry_after, .. } => retry_after,
        };
        d.as_secs() + u64::from(d.subsec_nanos() > 0)
    }

    /// Standard `RateLimit-*` response headers.
    pub fn apply_headers(&self, headers: &mut HeaderMap) {
        let (limit, remaining) = match self {
            RateDecision::Allow {
                limit, remaining, ..
            } => (*limit, *remaining),
            RateDecision::Deny { limit, .. } => (*limit, 0),
        };
        headers.insert("ratelimit-limit", HeaderValue::from(limit));
        headers.insert("ratelimit-remaining", HeaderValue::from(remaining));
        headers.insert("ratelimit-reset", HeaderValue::from(self.reset_secs()));
    }
}

/// Per-client rate limiter.
///
/// Uses a fixed window algorithm: each client gets `max_requests` requests
/// per `window`. The window is not extended by further requests and only
/// resets once it has fully elapsed. Each check is a single read-modify-write
/// under the client's map shard lock.
pub struct RateLimiter {
    clients: DashMap<String, ClientWindow>,
    policy: RateLimitPolicy,
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            clients: DashMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Count a request from `client_key` and decide whether it may proceed.
    pub fn check(&self, client_key: &str) -> RateDecision {
        let now = Instant::now();
        let window = self.policy.window;
        let limit = self.policy.max_requests;

        let mut entry = self
            .clients
            .entry(client_key.to_string())
            .or_insert_with(|| ClientWindow {
                count: 0,
                window_start: now,
            });

        // Reset window if expired
        if now.duration_since(entry.window_start) >= window {
            entry.count = 0;
            entry.window_start = now;
        }

        let reset_after = (entry.window_start + window).saturating_duration_since(now);
        if entry.count < limit {
            entry.count += 1;
            RateDecision::Allow {
                limit,
                remaining: limit - entry.count,
                reset_after,
            }
        } else {
            let reset_at = chrono::Duration::from_std(reset_after)
                .ok()
                .and_then(|d| Utc::now().checked_add_signed(d))
                .unwrap_or_else(Utc::now);
            RateDecision::Deny {
                limit,
                retry_after: reset_after,
                reset_at,
            }
        }
    }

    /// Give back one request, used when successful requests are not counted.
    pub fn refund(&self, client_key: &str) {
        if let Some(mut entry) = self.clients.get_mut(client_key) {
            entry.count = entry.count.saturating_sub(1);
        }
    }

    /// Number of clients with a tracked window.
    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }

    /// Remove windows that have fully elapsed.
    pub fn gc(&self) {
        let now = Instant::now();
        let window = self.policy.window;
        self.clients
            .retain(|_, state| now.duration_since(state.window_start) < window);
    }

    /// Run [`gc`](Self::gc) every `interval` until `shutdown` fires.
    pub fn spawn_gc(self: &Arc<Self>, interval: Duration, shutdown: CancellationToken) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        limiter.gc();
                        debug!(tracked = limiter.tracked_clients(), "Rate limiter gc");
                    }
                }
            }
        })
    }
}

/// Gateway-wide limiter, keyed by the resolved [`ClientIp`].
pub async fn rate_limit(State(limiter): State<Arc<RateLimiter>>, req: Request, next: Next) -> Response {
    let client = req
        .extensions()
        .get::<ClientIp>()
        .map(|ClientIp(ip)| ip.clone())
        .unwrap_or_else(|| "unknown".to_string());

    let decision = limiter.check(&client);
    if let RateDecision::Deny { reset_at, .. } = &decision {
        warn!(client_ip = %client, path = %req.uri().path(), "Rate limit exceeded");
        let mut response = ProxyError::TooManyRequests {
            message: GLOBAL_DENIAL_MESSAGE.to_string(),
            retry_after_secs: decision.reset_secs(),
            reset_at: *reset_at,
        }
        .into_response();
        decision.apply_headers(response.headers_mut());
        return response;
    }

    let mut response = next.run(req).await;
    if limiter.policy().skip_successful_requests && response.status().as_u16() < 400 {
        limiter.refund(&client);
    }
    decision.apply_headers(response.headers_mut());
    response
}
