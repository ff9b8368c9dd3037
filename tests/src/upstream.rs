//! Recording mock of a TripMate domain service.

use crate::spawn_router;
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// One request as the upstream saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[derive(Clone)]
struct UpstreamState {
    health_delay: Duration,
    requests: Arc<RwLock<Vec<RecordedRequest>>>,
}

/// Mock upstream answering every path.
///
/// - `GET /api/health` answers `{"status":"ok"}` after the configured delay
///   and is not recorded.
/// - Paths ending in `/broken` answer `502` with a failure envelope.
/// - Paths ending in `/moved` answer `303` pointing at the same path with
///   `/moved` replaced by `/current`.
/// - Everything else echoes the request back in a success envelope.
pub struct MockUpstream {
    base_url: String,
    requests: Arc<RwLock<Vec<RecordedRequest>>>,
}

impl MockUpstream {
    pub async fn spawn() -> Self {
        Self::spawn_with_health_delay(Duration::ZERO).await
    }

    /// Spawn an upstream whose health endpoint stalls for `delay`.
    pub async fn spawn_with_health_delay(delay: Duration) -> Self {
        let requests = Arc::new(RwLock::new(Vec::new()));
        let state = UpstreamState {
            health_delay: delay,
            requests: Arc::clone(&requests),
        };
        let router = Router::new()
            .route("/api/health", get(health))
            .fallback(echo)
            .with_state(state);

        Self {
            base_url: spawn_router(router).await,
            requests,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Number of non-health requests received.
    pub async fn call_count(&self) -> usize {
        self.requests.read().await.len()
    }

    pub async fn last_request(&self) -> Option<RecordedRequest> {
        self.requests.read().await.last().cloned()
    }
}

async fn health(State(state): State<UpstreamState>) -> impl IntoResponse {
    if !state.health_delay.is_zero() {
        tokio::time::sleep(state.health_delay).await;
    }
    Json(json!({ "status": "ok" }))
}

async fn echo(
    State(state): State<UpstreamState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let recorded = RecordedRequest {
        method: method.clone(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers,
        body,
    };
    let user_id = recorded.header("x-user-id").map(str::to_string);
    state.requests.write().await.push(recorded);

    if let Some(base) = uri.path().strip_suffix("/moved") {
        return (
            StatusCode::SEE_OTHER,
            [("location", format!("{base}/current"))],
            Json(json!({ "success": true, "data": "moved" })),
        )
            .into_response();
    }

    if uri.path().ends_with("/broken") {
        return (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "success": false, "error": "provider exploded" })),
        )
            .into_response();
    }

    (
        StatusCode::OK,
        [("x-upstream", "mock")],
        Json(json!({
            "success": true,
            "data": {
                "method": method.as_str(),
                "path": uri.path(),
                "query": uri.query(),
                "userId": user_id,
            }
        })),
    )
        .into_response()
}
