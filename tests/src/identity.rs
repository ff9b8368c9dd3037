//! Mock of the hosted identity provider's `GET /auth/v1/user` endpoint.

use crate::spawn_router;
use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tripmate_gateway::filter::{HttpIdentityProvider, IdentityProvider};

/// Public key the mock expects in the `apikey` header.
pub const MOCK_API_KEY: &str = "anon-test-key";

#[derive(Clone)]
struct IdentityState {
    users: Arc<HashMap<String, (String, String)>>,
    calls: Arc<AtomicUsize>,
}

/// Identity provider accepting a fixed set of tokens.
pub struct MockIdentityServer {
    base_url: String,
    calls: Arc<AtomicUsize>,
}

impl MockIdentityServer {
    /// Spawn a provider that knows `users` as `(token, user id, email)`.
    pub async fn spawn(users: &[(&str, &str, &str)]) -> Self {
        let users = users
            .iter()
            .map(|(token, id, email)| (token.to_string(), (id.to_string(), email.to_string())))
            .collect();
        let calls = Arc::new(AtomicUsize::new(0));
        let state = IdentityState {
            users: Arc::new(users),
            calls: Arc::clone(&calls),
        };
        let router = Router::new()
            .route("/auth/v1/user", get(current_user))
            .with_state(state);

        Self {
            base_url: spawn_router(router).await,
            calls,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Number of token lookups served.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// A gateway identity provider pointed at this mock.
    pub fn provider(&self) -> Arc<dyn IdentityProvider> {
        let provider = HttpIdentityProvider::new(&self.base_url, MOCK_API_KEY, Duration::from_secs(2))
            .expect("build identity client");
        Arc::new(provider)
    }
}

async fn current_user(State(state): State<IdentityState>, headers: HeaderMap) -> Response {
    state.calls.fetch_add(1, Ordering::SeqCst);

    if headers.get("apikey").and_then(|v| v.to_str().ok()) != Some(MOCK_API_KEY) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "No API key found in request" })),
        )
            .into_response();
    }

    let user = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|token| state.users.get(token));

    match user {
        Some((id, email)) => Json(json!({ "id": id, "email": email })).into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "invalid JWT" })),
        )
            .into_response(),
    }
}
