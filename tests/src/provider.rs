//! Mock data-provider service fronted by the read-through cache.
//!
//! Mirrors how the weather and currency services sit behind the gateway:
//! each lookup endpoint is wrapped in [`read_through`] and the handler only
//! runs on a cache miss.

use crate::spawn_router;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tripmate_cache::{CacheLayer, CachePolicy, ReadThrough, read_through};

/// City the mock provider does not know.
pub const UNKNOWN_CITY: &str = "atlantis";

/// Weather and currency lookups backed by a counting fake provider.
pub struct CachedProviderService {
    base_url: String,
    provider_calls: Arc<AtomicUsize>,
}

impl CachedProviderService {
    pub async fn spawn(cache: CacheLayer, ttl: Duration) -> Self {
        let provider_calls = Arc::new(AtomicUsize::new(0));
        let weather = ReadThrough::new(cache.clone(), CachePolicy::weather(ttl));
        let currency = ReadThrough::new(cache, CachePolicy::currency_pair(ttl));

        let router = Router::new()
            .route("/api/health", get(|| async { Json(json!({ "status": "ok" })) }))
            .route(
                "/api/weather/{city}",
                get(current_weather).route_layer(from_fn_with_state(weather, read_through)),
            )
            .route(
                "/api/currency/convert/{from}/{to}",
                get(exchange_rate).route_layer(from_fn_with_state(currency, read_through)),
            )
            .with_state(Arc::clone(&provider_calls));

        Self {
            base_url: spawn_router(router).await,
            provider_calls,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Number of times the fake provider was consulted.
    pub fn provider_calls(&self) -> usize {
        self.provider_calls.load(Ordering::SeqCst)
    }
}

async fn current_weather(
    State(calls): State<Arc<AtomicUsize>>,
    Path(city): Path<String>,
) -> Response {
    calls.fetch_add(1, Ordering::SeqCst);
    if city.eq_ignore_ascii_case(UNKNOWN_CITY) {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": "City not found" })),
        )
            .into_response();
    }
    Json(json!({
        "success": true,
        "data": { "city": city, "temperature": 18.5, "conditions": "clear sky" }
    }))
    .into_response()
}

async fn exchange_rate(
    State(calls): State<Arc<AtomicUsize>>,
    Path((from, to)): Path<(String, String)>,
) -> Response {
    calls.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "success": true,
        "data": {
            "from": from.to_uppercase(),
            "to": to.to_uppercase(),
            "rate": 0.92
        }
    }))
    .into_response()
}
