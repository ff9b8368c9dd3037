use reqwest::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tripmate_cache::CacheLayer;
use tripmate_gateway::filter::NoIdentityProvider;
use tripmate_kernel::config::GatewaySettings;
use tripmate_testing::{
    CachedProviderService, MockIdentityServer, MockUpstream, TestGateway, settings_for,
};


const GOOD_TOKEN: &str = "good-token";

async fn identity() -> MockIdentityServer {
    MockIdentityServer::spawn(&[(GOOD_TOKEN, "user-123", "traveller@example.com")]).await
}

async fn body(resp: reqwest::Response) -> Value {
    resp.json().await.expect("json body")
}

// ============================================================================
// Routing
// ============================================================================

#[tokio::test]
async fn test_root_lists_health_and_every_prefix() {
    let upstream = MockUpstream::spawn().await;
    let gateway = TestGateway::spawn(&settings_for(upstream.base_url()), Arc::new(NoIdentityProvider)).await;

    let resp = reqwest::get(gateway.url("/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body(resp).await;
    assert_eq!(json["service"], "TripMate API Gateway");
    assert_eq!(json["status"], "running");
    assert_eq!(json["endpoints"]["health"], "/health");
    assert_eq!(json["endpoints"]["currency"], "/api/currency");

    gateway.stop().await.unwrap();
}

#[tokio::test]
async fn test_unknown_path_is_404_with_available_endpoints() {
    let upstream = MockUpstream::spawn().await;
    let gateway = TestGateway::spawn(&settings_for(upstream.base_url()), Arc::new(NoIdentityProvider)).await;

    let client = reqwest::Client::new();
    let resp = client.post(gateway.url("/api/unknown")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let json = body(resp).await;
    assert_eq!(json["error"], "Not Found");
    assert_eq!(json["message"], "Cannot POST /api/unknown");
    let endpoints: Vec<&str> = json["availableEndpoints"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(
        endpoints,
        vec![
            "/health",
            "/api/trips",
            "/api/itinerary",
            "/api/attractions",
            "/api/expenses",
            "/api/budget",
            "/api/weather",
            "/api/places",
            "/api/currency",
        ]
    );
    assert_eq!(upstream.call_count().await, 0);

    gateway.stop().await.unwrap();
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_required_route_rejects_before_reaching_upstream() {
    let upstream = MockUpstream::spawn().await;
    let idp = identity().await;
    let gateway = TestGateway::spawn(&settings_for(upstream.base_url()), idp.provider()).await;
    let client = reqwest::Client::new();

    let resp = client.get(gateway.url("/api/trips")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body(resp).await["message"],
        "Missing or invalid authorization header"
    );

    let resp = client
        .get(gateway.url("/api/trips"))
        .header("authorization", "Basic dXNlcjpwYXNz")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = client
        .get(gateway.url("/api/trips"))
        .bearer_auth("expired-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body(resp).await["message"], "Invalid or expired token");

    assert_eq!(upstream.call_count().await, 0);
    assert_eq!(idp.calls(), 1);

    gateway.stop().await.unwrap();
}

#[tokio::test]
async fn test_authenticated_request_carries_verified_identity() {
    let upstream = MockUpstream::spawn().await;
    let idp = identity().await;
    let gateway = TestGateway::spawn(&settings_for(upstream.base_url()), idp.provider()).await;

    let resp = reqwest::Client::new()
        .post(gateway.url("/api/trips/42/days?include=stops"))
        .bearer_auth(GOOD_TOKEN)
        .header("x-user-id", "someone-else")
        .header("content-type", "application/json")
        .body(r#"{"title":"Lisbon"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["x-upstream"], "mock");
    let json = body(resp).await;
    assert_eq!(json["data"]["userId"], "user-123");

    let seen = upstream.last_request().await.unwrap();
    assert_eq!(seen.method, reqwest::Method::POST);
    assert_eq!(seen.path, "/api/trips/42/days");
    assert_eq!(seen.query.as_deref(), Some("include=stops"));
    assert_eq!(seen.header("x-user-id"), Some("user-123"));
    assert!(seen.header("x-request-id").is_some());
    assert_eq!(&seen.body[..], br#"{"title":"Lisbon"}"#);

    gateway.stop().await.unwrap();
}

#[tokio::test]
async fn test_optional_route_strips_caller_supplied_identity() {
    let upstream = MockUpstream::spawn().await;
    let idp = identity().await;
    let gateway = TestGateway::spawn(&settings_for(upstream.base_url()), idp.provider()).await;

    let resp = reqwest::Client::new()
        .get(gateway.url("/api/weather/paris"))
        .header("x-user-id", "admin")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let seen = upstream.last_request().await.unwrap();
    assert_eq!(seen.header("x-user-id"), None);
    assert_eq!(idp.calls(), 0);

    gateway.stop().await.unwrap();
}

#[tokio::test]
async fn test_unconfigured_identity_provider_only_fails_presented_tokens() {
    let upstream = MockUpstream::spawn().await;
    let gateway = TestGateway::spawn(&settings_for(upstream.base_url()), Arc::new(NoIdentityProvider)).await;
    let client = reqwest::Client::new();

    let resp = client.get(gateway.url("/api/places/rome")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(gateway.url("/api/trips"))
        .bearer_auth("anything")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body(resp).await["message"], "Authentication failed");

    gateway.stop().await.unwrap();
}

// ============================================================================
// Forwarding
// ============================================================================

#[tokio::test]
async fn test_upstream_error_status_is_relayed() {
    let upstream = MockUpstream::spawn().await;
    let gateway = TestGateway::spawn(&settings_for(upstream.base_url()), Arc::new(NoIdentityProvider)).await;

    let resp = reqwest::get(gateway.url("/api/currency/broken")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body(resp).await["error"], "provider exploded");

    gateway.stop().await.unwrap();
}

#[tokio::test]
async fn test_upstream_redirect_is_relayed_not_followed() {
    let upstream = MockUpstream::spawn().await;
    let gateway = TestGateway::spawn(&settings_for(upstream.base_url()), Arc::new(NoIdentityProvider)).await;
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    let resp = client.get(gateway.url("/api/places/moved")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()["location"], "/api/places/current");
    assert_eq!(body(resp).await["data"], "moved");
    assert_eq!(upstream.call_count().await, 1);

    gateway.stop().await.unwrap();
}

#[tokio::test]
async fn test_unreachable_upstream_is_503() {
    let settings = settings_for("http://127.0.0.1:1");
    let gateway = TestGateway::spawn(&settings, Arc::new(NoIdentityProvider)).await;

    let resp = reqwest::get(gateway.url("/api/weather/oslo")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body(resp).await;
    assert_eq!(json["error"], "Service Unavailable");
    assert_eq!(json["service"], "/api/weather");

    gateway.stop().await.unwrap();
}

// ============================================================================
// Rate limiting
// ============================================================================

#[tokio::test]
async fn test_rate_limit_is_per_client() {
    let upstream = MockUpstream::spawn().await;
    let settings = GatewaySettings {
        rate_limit_max_requests: 3,
        trust_proxy: true,
        ..settings_for(upstream.base_url())
    };
    let gateway = TestGateway::spawn(&settings, Arc::new(NoIdentityProvider)).await;
    let client = reqwest::Client::new();

    for _ in 0..3 {
        let resp = client
            .get(gateway.url("/api/weather/rome"))
            .header("x-forwarded-for", "203.0.113.7")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key("ratelimit-remaining"));
    }

    let resp = client
        .get(gateway.url("/api/weather/rome"))
        .header("x-forwarded-for", "203.0.113.7")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(resp.headers().contains_key("retry-after"));
    let json = body(resp).await;
    assert_eq!(
        json["message"],
        "Too many requests from this IP, please try again later."
    );
    let retry_after = json["retryAfter"].as_u64().unwrap();
    assert!(retry_after > 0 && retry_after <= 900);

    let resp = client
        .get(gateway.url("/api/weather/rome"))
        .header("x-forwarded-for", "198.51.100.20")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(upstream.call_count().await, 4);

    gateway.stop().await.unwrap();
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_is_degraded_when_one_probe_times_out() {
    let healthy = MockUpstream::spawn().await;
    let slow = MockUpstream::spawn_with_health_delay(Duration::from_secs(3)).await;
    let settings = GatewaySettings {
        health_check_timeout_ms: 200,
        budget_service_url: slow.base_url().to_string(),
        ..settings_for(healthy.base_url())
    };
    let gateway = TestGateway::spawn(&settings, Arc::new(NoIdentityProvider)).await;

    let started = Instant::now();
    let resp = reqwest::get(gateway.url("/health")).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

    let json = body(resp).await;
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["gateway"]["name"], "api-gateway");
    assert_eq!(json["summary"]["total"], 6);
    assert_eq!(json["summary"]["healthy"], 5);
    assert_eq!(json["summary"]["unhealthy"], 1);
    let unhealthy: Vec<&str> = json["services"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|s| s["status"] == "unhealthy")
        .filter_map(|s| s["name"].as_str())
        .collect();
    assert_eq!(unhealthy, vec!["budget-service"]);

    gateway.stop().await.unwrap();
}

#[tokio::test]
async fn test_single_service_health() {
    let upstream = MockUpstream::spawn().await;
    let gateway = TestGateway::spawn(&settings_for(upstream.base_url()), Arc::new(NoIdentityProvider)).await;

    let resp = reqwest::get(gateway.url("/health/weather-service")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body(resp).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["data"]["status"], "ok");

    let resp = reqwest::get(gateway.url("/health/billing-service")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let json = body(resp).await;
    assert_eq!(json["error"], "Service not found");
    assert_eq!(json["availableServices"].as_array().unwrap().len(), 6);

    gateway.stop().await.unwrap();
}

// ============================================================================
// Read-through cache behind the gateway
// ============================================================================

#[tokio::test]
async fn test_weather_lookup_is_served_from_cache_on_repeat() {
    let cache = CacheLayer::in_memory();
    let provider = CachedProviderService::spawn(cache.clone(), Duration::from_secs(900)).await;
    let gateway = TestGateway::spawn(&settings_for(provider.base_url()), Arc::new(NoIdentityProvider)).await;

    let first = body(reqwest::get(gateway.url("/api/weather/London")).await.unwrap()).await;
    assert_eq!(first["success"], true);
    assert_eq!(first["cached"], false);
    assert_eq!(first["data"]["temperature"], 18.5);

    cache.settle().await;

    let second = body(reqwest::get(gateway.url("/api/weather/london")).await.unwrap()).await;
    assert_eq!(second["cached"], true);
    assert_eq!(second["data"], first["data"]);
    assert_eq!(provider.provider_calls(), 1);

    gateway.stop().await.unwrap();
}

#[tokio::test]
async fn test_failed_lookup_is_not_cached() {
    let cache = CacheLayer::in_memory();
    let provider = CachedProviderService::spawn(cache.clone(), Duration::from_secs(900)).await;
    let gateway = TestGateway::spawn(&settings_for(provider.base_url()), Arc::new(NoIdentityProvider)).await;

    for _ in 0..2 {
        let resp = reqwest::get(gateway.url("/api/weather/atlantis")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        cache.settle().await;
    }
    assert_eq!(provider.provider_calls(), 2);

    gateway.stop().await.unwrap();
}

#[tokio::test]
async fn test_currency_pair_key_ignores_case() {
    let cache = CacheLayer::in_memory();
    let provider = CachedProviderService::spawn(cache.clone(), Duration::from_secs(3600)).await;
    let gateway = TestGateway::spawn(&settings_for(provider.base_url()), Arc::new(NoIdentityProvider)).await;

    let first = body(
        reqwest::get(gateway.url("/api/currency/convert/usd/EUR"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(first["cached"], false);
    cache.settle().await;

    let second = body(
        reqwest::get(gateway.url("/api/currency/convert/USD/eur"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(second["cached"], true);
    assert_eq!(second["data"]["rate"], 0.92);
    assert_eq!(provider.provider_calls(), 1);

    gateway.stop().await.unwrap();
}
