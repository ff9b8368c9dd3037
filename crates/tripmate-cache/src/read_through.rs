//! Read-through caching as an explicit two-stage pipeline.
//!
//! [`cache_check`] runs before the handler and either answers from the
//! cache or lets the request proceed. [`cache_populate`] runs on the
//! handler's JSON body and returns the decorated body together with the
//! [`CacheWrite`] to perform, if any. Both stages are pure; the
//! [`read_through`] middleware wires them to a [`CacheLayer`] and carries
//! out the write in the background.

use crate::key::KeySpec;
use crate::layer::{CacheLayer, Lookup};
use axum::Json;
use axum::body::{Body, HttpBody, to_bytes};
use axum::extract::{FromRequestParts, Path, Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, info};

/// Largest handler body the populate stage will buffer.
const MAX_CACHEABLE_BODY: usize = 4 * 1024 * 1024;

/// How one endpoint is cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicy {
    pub key: KeySpec,
    pub ttl: Duration,
}

impl CachePolicy {
    pub fn new(key: KeySpec, ttl: Duration) -> Self {
        Self { key, ttl }
    }

    /// `weather:<city>`
    pub fn weather(ttl: Duration) -> Self {
        Self::new(KeySpec::new("weather", ["city"]), ttl)
    }

    /// `places:<city>`
    pub fn places(ttl: Duration) -> Self {
        Self::new(KeySpec::new("places", ["city"]), ttl)
    }

    /// `currency:<from>-<to>`
    pub fn currency_pair(ttl: Duration) -> Self {
        Self::new(KeySpec::new("currency", ["from", "to"]), ttl)
    }

    /// `currency:rates:<base>`
    pub fn currency_rates(ttl: Duration) -> Self {
        Self::new(KeySpec::new("currency:rates", ["base"]), ttl)
    }
}

/// Outcome of the cache-check stage.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    /// Answer with this body without calling the handler.
    Respond(Value),
    /// Run the handler.
    Proceed,
}

/// Deferred write produced by the cache-populate stage.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheWrite {
    pub key: String,
    pub value: Value,
    pub ttl: Duration,
}

/// Cache-check stage.
pub fn cache_check(lookup: Lookup) -> CheckOutcome {
    match lookup {
        Lookup::Hit(data) => CheckOutcome::Respond(json!({
            "success": true,
            "data": data,
            "cached": true,
        })),
        Lookup::Miss => CheckOutcome::Proceed,
    }
}

/// Cache-populate stage.
///
/// Successful envelopes (`2xx`, `success: true`, non-null `data`) gain
/// `cached: false` and yield a write of their `data`. Anything else is
/// returned untouched with no write.
pub fn cache_populate(
    key: &str,
    ttl: Duration,
    status: StatusCode,
    mut body: Value,
) -> (Value, Option<CacheWrite>) {
    if !status.is_success() {
        return (body, None);
    }
    let Some(envelope) = body.as_object_mut() else {
        return (body, None);
    };
    if envelope.get("success") != Some(&Value::Bool(true)) {
        return (body, None);
    }
    envelope.insert("cached".to_string(), Value::Bool(false));

    let write = envelope
        .get("data")
        .filter(|data| !data.is_null())
        .map(|data| CacheWrite {
            key: key.to_string(),
            value: data.clone(),
            ttl,
        });
    (body, write)
}

/// State for the [`read_through`] middleware.
#[derive(Debug, Clone)]
pub struct ReadThrough {
    pub cache: CacheLayer,
    pub policy: CachePolicy,
}

impl ReadThrough {
    pub fn new(cache: CacheLayer, policy: CachePolicy) -> Self {
        Self { cache, policy }
    }
}

/// axum middleware applying the read-through stages around a handler.
///
/// Attach with `route_layer` so path parameters are available:
///
/// ```rust,ignore
/// let weather = ReadThrough::new(cache.clone(), CachePolicy::weather(ttl));
/// Router::new().route(
///     "/api/weather/{city}",
///     get(current_weather).route_layer(from_fn_with_state(weather, read_through)),
/// );
/// ```
pub async fn read_through(State(rt): State<ReadThrough>, req: Request, next: Next) -> Response {
    let (mut parts, body) = req.into_parts();
    let params = match Path::<HashMap<String, String>>::from_request_parts(&mut parts, &()).await
    {
        Ok(Path(params)) => params,
        Err(_) => HashMap::new(),
    };
    let req = Request::from_parts(parts, body);

    let Some(key) = rt.policy.key.derive(&params) else {
        return next.run(req).await;
    };

    if let CheckOutcome::Respond(body) = cache_check(rt.cache.get(&key).await) {
        info!(cache_key = %key, "Cache hit");
        return Json(body).into_response();
    }
    info!(cache_key = %key, "Cache miss");

    let response = next.run(req).await;
    let (mut parts, body) = response.into_parts();
    let is_json = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));
    if !parts.status.is_success() || !is_json {
        return Response::from_parts(parts, body);
    }

    // Bodies of unknown or oversized length are relayed untouched.
    let cacheable = HttpBody::size_hint(&body)
        .exact()
        .is_some_and(|len| len <= MAX_CACHEABLE_BODY as u64);
    if !cacheable {
        debug!(cache_key = %key, "Response body too large to cache");
        return Response::from_parts(parts, body);
    }

    let bytes = match to_bytes(body, MAX_CACHEABLE_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(cache_key = %key, error = %e, "Failed to buffer handler response");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Internal Server Error",
                    "message": "Something went wrong",
                })),
            )
                .into_response();
        }
    };
    let Ok(value) = serde_json::from_slice::<Value>(&bytes) else {
        return Response::from_parts(parts, Body::from(bytes));
    };

    let (decorated, write) = cache_populate(&key, rt.policy.ttl, parts.status, value);
    if let Some(write) = write {
        rt.cache.set_detached(write.key, write.value, write.ttl);
    }
    match serde_json::to_vec(&decorated) {
        Ok(encoded) => {
            parts.headers.remove(header::CONTENT_LENGTH);
            Response::from_parts(parts, Body::from(encoded))
        }
        Err(_) => Response::from_parts(parts, Body::from(bytes)),
    }
}
