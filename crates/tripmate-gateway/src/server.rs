//! Axum-based HTTP gateway server.
//!
//! [`GatewayServer`] wires the router, filter pipeline, rate limiter,
//! upstream proxy and health aggregator into a running axum service.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Gateway metadata and known prefixes. |
//! | `GET`  | `/health` | Aggregate upstream health (`200` / `503`). |
//! | `GET`  | `/health/{service}` | Health of one upstream. |
//! | `ANY`  | *registered prefixes* | Proxied to the owning service. |
//!
//! Layers, outermost first: panic catcher, HTTP trace, CORS, client address
//! resolution, gateway-wide rate limit.
//!
//! Proxied request bodies are buffered before forwarding and capped at
//! [`MAX_FORWARD_BODY`] (25 MiB); larger uploads are answered with `413`.

use crate::backend::UpstreamProxy;
use crate::error::{ProxyError, internal_error_response};
use crate::filter::{AuthFilter, FilterPipeline, IdentityProvider, LoggingFilter, RouteRateLimitFilter};
use crate::health::HealthAggregator;
use crate::middleware::{ClientIp, ClientIpConfig, RateLimiter, client_ip, rate_limit};
use crate::router::PrefixRouter;
use axum::{
    Extension, Json, Router,
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, Path, State},
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri, header},
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::{Map, Value, json};
use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tripmate_kernel::config::GatewaySettings;
use tripmate_kernel::gateway::{
    FilterAction, GatewayConfig, GatewayContext, GatewayError, GatewayFilter, GatewayRequest,
    GatewayRouter, TRUST_HEADER,
};
use uuid::Uuid;

/// Public name reported by `GET /`.
const SERVICE_TITLE: &str = "TripMate API Gateway";

/// Largest request body the gateway buffers and forwards.
pub const MAX_FORWARD_BODY: usize = 25 * 1024 * 1024;

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Failures while building or starting the server.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid gateway configuration: {0}")]
    Config(#[from] GatewayError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("invalid CORS origin '{0}'")]
    CorsOrigin(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared application state
// ─────────────────────────────────────────────────────────────────────────────

/// Shared state injected into every axum handler via [`State`] extractor.
#[derive(Clone)]
pub struct AppState {
    gateway_name: String,
    router: Arc<PrefixRouter>,
    pipeline: Arc<FilterPipeline>,
    proxy: Arc<UpstreamProxy>,
    health: Arc<HealthAggregator>,
    rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    /// `/health` followed by every route prefix, in evaluation order.
    fn available_endpoints(&self) -> Vec<String> {
        std::iter::once("/health".to_string())
            .chain(self.router.routes().iter().map(|r| r.prefix.clone()))
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// GatewayServerConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Runtime configuration for [`GatewayServer`].
#[derive(Debug, Clone)]
pub struct GatewayServerConfig {
    /// TCP port to listen on (default: 3000).
    pub port: u16,
    /// Allowed browser origin; `*` allows any origin without credentials.
    pub cors_origin: String,
    /// Take the client address from `X-Forwarded-For`.
    pub trust_proxy: bool,
    /// How often stale rate-limit windows are evicted.
    pub gc_interval: Duration,
}

impl Default for GatewayServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            cors_origin: "http://localhost:5173".to_string(),
            trust_proxy: false,
            gc_interval: Duration::from_secs(60),
        }
    }
}

impl GatewayServerConfig {
    pub fn from_settings(settings: &GatewaySettings) -> Self {
        Self {
            port: settings.port,
            cors_origin: settings.cors_origin.clone(),
            trust_proxy: settings.trust_proxy,
            ..Self::default()
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// GatewayServer
// ─────────────────────────────────────────────────────────────────────────────

/// High-level gateway server.
pub struct GatewayServer {
    config: GatewayServerConfig,
    identity: Arc<dyn IdentityProvider>,
}

impl GatewayServer {
    pub fn new(config: GatewayServerConfig, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { config, identity }
    }

    /// Validate `gateway_cfg` and construct every runtime service.
    pub fn build_state(&self, gateway_cfg: &GatewayConfig) -> Result<AppState, StartupError> {
        gateway_cfg.validate()?;

        let router = PrefixRouter::from_config(gateway_cfg)?;
        let filters: Vec<Arc<dyn GatewayFilter>> = vec![
            Arc::new(RouteRateLimitFilter::new()),
            Arc::new(AuthFilter::new(Arc::clone(&self.identity))),
            Arc::new(LoggingFilter::new()),
        ];

        Ok(AppState {
            gateway_name: gateway_cfg.id.clone(),
            router: Arc::new(router),
            pipeline: Arc::new(FilterPipeline::new(filters)),
            proxy: Arc::new(UpstreamProxy::new(gateway_cfg.proxy_timeout)?),
            health: Arc::new(HealthAggregator::new(
                gateway_cfg.id.clone(),
                gateway_cfg.services.clone(),
                gateway_cfg.health_timeout,
            )?),
            rate_limiter: Arc::new(RateLimiter::new(gateway_cfg.rate_limit.clone())),
        })
    }

    /// Build the axum [`Router`] around `state`.
    pub fn build_app(&self, state: AppState) -> Result<Router, StartupError> {
        let cors = self.cors_layer()?;
        let limiter = Arc::clone(&state.rate_limiter);
        let ip_config = ClientIpConfig {
            trust_proxy: self.config.trust_proxy,
        };

        Ok(Router::new()
            .route("/", get(root_handler))
            .route("/health", get(health_handler))
            .route("/health/{service}", get(service_health_handler))
            .fallback(proxy_handler)
            .layer(DefaultBodyLimit::max(MAX_FORWARD_BODY))
            .with_state(state)
            .layer(from_fn_with_state(limiter, rate_limit))
            .layer(from_fn_with_state(ip_config, client_ip))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .layer(CatchPanicLayer::custom(handle_panic)))
    }

    fn cors_layer(&self) -> Result<CorsLayer, StartupError> {
        let layer = CorsLayer::new()
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([
                header::CONTENT_TYPE,
                header::AUTHORIZATION,
                HeaderName::from_static(TRUST_HEADER),
            ]);

        if self.config.cors_origin.trim() == "*" {
            warn!("CORS_ORIGIN is '*': credentials are not allowed");
            return Ok(layer.allow_origin(AllowOrigin::any()));
        }
        let origin = HeaderValue::from_str(self.config.cors_origin.trim())
            .map_err(|_| StartupError::CorsOrigin(self.config.cors_origin.clone()))?;
        Ok(layer
            .allow_origin(AllowOrigin::exact(origin))
            .allow_credentials(true))
    }

    /// Serve on an already bound listener until `shutdown` fires or the
    /// process receives Ctrl-C.
    pub async fn serve(
        self,
        listener: TcpListener,
        gateway_cfg: GatewayConfig,
        shutdown: CancellationToken,
    ) -> Result<(), StartupError> {
        let state = self.build_state(&gateway_cfg)?;
        let gc = state
            .rate_limiter
            .spawn_gc(self.config.gc_interval, shutdown.clone());
        let app = self.build_app(state)?;

        info!(
            addr = %listener.local_addr()?,
            routes = gateway_cfg.routes.len(),
            services = gateway_cfg.services.len(),
            "TripMate API Gateway starting"
        );
        for service in &gateway_cfg.services {
            info!(service = %service.name, url = %service.base_url, "Upstream registered");
        }

        let signal = shutdown.clone();
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = signal.cancelled() => {}
                _ = tokio::signal::ctrl_c() => info!("Shutdown signal received"),
            }
        })
        .await?;

        shutdown.cancel();
        if let Err(e) = gc.await {
            warn!(error = %e, "Rate limiter gc task ended abnormally");
        }
        info!("TripMate API Gateway stopped");
        Ok(())
    }

    /// Bind the server to `0.0.0.0:{port}` and serve until the process exits.
    pub async fn start(self, gateway_cfg: GatewayConfig) -> Result<(), StartupError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.port));
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener, gateway_cfg, CancellationToken::new())
            .await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// `GET /`: gateway metadata.
async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mut endpoints = Map::new();
    endpoints.insert("health".to_string(), Value::from("/health"));
    for route in state.router.routes() {
        endpoints.insert(route.id.clone(), Value::from(route.prefix.as_str()));
    }
    Json(json!({
        "service": SERVICE_TITLE,
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": endpoints,
    }))
}

/// `GET /health`: aggregate upstream health.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let health = state.health.aggregate().await;
    let status = if health.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(health))
}

/// `GET /health/{service}`: one upstream's health.
async fn service_health_handler(
    State(state): State<AppState>,
    Path(service): Path<String>,
) -> Response {
    match state.health.probe_one(&service).await {
        Some(report) => {
            let status = if report.is_healthy() {
                StatusCode::OK
            } else {
                StatusCode::SERVICE_UNAVAILABLE
            };
            (status, Json(report)).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "Service not found",
                "availableServices": state.health.service_names(),
            })),
        )
            .into_response(),
    }
}

/// Fallback handler: routes the request through the filter pipeline, then
/// forwards it to the owning upstream.
async fn proxy_handler(
    State(state): State<AppState>,
    Extension(ClientIp(client_ip)): Extension<ClientIp>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ProxyError> {
    let path = uri.path().to_string();

    let Some(route_match) = state.router.resolve(&path) else {
        return Err(ProxyError::RouteNotFound {
            method: method.to_string(),
            path,
            available: state.available_endpoints(),
        });
    };

    let request_id = headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let mut req = GatewayRequest::new(&request_id, method, path)
        .with_body(body)
        .with_client_ip(client_ip);
    req.headers = headers;
    if let Some(query) = uri.query() {
        req = req.with_query(query);
    }

    let mut ctx = GatewayContext::new(req).with_route_match(route_match);

    match state.pipeline.run_request(&mut ctx).await {
        Ok(FilterAction::Reject(rejection)) => return Err(rejection.into()),
        Ok(_) => {}
        Err(e) => {
            error!(request_id = %request_id, error = %e, "Request filter failed");
            return Err(ProxyError::Internal(e.to_string()));
        }
    }

    let mut upstream_resp = state.proxy.forward(&ctx).await?;

    if let Err(err) = state.pipeline.run_response(&ctx, &mut upstream_resp).await {
        warn!(
            request_id = %request_id,
            error = %err,
            "response filter pipeline error (upstream response still returned)"
        );
    }

    let mut response = Response::new(Body::from(upstream_resp.body));
    *response.status_mut() = upstream_resp.status;
    *response.headers_mut() = upstream_resp.headers;
    Ok(response)
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Terminal handler for panics anywhere below the catch-panic layer.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = %detail, "Request handler panicked");
    internal_error_response()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
