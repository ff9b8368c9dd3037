//! TripMate API Gateway: entry point.
//!
//! Reads configuration from environment variables and starts the axum-based
//! HTTP gateway service.
//!
//! # Environment variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PORT` | `3000` | TCP port to listen on. |
//! | `CORS_ORIGIN` | `http://localhost:5173` | Allowed browser origin. |
//! | `RATE_LIMIT_WINDOW_MS` | `900000` | Gateway-wide rate-limit window. |
//! | `RATE_LIMIT_MAX_REQUESTS` | `100` | Requests per client per window. |
//! | `HEALTH_CHECK_TIMEOUT_MS` | `3000` | Per-probe timeout. |
//! | `PROXY_TIMEOUT_MS` | `10000` | Upstream forwarding timeout. |
//! | `TRUST_PROXY` | `false` | Key clients on `X-Forwarded-For`. |
//! | `*_SERVICE_URL` | `http://localhost:3001`… | Upstream base URLs. |
//! | `SUPABASE_URL` / `SUPABASE_ANON_KEY` | *(none)* | Identity provider. |
//! | `LOG_FORMAT` | `pretty` | `json` for structured logs. |

use eyre::WrapErr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tripmate_gateway::filter::{HttpIdentityProvider, IdentityProvider, NoIdentityProvider};
use tripmate_gateway::server::{GatewayServer, GatewayServerConfig};
use tripmate_kernel::config::{GatewaySettings, LogFormat};

/// Upper bound on a single identity-provider round trip.
const IDENTITY_TIMEOUT: Duration = Duration::from_secs(5);

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tripmate_gateway=info,tower_http=info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let settings = GatewaySettings::from_env().wrap_err("failed to load gateway settings")?;
    init_tracing(settings.log_format);

    let gateway_config = settings.gateway_config();
    gateway_config
        .validate()
        .wrap_err("invalid gateway configuration")?;

    let identity: Arc<dyn IdentityProvider> =
        match (&settings.supabase_url, &settings.supabase_anon_key) {
            (Some(url), Some(key)) => Arc::new(HttpIdentityProvider::new(url, key.clone(), IDENTITY_TIMEOUT)?),
            _ => {
                warn!(
                    "SUPABASE_URL or SUPABASE_ANON_KEY not set, authenticated routes will fail. \
                     Do not use this configuration in production."
                );
                Arc::new(NoIdentityProvider)
            }
        };

    info!(
        port = settings.port,
        cors_origin = %settings.cors_origin,
        trust_proxy = settings.trust_proxy,
        rate_limit_max = settings.rate_limit_max_requests,
        "TripMate API Gateway configuration loaded"
    );

    GatewayServer::new(GatewayServerConfig::from_settings(&settings), identity)
        .start(gateway_config)
        .await?;
    Ok(())
}
