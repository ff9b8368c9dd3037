//! Running gateway instances for end-to-end tests.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tripmate_gateway::filter::IdentityProvider;
use tripmate_gateway::server::{GatewayServer, GatewayServerConfig, StartupError};
use tripmate_kernel::config::GatewaySettings;

/// Settings routing every service to `upstream_url`.
pub fn settings_for(upstream_url: &str) -> GatewaySettings {
    GatewaySettings {
        port: 0,
        trip_service_url: upstream_url.to_string(),
        itinerary_service_url: upstream_url.to_string(),
        budget_service_url: upstream_url.to_string(),
        weather_service_url: upstream_url.to_string(),
        places_service_url: upstream_url.to_string(),
        currency_service_url: upstream_url.to_string(),
        health_check_timeout_ms: 500,
        proxy_timeout_ms: 2_000,
        ..GatewaySettings::default()
    }
}

/// A gateway served on an ephemeral port until [`stop`](Self::stop).
pub struct TestGateway {
    base_url: String,
    shutdown: CancellationToken,
    handle: JoinHandle<Result<(), StartupError>>,
}

impl TestGateway {
    pub async fn spawn(settings: &GatewaySettings, identity: Arc<dyn IdentityProvider>) -> Self {
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");

        let server = GatewayServer::new(GatewayServerConfig::from_settings(settings), identity);
        let config = settings.gateway_config();
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(server.serve(listener, config, shutdown.clone()));

        Self {
            base_url: format!("http://{addr}"),
            shutdown,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Trigger graceful shutdown and wait for the server to exit.
    pub async fn stop(self) -> Result<(), StartupError> {
        self.shutdown.cancel();
        self.handle.await.expect("gateway task panicked")
    }
}
