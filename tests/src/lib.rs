//! TripMate Testing Framework
//!
//! In-process stand-ins for the pieces around the gateway: a recording
//! upstream service, an HTTP identity provider, and a cached data-provider
//! service. Each one binds an ephemeral port on `127.0.0.1` so tests can
//! drive the real gateway over TCP.

pub mod gateway;
pub mod identity;
pub mod provider;
pub mod upstream;

pub use gateway::{TestGateway, settings_for};
pub use identity::MockIdentityServer;
pub use provider::CachedProviderService;
pub use upstream::{MockUpstream, RecordedRequest};

use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn_router(router: Router) -> String {
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "mock server stopped");
        }
    });
    format!("http://{addr}")
}
