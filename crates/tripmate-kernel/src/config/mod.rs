//! Gateway settings loader.
//!
//! Settings come from process environment variables (case-insensitive
//! names), optionally layered over a configuration file whose format is
//! detected from its extension. Every field has a default so an empty
//! environment yields a runnable local setup.
//!
//! ```rust,ignore
//! use tripmate_kernel::config::GatewaySettings;
//!
//! let settings = GatewaySettings::from_env()?;
//! let gateway = settings.gateway_config();
//! gateway.validate()?;
//! ```

use crate::gateway::{
    AuthPolicy, GatewayConfig, GatewayError, RateLimitPolicy, RouteRule, ServiceDescriptor,
};
use config::{Config as Cfg, Environment, File, FileFormat};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;


/// Name the gateway reports about itself.
pub const GATEWAY_NAME: &str = "api-gateway";

/// Settings loading error.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Config parsing error: {0}")]
    Parse(String),

    #[error("Invalid gateway configuration: {0}")]
    Invalid(#[from] GatewayError),
}

/// Result type for settings operations
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Log output format selected by `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Flat, environment-shaped gateway settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    pub port: u16,
    pub cors_origin: String,
    pub rate_limit_window_ms: u64,
    pub rate_limit_max_requests: u32,
    pub health_check_timeout_ms: u64,
    pub proxy_timeout_ms: u64,
    /// Take the client address from `X-Forwarded-For` instead of the peer.
    pub trust_proxy: bool,
    pub trip_service_url: String,
    pub itinerary_service_url: String,
    pub budget_service_url: String,
    pub weather_service_url: String,
    pub places_service_url: String,
    pub currency_service_url: String,
    /// Identity provider base URL.
    pub supabase_url: Option<String>,
    /// Public API key sent to the identity provider.
    pub supabase_anon_key: Option<String>,
    pub log_format: LogFormat,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            port: 3000,
            cors_origin: "http://localhost:5173".to_string(),
            rate_limit_window_ms: 15 * 60 * 1000,
            rate_limit_max_requests: 100,
            health_check_timeout_ms: 3000,
            proxy_timeout_ms: 10_000,
            trust_proxy: false,
            trip_service_url: "http://localhost:3001".to_string(),
            itinerary_service_url: "http://localhost:3002".to_string(),
            budget_service_url: "http://localhost:3003".to_string(),
            weather_service_url: "http://localhost:3004".to_string(),
            places_service_url: "http://localhost:3005".to_string(),
            currency_service_url: "http://localhost:3006".to_string(),
            supabase_url: None,
            supabase_anon_key: None,
            log_format: LogFormat::Pretty,
        }
    }
}

/// Detect configuration format from file extension.
pub fn detect_format(path: &str) -> SettingsResult<FileFormat> {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| SettingsError::UnsupportedFormat("No file extension found".to_string()))?;

    match ext.to_lowercase().as_str() {
        "yaml" | "yml" => Ok(FileFormat::Yaml),
        "toml" => Ok(FileFormat::Toml),
        "json" => Ok(FileFormat::Json),
        _ => Err(SettingsError::UnsupportedFormat(ext.to_string())),
    }
}

impl GatewaySettings {
    /// Load settings from the process environment.
    pub fn from_env() -> SettingsResult<Self> {
        Self::load(None)
    }

    /// Load settings from an optional file, overridden by the environment.
    pub fn load(path: Option<&str>) -> SettingsResult<Self> {
        Self::build(path, Environment::default().try_parsing(true))
    }

    /// Load settings from an explicit variable map instead of the process
    /// environment.
    pub fn from_vars(vars: HashMap<String, String>) -> SettingsResult<Self> {
        Self::build(None, Environment::default().source(Some(vars)).try_parsing(true))
    }

    fn build(path: Option<&str>, env: Environment) -> SettingsResult<Self> {
        let mut builder = Cfg::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::new(path, detect_format(path)?));
        }
        builder
            .add_source(env)
            .build()
            .map_err(|e| SettingsError::Parse(e.to_string()))?
            .try_deserialize()
            .map_err(|e| SettingsError::Parse(e.to_string()))
    }

    /// Build the TripMate route table and service list from these settings.
    ///
    /// The result is not validated; call [`GatewayConfig::validate`].
    pub fn gateway_config(&self) -> GatewayConfig {
        let services = [
            ("trip-service", &self.trip_service_url),
            ("itinerary-service", &self.itinerary_service_url),
            ("budget-service", &self.budget_service_url),
            ("weather-service", &self.weather_service_url),
            ("places-service", &self.places_service_url),
            ("currency-service", &self.currency_service_url),
        ];
        let routes = [
            ("trips", "/api/trips", "trip-service", AuthPolicy::Required),
            ("itinerary", "/api/itinerary", "itinerary-service", AuthPolicy::Required),
            ("attractions", "/api/attractions", "itinerary-service", AuthPolicy::Required),
            ("expenses", "/api/expenses", "budget-service", AuthPolicy::Required),
            ("budget", "/api/budget", "budget-service", AuthPolicy::Required),
            ("weather", "/api/weather", "weather-service", AuthPolicy::Optional),
            ("places", "/api/places", "places-service", AuthPolicy::Optional),
            ("currency", "/api/currency", "currency-service", AuthPolicy::Optional),
        ];

        let mut config = GatewayConfig::new(GATEWAY_NAME)
            .with_rate_limit(RateLimitPolicy::new(
                Duration::from_millis(self.rate_limit_window_ms),
                self.rate_limit_max_requests,
            ))
            .with_proxy_timeout(Duration::from_millis(self.proxy_timeout_ms))
            .with_health_timeout(Duration::from_millis(self.health_check_timeout_ms));
        for (name, url) in services {
            config = config.with_service(ServiceDescriptor::new(name, url.as_str()));
        }
        for (id, prefix, service, policy) in routes {
            config = config.with_route(RouteRule::new(id, prefix, service, policy));
        }
        config
    }
}
