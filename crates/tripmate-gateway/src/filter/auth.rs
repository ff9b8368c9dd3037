//! Bearer-token authentication filter.
//!
//! Tokens are validated by an [`IdentityProvider`]. The route's
//! [`AuthPolicy`] decides what a missing token means:
//!
//! | Policy | No / malformed header | Invalid token | Valid token |
//! |--------|----------------------|---------------|-------------|
//! | `Required` | `401` | `401` | principal attached |
//! | `Optional` | anonymous | `401` | principal attached |
//! | `None` | not inspected | not inspected | not inspected |
//!
//! Any inbound `x-user-id` header is removed before the policy is applied.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};
use tripmate_kernel::gateway::{
    AuthPolicy, FilterAction, FilterOrder, GatewayContext, GatewayError, GatewayFilter, Principal,
    Rejection, TRUST_HEADER,
};

const MISSING_CREDENTIAL: &str = "Missing or invalid authorization header";
const INVALID_TOKEN: &str = "Invalid or expired token";

/// Why an identity lookup failed.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The provider rejected the token.
    #[error("invalid or expired token")]
    InvalidToken,
    /// The provider could not be reached or answered garbage.
    #[error("identity provider request failed: {0}")]
    Transport(String),
    #[error("no identity provider configured")]
    NotConfigured,
}

/// Resolves a bearer token to a [`Principal`].
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<Principal, IdentityError>;
}

#[derive(Deserialize)]
struct UserBody {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

/// Hosted identity provider reached over HTTP (`GET /auth/v1/user`).
pub struct HttpIdentityProvider {
    user_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpIdentityProvider {
    /// - `base_url`: provider root, e.g. `https://project.supabase.co`.
    /// - `api_key`:  public key sent as the `apikey` header.
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            user_url: format!("{}/auth/v1/user", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            client,
        })
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn resolve(&self, token: &str) -> Result<Principal, IdentityError> {
        let response = self
            .client
            .get(&self.user_url)
            .bearer_auth(token)
            .header("apikey", &self.api_key)
            .send()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            debug!(status = %response.status(), "Identity provider rejected token");
            return Err(IdentityError::InvalidToken);
        }
        let user: UserBody = response
            .json()
            .await
            .map_err(|_| IdentityError::InvalidToken)?;
        Ok(Principal {
            id: user.id,
            email: user.email,
        })
    }
}

/// Placeholder used when no provider is configured: every token fails with
/// an internal error, anonymous access to optional routes still works.
pub struct NoIdentityProvider;

#[async_trait]
impl IdentityProvider for NoIdentityProvider {
    async fn resolve(&self, _token: &str) -> Result<Principal, IdentityError> {
        Err(IdentityError::NotConfigured)
    }
}

/// Authentication filter enforcing each route's [`AuthPolicy`].
pub struct AuthFilter {
    provider: Arc<dyn IdentityProvider>,
}

impl AuthFilter {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }

    fn bearer_token(ctx: &GatewayContext) -> Option<&str> {
        ctx.request
            .header("authorization")
            .and_then(|auth| auth.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

#[async_trait]
impl GatewayFilter for AuthFilter {
    fn name(&self) -> &str {
        "bearer-auth"
    }

    fn order(&self) -> FilterOrder {
        FilterOrder::AUTH
    }

    async fn on_request(&self, ctx: &mut GatewayContext) -> Result<FilterAction, GatewayError> {
        ctx.request.headers.remove(TRUST_HEADER);

        let policy = ctx
            .route_match
            .as_ref()
            .map(|m| m.auth_policy)
            .unwrap_or(AuthPolicy::Required);

        let token = match (policy, Self::bearer_token(ctx)) {
            (AuthPolicy::None, _) => return Ok(FilterAction::Continue),
            (AuthPolicy::Optional, None) => return Ok(FilterAction::Continue),
            (AuthPolicy::Required, None) => {
                warn!(request_id = %ctx.request.id, "Rejected request: missing bearer token");
                return Ok(FilterAction::Reject(Rejection::Unauthorized {
                    message: MISSING_CREDENTIAL.to_string(),
                }));
            }
            (_, Some(token)) => token.to_string(),
        };

        match self.provider.resolve(&token).await {
            Ok(principal) => {
                debug!(request_id = %ctx.request.id, user_id = %principal.id, "User authenticated");
                ctx.principal = Some(principal);
                Ok(FilterAction::Continue)
            }
            Err(IdentityError::InvalidToken) => {
                warn!(request_id = %ctx.request.id, "Invalid token attempt");
                Ok(FilterAction::Reject(Rejection::Unauthorized {
                    message: INVALID_TOKEN.to_string(),
                }))
            }
            Err(e) => {
                error!(request_id = %ctx.request.id, error = %e, "Authentication failed");
                Ok(FilterAction::Reject(Rejection::Internal {
                    message: "Authentication failed".to_string(),
                }))
            }
        }
    }
}
