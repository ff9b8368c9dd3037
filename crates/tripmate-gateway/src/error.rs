//! Runtime error types and the gateway's JSON error contract.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::json;
use thiserror::Error;
use tripmate_kernel::gateway::Rejection;

/// Errors produced while handling a request.
///
/// Every variant maps onto exactly one status code and body shape.
/// Internal details are logged where the error is raised and never echoed
/// to the client.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProxyError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("rate limit exceeded, retry in {retry_after_secs}s")]
    TooManyRequests {
        message: String,
        retry_after_secs: u64,
        reset_at: DateTime<Utc>,
    },

    #[error("no route for {method} {path}")]
    RouteNotFound {
        method: String,
        path: String,
        available: Vec<String>,
    },

    #[error("upstream '{service}' unavailable for {prefix}: {source}")]
    UpstreamUnavailable {
        prefix: String,
        service: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("identity provider unreachable: {0}")]
    AuthenticationFailed(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ProxyError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            ProxyError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            ProxyError::UpstreamUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::AuthenticationFailed(_) | ProxyError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<Rejection> for ProxyError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::Unauthorized { message } => ProxyError::Unauthorized(message),
            Rejection::TooManyRequests {
                message,
                retry_after_secs,
                reset_at,
            } => ProxyError::TooManyRequests {
                message,
                retry_after_secs,
                reset_at,
            },
            Rejection::Internal { message } => ProxyError::AuthenticationFailed(message),
            other => ProxyError::Internal(format!("{other:?}")),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ProxyError::Unauthorized(message) => (
                status,
                Json(json!({ "error": "Unauthorized", "message": message })),
            )
                .into_response(),
            ProxyError::TooManyRequests {
                message,
                retry_after_secs,
                reset_at,
            } => {
                let mut response = (
                    status,
                    Json(json!({
                        "error": "Too Many Requests",
                        "message": message,
                        "retryAfter": retry_after_secs,
                        "resetTime": reset_at.to_rfc3339_opts(SecondsFormat::Millis, true),
                    })),
                )
                    .into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
                response
            }
            ProxyError::RouteNotFound {
                method,
                path,
                available,
            } => (
                status,
                Json(json!({
                    "error": "Not Found",
                    "message": format!("Cannot {method} {path}"),
                    "availableEndpoints": available,
                })),
            )
                .into_response(),
            ProxyError::UpstreamUnavailable { prefix, .. } => (
                status,
                Json(json!({
                    "error": "Service Unavailable",
                    "message": "The requested service is temporarily unavailable",
                    "service": prefix,
                })),
            )
                .into_response(),
            ProxyError::AuthenticationFailed(_) => (
                status,
                Json(json!({
                    "error": "Internal Server Error",
                    "message": "Authentication failed",
                })),
            )
                .into_response(),
            ProxyError::Internal(_) => internal_error_response(),
        }
    }
}

/// The terminal `500` body. Carries no detail about the fault.
pub fn internal_error_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "Internal Server Error",
            "message": "Something went wrong",
        })),
    )
        .into_response()
}

pub type ProxyResult<T> = Result<T, ProxyError>;
