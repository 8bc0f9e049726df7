//! # Authentication
//!
//! Two layers of caller identification:
//!
//! - **Service bearer token** — when configured, every `/v1` route
//!   requires `Authorization: Bearer <token>`. Health probes, metrics,
//!   and the OpenAPI document stay open.
//! - **Caller domain** — external systems identify themselves with the
//!   `x-caller-domain` header; handlers resolve it against the
//!   external-system registry and enforce per-operation grants.
//!
//! Transport-level caller authentication (mTLS, gateway-signed headers)
//! is the deployment's concern, upstream of this service.

use axum::extract::Request;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Extension;
use subtle::ConstantTimeEq;

use leto_trust::{AllowedOperation, ExternalSystem};

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the calling system's domain.
pub const CALLER_DOMAIN_HEADER: &str = "x-caller-domain";

/// A secret compared in constant time and redacted from `Debug` output.
#[derive(Clone)]
pub struct SecretString(String);

impl SecretString {
    /// Wrap a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Constant-time equality against a presented value.
    pub fn matches(&self, presented: &str) -> bool {
        self.0.as_bytes().ct_eq(presented.as_bytes()).into()
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretString(..)")
    }
}

/// Service-level auth configuration passed to the middleware.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// When `Some`, all API routes require this bearer token.
    pub token: Option<SecretString>,
}

/// Bearer-token middleware for the authenticated router.
pub async fn auth_middleware(
    Extension(config): Extension<AuthConfig>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = &config.token else {
        return next.run(request).await;
    };

    let presented = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match presented {
        Some(token) if expected.matches(token) => next.run(request).await,
        Some(_) => AppError::Unauthorized("invalid bearer token".to_string()).into_response(),
        None => AppError::Unauthorized("missing bearer token".to_string()).into_response(),
    }
}

/// Extract the caller domain header from a request's headers.
pub fn caller_domain(headers: &axum::http::HeaderMap) -> Result<String, AppError> {
    headers
        .get(CALLER_DOMAIN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            AppError::Unauthorized(format!("missing {CALLER_DOMAIN_HEADER} header"))
        })
}

/// Resolve and authorize the calling system for an operation.
pub fn authorize_caller(
    state: &AppState,
    headers: &axum::http::HeaderMap,
    operation: AllowedOperation,
) -> Result<ExternalSystem, AppError> {
    let domain = caller_domain(headers)?;
    Ok(state.systems.authorize(&domain, operation)?)
}
