//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps domain errors from leto-trust, leto-orchestration, and leto-token
//! to HTTP status codes with a JSON error body. Internal error details
//! are never exposed in responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use leto_orchestration::OrchestrationError;
use leto_token::TokenError;
use leto_trust::TrustError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. "CONFLICT", "RATE_LIMITED").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Application-level error type that implements [`IntoResponse`].
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Authentication failure — caller unknown or missing credentials (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authorization failure — caller lacks the operation (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Caller exhausted its issuance ceiling (429).
    #[error("rate limit exceeded: {0}")]
    RateLimited(String),

    /// Conflict with current resource state (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal server error (500). Message is logged, not returned.
    #[error("internal error: {0}")]
    Internal(String),

    /// Persistence unavailable — retryable by the caller (503).
    #[error("persistence unavailable: {0}")]
    PersistenceUnavailable(String),
}

impl AppError {
    /// HTTP status and machine-readable code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::RateLimited(_) => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            Self::PersistenceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "PERSISTENCE_UNAVAILABLE")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never expose internal error messages to clients.
        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            Self::PersistenceUnavailable(_) => {
                "Persistence temporarily unavailable; retry later".to_string()
            }
            other => other.to_string(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::PersistenceUnavailable(_) => {
                tracing::warn!(error = %self, "persistence unavailable")
            }
            _ => {}
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<TrustError> for AppError {
    fn from(err: TrustError) -> Self {
        match &err {
            TrustError::EntityNotFound(_) => Self::NotFound(err.to_string()),
            TrustError::DomainInUse(_) | TrustError::TransitionNotAllowed { .. } => {
                Self::Conflict(err.to_string())
            }
            TrustError::InvalidEvidence(_) | TrustError::EvidenceDomainMismatch { .. } => {
                Self::Validation(err.to_string())
            }
            TrustError::SystemNotRegistered(_) => Self::Unauthorized(err.to_string()),
            TrustError::SystemNotApproved(_) | TrustError::OperationNotPermitted { .. } => {
                Self::Forbidden(err.to_string())
            }
        }
    }
}

impl From<OrchestrationError> for AppError {
    fn from(err: OrchestrationError) -> Self {
        match &err {
            OrchestrationError::NotFound(_) | OrchestrationError::ParticipantNotFound(_) => {
                Self::NotFound(err.to_string())
            }
            OrchestrationError::DuplicateRole { .. }
            | OrchestrationError::Terminal { .. }
            | OrchestrationError::InvalidStatusTransition { .. } => Self::Conflict(err.to_string()),
            OrchestrationError::Validation(_) => Self::Validation(err.to_string()),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match &err {
            TokenError::EntityNotFound(_)
            | TokenError::OrchestrationNotFound(_)
            | TokenError::RecordNotFound(_) => Self::NotFound(err.to_string()),
            TokenError::OrchestrationTerminal(_) => Self::Conflict(err.to_string()),
            TokenError::RateLimited { .. } => Self::RateLimited(err.to_string()),
            TokenError::Malformed(_)
            | TokenError::SignatureInvalid(_)
            | TokenError::OutsideValidityWindow { .. }
            | TokenError::Revoked { .. } => Self::Validation(err.to_string()),
            TokenError::Canonicalization(_) | TokenError::Json(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<leto_core::ValidationError> for AppError {
    fn from(err: leto_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::PersistenceUnavailable(err.to_string())
    }
}
