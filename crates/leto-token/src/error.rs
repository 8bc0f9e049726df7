//! # Token Error Types

use chrono::{DateTime, Utc};
use thiserror::Error;

use leto_core::{CanonicalizationError, EntityId, OrchestrationId, TokenId};

/// Errors from token issuance, revocation, usage accounting, and
/// validation.
#[derive(Error, Debug)]
pub enum TokenError {
    /// The token string could not be parsed into a signed envelope.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The Ed25519 proof did not verify against the issuer key.
    #[error("token signature invalid: {0}")]
    SignatureInvalid(String),

    /// The presented instant falls outside `[not_before, expires_at]`.
    #[error("token outside validity window: {reason}")]
    OutsideValidityWindow { reason: String },

    /// The token was revoked.
    #[error("token {token_id} is revoked")]
    Revoked { token_id: TokenId },

    /// No issuance record exists for the token id.
    #[error("no issuance record for token {0}")]
    RecordNotFound(TokenId),

    /// Subject entity does not exist (or is deregistered).
    #[error("legal entity not found: {0}")]
    EntityNotFound(EntityId),

    /// The orchestration named at issuance does not exist.
    #[error("orchestration not found: {0}")]
    OrchestrationNotFound(OrchestrationId),

    /// The orchestration named at issuance is completed or cancelled.
    #[error("orchestration {0} is terminal; no tokens may be issued against it")]
    OrchestrationTerminal(OrchestrationId),

    /// The caller exhausted its hourly issuance ceiling.
    #[error("issuance rate limit exceeded for {caller}: ceiling {ceiling}/hour")]
    RateLimited { caller: String, ceiling: u32 },

    /// Claims could not be canonicalized for signing or hashing.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// JSON serialization error while encoding the envelope.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TokenError {
    /// Convenience constructor for window failures.
    pub fn expired_at(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        TokenError::OutsideValidityWindow {
            reason: format!("expired at {expires_at}, presented at {now}"),
        }
    }

    /// Convenience constructor for not-yet-valid failures.
    pub fn not_yet_valid(not_before: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        TokenError::OutsideValidityWindow {
            reason: format!("not valid before {not_before}, presented at {now}"),
        }
    }
}
