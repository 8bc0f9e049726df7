// SPDX-License-Identifier: Apache-2.0
//! # Token Issuer
//!
//! Mints, signs, and records assurance and orchestration tokens.
//!
//! Issuance re-reads the subject entity inside the issuance path — the
//! current tier is never cached across requests, so a downgrade that
//! lands mid-issuance is resolved by last consistent read. The throttle
//! is consulted before anything else; a rate-limited request has no side
//! effects at all.

use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;

use leto_core::{Clock, EntityId, OrchestrationId, TokenId};
use leto_crypto::SigningKey;
use leto_orchestration::OrchestrationRegistry;
use leto_trust::{EntityDirectory, ExternalSystem};

use crate::claims::{AssuranceClaims, OrchestrationClaims, TokenClaims, TokenKind};
use crate::envelope::SignedToken;
use crate::error::TokenError;
use crate::record::{IssuedTokenRecord, TokenRecordStore};
use crate::throttle::IssuanceThrottle;

/// Validity window for assurance tokens.
pub fn assurance_token_ttl() -> Duration {
    Duration::hours(24)
}

/// Validity window for orchestration tokens.
pub fn orchestration_token_ttl() -> Duration {
    Duration::hours(1)
}

/// Issuer identity and key naming.
#[derive(Debug, Clone)]
pub struct IssuerConfig {
    /// The registry authority's identity, e.g. `registry.example.com`.
    /// Becomes the `iss` claim of every minted token.
    pub issuer_id: String,
    /// Identifier of the signing key, e.g. `registry.example.com#key-1`.
    pub verification_method: String,
}

/// A freshly minted token as returned to the caller: the opaque signed
/// string plus its id. The raw string is never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token_id: TokenId,
    /// The opaque signed token string.
    pub token: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

/// Mints and records signed claims tokens.
pub struct TokenIssuer {
    config: IssuerConfig,
    signing_key: Arc<SigningKey>,
    directory: Arc<EntityDirectory>,
    orchestrations: Arc<OrchestrationRegistry>,
    records: Arc<TokenRecordStore>,
    throttle: IssuanceThrottle,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    /// Create an issuer.
    pub fn new(
        config: IssuerConfig,
        signing_key: Arc<SigningKey>,
        directory: Arc<EntityDirectory>,
        orchestrations: Arc<OrchestrationRegistry>,
        records: Arc<TokenRecordStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            signing_key,
            directory,
            orchestrations,
            records,
            throttle: IssuanceThrottle::new(),
            clock,
        }
    }

    /// Mint an assurance token for an entity.
    ///
    /// The entity's tier and verification metadata are read fresh from
    /// the directory. The audience defaults to the calling system.
    pub fn issue_assurance(
        &self,
        caller: &ExternalSystem,
        entity_id: &EntityId,
        audience: Option<Vec<String>>,
    ) -> Result<IssuedToken, TokenError> {
        self.throttle.check_and_count(
            caller.domain.as_str(),
            caller.hourly_issuance_ceiling,
            self.clock.now(),
        )?;

        let entity = self
            .directory
            .get(entity_id)
            .ok_or(TokenError::EntityNotFound(*entity_id))?;

        let now = self.clock.now();
        let claims = TokenClaims {
            token_id: TokenId::new(),
            issuer: self.config.issuer_id.clone(),
            subject: entity.domain.to_string(),
            audience: audience.unwrap_or_else(|| vec![caller.domain.to_string()]),
            issued_at: now,
            not_before: now,
            expires_at: now + assurance_token_ttl(),
            kind: TokenKind::Assurance,
            assurance: Some(AssuranceClaims {
                tier: entity.tier,
                verification_method: entity.verification_method.map(|m| m.as_str().to_string()),
                verified_at: entity.verified_at,
            }),
            orchestration: None,
        };

        self.mint(claims, caller)
    }

    /// Mint an orchestration token asserting an entity's involvement in
    /// one orchestration, optionally in a named role.
    ///
    /// The orchestration must exist and still be active — issuing against
    /// a completed or cancelled orchestration is a conflict.
    pub fn issue_orchestration(
        &self,
        caller: &ExternalSystem,
        entity_id: &EntityId,
        orchestration_id: &OrchestrationId,
        role: Option<String>,
        audience: Option<Vec<String>>,
    ) -> Result<IssuedToken, TokenError> {
        self.throttle.check_and_count(
            caller.domain.as_str(),
            caller.hourly_issuance_ceiling,
            self.clock.now(),
        )?;

        let entity = self
            .directory
            .get(entity_id)
            .ok_or(TokenError::EntityNotFound(*entity_id))?;

        let orchestration = self
            .orchestrations
            .get(orchestration_id)
            .ok_or(TokenError::OrchestrationNotFound(*orchestration_id))?;
        if orchestration.status.is_terminal() {
            return Err(TokenError::OrchestrationTerminal(*orchestration_id));
        }

        let now = self.clock.now();
        let claims = TokenClaims {
            token_id: TokenId::new(),
            issuer: self.config.issuer_id.clone(),
            subject: entity.domain.to_string(),
            audience: audience.unwrap_or_else(|| vec![caller.domain.to_string()]),
            issued_at: now,
            not_before: now,
            expires_at: now + orchestration_token_ttl(),
            kind: TokenKind::Orchestration,
            assurance: None,
            orchestration: Some(OrchestrationClaims {
                orchestration_id: *orchestration_id,
                role,
            }),
        };

        self.mint(claims, caller)
    }

    /// Revoke a token. Idempotent.
    pub fn revoke(&self, token_id: &TokenId, reason: &str) -> Result<IssuedTokenRecord, TokenError> {
        let record = self.records.revoke(token_id, reason, self.clock.now())?;
        tracing::info!(token_id = %token_id, reason, "token revoked");
        Ok(record)
    }

    /// Record one acceptance of the token by a downstream verifier.
    pub fn record_usage(
        &self,
        token_id: &TokenId,
        used_by: &str,
    ) -> Result<IssuedTokenRecord, TokenError> {
        self.records.record_usage(token_id, used_by, self.clock.now())
    }

    /// Sign the claims, persist the issuance record, and package the
    /// result. Shared tail of both issuance paths.
    fn mint(&self, claims: TokenClaims, caller: &ExternalSystem) -> Result<IssuedToken, TokenError> {
        debug_assert!(claims.expires_at > claims.issued_at);

        let now = claims.issued_at;
        let token = SignedToken::sign(
            claims,
            &self.signing_key,
            self.config.verification_method.clone(),
            now,
        )?;
        let token_hash = token.token_hash()?;
        let wire = token.encode()?;
        let claims_snapshot = serde_json::to_value(&token.claims)?;

        let record = IssuedTokenRecord {
            token_id: token.claims.token_id,
            kind: token.claims.kind,
            issuer: token.claims.issuer.clone(),
            subject: token.claims.subject.clone(),
            audience: token.claims.audience.clone(),
            issued_at: token.claims.issued_at,
            not_before: token.claims.not_before,
            expires_at: token.claims.expires_at,
            token_hash: token_hash.to_hex(),
            claims_snapshot,
            usage_count: 0,
            last_used_at: None,
            last_used_by: None,
            revoked: false,
            revocation_reason: None,
            revoked_at: None,
            created_at: now,
            updated_at: now,
        };
        self.records.insert_new(record);

        tracing::info!(
            token_id = %token.claims.token_id,
            kind = %token.claims.kind,
            subject = %token.claims.subject,
            caller = %caller.domain,
            "token issued"
        );

        Ok(IssuedToken {
            token_id: token.claims.token_id,
            token: wire,
            expires_at: token.claims.expires_at,
        })
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("issuer_id", &self.config.issuer_id)
            .field("records", &self.records)
            .finish_non_exhaustive()
    }
}
