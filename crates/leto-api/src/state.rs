//! # Application State
//!
//! [`AppState`] aggregates the in-memory stores, the issuer/validator/
//! evaluator handles, the signing key, and the optional database pool.
//! Everything is explicit configuration threaded through construction —
//! there are no process-lifetime globals, so concurrent tests and
//! multi-tenant deployments never share implicit mutable state.

use std::sync::Arc;

use rand_core::OsRng;
use sqlx::PgPool;

use leto_core::{Clock, SystemClock};
use leto_crypto::{SigningKey, VerifyingKey};
use leto_orchestration::OrchestrationRegistry;
use leto_token::{
    IssuerConfig, TokenIssuer, TokenRecordStore, TokenValidator, ValidationLog,
};
use leto_trust::{EntityDirectory, ExternalSystemRegistry, TierEvaluator};

use crate::auth::SecretString;

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Service bearer token; `None` disables service-level auth.
    pub auth_token: Option<SecretString>,
    /// The registry authority's identity (the `iss` claim of minted
    /// tokens), e.g. `registry.example.com`.
    pub issuer_id: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            issuer_id: "registry.example.com".to_string(),
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub clock: Arc<dyn Clock>,
    pub directory: Arc<EntityDirectory>,
    pub evaluator: TierEvaluator,
    pub systems: Arc<ExternalSystemRegistry>,
    pub orchestrations: Arc<OrchestrationRegistry>,
    pub records: Arc<TokenRecordStore>,
    pub validation_log: Arc<ValidationLog>,
    pub issuer: Arc<TokenIssuer>,
    pub validator: Arc<TokenValidator>,
    pub verifying_key: VerifyingKey,
    /// Whether the signing key was generated at startup rather than
    /// loaded from configuration. Ephemeral keys invalidate all issued
    /// tokens on restart.
    pub key_ephemeral: bool,
    pub db_pool: Option<PgPool>,
}

impl AppState {
    /// Default state: system clock, ephemeral signing key, no database.
    /// Intended for development and tests.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), None)
    }

    /// Build state from configuration and an optional database pool.
    ///
    /// The signing key comes from `LETO_SIGNING_KEY_HEX` when set;
    /// otherwise an ephemeral key is generated and a warning logged.
    pub fn with_config(config: AppConfig, db_pool: Option<PgPool>) -> Self {
        let (signing_key, key_ephemeral) = load_signing_key();
        Self::with_parts(config, signing_key, key_ephemeral, Arc::new(SystemClock), db_pool)
    }

    /// Fully explicit construction, for tests that pin the clock or key.
    pub fn with_parts(
        config: AppConfig,
        signing_key: SigningKey,
        key_ephemeral: bool,
        clock: Arc<dyn Clock>,
        db_pool: Option<PgPool>,
    ) -> Self {
        let signing_key = Arc::new(signing_key);
        let verifying_key = signing_key.verifying_key();

        let directory = Arc::new(EntityDirectory::new());
        let systems = Arc::new(ExternalSystemRegistry::new());
        let orchestrations = Arc::new(OrchestrationRegistry::new());
        let records = Arc::new(TokenRecordStore::new());
        let validation_log = Arc::new(ValidationLog::new());

        let evaluator = TierEvaluator::new(directory.clone(), clock.clone());
        let issuer = Arc::new(TokenIssuer::new(
            IssuerConfig {
                issuer_id: config.issuer_id.clone(),
                verification_method: format!("{}#key-1", config.issuer_id),
            },
            signing_key,
            directory.clone(),
            orchestrations.clone(),
            records.clone(),
            clock.clone(),
        ));
        let validator = Arc::new(TokenValidator::new(
            verifying_key.clone(),
            records.clone(),
            orchestrations.clone(),
            validation_log.clone(),
            clock.clone(),
        ));

        Self {
            config,
            clock,
            directory,
            evaluator,
            systems,
            orchestrations,
            records,
            validation_log,
            issuer,
            validator,
            verifying_key,
            key_ephemeral,
            db_pool,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("issuer_id", &self.config.issuer_id)
            .field("key_ephemeral", &self.key_ephemeral)
            .field("db", &self.db_pool.is_some())
            .finish_non_exhaustive()
    }
}

/// Load the signing key from `LETO_SIGNING_KEY_HEX`, or generate an
/// ephemeral one.
fn load_signing_key() -> (SigningKey, bool) {
    match std::env::var("LETO_SIGNING_KEY_HEX") {
        Ok(hex) => match SigningKey::from_hex(hex.trim()) {
            Ok(key) => (key, false),
            Err(e) => {
                tracing::error!(error = %e, "LETO_SIGNING_KEY_HEX is invalid — generating ephemeral key");
                (SigningKey::generate(&mut OsRng), true)
            }
        },
        Err(_) => {
            tracing::warn!(
                "LETO_SIGNING_KEY_HEX not set — using an ephemeral signing key. \
                 Tokens will not survive restarts."
            );
            (SigningKey::generate(&mut OsRng), true)
        }
    }
}
