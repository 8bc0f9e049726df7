//! # Issuance Records
//!
//! The audit record persisted for every minted token. Holds the token
//! hash (never the raw token), an immutable claims snapshot, the usage
//! counter, and the revocation flag.
//!
//! Mutations run under the record's `DashMap` entry lock, so a concurrent
//! `revoke` and `record_usage` on the same token serialize — neither
//! update is lost. Revocation is monotonic: there is no API that clears
//! the flag.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use leto_core::TokenId;

use crate::claims::TokenKind;
use crate::error::TokenError;

/// Audit record of one minted token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedTokenRecord {
    pub token_id: TokenId,
    pub kind: TokenKind,
    pub issuer: String,
    /// Entity domain the token speaks for.
    pub subject: String,
    pub audience: Vec<String>,
    pub issued_at: DateTime<Utc>,
    pub not_before: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// SHA-256 hex of the canonical signed token.
    pub token_hash: String,
    /// Immutable copy of the claims at mint time.
    pub claims_snapshot: serde_json::Value,
    pub usage_count: u64,
    pub last_used_at: Option<DateTime<Utc>>,
    pub last_used_by: Option<String>,
    /// Monotonic: once set, never cleared.
    pub revoked: bool,
    pub revocation_reason: Option<String>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IssuedTokenRecord {
    /// Constant-time comparison of a presented token hash against the
    /// recorded one.
    pub fn hash_matches(&self, presented_hex: &str) -> bool {
        self.token_hash
            .as_bytes()
            .ct_eq(presented_hex.as_bytes())
            .into()
    }
}

/// In-memory store of issuance records, keyed by token id.
pub struct TokenRecordStore {
    records: DashMap<TokenId, IssuedTokenRecord>,
}

impl TokenRecordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Persist the record for a freshly minted token.
    pub fn insert_new(&self, record: IssuedTokenRecord) {
        self.records.insert(record.token_id, record);
    }

    /// Fetch a record by token id.
    pub fn get(&self, token_id: &TokenId) -> Option<IssuedTokenRecord> {
        self.records.get(token_id).map(|r| r.value().clone())
    }

    /// Revoke a token. Idempotent: revoking an already-revoked token is a
    /// no-op that returns the existing record, not an error.
    pub fn revoke(
        &self,
        token_id: &TokenId,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedTokenRecord, TokenError> {
        let mut entry = self
            .records
            .get_mut(token_id)
            .ok_or(TokenError::RecordNotFound(*token_id))?;
        let record = entry.value_mut();
        if !record.revoked {
            record.revoked = true;
            record.revocation_reason = Some(reason.to_string());
            record.revoked_at = Some(now);
            record.updated_at = now;
        }
        Ok(record.clone())
    }

    /// Count one acceptance of the token by a downstream verifier.
    pub fn record_usage(
        &self,
        token_id: &TokenId,
        used_by: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedTokenRecord, TokenError> {
        let mut entry = self
            .records
            .get_mut(token_id)
            .ok_or(TokenError::RecordNotFound(*token_id))?;
        let record = entry.value_mut();
        record.usage_count += 1;
        record.last_used_at = Some(now);
        record.last_used_by = Some(used_by.to_string());
        record.updated_at = now;
        Ok(record.clone())
    }

    /// List all records.
    pub fn list(&self) -> Vec<IssuedTokenRecord> {
        self.records.iter().map(|r| r.value().clone()).collect()
    }

    /// Insert a record directly (used for hydration from the database).
    pub fn insert(&self, record: IssuedTokenRecord) {
        self.records.insert(record.token_id, record);
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` when the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for TokenRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TokenRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRecordStore")
            .field("record_count", &self.records.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> IssuedTokenRecord {
        let now = Utc::now();
        IssuedTokenRecord {
            token_id: TokenId::new(),
            kind: TokenKind::Assurance,
            issuer: "registry.example.com".to_string(),
            subject: "carrier.example.com".to_string(),
            audience: vec!["booking.example.com".to_string()],
            issued_at: now,
            not_before: now,
            expires_at: now + chrono::Duration::hours(24),
            token_hash: "ab".repeat(32),
            claims_snapshot: serde_json::json!({"sub": "carrier.example.com"}),
            usage_count: 0,
            last_used_at: None,
            last_used_by: None,
            revoked: false,
            revocation_reason: None,
            revoked_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn revoke_sets_flag_and_reason() {
        let store = TokenRecordStore::new();
        let record = sample_record();
        let id = record.token_id;
        store.insert_new(record);

        let revoked = store.revoke(&id, "key compromise", Utc::now()).unwrap();
        assert!(revoked.revoked);
        assert_eq!(revoked.revocation_reason.as_deref(), Some("key compromise"));
        assert!(revoked.revoked_at.is_some());
    }

    #[test]
    fn revoke_is_idempotent() {
        let store = TokenRecordStore::new();
        let record = sample_record();
        let id = record.token_id;
        store.insert_new(record);

        let first = store.revoke(&id, "key compromise", Utc::now()).unwrap();
        let second = store
            .revoke(&id, "a different reason", Utc::now())
            .unwrap();

        // The original revocation metadata is preserved.
        assert!(second.revoked);
        assert_eq!(second.revocation_reason, first.revocation_reason);
        assert_eq!(second.revoked_at, first.revoked_at);
    }

    #[test]
    fn revoke_missing_record_errors() {
        let store = TokenRecordStore::new();
        let err = store
            .revoke(&TokenId::new(), "whatever", Utc::now())
            .unwrap_err();
        assert!(matches!(err, TokenError::RecordNotFound(_)));
    }

    #[test]
    fn record_usage_increments_and_stamps() {
        let store = TokenRecordStore::new();
        let record = sample_record();
        let id = record.token_id;
        store.insert_new(record);

        store.record_usage(&id, "booking.example.com", Utc::now()).unwrap();
        let updated = store
            .record_usage(&id, "customs.example.com", Utc::now())
            .unwrap();

        assert_eq!(updated.usage_count, 2);
        assert_eq!(updated.last_used_by.as_deref(), Some("customs.example.com"));
        assert!(updated.last_used_at.is_some());
    }

    #[test]
    fn usage_on_revoked_token_still_counts_but_flag_stays() {
        let store = TokenRecordStore::new();
        let record = sample_record();
        let id = record.token_id;
        store.insert_new(record);

        store.revoke(&id, "compromise", Utc::now()).unwrap();
        let after_usage = store
            .record_usage(&id, "booking.example.com", Utc::now())
            .unwrap();
        assert!(after_usage.revoked, "revocation is monotonic");
        assert_eq!(after_usage.usage_count, 1);
    }

    #[test]
    fn concurrent_revoke_and_usage_lose_neither() {
        use std::sync::Arc;

        let store = Arc::new(TokenRecordStore::new());
        let record = sample_record();
        let id = record.token_id;
        store.insert_new(record);

        let revoker = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || store.revoke(&id, "compromise", Utc::now()).unwrap())
        };
        let users: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store
                        .record_usage(&id, "booking.example.com", Utc::now())
                        .unwrap()
                })
            })
            .collect();

        revoker.join().unwrap();
        for user in users {
            user.join().unwrap();
        }

        let final_state = store.get(&id).unwrap();
        assert!(final_state.revoked);
        assert_eq!(final_state.usage_count, 4);
    }

    #[test]
    fn hash_matches_compares_exactly() {
        let record = sample_record();
        assert!(record.hash_matches(&"ab".repeat(32)));
        assert!(!record.hash_matches(&"ac".repeat(32)));
        assert!(!record.hash_matches("short"));
    }
}
