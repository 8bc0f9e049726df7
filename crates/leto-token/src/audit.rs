//! # Validation Audit Log
//!
//! Append-only record of every orchestration-token validation attempt.
//! Entries are immutable after append and carry a monotonic sequence
//! number; the log never drops an attempt, so the entry count equals the
//! number of validation calls.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use leto_core::{OrchestrationId, TokenId};

/// Result taxonomy of a validation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationResultCode {
    /// Token verified and the subject is an active participant.
    Valid,
    /// Token malformed, or the subject is not an active participant.
    Invalid,
    /// Presented outside the `[not_before, expires_at]` window.
    Expired,
    /// The issuance record is revoked.
    Revoked,
    /// No issuance record exists for the token id.
    NotFound,
    /// The Ed25519 proof did not verify.
    SignatureInvalid,
}

impl ValidationResultCode {
    /// Stable string form used in persistence.
    pub fn as_str(self) -> &'static str {
        match self {
            ValidationResultCode::Valid => "valid",
            ValidationResultCode::Invalid => "invalid",
            ValidationResultCode::Expired => "expired",
            ValidationResultCode::Revoked => "revoked",
            ValidationResultCode::NotFound => "not_found",
            ValidationResultCode::SignatureInvalid => "signature_invalid",
        }
    }

    /// Parse the stable string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "valid" => Some(ValidationResultCode::Valid),
            "invalid" => Some(ValidationResultCode::Invalid),
            "expired" => Some(ValidationResultCode::Expired),
            "revoked" => Some(ValidationResultCode::Revoked),
            "not_found" => Some(ValidationResultCode::NotFound),
            "signature_invalid" => Some(ValidationResultCode::SignatureInvalid),
            _ => None,
        }
    }

    /// Only `valid` means the business check passed.
    pub fn is_valid(self) -> bool {
        matches!(self, ValidationResultCode::Valid)
    }
}

impl std::fmt::Display for ValidationResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable record of one validation attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationLogEntry {
    /// Stable entry identifier (persistence primary key).
    pub entry_id: Uuid,
    /// Monotonic position in the log, assigned at append.
    pub sequence: u64,
    /// The orchestration referenced by the token; `None` when the token
    /// was malformed or carried no orchestration claim.
    pub orchestration_id: Option<OrchestrationId>,
    /// Token fields as presented (not trusted).
    pub token_id: Option<TokenId>,
    pub token_issuer: Option<String>,
    pub token_subject: Option<String>,
    /// Caller that requested the validation.
    pub requester: String,
    pub requested_at: DateTime<Utc>,
    pub result: ValidationResultCode,
    pub valid: bool,
    /// Human-readable reason for the result.
    pub reason: String,
    /// The core business outcome: was the subject found among the
    /// orchestration's active participants.
    pub member_found_in_orchestration: bool,
    pub member_role: Option<String>,
    pub signature_valid: bool,
    pub token_expired: bool,
    /// Wall-clock duration of the whole check.
    pub duration_micros: u64,
}

/// Append-only, in-memory validation log.
pub struct ValidationLog {
    entries: RwLock<Vec<ValidationLogEntry>>,
}

/// Everything of a [`ValidationLogEntry`] except what the log assigns.
#[derive(Debug, Clone)]
pub struct ValidationLogDraft {
    pub orchestration_id: Option<OrchestrationId>,
    pub token_id: Option<TokenId>,
    pub token_issuer: Option<String>,
    pub token_subject: Option<String>,
    pub requester: String,
    pub requested_at: DateTime<Utc>,
    pub result: ValidationResultCode,
    pub reason: String,
    pub member_found_in_orchestration: bool,
    pub member_role: Option<String>,
    pub signature_valid: bool,
    pub token_expired: bool,
    pub duration_micros: u64,
}

impl ValidationLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Append one attempt. Assigns the entry id and sequence; the append
    /// and sequence assignment are atomic under the write lock.
    pub fn append(&self, draft: ValidationLogDraft) -> ValidationLogEntry {
        let mut entries = self.entries.write();
        let entry = ValidationLogEntry {
            entry_id: Uuid::new_v4(),
            sequence: entries.len() as u64,
            orchestration_id: draft.orchestration_id,
            token_id: draft.token_id,
            token_issuer: draft.token_issuer,
            token_subject: draft.token_subject,
            requester: draft.requester,
            requested_at: draft.requested_at,
            result: draft.result,
            valid: draft.result.is_valid(),
            reason: draft.reason,
            member_found_in_orchestration: draft.member_found_in_orchestration,
            member_role: draft.member_role,
            signature_valid: draft.signature_valid,
            token_expired: draft.token_expired,
            duration_micros: draft.duration_micros,
        };
        entries.push(entry.clone());
        entry
    }

    /// Total number of entries (== validation attempts).
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` when no attempts have been logged.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Copy of the full log, in append order.
    pub fn snapshot(&self) -> Vec<ValidationLogEntry> {
        self.entries.read().clone()
    }

    /// Entries referencing an orchestration.
    pub fn for_orchestration(&self, id: &OrchestrationId) -> Vec<ValidationLogEntry> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.orchestration_id.as_ref() == Some(id))
            .cloned()
            .collect()
    }

    /// Entries referencing a token.
    pub fn for_token(&self, id: &TokenId) -> Vec<ValidationLogEntry> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.token_id.as_ref() == Some(id))
            .cloned()
            .collect()
    }

    /// Fetch one entry by its stable id.
    pub fn get_by_entry_id(&self, entry_id: &Uuid) -> Option<ValidationLogEntry> {
        self.entries
            .read()
            .iter()
            .find(|e| e.entry_id == *entry_id)
            .cloned()
    }

    /// Entries with a given result code.
    pub fn with_result(&self, result: ValidationResultCode) -> Vec<ValidationLogEntry> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.result == result)
            .cloned()
            .collect()
    }

    /// Insert a persisted entry directly (used for hydration from the
    /// database). Entries must arrive in sequence order.
    pub fn insert(&self, entry: ValidationLogEntry) {
        self.entries.write().push(entry);
    }
}

impl Default for ValidationLog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ValidationLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationLog")
            .field("entry_count", &self.len())
            .finish()
    }
}
