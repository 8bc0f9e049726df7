//! # leto-token — Signed Claims Tokens
//!
//! Issuance and validation of the two token classes of the LETO Stack:
//!
//! - **Assurance tokens** assert an entity's current authentication tier —
//!   "can this entity be trusted".
//! - **Orchestration tokens** assert an entity's involvement in one
//!   multi-party business transaction — "is this entity part of this
//!   orchestration".
//!
//! Both are JSON envelopes carrying a claims body and an Ed25519 proof
//! computed over the canonical bytes of the claims. The issuer persists an
//! issuance record holding a SHA-256 hash of the signed token — never the
//! token itself — plus an immutable claims snapshot, a usage counter, and
//! the monotonic revocation flag.
//!
//! The validator runs the ordered verification pipeline (parse → signature
//! → time window → issuance record/revocation → registry membership) and
//! appends exactly one entry to the validation log per attempt.

pub mod audit;
pub mod claims;
pub mod envelope;
pub mod error;
pub mod issuer;
pub mod record;
pub mod throttle;
pub mod validator;

// Re-export primary types.
pub use audit::{ValidationLog, ValidationLogDraft, ValidationLogEntry, ValidationResultCode};
pub use claims::{AssuranceClaims, OrchestrationClaims, TokenClaims, TokenKind};
pub use envelope::{SignedToken, TokenProof};
pub use error::TokenError;
pub use issuer::{
    assurance_token_ttl, orchestration_token_ttl, IssuedToken, IssuerConfig, TokenIssuer,
};
pub use record::{IssuedTokenRecord, TokenRecordStore};
pub use throttle::IssuanceThrottle;
pub use validator::{TokenValidator, ValidationExpectations, ValidationOutcome};
