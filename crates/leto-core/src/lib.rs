//! # leto-core — Foundational Types for the LETO Stack
//!
//! This crate provides the building blocks shared by every other crate in
//! the workspace:
//!
//! - **Canonical serialization** ([`CanonicalBytes`]) — deterministic,
//!   sorted-key JSON bytes used as the only sanctioned signing and
//!   digest input.
//! - **Content digests** ([`ContentDigest`], [`sha256_digest`]) — SHA-256
//!   over canonical bytes.
//! - **Identifier newtypes** ([`EntityId`], [`TokenId`], [`OrchestrationId`],
//!   [`ParticipantId`]) — distinct types per identifier kind.
//! - **Domain names** ([`DomainName`]) — validated at construction.
//! - **Injected clock** ([`Clock`]) — every timestamp comparison in the
//!   workspace goes through a clock handle so tests can simulate expiry
//!   and reverification boundaries deterministically.
//! - **Business keys** ([`BusinessKeys`]) — a flat, namespace-validated
//!   string map for orchestration business references.

pub mod canonical;
pub mod error;
pub mod id;
pub mod keys;
pub mod time;

// Re-export primary types.
pub use canonical::{sha256_digest, CanonicalBytes, CanonicalizationError, ContentDigest};
pub use error::ValidationError;
pub use id::{DomainName, EntityId, OrchestrationId, ParticipantId, TokenId};
pub use keys::BusinessKeys;
pub use time::{Clock, ManualClock, SystemClock};
