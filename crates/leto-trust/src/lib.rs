//! # leto-trust — Legal-Entity Trust Model
//!
//! Implements the three-tier authentication model for registered
//! organizations:
//!
//! - **Tier 1** — verified through the national eID scheme (eHerkenning).
//!   Strongest; no expiry.
//! - **Tier 2** — DNS domain-ownership proof. Expires 90 days after
//!   verification and must be re-proved.
//! - **Tier 3** — email address plus a national company-registry number.
//!   The default at registration; weakest trust weight, no expiry.
//!
//! Upward transitions require an explicit verification event carrying
//! validated evidence. The only automatic transition is the Tier 2 → 3
//! downgrade performed by the periodic sweep when a reverification
//! deadline lapses without renewal.
//!
//! The crate also carries the external-system registry: the set of callers
//! authorized to request token issuance, validation, or lookups.

pub mod entity;
pub mod error;
pub mod evaluator;
pub mod evidence;
pub mod external;
pub mod tier;

// Re-export primary types.
pub use entity::{EntityDirectory, LegalEntity};
pub use error::TrustError;
pub use evaluator::{reverification_window, SweepReport, TierDecision, TierEvaluator};
pub use evidence::VerificationEvidence;
pub use external::{
    AllowedOperation, ExternalSystem, ExternalSystemRegistry, DEFAULT_HOURLY_ISSUANCE_CEILING,
};
pub use tier::{Tier, VerificationMethod};
