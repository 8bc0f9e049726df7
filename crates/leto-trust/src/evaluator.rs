//! # Tier Evaluator
//!
//! Decides and applies tier transitions:
//!
//! - [`TierEvaluator::evaluate`] turns validated evidence into a
//!   [`TierDecision`] without touching entity state.
//! - [`TierEvaluator::apply_evidence`] applies a decision to one entity
//!   under its entry lock, enforcing the transition rules.
//! - [`TierEvaluator::run_sweep`] is the periodic batch job that downgrades
//!   Tier-2 entities whose reverification deadline lapsed. Entities are
//!   processed independently; one failure never aborts the sweep, and
//!   re-running it is a no-op for entities already at Tier 3.
//!
//! Transition rules: upward transitions happen only on explicit,
//! validated evidence; the automatic Tier 2 → 3 downgrade is the sole
//! other path. Evidence that would silently lower a tier is rejected.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use leto_core::{Clock, EntityId};

use crate::entity::{EntityDirectory, LegalEntity};
use crate::error::TrustError;
use crate::evidence::VerificationEvidence;
use crate::tier::{Tier, VerificationMethod};

/// How long a Tier-2 domain proof remains valid.
pub fn reverification_window() -> Duration {
    Duration::days(90)
}

/// The outcome of evaluating verification evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierDecision {
    pub tier: Tier,
    pub method: VerificationMethod,
    pub verified_at: DateTime<Utc>,
    /// Tier 2 only: `verified_at + 90 days`.
    pub reverification_due: Option<DateTime<Utc>>,
}

/// Result of one downgrade sweep run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    /// Live entities examined.
    pub examined: usize,
    /// Entities downgraded Tier 2 → Tier 3 this run.
    pub downgraded: Vec<EntityId>,
    /// Per-entity failures, isolated from the rest of the run.
    pub failed: Vec<SweepFailure>,
}

/// One isolated per-entity sweep failure.
#[derive(Debug, Clone, Serialize)]
pub struct SweepFailure {
    pub entity_id: EntityId,
    pub reason: String,
}

/// Computes and transitions entity authentication tiers.
#[derive(Clone)]
pub struct TierEvaluator {
    directory: Arc<EntityDirectory>,
    clock: Arc<dyn Clock>,
}

impl TierEvaluator {
    /// Create an evaluator over the given directory and clock.
    pub fn new(directory: Arc<EntityDirectory>, clock: Arc<dyn Clock>) -> Self {
        Self { directory, clock }
    }

    /// Evaluate evidence into a tier decision without mutating anything.
    ///
    /// Malformed evidence is rejected here; callers surface the error and
    /// the entity's tier is unchanged.
    pub fn evaluate(&self, evidence: &VerificationEvidence) -> Result<TierDecision, TrustError> {
        evidence.validate()?;
        let method = evidence.method();
        let verified_at = self.clock.now();
        let reverification_due = method
            .tier()
            .requires_reverification()
            .then(|| verified_at + reverification_window());
        Ok(TierDecision {
            tier: method.tier(),
            method,
            verified_at,
            reverification_due,
        })
    }

    /// Validate evidence and apply the resulting transition to an entity.
    ///
    /// DNS evidence must name the entity's own domain. A transition that
    /// would lower the tier (submitting Tier-3 evidence while at Tier 1
    /// or 2) is rejected — downgrades only happen through the sweep.
    /// Re-proving the current tier is a renewal: it refreshes
    /// `verified_at` and, for Tier 2, resets the 90-day deadline.
    pub fn apply_evidence(
        &self,
        entity_id: &EntityId,
        evidence: &VerificationEvidence,
    ) -> Result<LegalEntity, TrustError> {
        let decision = self.evaluate(evidence)?;
        let now = self.clock.now();
        self.directory.update(entity_id, now, |entity| {
            if let Some(evidence_domain) = evidence.domain() {
                if evidence_domain != entity.domain.as_str() {
                    return Err(TrustError::EvidenceDomainMismatch {
                        entity_domain: entity.domain.to_string(),
                        evidence_domain: evidence_domain.to_string(),
                    });
                }
            }
            if decision.tier.rank() > entity.tier.rank() {
                return Err(TrustError::TransitionNotAllowed {
                    from: entity.tier,
                    to: decision.tier,
                });
            }
            entity.tier = decision.tier;
            entity.verification_method = Some(decision.method);
            entity.verified_at = Some(decision.verified_at);
            entity.reverification_due = decision.reverification_due;
            Ok(())
        })
    }

    /// Downgrade one entity if its Tier-2 deadline has lapsed.
    ///
    /// Returns the updated record if a downgrade happened, `None` if the
    /// entity needed no change. Re-evaluating an already-Tier-3 entity is
    /// a no-op, which makes the sweep idempotent.
    pub fn downgrade(&self, entity_id: &EntityId) -> Result<Option<LegalEntity>, TrustError> {
        let now = self.clock.now();
        let mut downgraded = false;
        let record = self.directory.update(entity_id, now, |entity| {
            if entity.tier == Tier::Tier2 {
                match entity.reverification_due {
                    Some(due) if now > due => {
                        entity.tier = Tier::Tier3;
                        entity.reverification_due = None;
                        downgraded = true;
                    }
                    _ => {}
                }
            }
            Ok(())
        })?;
        Ok(downgraded.then_some(record))
    }

    /// Run the downgrade sweep over every live entity.
    ///
    /// Per-entity failures are logged and recorded in the report; they do
    /// not stop the sweep.
    pub fn run_sweep(&self) -> SweepReport {
        let ids = self.directory.ids();
        let mut report = SweepReport {
            examined: ids.len(),
            ..SweepReport::default()
        };
        for id in ids {
            match self.downgrade(&id) {
                Ok(Some(entity)) => {
                    tracing::info!(
                        entity_id = %id,
                        domain = %entity.domain,
                        "reverification deadline lapsed, downgraded to tier 3"
                    );
                    report.downgraded.push(id);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(entity_id = %id, error = %e, "sweep failed for entity, continuing");
                    report.failed.push(SweepFailure {
                        entity_id: id,
                        reason: e.to_string(),
                    });
                }
            }
        }
        tracing::debug!(
            examined = report.examined,
            downgraded = report.downgraded.len(),
            failed = report.failed.len(),
            "downgrade sweep complete"
        );
        report
    }
}

impl std::fmt::Debug for TierEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TierEvaluator")
            .field("directory", &self.directory)
            .finish_non_exhaustive()
    }
}
