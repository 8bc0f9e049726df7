//! # Trust Error Types

use leto_core::EntityId;
use thiserror::Error;

use crate::external::AllowedOperation;
use crate::tier::Tier;

/// Errors from trust-model operations.
#[derive(Error, Debug)]
pub enum TrustError {
    /// Entity not found (or soft-deleted).
    #[error("legal entity not found: {0}")]
    EntityNotFound(EntityId),

    /// Another entity is already registered for the domain.
    #[error("domain already registered: {0}")]
    DomainInUse(String),

    /// Verification evidence failed local validation.
    #[error("invalid verification evidence: {0}")]
    InvalidEvidence(String),

    /// The evidence does not apply to the entity it was submitted for.
    #[error("evidence domain mismatch: evidence is for {evidence_domain}, entity is {entity_domain}")]
    EvidenceDomainMismatch {
        entity_domain: String,
        evidence_domain: String,
    },

    /// The requested tier transition is not permitted by the state machine.
    #[error("tier transition not allowed: {from} -> {to}")]
    TransitionNotAllowed { from: Tier, to: Tier },

    /// Calling system is not registered.
    #[error("external system not registered: {0}")]
    SystemNotRegistered(String),

    /// Calling system is registered but not approved or no longer active.
    #[error("external system not approved or revoked: {0}")]
    SystemNotApproved(String),

    /// Calling system lacks the requested operation.
    #[error("external system {domain} is not permitted to {operation}")]
    OperationNotPermitted {
        domain: String,
        operation: AllowedOperation,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_display_names_tiers() {
        let err = TrustError::TransitionNotAllowed {
            from: Tier::Tier1,
            to: Tier::Tier3,
        };
        let msg = format!("{err}");
        assert!(msg.contains("tier1"));
        assert!(msg.contains("tier3"));
    }

    #[test]
    fn operation_display_names_operation() {
        let err = TrustError::OperationNotPermitted {
            domain: "booking.example.com".to_string(),
            operation: AllowedOperation::Issue,
        };
        assert!(format!("{err}").contains("issue"));
    }
}
