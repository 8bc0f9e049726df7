// SPDX-License-Identifier: Apache-2.0
//! # Orchestration Registry
//!
//! In-memory orchestration lifecycle manager backed by `DashMap`.
//!
//! Participants are embedded in their orchestration record, so the
//! duplicate-role check and the insert run under a single entry write
//! lock: concurrent declarations of the same (orchestration, domain,
//! role) triple see exactly one success and one conflict.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use thiserror::Error;

use leto_core::{BusinessKeys, DomainName, OrchestrationId, ParticipantId};

use crate::orchestration::{
    Orchestration, OrchestrationStatus, Participant, ParticipantStatus,
};

/// Maximum length of a participant role label.
const MAX_ROLE_LEN: usize = 64;

/// Errors from orchestration registry operations.
#[derive(Error, Debug)]
pub enum OrchestrationError {
    /// Orchestration not found.
    #[error("orchestration not found: {0}")]
    NotFound(OrchestrationId),

    /// Participant not found.
    #[error("participant not found: {0}")]
    ParticipantNotFound(ParticipantId),

    /// An active participant already holds the (domain, role) pair.
    #[error("duplicate active role: {domain} already holds role {role:?} in this orchestration")]
    DuplicateRole { domain: String, role: String },

    /// The orchestration is completed or cancelled.
    #[error("orchestration {id} is terminal ({status}); no further changes permitted")]
    Terminal {
        id: OrchestrationId,
        status: OrchestrationStatus,
    },

    /// The requested status change is not a permitted transition.
    #[error("invalid status transition: {from} -> {to}")]
    InvalidStatusTransition {
        from: OrchestrationStatus,
        to: OrchestrationStatus,
    },

    /// Input failed boundary validation.
    #[error("validation failed: {0}")]
    Validation(String),
}

/// In-memory orchestration registry.
///
/// Thread-safe via `DashMap`. A secondary participant index maps
/// participant ids to their orchestration for `remove_participant`.
pub struct OrchestrationRegistry {
    orchestrations: DashMap<OrchestrationId, Orchestration>,
    participant_index: DashMap<ParticipantId, OrchestrationId>,
}

impl OrchestrationRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            orchestrations: DashMap::new(),
            participant_index: DashMap::new(),
        }
    }

    /// Register a new orchestration with status `active`.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        &self,
        order_reference: String,
        orchestrator_domain: DomainName,
        orchestrator_name: String,
        customer_domain: DomainName,
        customer_name: String,
        business_keys: BusinessKeys,
        orchestration_type: String,
        now: DateTime<Utc>,
    ) -> Result<Orchestration, OrchestrationError> {
        if order_reference.trim().is_empty() {
            return Err(OrchestrationError::Validation(
                "order_reference must not be empty".to_string(),
            ));
        }
        if orchestration_type.trim().is_empty() {
            return Err(OrchestrationError::Validation(
                "orchestration_type must not be empty".to_string(),
            ));
        }
        let record = Orchestration {
            id: OrchestrationId::new(),
            order_reference,
            orchestrator_domain,
            orchestrator_name,
            customer_domain,
            customer_name,
            business_keys,
            status: OrchestrationStatus::Active,
            orchestration_type,
            participants: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.orchestrations.insert(record.id, record.clone());
        Ok(record)
    }

    /// Declare a participant's role in an orchestration.
    ///
    /// Atomically rejects the declaration when an active participant with
    /// the same (domain, role) already exists, or when the orchestration
    /// is terminal.
    pub fn add_participant(
        &self,
        orchestration_id: OrchestrationId,
        domain: DomainName,
        name: String,
        role: String,
        authorized_by: DomainName,
        now: DateTime<Utc>,
    ) -> Result<Participant, OrchestrationError> {
        let role = role.trim().to_string();
        if role.is_empty() {
            return Err(OrchestrationError::Validation(
                "role must not be empty".to_string(),
            ));
        }
        if role.len() > MAX_ROLE_LEN {
            return Err(OrchestrationError::Validation(format!(
                "role exceeds {MAX_ROLE_LEN} characters"
            )));
        }

        let mut entry = self
            .orchestrations
            .get_mut(&orchestration_id)
            .ok_or(OrchestrationError::NotFound(orchestration_id))?;
        let orchestration = entry.value_mut();

        if orchestration.status.is_terminal() {
            return Err(OrchestrationError::Terminal {
                id: orchestration_id,
                status: orchestration.status,
            });
        }
        if orchestration.has_active_role(domain.as_str(), &role) {
            return Err(OrchestrationError::DuplicateRole {
                domain: domain.to_string(),
                role,
            });
        }

        let participant = Participant {
            id: ParticipantId::new(),
            orchestration_id,
            domain,
            name,
            role,
            authorized_by,
            authorized_at: now,
            status: ParticipantStatus::Active,
            updated_at: now,
        };
        orchestration.participants.push(participant.clone());
        orchestration.updated_at = now;
        self.participant_index
            .insert(participant.id, orchestration_id);
        Ok(participant)
    }

    /// Soft-remove a participant: status becomes `removed`, the row stays.
    pub fn remove_participant(
        &self,
        participant_id: ParticipantId,
        now: DateTime<Utc>,
    ) -> Result<Participant, OrchestrationError> {
        self.set_participant_status(participant_id, ParticipantStatus::Removed, now)
    }

    /// Mark a participant's involvement as completed.
    pub fn complete_participant(
        &self,
        participant_id: ParticipantId,
        now: DateTime<Utc>,
    ) -> Result<Participant, OrchestrationError> {
        self.set_participant_status(participant_id, ParticipantStatus::Completed, now)
    }

    fn set_participant_status(
        &self,
        participant_id: ParticipantId,
        status: ParticipantStatus,
        now: DateTime<Utc>,
    ) -> Result<Participant, OrchestrationError> {
        let orchestration_id = *self
            .participant_index
            .get(&participant_id)
            .ok_or(OrchestrationError::ParticipantNotFound(participant_id))?;

        let mut entry = self
            .orchestrations
            .get_mut(&orchestration_id)
            .ok_or(OrchestrationError::NotFound(orchestration_id))?;
        let orchestration = entry.value_mut();

        if orchestration.status.is_terminal() {
            return Err(OrchestrationError::Terminal {
                id: orchestration_id,
                status: orchestration.status,
            });
        }

        let participant = orchestration
            .participants
            .iter_mut()
            .find(|p| p.id == participant_id)
            .ok_or(OrchestrationError::ParticipantNotFound(participant_id))?;
        participant.status = status;
        participant.updated_at = now;
        let updated = participant.clone();
        orchestration.updated_at = now;
        Ok(updated)
    }

    /// Transition an orchestration to `completed` or `cancelled`.
    ///
    /// Both targets are terminal; only `active` orchestrations may
    /// transition, and `active` is not a valid target.
    pub fn set_status(
        &self,
        orchestration_id: OrchestrationId,
        status: OrchestrationStatus,
        now: DateTime<Utc>,
    ) -> Result<Orchestration, OrchestrationError> {
        let mut entry = self
            .orchestrations
            .get_mut(&orchestration_id)
            .ok_or(OrchestrationError::NotFound(orchestration_id))?;
        let orchestration = entry.value_mut();

        if orchestration.status.is_terminal() {
            return Err(OrchestrationError::Terminal {
                id: orchestration_id,
                status: orchestration.status,
            });
        }
        if !status.is_terminal() {
            return Err(OrchestrationError::InvalidStatusTransition {
                from: orchestration.status,
                to: status,
            });
        }

        orchestration.status = status;
        orchestration.updated_at = now;
        tracing::info!(
            orchestration_id = %orchestration_id,
            status = %status,
            "orchestration closed"
        );
        Ok(orchestration.clone())
    }

    /// Get an orchestration by id.
    pub fn get(&self, id: &OrchestrationId) -> Option<Orchestration> {
        self.orchestrations.get(id).map(|o| o.value().clone())
    }

    /// The active participant matching (orchestration, domain) and
    /// optionally a role. Read-only; used by the token validator.
    pub fn find_active_participant(
        &self,
        orchestration_id: &OrchestrationId,
        domain: &str,
        role: Option<&str>,
    ) -> Option<Participant> {
        self.orchestrations.get(orchestration_id).and_then(|o| {
            o.value()
                .find_active_participant(domain, role)
                .cloned()
        })
    }

    /// List all orchestrations.
    pub fn list(&self) -> Vec<Orchestration> {
        self.orchestrations
            .iter()
            .map(|o| o.value().clone())
            .collect()
    }

    /// Insert a record directly (used for hydration from the database).
    /// Rebuilds the participant index for the record.
    pub fn insert(&self, record: Orchestration) {
        for participant in &record.participants {
            self.participant_index.insert(participant.id, record.id);
        }
        self.orchestrations.insert(record.id, record);
    }

    /// Number of orchestrations.
    pub fn len(&self) -> usize {
        self.orchestrations.len()
    }

    /// Returns `true` when the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.orchestrations.is_empty()
    }
}

impl Default for OrchestrationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OrchestrationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrchestrationRegistry")
            .field("orchestration_count", &self.orchestrations.len())
            .finish()
    }
}
