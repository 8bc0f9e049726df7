// SPDX-License-Identifier: Apache-2.0
//! # Orchestration and Participant Records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use leto_core::{BusinessKeys, DomainName, OrchestrationId, ParticipantId};

/// Lifecycle status of an orchestration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestrationStatus {
    Active,
    Completed,
    Cancelled,
}

impl OrchestrationStatus {
    /// Completed and cancelled orchestrations accept no further changes.
    pub fn is_terminal(self) -> bool {
        !matches!(self, OrchestrationStatus::Active)
    }

    /// Stable string form used in persistence.
    pub fn as_str(self) -> &'static str {
        match self {
            OrchestrationStatus::Active => "active",
            OrchestrationStatus::Completed => "completed",
            OrchestrationStatus::Cancelled => "cancelled",
        }
    }

    /// Parse the stable string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(OrchestrationStatus::Active),
            "completed" => Some(OrchestrationStatus::Completed),
            "cancelled" => Some(OrchestrationStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrchestrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of one declared participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantStatus {
    Active,
    Removed,
    Completed,
}

impl ParticipantStatus {
    /// Stable string form used in persistence.
    pub fn as_str(self) -> &'static str {
        match self {
            ParticipantStatus::Active => "active",
            ParticipantStatus::Removed => "removed",
            ParticipantStatus::Completed => "completed",
        }
    }

    /// Parse the stable string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(ParticipantStatus::Active),
            "removed" => Some(ParticipantStatus::Removed),
            "completed" => Some(ParticipantStatus::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entity's declared role within one orchestration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub orchestration_id: OrchestrationId,
    pub domain: DomainName,
    /// Registered display name.
    pub name: String,
    /// Free-text role label, e.g. "Carrier".
    pub role: String,
    /// Who declared this participant (caller domain).
    pub authorized_by: DomainName,
    pub authorized_at: DateTime<Utc>,
    pub status: ParticipantStatus,
    pub updated_at: DateTime<Utc>,
}

/// One multi-party business transaction instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Orchestration {
    pub id: OrchestrationId,
    /// The orchestrating system's internal order identifier.
    pub order_reference: String,
    pub orchestrator_domain: DomainName,
    pub orchestrator_name: String,
    pub customer_domain: DomainName,
    pub customer_name: String,
    /// Business references, e.g. `bill_of_lading` → document number.
    pub business_keys: BusinessKeys,
    pub status: OrchestrationStatus,
    /// Orchestration type tag, e.g. "shipment".
    pub orchestration_type: String,
    pub participants: Vec<Participant>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Orchestration {
    /// The active participant for `domain`, optionally constrained to a
    /// specific role.
    pub fn find_active_participant(
        &self,
        domain: &str,
        role: Option<&str>,
    ) -> Option<&Participant> {
        self.participants.iter().find(|p| {
            p.status == ParticipantStatus::Active
                && p.domain.as_str() == domain
                && role.map_or(true, |r| p.role == r)
        })
    }

    /// Whether an active participant already holds (domain, role).
    pub fn has_active_role(&self, domain: &str, role: &str) -> bool {
        self.find_active_participant(domain, Some(role)).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(!OrchestrationStatus::Active.is_terminal());
        assert!(OrchestrationStatus::Completed.is_terminal());
        assert!(OrchestrationStatus::Cancelled.is_terminal());
    }

    #[test]
    fn status_string_roundtrip() {
        for status in [
            OrchestrationStatus::Active,
            OrchestrationStatus::Completed,
            OrchestrationStatus::Cancelled,
        ] {
            assert_eq!(OrchestrationStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrchestrationStatus::parse("archived"), None);
    }

    #[test]
    fn participant_status_string_roundtrip() {
        for status in [
            ParticipantStatus::Active,
            ParticipantStatus::Removed,
            ParticipantStatus::Completed,
        ] {
            assert_eq!(ParticipantStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn status_serde_snake_case() {
        assert_eq!(
            serde_json::to_string(&OrchestrationStatus::Cancelled).unwrap(),
            r#""cancelled""#
        );
        let back: ParticipantStatus = serde_json::from_str(r#""removed""#).unwrap();
        assert_eq!(back, ParticipantStatus::Removed);
    }
}
