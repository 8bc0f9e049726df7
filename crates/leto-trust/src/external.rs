//! # External-System Registry
//!
//! Registered callers authorized to request token issuance, validations,
//! or lookups. A system is created by administrative registration, then
//! approved; revocation clears the active flag but keeps the row.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use leto_core::DomainName;

use crate::error::TrustError;

/// Operations an external system may be granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllowedOperation {
    /// Request token issuance.
    Issue,
    /// Present tokens for validation and report downstream usage.
    Validate,
    /// Read issuance records and the validation log.
    Lookup,
}

impl std::fmt::Display for AllowedOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AllowedOperation::Issue => "issue",
            AllowedOperation::Validate => "validate",
            AllowedOperation::Lookup => "lookup",
        };
        write!(f, "{s}")
    }
}

/// A registered external caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalSystem {
    pub domain: DomainName,
    /// Operator-facing description.
    pub name: String,
    pub allowed_operations: BTreeSet<AllowedOperation>,
    /// Per-hour issuance ceiling for this caller.
    pub hourly_issuance_ceiling: u32,
    /// Cleared on revocation.
    pub active: bool,
    /// Set by administrative approval; a registered-but-unapproved system
    /// cannot call anything.
    pub approved: bool,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Default hourly issuance ceiling for newly registered systems.
pub const DEFAULT_HOURLY_ISSUANCE_CEILING: u32 = 30;

/// In-memory registry of external systems, keyed by caller domain.
pub struct ExternalSystemRegistry {
    systems: DashMap<String, ExternalSystem>,
}

impl ExternalSystemRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            systems: DashMap::new(),
        }
    }

    /// Register a system (unapproved until [`Self::approve`] is called).
    pub fn register(
        &self,
        domain: DomainName,
        name: String,
        allowed_operations: BTreeSet<AllowedOperation>,
        hourly_issuance_ceiling: u32,
        now: DateTime<Utc>,
    ) -> Result<ExternalSystem, TrustError> {
        use dashmap::mapref::entry::Entry;
        match self.systems.entry(domain.to_string()) {
            Entry::Occupied(existing) if !existing.get().deleted => {
                Err(TrustError::DomainInUse(domain.to_string()))
            }
            entry => {
                let record = ExternalSystem {
                    domain,
                    name,
                    allowed_operations,
                    hourly_issuance_ceiling,
                    active: true,
                    approved: false,
                    deleted: false,
                    created_at: now,
                    updated_at: now,
                };
                match entry {
                    Entry::Occupied(mut o) => {
                        o.insert(record.clone());
                    }
                    Entry::Vacant(v) => {
                        v.insert(record.clone());
                    }
                }
                Ok(record)
            }
        }
    }

    /// Administrative approval.
    pub fn approve(&self, domain: &str, now: DateTime<Utc>) -> Result<ExternalSystem, TrustError> {
        self.mutate(domain, now, |system| {
            system.approved = true;
            system.active = true;
        })
    }

    /// Revoke a system's access. The row is retained.
    pub fn revoke(&self, domain: &str, now: DateTime<Utc>) -> Result<ExternalSystem, TrustError> {
        self.mutate(domain, now, |system| {
            system.active = false;
        })
    }

    /// Look up a live system by domain.
    pub fn get(&self, domain: &str) -> Option<ExternalSystem> {
        self.systems
            .get(domain)
            .map(|s| s.value().clone())
            .filter(|s| !s.deleted)
    }

    /// Resolve and authorize a caller for an operation.
    ///
    /// Errors distinguish unknown callers, unapproved/revoked callers, and
    /// missing operation grants, so the API layer can map them to 401/403.
    pub fn authorize(
        &self,
        domain: &str,
        operation: AllowedOperation,
    ) -> Result<ExternalSystem, TrustError> {
        let system = self
            .get(domain)
            .ok_or_else(|| TrustError::SystemNotRegistered(domain.to_string()))?;
        if !system.approved || !system.active {
            return Err(TrustError::SystemNotApproved(domain.to_string()));
        }
        if !system.allowed_operations.contains(&operation) {
            return Err(TrustError::OperationNotPermitted {
                domain: domain.to_string(),
                operation,
            });
        }
        Ok(system)
    }

    /// List all live systems.
    pub fn list(&self) -> Vec<ExternalSystem> {
        self.systems
            .iter()
            .filter(|s| !s.deleted)
            .map(|s| s.value().clone())
            .collect()
    }

    /// Insert a record directly (used for hydration from the database).
    pub fn insert(&self, record: ExternalSystem) {
        self.systems.insert(record.domain.to_string(), record);
    }

    /// Number of records, including soft-deleted rows.
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    /// Returns `true` when the registry holds no records at all.
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    fn mutate<F>(
        &self,
        domain: &str,
        now: DateTime<Utc>,
        mutate: F,
    ) -> Result<ExternalSystem, TrustError>
    where
        F: FnOnce(&mut ExternalSystem),
    {
        let mut entry = self
            .systems
            .get_mut(domain)
            .ok_or_else(|| TrustError::SystemNotRegistered(domain.to_string()))?;
        let system = entry.value_mut();
        if system.deleted {
            return Err(TrustError::SystemNotRegistered(domain.to_string()));
        }
        mutate(system);
        system.updated_at = now;
        Ok(system.clone())
    }
}

impl Default for ExternalSystemRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExternalSystemRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalSystemRegistry")
            .field("system_count", &self.systems.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_operations() -> BTreeSet<AllowedOperation> {
        [
            AllowedOperation::Issue,
            AllowedOperation::Validate,
            AllowedOperation::Lookup,
        ]
        .into_iter()
        .collect()
    }

    fn registered(registry: &ExternalSystemRegistry, domain: &str) -> ExternalSystem {
        registry
            .register(
                DomainName::new(domain).unwrap(),
                format!("System at {domain}"),
                all_operations(),
                DEFAULT_HOURLY_ISSUANCE_CEILING,
                Utc::now(),
            )
            .unwrap()
    }

    #[test]
    fn unapproved_system_cannot_call() {
        let registry = ExternalSystemRegistry::new();
        registered(&registry, "booking.example.com");

        let err = registry
            .authorize("booking.example.com", AllowedOperation::Issue)
            .unwrap_err();
        assert!(matches!(err, TrustError::SystemNotApproved(_)));
    }

    #[test]
    fn approved_system_is_authorized() {
        let registry = ExternalSystemRegistry::new();
        registered(&registry, "booking.example.com");
        registry.approve("booking.example.com", Utc::now()).unwrap();

        let system = registry
            .authorize("booking.example.com", AllowedOperation::Issue)
            .unwrap();
        assert_eq!(system.domain.as_str(), "booking.example.com");
    }

    #[test]
    fn unknown_system_is_not_registered() {
        let registry = ExternalSystemRegistry::new();
        let err = registry
            .authorize("ghost.example.com", AllowedOperation::Validate)
            .unwrap_err();
        assert!(matches!(err, TrustError::SystemNotRegistered(_)));
    }

    #[test]
    fn missing_operation_grant_is_rejected() {
        let registry = ExternalSystemRegistry::new();
        registry
            .register(
                DomainName::new("viewer.example.com").unwrap(),
                "Read-only viewer".to_string(),
                [AllowedOperation::Lookup].into_iter().collect(),
                DEFAULT_HOURLY_ISSUANCE_CEILING,
                Utc::now(),
            )
            .unwrap();
        registry.approve("viewer.example.com", Utc::now()).unwrap();

        assert!(registry
            .authorize("viewer.example.com", AllowedOperation::Lookup)
            .is_ok());
        let err = registry
            .authorize("viewer.example.com", AllowedOperation::Issue)
            .unwrap_err();
        assert!(matches!(err, TrustError::OperationNotPermitted { .. }));
    }

    #[test]
    fn revocation_blocks_calls() {
        let registry = ExternalSystemRegistry::new();
        registered(&registry, "booking.example.com");
        registry.approve("booking.example.com", Utc::now()).unwrap();
        registry.revoke("booking.example.com", Utc::now()).unwrap();

        let err = registry
            .authorize("booking.example.com", AllowedOperation::Issue)
            .unwrap_err();
        assert!(matches!(err, TrustError::SystemNotApproved(_)));
    }

    #[test]
    fn approval_after_revocation_restores_access() {
        let registry = ExternalSystemRegistry::new();
        registered(&registry, "booking.example.com");
        registry.approve("booking.example.com", Utc::now()).unwrap();
        registry.revoke("booking.example.com", Utc::now()).unwrap();
        registry.approve("booking.example.com", Utc::now()).unwrap();

        assert!(registry
            .authorize("booking.example.com", AllowedOperation::Issue)
            .is_ok());
    }

    #[test]
    fn duplicate_registration_rejected() {
        let registry = ExternalSystemRegistry::new();
        registered(&registry, "booking.example.com");
        let err = registry
            .register(
                DomainName::new("booking.example.com").unwrap(),
                "Duplicate".to_string(),
                all_operations(),
                DEFAULT_HOURLY_ISSUANCE_CEILING,
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, TrustError::DomainInUse(_)));
    }

    #[test]
    fn operation_serde_snake_case() {
        let json = serde_json::to_string(&AllowedOperation::Issue).unwrap();
        assert_eq!(json, r#""issue""#);
        let back: AllowedOperation = serde_json::from_str(r#""lookup""#).unwrap();
        assert_eq!(back, AllowedOperation::Lookup);
    }
}
