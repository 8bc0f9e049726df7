//! # Legal Entities and the Entity Directory
//!
//! [`LegalEntity`] is the record for one registered organization.
//! [`EntityDirectory`] is the in-memory store backed by `DashMap`; mutation
//! runs under the entry's write lock so tier transitions are atomic per
//! entity.
//!
//! Entities are never hard-deleted — deregistration sets the soft-delete
//! flag and the row stays for audit.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use leto_core::{DomainName, EntityId};

use crate::error::TrustError;
use crate::tier::{Tier, VerificationMethod};

/// A registered organization.
///
/// Invariants (enforced by the directory's mutation paths):
/// - `tier` ∈ {1,2,3}
/// - Tier 1 and Tier 3 never carry `reverification_due`
/// - Tier 2 always carries `reverification_due`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegalEntity {
    pub id: EntityId,
    pub domain: DomainName,
    /// Registered display name.
    pub name: String,
    pub tier: Tier,
    /// How the current tier was established. `None` until first
    /// verification.
    pub verification_method: Option<VerificationMethod>,
    pub verified_at: Option<DateTime<Utc>>,
    /// Tier 2 only: when the domain proof must be renewed.
    pub reverification_due: Option<DateTime<Utc>>,
    /// Soft-delete flag; deregistered entities keep their row.
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LegalEntity {
    /// Check the tier/deadline invariant.
    pub fn invariant_holds(&self) -> bool {
        self.tier.requires_reverification() == self.reverification_due.is_some()
    }
}

/// In-memory directory of legal entities.
///
/// Thread-safe via `DashMap`; per-entity mutation is TOCTOU-free because
/// read-validate-update runs under a single entry write lock.
pub struct EntityDirectory {
    entities: DashMap<EntityId, LegalEntity>,
}

impl EntityDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self {
            entities: DashMap::new(),
        }
    }

    /// Register a new entity at Tier 3 (the registration default).
    ///
    /// Rejects a second live registration for the same domain.
    pub fn register(
        &self,
        domain: DomainName,
        name: String,
        now: DateTime<Utc>,
    ) -> Result<LegalEntity, TrustError> {
        if self
            .entities
            .iter()
            .any(|e| !e.deleted && e.domain == domain)
        {
            return Err(TrustError::DomainInUse(domain.to_string()));
        }
        let record = LegalEntity {
            id: EntityId::new(),
            domain,
            name,
            tier: Tier::Tier3,
            verification_method: None,
            verified_at: None,
            reverification_due: None,
            deleted: false,
            created_at: now,
            updated_at: now,
        };
        self.entities.insert(record.id, record.clone());
        Ok(record)
    }

    /// Fetch a live entity by id.
    pub fn get(&self, id: &EntityId) -> Option<LegalEntity> {
        self.entities
            .get(id)
            .map(|e| e.value().clone())
            .filter(|e| !e.deleted)
    }

    /// Fetch a live entity by domain.
    pub fn get_by_domain(&self, domain: &str) -> Option<LegalEntity> {
        self.entities
            .iter()
            .find(|e| !e.deleted && e.domain.as_str() == domain)
            .map(|e| e.value().clone())
    }

    /// All live entity ids. Used by the downgrade sweep.
    pub fn ids(&self) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|e| !e.deleted)
            .map(|e| e.id)
            .collect()
    }

    /// List all live entities.
    pub fn list(&self) -> Vec<LegalEntity> {
        self.entities
            .iter()
            .filter(|e| !e.deleted)
            .map(|e| e.value().clone())
            .collect()
    }

    /// Soft-delete an entity. The row is retained.
    pub fn soft_delete(&self, id: &EntityId, now: DateTime<Utc>) -> Result<(), TrustError> {
        let mut entry = self
            .entities
            .get_mut(id)
            .ok_or(TrustError::EntityNotFound(*id))?;
        let entity = entry.value_mut();
        if entity.deleted {
            return Err(TrustError::EntityNotFound(*id));
        }
        entity.deleted = true;
        entity.updated_at = now;
        Ok(())
    }

    /// Run `mutate` on the entity under its entry write lock.
    ///
    /// Returns the updated record. The mutation closure must uphold the
    /// tier/deadline invariant; `updated_at` is stamped here.
    pub fn update<F>(
        &self,
        id: &EntityId,
        now: DateTime<Utc>,
        mutate: F,
    ) -> Result<LegalEntity, TrustError>
    where
        F: FnOnce(&mut LegalEntity) -> Result<(), TrustError>,
    {
        let mut entry = self
            .entities
            .get_mut(id)
            .ok_or(TrustError::EntityNotFound(*id))?;
        let entity = entry.value_mut();
        if entity.deleted {
            return Err(TrustError::EntityNotFound(*id));
        }
        mutate(entity)?;
        debug_assert!(entity.invariant_holds(), "tier/deadline invariant violated");
        entity.updated_at = now;
        Ok(entity.clone())
    }

    /// Insert a record directly (used for hydration from the database).
    pub fn insert(&self, record: LegalEntity) {
        self.entities.insert(record.id, record);
    }

    /// Number of records, including soft-deleted rows.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` when the directory holds no records at all.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl Default for EntityDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EntityDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityDirectory")
            .field("entity_count", &self.entities.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory_with_entity() -> (EntityDirectory, LegalEntity) {
        let directory = EntityDirectory::new();
        let entity = directory
            .register(
                DomainName::new("carrier.example.com").unwrap(),
                "Carrier BV".to_string(),
                Utc::now(),
            )
            .unwrap();
        (directory, entity)
    }

    #[test]
    fn registration_defaults_to_tier3() {
        let (_, entity) = directory_with_entity();
        assert_eq!(entity.tier, Tier::Tier3);
        assert!(entity.verification_method.is_none());
        assert!(entity.reverification_due.is_none());
        assert!(!entity.deleted);
        assert!(entity.invariant_holds());
    }

    #[test]
    fn duplicate_domain_rejected() {
        let (directory, _) = directory_with_entity();
        let err = directory
            .register(
                DomainName::new("carrier.example.com").unwrap(),
                "Impostor BV".to_string(),
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, TrustError::DomainInUse(_)));
    }

    #[test]
    fn domain_is_reusable_after_soft_delete() {
        let (directory, entity) = directory_with_entity();
        directory.soft_delete(&entity.id, Utc::now()).unwrap();

        directory
            .register(
                DomainName::new("carrier.example.com").unwrap(),
                "Carrier BV (new)".to_string(),
                Utc::now(),
            )
            .unwrap();
    }

    #[test]
    fn get_by_domain_finds_live_entity() {
        let (directory, entity) = directory_with_entity();
        let found = directory.get_by_domain("carrier.example.com").unwrap();
        assert_eq!(found.id, entity.id);
        assert!(directory.get_by_domain("unknown.example.com").is_none());
    }

    #[test]
    fn soft_deleted_entity_is_invisible_but_retained() {
        let (directory, entity) = directory_with_entity();
        directory.soft_delete(&entity.id, Utc::now()).unwrap();

        assert!(directory.get(&entity.id).is_none());
        assert!(directory.get_by_domain("carrier.example.com").is_none());
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn soft_delete_twice_errors() {
        let (directory, entity) = directory_with_entity();
        directory.soft_delete(&entity.id, Utc::now()).unwrap();
        assert!(directory.soft_delete(&entity.id, Utc::now()).is_err());
    }

    #[test]
    fn update_stamps_updated_at() {
        let (directory, entity) = directory_with_entity();
        let later = entity.created_at + chrono::Duration::hours(1);
        let updated = directory
            .update(&entity.id, later, |e| {
                e.name = "Carrier B.V.".to_string();
                Ok(())
            })
            .unwrap();
        assert_eq!(updated.updated_at, later);
        assert_eq!(updated.name, "Carrier B.V.");
    }

    #[test]
    fn update_missing_entity_errors() {
        let directory = EntityDirectory::new();
        let result = directory.update(&EntityId::new(), Utc::now(), |_| Ok(()));
        assert!(matches!(result, Err(TrustError::EntityNotFound(_))));
    }
}
