// SPDX-License-Identifier: Apache-2.0
//! Legal-entity persistence. Follows the upsert/load-all pattern shared
//! by the other store modules.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use leto_core::{DomainName, EntityId};
use leto_trust::{LegalEntity, Tier, VerificationMethod};

/// Save an entity record (upsert).
pub async fn save_entity(pool: &PgPool, entity: &LegalEntity) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO legal_entities
            (entity_id, domain, name, tier, verification_method, verified_at,
             reverification_due, deleted, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
         ON CONFLICT (entity_id) DO UPDATE SET
            name = EXCLUDED.name,
            tier = EXCLUDED.tier,
            verification_method = EXCLUDED.verification_method,
            verified_at = EXCLUDED.verified_at,
            reverification_due = EXCLUDED.reverification_due,
            deleted = EXCLUDED.deleted,
            updated_at = EXCLUDED.updated_at",
    )
    .bind(entity.id.as_uuid())
    .bind(entity.domain.as_str())
    .bind(&entity.name)
    .bind(entity.tier.rank() as i16)
    .bind(entity.verification_method.map(|m| m.as_str()))
    .bind(entity.verified_at)
    .bind(entity.reverification_due)
    .bind(entity.deleted)
    .bind(entity.created_at)
    .bind(entity.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Load all entity records for hydration.
pub async fn load_all_entities(pool: &PgPool) -> Result<Vec<LegalEntity>, sqlx::Error> {
    let rows = sqlx::query_as::<_, EntityRow>(
        "SELECT entity_id, domain, name, tier, verification_method, verified_at,
                reverification_due, deleted, created_at, updated_at
         FROM legal_entities ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let domain = DomainName::new(&row.domain).map_err(|e| {
            sqlx::Error::Protocol(format!("corrupt domain in entity {}: {e}", row.entity_id))
        })?;
        let tier = Tier::from_rank(row.tier as u8).ok_or_else(|| {
            sqlx::Error::Protocol(format!("corrupt tier in entity {}: {}", row.entity_id, row.tier))
        })?;
        records.push(LegalEntity {
            id: EntityId::from_uuid(row.entity_id),
            domain,
            name: row.name,
            tier,
            verification_method: row
                .verification_method
                .as_deref()
                .and_then(VerificationMethod::parse),
            verified_at: row.verified_at,
            reverification_due: row.reverification_due,
            deleted: row.deleted,
            created_at: row.created_at,
            updated_at: row.updated_at,
        });
    }
    Ok(records)
}

#[derive(sqlx::FromRow)]
struct EntityRow {
    entity_id: Uuid,
    domain: String,
    name: String,
    tier: i16,
    verification_method: Option<String>,
    verified_at: Option<DateTime<Utc>>,
    reverification_due: Option<DateTime<Utc>>,
    deleted: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
