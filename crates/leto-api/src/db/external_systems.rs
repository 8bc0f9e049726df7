// SPDX-License-Identifier: Apache-2.0
//! External-system persistence.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use leto_core::DomainName;
use leto_trust::{AllowedOperation, ExternalSystem};

/// Save an external-system record (upsert).
pub async fn save_system(pool: &PgPool, system: &ExternalSystem) -> Result<(), sqlx::Error> {
    let operations = serde_json::to_value(&system.allowed_operations)
        .map_err(|e| sqlx::Error::Protocol(format!("failed to serialize operations: {e}")))?;

    sqlx::query(
        "INSERT INTO external_systems
            (domain, name, allowed_operations, hourly_issuance_ceiling, active,
             approved, deleted, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         ON CONFLICT (domain) DO UPDATE SET
            name = EXCLUDED.name,
            allowed_operations = EXCLUDED.allowed_operations,
            hourly_issuance_ceiling = EXCLUDED.hourly_issuance_ceiling,
            active = EXCLUDED.active,
            approved = EXCLUDED.approved,
            deleted = EXCLUDED.deleted,
            updated_at = EXCLUDED.updated_at",
    )
    .bind(system.domain.as_str())
    .bind(&system.name)
    .bind(&operations)
    .bind(system.hourly_issuance_ceiling as i32)
    .bind(system.active)
    .bind(system.approved)
    .bind(system.deleted)
    .bind(system.created_at)
    .bind(system.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Load all external systems for hydration.
pub async fn load_all_systems(pool: &PgPool) -> Result<Vec<ExternalSystem>, sqlx::Error> {
    let rows = sqlx::query_as::<_, SystemRow>(
        "SELECT domain, name, allowed_operations, hourly_issuance_ceiling, active,
                approved, deleted, created_at, updated_at
         FROM external_systems ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let domain = DomainName::new(&row.domain).map_err(|e| {
            sqlx::Error::Protocol(format!("corrupt domain in system {}: {e}", row.domain))
        })?;
        let allowed_operations: BTreeSet<AllowedOperation> =
            serde_json::from_value(row.allowed_operations).map_err(|e| {
                sqlx::Error::Protocol(format!("corrupt operations in system {}: {e}", row.domain))
            })?;
        records.push(ExternalSystem {
            domain,
            name: row.name,
            allowed_operations,
            hourly_issuance_ceiling: row.hourly_issuance_ceiling.max(0) as u32,
            active: row.active,
            approved: row.approved,
            deleted: row.deleted,
            created_at: row.created_at,
            updated_at: row.updated_at,
        });
    }
    Ok(records)
}

#[derive(sqlx::FromRow)]
struct SystemRow {
    domain: String,
    name: String,
    allowed_operations: serde_json::Value,
    hourly_issuance_ceiling: i32,
    active: bool,
    approved: bool,
    deleted: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
