// SPDX-License-Identifier: Apache-2.0
//! Validation-log persistence. Entries are append-only: inserts use
//! `ON CONFLICT DO NOTHING` and there is no update path.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use leto_core::{OrchestrationId, TokenId};
use leto_token::{ValidationLogEntry, ValidationResultCode};

/// Append one log entry. Re-appending an existing entry id is a no-op.
pub async fn append_entry(pool: &PgPool, entry: &ValidationLogEntry) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO validation_log
            (entry_id, sequence, orchestration_id, token_id, token_issuer, token_subject,
             requester, requested_at, result, valid, reason,
             member_found_in_orchestration, member_role, signature_valid, token_expired,
             duration_micros)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
         ON CONFLICT (entry_id) DO NOTHING",
    )
    .bind(entry.entry_id)
    .bind(entry.sequence as i64)
    .bind(entry.orchestration_id.as_ref().map(|id| *id.as_uuid()))
    .bind(entry.token_id.as_ref().map(|id| *id.as_uuid()))
    .bind(&entry.token_issuer)
    .bind(&entry.token_subject)
    .bind(&entry.requester)
    .bind(entry.requested_at)
    .bind(entry.result.as_str())
    .bind(entry.valid)
    .bind(&entry.reason)
    .bind(entry.member_found_in_orchestration)
    .bind(&entry.member_role)
    .bind(entry.signature_valid)
    .bind(entry.token_expired)
    .bind(entry.duration_micros as i64)
    .execute(pool)
    .await?;
    Ok(())
}

/// Load the full log in sequence order for hydration.
pub async fn load_all_entries(pool: &PgPool) -> Result<Vec<ValidationLogEntry>, sqlx::Error> {
    let rows = sqlx::query_as::<_, LogRow>(
        "SELECT entry_id, sequence, orchestration_id, token_id, token_issuer, token_subject,
                requester, requested_at, result, valid, reason,
                member_found_in_orchestration, member_role, signature_valid, token_expired,
                duration_micros
         FROM validation_log ORDER BY sequence",
    )
    .fetch_all(pool)
    .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let result = ValidationResultCode::parse(&row.result).ok_or_else(|| {
            sqlx::Error::Protocol(format!(
                "corrupt result in log entry {}: {}",
                row.entry_id, row.result
            ))
        })?;
        records.push(ValidationLogEntry {
            entry_id: row.entry_id,
            sequence: row.sequence.max(0) as u64,
            orchestration_id: row.orchestration_id.map(OrchestrationId::from_uuid),
            token_id: row.token_id.map(TokenId::from_uuid),
            token_issuer: row.token_issuer,
            token_subject: row.token_subject,
            requester: row.requester,
            requested_at: row.requested_at,
            result,
            valid: row.valid,
            reason: row.reason,
            member_found_in_orchestration: row.member_found_in_orchestration,
            member_role: row.member_role,
            signature_valid: row.signature_valid,
            token_expired: row.token_expired,
            duration_micros: row.duration_micros.max(0) as u64,
        });
    }
    Ok(records)
}

#[derive(sqlx::FromRow)]
struct LogRow {
    entry_id: Uuid,
    sequence: i64,
    orchestration_id: Option<Uuid>,
    token_id: Option<Uuid>,
    token_issuer: Option<String>,
    token_subject: Option<String>,
    requester: String,
    requested_at: DateTime<Utc>,
    result: String,
    valid: bool,
    reason: String,
    member_found_in_orchestration: bool,
    member_role: Option<String>,
    signature_valid: bool,
    token_expired: bool,
    duration_micros: i64,
}
