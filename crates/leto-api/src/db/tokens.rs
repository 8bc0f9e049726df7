// SPDX-License-Identifier: Apache-2.0
//! Issuance-record persistence.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use leto_core::TokenId;
use leto_token::{IssuedTokenRecord, TokenKind};

/// Save an issuance record (upsert). Usage and revocation updates flow
/// through the same path.
pub async fn save_token_record(
    pool: &PgPool,
    record: &IssuedTokenRecord,
) -> Result<(), sqlx::Error> {
    let audience = serde_json::to_value(&record.audience)
        .map_err(|e| sqlx::Error::Protocol(format!("failed to serialize audience: {e}")))?;

    sqlx::query(
        "INSERT INTO issued_tokens
            (token_id, kind, issuer, subject, audience, issued_at, not_before,
             expires_at, token_hash, claims_snapshot, usage_count, last_used_at,
             last_used_by, revoked, revocation_reason, revoked_at, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
         ON CONFLICT (token_id) DO UPDATE SET
            usage_count = EXCLUDED.usage_count,
            last_used_at = EXCLUDED.last_used_at,
            last_used_by = EXCLUDED.last_used_by,
            revoked = issued_tokens.revoked OR EXCLUDED.revoked,
            revocation_reason = COALESCE(issued_tokens.revocation_reason, EXCLUDED.revocation_reason),
            revoked_at = COALESCE(issued_tokens.revoked_at, EXCLUDED.revoked_at),
            updated_at = EXCLUDED.updated_at",
    )
    .bind(record.token_id.as_uuid())
    .bind(record.kind.as_str())
    .bind(&record.issuer)
    .bind(&record.subject)
    .bind(&audience)
    .bind(record.issued_at)
    .bind(record.not_before)
    .bind(record.expires_at)
    .bind(&record.token_hash)
    .bind(&record.claims_snapshot)
    .bind(record.usage_count as i64)
    .bind(record.last_used_at)
    .bind(&record.last_used_by)
    .bind(record.revoked)
    .bind(&record.revocation_reason)
    .bind(record.revoked_at)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Load all issuance records for hydration.
pub async fn load_all_token_records(
    pool: &PgPool,
) -> Result<Vec<IssuedTokenRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TokenRow>(
        "SELECT token_id, kind, issuer, subject, audience, issued_at, not_before,
                expires_at, token_hash, claims_snapshot, usage_count, last_used_at,
                last_used_by, revoked, revocation_reason, revoked_at, created_at, updated_at
         FROM issued_tokens ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let kind = TokenKind::parse(&row.kind).ok_or_else(|| {
            sqlx::Error::Protocol(format!("corrupt kind in token {}: {}", row.token_id, row.kind))
        })?;
        let audience: Vec<String> = serde_json::from_value(row.audience).map_err(|e| {
            sqlx::Error::Protocol(format!("corrupt audience in token {}: {e}", row.token_id))
        })?;
        records.push(IssuedTokenRecord {
            token_id: TokenId::from_uuid(row.token_id),
            kind,
            issuer: row.issuer,
            subject: row.subject,
            audience,
            issued_at: row.issued_at,
            not_before: row.not_before,
            expires_at: row.expires_at,
            token_hash: row.token_hash,
            claims_snapshot: row.claims_snapshot,
            usage_count: row.usage_count.max(0) as u64,
            last_used_at: row.last_used_at,
            last_used_by: row.last_used_by,
            revoked: row.revoked,
            revocation_reason: row.revocation_reason,
            revoked_at: row.revoked_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        });
    }
    Ok(records)
}

#[derive(sqlx::FromRow)]
struct TokenRow {
    token_id: Uuid,
    kind: String,
    issuer: String,
    subject: String,
    audience: serde_json::Value,
    issued_at: DateTime<Utc>,
    not_before: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    token_hash: String,
    claims_snapshot: serde_json::Value,
    usage_count: i64,
    last_used_at: Option<DateTime<Utc>>,
    last_used_by: Option<String>,
    revoked: bool,
    revocation_reason: Option<String>,
    revoked_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
