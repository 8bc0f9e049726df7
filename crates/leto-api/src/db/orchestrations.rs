// SPDX-License-Identifier: Apache-2.0
//! Orchestration and participant persistence.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use leto_core::{BusinessKeys, DomainName, OrchestrationId, ParticipantId};
use leto_orchestration::{Orchestration, OrchestrationStatus, Participant, ParticipantStatus};

/// Save an orchestration and all its participant rows (upsert).
pub async fn save_orchestration(
    pool: &PgPool,
    orchestration: &Orchestration,
) -> Result<(), sqlx::Error> {
    let business_keys = serde_json::to_value(&orchestration.business_keys)
        .map_err(|e| sqlx::Error::Protocol(format!("failed to serialize business keys: {e}")))?;

    sqlx::query(
        "INSERT INTO orchestrations
            (orchestration_id, order_reference, orchestrator_domain, orchestrator_name,
             customer_domain, customer_name, business_keys, status, orchestration_type,
             created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
         ON CONFLICT (orchestration_id) DO UPDATE SET
            business_keys = EXCLUDED.business_keys,
            status = EXCLUDED.status,
            updated_at = EXCLUDED.updated_at",
    )
    .bind(orchestration.id.as_uuid())
    .bind(&orchestration.order_reference)
    .bind(orchestration.orchestrator_domain.as_str())
    .bind(&orchestration.orchestrator_name)
    .bind(orchestration.customer_domain.as_str())
    .bind(&orchestration.customer_name)
    .bind(&business_keys)
    .bind(orchestration.status.as_str())
    .bind(&orchestration.orchestration_type)
    .bind(orchestration.created_at)
    .bind(orchestration.updated_at)
    .execute(pool)
    .await?;

    for participant in &orchestration.participants {
        save_participant(pool, participant).await?;
    }
    Ok(())
}

async fn save_participant(pool: &PgPool, participant: &Participant) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO orchestration_participants
            (participant_id, orchestration_id, domain, name, role, authorized_by,
             authorized_at, status, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         ON CONFLICT (participant_id) DO UPDATE SET
            status = EXCLUDED.status,
            updated_at = EXCLUDED.updated_at",
    )
    .bind(participant.id.as_uuid())
    .bind(participant.orchestration_id.as_uuid())
    .bind(participant.domain.as_str())
    .bind(&participant.name)
    .bind(&participant.role)
    .bind(participant.authorized_by.as_str())
    .bind(participant.authorized_at)
    .bind(participant.status.as_str())
    .bind(participant.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Load all orchestrations (with participants) for hydration.
pub async fn load_all_orchestrations(pool: &PgPool) -> Result<Vec<Orchestration>, sqlx::Error> {
    let rows = sqlx::query_as::<_, OrchestrationRow>(
        "SELECT orchestration_id, order_reference, orchestrator_domain, orchestrator_name,
                customer_domain, customer_name, business_keys, status, orchestration_type,
                created_at, updated_at
         FROM orchestrations ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let participants = load_participants(pool, row.orchestration_id).await?;
        records.push(row.into_record(participants)?);
    }
    Ok(records)
}

async fn load_participants(
    pool: &PgPool,
    orchestration_id: Uuid,
) -> Result<Vec<Participant>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ParticipantRow>(
        "SELECT participant_id, orchestration_id, domain, name, role, authorized_by,
                authorized_at, status, updated_at
         FROM orchestration_participants
         WHERE orchestration_id = $1 ORDER BY authorized_at",
    )
    .bind(orchestration_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(ParticipantRow::into_record).collect()
}

#[derive(sqlx::FromRow)]
struct OrchestrationRow {
    orchestration_id: Uuid,
    order_reference: String,
    orchestrator_domain: String,
    orchestrator_name: String,
    customer_domain: String,
    customer_name: String,
    business_keys: serde_json::Value,
    status: String,
    orchestration_type: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrchestrationRow {
    fn into_record(self, participants: Vec<Participant>) -> Result<Orchestration, sqlx::Error> {
        let row_id = self.orchestration_id;
        let corrupt = move |field: &str, detail: String| {
            sqlx::Error::Protocol(format!("corrupt {field} in orchestration {row_id}: {detail}"))
        };

        Ok(Orchestration {
            id: OrchestrationId::from_uuid(self.orchestration_id),
            order_reference: self.order_reference,
            orchestrator_domain: DomainName::new(&self.orchestrator_domain)
                .map_err(|e| corrupt("orchestrator_domain", e.to_string()))?,
            orchestrator_name: self.orchestrator_name,
            customer_domain: DomainName::new(&self.customer_domain)
                .map_err(|e| corrupt("customer_domain", e.to_string()))?,
            customer_name: self.customer_name,
            business_keys: serde_json::from_value::<BusinessKeys>(self.business_keys.clone())
                .map_err(|e| corrupt("business_keys", e.to_string()))?,
            status: OrchestrationStatus::parse(&self.status)
                .ok_or_else(|| corrupt("status", self.status.clone()))?,
            orchestration_type: self.orchestration_type,
            participants,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ParticipantRow {
    participant_id: Uuid,
    orchestration_id: Uuid,
    domain: String,
    name: String,
    role: String,
    authorized_by: String,
    authorized_at: DateTime<Utc>,
    status: String,
    updated_at: DateTime<Utc>,
}

impl ParticipantRow {
    fn into_record(self) -> Result<Participant, sqlx::Error> {
        let row_id = self.participant_id;
        let corrupt = move |field: &str, detail: String| {
            sqlx::Error::Protocol(format!("corrupt {field} in participant {row_id}: {detail}"))
        };

        Ok(Participant {
            id: ParticipantId::from_uuid(self.participant_id),
            orchestration_id: OrchestrationId::from_uuid(self.orchestration_id),
            domain: DomainName::new(&self.domain)
                .map_err(|e| corrupt("domain", e.to_string()))?,
            name: self.name,
            role: self.role,
            authorized_by: DomainName::new(&self.authorized_by)
                .map_err(|e| corrupt("authorized_by", e.to_string()))?,
            authorized_at: self.authorized_at,
            status: ParticipantStatus::parse(&self.status)
                .ok_or_else(|| corrupt("status", self.status.clone()))?,
            updated_at: self.updated_at,
        })
    }
}
