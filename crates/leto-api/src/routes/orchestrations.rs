// SPDX-License-Identifier: Apache-2.0
//! # Orchestration Endpoints
//!
//! Registration of orchestrations and their participants. Orchestrating
//! systems need the `issue` grant to declare or change anything; reads
//! need `lookup`.
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | `POST` | `/v1/orchestrations` | `create_orchestration` |
//! | `GET` | `/v1/orchestrations/:orchestration_id` | `get_orchestration` |
//! | `POST` | `/v1/orchestrations/:orchestration_id/participants` | `add_participant` |
//! | `POST` | `/v1/orchestrations/:orchestration_id/participants/:participant_id/remove` | `remove_participant` |
//! | `POST` | `/v1/orchestrations/:orchestration_id/status` | `set_status` |

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use leto_core::{BusinessKeys, DomainName, OrchestrationId, ParticipantId};
use leto_orchestration::OrchestrationStatus;
use leto_trust::AllowedOperation;

use crate::auth::authorize_caller;
use crate::db;
use crate::error::AppError;
use crate::state::AppState;

/// Request to register an orchestration.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateOrchestrationRequest {
    /// The orchestrating system's internal order identifier.
    pub order_reference: String,
    #[schema(value_type = String)]
    pub orchestrator_domain: DomainName,
    pub orchestrator_name: String,
    #[schema(value_type = String)]
    pub customer_domain: DomainName,
    pub customer_name: String,
    /// Business references, e.g. `{"bill_of_lading": "BOL-2031-4471"}`.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub business_keys: BusinessKeys,
    /// Type tag, e.g. "shipment".
    pub orchestration_type: String,
}

/// Request to declare a participant.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct AddParticipantRequest {
    #[schema(value_type = String)]
    pub domain: DomainName,
    pub name: String,
    /// Role label, e.g. "Carrier".
    pub role: String,
}

/// Request to close an orchestration.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct SetStatusRequest {
    /// `completed` or `cancelled`.
    #[schema(value_type = String)]
    pub status: OrchestrationStatus,
}

/// Build the orchestration router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/orchestrations", post(create_orchestration))
        .route("/v1/orchestrations/:orchestration_id", get(get_orchestration))
        .route(
            "/v1/orchestrations/:orchestration_id/participants",
            post(add_participant),
        )
        .route(
            "/v1/orchestrations/:orchestration_id/participants/:participant_id/remove",
            post(remove_participant),
        )
        .route("/v1/orchestrations/:orchestration_id/status", post(set_status))
}

/// POST /v1/orchestrations — Register a business transaction.
#[utoipa::path(
    post,
    path = "/v1/orchestrations",
    request_body = CreateOrchestrationRequest,
    responses(
        (status = 201, description = "Orchestration registered"),
        (status = 422, description = "Invalid business keys or fields", body = crate::error::ErrorBody),
    ),
    tag = "orchestrations"
)]
pub async fn create_orchestration(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateOrchestrationRequest>,
) -> Result<impl IntoResponse, AppError> {
    authorize_caller(&state, &headers, AllowedOperation::Issue)?;

    let orchestration = state.orchestrations.create(
        req.order_reference,
        req.orchestrator_domain,
        req.orchestrator_name,
        req.customer_domain,
        req.customer_name,
        req.business_keys,
        req.orchestration_type,
        state.clock.now(),
    )?;

    persist(&state, &orchestration.id).await?;
    Ok((StatusCode::CREATED, Json(orchestration)))
}

/// GET /v1/orchestrations/:orchestration_id — Fetch with participants.
#[utoipa::path(
    get,
    path = "/v1/orchestrations/{orchestration_id}",
    params(("orchestration_id" = Uuid, Path, description = "Orchestration UUID")),
    responses(
        (status = 200, description = "Orchestration with participants"),
        (status = 404, description = "Orchestration not found", body = crate::error::ErrorBody),
    ),
    tag = "orchestrations"
)]
pub async fn get_orchestration(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(orchestration_id): Path<OrchestrationId>,
) -> Result<impl IntoResponse, AppError> {
    authorize_caller(&state, &headers, AllowedOperation::Lookup)?;

    let orchestration = state
        .orchestrations
        .get(&orchestration_id)
        .ok_or_else(|| AppError::NotFound(format!("orchestration {orchestration_id} not found")))?;
    Ok(Json(orchestration))
}

/// POST /v1/orchestrations/:orchestration_id/participants — Declare a
/// participant role.
#[utoipa::path(
    post,
    path = "/v1/orchestrations/{orchestration_id}/participants",
    params(("orchestration_id" = Uuid, Path, description = "Orchestration UUID")),
    request_body = AddParticipantRequest,
    responses(
        (status = 201, description = "Participant declared"),
        (status = 404, description = "Orchestration not found", body = crate::error::ErrorBody),
        (status = 409, description = "Duplicate active role or terminal orchestration", body = crate::error::ErrorBody),
    ),
    tag = "orchestrations"
)]
pub async fn add_participant(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(orchestration_id): Path<OrchestrationId>,
    Json(req): Json<AddParticipantRequest>,
) -> Result<impl IntoResponse, AppError> {
    let caller = authorize_caller(&state, &headers, AllowedOperation::Issue)?;

    let participant = state.orchestrations.add_participant(
        orchestration_id,
        req.domain,
        req.name,
        req.role,
        caller.domain,
        state.clock.now(),
    )?;

    persist(&state, &orchestration_id).await?;
    Ok((StatusCode::CREATED, Json(participant)))
}

/// POST .../participants/:participant_id/remove — Soft-remove a
/// participant. The row is retained for audit.
#[utoipa::path(
    post,
    path = "/v1/orchestrations/{orchestration_id}/participants/{participant_id}/remove",
    params(
        ("orchestration_id" = Uuid, Path, description = "Orchestration UUID"),
        ("participant_id" = Uuid, Path, description = "Participant UUID"),
    ),
    responses(
        (status = 200, description = "Participant after removal"),
        (status = 404, description = "Participant not found", body = crate::error::ErrorBody),
        (status = 409, description = "Orchestration is terminal", body = crate::error::ErrorBody),
    ),
    tag = "orchestrations"
)]
pub async fn remove_participant(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((orchestration_id, participant_id)): Path<(OrchestrationId, ParticipantId)>,
) -> Result<impl IntoResponse, AppError> {
    authorize_caller(&state, &headers, AllowedOperation::Issue)?;

    let participant = state
        .orchestrations
        .remove_participant(participant_id, state.clock.now())?;

    persist(&state, &orchestration_id).await?;
    Ok(Json(participant))
}

/// POST /v1/orchestrations/:orchestration_id/status — Close an
/// orchestration. Both targets are terminal.
#[utoipa::path(
    post,
    path = "/v1/orchestrations/{orchestration_id}/status",
    params(("orchestration_id" = Uuid, Path, description = "Orchestration UUID")),
    request_body = SetStatusRequest,
    responses(
        (status = 200, description = "Orchestration after the transition"),
        (status = 404, description = "Orchestration not found", body = crate::error::ErrorBody),
        (status = 409, description = "Already terminal or invalid target", body = crate::error::ErrorBody),
    ),
    tag = "orchestrations"
)]
pub async fn set_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(orchestration_id): Path<OrchestrationId>,
    Json(req): Json<SetStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    authorize_caller(&state, &headers, AllowedOperation::Issue)?;

    let orchestration =
        state
            .orchestrations
            .set_status(orchestration_id, req.status, state.clock.now())?;

    persist(&state, &orchestration_id).await?;
    Ok(Json(orchestration))
}

/// Write-through of the current orchestration record.
pub async fn persist(state: &AppState, orchestration_id: &OrchestrationId) -> Result<(), AppError> {
    if let Some(pool) = &state.db_pool {
        if let Some(orchestration) = state.orchestrations.get(orchestration_id) {
            db::orchestrations::save_orchestration(pool, &orchestration).await?;
        }
    }
    Ok(())
}
