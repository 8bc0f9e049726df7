// SPDX-License-Identifier: Apache-2.0
//! # Legal-Entity Endpoints
//!
//! Registration, verification evidence submission, and the downgrade
//! sweep trigger. These are administrative operations guarded by the
//! service bearer token; external systems do not call them.
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | `POST` | `/v1/entities` | `register_entity` |
//! | `GET` | `/v1/entities/:entity_id` | `get_entity` |
//! | `POST` | `/v1/entities/:entity_id/evidence` | `submit_evidence` |
//! | `POST` | `/v1/entities/sweep` | `run_sweep` |

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use leto_core::{DomainName, EntityId};
use leto_trust::VerificationEvidence;

use crate::db;
use crate::error::AppError;
use crate::state::AppState;

/// Request to register a legal entity.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RegisterEntityRequest {
    /// The organization's domain, e.g. `carrier.example.com`.
    #[schema(value_type = String)]
    pub domain: DomainName,
    /// Registered display name.
    pub name: String,
}

/// Request carrying verification evidence.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct SubmitEvidenceRequest {
    #[schema(value_type = Object)]
    pub evidence: VerificationEvidence,
}

/// Build the entity router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/entities", post(register_entity))
        .route("/v1/entities/sweep", post(run_sweep))
        .route("/v1/entities/:entity_id", get(get_entity))
        .route("/v1/entities/:entity_id/evidence", post(submit_evidence))
}

/// POST /v1/entities — Register a legal entity at Tier 3.
#[utoipa::path(
    post,
    path = "/v1/entities",
    request_body = RegisterEntityRequest,
    responses(
        (status = 201, description = "Entity registered"),
        (status = 409, description = "Domain already registered", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid domain", body = crate::error::ErrorBody),
    ),
    tag = "entities"
)]
pub async fn register_entity(
    State(state): State<AppState>,
    Json(req): Json<RegisterEntityRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::Validation("name must not be empty".to_string()));
    }

    let entity = state
        .directory
        .register(req.domain, req.name, state.clock.now())?;

    if let Some(pool) = &state.db_pool {
        db::entities::save_entity(pool, &entity).await?;
    }

    Ok((StatusCode::CREATED, Json(entity)))
}

/// GET /v1/entities/:entity_id — Fetch an entity.
#[utoipa::path(
    get,
    path = "/v1/entities/{entity_id}",
    params(("entity_id" = Uuid, Path, description = "Entity UUID")),
    responses(
        (status = 200, description = "Entity record"),
        (status = 404, description = "Entity not found", body = crate::error::ErrorBody),
    ),
    tag = "entities"
)]
pub async fn get_entity(
    State(state): State<AppState>,
    Path(entity_id): Path<EntityId>,
) -> Result<impl IntoResponse, AppError> {
    let entity = state
        .directory
        .get(&entity_id)
        .ok_or_else(|| AppError::NotFound(format!("entity {entity_id} not found")))?;
    Ok(Json(entity))
}

/// POST /v1/entities/:entity_id/evidence — Submit verification evidence.
///
/// Malformed evidence is rejected without touching the entity.
#[utoipa::path(
    post,
    path = "/v1/entities/{entity_id}/evidence",
    params(("entity_id" = Uuid, Path, description = "Entity UUID")),
    request_body = SubmitEvidenceRequest,
    responses(
        (status = 200, description = "Tier transition applied"),
        (status = 404, description = "Entity not found", body = crate::error::ErrorBody),
        (status = 409, description = "Transition not allowed", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid evidence", body = crate::error::ErrorBody),
    ),
    tag = "entities"
)]
pub async fn submit_evidence(
    State(state): State<AppState>,
    Path(entity_id): Path<EntityId>,
    Json(req): Json<SubmitEvidenceRequest>,
) -> Result<impl IntoResponse, AppError> {
    let entity = state.evaluator.apply_evidence(&entity_id, &req.evidence)?;

    if let Some(pool) = &state.db_pool {
        db::entities::save_entity(pool, &entity).await?;
    }

    Ok(Json(entity))
}

/// POST /v1/entities/sweep — Run the Tier-2 downgrade sweep now.
///
/// The sweep also runs on a periodic schedule; this endpoint exists for
/// operational use and is safely re-runnable.
#[utoipa::path(
    post,
    path = "/v1/entities/sweep",
    responses(
        (status = 200, description = "Sweep report"),
    ),
    tag = "entities"
)]
pub async fn run_sweep(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let report = state.evaluator.run_sweep();

    if let Some(pool) = &state.db_pool {
        for entity_id in &report.downgraded {
            if let Some(entity) = state.directory.get(entity_id) {
                db::entities::save_entity(pool, &entity).await?;
            }
        }
    }

    Ok(Json(report))
}
