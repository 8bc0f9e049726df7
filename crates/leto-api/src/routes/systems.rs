// SPDX-License-Identifier: Apache-2.0
//! # External-System Administration
//!
//! Registration, approval, and revocation of calling systems. These are
//! administrative operations guarded by the service bearer token.
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | `POST` | `/v1/systems` | `register_system` |
//! | `GET` | `/v1/systems` | `list_systems` |
//! | `POST` | `/v1/systems/:domain/approve` | `approve_system` |
//! | `POST` | `/v1/systems/:domain/revoke` | `revoke_system` |

use std::collections::BTreeSet;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;

use leto_core::DomainName;
use leto_trust::{AllowedOperation, DEFAULT_HOURLY_ISSUANCE_CEILING};

use crate::db;
use crate::error::AppError;
use crate::state::AppState;

/// Request to register an external system.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RegisterSystemRequest {
    #[schema(value_type = String)]
    pub domain: DomainName,
    pub name: String,
    /// Subset of `issue`, `validate`, `lookup`.
    #[schema(value_type = Vec<String>)]
    pub allowed_operations: BTreeSet<AllowedOperation>,
    /// Per-hour issuance ceiling; defaults to the service-wide default.
    #[serde(default)]
    pub hourly_issuance_ceiling: Option<u32>,
}

/// Build the systems router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/systems", post(register_system).get(list_systems))
        .route("/v1/systems/:domain/approve", post(approve_system))
        .route("/v1/systems/:domain/revoke", post(revoke_system))
}

/// POST /v1/systems — Register a calling system (unapproved).
#[utoipa::path(
    post,
    path = "/v1/systems",
    request_body = RegisterSystemRequest,
    responses(
        (status = 201, description = "System registered, pending approval"),
        (status = 409, description = "Domain already registered", body = crate::error::ErrorBody),
    ),
    tag = "systems"
)]
pub async fn register_system(
    State(state): State<AppState>,
    Json(req): Json<RegisterSystemRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::Validation("name must not be empty".to_string()));
    }

    let system = state.systems.register(
        req.domain,
        req.name,
        req.allowed_operations,
        req.hourly_issuance_ceiling
            .unwrap_or(DEFAULT_HOURLY_ISSUANCE_CEILING),
        state.clock.now(),
    )?;

    if let Some(pool) = &state.db_pool {
        db::external_systems::save_system(pool, &system).await?;
    }
    Ok((StatusCode::CREATED, Json(system)))
}

/// GET /v1/systems — List registered systems.
#[utoipa::path(
    get,
    path = "/v1/systems",
    responses((status = 200, description = "Registered systems")),
    tag = "systems"
)]
pub async fn list_systems(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let systems = state.systems.list();
    Ok(Json(serde_json::json!({
        "systems": systems,
        "total": systems.len(),
    })))
}

/// POST /v1/systems/:domain/approve — Administrative approval.
#[utoipa::path(
    post,
    path = "/v1/systems/{domain}/approve",
    params(("domain" = String, Path, description = "System domain")),
    responses(
        (status = 200, description = "System after approval"),
        (status = 404, description = "System not registered", body = crate::error::ErrorBody),
    ),
    tag = "systems"
)]
pub async fn approve_system(
    State(state): State<AppState>,
    Path(domain): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let system = state
        .systems
        .approve(&domain, state.clock.now())
        .map_err(|e| match e {
            leto_trust::TrustError::SystemNotRegistered(d) => {
                AppError::NotFound(format!("system {d} not registered"))
            }
            other => other.into(),
        })?;

    if let Some(pool) = &state.db_pool {
        db::external_systems::save_system(pool, &system).await?;
    }
    Ok(Json(system))
}

/// POST /v1/systems/:domain/revoke — Revoke a system's access.
#[utoipa::path(
    post,
    path = "/v1/systems/{domain}/revoke",
    params(("domain" = String, Path, description = "System domain")),
    responses(
        (status = 200, description = "System after revocation"),
        (status = 404, description = "System not registered", body = crate::error::ErrorBody),
    ),
    tag = "systems"
)]
pub async fn revoke_system(
    State(state): State<AppState>,
    Path(domain): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let system = state
        .systems
        .revoke(&domain, state.clock.now())
        .map_err(|e| match e {
            leto_trust::TrustError::SystemNotRegistered(d) => {
                AppError::NotFound(format!("system {d} not registered"))
            }
            other => other.into(),
        })?;

    if let Some(pool) = &state.db_pool {
        db::external_systems::save_system(pool, &system).await?;
    }
    Ok(Json(system))
}
