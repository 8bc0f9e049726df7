// SPDX-License-Identifier: Apache-2.0
//! # Token Endpoints
//!
//! Issuance, revocation, usage reporting, and record lookup. Issuance
//! and usage require a registered caller (`x-caller-domain`) holding the
//! matching operation grant; revocation is administrative.
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | `POST` | `/v1/tokens/assurance` | `issue_assurance` |
//! | `POST` | `/v1/tokens/orchestration` | `issue_orchestration` |
//! | `GET` | `/v1/tokens/:token_id` | `get_token_record` |
//! | `POST` | `/v1/tokens/:token_id/revoke` | `revoke_token` |
//! | `POST` | `/v1/tokens/:token_id/usage` | `record_usage` |

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use leto_core::{EntityId, OrchestrationId, TokenId};
use leto_trust::AllowedOperation;

use crate::auth::{authorize_caller, caller_domain};
use crate::db;
use crate::error::AppError;
use crate::state::AppState;

/// Request to issue an assurance token.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct IssueAssuranceRequest {
    #[schema(value_type = Uuid)]
    pub entity_id: EntityId,
    /// Audience override; defaults to the calling system's domain.
    #[serde(default)]
    pub audience: Option<Vec<String>>,
}

/// Request to issue an orchestration token.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct IssueOrchestrationRequest {
    #[schema(value_type = Uuid)]
    pub entity_id: EntityId,
    #[schema(value_type = Uuid)]
    pub orchestration_id: OrchestrationId,
    /// Role the token should claim, e.g. "Carrier".
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub audience: Option<Vec<String>>,
}

/// Request to revoke a token.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RevokeTokenRequest {
    pub reason: String,
}

/// Downstream usage report.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RecordUsageRequest {
    /// The system that accepted the token; defaults to the caller.
    #[serde(default)]
    pub used_by: Option<String>,
}

/// Build the token router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/tokens/assurance", post(issue_assurance))
        .route("/v1/tokens/orchestration", post(issue_orchestration))
        .route("/v1/tokens/:token_id", get(get_token_record))
        .route("/v1/tokens/:token_id/revoke", post(revoke_token))
        .route("/v1/tokens/:token_id/usage", post(record_usage))
}

/// POST /v1/tokens/assurance — Mint an assurance token.
#[utoipa::path(
    post,
    path = "/v1/tokens/assurance",
    request_body = IssueAssuranceRequest,
    responses(
        (status = 201, description = "Token minted"),
        (status = 401, description = "Caller not registered", body = crate::error::ErrorBody),
        (status = 403, description = "Caller lacks the issue operation", body = crate::error::ErrorBody),
        (status = 404, description = "Entity not found", body = crate::error::ErrorBody),
        (status = 429, description = "Issuance ceiling exhausted", body = crate::error::ErrorBody),
    ),
    tag = "tokens"
)]
pub async fn issue_assurance(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<IssueAssuranceRequest>,
) -> Result<impl IntoResponse, AppError> {
    let caller = authorize_caller(&state, &headers, AllowedOperation::Issue)?;

    let issued = state
        .issuer
        .issue_assurance(&caller, &req.entity_id, req.audience)?;

    persist_record(&state, &issued.token_id).await?;
    Ok((StatusCode::CREATED, Json(issued)))
}

/// POST /v1/tokens/orchestration — Mint an orchestration token.
#[utoipa::path(
    post,
    path = "/v1/tokens/orchestration",
    request_body = IssueOrchestrationRequest,
    responses(
        (status = 201, description = "Token minted"),
        (status = 404, description = "Entity or orchestration not found", body = crate::error::ErrorBody),
        (status = 409, description = "Orchestration is terminal", body = crate::error::ErrorBody),
        (status = 429, description = "Issuance ceiling exhausted", body = crate::error::ErrorBody),
    ),
    tag = "tokens"
)]
pub async fn issue_orchestration(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<IssueOrchestrationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let caller = authorize_caller(&state, &headers, AllowedOperation::Issue)?;

    let issued = state.issuer.issue_orchestration(
        &caller,
        &req.entity_id,
        &req.orchestration_id,
        req.role,
        req.audience,
    )?;

    persist_record(&state, &issued.token_id).await?;
    Ok((StatusCode::CREATED, Json(issued)))
}

/// GET /v1/tokens/:token_id — Fetch an issuance record.
///
/// The record carries the token hash and claims snapshot; the signed
/// token itself is never stored and never returned here.
#[utoipa::path(
    get,
    path = "/v1/tokens/{token_id}",
    params(("token_id" = Uuid, Path, description = "Token UUID")),
    responses(
        (status = 200, description = "Issuance record"),
        (status = 404, description = "No issuance record", body = crate::error::ErrorBody),
    ),
    tag = "tokens"
)]
pub async fn get_token_record(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(token_id): Path<TokenId>,
) -> Result<impl IntoResponse, AppError> {
    authorize_caller(&state, &headers, AllowedOperation::Lookup)?;

    let record = state
        .records
        .get(&token_id)
        .ok_or_else(|| AppError::NotFound(format!("no issuance record for token {token_id}")))?;
    Ok(Json(record))
}

/// POST /v1/tokens/:token_id/revoke — Revoke a token. Idempotent.
#[utoipa::path(
    post,
    path = "/v1/tokens/{token_id}/revoke",
    params(("token_id" = Uuid, Path, description = "Token UUID")),
    request_body = RevokeTokenRequest,
    responses(
        (status = 200, description = "Record after revocation"),
        (status = 404, description = "No issuance record", body = crate::error::ErrorBody),
    ),
    tag = "tokens"
)]
pub async fn revoke_token(
    State(state): State<AppState>,
    Path(token_id): Path<TokenId>,
    Json(req): Json<RevokeTokenRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.reason.trim().is_empty() {
        return Err(AppError::Validation("reason must not be empty".to_string()));
    }

    let record = state.issuer.revoke(&token_id, &req.reason)?;

    if let Some(pool) = &state.db_pool {
        db::tokens::save_token_record(pool, &record).await?;
    }
    Ok(Json(record))
}

/// POST /v1/tokens/:token_id/usage — Report a downstream acceptance.
#[utoipa::path(
    post,
    path = "/v1/tokens/{token_id}/usage",
    params(("token_id" = Uuid, Path, description = "Token UUID")),
    request_body = RecordUsageRequest,
    responses(
        (status = 200, description = "Record after the usage update"),
        (status = 404, description = "No issuance record", body = crate::error::ErrorBody),
    ),
    tag = "tokens"
)]
pub async fn record_usage(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(token_id): Path<TokenId>,
    Json(req): Json<RecordUsageRequest>,
) -> Result<impl IntoResponse, AppError> {
    authorize_caller(&state, &headers, AllowedOperation::Validate)?;
    let used_by = match req.used_by {
        Some(explicit) => explicit,
        None => caller_domain(&headers)?,
    };

    let record = state.issuer.record_usage(&token_id, &used_by)?;

    if let Some(pool) = &state.db_pool {
        db::tokens::save_token_record(pool, &record).await?;
    }
    Ok(Json(record))
}

/// Write-through of a freshly minted record.
pub async fn persist_record(state: &AppState, token_id: &TokenId) -> Result<(), AppError> {
    if let Some(pool) = &state.db_pool {
        if let Some(record) = state.records.get(token_id) {
            db::tokens::save_token_record(pool, &record).await?;
        }
    }
    Ok(())
}
