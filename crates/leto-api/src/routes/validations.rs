// SPDX-License-Identifier: Apache-2.0
//! # Validation Endpoints
//!
//! Orchestration-token validation and the validation log. Validation
//! always answers 200 with the result taxonomy in the payload — an
//! invalid token is a business outcome, not a transport error. Only a
//! malformed request body (not a malformed token) is a 422.
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | `POST` | `/v1/validations` | `validate_token` |
//! | `GET` | `/v1/validations` | `query_log` |

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use leto_core::{OrchestrationId, TokenId};
use leto_token::{ValidationExpectations, ValidationResultCode};
use leto_trust::AllowedOperation;

use crate::auth::{authorize_caller, caller_domain};
use crate::db;
use crate::error::AppError;
use crate::state::AppState;

/// Request to validate a presented orchestration token.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ValidateTokenRequest {
    /// The opaque signed token string.
    pub token: String,
    /// Assert the token targets this orchestration.
    #[serde(default)]
    #[schema(value_type = Option<Uuid>)]
    pub expected_orchestration_id: Option<OrchestrationId>,
    /// Assert the subject holds this role.
    #[serde(default)]
    pub expected_role: Option<String>,
}

/// Log query filters.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LogQuery {
    #[schema(value_type = Option<Uuid>)]
    pub orchestration_id: Option<OrchestrationId>,
    #[schema(value_type = Option<Uuid>)]
    pub token_id: Option<TokenId>,
    /// One of `valid`, `invalid`, `expired`, `revoked`, `not_found`,
    /// `signature_invalid`.
    pub result: Option<String>,
}

/// Build the validation router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/validations", post(validate_token).get(query_log))
}

/// POST /v1/validations — Validate an orchestration token.
#[utoipa::path(
    post,
    path = "/v1/validations",
    request_body = ValidateTokenRequest,
    responses(
        (status = 200, description = "Validation outcome — validity is a payload field"),
        (status = 401, description = "Caller not registered", body = crate::error::ErrorBody),
        (status = 403, description = "Caller lacks the validate operation", body = crate::error::ErrorBody),
    ),
    tag = "validations"
)]
pub async fn validate_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ValidateTokenRequest>,
) -> Result<impl IntoResponse, AppError> {
    authorize_caller(&state, &headers, AllowedOperation::Validate)?;
    let requester = caller_domain(&headers)?;

    if req.token.trim().is_empty() {
        return Err(AppError::Validation("token must not be empty".to_string()));
    }

    let outcome = state.validator.validate(
        &req.token,
        &requester,
        &ValidationExpectations {
            orchestration_id: req.expected_orchestration_id,
            role: req.expected_role,
        },
    );

    // Write-through of the log entry this attempt produced.
    if let Some(pool) = &state.db_pool {
        if let Some(entry) = state.validation_log.get_by_entry_id(&outcome.reference) {
            db::validation_log::append_entry(pool, &entry).await?;
        }
    }

    Ok(Json(outcome))
}

/// GET /v1/validations — Query the validation log.
#[utoipa::path(
    get,
    path = "/v1/validations",
    params(
        ("orchestration_id" = Option<Uuid>, Query, description = "Filter by orchestration"),
        ("token_id" = Option<Uuid>, Query, description = "Filter by token"),
        ("result" = Option<String>, Query, description = "Filter by result code"),
    ),
    responses(
        (status = 200, description = "Matching log entries"),
        (status = 422, description = "Unknown result code", body = crate::error::ErrorBody),
    ),
    tag = "validations"
)]
pub async fn query_log(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LogQuery>,
) -> Result<impl IntoResponse, AppError> {
    authorize_caller(&state, &headers, AllowedOperation::Lookup)?;

    let result_filter = query
        .result
        .as_deref()
        .map(|s| {
            ValidationResultCode::parse(s)
                .ok_or_else(|| AppError::Validation(format!("unknown result code: {s:?}")))
        })
        .transpose()?;

    let entries: Vec<_> = state
        .validation_log
        .snapshot()
        .into_iter()
        .filter(|e| {
            query
                .orchestration_id
                .map_or(true, |id| e.orchestration_id == Some(id))
        })
        .filter(|e| query.token_id.map_or(true, |id| e.token_id == Some(id)))
        .filter(|e| result_filter.map_or(true, |r| e.result == r))
        .collect();

    Ok(Json(serde_json::json!({
        "entries": entries,
        "total": entries.len(),
    })))
}
