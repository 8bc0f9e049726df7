//! # OpenAPI Document
//!
//! Auto-generated OpenAPI spec from the utoipa path annotations on the
//! route handlers, served at `/openapi.json` (unauthenticated, like the
//! health probes).

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::routes;
use crate::state::AppState;

/// The assembled API documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "LETO Stack API",
        description = "Legal-entity trust tiers, signed assurance and \
                       orchestration tokens, and orchestration-token validation.",
    ),
    paths(
        routes::entities::register_entity,
        routes::entities::get_entity,
        routes::entities::submit_evidence,
        routes::entities::run_sweep,
        routes::tokens::issue_assurance,
        routes::tokens::issue_orchestration,
        routes::tokens::get_token_record,
        routes::tokens::revoke_token,
        routes::tokens::record_usage,
        routes::validations::validate_token,
        routes::validations::query_log,
        routes::orchestrations::create_orchestration,
        routes::orchestrations::get_orchestration,
        routes::orchestrations::add_participant,
        routes::orchestrations::remove_participant,
        routes::orchestrations::set_status,
        routes::systems::register_system,
        routes::systems::list_systems,
        routes::systems::approve_system,
        routes::systems::revoke_system,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        routes::entities::RegisterEntityRequest,
        routes::entities::SubmitEvidenceRequest,
        routes::tokens::IssueAssuranceRequest,
        routes::tokens::IssueOrchestrationRequest,
        routes::tokens::RevokeTokenRequest,
        routes::tokens::RecordUsageRequest,
        routes::validations::ValidateTokenRequest,
        routes::orchestrations::CreateOrchestrationRequest,
        routes::orchestrations::AddParticipantRequest,
        routes::orchestrations::SetStatusRequest,
        routes::systems::RegisterSystemRequest,
    )),
    tags(
        (name = "entities", description = "Legal-entity registration and verification"),
        (name = "tokens", description = "Token issuance and lifecycle"),
        (name = "validations", description = "Orchestration-token validation"),
        (name = "orchestrations", description = "Orchestration registry"),
        (name = "systems", description = "External-system administration"),
    )
)]
pub struct ApiDoc;

/// Router serving the OpenAPI document.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_contains_core_paths() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_value(&doc).unwrap();
        let paths = json["paths"].as_object().unwrap();
        for path in [
            "/v1/entities",
            "/v1/tokens/assurance",
            "/v1/validations",
            "/v1/orchestrations",
            "/v1/systems",
        ] {
            assert!(paths.contains_key(path), "missing {path}");
        }
    }
}
