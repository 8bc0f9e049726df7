//! # leto-api — Axum API Services for the LETO Stack
//!
//! The REST surface over the trust subsystem: legal-entity registration
//! and verification, assurance/orchestration token issuance, the
//! orchestration registry, token validation, and the validation log.
//!
//! ## API Surface
//!
//! | Prefix | Module | Domain |
//! |---|---|---|
//! | `/v1/entities/*` | [`routes::entities`] | Registration, evidence, sweep |
//! | `/v1/tokens/*` | [`routes::tokens`] | Issuance, revocation, usage |
//! | `/v1/validations` | [`routes::validations`] | Validation + audit log |
//! | `/v1/orchestrations/*` | [`routes::orchestrations`] | Orchestrations |
//! | `/v1/systems/*` | [`routes::systems`] | External-system admin |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```
//!
//! Health probes (`/health/*`), `/metrics`, and `/openapi.json` are
//! mounted outside the auth middleware so they stay reachable without
//! credentials.

pub mod auth;
pub mod bootstrap;
pub mod db;
pub mod error;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use leto_orchestration::OrchestrationStatus;
use leto_trust::Tier;

use crate::auth::AuthConfig;
use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

/// Assemble the full application router.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let metrics = ApiMetrics::new();

    // Authenticated API routes.
    //
    // Body size limit: 1 MiB — tokens and business-key maps are small;
    // anything larger is not a legitimate request.
    let api = Router::new()
        .merge(routes::entities::router())
        .merge(routes::tokens::router())
        .merge(routes::validations::router())
        .merge(routes::orchestrations::router())
        .merge(routes::systems::router())
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(auth_config))
        .layer(Extension(metrics.clone()))
        .with_state(state.clone());

    // Unauthenticated probes, metrics scrape, and API docs.
    let unauthenticated = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness))
        .route("/metrics", axum::routing::get(prometheus_metrics))
        .merge(openapi::router())
        .layer(Extension(metrics))
        .with_state(state);

    Router::new().merge(unauthenticated).merge(api)
}

/// Liveness probe — 200 whenever the process runs.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — verifies the service can do useful work.
///
/// Checks the signing key, the in-memory stores, and (when configured)
/// the database connection.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if state.verifying_key.to_hex().len() != 64 {
        return (StatusCode::SERVICE_UNAVAILABLE, "signing key degraded").into_response();
    }

    // Stores must be reachable (no poisoned locks).
    let _ = state.directory.len();
    let _ = state.orchestrations.len();
    let _ = state.records.len();
    let _ = state.validation_log.len();

    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!(error = %e, "database health check failed");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
        }
    }

    (StatusCode::OK, "ready").into_response()
}

/// GET /metrics — Prometheus scrape endpoint.
///
/// Updates the domain gauges from current state on each scrape (pull
/// model), then encodes all families in text exposition format.
async fn prometheus_metrics(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> impl IntoResponse {
    // Entities by tier.
    metrics.entities_total().reset();
    for entity in state.directory.list() {
        metrics
            .entities_total()
            .with_label_values(&[&entity.tier.to_string()])
            .inc();
    }
    // Make sure all tier labels exist even at zero.
    for tier in [Tier::Tier1, Tier::Tier2, Tier::Tier3] {
        metrics
            .entities_total()
            .with_label_values(&[&tier.to_string()])
            .add(0);
    }

    // Orchestrations by status.
    metrics.orchestrations_total().reset();
    for orchestration in state.orchestrations.list() {
        metrics
            .orchestrations_total()
            .with_label_values(&[orchestration.status.as_str()])
            .inc();
    }
    for status in [
        OrchestrationStatus::Active,
        OrchestrationStatus::Completed,
        OrchestrationStatus::Cancelled,
    ] {
        metrics
            .orchestrations_total()
            .with_label_values(&[status.as_str()])
            .add(0);
    }

    // Token and log totals.
    let records = state.records.list();
    metrics.issued_tokens_total().set(records.len() as i64);
    metrics
        .revoked_tokens_total()
        .set(records.iter().filter(|r| r.revoked).count() as i64);
    metrics
        .validation_log_entries_total()
        .set(state.validation_log.len() as i64);
    metrics
        .signing_key_ephemeral()
        .set(if state.key_ephemeral { 1 } else { 0 });

    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}
