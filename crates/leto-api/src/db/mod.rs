//! # Database Persistence Layer
//!
//! Optional Postgres persistence via SQLx. When `DATABASE_URL` is set,
//! the API write-throughs entity, token, orchestration, validation-log,
//! and external-system state and hydrates the in-memory stores at boot.
//! When absent, the service runs in-memory only (development and tests).
//!
//! This module is the only code issuing queries; no other component
//! touches storage directly. All writes stamp `updated_at` server-side —
//! one audit-timestamp convention everywhere.

pub mod entities;
pub mod external_systems;
pub mod orchestrations;
pub mod tokens;
pub mod validation_log;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Initialize the connection pool and run embedded migrations.
///
/// Returns `None` if `DATABASE_URL` is not set. The bounded
/// `acquire_timeout` makes stalled persistence writes fail cleanly
/// instead of hanging a request.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!(
                "DATABASE_URL not set — running in-memory only mode. \
                 State will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}
