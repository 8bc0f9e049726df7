//! # Startup Hydration
//!
//! Loads persisted state from Postgres into the in-memory stores. Runs
//! once at boot, before the server accepts traffic.

use crate::db;
use crate::state::AppState;

/// Hydrate all in-memory stores from the database.
pub async fn hydrate(state: &AppState) -> Result<(), sqlx::Error> {
    let Some(pool) = &state.db_pool else {
        return Ok(());
    };

    let entities = db::entities::load_all_entities(pool).await?;
    let entity_count = entities.len();
    for entity in entities {
        state.directory.insert(entity);
    }

    let systems = db::external_systems::load_all_systems(pool).await?;
    let system_count = systems.len();
    for system in systems {
        state.systems.insert(system);
    }

    let orchestrations = db::orchestrations::load_all_orchestrations(pool).await?;
    let orchestration_count = orchestrations.len();
    for orchestration in orchestrations {
        state.orchestrations.insert(orchestration);
    }

    let tokens = db::tokens::load_all_token_records(pool).await?;
    let token_count = tokens.len();
    for token in tokens {
        state.records.insert(token);
    }

    let entries = db::validation_log::load_all_entries(pool).await?;
    let entry_count = entries.len();
    for entry in entries {
        state.validation_log.insert(entry);
    }

    tracing::info!(
        entities = entity_count,
        systems = system_count,
        orchestrations = orchestration_count,
        tokens = token_count,
        log_entries = entry_count,
        "state hydrated from database"
    );
    Ok(())
}
