//! # leto-api server entry point
//!
//! Parses command-line arguments, initializes tracing, connects to the
//! database (when configured), hydrates in-memory state, spawns the
//! periodic downgrade sweep, and serves the API.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use leto_api::state::{AppConfig, AppState};

/// LETO Stack API server.
///
/// Legal-entity trust tiers, signed assurance and orchestration tokens,
/// and orchestration-token validation.
#[derive(Parser, Debug)]
#[command(name = "leto-api", version, about, long_about = None)]
struct Args {
    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Issuer identity placed in the `iss` claim of minted tokens.
    #[arg(long, default_value = "registry.example.com")]
    issuer_id: String,

    /// Interval between downgrade sweeps, in seconds.
    #[arg(long, default_value_t = 3600)]
    sweep_interval_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let auth_token = std::env::var("LETO_AUTH_TOKEN")
        .ok()
        .filter(|t| !t.is_empty())
        .map(leto_api::auth::SecretString::new);
    if auth_token.is_none() {
        tracing::warn!("LETO_AUTH_TOKEN not set — service-level auth is disabled");
    }

    let config = AppConfig {
        port: args.port,
        auth_token,
        issuer_id: args.issuer_id,
    };

    let db_pool = leto_api::db::init_pool().await?;
    let state = AppState::with_config(config, db_pool);
    leto_api::bootstrap::hydrate(&state).await?;

    spawn_sweep_task(state.clone(), args.sweep_interval_secs);

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "leto-api listening");

    axum::serve(listener, leto_api::app(state)).await?;
    Ok(())
}

/// Periodic Tier-2 downgrade sweep. Runs as an interval batch job; each
/// run is independently safe to repeat.
fn spawn_sweep_task(state: AppState, interval_secs: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(60)));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick fires immediately; skip it so startup stays fast.
        interval.tick().await;

        loop {
            interval.tick().await;
            let report = state.evaluator.run_sweep();
            if !report.downgraded.is_empty() {
                if let Some(pool) = &state.db_pool {
                    for entity_id in &report.downgraded {
                        if let Some(entity) = state.directory.get(entity_id) {
                            if let Err(e) = leto_api::db::entities::save_entity(pool, &entity).await
                            {
                                tracing::warn!(
                                    entity_id = %entity_id,
                                    error = %e,
                                    "failed to persist sweep downgrade"
                                );
                            }
                        }
                    }
                }
            }
        }
    });
}
