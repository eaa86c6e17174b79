mod config;
mod db;
mod errors;
mod models;
mod progression;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::progression::policy::ProgressionConfig;
use crate::progression::service::ProgressionService;
use crate::progression::store::{MemoryProgressStore, PgProgressStore, ProgressStore};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (everything is optional; only a malformed PORT fails)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting edmap API v{}", env!("CARGO_PKG_VERSION"));

    // Progression policy: bands, blend, role weights, paths
    let policy = Arc::new(ProgressionConfig::load(
        config.progression_config_path.as_deref(),
    )?);
    info!(
        "Progression policy loaded: {} competencies, {} paths, {} role tables",
        policy.competencies.len(),
        policy.paths.len(),
        policy.role_weights.len()
    );

    // Initialize storage: PostgreSQL when configured, in-memory otherwise
    let store: Arc<dyn ProgressStore> = match &config.database_url {
        Some(url) => Arc::new(PgProgressStore::new(create_pool(url).await?)),
        None => {
            warn!("DATABASE_URL not set; using in-memory store (state is lost on restart)");
            Arc::new(MemoryProgressStore::new())
        }
    };

    let state = AppState {
        progression: ProgressionService::new(policy.clone(), store),
        policy,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the dashboard host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
