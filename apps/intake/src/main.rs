mod backend_client;
mod config;
mod errors;
mod models;
mod nic;
mod routes;
mod state;
mod storage;
mod wizard;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::backend_client::HttpBackend;
use crate::config::Config;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::SessionStores;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting KL Edits intake v{}", env!("CARGO_PKG_VERSION"));

    let backend = HttpBackend::from_config(&config);
    info!(
        "Order backend: {} (health {}, submit {})",
        config.backend_url, config.backend_health_path, config.backend_submit_path
    );

    let stores = match &config.session_dir {
        Some(dir) => {
            info!("Persisting session documents under {}", dir.display());
            SessionStores::on_disk(dir)
        }
        None => {
            info!("Keeping session documents in memory");
            SessionStores::in_memory()
        }
    };

    let state = AppState::new(config.clone(), Arc::new(backend), stores);
    state.spawn_idle_sweeper();
    info!("Idle sessions expire after {}s", config.session_idle_secs);

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict to the storefront origin once it has a fixed domain

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
