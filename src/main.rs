use anyhow::Context;
use std::sync::Arc;

use oilcheck_api::auth::rate_limit::spawn_cleanup_worker;
use oilcheck_api::config::{Config, StorageBackend};
use oilcheck_api::db::{ChallengeStore, MemoryStore, PgStore};
use oilcheck_api::services::clock::SystemClock;
use oilcheck_api::{build_router, cors_layer, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "oilcheck_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Arc::new(Config::from_env());

    let store: Arc<dyn ChallengeStore> = match config.storage_backend {
        StorageBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set")?;
            let store = PgStore::connect(url)
                .await
                .context("Failed to create database pool")?;
            store
                .migrate()
                .await
                .context("Failed to run database migrations")?;
            tracing::info!("Database migrations applied");
            Arc::new(store)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let state = AppState::new(store, config.clone(), Arc::new(SystemClock));
    spawn_cleanup_worker(state.rate_limiter.clone());

    let app = build_router(state).layer(cors_layer(&config));

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
