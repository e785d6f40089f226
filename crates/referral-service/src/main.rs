//! Referral Service
//!
//! REST API for referral campaigns, rewards and analytics

use anyhow::{Context, Result};
use referral_service::{
    create_router, AppState, Config, MemoryStore, RedisStore, Repository, StorageBackend,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "referral_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    info!("Starting Referral Service");
    info!("Storage backend: {:?}", config.storage_backend);
    info!("Public origin: {}", config.public_origin);

    let repo = match config.storage_backend {
        StorageBackend::Redis => {
            let store = RedisStore::new(&config.redis_url)
                .await
                .context("Failed to initialize storage")?;
            Repository::new(store)
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage; data is lost on exit");
            Repository::new(MemoryStore::new())
        }
    };

    let state = AppState::new(repo, config.public_origin.clone());
    let app = create_router(state);

    let addr = config.api_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    info!("Referral Service running on http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
