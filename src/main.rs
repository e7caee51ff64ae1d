//! groovesync - social music graph sync and genre enrichment service
//!
//! Ingests a user's social graph and listening history, enriches every
//! track with a genre tag resolved through a prioritized provider
//! chain, and keeps the persisted snapshot in sync with remote state.
//! Updates are submitted over HTTP and run as background job chains on
//! the tokio pool; all cross-worker coordination (locks, job status)
//! lives in the shared database.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use groovesync::config::{self, TomlConfig};
use groovesync::services::{
    providers::{CatalogProvider, CommunityProvider, GenreProvider, WebSearchProvider},
    DedupMerger, GenreResolver, ResourceLocks, SocialGraphClient, UpdateOrchestrator,
};
use groovesync::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting groovesync");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Configuration and credentials, loaded once at process start.
    let toml_config = TomlConfig::load_from_env()?;
    let social_token = config::resolve_social_token(&toml_config)?;
    let catalog_token = config::resolve_catalog_token(&toml_config)?;

    // Shared database: snapshot plus cross-worker coordination tables.
    let db_path = toml_config.database_path();
    info!("Database: {}", db_path.display());
    let db_pool = groovesync::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    let locks = Arc::new(ResourceLocks::new(db_pool.clone()));

    // Shared service objects, constructed once and passed by reference
    // into every job.
    let social = Arc::new(
        SocialGraphClient::new(social_token, Arc::clone(&locks))
            .map_err(|e| anyhow::anyhow!("failed to create social client: {}", e))?,
    );

    let providers: Vec<Arc<dyn GenreProvider>> = vec![
        Arc::new(
            CatalogProvider::new(catalog_token)
                .map_err(|e| anyhow::anyhow!("failed to create catalog provider: {}", e))?,
        ),
        Arc::new(
            CommunityProvider::new()
                .map_err(|e| anyhow::anyhow!("failed to create community provider: {}", e))?,
        ),
        Arc::new(
            WebSearchProvider::new()
                .map_err(|e| anyhow::anyhow!("failed to create web search provider: {}", e))?,
        ),
    ];

    let resolver = Arc::new(GenreResolver::new(
        db_pool.clone(),
        Arc::clone(&locks),
        providers,
    ));
    let merger = Arc::new(DedupMerger::new(db_pool.clone(), Arc::clone(&locks)));

    let orchestrator = Arc::new(UpdateOrchestrator::new(
        db_pool.clone(),
        social,
        resolver,
        merger,
    ));

    let state = AppState::new(db_pool, orchestrator);
    let app = groovesync::build_router(state);

    let bind_address = toml_config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
