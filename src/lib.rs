//! groovesync library interface
//!
//! Exposes the sync/enrichment pipeline and the HTTP surface for
//! integration testing.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::services::{ProgressTracker, UpdateOrchestrator};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Shared database connection pool
    pub db: SqlitePool,
    /// Job chain entry point
    pub orchestrator: Arc<UpdateOrchestrator>,
    /// Per-user update status reader
    pub progress: ProgressTracker,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, orchestrator: Arc<UpdateOrchestrator>) -> Self {
        Self {
            progress: ProgressTracker::new(db.clone()),
            db,
            orchestrator,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::update_routes())
        .merge(api::health_routes())
        .with_state(state)
}
