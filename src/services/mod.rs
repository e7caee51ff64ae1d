//! Core pipeline services

pub mod dedup_merger;
pub mod genre_resolver;
pub mod progress;
pub mod providers;
pub mod resource_lock;
pub mod social_client;
pub mod sync_engine;
pub mod update_orchestrator;

pub use dedup_merger::DedupMerger;
pub use genre_resolver::GenreResolver;
pub use progress::{ProgressTracker, UpdateStatus};
pub use resource_lock::ResourceLocks;
pub use social_client::SocialGraphClient;
pub use sync_engine::SyncEngine;
pub use update_orchestrator::UpdateOrchestrator;
