//! Genre providers
//!
//! Each provider is one external data source answering the same
//! question: "what genre is this (artist, title) pair?". The resolver
//! consults them in fixed priority order; provider failures are
//! transient by definition and never escalate past the resolver.

pub mod catalog;
pub mod community;
pub mod web_search;

use async_trait::async_trait;
use thiserror::Error;

pub use catalog::CatalogProvider;
pub use community::CommunityProvider;
pub use web_search::WebSearchProvider;

/// Provider errors, all treated as "no result" by the resolver.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// A single external genre source.
///
/// `name()` doubles as the provider's resource-lock key, so each
/// provider is throttled independently and providers can run
/// back-to-back without waiting on each other's cooldown.
#[async_trait]
pub trait GenreProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Look up a genre tag for the pair, `None` when the source has no
    /// answer.
    async fn search(&self, artist: &str, title: &str) -> Result<Option<String>, ProviderError>;
}
