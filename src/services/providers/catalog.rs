//! Catalog genre provider (Discogs)
//!
//! Highest-priority provider: a release-database search by artist and
//! track. The top search hit answers with its first style tag, falling
//! back to its first (broader) genre tag.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::{GenreProvider, ProviderError};

const CATALOG_BASE_URL: &str = "https://api.discogs.com/database/search";
const USER_AGENT: &str = "groovesync/0.1.0";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    style: Vec<String>,
    #[serde(default)]
    genre: Vec<String>,
}

/// Discogs-backed catalog provider.
pub struct CatalogProvider {
    http_client: reqwest::Client,
    token: String,
}

impl CatalogProvider {
    pub fn new(token: String) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(Self { http_client, token })
    }
}

#[async_trait]
impl GenreProvider for CatalogProvider {
    fn name(&self) -> &'static str {
        "catalog"
    }

    async fn search(&self, artist: &str, title: &str) -> Result<Option<String>, ProviderError> {
        let response = self
            .http_client
            .get(CATALOG_BASE_URL)
            .query(&[
                ("type", "release"),
                ("artist", artist),
                ("track", title),
                ("token", self.token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Network(format!(
                "catalog search returned {}: {}",
                status, body
            )));
        }

        let search: SearchResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let genre = top_hit_genre(&search.results);
        tracing::debug!(artist, title, genre = ?genre, "Catalog provider lookup");
        Ok(genre)
    }
}

/// First style tag of the top hit, else its first genre tag, else none.
fn top_hit_genre(results: &[SearchResult]) -> Option<String> {
    let top = results.first()?;
    top.style
        .first()
        .or_else(|| top.genre.first())
        .map(|tag| tag.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_preferred_over_genre() {
        let results = vec![SearchResult {
            style: vec!["Post Rock".to_string()],
            genre: vec!["Rock".to_string()],
        }];
        assert_eq!(top_hit_genre(&results), Some("post rock".to_string()));
    }

    #[test]
    fn genre_used_when_no_style() {
        let results = vec![SearchResult {
            style: vec![],
            genre: vec!["Jazz".to_string()],
        }];
        assert_eq!(top_hit_genre(&results), Some("jazz".to_string()));
    }

    #[test]
    fn only_top_hit_is_considered() {
        let results = vec![
            SearchResult {
                style: vec![],
                genre: vec![],
            },
            SearchResult {
                style: vec!["Blues".to_string()],
                genre: vec![],
            },
        ];
        assert_eq!(top_hit_genre(&results), None);
    }

    #[test]
    fn empty_results_yield_none() {
        assert_eq!(top_hit_genre(&[]), None);
    }
}
