//! Web-search genre fallback
//!
//! Last-resort provider: issue a web search for `{artist} {title} genre`
//! and scrape the result page. Only two known result-panel shapes are
//! recognized; the class names are what the engine currently serves and
//! break whenever its markup changes, which is why this sits at the
//! bottom of the chain.

use async_trait::async_trait;
use regex::Regex;
use std::time::Duration;

use super::{GenreProvider, ProviderError};

const SEARCH_URL: &str = "https://www.google.com/search";
// A browser user agent; the search engine serves a stripped page to
// obvious bots.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                          AppleWebKit/537.36 (KHTML, like Gecko) \
                          Chrome/61.0.3163.100 Safari/537.36";

/// Web-search fallback provider.
pub struct WebSearchProvider {
    http_client: reqwest::Client,
    ranked_item: Regex,
    knowledge_panel: Regex,
}

impl WebSearchProvider {
    pub fn new() -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        // Shape (a): ranked-list item panel, genre in its title field.
        let ranked_item =
            Regex::new(r#"(?s)class="rl_item rl_item_base".*?class="title"[^>]*>([^<]+)"#)
                .map_err(|e| ProviderError::Parse(e.to_string()))?;
        // Shape (b): knowledge panel, genre adjacent to its heading.
        let knowledge_panel =
            Regex::new(r#"(?s)class="kp-hc".*?role="heading"[^>]*>\s*(?:<[^>]*>)?([^<]+)"#)
                .map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(Self {
            http_client,
            ranked_item,
            knowledge_panel,
        })
    }

    fn extract_genre(&self, html: &str) -> Option<String> {
        let captured = self
            .ranked_item
            .captures(html)
            .or_else(|| self.knowledge_panel.captures(html))?;

        let genre = captured.get(1)?.as_str().trim().to_lowercase();
        if genre.is_empty() {
            None
        } else {
            Some(genre)
        }
    }
}

#[async_trait]
impl GenreProvider for WebSearchProvider {
    fn name(&self) -> &'static str {
        "web-search"
    }

    async fn search(&self, artist: &str, title: &str) -> Result<Option<String>, ProviderError> {
        let query = format!("{} {} genre", artist, title);

        let response = match self
            .http_client
            .get(SEARCH_URL)
            .query(&[("q", query.as_str()), ("num", "1"), ("hl", "en")])
            .send()
            .await
        {
            Ok(response) => response,
            // Connection-level failures on this step are "no result",
            // not an error worth surfacing.
            Err(e) if e.is_connect() => {
                tracing::warn!(artist, title, error = %e, "Web search connection failed");
                return Ok(None);
            }
            Err(e) => return Err(ProviderError::Network(e.to_string())),
        };

        let html = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let genre = self.extract_genre(&html);
        tracing::debug!(artist, title, genre = ?genre, "Web search lookup");
        Ok(genre)
    }
}
