//! Community-tag genre provider (MusicBrainz)
//!
//! Second-priority provider. Searches matching recordings, then walks a
//! three-step tag lookup on the best candidate: tags on the recording
//! itself, tags on any of its releases, finally tags on the credited
//! artist. The artist lookup is a second remote call made under the
//! same lock hold and paced to the same per-call interval.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::{Duration, Instant};

use super::{GenreProvider, ProviderError};

const COMMUNITY_BASE_URL: &str = "https://musicbrainz.org/ws/2";
const USER_AGENT: &str = "groovesync/0.1.0 (https://github.com/groovesync/groovesync)";

/// Minimum spacing between the search call and the artist sub-lookup.
const SUB_LOOKUP_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Deserialize)]
struct RecordingSearchResponse {
    #[serde(default)]
    recordings: Vec<Recording>,
}

#[derive(Debug, Clone, Deserialize)]
struct Recording {
    /// Search relevance score, 0-100.
    #[serde(default)]
    score: i64,
    #[serde(default)]
    tags: Vec<Tag>,
    #[serde(default)]
    releases: Vec<Release>,
    #[serde(rename = "artist-credit", default)]
    artist_credit: Vec<ArtistCredit>,
}

#[derive(Debug, Clone, Deserialize)]
struct Release {
    #[serde(default)]
    tags: Vec<Tag>,
}

#[derive(Debug, Clone, Deserialize)]
struct ArtistCredit {
    artist: CreditedArtist,
}

#[derive(Debug, Clone, Deserialize)]
struct CreditedArtist {
    id: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ArtistLookupResponse {
    #[serde(default)]
    tags: Vec<Tag>,
}

#[derive(Debug, Clone, Deserialize)]
struct Tag {
    name: String,
    #[serde(default)]
    count: i64,
}

/// MusicBrainz-backed community-tag provider.
pub struct CommunityProvider {
    http_client: reqwest::Client,
}

impl CommunityProvider {
    pub fn new() -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(Self { http_client })
    }

    async fn search_recordings(
        &self,
        artist: &str,
        title: &str,
    ) -> Result<Vec<Recording>, ProviderError> {
        let query = format!("recording:\"{}\" AND artist:\"{}\"", title, artist);
        let url = format!("{}/recording", COMMUNITY_BASE_URL);

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("query", query.as_str()),
                ("fmt", "json"),
                ("limit", "100"),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Network(format!(
                "recording search returned {}: {}",
                status, body
            )));
        }

        let search: RecordingSearchResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(search.recordings)
    }

    async fn lookup_artist_tags(&self, artist_id: &str) -> Result<Vec<Tag>, ProviderError> {
        let url = format!("{}/artist/{}", COMMUNITY_BASE_URL, artist_id);

        let response = self
            .http_client
            .get(&url)
            .query(&[("inc", "tags"), ("fmt", "json")])
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Network(format!(
                "artist lookup returned {}: {}",
                status, body
            )));
        }

        let lookup: ArtistLookupResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(lookup.tags)
    }
}

#[async_trait]
impl GenreProvider for CommunityProvider {
    fn name(&self) -> &'static str {
        "community"
    }

    async fn search(&self, artist: &str, title: &str) -> Result<Option<String>, ProviderError> {
        let search_started = Instant::now();
        let mut recordings = self.search_recordings(artist, title).await?;
        recordings.sort_by(|a, b| b.score.cmp(&a.score));

        let Some(top) = recordings.first() else {
            return Ok(None);
        };

        // 1. Tags carried directly by the best candidate.
        if let Some(tag) = best_tag(&top.tags) {
            tracing::debug!(artist, title, tag, "Community tag from recording");
            return Ok(Some(tag));
        }

        // 2. First parent release carrying tags.
        if let Some(tag) = release_tag(&top.releases) {
            tracing::debug!(artist, title, tag, "Community tag from release");
            return Ok(Some(tag));
        }

        // 3. The credited artist entity. This is a second remote call:
        //    the lock hold continues, so only the pacing applies, and
        //    only for the interval the search call has not already used.
        let Some(credit) = top.artist_credit.first() else {
            return Ok(None);
        };
        let wait = sub_lookup_wait(search_started.elapsed());
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
        let artist_tags = self.lookup_artist_tags(&credit.artist.id).await?;

        let tag = best_tag(&artist_tags);
        tracing::debug!(artist, title, tag = ?tag, "Community tag from artist");
        Ok(tag)
    }
}

/// Remaining pacing delay before the artist sub-lookup may fire.
fn sub_lookup_wait(elapsed: Duration) -> Duration {
    SUB_LOOKUP_INTERVAL.saturating_sub(elapsed)
}

/// The tag with the highest occurrence count, lower-cased.
fn best_tag(tags: &[Tag]) -> Option<String> {
    tags.iter()
        .max_by_key(|tag| tag.count)
        .map(|tag| tag.name.to_lowercase())
}

/// Highest-counted tag on the first release that carries any tags.
fn release_tag(releases: &[Release]) -> Option<String> {
    releases
        .iter()
        .find(|release| !release.tags.is_empty())
        .and_then(|release| best_tag(&release.tags))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(name: &str, count: i64) -> Tag {
        Tag {
            name: name.to_string(),
            count,
        }
    }

    #[test]
    fn best_tag_picks_highest_count() {
        let tags = vec![tag("rock", 2), tag("pop", 5)];
        assert_eq!(best_tag(&tags), Some("pop".to_string()));
    }

    #[test]
    fn best_tag_empty_is_none() {
        assert_eq!(best_tag(&[]), None);
    }

    #[test]
    fn release_tags_scanned_in_order() {
        let releases = vec![
            Release { tags: vec![] },
            Release {
                tags: vec![tag("ambient", 1), tag("idm", 7)],
            },
            Release {
                tags: vec![tag("noise", 99)],
            },
        ];
        assert_eq!(release_tag(&releases), Some("idm".to_string()));
    }

    #[test]
    fn candidates_sorted_by_relevance() {
        let mut recordings = vec![
            Recording {
                score: 40,
                tags: vec![tag("wrong", 9)],
                releases: vec![],
                artist_credit: vec![],
            },
            Recording {
                score: 100,
                tags: vec![tag("right", 1)],
                releases: vec![],
                artist_credit: vec![],
            },
        ];
        recordings.sort_by(|a, b| b.score.cmp(&a.score));
        assert_eq!(best_tag(&recordings[0].tags), Some("right".to_string()));
    }

    #[test]
    fn sub_lookup_sleeps_only_the_remainder() {
        assert_eq!(sub_lookup_wait(Duration::ZERO), SUB_LOOKUP_INTERVAL);
        assert_eq!(
            sub_lookup_wait(Duration::from_millis(400)),
            Duration::from_millis(600)
        );
        assert_eq!(sub_lookup_wait(Duration::from_secs(3)), Duration::ZERO);
    }

    #[test]
    fn search_response_parses() {
        let payload = r#"
        {
            "recordings": [
                {
                    "score": 100,
                    "tags": [{"name": "Rock", "count": 2}, {"name": "Pop", "count": 5}],
                    "artist-credit": [{"artist": {"id": "abc-123"}}]
                }
            ]
        }
        "#;
        let parsed: RecordingSearchResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(parsed.recordings.len(), 1);
        assert_eq!(best_tag(&parsed.recordings[0].tags), Some("pop".to_string()));
    }
}
