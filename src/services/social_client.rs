//! Social-graph API client
//!
//! One logical remote session shared by the whole worker pool. The
//! underlying session is stateful and not safe for concurrent use, so
//! every method is serialized through the `social-session` lock
//! (exclusion only, no pacing interval).

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::services::resource_lock::{LockError, ResourceLocks};

const API_BASE_URL: &str = "https://api.vk.com/method";
const API_VERSION: &str = "5.131";
const USER_AGENT: &str = "groovesync/0.1.0";

/// Lock name serializing all access to the remote session.
pub const SOCIAL_SESSION_LOCK: &str = "social-session";

/// Remote error code for an invalid or expired session token.
const ERROR_AUTH_FAILED: i64 = 5;
/// Remote error codes for a library the caller may not read.
const ERROR_ACCESS_DENIED: i64 = 15;
const ERROR_AUDIO_ACCESS_DENIED: i64 = 201;

/// Social-graph client errors
#[derive(Debug, Error)]
pub enum SocialError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("API error {0}: {1}")]
    Api(i64, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error(transparent)]
    Lock(#[from] LockError),
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    response: Option<T>,
    error: Option<RemoteError>,
}

#[derive(Debug, Deserialize)]
struct RemoteError {
    error_code: i64,
    error_msg: String,
}

#[derive(Debug, Deserialize)]
struct FriendsResponse {
    items: Vec<FriendEntry>,
}

#[derive(Debug, Deserialize)]
struct FriendEntry {
    id: i64,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    /// Present (e.g. "deleted", "banned") for deactivated accounts.
    deactivated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserEntry {
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
}

#[derive(Debug, Deserialize)]
struct AudioResponse {
    items: Vec<AudioEntry>,
}

#[derive(Debug, Deserialize)]
struct AudioEntry {
    artist: String,
    title: String,
}

/// Serialized accessor to the remote social-network account.
pub struct SocialGraphClient {
    http_client: reqwest::Client,
    token: String,
    locks: Arc<ResourceLocks>,
}

impl SocialGraphClient {
    pub fn new(token: String, locks: Arc<ResourceLocks>) -> Result<Self, SocialError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SocialError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            token,
            locks,
        })
    }

    /// Fetch the user's friend list as id → display name.
    ///
    /// Entries the remote flags as deactivated are excluded.
    pub async fn fetch_friends(&self, user_id: i64) -> Result<HashMap<i64, String>, SocialError> {
        self.locks
            .run(
                SOCIAL_SESSION_LOCK,
                Duration::ZERO,
                self.friends_call(user_id),
            )
            .await?
    }

    /// Fetch the user's display name.
    pub async fn fetch_username(&self, user_id: i64) -> Result<String, SocialError> {
        self.locks
            .run(
                SOCIAL_SESSION_LOCK,
                Duration::ZERO,
                self.username_call(user_id),
            )
            .await?
    }

    /// Fetch the user's track list as (artist, title) pairs.
    ///
    /// Both fields are lower-cased for downstream matching. A remote
    /// access-denied response yields an empty list rather than failing
    /// the caller; empty means "could not fetch" downstream.
    pub async fn fetch_tracks(&self, user_id: i64) -> Result<Vec<(String, String)>, SocialError> {
        self.locks
            .run(
                SOCIAL_SESSION_LOCK,
                Duration::ZERO,
                self.tracks_call(user_id),
            )
            .await?
    }

    async fn friends_call(&self, user_id: i64) -> Result<HashMap<i64, String>, SocialError> {
        let response: FriendsResponse = self
            .call(
                "friends.get",
                &[
                    ("user_id", user_id.to_string()),
                    ("fields", "first_name,last_name".to_string()),
                ],
            )
            .await?;

        let friends: HashMap<i64, String> = response
            .items
            .iter()
            .filter(|entry| entry.deactivated.is_none())
            .map(|entry| (entry.id, display_name(&entry.first_name, &entry.last_name)))
            .collect();

        tracing::debug!(user_id, count = friends.len(), "Fetched friend list");
        Ok(friends)
    }

    async fn username_call(&self, user_id: i64) -> Result<String, SocialError> {
        let response: Vec<UserEntry> = self
            .call("users.get", &[("user_ids", user_id.to_string())])
            .await?;

        let entry = response
            .first()
            .ok_or_else(|| SocialError::Parse(format!("no profile returned for {}", user_id)))?;

        Ok(display_name(&entry.first_name, &entry.last_name))
    }

    async fn tracks_call(&self, user_id: i64) -> Result<Vec<(String, String)>, SocialError> {
        let result: Result<AudioResponse, SocialError> = self
            .call("audio.get", &[("owner_id", user_id.to_string())])
            .await;

        tracks_or_empty(user_id, result)
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<T, SocialError> {
        let url = format!("{}/{}", API_BASE_URL, method);

        let mut query: Vec<(&str, String)> = params.to_vec();
        query.push(("access_token", self.token.clone()));
        query.push(("v", API_VERSION.to_string()));

        let response = self
            .http_client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| SocialError::Network(e.to_string()))?;

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| SocialError::Parse(e.to_string()))?;

        if let Some(error) = envelope.error {
            return Err(remote_error(error));
        }

        envelope
            .response
            .ok_or_else(|| SocialError::Parse(format!("empty response from {}", method)))
    }
}

/// Classify a remote error payload; auth failures get their own variant
/// so callers can distinguish a dead session from a per-call refusal.
fn remote_error(error: RemoteError) -> SocialError {
    if error.error_code == ERROR_AUTH_FAILED {
        SocialError::Auth(error.error_msg)
    } else {
        SocialError::Api(error.error_code, error.error_msg)
    }
}

/// Map an access-denied library to an empty track list; every other
/// outcome passes through. Both fields are lower-cased on the way out.
fn tracks_or_empty(
    user_id: i64,
    result: Result<AudioResponse, SocialError>,
) -> Result<Vec<(String, String)>, SocialError> {
    match result {
        Ok(response) => {
            let tracks: Vec<(String, String)> = response
                .items
                .iter()
                .map(|t| (t.artist.to_lowercase(), t.title.to_lowercase()))
                .collect();
            tracing::debug!(user_id, count = tracks.len(), "Fetched track list");
            Ok(tracks)
        }
        Err(SocialError::Api(code, _))
            if code == ERROR_ACCESS_DENIED || code == ERROR_AUDIO_ACCESS_DENIED =>
        {
            tracing::info!(user_id, "Track library not accessible, treating as empty");
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}

fn display_name(first: &str, last: &str) -> String {
    [first, last]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn friend_entries_skip_deactivated() {
        let payload = r#"
        {
            "response": {
                "items": [
                    {"id": 1, "first_name": "Alice", "last_name": "A"},
                    {"id": 2, "first_name": "DELETED", "last_name": "", "deactivated": "deleted"},
                    {"id": 3, "first_name": "Carol", "last_name": "C"}
                ]
            }
        }
        "#;

        let envelope: Envelope<FriendsResponse> = serde_json::from_str(payload).unwrap();
        let response = envelope.response.unwrap();
        let active: Vec<i64> = response
            .items
            .iter()
            .filter(|e| e.deactivated.is_none())
            .map(|e| e.id)
            .collect();

        assert_eq!(active, vec![1, 3]);
    }

    #[test]
    fn remote_error_is_parsed() {
        let payload = r#"{"error": {"error_code": 5, "error_msg": "User authorization failed"}}"#;
        let envelope: Envelope<FriendsResponse> = serde_json::from_str(payload).unwrap();
        let error = envelope.error.unwrap();
        assert_eq!(error.error_code, 5);
    }

    #[test]
    fn access_denied_track_fetch_yields_empty_list() {
        for code in [ERROR_ACCESS_DENIED, ERROR_AUDIO_ACCESS_DENIED] {
            let result = tracks_or_empty(7, Err(SocialError::Api(code, "denied".to_string())));
            assert!(matches!(result, Ok(ref tracks) if tracks.is_empty()));
        }
    }

    #[test]
    fn other_track_fetch_errors_propagate() {
        let result = tracks_or_empty(7, Err(SocialError::Api(6, "too many requests".to_string())));
        assert!(matches!(result, Err(SocialError::Api(6, _))));

        let payload = r#"{"error": {"error_code": 5, "error_msg": "User authorization failed"}}"#;
        let envelope: Envelope<AudioResponse> = serde_json::from_str(payload).unwrap();
        let error = remote_error(envelope.error.unwrap());
        let result = tracks_or_empty(7, Err(error));
        assert!(matches!(result, Err(SocialError::Auth(_))));
    }

    #[test]
    fn fetched_tracks_are_lower_cased() {
        let response = AudioResponse {
            items: vec![AudioEntry {
                artist: "Mogwai".to_string(),
                title: "Auto Rock".to_string(),
            }],
        };
        let tracks = tracks_or_empty(7, Ok(response)).unwrap();
        assert_eq!(
            tracks,
            vec![("mogwai".to_string(), "auto rock".to_string())]
        );
    }

    #[test]
    fn display_name_skips_empty_parts() {
        assert_eq!(display_name("Alice", "Smith"), "Alice Smith");
        assert_eq!(display_name("Alice", ""), "Alice");
        assert_eq!(display_name("", ""), "");
    }
}
