//! Configuration resolution for groovesync
//!
//! Credentials and service settings resolve with ENV → TOML priority.
//! Tokens are loaded once at process start and handed to the clients by
//! reference; nothing re-reads configuration mid-job.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the TOML config file.
pub const CONFIG_PATH_ENV: &str = "GROOVESYNC_CONFIG";

const SOCIAL_TOKEN_ENV: &str = "GROOVESYNC_SOCIAL_TOKEN";
const CATALOG_TOKEN_ENV: &str = "GROOVESYNC_CATALOG_TOKEN";

/// TOML configuration file contents
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Path to the shared SQLite database file
    pub database_path: Option<PathBuf>,
    /// HTTP bind address, e.g. "127.0.0.1:5730"
    pub bind_address: Option<String>,
    /// Access token for the social-graph session
    pub social_token: Option<String>,
    /// Access token for the catalog genre provider
    pub catalog_token: Option<String>,
}

impl TomlConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Load from the path named by `GROOVESYNC_CONFIG`, or defaults when unset.
    pub fn load_from_env() -> Result<Self> {
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => {
                let config = Self::load(Path::new(&path))?;
                info!(path = %path, "Configuration loaded from TOML file");
                Ok(config)
            }
            Err(_) => Ok(Self::default()),
        }
    }

    /// Database path with the default applied.
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("groovesync.db"))
    }

    /// Bind address with the default applied.
    pub fn bind_address(&self) -> String {
        self.bind_address
            .clone()
            .unwrap_or_else(|| "127.0.0.1:5730".to_string())
    }
}

/// Resolve the social-graph session token.
///
/// Priority: environment variable → TOML. Warns when both are set, since
/// that usually means a stale config file.
pub fn resolve_social_token(config: &TomlConfig) -> Result<String> {
    resolve_token("social", SOCIAL_TOKEN_ENV, config.social_token.as_deref())
}

/// Resolve the catalog provider token.
pub fn resolve_catalog_token(config: &TomlConfig) -> Result<String> {
    resolve_token("catalog", CATALOG_TOKEN_ENV, config.catalog_token.as_deref())
}

fn resolve_token(kind: &str, env_var: &str, toml_value: Option<&str>) -> Result<String> {
    let env_value = std::env::var(env_var).ok().filter(|v| !v.is_empty());
    let toml_value = toml_value.filter(|v| !v.is_empty());

    if env_value.is_some() && toml_value.is_some() {
        warn!(
            "{} token found in both {} and TOML config; using environment (highest priority)",
            kind, env_var
        );
    }

    if let Some(value) = env_value {
        info!("{} token loaded from environment variable", kind);
        return Ok(value);
    }

    if let Some(value) = toml_value {
        info!("{} token loaded from TOML config", kind);
        return Ok(value.to_string());
    }

    bail!(
        "{} token not configured: set {} or the corresponding TOML key",
        kind,
        env_var
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let config: TomlConfig = toml::from_str(
            r#"
            database_path = "/var/lib/groovesync/groovesync.db"
            bind_address = "0.0.0.0:8080"
            social_token = "s3cret"
            catalog_token = "c4talog"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.database_path(),
            PathBuf::from("/var/lib/groovesync/groovesync.db")
        );
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.social_token.as_deref(), Some("s3cret"));
        assert_eq!(config.catalog_token.as_deref(), Some("c4talog"));
    }

    #[test]
    fn defaults_applied_for_missing_keys() {
        let config: TomlConfig = toml::from_str("").unwrap();
        assert_eq!(config.database_path(), PathBuf::from("groovesync.db"));
        assert_eq!(config.bind_address(), "127.0.0.1:5730");
    }

    #[test]
    fn token_resolution_prefers_toml_when_env_unset() {
        let token = resolve_token("test", "GROOVESYNC_TEST_TOKEN_UNSET", Some("from-toml"));
        assert_eq!(token.unwrap(), "from-toml");
    }

    #[test]
    fn token_resolution_fails_when_absent() {
        let token = resolve_token("test", "GROOVESYNC_TEST_TOKEN_UNSET", None);
        assert!(token.is_err());
    }
}
