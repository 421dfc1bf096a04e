//! Configuration types shared across crates.
//!
//! File parsing lives in the server binary; these are the already-parsed
//! structured settings consumed by the engine.

use crate::token::RoutePermission;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Repository visibility.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Anyone may read and browse; writes still require a token.
    Public,
    /// Reads, browses and writes all require a matching token route.
    Private,
}

/// Authentication scheme used against a mirror.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticationMethod {
    Basic,
    CustomHeader,
}

/// Credentials for an upstream mirror.
///
/// For `Basic`, `login`/`secret` are username/password. For `CustomHeader`,
/// `login` is the header name and `secret` its value.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MirrorCredentials {
    pub method: AuthenticationMethod,
    pub login: String,
    pub secret: String,
}

/// A remote repository consulted when a local lookup misses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Base URI of the remote repository (e.g., "https://repo1.maven.org/maven2").
    pub url: String,
    /// Optional credentials sent with every request to this mirror.
    #[serde(default)]
    pub credentials: Option<MirrorCredentials>,
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Read timeout in seconds.
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
    /// Persist successfully fetched artifacts into local storage.
    #[serde(default = "default_store")]
    pub store: bool,
}

fn default_connect_timeout_secs() -> u64 {
    3
}

fn default_read_timeout_secs() -> u64 {
    15
}

fn default_store() -> bool {
    true
}

impl MirrorConfig {
    /// Connection timeout as a Duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Read timeout as a Duration.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

/// Storage backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage.
    Filesystem {
        /// Root directory for this repository's artifacts.
        path: PathBuf,
    },
    /// S3-compatible storage.
    S3 {
        /// Bucket name.
        bucket: String,
        /// Optional endpoint URL (for MinIO, etc.).
        endpoint: Option<String>,
        /// AWS region.
        region: Option<String>,
        /// Optional key prefix.
        prefix: Option<String>,
        /// AWS access key ID. Falls back to ambient credentials if not set.
        access_key_id: Option<String>,
        /// AWS secret access key. Falls back to ambient credentials if not set.
        secret_access_key: Option<String>,
        /// Force path-style URLs (`endpoint/bucket/key`). Required for MinIO.
        #[serde(default)]
        force_path_style: bool,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem {
            path: PathBuf::from("./data/repositories"),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            StorageConfig::S3 {
                access_key_id,
                secret_access_key,
                ..
            } => match (access_key_id.as_ref(), secret_access_key.as_ref()) {
                (Some(_), Some(_)) | (None, None) => Ok(()),
                _ => Err(
                    "s3 config requires both access_key_id and secret_access_key when either is set"
                        .to_string(),
                ),
            },
            StorageConfig::Filesystem { .. } => Ok(()),
        }
    }
}

/// A single named repository.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Unique repository name (e.g., "releases").
    pub name: String,
    /// Who may read without a token.
    #[serde(default = "default_visibility")]
    pub visibility: Visibility,
    /// Allow overwriting an artifact already present at a path.
    #[serde(default)]
    pub redeployment: bool,
    /// How many timestamped snapshot builds to keep per version directory.
    /// Zero disables pruning.
    #[serde(default)]
    pub preserved_snapshots: u32,
    /// Storage backend for this repository. Each repository owns its provider.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Upstream mirrors, in fallback priority order.
    #[serde(default)]
    pub proxied: Vec<MirrorConfig>,
}

fn default_visibility() -> Visibility {
    Visibility::Public
}

/// A route granted to a configured token.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Path prefix over "{repository}/{gav}". Empty matches everything.
    pub path: String,
    pub permission: RoutePermission,
}

/// A token seeded at startup.
///
/// Only the SHA-256 hex digest of the secret is configured; generate it with
/// `echo -n "your-secret" | sha256sum`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenConfig {
    pub name: String,
    pub secret_hash: String,
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Repositories, in declaration order.
    #[serde(default)]
    pub repositories: Vec<RepositoryConfig>,
    /// Tokens seeded into the in-memory vault at startup.
    #[serde(default)]
    pub tokens: Vec<TokenConfig>,
}

impl AppConfig {
    /// Validate the whole configuration, failing fast on startup errors.
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = std::collections::HashSet::new();
        for repository in &self.repositories {
            if repository.name.trim().is_empty() {
                return Err("repository name must not be empty".to_string());
            }
            if !seen.insert(repository.name.as_str()) {
                return Err(format!("duplicate repository name: {}", repository.name));
            }
            repository
                .storage
                .validate()
                .map_err(|e| format!("repository {}: {e}", repository.name))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filesystem_repository(name: &str) -> RepositoryConfig {
        RepositoryConfig {
            name: name.to_string(),
            visibility: Visibility::Public,
            redeployment: false,
            preserved_snapshots: 0,
            storage: StorageConfig::default(),
            proxied: Vec::new(),
        }
    }

    #[test]
    fn validate_rejects_duplicate_repositories() {
        let config = AppConfig {
            repositories: vec![
                filesystem_repository("releases"),
                filesystem_repository("releases"),
            ],
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().contains("duplicate"));
    }

    #[test]
    fn validate_rejects_partial_s3_credentials() {
        let mut repository = filesystem_repository("releases");
        repository.storage = StorageConfig::S3 {
            bucket: "bucket".to_string(),
            endpoint: None,
            region: None,
            prefix: None,
            access_key_id: Some("access".to_string()),
            secret_access_key: None,
            force_path_style: false,
        };
        let config = AppConfig {
            repositories: vec![repository],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn mirror_defaults() {
        let json = r#"{"url": "https://repo1.maven.org/maven2"}"#;
        let mirror: MirrorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(mirror.connect_timeout_secs, 3);
        assert_eq!(mirror.read_timeout_secs, 15);
        assert!(mirror.store);
        assert!(mirror.credentials.is_none());
    }

    #[test]
    fn repository_defaults() {
        let json = r#"{"name": "releases"}"#;
        let repository: RepositoryConfig = serde_json::from_str(json).unwrap();
        assert_eq!(repository.visibility, Visibility::Public);
        assert!(!repository.redeployment);
        assert_eq!(repository.preserved_snapshots, 0);
        assert!(repository.proxied.is_empty());
    }
}
