//! Configuration: the stored user blob, the zone registry, and the knobs
//! that select how requests are handled.
//!
//! The administration UI saves one JSON document. Only a few keys are read
//! here; everything else is stored and returned untouched.
//!
//! ```json
//! {
//!   "account_id": "…",
//!   "pages_token": "…",
//!   "zone_token": "…",
//!   "zones": {
//!     "example.com": { "token": "…", "zone_id": "…" }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use crate::cloudflare::Pagination;

/// Errors from the configuration store.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config storage error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid stored config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Credentials and cached ID for one zone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneEntry {
    #[serde(default)]
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
}

impl ZoneEntry {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            zone_id: None,
        }
    }

    pub fn with_zone_id(mut self, zone_id: impl Into<String>) -> Self {
        self.zone_id = Some(zone_id.into());
        self
    }
}

/// Zone name to [`ZoneEntry`]. Names are exact, case-sensitive strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneRegistry(BTreeMap<String, ZoneEntry>);

impl ZoneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, zone: impl Into<String>, entry: ZoneEntry) {
        self.0.insert(zone.into(), entry);
    }

    pub fn get(&self, zone: &str) -> Option<&ZoneEntry> {
        self.0.get(zone)
    }

    /// Configured zone names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// The zone's own token, if one is recorded and non-empty.
    pub fn token_for(&self, zone: &str) -> Option<&str> {
        self.get(zone)
            .map(|entry| entry.token.as_str())
            .filter(|token| !token.is_empty())
    }

    /// The zone's cached ID, if recorded.
    pub fn zone_id_for(&self, zone: &str) -> Option<&str> {
        self.get(zone)
            .and_then(|entry| entry.zone_id.as_deref())
            .filter(|id| !id.is_empty())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, ZoneEntry)> for ZoneRegistry {
    fn from_iter<T: IntoIterator<Item = (K, ZoneEntry)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// The parts of the stored blob this crate reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub pages_token: Option<String>,
    #[serde(default)]
    pub zone_token: Option<String>,
    #[serde(default)]
    pub zones: ZoneRegistry,
}

impl UserConfig {
    /// Parses the stored blob. A missing or `null` blob is an empty config.
    pub fn from_blob(blob: Option<&Value>) -> Result<Self, ConfigError> {
        match blob {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(value) => Ok(Self::deserialize(value)?),
        }
    }
}

/// Where request credentials come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
    /// `X-Pages-Token`, `X-Zone-Token` and `X-Account-Id` headers only.
    #[default]
    Headers,
    /// Headers when present, otherwise the stored config.
    Stored,
}

/// How the orchestrator and the routes around it behave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerConfig {
    #[serde(default)]
    pub credential_source: CredentialSource,
    #[serde(default)]
    pub pagination: Pagination,
    /// Prefer a zone's own registry token over the request's zone token.
    #[serde(default = "default_true")]
    pub zone_token_override: bool,
}

fn default_true() -> bool {
    true
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            credential_source: CredentialSource::default(),
            pagination: Pagination::default(),
            zone_token_override: true,
        }
    }
}

impl HandlerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn credential_source(mut self, source: CredentialSource) -> Self {
        self.credential_source = source;
        self
    }

    pub fn pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn zone_token_override(mut self, enabled: bool) -> Self {
        self.zone_token_override = enabled;
        self
    }
}

/// Durable storage for the user blob.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Returns the stored blob, or `None` if nothing was saved yet.
    async fn get(&self) -> Result<Option<Value>, ConfigError>;

    /// Replaces the stored blob.
    async fn put(&self, config: Value) -> Result<(), ConfigError>;

    /// Loads and parses the blob.
    async fn load(&self) -> Result<UserConfig, ConfigError> {
        let blob = self.get().await?;
        UserConfig::from_blob(blob.as_ref())
    }
}

/// Keeps the blob in memory. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    value: RwLock<Option<Value>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: Value) -> Self {
        Self {
            value: RwLock::new(Some(value)),
        }
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn get(&self) -> Result<Option<Value>, ConfigError> {
        Ok(self.value.read().await.clone())
    }

    async fn put(&self, config: Value) -> Result<(), ConfigError> {
        *self.value.write().await = Some(config);
        Ok(())
    }
}

/// Keeps the blob in a JSON file.
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ConfigStore for FileConfigStore {
    async fn get(&self) -> Result<Option<Value>, ConfigError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn put(&self, config: Value) -> Result<(), ConfigError> {
        let bytes = serde_json::to_vec_pretty(&config)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), "stored config");
        Ok(())
    }
}
