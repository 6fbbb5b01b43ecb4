use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::StoreResult;
use crate::log::{LogConfig, LogStore, SyncMode};
use crate::memory::{MemoryStore, DEFAULT_SHARDS};
use crate::retry::RetryPolicy;
use crate::traits::DocumentStore;

/// Which backend holds the documents.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Volatile sharded map. Contents are lost on restart.
    #[default]
    Memory,
    /// Append-only log in `dir`, replayed on startup.
    Log {
        dir: PathBuf,
        #[serde(default)]
        sync_mode: SyncMode,
        #[serde(default)]
        retry: RetryPolicy,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Shard count of the in-memory map (or the log backend's index).
    pub shards: usize,
    pub backend: BackendConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            shards: DEFAULT_SHARDS,
            backend: BackendConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Log backend in `dir` with default durability settings.
    pub fn log(dir: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendConfig::Log {
                dir: dir.into(),
                sync_mode: SyncMode::default(),
                retry: RetryPolicy::default(),
            },
            ..Self::default()
        }
    }
}

/// Build the configured backend behind the [`DocumentStore`] trait.
pub fn open_store(config: &StoreConfig) -> StoreResult<Arc<dyn DocumentStore>> {
    match &config.backend {
        BackendConfig::Memory => {
            info!(shards = config.shards, "using in-memory document store");
            Ok(Arc::new(MemoryStore::with_shards(config.shards)))
        }
        BackendConfig::Log {
            dir,
            sync_mode,
            retry,
        } => {
            let log_config = LogConfig {
                sync_mode: *sync_mode,
                retry: retry.clone(),
                shards: config.shards,
            };
            Ok(Arc::new(LogStore::open(dir, log_config)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_types::Document;

    #[test]
    fn default_is_memory() {
        let config = StoreConfig::default();
        assert_eq!(config.backend, BackendConfig::Memory);
        assert_eq!(config.shards, DEFAULT_SHARDS);

        let store = open_store(&config).unwrap();
        assert_eq!(store.backend_name(), "memory");
    }

    #[test]
    fn parses_log_backend_from_toml() {
        let config: StoreConfig = toml::from_str(
            r#"
            shards = 8

            [backend]
            type = "log"
            dir = "/var/lib/sift"
            sync_mode = "every_write"

            [backend.retry]
            max_attempts = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.shards, 8);
        match config.backend {
            BackendConfig::Log {
                dir,
                sync_mode,
                retry,
            } => {
                assert_eq!(dir, PathBuf::from("/var/lib/sift"));
                assert_eq!(sync_mode, SyncMode::EveryWrite);
                assert_eq!(retry.max_attempts, 5);
                assert_eq!(retry.initial_backoff_ms, RetryPolicy::default().initial_backoff_ms);
            }
            other => panic!("expected log backend, got {other:?}"),
        }
    }

    #[test]
    fn empty_toml_is_default() {
        let config: StoreConfig = toml::from_str("").unwrap();
        assert_eq!(config, StoreConfig::default());
    }

    #[test]
    fn opens_log_backend() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&StoreConfig::log(dir.path())).unwrap();
        assert_eq!(store.backend_name(), "log");
        store.put("ns", "1", Document::null()).unwrap();
        drop(store);

        let store = open_store(&StoreConfig::log(dir.path())).unwrap();
        assert_eq!(store.get("ns", "1").unwrap(), Some(Document::null()));
    }
}
