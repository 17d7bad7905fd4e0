use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::{file_store::FileStore, memory_store::MemoryStore};
use crate::config::DurableStoreConfig;
use crate::error::{ConfigError, StorageError};

/// One storage scope: a flat string-to-string map, like browser storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
    /// Short name used in log lines.
    fn scope_name(&self) -> &str;
}

/// Creates the durable scope based on the configuration.
/// A file store without an explicit path lands in `~/.healthgate/credentials.json`.
pub fn create_durable_store(
    config: &DurableStoreConfig,
) -> Result<Arc<dyn KeyValueStore>, ConfigError> {
    match config {
        DurableStoreConfig::File { path } => {
            let path = match path {
                Some(p) => p.clone(),
                None => dirs::home_dir()
                    .ok_or(ConfigError::NoStorageDir)?
                    .join(".healthgate")
                    .join("credentials.json"),
            };
            info!("Using file-backed durable credential store at {}", path.display());
            Ok(Arc::new(FileStore::new(path)))
        }
        DurableStoreConfig::Memory => {
            info!("Durable credential store is in-memory; nothing survives a restart.");
            Ok(Arc::new(MemoryStore::new("durable")))
        }
    }
}
