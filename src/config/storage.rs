use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where credential bundles live.
///
/// The session scope is always held in memory for the lifetime of the
/// process; only the durable ("remember me") scope is configurable.
#[derive(Deserialize, Serialize, Debug, Clone, Default, JsonSchema)]
pub struct StorageConfig {
    #[serde(default)]
    pub durable: DurableStoreConfig,
}

/// The durable store backends. We differentiate them via a "type" tag in the YAML.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
#[serde(tag = "type")]
pub enum DurableStoreConfig {
    /// A JSON object on disk. Without a path, `~/.healthgate/credentials.json` is used.
    #[serde(rename = "file")]
    File { path: Option<PathBuf> },
    /// Kept in memory only; nothing survives a restart.
    #[serde(rename = "memory")]
    Memory,
}

impl Default for DurableStoreConfig {
    fn default() -> Self {
        DurableStoreConfig::File { path: None }
    }
}
