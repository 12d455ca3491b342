//! Tree and storage configuration.

use std::path::PathBuf;

use mmrlog_merkle_mountain_range::HashAlgorithm;
use mmrlog_storage::rocksdb_storage::RocksDbStorage;
use serde::{Deserialize, Serialize};

use crate::Result;

/// A tree persisted in a shared [`RocksDbStorage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TreeConfig {
    /// Identifies the tree within the storage.
    pub tree_id: u64,
    /// Hash function for leaves and interior nodes.
    #[serde(default)]
    pub hash: HashAlgorithm,
}

/// A bounded tree held in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InMemoryConfig {
    /// Maximum number of nodes, leaves and interior nodes together.
    pub capacity: u64,
    /// Hash function for leaves and interior nodes.
    #[serde(default)]
    pub hash: HashAlgorithm,
}

/// Location of the RocksDB database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Database directory.
    pub path: PathBuf,
    /// Create the database when the directory holds none.
    #[serde(default = "default_create_if_missing")]
    pub create_if_missing: bool,
}

fn default_create_if_missing() -> bool {
    true
}

impl StorageConfig {
    /// Open the configured database.
    pub fn open(&self) -> Result<RocksDbStorage> {
        Ok(RocksDbStorage::open(&self.path, self.create_if_missing)?)
    }
}
