//! Useful utilities for testing.

use std::{ops::Deref, sync::Arc};

use tempfile::TempDir;

use super::*;

/// RocksDb storage with self-cleanup
pub struct TempStorage {
    // dropped before the directory it lives in
    storage: Arc<RocksDbStorage>,
    dir: TempDir,
}

impl TempStorage {
    /// Create new `TempStorage`
    pub fn new() -> Self {
        let dir = TempDir::new().expect("cannot create tempdir");
        let storage = RocksDbStorage::default_rocksdb_with_path(dir.path())
            .expect("cannot open RocksDB storage");
        TempStorage {
            storage: Arc::new(storage),
            dir,
        }
    }

    /// Shared handle to the storage, as trees over it hold one
    pub fn shared(&self) -> Arc<RocksDbStorage> {
        Arc::clone(&self.storage)
    }

    /// Close the database and open it again from the same directory
    ///
    /// Every handle obtained through [`TempStorage::shared`] must be dropped
    /// first.
    pub fn reopen(self) -> Self {
        let TempStorage { storage, dir } = self;
        drop(storage);
        let storage =
            RocksDbStorage::open(dir.path(), false).expect("cannot reopen RocksDB storage");
        TempStorage {
            storage: Arc::new(storage),
            dir,
        }
    }
}

impl Default for TempStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for TempStorage {
    type Target = RocksDbStorage;

    fn deref(&self) -> &Self::Target {
        &self.storage
    }
}
