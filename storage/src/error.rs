//! Storage errors

/// Alias for `core::result::Result<T, Error>`.
pub type Result<T> = core::result::Result<T, Error>;

/// Storage and underlying errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Rocks DB error
    #[cfg(feature = "rocksdb_storage")]
    #[error("rocksDB error: {0}")]
    RocksDB(#[from] rocksdb::Error),
    /// Stored bytes that do not decode into the expected record
    #[error("corrupted data: {0}")]
    CorruptedData(String),
    /// The database was opened without one of the required column families
    #[error("missing column family {0}")]
    MissingColumnFamily(&'static str),
    /// An append did not start at the tree's current node count
    #[error("append at position {expected} but the tree holds {actual} nodes")]
    SizeMismatch {
        /// Position the append was issued for.
        expected: u64,
        /// Node count actually stored.
        actual: u64,
    },
    /// A value is already recorded for this leaf index
    #[error("value for leaf {0} already stored")]
    ValueExists(u64),
    /// A lock guarding shared storage state was poisoned
    #[error("{0} lock poisoned")]
    LockPoisoned(&'static str),
}

impl From<Error> for mmrlog_merkle_mountain_range::Error {
    fn from(e: Error) -> Self {
        mmrlog_merkle_mountain_range::Error::StorageFailure(e.to_string())
    }
}
