#![deny(missing_docs)]

//! Storage backends for mmrlog trees.
//!
//! Node hashes live behind the
//! [`NodeStoreReadOps`](mmrlog_merkle_mountain_range::NodeStoreReadOps) and
//! [`NodeStoreWriteOps`](mmrlog_merkle_mountain_range::NodeStoreWriteOps)
//! traits of the engine crate; the raw leaf payloads live behind
//! [`ValueStore`]. The RocksDB backend implements both for one tree id at a
//! time, so a single transaction can cover a leaf's nodes and its value.

mod error;
#[cfg(feature = "rocksdb_storage")]
pub mod rocksdb_storage;
mod value_store;

pub use error::{Error, Result};
pub use value_store::{MemValueStore, ValueStore};
