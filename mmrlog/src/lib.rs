//! Verifiable append-only log backed by a Merkle Mountain Range.
//!
//! A [`VerifierTree`] accepts opaque values, hands them back by leaf index
//! and proves their inclusion against a root that commits to the whole log.
//! Two backends are provided:
//!
//! - [`InMemoryVerifierTree`]: bounded, for tests and test vectors.
//! - [`RocksDbVerifierTree`]: durable, many trees per database.
//!
//! ```no_run
//! use mmrlog::{InMemoryVerifierTree, Sha256Hasher, VerifierTree};
//!
//! let tree = InMemoryVerifierTree::new(64, Sha256Hasher);
//! let leaf = tree.add(b"hello 00")?;
//! let proof = tree.make_proof(leaf)?;
//! tree.verify_proof(&proof)?;
//! # Ok::<(), mmrlog::Error>(())
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod in_memory;
mod rocksdb_tree;
mod tree;

pub use config::{InMemoryConfig, StorageConfig, TreeConfig};
pub use error::{Error, Result};
pub use in_memory::InMemoryVerifierTree;
pub use mmrlog_merkle_mountain_range::{
    Blake3Hasher, Hash, HashAlgorithm, MerkleHasher, Proof, Sha256Hasher,
};
pub use mmrlog_storage::rocksdb_storage::RocksDbStorage;
pub use rocksdb_tree::RocksDbVerifierTree;
pub use tree::VerifierTree;
