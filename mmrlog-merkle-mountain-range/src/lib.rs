//! Merkle Mountain Range engine of the mmrlog verifiable log.
//!
//! Flat node-position arithmetic, leaf append with peak merging, root
//! bagging and single-node inclusion proofs over pluggable node stores and
//! hash functions. Nodes are 32-byte hashes; a tree's only mutable state is
//! its node count.
//!
//! # Core types
//!
//! - [`MMR`]: the main MMR struct (push, root, proof, commit).
//! - [`Proof`]: inclusion proof against a bagged root (verify, encode).
//! - [`MerkleHasher`]: the pluggable hash function ([`Blake3Hasher`],
//!   [`Sha256Hasher`], [`HashAlgorithm`]).
//!
//! # Store traits
//!
//! - [`NodeStoreReadOps`]: node count and node lookup by position.
//! - [`NodeStoreWriteOps`]: atomically append a contiguous run of nodes.
//! - [`MemStore`]: bounded in-memory store.

#![warn(missing_docs)]

mod error;
mod hasher;
pub mod helper;
/// Bounded in-memory node store.
pub mod mem_store;
mod mmr;
mod node_store;
mod proof;
#[cfg(test)]
mod tests;

pub use error::{Error, Result};
pub use hasher::{Blake3Hasher, Hash, HashAlgorithm, MerkleHasher, Sha256Hasher};
pub use helper::{
    get_peaks, get_peaks as peak_positions, hash_count_for_push, is_valid_mmr_size,
    last_leaf_index, leaf_index_to_mmr_size, leaf_index_to_pos,
    leaf_index_to_pos as mmr_index, mmr_size_to_leaf_count,
    mmr_size_to_leaf_count as leaf_count, pos_to_leaf_index,
};
pub use mem_store::MemStore;
pub use mmr::{MMR, append_leaf, bag_peaks, make_proof, root};
pub use node_store::{NodeBatch, NodeStoreReadOps, NodeStoreWriteOps};
pub use proof::{Proof, expected_path_len, max_path_len, verify_proof};
