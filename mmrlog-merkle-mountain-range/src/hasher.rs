//! Hash functions used for leaves and merges.
//!
//! - Leaf nodes:     `H(value)`
//! - Internal nodes: `H(left_hash || right_hash)`
//!
//! The same function is used for merging sibling nodes and for bagging
//! peaks into the root.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A node hash. Every supported hash function produces 32 bytes.
pub type Hash = [u8; 32];

/// Fixed-size, collision-resistant hash function plugged into the MMR.
pub trait MerkleHasher: Clone + Send + Sync {
    /// Hash arbitrary bytes (used for leaf values).
    fn digest(&self, data: &[u8]) -> Hash;

    /// Merge two nodes into their parent: `H(left || right)`.
    fn merge(&self, left: &Hash, right: &Hash) -> Hash {
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(left);
        buf[32..].copy_from_slice(right);
        self.digest(&buf)
    }
}

/// Blake3.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Blake3Hasher;

impl MerkleHasher for Blake3Hasher {
    fn digest(&self, data: &[u8]) -> Hash {
        *blake3::hash(data).as_bytes()
    }

    fn merge(&self, left: &Hash, right: &Hash) -> Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(left);
        hasher.update(right);
        *hasher.finalize().as_bytes()
    }
}

/// SHA-256.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Sha256Hasher;

impl MerkleHasher for Sha256Hasher {
    fn digest(&self, data: &[u8]) -> Hash {
        Sha256::digest(data).into()
    }

    fn merge(&self, left: &Hash, right: &Hash) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(left);
        hasher.update(right);
        hasher.finalize().into()
    }
}

/// Hash function selected at runtime, e.g. from a configuration file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// See [`Blake3Hasher`].
    #[default]
    Blake3,
    /// See [`Sha256Hasher`].
    Sha256,
}

impl MerkleHasher for HashAlgorithm {
    fn digest(&self, data: &[u8]) -> Hash {
        match self {
            HashAlgorithm::Blake3 => Blake3Hasher.digest(data),
            HashAlgorithm::Sha256 => Sha256Hasher.digest(data),
        }
    }

    fn merge(&self, left: &Hash, right: &Hash) -> Hash {
        match self {
            HashAlgorithm::Blake3 => Blake3Hasher.merge(left, right),
            HashAlgorithm::Sha256 => Sha256Hasher.merge(left, right),
        }
    }
}
