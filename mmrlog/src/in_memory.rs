use std::sync::Mutex;

use mmrlog_merkle_mountain_range::{
    Hash, HashAlgorithm, MemStore, MerkleHasher, NodeStoreReadOps, Proof, append_leaf,
    leaf_count,
};
use mmrlog_storage::{MemValueStore, ValueStore};
use tracing::debug;

use crate::{
    Error, InMemoryConfig, Result, VerifierTree,
    tree::{check_proof, current_root, node_of_leaf, proof_of_leaf, value_of_leaf},
};

/// A [`VerifierTree`] held entirely in memory, bounded to a node capacity
/// fixed at construction.
pub struct InMemoryVerifierTree<H: MerkleHasher = HashAlgorithm> {
    nodes: MemStore,
    values: MemValueStore,
    hasher: H,
    writer: Mutex<()>,
}

impl<H: MerkleHasher> InMemoryVerifierTree<H> {
    /// Create an empty tree able to hold `capacity` nodes.
    pub fn new(capacity: u64, hasher: H) -> Self {
        InMemoryVerifierTree {
            nodes: MemStore::with_capacity(capacity),
            values: MemValueStore::new(),
            hasher,
            writer: Mutex::new(()),
        }
    }

    /// Maximum number of nodes the tree holds.
    pub fn capacity(&self) -> u64 {
        self.nodes.capacity()
    }

    fn size(&self) -> Result<u64> {
        Ok((&self.nodes).node_count()?)
    }
}

impl InMemoryVerifierTree<HashAlgorithm> {
    /// Create an empty tree as configured.
    pub fn from_config(config: &InMemoryConfig) -> Self {
        Self::new(config.capacity, config.hash)
    }
}

impl<H: MerkleHasher> VerifierTree for InMemoryVerifierTree<H> {
    fn add(&self, value: &[u8]) -> Result<u64> {
        let _writer = self
            .writer
            .lock()
            .map_err(|_| Error::StorageFailure("writer lock poisoned".into()))?;
        // The value goes in first: readers only see a leaf once the node
        // count covers it, and by then its value must be there.
        let leaf_index = leaf_count(self.size()?);
        let mut values = &self.values;
        values.put_value(leaf_index, value)?;
        let size = match append_leaf(&self.nodes, self.hasher.clone(), self.hasher.digest(value)) {
            Ok(size) => size,
            Err(e) => {
                self.values.remove_value(leaf_index)?;
                return Err(e.into());
            }
        };
        debug!(leaf_index, size, "added leaf");
        Ok(leaf_index)
    }

    fn get_value(&self, leaf_index: u64) -> Result<Vec<u8>> {
        value_of_leaf(&self.values, self.size()?, leaf_index)
    }

    fn get_node(&self, leaf_index: u64) -> Result<Hash> {
        node_of_leaf(&self.nodes, self.size()?, leaf_index)
    }

    fn leaf_count(&self) -> Result<u64> {
        Ok(leaf_count(self.size()?))
    }

    fn root(&self) -> Result<Hash> {
        current_root(&self.nodes, &self.hasher, self.size()?)
    }

    fn make_proof(&self, leaf_index: u64) -> Result<Proof> {
        proof_of_leaf(&self.nodes, &self.hasher, self.size()?, leaf_index)
    }

    fn verify_proof(&self, proof: &Proof) -> Result<()> {
        check_proof(&self.nodes, &self.hasher, self.size()?, proof)
    }
}
