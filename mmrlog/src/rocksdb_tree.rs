use std::sync::{Arc, Mutex, MutexGuard};

use mmrlog_merkle_mountain_range::{
    Hash, HashAlgorithm, MerkleHasher, Proof, append_leaf, last_leaf_index, leaf_count,
};
use mmrlog_storage::{ValueStore, rocksdb_storage::RocksDbStorage};
use tracing::debug;

use crate::{
    Error, Result, TreeConfig, VerifierTree,
    tree::{check_proof, current_root, node_of_leaf, proof_of_leaf, value_of_leaf},
};

/// A [`VerifierTree`] persisted in RocksDB under a tree id.
///
/// Any number of instances may address the same tree of one storage; their
/// appends are serialized by the storage's per-tree writer lock. Each append
/// writes the new nodes, the node count and the value in one transaction.
pub struct RocksDbVerifierTree<H: MerkleHasher = HashAlgorithm> {
    storage: Arc<RocksDbStorage>,
    tree_id: u64,
    hasher: H,
    writer: Arc<Mutex<()>>,
}

impl<H: MerkleHasher> RocksDbVerifierTree<H> {
    /// Open tree `tree_id` of `storage`; a tree never written is empty.
    pub fn new(storage: Arc<RocksDbStorage>, tree_id: u64, hasher: H) -> Result<Self> {
        let writer = storage.writer_lock(tree_id)?;
        Ok(RocksDbVerifierTree {
            storage,
            tree_id,
            hasher,
            writer,
        })
    }

    /// Id of this tree within its storage.
    pub fn tree_id(&self) -> u64 {
        self.tree_id
    }

    /// The storage this tree lives in.
    pub fn storage(&self) -> &Arc<RocksDbStorage> {
        &self.storage
    }

    /// Delete every node and value of this tree.
    pub fn clear(&self) -> Result<()> {
        let _writer = self.lock_writer()?;
        Ok(self.storage.clear_tree(self.tree_id)?)
    }

    fn lock_writer(&self) -> Result<MutexGuard<'_, ()>> {
        self.writer
            .lock()
            .map_err(|_| {
                Error::StorageFailure(format!("writer lock of tree {} poisoned", self.tree_id))
            })
    }

    fn size(&self) -> Result<u64> {
        Ok(self.storage.tree_context(self.tree_id).size()?)
    }
}

impl RocksDbVerifierTree<HashAlgorithm> {
    /// Open the configured tree of `storage`.
    pub fn from_config(storage: Arc<RocksDbStorage>, config: &TreeConfig) -> Result<Self> {
        Self::new(storage, config.tree_id, config.hash)
    }
}

impl<H: MerkleHasher> VerifierTree for RocksDbVerifierTree<H> {
    fn add(&self, value: &[u8]) -> Result<u64> {
        let _writer = self.lock_writer()?;
        let transaction = self.storage.start_transaction();
        let (leaf_index, size) = {
            let context = self
                .storage
                .tree_transaction_context(self.tree_id, &transaction);
            let size = append_leaf(&context, self.hasher.clone(), self.hasher.digest(value))?;
            let leaf_index = last_leaf_index(size)
                .ok_or_else(|| Error::StorageFailure(format!("no leaf in a {} node tree", size)))?;
            let mut values = &context;
            values.put_value(leaf_index, value)?;
            (leaf_index, size)
        };
        self.storage.commit_transaction(transaction)?;
        debug!(tree_id = self.tree_id, leaf_index, size, "added leaf");
        Ok(leaf_index)
    }

    fn get_value(&self, leaf_index: u64) -> Result<Vec<u8>> {
        let context = self.storage.tree_context(self.tree_id);
        value_of_leaf(&context, context.size()?, leaf_index)
    }

    fn get_node(&self, leaf_index: u64) -> Result<Hash> {
        let context = self.storage.tree_context(self.tree_id);
        node_of_leaf(&context, context.size()?, leaf_index)
    }

    fn leaf_count(&self) -> Result<u64> {
        Ok(leaf_count(self.size()?))
    }

    fn root(&self) -> Result<Hash> {
        let context = self.storage.tree_context(self.tree_id);
        current_root(&context, &self.hasher, context.size()?)
    }

    fn make_proof(&self, leaf_index: u64) -> Result<Proof> {
        let context = self.storage.tree_context(self.tree_id);
        proof_of_leaf(&context, &self.hasher, context.size()?, leaf_index)
    }

    fn verify_proof(&self, proof: &Proof) -> Result<()> {
        let context = self.storage.tree_context(self.tree_id);
        check_proof(&context, &self.hasher, context.size()?, proof)
    }
}
