//! Storage context of a single tree, optionally bound to a transaction.
use mmrlog_merkle_mountain_range::{Hash, NodeStoreReadOps, NodeStoreWriteOps};
use rocksdb::WriteBatchWithTransaction;
use tracing::debug;

use super::storage::{
    Db, META_CF_NAME, NODES_CF_NAME, Tx, VALUES_CF_NAME, cf_handle, indexed_key,
    sync_write_options, tree_key,
};
use crate::{Error, Result, ValueStore};

/// Nodes, values and node count of one tree.
///
/// With a transaction every read goes through it and every write is staged
/// in it until [`RocksDbStorage::commit_transaction`]. Without one, reads hit
/// the database and an append is written as one atomic batch.
///
/// [`RocksDbStorage::commit_transaction`]: super::RocksDbStorage::commit_transaction
pub struct TreeContext<'db> {
    db: &'db Db,
    transaction: Option<&'db Tx<'db>>,
    tree_id: u64,
}

impl<'db> TreeContext<'db> {
    pub(super) fn new(db: &'db Db, transaction: Option<&'db Tx<'db>>, tree_id: u64) -> Self {
        TreeContext {
            db,
            transaction,
            tree_id,
        }
    }

    /// Id of the tree this context addresses.
    pub fn tree_id(&self) -> u64 {
        self.tree_id
    }

    fn get_cf(&self, cf_name: &'static str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let cf = cf_handle(self.db, cf_name)?;
        let value = match self.transaction {
            Some(tx) => tx.get_cf(cf, key)?,
            None => self.db.get_cf(cf, key)?,
        };
        Ok(value)
    }

    /// Committed node count of the tree; 0 for a tree never written.
    ///
    /// Inside a transaction the read is registered for conflict checking, so
    /// a concurrent append to the same tree fails this transaction's commit.
    pub fn size(&self) -> Result<u64> {
        let meta = cf_handle(self.db, META_CF_NAME)?;
        let key = tree_key(self.tree_id);
        let bytes = match self.transaction {
            Some(tx) => tx.get_for_update_cf(meta, key, true)?,
            None => self.db.get_cf(meta, key)?,
        };
        let Some(bytes) = bytes else {
            return Ok(0);
        };
        let size: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
            Error::CorruptedData(format!(
                "node count of tree {} is {}",
                self.tree_id,
                hex::encode(&bytes)
            ))
        })?;
        Ok(u64::from_be_bytes(size))
    }

    /// Node hash at `pos`, if written.
    pub fn node(&self, pos: u64) -> Result<Option<Hash>> {
        let Some(bytes) = self.get_cf(NODES_CF_NAME, &indexed_key(self.tree_id, pos))? else {
            return Ok(None);
        };
        let hash: Hash = bytes.as_slice().try_into().map_err(|_| {
            Error::CorruptedData(format!(
                "node {} of tree {} is {}",
                pos,
                self.tree_id,
                hex::encode(&bytes)
            ))
        })?;
        Ok(Some(hash))
    }

    /// Write `nodes` at positions `pos..` and the new node count.
    ///
    /// Fails with [`Error::SizeMismatch`] unless `pos` is the current node
    /// count.
    pub fn append_nodes(&self, pos: u64, nodes: &[Hash]) -> Result<u64> {
        let actual = self.size()?;
        if pos != actual {
            return Err(Error::SizeMismatch {
                expected: pos,
                actual,
            });
        }
        let new_size = pos + nodes.len() as u64;
        let nodes_cf = cf_handle(self.db, NODES_CF_NAME)?;
        let meta_cf = cf_handle(self.db, META_CF_NAME)?;
        match self.transaction {
            Some(tx) => {
                for (offset, node) in (0u64..).zip(nodes) {
                    tx.put_cf(nodes_cf, indexed_key(self.tree_id, pos + offset), node)?;
                }
                tx.put_cf(meta_cf, tree_key(self.tree_id), new_size.to_be_bytes())?;
            }
            None => {
                let mut batch = WriteBatchWithTransaction::<true>::default();
                for (offset, node) in (0u64..).zip(nodes) {
                    batch.put_cf(nodes_cf, indexed_key(self.tree_id, pos + offset), node);
                }
                batch.put_cf(meta_cf, tree_key(self.tree_id), new_size.to_be_bytes());
                self.db.write_opt(batch, &sync_write_options())?;
            }
        }
        debug!(tree_id = self.tree_id, pos, new_size, "appended nodes");
        Ok(new_size)
    }

    /// Payload of leaf `leaf_index`, if recorded.
    pub fn leaf_value(&self, leaf_index: u64) -> Result<Option<Vec<u8>>> {
        self.get_cf(VALUES_CF_NAME, &indexed_key(self.tree_id, leaf_index))
    }

    /// Record the payload of leaf `leaf_index`; refuses to overwrite.
    pub fn insert_value(&self, leaf_index: u64, value: &[u8]) -> Result<()> {
        let key = indexed_key(self.tree_id, leaf_index);
        if self.get_cf(VALUES_CF_NAME, &key)?.is_some() {
            return Err(Error::ValueExists(leaf_index));
        }
        let values_cf = cf_handle(self.db, VALUES_CF_NAME)?;
        match self.transaction {
            Some(tx) => tx.put_cf(values_cf, key, value)?,
            None => self.db.put_cf_opt(values_cf, key, value, &sync_write_options())?,
        }
        Ok(())
    }
}

impl NodeStoreReadOps for &TreeContext<'_> {
    fn node_count(&self) -> mmrlog_merkle_mountain_range::Result<u64> {
        Ok(self.size()?)
    }

    fn node_at_position(&self, pos: u64) -> mmrlog_merkle_mountain_range::Result<Option<Hash>> {
        Ok(self.node(pos)?)
    }
}

impl NodeStoreWriteOps for &TreeContext<'_> {
    fn append(&mut self, pos: u64, nodes: Vec<Hash>) -> mmrlog_merkle_mountain_range::Result<u64> {
        Ok(self.append_nodes(pos, &nodes)?)
    }
}

impl ValueStore for &TreeContext<'_> {
    fn value(&self, leaf_index: u64) -> Result<Option<Vec<u8>>> {
        self.leaf_value(leaf_index)
    }

    fn put_value(&mut self, leaf_index: u64, value: &[u8]) -> Result<()> {
        self.insert_value(leaf_index, value)
    }
}
