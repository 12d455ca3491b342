//! Implementation for a storage abstraction over RocksDB.
use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, Mutex},
};

use lazy_static::lazy_static;
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, Direction, IteratorMode, OptimisticTransactionDB,
    OptimisticTransactionOptions, Transaction, WriteBatchWithTransaction, WriteOptions,
};
use tracing::{debug, warn};

use super::TreeContext;
use crate::{Error, Result};

/// Name of column family used to store node hashes
pub(super) const NODES_CF_NAME: &str = "nodes";
/// Name of column family used to store leaf payloads
pub(super) const VALUES_CF_NAME: &str = "values";
/// Name of column family used to store per-tree node counts
pub(super) const META_CF_NAME: &str = "meta";

pub(crate) type Db = OptimisticTransactionDB;
/// Optimistic transaction over the mmrlog database.
pub type Tx<'db> = Transaction<'db, Db>;

lazy_static! {
    static ref DEFAULT_OPTS: rocksdb::Options = {
        let mut opts = rocksdb::Options::default();
        opts.create_if_missing(true);
        opts.increase_parallelism(num_cpus::get() as i32);
        opts.set_allow_mmap_writes(true);
        opts.set_allow_mmap_reads(true);
        opts.create_missing_column_families(true);
        opts.set_atomic_flush(true);
        opts
    };
}

/// Key of a tree's record in the `meta` column family; also the prefix of all
/// its node and value keys.
pub(super) fn tree_key(tree_id: u64) -> [u8; 8] {
    tree_id.to_be_bytes()
}

/// Key of node or leaf `index` of a tree. Big-endian so a tree's records sort
/// together and in index order.
pub(super) fn indexed_key(tree_id: u64, index: u64) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&tree_id.to_be_bytes());
    key[8..].copy_from_slice(&index.to_be_bytes());
    key
}

/// Write options for every write: a write is on disk once acknowledged.
pub(super) fn sync_write_options() -> WriteOptions {
    let mut opts = WriteOptions::default();
    opts.set_sync(true);
    opts
}

pub(super) fn cf_handle<'db>(db: &'db Db, name: &'static str) -> Result<&'db ColumnFamily> {
    db.cf_handle(name).ok_or(Error::MissingColumnFamily(name))
}

/// Storage which uses RocksDB as its backend.
///
/// Any number of trees share one database; each is addressed by a `u64` tree
/// id. Writers of the same tree must hold [`RocksDbStorage::writer_lock`].
pub struct RocksDbStorage {
    db: Db,
    writer_locks: Mutex<HashMap<u64, Arc<Mutex<()>>>>,
}

impl RocksDbStorage {
    /// Open or create the database at `path`.
    pub fn default_rocksdb_with_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open(path, true)
    }

    /// Open the database at `path`, creating it only when `create_if_missing`
    /// is set.
    pub fn open<P: AsRef<Path>>(path: P, create_if_missing: bool) -> Result<Self> {
        let mut opts = DEFAULT_OPTS.clone();
        opts.create_if_missing(create_if_missing);
        let db = Db::open_cf_descriptors(
            &opts,
            &path,
            [
                ColumnFamilyDescriptor::new(NODES_CF_NAME, DEFAULT_OPTS.clone()),
                ColumnFamilyDescriptor::new(VALUES_CF_NAME, DEFAULT_OPTS.clone()),
                ColumnFamilyDescriptor::new(META_CF_NAME, DEFAULT_OPTS.clone()),
            ],
        )?;
        debug!(path = %path.as_ref().display(), "opened RocksDB storage");

        Ok(RocksDbStorage {
            db,
            writer_locks: Mutex::new(HashMap::new()),
        })
    }

    /// Context reading and writing tree `tree_id` directly against the
    /// database.
    pub fn tree_context(&self, tree_id: u64) -> TreeContext<'_> {
        TreeContext::new(&self.db, None, tree_id)
    }

    /// Context staging reads and writes of tree `tree_id` in `transaction`.
    pub fn tree_transaction_context<'a>(
        &'a self,
        tree_id: u64,
        transaction: &'a Tx<'a>,
    ) -> TreeContext<'a> {
        TreeContext::new(&self.db, Some(transaction), tree_id)
    }

    /// Start a new optimistic transaction. Its commit is synced to disk.
    pub fn start_transaction(&self) -> Tx<'_> {
        self.db.transaction_opt(
            &sync_write_options(),
            &OptimisticTransactionOptions::default(),
        )
    }

    /// Commit `transaction`. A conflicting commit to the same keys since
    /// the transaction read them makes this fail without applying anything.
    pub fn commit_transaction(&self, transaction: Tx<'_>) -> Result<()> {
        transaction.commit().map_err(|e| {
            warn!(error = %e, "transaction commit failed");
            Error::from(e)
        })
    }

    /// Discard everything staged in `transaction`.
    pub fn rollback_transaction(&self, transaction: &Tx<'_>) -> Result<()> {
        Ok(transaction.rollback()?)
    }

    /// Flush memtables of all column families to disk.
    pub fn flush(&self) -> Result<()> {
        for name in [NODES_CF_NAME, VALUES_CF_NAME, META_CF_NAME] {
            self.db.flush_cf(cf_handle(&self.db, name)?)?;
        }
        Ok(())
    }

    /// Delete every node, value and the node count of tree `tree_id`.
    ///
    /// Administrative: the tree reads as empty afterwards. Callers must hold
    /// the tree's writer lock.
    pub fn clear_tree(&self, tree_id: u64) -> Result<()> {
        let prefix = tree_key(tree_id);
        let mut batch = WriteBatchWithTransaction::<true>::default();
        let mut removed = 0usize;
        for name in [NODES_CF_NAME, VALUES_CF_NAME] {
            let cf = cf_handle(&self.db, name)?;
            for item in self
                .db
                .iterator_cf(cf, IteratorMode::From(&prefix, Direction::Forward))
            {
                let (key, _) = item?;
                if !key.starts_with(&prefix) {
                    break;
                }
                batch.delete_cf(cf, key);
                removed += 1;
            }
        }
        batch.delete_cf(cf_handle(&self.db, META_CF_NAME)?, prefix);
        self.db.write_opt(batch, &sync_write_options())?;
        debug!(tree_id, removed, "cleared tree");
        Ok(())
    }

    /// The mutex serializing writers of tree `tree_id`.
    ///
    /// Every caller asking for the same tree id gets the same mutex.
    pub fn writer_lock(&self, tree_id: u64) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .writer_locks
            .lock()
            .map_err(|_| Error::LockPoisoned("writer lock registry"))?;
        Ok(Arc::clone(locks.entry(tree_id).or_default()))
    }

    #[cfg(test)]
    pub(crate) fn db(&self) -> &Db {
        &self.db
    }
}
