use std::{
    collections::BTreeMap,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::{Error, Result};

/// Raw leaf payloads of one tree, keyed by leaf index.
///
/// Values are independent of hash correctness: the tree only hands them back
/// to callers. A leaf index is written at most once.
pub trait ValueStore {
    /// The payload recorded for `leaf_index`, if any.
    fn value(&self, leaf_index: u64) -> Result<Option<Vec<u8>>>;

    /// Record the payload of `leaf_index`.
    ///
    /// Fails with [`Error::ValueExists`] if the index already has a value.
    fn put_value(&mut self, leaf_index: u64, value: &[u8]) -> Result<()>;
}

/// In-memory value store.
#[derive(Debug, Default)]
pub struct MemValueStore {
    values: RwLock<BTreeMap<u64, Vec<u8>>>,
}

impl MemValueStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded values.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    /// Returns `true` if no value is recorded.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.is_empty())
    }

    /// Drop the payload of `leaf_index`, returning it if one was recorded.
    ///
    /// Only for undoing a [`ValueStore::put_value`] whose leaf never made it
    /// into the tree.
    pub fn remove_value(&self, leaf_index: u64) -> Result<Option<Vec<u8>>> {
        Ok(self.write()?.remove(&leaf_index))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<u64, Vec<u8>>>> {
        self.values
            .read()
            .map_err(|_| Error::LockPoisoned("value store"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<u64, Vec<u8>>>> {
        self.values
            .write()
            .map_err(|_| Error::LockPoisoned("value store"))
    }
}

impl ValueStore for &MemValueStore {
    fn value(&self, leaf_index: u64) -> Result<Option<Vec<u8>>> {
        Ok(self.read()?.get(&leaf_index).cloned())
    }

    fn put_value(&mut self, leaf_index: u64, value: &[u8]) -> Result<()> {
        let mut values = self.write()?;
        if values.contains_key(&leaf_index) {
            return Err(Error::ValueExists(leaf_index));
        }
        values.insert(leaf_index, value.to_vec());
        Ok(())
    }
}
