use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{Error, Hash, NodeStoreReadOps, NodeStoreWriteOps, Result};

/// In-memory MMR store with a capacity fixed at construction.
///
/// Used for tests and vector generation. The store never grows past its
/// capacity: an append that does not fit is rejected as a whole.
pub struct MemStore {
    capacity: u64,
    nodes: RwLock<Vec<Hash>>,
}

impl MemStore {
    /// Create an empty store able to hold `capacity` nodes.
    pub fn with_capacity(capacity: u64) -> Self {
        MemStore {
            capacity,
            nodes: RwLock::new(Vec::new()),
        }
    }

    /// Maximum number of nodes this store accepts.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<Hash>>> {
        self.nodes
            .read()
            .map_err(|_| Error::StorageFailure("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<Hash>>> {
        self.nodes
            .write()
            .map_err(|_| Error::StorageFailure("memory store lock poisoned".into()))
    }
}

impl NodeStoreReadOps for &MemStore {
    fn node_count(&self) -> Result<u64> {
        Ok(self.read()?.len() as u64)
    }

    fn node_at_position(&self, pos: u64) -> Result<Option<Hash>> {
        Ok(self.read()?.get(pos as usize).copied())
    }
}

impl NodeStoreWriteOps for &MemStore {
    fn append(&mut self, pos: u64, elems: Vec<Hash>) -> Result<u64> {
        let mut nodes = self.write()?;
        let size = nodes.len() as u64;
        if pos != size {
            return Err(Error::StorageFailure(format!(
                "append at position {} but store holds {} nodes",
                pos, size
            )));
        }
        let requested = size + elems.len() as u64;
        if requested > self.capacity {
            return Err(Error::CapacityExceeded {
                capacity: self.capacity,
                requested,
            });
        }
        nodes.extend(elems);
        Ok(requested)
    }
}
