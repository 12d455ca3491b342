use crate::{Error, Hash, Result};

/// Read access to the MMR backing store.
///
/// A store holds one tree's nodes in position order. Positions below
/// [`node_count`](NodeStoreReadOps::node_count) never change once written.
pub trait NodeStoreReadOps {
    /// Number of nodes committed to the store.
    fn node_count(&self) -> Result<u64>;

    /// Retrieve the node stored at `pos`, if any.
    fn node_at_position(&self, pos: u64) -> Result<Option<Hash>>;

    /// Retrieve the node at `pos`, failing with [`Error::NotFound`] when the
    /// position has not been written.
    fn get(&self, pos: u64) -> Result<Hash> {
        self.node_at_position(pos)?
            .ok_or_else(|| Error::NotFound(format!("node at position {}", pos)))
    }
}

/// Write access to the MMR backing store.
pub trait NodeStoreWriteOps {
    /// Persist `nodes` starting at position `pos` and return the new node
    /// count.
    ///
    /// Implementations apply the whole run or nothing, and refuse the write
    /// unless `pos` equals their current node count.
    fn append(&mut self, pos: u64, nodes: Vec<Hash>) -> Result<u64>;

    /// Append a single node at the end of the store.
    fn push_node(&mut self, hash: Hash) -> Result<u64>
    where
        Self: NodeStoreReadOps,
    {
        let pos = self.node_count()?;
        self.append(pos, vec![hash])
    }
}

/// Write-ahead buffer for MMR mutations.
///
/// Appended nodes are held in memory and served back on reads (overlay
/// semantics). [`NodeBatch::commit`] flushes the buffer to the underlying
/// store in a single [`NodeStoreWriteOps::append`] call.
#[derive(Default)]
pub struct NodeBatch<Store> {
    start: Option<u64>,
    pending: Vec<Hash>,
    store: Store,
}

impl<Store> NodeBatch<Store> {
    /// Create a new batch wrapping the given store.
    pub fn new(store: Store) -> Self {
        NodeBatch {
            start: None,
            pending: Vec::new(),
            store,
        }
    }

    /// Buffer a contiguous run of nodes starting at `pos`.
    ///
    /// Runs must follow each other without gaps.
    pub fn append(&mut self, pos: u64, nodes: Vec<Hash>) {
        match self.start {
            Some(start) => debug_assert_eq!(start + self.pending.len() as u64, pos),
            None => self.start = Some(pos),
        }
        self.pending.extend(nodes);
    }

    /// Number of buffered nodes.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Return a reference to the underlying store.
    pub fn store(&self) -> &Store {
        &self.store
    }
}

impl<Store: NodeStoreReadOps> NodeBatch<Store> {
    /// Look up a node by position, checking the in-memory batch first.
    pub fn node_at_position(&self, pos: u64) -> Result<Option<Hash>> {
        match self.start {
            Some(start) if pos >= start => Ok(self.pending.get((pos - start) as usize).copied()),
            _ => self.store.node_at_position(pos),
        }
    }
}

impl<Store: NodeStoreWriteOps> NodeBatch<Store> {
    /// Flush all buffered nodes to the underlying store.
    ///
    /// On failure the buffer is kept so nothing is silently dropped.
    pub fn commit(&mut self) -> Result<()> {
        let Some(start) = self.start else {
            return Ok(());
        };
        self.store.append(start, self.pending.clone())?;
        self.pending.clear();
        self.start = None;
        Ok(())
    }
}
