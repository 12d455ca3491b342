//! Append, peak bagging and proof generation.

use tracing::debug;

use crate::{
    Error, Hash, MerkleHasher, Proof, Result,
    helper::{get_peaks, is_valid_mmr_size, parent_offset, pos_height_in_tree, sibling_offset},
    node_store::{NodeBatch, NodeStoreReadOps, NodeStoreWriteOps},
};

/// A Merkle Mountain Range backed by a pluggable store.
///
/// `S` is the backing store (implements [`NodeStoreReadOps`] and/or
/// [`NodeStoreWriteOps`]) and `H` the hash function used for merging and
/// bagging.
///
/// The MMR is opened at a fixed node count and only ever reads positions
/// below it, so every read made through one instance sees the same tree
/// state. Mutations are buffered in a [`NodeBatch`]; call [`MMR::commit`] to
/// flush them to the store.
#[allow(clippy::upper_case_acronyms)]
pub struct MMR<S, H> {
    mmr_size: u64,
    batch: NodeBatch<S>,
    hasher: H,
}

impl<S, H> MMR<S, H> {
    /// Create a new MMR starting at the given size, backed by `store`.
    ///
    /// Use `mmr_size = 0` for a fresh, empty MMR. To resume an existing
    /// MMR, pass the node count of the store.
    pub fn new(mmr_size: u64, store: S, hasher: H) -> Self {
        MMR {
            mmr_size,
            batch: NodeBatch::new(store),
            hasher,
        }
    }

    /// The current total number of nodes (leaves + internal) in the MMR.
    pub fn mmr_size(&self) -> u64 {
        self.mmr_size
    }

    /// Returns `true` if the MMR contains no elements.
    pub fn is_empty(&self) -> bool {
        self.mmr_size == 0
    }

    /// Return a reference to the internal [`NodeBatch`].
    pub fn batch(&self) -> &NodeBatch<S> {
        &self.batch
    }

    /// Return a reference to the underlying store.
    pub fn store(&self) -> &S {
        self.batch.store()
    }
}

impl<S: NodeStoreReadOps, H: MerkleHasher> MMR<S, H> {
    // Find a node by position, checking nodes of the push in flight first.
    fn find_node_at_position(&self, pos: u64, hashes: &[Hash]) -> Result<Hash> {
        let pos_offset = pos.checked_sub(self.mmr_size);
        if let Some(hash) = pos_offset.and_then(|i| hashes.get(i as usize)) {
            return Ok(*hash);
        }
        self.node(pos)
    }

    fn node(&self, pos: u64) -> Result<Hash> {
        self.batch.node_at_position(pos)?.ok_or_else(|| {
            Error::StorageFailure(format!(
                "inconsistent store: node {} missing below size {}",
                pos, self.mmr_size
            ))
        })
    }

    /// Append a leaf hash and return its position in the MMR.
    ///
    /// Every parent the leaf completes is created right after it, left
    /// sibling first. The new nodes are buffered until [`MMR::commit`] is
    /// called.
    pub fn push(&mut self, leaf: Hash) -> Result<u64> {
        if !is_valid_mmr_size(self.mmr_size) {
            return Err(Error::StorageFailure(format!(
                "{} is not a valid MMR size",
                self.mmr_size
            )));
        }
        let leaf_pos = self.mmr_size;
        let mut hashes = vec![leaf];
        let mut pos = leaf_pos;
        let mut height = 0u8;
        // the next position is a parent while it is taller than the node just
        // written, so the node just written is a right child
        while pos_height_in_tree(pos + 1) > height {
            let left = self.find_node_at_position(pos - sibling_offset(height), &hashes)?;
            let right = hashes[hashes.len() - 1];
            hashes.push(self.hasher.merge(&left, &right));
            pos += 1;
            height += 1;
        }
        debug!(leaf_pos, merges = height, "pushed leaf");
        self.batch.append(leaf_pos, hashes);
        self.mmr_size = pos + 1;
        Ok(leaf_pos)
    }

    /// Hashes of the current peaks, tallest first.
    pub fn peak_hashes(&self) -> Result<Vec<Hash>> {
        get_peaks(self.mmr_size)
            .into_iter()
            .map(|peak_pos| self.node(peak_pos))
            .collect()
    }

    /// Compute the root hash by bagging all peaks right-to-left.
    ///
    /// Returns [`Error::NotFound`] for an empty MMR.
    pub fn get_root(&self) -> Result<Hash> {
        let peaks = self.peak_hashes()?;
        bag_peaks(&self.hasher, peaks)
            .ok_or_else(|| Error::NotFound("root of an empty MMR".into()))
    }

    /// Generate an inclusion proof for the node at `pos`.
    ///
    /// `pos` may be a leaf or an internal node. The path holds the siblings
    /// up to the node's peak, then the bagged peaks to its right (if any),
    /// then the peaks to its left from nearest to farthest.
    pub fn gen_proof(&self, pos: u64) -> Result<Proof> {
        if pos >= self.mmr_size {
            return Err(Error::NotFound(format!(
                "proof target {} beyond MMR size {}",
                pos, self.mmr_size
            )));
        }
        let peaks = get_peaks(self.mmr_size);
        let peak_index = peaks
            .iter()
            .position(|peak_pos| *peak_pos >= pos)
            .ok_or_else(|| Error::NotFound(format!("no peak covers position {}", pos)))?;
        let peak_pos = peaks[peak_index];

        let mut path = Vec::new();
        let target = pos;
        let mut pos = pos;
        let mut height = pos_height_in_tree(pos);
        while pos < peak_pos {
            let (sib_pos, parent_pos) = if pos_height_in_tree(pos + 1) > height {
                // implies pos is right sibling
                (pos - sibling_offset(height), pos + 1)
            } else {
                // pos is left sibling
                (pos + sibling_offset(height), pos + parent_offset(height))
            };
            path.push(self.node(sib_pos)?);
            pos = parent_pos;
            height += 1;
        }

        let rhs_peaks = peaks[peak_index + 1..]
            .iter()
            .map(|peak_pos| self.node(*peak_pos))
            .collect::<Result<Vec<_>>>()?;
        if let Some(bagged) = bag_peaks(&self.hasher, rhs_peaks) {
            path.push(bagged);
        }
        for peak_pos in peaks[..peak_index].iter().rev() {
            path.push(self.node(*peak_pos)?);
        }

        Ok(Proof::new(self.get_root()?, target, self.mmr_size, path))
    }
}

impl<S: NodeStoreWriteOps, H> MMR<S, H> {
    /// Flush all buffered mutations to the underlying store.
    pub fn commit(&mut self) -> Result<()> {
        let pending = self.batch.len();
        self.batch.commit()?;
        debug!(mmr_size = self.mmr_size, pending, "committed MMR nodes");
        Ok(())
    }
}

/// Bag peaks right-to-left: hash(right, left) repeatedly until one remains.
///
/// A single peak is returned unchanged; no peaks yields `None`.
pub fn bag_peaks<H: MerkleHasher>(hasher: &H, mut peaks: Vec<Hash>) -> Option<Hash> {
    while peaks.len() > 1 {
        let right_peak = peaks.pop()?;
        let left_peak = peaks.pop()?;
        peaks.push(hasher.merge(&right_peak, &left_peak));
    }
    peaks.pop()
}

/// Append `leaf` to `store` and return the new node count.
///
/// The leaf and every merge parent it completes are written with a single
/// store append, so a failure leaves the store at its previous size.
pub fn append_leaf<S, H>(store: S, hasher: H, leaf: Hash) -> Result<u64>
where
    S: NodeStoreReadOps + NodeStoreWriteOps,
    H: MerkleHasher,
{
    let size = store.node_count()?;
    let mut mmr = MMR::new(size, store, hasher);
    mmr.push(leaf)?;
    mmr.commit()?;
    Ok(mmr.mmr_size())
}

/// Root of the tree formed by the first `mmr_size` nodes of `store`.
pub fn root<S: NodeStoreReadOps, H: MerkleHasher>(
    store: S,
    hasher: H,
    mmr_size: u64,
) -> Result<Hash> {
    MMR::new(mmr_size, store, hasher).get_root()
}

/// Inclusion proof for the node at `pos` in the tree formed by the first
/// `mmr_size` nodes of `store`.
pub fn make_proof<S: NodeStoreReadOps, H: MerkleHasher>(
    store: S,
    hasher: H,
    mmr_size: u64,
    pos: u64,
) -> Result<Proof> {
    MMR::new(mmr_size, store, hasher).gen_proof(pos)
}
