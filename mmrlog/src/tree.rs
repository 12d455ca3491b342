//! The verifier tree interface and the logic its backends share.

use mmrlog_merkle_mountain_range::{
    Hash, MerkleHasher, NodeStoreReadOps, Proof, is_valid_mmr_size, leaf_count, make_proof,
    mmr_index, root,
};
use mmrlog_storage::ValueStore;
use tracing::{debug, warn};

use crate::{Error, Result};

/// A verifiable append-only log of opaque values.
///
/// Appends are serialized per tree; reads may run alongside them and always
/// work against one node count observed at their start.
pub trait VerifierTree {
    /// Append `value` and return its leaf index.
    fn add(&self, value: &[u8]) -> Result<u64>;

    /// The value stored for leaf `leaf_index`.
    fn get_value(&self, leaf_index: u64) -> Result<Vec<u8>>;

    /// The hash stored for leaf `leaf_index`, equal to the hash of its value.
    fn get_node(&self, leaf_index: u64) -> Result<Hash>;

    /// Number of leaves appended so far.
    fn leaf_count(&self) -> Result<u64>;

    /// Root over every node currently in the tree.
    fn root(&self) -> Result<Hash>;

    /// Inclusion proof of leaf `leaf_index` against the current root.
    fn make_proof(&self, leaf_index: u64) -> Result<Proof>;

    /// Check `proof` against this tree's state at the size the proof was
    /// built for.
    fn verify_proof(&self, proof: &Proof) -> Result<()>;
}

fn check_leaf(size: u64, leaf_index: u64) -> Result<()> {
    let count = leaf_count(size);
    if leaf_index >= count {
        return Err(Error::NotFound(format!(
            "leaf {} of a tree with {} leaves",
            leaf_index, count
        )));
    }
    Ok(())
}

pub(crate) fn node_of_leaf<S: NodeStoreReadOps>(
    store: S,
    size: u64,
    leaf_index: u64,
) -> Result<Hash> {
    check_leaf(size, leaf_index)?;
    Ok(store.get(mmr_index(leaf_index))?)
}

/// A leaf below the count whose value is missing is an orphan: its node was
/// written but the value write never happened.
pub(crate) fn value_of_leaf<V: ValueStore>(
    values: V,
    size: u64,
    leaf_index: u64,
) -> Result<Vec<u8>> {
    check_leaf(size, leaf_index)?;
    match values.value(leaf_index)? {
        Some(value) => Ok(value),
        None => {
            warn!(leaf_index, size, "leaf has a node but no stored value");
            Err(Error::OrphanedLeaf(leaf_index))
        }
    }
}

pub(crate) fn current_root<S: NodeStoreReadOps, H: MerkleHasher>(
    store: S,
    hasher: &H,
    size: u64,
) -> Result<Hash> {
    Ok(root(store, hasher.clone(), size)?)
}

pub(crate) fn proof_of_leaf<S: NodeStoreReadOps, H: MerkleHasher>(
    store: S,
    hasher: &H,
    size: u64,
    leaf_index: u64,
) -> Result<Proof> {
    check_leaf(size, leaf_index)?;
    Ok(make_proof(store, hasher.clone(), size, mmr_index(leaf_index))?)
}

/// Verify `proof` against the tree as it was at `proof.tree_size()` nodes.
///
/// Nodes are never rewritten, so the node hash and the root at that size
/// both come from the store; the proof only has to supply the path.
pub(crate) fn check_proof<S: NodeStoreReadOps, H: MerkleHasher>(
    store: S,
    hasher: &H,
    size: u64,
    proof: &Proof,
) -> Result<()> {
    let tree_size = proof.tree_size();
    if tree_size == 0 || !is_valid_mmr_size(tree_size) {
        return Err(Error::InvalidProofShape(format!(
            "{} is not the size of a non-empty tree",
            tree_size
        )));
    }
    if tree_size > size {
        return Err(Error::NotFound(format!(
            "proof is for {} nodes but the tree holds {}",
            tree_size, size
        )));
    }
    if proof.node_index() >= tree_size {
        return Err(Error::VerificationFailed(format!(
            "node {} is outside a {} node tree",
            proof.node_index(),
            tree_size
        )));
    }
    let node_hash = store.get(proof.node_index())?;
    if current_root(store, hasher, tree_size)? != *proof.claimed_root() {
        debug!(tree_size, "claimed root is not the tree's root at that size");
        return Err(Error::VerificationFailed(format!(
            "claimed root is not the root of the tree at {} nodes",
            tree_size
        )));
    }
    Ok(proof.verify(hasher, node_hash)?)
}
