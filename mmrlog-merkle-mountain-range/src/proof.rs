//! Inclusion proofs for a single MMR node against a bagged root.

use bincode::{Decode, Encode};
use tracing::debug;

use crate::{
    Error, Hash, MerkleHasher, Result,
    helper::{get_peaks, is_valid_mmr_size, parent_offset, pos_height_in_tree},
};

/// An MMR inclusion proof for one node.
///
/// `path` holds, in order: the sibling hashes from the node up to its peak,
/// the bagged hash of the peaks to the right of that peak (absent for the
/// last peak), and the peaks to its left from nearest to farthest. Which side
/// each entry is combined on follows from `node_index` and `tree_size`; it is
/// never stored.
///
/// The field order is the wire order.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct Proof {
    claimed_root: Hash,
    node_index: u64,
    tree_size: u64,
    path: Vec<Hash>,
}

impl Proof {
    /// Create a proof from its constituent parts.
    pub fn new(claimed_root: Hash, node_index: u64, tree_size: u64, path: Vec<Hash>) -> Self {
        Proof {
            claimed_root,
            node_index,
            tree_size,
            path,
        }
    }

    /// The root the proof claims the node is included in.
    pub fn claimed_root(&self) -> &Hash {
        &self.claimed_root
    }

    /// Position of the proved node.
    pub fn node_index(&self) -> u64 {
        self.node_index
    }

    /// The MMR size at proof generation time.
    pub fn tree_size(&self) -> u64 {
        self.tree_size
    }

    /// The sibling and peak hashes of the proof.
    pub fn path(&self) -> &[Hash] {
        &self.path
    }

    /// Recompute the root from the proved node's hash and this path.
    ///
    /// Fails with [`Error::InvalidProofShape`] when the proof cannot describe
    /// any node of a tree of `tree_size` nodes, and with
    /// [`Error::VerificationFailed`] when the path does not fit the proved
    /// node.
    pub fn calculate_root<H: MerkleHasher>(&self, hasher: &H, node_hash: Hash) -> Result<Hash> {
        if !is_valid_mmr_size(self.tree_size) || self.tree_size == 0 {
            return Err(Error::InvalidProofShape(format!(
                "{} is not the size of a non-empty MMR",
                self.tree_size
            )));
        }
        let max_len = max_path_len(self.tree_size);
        if self.path.len() > max_len {
            return Err(Error::InvalidProofShape(format!(
                "path of {} entries exceeds the {} any node of a {} node MMR needs",
                self.path.len(),
                max_len,
                self.tree_size
            )));
        }
        if self.node_index >= self.tree_size {
            return Err(Error::VerificationFailed(format!(
                "node {} is outside a {} node MMR",
                self.node_index, self.tree_size
            )));
        }
        let expected = expected_path_len(self.tree_size, self.node_index);
        if Some(self.path.len()) != expected {
            return Err(Error::VerificationFailed(format!(
                "path of {} entries does not fit node {} of a {} node MMR",
                self.path.len(),
                self.node_index,
                self.tree_size
            )));
        }

        let peaks = get_peaks(self.tree_size);
        let Some(peak_index) = peaks.iter().position(|peak| *peak >= self.node_index) else {
            return Err(Error::VerificationFailed(format!(
                "no peak covers node {}",
                self.node_index
            )));
        };
        let peak_pos = peaks[peak_index];
        let mut path = self.path.iter();
        let mut next = || {
            path.next()
                .ok_or_else(|| Error::VerificationFailed("proof path exhausted".into()))
        };

        let mut acc = node_hash;
        let mut pos = self.node_index;
        let mut height = pos_height_in_tree(pos);
        while pos < peak_pos {
            let sibling = next()?;
            if pos_height_in_tree(pos + 1) > height {
                // implies pos is right sibling
                acc = hasher.merge(sibling, &acc);
                pos += 1;
            } else {
                // pos is left sibling
                acc = hasher.merge(&acc, sibling);
                pos += parent_offset(height);
            }
            height += 1;
        }
        if pos != peak_pos {
            return Err(Error::VerificationFailed(format!(
                "node {} does not climb to peak {}",
                self.node_index, peak_pos
            )));
        }

        // bagging runs right to left, the accumulated side is always the
        // left operand of the merge
        if peak_index + 1 < peaks.len() {
            acc = hasher.merge(next()?, &acc);
        }
        for _ in 0..peak_index {
            acc = hasher.merge(&acc, next()?);
        }
        Ok(acc)
    }

    /// Verify that the node hashing to `node_hash` is included in
    /// `claimed_root`.
    pub fn verify<H: MerkleHasher>(&self, hasher: &H, node_hash: Hash) -> Result<()> {
        let root = self.calculate_root(hasher, node_hash).inspect_err(|e| {
            debug!(node_index = self.node_index, error = %e, "proof rejected");
        })?;
        if root != self.claimed_root {
            debug!(node_index = self.node_index, "proof root mismatch");
            return Err(Error::VerificationFailed(format!(
                "recomputed root for node {} does not match the claimed root",
                self.node_index
            )));
        }
        Ok(())
    }

    /// Serialize this proof to bytes using bincode.
    pub fn encode_to_vec(&self) -> Result<Vec<u8>> {
        let config = bincode::config::standard()
            .with_big_endian()
            .with_no_limit();
        bincode::encode_to_vec(self, config)
            .map_err(|e| Error::InvalidData(format!("failed to encode Proof: {}", e)))
    }

    /// Deserialize a proof from bytes.
    ///
    /// The bincode size limit is capped at 100 MiB to prevent
    /// crafted length headers from causing huge allocations.
    pub fn decode_from_slice(bytes: &[u8]) -> Result<Self> {
        let config = bincode::config::standard()
            .with_big_endian()
            .with_limit::<{ 100 * 1024 * 1024 }>();
        let (proof, _) = bincode::decode_from_slice(bytes, config)
            .map_err(|e| Error::InvalidData(format!("failed to decode Proof: {}", e)))?;
        Ok(proof)
    }
}

/// Verify `proof` for the node hashing to `node_hash`.
pub fn verify_proof<H: MerkleHasher>(hasher: &H, proof: &Proof, node_hash: Hash) -> Result<()> {
    proof.verify(hasher, node_hash)
}

/// Exact path length of a proof for node `pos` in an MMR of `mmr_size`
/// nodes, or `None` when `pos` is not part of that MMR.
pub fn expected_path_len(mmr_size: u64, pos: u64) -> Option<usize> {
    if pos >= mmr_size {
        return None;
    }
    let peaks = get_peaks(mmr_size);
    let peak_index = peaks.iter().position(|peak| *peak >= pos)?;
    let climb = pos_height_in_tree(peaks[peak_index]).checked_sub(pos_height_in_tree(pos))?;
    Some(path_len(climb, peak_index, peaks.len()))
}

/// Longest path any node of an MMR of `mmr_size` nodes can need.
pub fn max_path_len(mmr_size: u64) -> usize {
    let peaks = get_peaks(mmr_size);
    peaks
        .iter()
        .enumerate()
        .map(|(peak_index, peak)| path_len(pos_height_in_tree(*peak), peak_index, peaks.len()))
        .max()
        .unwrap_or(0)
}

fn path_len(climb: u8, peak_index: usize, peak_count: usize) -> usize {
    let rhs = usize::from(peak_index + 1 < peak_count);
    climb as usize + rhs + peak_index
}
