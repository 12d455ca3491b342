//! Position arithmetic.
//!
//! Nodes are numbered from 0 in the order they are created. An MMR of
//! `mmr_size` nodes is a row of perfect binary trees ("mountains") of strictly
//! decreasing height; the 11 leaf MMR of 19 nodes looks like this:
//!
//! ```text
//!           14
//!        /       \
//!      6          13
//!    /   \       /   \
//!   2     5     9     12     17
//!  / \   /  \  / \   /  \   /  \
//! 0   1 3   4 7   8 10  11 15  16 18
//! ```
//!
//! Everything here is derived from node counts and positions alone.

/// Node position of leaf `index`.
///
/// The leaf is followed by one merge parent per trailing one bit of `index`,
/// which all come before the size after the leaf's append. Overflows for
/// `index >= 2^63 - 1`.
pub fn leaf_index_to_pos(index: u64) -> u64 {
    leaf_index_to_mmr_size(index) - (index + 1).trailing_zeros() as u64 - 1
}

/// Node count once leaves `0..=index` are appended.
///
/// Each leaf brings itself plus one parent, except that every mountain has
/// one node fewer than twice its leaves. Overflows for `index >= 2^63 - 1`.
pub fn leaf_index_to_mmr_size(index: u64) -> u64 {
    let leaves = index + 1;
    2 * leaves - leaves.count_ones() as u64
}

/// Leaf index of the node at `pos`, or `None` for an interior node.
///
/// A leaf is written when the MMR holds exactly `pos` nodes, so its index is
/// the leaf count of that size.
pub fn pos_to_leaf_index(pos: u64) -> Option<u64> {
    match pos_height_in_tree(pos) {
        0 => Some(mmr_size_to_leaf_count(pos)),
        _ => None,
    }
}

/// Index of the leaf appended last to an MMR of `mmr_size` nodes.
pub fn last_leaf_index(mmr_size: u64) -> Option<u64> {
    mmr_size_to_leaf_count(mmr_size).checked_sub(1)
}

/// Whether appends alone can produce an MMR of exactly `mmr_size` nodes.
///
/// 2 and 5 cannot: they stop part way through a merge.
pub fn is_valid_mmr_size(mmr_size: u64) -> bool {
    match last_leaf_index(mmr_size) {
        None => mmr_size == 0,
        Some(index) => leaf_index_to_mmr_size(index) == mmr_size,
    }
}

/// Height of the node at `pos`; leaves are at height 0.
///
/// Counting from 1, the nodes whose number is all one bits are the left
/// spine of the tallest possible mountains. Any other node has the same
/// height as the node `2^k - 1` places to its left, `k` being the bit length
/// of its number.
pub fn pos_height_in_tree(pos: u64) -> u8 {
    let mut number = pos + 1;
    loop {
        let bits = 64 - number.leading_zeros();
        if number == u64::MAX >> (64 - bits) {
            return (bits - 1) as u8;
        }
        number -= (1 << (bits - 1)) - 1;
    }
}

/// Distance from a left child at `height` to its parent.
pub fn parent_offset(height: u8) -> u64 {
    2 << height
}

/// Distance between two siblings at `height`.
pub fn sibling_offset(height: u8) -> u64 {
    (2 << height) - 1
}

/// Number of nodes in a mountain of `height`; `height` is at most 63.
pub fn subtree_size(height: u8) -> u64 {
    u64::MAX >> (63 - height)
}

/// Mountains that fit in `mmr_size` nodes as `(height, peak position)`,
/// tallest first. Nodes past the last complete mountain are ignored, so an
/// invalid size describes the largest valid MMR it contains.
fn mountains(mmr_size: u64) -> impl Iterator<Item = (u8, u64)> {
    let tallest = 64 - mmr_size.leading_zeros();
    let mut remaining = mmr_size;
    let mut end = 0;
    (0..tallest as u8).rev().filter_map(move |height| {
        let size = subtree_size(height);
        if remaining < size {
            return None;
        }
        remaining -= size;
        end += size;
        Some((height, end - 1))
    })
}

/// Peak positions of an MMR of `mmr_size` nodes, tallest first.
///
/// `[14, 17, 18]` for the MMR drawn above.
pub fn get_peaks(mmr_size: u64) -> Vec<u64> {
    mountains(mmr_size).map(|(_, peak)| peak).collect()
}

/// One bit per mountain, set at the mountain's height; `0b1011` for the MMR
/// drawn above. Its value is the leaf count.
pub fn get_peak_map(mmr_size: u64) -> u64 {
    mountains(mmr_size).fold(0, |map, (height, _)| map | 1 << height)
}

/// Number of leaves in an MMR of `mmr_size` nodes.
pub fn mmr_size_to_leaf_count(mmr_size: u64) -> u64 {
    get_peak_map(mmr_size)
}

/// Hash invocations made by appending to an MMR of `leaf_count` leaves: the
/// leaf digest plus one merge per trailing one bit. Bagging is not counted.
pub fn hash_count_for_push(leaf_count: u64) -> u32 {
    1 + leaf_count.trailing_ones()
}
