use proptest::prelude::*;

use crate::{
    Blake3Hasher, Hash, MemStore, MerkleHasher, NodeStoreReadOps, append_leaf,
    helper::{pos_height_in_tree, subtree_size},
    is_valid_mmr_size, last_leaf_index, leaf_count, leaf_index_to_mmr_size, make_proof,
    mmr_index, peak_positions, pos_to_leaf_index, root,
};

fn leaf_from_u64(i: u64) -> Hash {
    Blake3Hasher.digest(&i.to_be_bytes())
}

proptest! {
    #[test]
    fn leaf_index_round_trips(index in 0u64..(1 << 40)) {
        prop_assert_eq!(pos_to_leaf_index(mmr_index(index)), Some(index));
    }

    #[test]
    fn leaf_count_after_n_leaves(n in 1u64..(1 << 40)) {
        let size = leaf_index_to_mmr_size(n - 1);
        prop_assert!(is_valid_mmr_size(size));
        prop_assert_eq!(leaf_count(size), n);
        prop_assert_eq!(last_leaf_index(size), Some(n - 1));
    }

    #[test]
    fn leaf_count_is_monotonic(size in 0u64..(1 << 40)) {
        prop_assert!(leaf_count(size) <= leaf_count(size + 1));
    }

    #[test]
    fn peaks_cover_the_whole_mmr(n in 1u64..(1 << 40)) {
        let size = leaf_index_to_mmr_size(n - 1);
        let peaks = peak_positions(size);
        let covered: u64 = peaks
            .iter()
            .map(|peak| subtree_size(pos_height_in_tree(*peak)))
            .sum();
        prop_assert_eq!(covered, size);
        prop_assert_eq!(peaks.last().copied(), Some(size - 1));
        // tallest first
        let heights: Vec<u8> = peaks.iter().map(|peak| pos_height_in_tree(*peak)).collect();
        prop_assert!(heights.windows(2).all(|pair| pair[0] > pair[1]));
    }

    #[test]
    fn every_leaf_proof_verifies(count in 1u64..200, seed in any::<u64>()) {
        let store = MemStore::with_capacity(2 * count);
        let mut size = 0;
        for i in 0..count {
            size = append_leaf(&store, Blake3Hasher, leaf_from_u64(i)).expect("append");
        }
        prop_assert_eq!(leaf_count(size), count);
        prop_assert_eq!((&store).node_count().expect("size"), size);

        let leaf = seed % count;
        let proof = make_proof(&store, Blake3Hasher, size, mmr_index(leaf)).expect("gen proof");
        prop_assert_eq!(
            proof.claimed_root(),
            &root(&store, Blake3Hasher, size).expect("root")
        );
        prop_assert!(proof.verify(&Blake3Hasher, leaf_from_u64(leaf)).is_ok());
        prop_assert!(proof.verify(&Blake3Hasher, leaf_from_u64(leaf + count)).is_err());
    }
}
