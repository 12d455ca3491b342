use std::{sync::Arc, thread};

use assert_matches::assert_matches;
use mmrlog::{
    Error, HashAlgorithm, InMemoryVerifierTree, MerkleHasher, Proof, RocksDbVerifierTree,
    Sha256Hasher, TreeConfig, VerifierTree,
};
use mmrlog_merkle_mountain_range::append_leaf;
use mmrlog_storage::rocksdb_storage::test_utils::TempStorage;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn hello(i: u64) -> Vec<u8> {
    format!("hello {:02}", i).into_bytes()
}

/// Eight values in, every value, node and proof back out.
fn hello_scenario(tree: &dyn VerifierTree) {
    for i in 0..8 {
        assert_eq!(tree.add(&hello(i)).expect("add"), i);
    }
    assert_eq!(tree.leaf_count().expect("leaf count"), 8);

    let root = tree.root().expect("root");
    assert_eq!(tree.root().expect("root again"), root);

    for i in 0..8 {
        let value = tree.get_value(i).expect("value");
        assert_eq!(value, hello(i));
        assert_eq!(tree.get_node(i).expect("node"), Sha256Hasher.digest(&value));

        let proof = tree.make_proof(i).expect("proof");
        assert_eq!(proof.claimed_root(), &root);
        tree.verify_proof(&proof).expect("proof verifies");
    }

    let mut corrupted = tree.get_value(3).expect("value");
    corrupted[0] ^= 1;
    assert_ne!(
        Sha256Hasher.digest(&corrupted),
        tree.get_node(3).expect("node")
    );

    assert_matches!(tree.get_value(8), Err(Error::NotFound(_)));
    assert_matches!(tree.get_node(8), Err(Error::NotFound(_)));
    assert_matches!(tree.make_proof(8), Err(Error::NotFound(_)));
}

/// Every single-byte change to a proof is caught as a failed verification.
fn tamper_scenario(tree: &dyn VerifierTree) {
    for i in 0..11 {
        tree.add(&hello(i)).expect("add");
    }
    for leaf in [0, 5, 7, 10] {
        let proof = tree.make_proof(leaf).expect("proof");
        tree.verify_proof(&proof).expect("untouched proof verifies");

        for entry in 0..proof.path().len() {
            for byte in 0..32 {
                let mut path = proof.path().to_vec();
                path[entry][byte] ^= 0x80;
                let tampered = Proof::new(
                    *proof.claimed_root(),
                    proof.node_index(),
                    proof.tree_size(),
                    path,
                );
                assert_matches!(
                    tree.verify_proof(&tampered),
                    Err(Error::VerificationFailed(_))
                );
            }
        }
        for byte in 0..32 {
            let mut root = *proof.claimed_root();
            root[byte] ^= 0x01;
            let tampered = Proof::new(
                root,
                proof.node_index(),
                proof.tree_size(),
                proof.path().to_vec(),
            );
            assert_matches!(
                tree.verify_proof(&tampered),
                Err(Error::VerificationFailed(_))
            );
        }
        for bit in 0..64 {
            let tampered = Proof::new(
                *proof.claimed_root(),
                proof.node_index() ^ (1 << bit),
                proof.tree_size(),
                proof.path().to_vec(),
            );
            assert_matches!(
                tree.verify_proof(&tampered),
                Err(Error::VerificationFailed(_))
            );
        }
    }
}

/// Proofs taken at earlier sizes keep verifying as the tree grows.
fn history_scenario(tree: &dyn VerifierTree) {
    let mut proofs = Vec::new();
    for i in 0..40 {
        let leaf = tree.add(&hello(i)).expect("add");
        proofs.push(tree.make_proof(leaf).expect("proof"));
        if i % 3 == 0 {
            proofs.push(tree.make_proof(i / 2).expect("proof"));
        }
        for proof in &proofs {
            tree.verify_proof(proof).expect("historical proof verifies");
        }
    }
    let latest = tree.root().expect("root");
    assert!(proofs[..proofs.len() - 1]
        .iter()
        .any(|proof| proof.claimed_root() != &latest));
}

/// A reader checks the newest leaf while a writer keeps adding.
fn reads_during_writes<T: VerifierTree + Send + Sync + 'static>(tree: Arc<T>, leaves: u64) {
    let writer = {
        let tree = Arc::clone(&tree);
        thread::spawn(move || {
            for i in 0..leaves {
                assert_eq!(tree.add(&hello(i)).expect("add"), i);
            }
        })
    };

    let mut checked = 0;
    while !writer.is_finished() {
        let count = tree.leaf_count().expect("leaf count");
        for leaf in [count.checked_sub(1), Some(count / 2)].into_iter().flatten() {
            if leaf >= count {
                continue;
            }
            assert_eq!(tree.get_value(leaf).expect("value"), hello(leaf));
            assert_eq!(
                tree.get_node(leaf).expect("node"),
                Sha256Hasher.digest(&hello(leaf))
            );
            let proof = tree.make_proof(leaf).expect("proof");
            tree.verify_proof(&proof).expect("proof verifies");
            checked += 1;
        }
    }
    writer.join().expect("writer thread");

    assert_eq!(tree.leaf_count().expect("leaf count"), leaves);
    tree.verify_proof(&tree.make_proof(leaves - 1).expect("proof"))
        .expect("verify");
    tracing::debug!(checked, "reads checked alongside the writer");
}

#[test]
fn test_in_memory_hello() {
    init_tracing();
    hello_scenario(&InMemoryVerifierTree::new(15, Sha256Hasher));
}

#[test]
fn test_rocksdb_hello() {
    init_tracing();
    let storage = TempStorage::new();
    let tree = RocksDbVerifierTree::new(storage.shared(), 42 * 123, Sha256Hasher).expect("open");
    hello_scenario(&tree);
}

#[test]
fn test_backends_agree() {
    let storage = TempStorage::new();
    let durable = RocksDbVerifierTree::new(storage.shared(), 1, Sha256Hasher).expect("open");
    let memory = InMemoryVerifierTree::new(64, Sha256Hasher);
    for i in 0..25 {
        assert_eq!(
            durable.add(&hello(i)).expect("add"),
            memory.add(&hello(i)).expect("add")
        );
        assert_eq!(durable.root().expect("root"), memory.root().expect("root"));
    }
    let proof = memory.make_proof(17).expect("proof");
    assert_eq!(proof, durable.make_proof(17).expect("proof"));
    durable.verify_proof(&proof).expect("memory proof verifies on disk");
}

#[test]
fn test_in_memory_tamper() {
    tamper_scenario(&InMemoryVerifierTree::new(64, Sha256Hasher));
}

#[test]
fn test_rocksdb_tamper() {
    let storage = TempStorage::new();
    let tree = RocksDbVerifierTree::new(storage.shared(), 3, HashAlgorithm::Blake3).expect("open");
    tamper_scenario(&tree);
}

#[test]
fn test_in_memory_history() {
    history_scenario(&InMemoryVerifierTree::new(128, HashAlgorithm::Blake3));
}

#[test]
fn test_rocksdb_history() {
    let storage = TempStorage::new();
    let tree = RocksDbVerifierTree::new(storage.shared(), 4, Sha256Hasher).expect("open");
    history_scenario(&tree);
}

#[test]
fn test_proof_from_the_future_is_not_found() {
    let small = InMemoryVerifierTree::new(64, Sha256Hasher);
    let large = InMemoryVerifierTree::new(64, Sha256Hasher);
    for i in 0..4 {
        small.add(&hello(i)).expect("add");
    }
    for i in 0..9 {
        large.add(&hello(i)).expect("add");
    }
    let proof = large.make_proof(8).expect("proof");
    assert_matches!(small.verify_proof(&proof), Err(Error::NotFound(_)));
}

#[test]
fn test_proof_with_impossible_size_has_invalid_shape() {
    let tree = InMemoryVerifierTree::new(64, Sha256Hasher);
    for i in 0..4 {
        tree.add(&hello(i)).expect("add");
    }
    let proof = tree.make_proof(1).expect("proof");
    // no sequence of appends ever yields 2 nodes
    let tampered = Proof::new(*proof.claimed_root(), 1, 2, proof.path().to_vec());
    assert_matches!(tree.verify_proof(&tampered), Err(Error::InvalidProofShape(_)));
}

#[test]
fn test_concurrent_adds_are_serialized() {
    let storage = TempStorage::new();
    let trees: Vec<_> = (0..4)
        .map(|_| {
            Arc::new(RocksDbVerifierTree::new(storage.shared(), 9, Sha256Hasher).expect("open"))
        })
        .collect();

    let handles: Vec<_> = trees
        .iter()
        .enumerate()
        .map(|(writer, tree)| {
            let tree = Arc::clone(tree);
            thread::spawn(move || {
                (0..25)
                    .map(|i| {
                        let value = format!("writer {} value {}", writer, i).into_bytes();
                        (tree.add(&value).expect("add"), value)
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();
    let mut added: Vec<(u64, Vec<u8>)> = handles
        .into_iter()
        .flat_map(|handle| handle.join().expect("writer thread"))
        .collect();
    added.sort();

    let tree = &trees[0];
    assert_eq!(tree.leaf_count().expect("leaf count"), 100);
    for (expected, (leaf, value)) in added.iter().enumerate() {
        assert_eq!(*leaf, expected as u64);
        assert_eq!(&tree.get_value(*leaf).expect("value"), value);
        assert_eq!(tree.get_node(*leaf).expect("node"), Sha256Hasher.digest(value));
        tree.verify_proof(&tree.make_proof(*leaf).expect("proof"))
            .expect("verify");
    }
}

#[test]
fn test_in_memory_concurrent_adds() {
    let tree = Arc::new(InMemoryVerifierTree::new(1024, Sha256Hasher));
    let handles: Vec<_> = (0..4)
        .map(|writer| {
            let tree = Arc::clone(&tree);
            thread::spawn(move || {
                for i in 0..50 {
                    tree.add(format!("{}-{}", writer, i).as_bytes()).expect("add");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("writer thread");
    }
    assert_eq!(tree.leaf_count().expect("leaf count"), 200);
    tree.verify_proof(&tree.make_proof(123).expect("proof"))
        .expect("verify");
}

#[test]
fn test_in_memory_reads_during_writes() {
    init_tracing();
    reads_during_writes(Arc::new(InMemoryVerifierTree::new(4096, Sha256Hasher)), 1500);
}

#[test]
fn test_rocksdb_reads_during_writes() {
    init_tracing();
    let storage = TempStorage::new();
    let tree = RocksDbVerifierTree::new(storage.shared(), 10, Sha256Hasher).expect("open");
    reads_during_writes(Arc::new(tree), 200);
}

#[test]
fn test_orphaned_leaf_is_reported() {
    init_tracing();
    let storage = TempStorage::new();
    let tree = RocksDbVerifierTree::new(storage.shared(), 5, Sha256Hasher).expect("open");
    tree.add(b"kept").expect("add");

    // a node written without its value, as a writer that died between the two
    // would leave it
    append_leaf(
        &storage.tree_context(5),
        Sha256Hasher,
        Sha256Hasher.digest(b"lost"),
    )
    .expect("append node only");

    assert_eq!(tree.leaf_count().expect("leaf count"), 2);
    assert_eq!(tree.get_value(0).expect("value"), b"kept".to_vec());
    assert_matches!(tree.get_value(1), Err(Error::OrphanedLeaf(1)));
    assert_eq!(tree.get_node(1).expect("node"), Sha256Hasher.digest(b"lost"));
    assert_matches!(tree.get_value(2), Err(Error::NotFound(_)));
}

#[test]
fn test_trees_share_storage_independently() {
    let storage = TempStorage::new();
    let first = RocksDbVerifierTree::from_config(
        storage.shared(),
        &TreeConfig {
            tree_id: 1,
            hash: HashAlgorithm::Sha256,
        },
    )
    .expect("open");
    let second = RocksDbVerifierTree::from_config(
        storage.shared(),
        &TreeConfig {
            tree_id: 2,
            hash: HashAlgorithm::Sha256,
        },
    )
    .expect("open");

    first.add(b"a").expect("add");
    first.add(b"b").expect("add");
    second.add(b"c").expect("add");

    assert_eq!(first.leaf_count().expect("count"), 2);
    assert_eq!(second.leaf_count().expect("count"), 1);
    assert_eq!(second.get_value(0).expect("value"), b"c".to_vec());
    assert_matches!(
        first.verify_proof(&second.make_proof(0).expect("proof")),
        Err(Error::VerificationFailed(_))
    );

    first.clear().expect("clear");
    assert_eq!(first.leaf_count().expect("count"), 0);
    assert_matches!(first.root(), Err(Error::NotFound(_)));
    assert_eq!(first.add(b"again").expect("add"), 0);
    assert_eq!(second.leaf_count().expect("count"), 1);
}

#[test]
fn test_tree_survives_reopen() {
    let storage = TempStorage::new();
    let (root, proof) = {
        let tree = RocksDbVerifierTree::new(storage.shared(), 6, Sha256Hasher).expect("open");
        for i in 0..8 {
            tree.add(&hello(i)).expect("add");
        }
        (tree.root().expect("root"), tree.make_proof(6).expect("proof"))
    };
    storage.flush().expect("flush");

    let storage = storage.reopen();
    let tree = RocksDbVerifierTree::new(storage.shared(), 6, Sha256Hasher).expect("reopen");
    assert_eq!(tree.root().expect("root"), root);
    assert_eq!(tree.get_value(6).expect("value"), hello(6));
    tree.verify_proof(&proof).expect("proof verifies after reopen");
    assert_eq!(tree.add(&hello(8)).expect("add"), 8);
}

#[test]
fn test_proof_survives_encoding() {
    let tree = InMemoryVerifierTree::new(64, Sha256Hasher);
    for i in 0..8 {
        tree.add(&hello(i)).expect("add");
    }
    let proof = tree.make_proof(3).expect("proof");
    let bytes = proof.encode_to_vec().expect("encode");
    let decoded = Proof::decode_from_slice(&bytes).expect("decode");
    assert_eq!(decoded, proof);
    tree.verify_proof(&decoded).expect("decoded proof verifies");
    assert!(hex::encode(&bytes).starts_with(&hex::encode(proof.claimed_root())));
}
