/// Alias for `core::result::Result<T, Error>`.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for MMR operations.
///
/// `VerificationFailed` is an expected outcome of checking an untrusted proof
/// and is kept apart from `StorageFailure`, which only ever carries backend
/// I/O problems.
#[derive(Debug, PartialEq, Eq, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A node, leaf or proof target is beyond the current size, or the tree is
    /// empty.
    #[error("not found: {0}")]
    NotFound(String),
    /// The root recomputed from a proof does not match the claimed root.
    #[error("inclusion verification failed: {0}")]
    VerificationFailed(String),
    /// The proof cannot describe any node of a tree of its claimed size.
    #[error("invalid proof shape: {0}")]
    InvalidProofShape(String),
    /// An error propagated from the backing node store.
    #[error("storage failure: {0}")]
    StorageFailure(String),
    /// A bounded store has no room for the nodes of an append.
    #[error("capacity exceeded: capacity {capacity}, requested {requested}")]
    CapacityExceeded {
        /// Number of nodes the store can hold.
        capacity: u64,
        /// Number of nodes the append would have required.
        requested: u64,
    },
    /// Bytes that could not be decoded into MMR data.
    #[error("invalid MMR data: {0}")]
    InvalidData(String),
}
