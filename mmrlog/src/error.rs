//! Errors

/// Alias for `core::result::Result<T, Error>`.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors surfaced by a [`VerifierTree`](crate::VerifierTree).
///
/// Nothing is retried. `VerificationFailed` is the expected answer to a proof
/// that does not check out and never stands in for a storage problem.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Leaf, node or proof size beyond what the tree holds, or an empty tree
    #[error("not found: {0}")]
    NotFound(String),
    /// The proof does not establish inclusion in its claimed root
    #[error("inclusion verification failed: {0}")]
    VerificationFailed(String),
    /// The proof cannot describe any node of a tree of its claimed size
    #[error("invalid proof shape: {0}")]
    InvalidProofShape(String),
    /// Backend I/O error
    #[error("storage failure: {0}")]
    StorageFailure(String),
    /// The bounded in-memory tree is full
    #[error("capacity exceeded: capacity {capacity}, requested {requested}")]
    CapacityExceeded {
        /// Number of nodes the tree can hold.
        capacity: u64,
        /// Number of nodes the append would have required.
        requested: u64,
    },
    /// The leaf's node exists but its value was never recorded
    #[error("leaf {0} has a node but no stored value")]
    OrphanedLeaf(u64),
    /// Bytes that do not decode into a proof
    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl From<mmrlog_merkle_mountain_range::Error> for Error {
    fn from(e: mmrlog_merkle_mountain_range::Error) -> Self {
        use mmrlog_merkle_mountain_range::Error as MmrError;
        match e {
            MmrError::NotFound(msg) => Error::NotFound(msg),
            MmrError::VerificationFailed(msg) => Error::VerificationFailed(msg),
            MmrError::InvalidProofShape(msg) => Error::InvalidProofShape(msg),
            MmrError::StorageFailure(msg) => Error::StorageFailure(msg),
            MmrError::CapacityExceeded {
                capacity,
                requested,
            } => Error::CapacityExceeded {
                capacity,
                requested,
            },
            MmrError::InvalidData(msg) => Error::InvalidData(msg),
            other => Error::StorageFailure(other.to_string()),
        }
    }
}

impl From<mmrlog_storage::Error> for Error {
    fn from(e: mmrlog_storage::Error) -> Self {
        Error::StorageFailure(e.to_string())
    }
}
