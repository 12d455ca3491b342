//! mmrlog storage layer implemented over RocksDB backend.
mod storage;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
mod tree_context;

pub use self::{
    storage::{RocksDbStorage, Tx},
    tree_context::TreeContext,
};
