//! Storage result types
//!
//! Defines the outcomes returned by storage operations.

use crate::error::StorageError;

/// Successful completion of one storage command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Saved { bytes: u64 },
    Loaded(Vec<u8>),
    Deleted,
    /// Delete of a path that did not exist. Not an error.
    NothingToDelete,
    Listed(Vec<String>),
    DirectoryCreated,
    Renamed,
}

/// Terminal result of one storage command.
pub type IoResult = Result<Outcome, StorageError>;
