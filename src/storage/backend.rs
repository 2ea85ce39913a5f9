//! Storage backend traits
//!
//! A backend is addressed by validated absolute paths and hands out file
//! handles that move bytes at explicit offsets. A single call may move fewer
//! bytes than requested; callers loop until the transfer completes.

use crate::error::BackendResult;
use crate::storage::validation::FileRef;

/// How a file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    /// Create if missing and truncate to zero length.
    WriteTruncate,
}

/// An open file inside a backend.
pub trait FileHandle {
    /// Current size in bytes.
    fn size(&mut self) -> BackendResult<u64>;

    /// Read into `buf` starting at `offset`. `Ok(0)` means no more data.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> BackendResult<usize>;

    /// Write from `data` starting at `offset`, returning the bytes accepted.
    fn write_at(&mut self, offset: u64, data: &[u8]) -> BackendResult<usize>;

    fn flush(&mut self) -> BackendResult<()>;
}

/// A storage provider rooted at `/`.
pub trait Backend: Send {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Open the store with room for `capacity` bytes.
    fn open(&mut self, capacity: u64) -> BackendResult<()>;

    fn open_file(&mut self, path: &FileRef, mode: OpenMode)
    -> BackendResult<Box<dyn FileHandle + '_>>;

    /// Delete a file or an empty directory.
    fn delete(&mut self, path: &FileRef) -> BackendResult<()>;

    /// Entry names of a directory in the backend's own order.
    fn read_dir(&mut self, path: &FileRef) -> BackendResult<Vec<String>>;

    /// Create exactly one directory level.
    fn make_dir(&mut self, path: &FileRef) -> BackendResult<()>;

    fn rename(&mut self, from: &FileRef, to: &FileRef) -> BackendResult<()>;
}
