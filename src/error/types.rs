//! Error types
//!
//! Defines the error taxonomy shared by the router, the file worker and the
//! storage backends.

use std::fmt;
use std::io;
use std::time::Duration;

use thiserror::Error;

/// Numeric codes carried by backend failures and embedded in `ERR` texts.
pub mod codes {
    pub const FAILED: i32 = -2;
    pub const BAD_ARGUMENT: i32 = -4;
    pub const NO_ACCESS: i32 = -7;
    pub const NO_SPACE: i32 = -9;
    pub const NO_QUOTA: i32 = -10;
    pub const NOT_FOUND: i32 = -20;
    pub const ALREADY_EXISTS: i32 = -21;
    pub const TOO_BIG: i32 = -22;
    pub const NOT_A_DIRECTORY: i32 = -23;
    pub const IS_A_DIRECTORY: i32 = -24;
    pub const DIRECTORY_NOT_EMPTY: i32 = -25;
    pub const SHORT_WRITE: i32 = -26;
    pub const TIMED_OUT: i32 = -30;
}

/// Rejection of an inbound message before anything is enqueued.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Empty message")]
    EmptyMessage,

    #[error("Unknown command: {0}")]
    UnknownOperation(String),

    #[error("Command {operation} takes {expected} argument(s), got {actual}")]
    WrongArity {
        operation: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("File name must begin with /")]
    RelativePath(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Message too long: {0} bytes")]
    TooLong(usize),

    #[error("Malformed message: {0}")]
    Malformed(String),
}

/// Raw failure reported by a storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("backend error {code}")]
pub struct BackendError {
    pub code: i32,
}

pub type BackendResult<T> = Result<T, BackendError>;

impl BackendError {
    pub const fn new(code: i32) -> Self {
        Self { code }
    }

    pub fn is_not_found(&self) -> bool {
        self.code == codes::NOT_FOUND
    }
}

impl From<io::Error> for BackendError {
    fn from(error: io::Error) -> Self {
        let code = match error.kind() {
            io::ErrorKind::NotFound => codes::NOT_FOUND,
            io::ErrorKind::PermissionDenied => codes::NO_ACCESS,
            io::ErrorKind::AlreadyExists => codes::ALREADY_EXISTS,
            io::ErrorKind::InvalidInput => codes::BAD_ARGUMENT,
            io::ErrorKind::NotADirectory => codes::NOT_A_DIRECTORY,
            io::ErrorKind::IsADirectory => codes::IS_A_DIRECTORY,
            io::ErrorKind::DirectoryNotEmpty => codes::DIRECTORY_NOT_EMPTY,
            io::ErrorKind::StorageFull => codes::NO_SPACE,
            io::ErrorKind::FileTooLarge => codes::TOO_BIG,
            io::ErrorKind::WriteZero => codes::SHORT_WRITE,
            io::ErrorKind::TimedOut => codes::TIMED_OUT,
            _ => codes::FAILED,
        };
        BackendError::new(code)
    }
}

/// The step of an operation during which a backend call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoStage {
    OpenStore,
    OpenForWrite,
    Write,
    Flush,
    OpenForRead,
    Query,
    Read,
    Delete,
    List,
    MakeDir,
    Rename,
    Internal,
}

impl fmt::Display for IoStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            IoStage::OpenStore => "Failed to open file system",
            IoStage::OpenForWrite => "File open for write failed",
            IoStage::Write => "File write failed",
            IoStage::Flush => "File fail to flush",
            IoStage::OpenForRead => "File open for read failed",
            IoStage::Query => "File query failed",
            IoStage::Read => "File read failed",
            IoStage::Delete => "Deletion failed",
            IoStage::List => "List failed",
            IoStage::MakeDir => "Make directory failed",
            IoStage::Rename => "Rename failed",
            IoStage::Internal => "Storage operation aborted",
        };
        f.write_str(text)
    }
}

/// Terminal failure of a dispatched storage command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("File system is not open -- Error #: {}", codes::FAILED)]
    NotOpen,

    #[error("File not found: {0} -- Error #: {}", codes::NOT_FOUND)]
    NotFound(String),

    #[error("File too big: {size} bytes (max: {limit}) -- Error #: {}", codes::TOO_BIG)]
    TooLarge { size: u64, limit: u64 },

    #[error("{stage} -- Error #: {code}")]
    Io { stage: IoStage, code: i32 },

    #[error("Request timed out after {0:?} -- Error #: {}", codes::TIMED_OUT)]
    TimedOut(Duration),

    #[error("File worker has stopped -- Error #: {}", codes::FAILED)]
    WorkerStopped,
}

impl StorageError {
    pub fn io(stage: IoStage, error: BackendError) -> Self {
        StorageError::Io {
            stage,
            code: error.code,
        }
    }

    /// Numeric code embedded in the error text.
    pub fn code(&self) -> i32 {
        match self {
            StorageError::NotOpen | StorageError::WorkerStopped => codes::FAILED,
            StorageError::NotFound(_) => codes::NOT_FOUND,
            StorageError::TooLarge { .. } => codes::TOO_BIG,
            StorageError::Io { code, .. } => *code,
            StorageError::TimedOut(_) => codes::TIMED_OUT,
        }
    }
}
