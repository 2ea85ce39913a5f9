//! Storage management
//!
//! Backends, the storage handle that owns one of them, path validation and
//! the operations the file worker runs.

pub mod backend;
pub mod handle;
pub mod local;
pub mod memory;
pub mod operations;
pub mod results;
pub mod validation;

pub use backend::{Backend, FileHandle, OpenMode};
pub use handle::{HandleState, StorageHandle};
pub use local::LocalBackend;
pub use memory::MemoryBackend;
pub use results::{IoResult, Outcome};
pub use validation::FileRef;
