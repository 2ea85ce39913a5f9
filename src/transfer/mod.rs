//! Transfer module
//!
//! Chunked byte movement between caller buffers and backend file handles.

pub mod chunked;

pub use chunked::{MAX_TRANSFER_SIZE, read_chunked, write_chunked};
