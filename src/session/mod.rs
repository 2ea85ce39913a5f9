//! Host session
//!
//! Connects a line-oriented host channel to a running file service.

pub mod handler;

pub use handler::serve_host;
