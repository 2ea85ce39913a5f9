//! Peripheral listener
//!
//! A small loopback TCP endpoint that answers every connection with a fixed
//! response. It runs beside the file service and shares nothing with it.

pub mod core;

pub use self::core::StatusListener;
