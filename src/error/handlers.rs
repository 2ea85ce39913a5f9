//! Error handlers
//!
//! Converts failures into the human-readable text carried by `ERR` messages.

use crate::error::types::{StorageError, ValidationError};
use log::{error, warn};

/// Log a rejected inbound message and return the `ERR` text for it.
pub fn validation_error_message(err: &ValidationError) -> String {
    warn!("Rejected message: {}", err);
    err.to_string()
}

/// Log a failed storage command and return the `ERR` text for it.
pub fn storage_error_message(err: &StorageError) -> String {
    match err {
        StorageError::NotFound(_) | StorageError::TooLarge { .. } => warn!("Storage error: {}", err),
        _ => error!("Storage error: {}", err),
    }
    err.to_string()
}
