//! Storage handle
//!
//! Owns the backend and tracks whether the store was opened. The store is
//! opened at most once; a failed open is final for the life of the handle.

use log::{error, info};

use crate::error::{IoStage, StorageError};
use crate::storage::backend::Backend;
use crate::transfer::MAX_TRANSFER_SIZE;

/// Lifecycle of the underlying store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    NotOpen,
    Opening,
    Open,
    /// Open was attempted and failed with this backend code.
    FailedOpen(i32),
}

pub struct StorageHandle {
    backend: Box<dyn Backend>,
    state: HandleState,
    capacity: u64,
    transfer_limit: u64,
}

impl StorageHandle {
    pub fn new(backend: Box<dyn Backend>, capacity: u64) -> Self {
        Self {
            backend,
            state: HandleState::NotOpen,
            capacity,
            transfer_limit: MAX_TRANSFER_SIZE,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_transfer_limit(mut self, limit: u64) -> Self {
        self.transfer_limit = limit;
        self
    }

    /// Open the store. Only the first call reaches the backend.
    pub fn open(&mut self) -> Result<(), StorageError> {
        match self.state {
            HandleState::NotOpen => {}
            HandleState::Open => return Ok(()),
            HandleState::Opening => return Err(StorageError::NotOpen),
            HandleState::FailedOpen(code) => {
                return Err(StorageError::Io {
                    stage: IoStage::OpenStore,
                    code,
                });
            }
        }

        self.state = HandleState::Opening;
        match self.backend.open(self.capacity) {
            Ok(()) => {
                self.state = HandleState::Open;
                info!(
                    "Opened {} store with capacity {} bytes",
                    self.backend.name(),
                    self.capacity
                );
                Ok(())
            }
            Err(e) => {
                self.state = HandleState::FailedOpen(e.code);
                error!(
                    "Failed to open {} store: error {}",
                    self.backend.name(),
                    e.code
                );
                Err(StorageError::io(IoStage::OpenStore, e))
            }
        }
    }

    pub fn state(&self) -> HandleState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == HandleState::Open
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn transfer_limit(&self) -> u64 {
        self.transfer_limit
    }

    /// The backend, or `NotOpen` unless the store opened successfully.
    pub(crate) fn backend(&mut self) -> Result<&mut dyn Backend, StorageError> {
        if self.is_open() {
            Ok(self.backend.as_mut())
        } else {
            Err(StorageError::NotOpen)
        }
    }
}
