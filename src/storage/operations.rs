//! Storage operations
//!
//! Executes load, save, delete, list, makedir and rename against an opened
//! storage handle. Each operation converts backend failures into a
//! `StorageError` at its own boundary.

use log::{debug, info};

use crate::error::{IoStage, StorageError};
use crate::storage::backend::OpenMode;
use crate::storage::handle::StorageHandle;
use crate::storage::results::IoResult;
use crate::storage::results::Outcome;
use crate::storage::validation::FileRef;
use crate::transfer::{read_chunked, write_chunked};

/// Writes `contents` to `path`, creating or truncating the file.
///
/// Oversized payloads are rejected before the file is opened, so an existing
/// file keeps its previous contents.
pub fn save(handle: &mut StorageHandle, path: &FileRef, contents: &[u8]) -> IoResult {
    let limit = handle.transfer_limit();
    let backend = handle.backend()?;

    let size = contents.len() as u64;
    if size > limit {
        return Err(StorageError::TooLarge { size, limit });
    }

    let mut file = backend
        .open_file(path, OpenMode::WriteTruncate)
        .map_err(|e| StorageError::io(IoStage::OpenForWrite, e))?;

    // The open truncated the file, so empty contents need no write call.
    if !contents.is_empty() {
        write_chunked(file.as_mut(), contents).map_err(|e| StorageError::io(IoStage::Write, e))?;
    }
    file.flush()
        .map_err(|e| StorageError::io(IoStage::Flush, e))?;

    info!("Saved {path} ({size} bytes)");
    Ok(Outcome::Saved { bytes: size })
}

/// Reads the whole file at `path`.
pub fn load(handle: &mut StorageHandle, path: &FileRef) -> IoResult {
    let limit = handle.transfer_limit();
    let backend = handle.backend()?;

    let mut file = backend.open_file(path, OpenMode::Read).map_err(|e| {
        if e.is_not_found() {
            StorageError::NotFound(path.to_string())
        } else {
            StorageError::io(IoStage::OpenForRead, e)
        }
    })?;

    let size = file
        .size()
        .map_err(|e| StorageError::io(IoStage::Query, e))?;
    if size > limit {
        return Err(StorageError::TooLarge { size, limit });
    }

    let data =
        read_chunked(file.as_mut(), size).map_err(|e| StorageError::io(IoStage::Read, e))?;

    info!("Loaded {path} ({} bytes)", data.len());
    Ok(Outcome::Loaded(data))
}

/// Deletes a file or an empty directory. A missing path is not an error.
pub fn delete(handle: &mut StorageHandle, path: &FileRef) -> IoResult {
    let backend = handle.backend()?;
    match backend.delete(path) {
        Ok(()) => {
            info!("Deleted {path}");
            Ok(Outcome::Deleted)
        }
        Err(e) if e.is_not_found() => {
            debug!("Nothing to delete at {path}");
            Ok(Outcome::NothingToDelete)
        }
        Err(e) => Err(StorageError::io(IoStage::Delete, e)),
    }
}

/// Lists the entries of a directory, skipping dot-prefixed names.
pub fn list(handle: &mut StorageHandle, path: &FileRef, sorted: bool) -> IoResult {
    let backend = handle.backend()?;
    let mut entries: Vec<String> = backend
        .read_dir(path)
        .map_err(|e| StorageError::io(IoStage::List, e))?
        .into_iter()
        .filter(|name| !name.starts_with('.'))
        .collect();

    if sorted {
        entries.sort();
    }

    info!("Listed {path} - {} entries", entries.len());
    Ok(Outcome::Listed(entries))
}

/// Creates one directory level.
pub fn make_dir(handle: &mut StorageHandle, path: &FileRef) -> IoResult {
    let backend = handle.backend()?;
    backend
        .make_dir(path)
        .map_err(|e| StorageError::io(IoStage::MakeDir, e))?;
    info!("Created directory {path}");
    Ok(Outcome::DirectoryCreated)
}

pub fn rename(handle: &mut StorageHandle, from: &FileRef, to: &FileRef) -> IoResult {
    let backend = handle.backend()?;
    backend
        .rename(from, to)
        .map_err(|e| StorageError::io(IoStage::Rename, e))?;
    info!("Renamed {from} -> {to}");
    Ok(Outcome::Renamed)
}
