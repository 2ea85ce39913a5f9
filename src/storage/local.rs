//! Local directory backend
//!
//! Maps the store onto a directory of the host filesystem. The root is
//! created when the store is opened.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use log::info;

use crate::error::{BackendError, BackendResult, codes};
use crate::storage::backend::{Backend, FileHandle, OpenMode};
use crate::storage::validation::FileRef;

/// Persistent store rooted at a host directory.
#[derive(Debug)]
pub struct LocalBackend {
    root: PathBuf,
    opened: bool,
}

impl LocalBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            opened: false,
        }
    }

    fn real_path(&self, path: &FileRef) -> BackendResult<PathBuf> {
        if !self.opened {
            return Err(BackendError::new(codes::FAILED));
        }
        Ok(self.root.join(path.relative()))
    }
}

impl Backend for LocalBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    fn open(&mut self, capacity: u64) -> BackendResult<()> {
        if capacity == 0 {
            return Err(BackendError::new(codes::NO_QUOTA));
        }
        fs::create_dir_all(&self.root)?;
        if !self.root.is_dir() {
            return Err(BackendError::new(codes::NOT_A_DIRECTORY));
        }
        info!("Local store opened at {}", self.root.display());
        self.opened = true;
        Ok(())
    }

    fn open_file(
        &mut self,
        path: &FileRef,
        mode: OpenMode,
    ) -> BackendResult<Box<dyn FileHandle + '_>> {
        let real_path = self.real_path(path)?;
        if real_path.is_dir() {
            return Err(BackendError::new(codes::IS_A_DIRECTORY));
        }
        let file = match mode {
            OpenMode::Read => File::open(&real_path)?,
            OpenMode::WriteTruncate => OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(&real_path)?,
        };
        Ok(Box::new(LocalFile { file }))
    }

    fn delete(&mut self, path: &FileRef) -> BackendResult<()> {
        if path.is_root() {
            return Err(BackendError::new(codes::NO_ACCESS));
        }
        let real_path = self.real_path(path)?;
        let metadata = fs::symlink_metadata(&real_path)?;
        if metadata.is_dir() {
            fs::remove_dir(&real_path)?;
        } else {
            fs::remove_file(&real_path)?;
        }
        Ok(())
    }

    fn read_dir(&mut self, path: &FileRef) -> BackendResult<Vec<String>> {
        let real_path = self.real_path(path)?;
        let mut names = Vec::new();
        for entry in fs::read_dir(&real_path)? {
            let entry = entry?;
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        Ok(names)
    }

    fn make_dir(&mut self, path: &FileRef) -> BackendResult<()> {
        let real_path = self.real_path(path)?;
        fs::create_dir(&real_path)?;
        Ok(())
    }

    fn rename(&mut self, from: &FileRef, to: &FileRef) -> BackendResult<()> {
        if from.is_root() || to.is_root() || to.is_descendant_of(from) {
            return Err(BackendError::new(codes::BAD_ARGUMENT));
        }
        let from_path = self.real_path(from)?;
        let to_path = self.real_path(to)?;
        fs::rename(&from_path, &to_path)?;
        Ok(())
    }
}

struct LocalFile {
    file: File,
}

impl FileHandle for LocalFile {
    fn size(&mut self) -> BackendResult<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> BackendResult<usize> {
        self.file.seek(SeekFrom::Start(offset))?;
        Ok(self.file.read(buf)?)
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> BackendResult<usize> {
        self.file.seek(SeekFrom::Start(offset))?;
        Ok(self.file.write(data)?)
    }

    fn flush(&mut self) -> BackendResult<()> {
        self.file.flush()?;
        self.file.sync_data()?;
        Ok(())
    }
}
