//! In-memory backend
//!
//! Keeps the whole tree in a map keyed by absolute path. Directories remember
//! their children in creation order, which is the order `read_dir` reports.
//! A per-call transfer limit makes reads and writes deliberately short.

use std::collections::HashMap;

use crate::error::{BackendError, BackendResult, codes};
use crate::storage::backend::{Backend, FileHandle, OpenMode};
use crate::storage::validation::FileRef;

#[derive(Debug)]
enum Node {
    File(Vec<u8>),
    Dir(Vec<String>),
}

/// Volatile store bounded by the capacity it is opened with.
#[derive(Debug)]
pub struct MemoryBackend {
    nodes: HashMap<String, Node>,
    capacity: u64,
    used: u64,
    chunk_limit: usize,
    open_failure: Option<i32>,
    opened: bool,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert("/".to_string(), Node::Dir(Vec::new()));
        Self {
            nodes,
            capacity: 0,
            used: 0,
            chunk_limit: usize::MAX,
            open_failure: None,
            opened: false,
        }
    }

    /// Move at most `limit` bytes per read or write call.
    pub fn with_chunk_limit(mut self, limit: usize) -> Self {
        self.chunk_limit = limit.max(1);
        self
    }

    /// Make `open` fail with `code`.
    pub fn failing_open(mut self, code: i32) -> Self {
        self.open_failure = Some(code);
        self
    }

    /// Bytes currently held by files.
    pub fn used(&self) -> u64 {
        self.used
    }

    fn ensure_open(&self) -> BackendResult<()> {
        if self.opened {
            Ok(())
        } else {
            Err(BackendError::new(codes::FAILED))
        }
    }

    /// The parent of `path` must exist and be a directory.
    fn check_parent(&self, path: &FileRef) -> BackendResult<FileRef> {
        let parent = path
            .parent()
            .ok_or(BackendError::new(codes::BAD_ARGUMENT))?;
        match self.nodes.get(parent.as_str()) {
            Some(Node::Dir(_)) => Ok(parent),
            Some(Node::File(_)) => Err(BackendError::new(codes::NOT_A_DIRECTORY)),
            None => Err(BackendError::new(codes::NOT_FOUND)),
        }
    }

    fn link(&mut self, parent: &FileRef, name: &str) {
        if let Some(Node::Dir(children)) = self.nodes.get_mut(parent.as_str()) {
            children.push(name.to_string());
        }
    }

    fn unlink(&mut self, path: &FileRef) {
        let Some(parent) = path.parent() else {
            return;
        };
        if let Some(Node::Dir(children)) = self.nodes.get_mut(parent.as_str()) {
            children.retain(|child| child != path.name());
        }
    }
}

impl Backend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn open(&mut self, capacity: u64) -> BackendResult<()> {
        if let Some(code) = self.open_failure {
            return Err(BackendError::new(code));
        }
        if capacity == 0 {
            return Err(BackendError::new(codes::NO_QUOTA));
        }
        self.capacity = capacity;
        self.opened = true;
        Ok(())
    }

    fn open_file(
        &mut self,
        path: &FileRef,
        mode: OpenMode,
    ) -> BackendResult<Box<dyn FileHandle + '_>> {
        self.ensure_open()?;

        match mode {
            OpenMode::Read => match self.nodes.get(path.as_str()) {
                Some(Node::File(_)) => {}
                Some(Node::Dir(_)) => return Err(BackendError::new(codes::IS_A_DIRECTORY)),
                None => return Err(BackendError::new(codes::NOT_FOUND)),
            },
            OpenMode::WriteTruncate => {
                let parent = self.check_parent(path)?;
                match self.nodes.get_mut(path.as_str()) {
                    Some(Node::File(data)) => {
                        self.used -= data.len() as u64;
                        data.clear();
                    }
                    Some(Node::Dir(_)) => return Err(BackendError::new(codes::IS_A_DIRECTORY)),
                    None => {
                        self.nodes
                            .insert(path.as_str().to_string(), Node::File(Vec::new()));
                        self.link(&parent, path.name());
                    }
                }
            }
        }

        Ok(Box::new(MemoryFile {
            backend: self,
            path: path.as_str().to_string(),
        }))
    }

    fn delete(&mut self, path: &FileRef) -> BackendResult<()> {
        self.ensure_open()?;
        if path.is_root() {
            return Err(BackendError::new(codes::NO_ACCESS));
        }

        match self.nodes.get(path.as_str()) {
            None => return Err(BackendError::new(codes::NOT_FOUND)),
            Some(Node::Dir(children)) if !children.is_empty() => {
                return Err(BackendError::new(codes::DIRECTORY_NOT_EMPTY));
            }
            Some(Node::File(data)) => self.used -= data.len() as u64,
            Some(Node::Dir(_)) => {}
        }

        self.nodes.remove(path.as_str());
        self.unlink(path);
        Ok(())
    }

    fn read_dir(&mut self, path: &FileRef) -> BackendResult<Vec<String>> {
        self.ensure_open()?;
        match self.nodes.get(path.as_str()) {
            Some(Node::Dir(children)) => Ok(children.clone()),
            Some(Node::File(_)) => Err(BackendError::new(codes::NOT_A_DIRECTORY)),
            None => Err(BackendError::new(codes::NOT_FOUND)),
        }
    }

    fn make_dir(&mut self, path: &FileRef) -> BackendResult<()> {
        self.ensure_open()?;
        if self.nodes.contains_key(path.as_str()) {
            return Err(BackendError::new(codes::ALREADY_EXISTS));
        }
        let parent = self.check_parent(path)?;
        self.nodes
            .insert(path.as_str().to_string(), Node::Dir(Vec::new()));
        self.link(&parent, path.name());
        Ok(())
    }

    fn rename(&mut self, from: &FileRef, to: &FileRef) -> BackendResult<()> {
        self.ensure_open()?;
        if from.is_root() || to.is_root() || to.is_descendant_of(from) {
            return Err(BackendError::new(codes::BAD_ARGUMENT));
        }
        let source_is_dir = match self.nodes.get(from.as_str()) {
            Some(Node::Dir(_)) => true,
            Some(Node::File(_)) => false,
            None => return Err(BackendError::new(codes::NOT_FOUND)),
        };
        if from == to {
            return Ok(());
        }
        let target_parent = self.check_parent(to)?;

        match self.nodes.get(to.as_str()) {
            Some(Node::Dir(_)) => return Err(BackendError::new(codes::ALREADY_EXISTS)),
            Some(Node::File(_)) if source_is_dir => {
                return Err(BackendError::new(codes::ALREADY_EXISTS));
            }
            Some(Node::File(data)) => {
                self.used -= data.len() as u64;
                self.nodes.remove(to.as_str());
                self.unlink(to);
            }
            None => {}
        }

        let subtree_prefix = format!("{}/", from.as_str());
        let moved: Vec<String> = self
            .nodes
            .keys()
            .filter(|key| key.as_str() == from.as_str() || key.starts_with(&subtree_prefix))
            .cloned()
            .collect();
        for key in moved {
            if let Some(node) = self.nodes.remove(&key) {
                let new_key = format!("{}{}", to.as_str(), &key[from.as_str().len()..]);
                self.nodes.insert(new_key, node);
            }
        }

        self.unlink(from);
        self.link(&target_parent, to.name());
        Ok(())
    }
}

struct MemoryFile<'a> {
    backend: &'a mut MemoryBackend,
    path: String,
}

impl MemoryFile<'_> {
    fn data(&mut self) -> BackendResult<&mut Vec<u8>> {
        match self.backend.nodes.get_mut(&self.path) {
            Some(Node::File(data)) => Ok(data),
            _ => Err(BackendError::new(codes::NOT_FOUND)),
        }
    }
}

impl FileHandle for MemoryFile<'_> {
    fn size(&mut self) -> BackendResult<u64> {
        Ok(self.data()?.len() as u64)
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> BackendResult<usize> {
        let limit = self.backend.chunk_limit;
        let data = self.data()?;
        let Ok(start) = usize::try_from(offset) else {
            return Ok(0);
        };
        if start >= data.len() {
            return Ok(0);
        }
        let n = buf.len().min(data.len() - start).min(limit);
        buf[..n].copy_from_slice(&data[start..start + n]);
        Ok(n)
    }

    fn write_at(&mut self, offset: u64, bytes: &[u8]) -> BackendResult<usize> {
        let limit = self.backend.chunk_limit;
        let (used, capacity) = (self.backend.used, self.backend.capacity);
        let start = usize::try_from(offset).map_err(|_| BackendError::new(codes::TOO_BIG))?;
        let n = bytes.len().min(limit);
        let end = start + n;

        let current_len = self.data()?.len();
        let growth = end.saturating_sub(current_len) as u64;
        if used + growth > capacity {
            return Err(BackendError::new(codes::NO_QUOTA));
        }

        let data = self.data()?;
        if data.len() < end {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(&bytes[..n]);
        self.backend.used += growth;
        Ok(n)
    }

    fn flush(&mut self) -> BackendResult<()> {
        self.data().map(|_| ())
    }
}
