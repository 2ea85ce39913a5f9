//! Module `commands`
//!
//! Data structures for the storage commands a host can send and the
//! correlation id that ties each command to its result message.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::storage::FileRef;

/// Name of a storage operation as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Load,
    Save,
    Delete,
    List,
    MakeDir,
    Rename,
}

impl Operation {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "load" => Some(Operation::Load),
            "save" => Some(Operation::Save),
            "delete" => Some(Operation::Delete),
            "list" => Some(Operation::List),
            "makedir" => Some(Operation::MakeDir),
            "rename" => Some(Operation::Rename),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Load => "load",
            Operation::Save => "save",
            Operation::Delete => "delete",
            Operation::List => "list",
            Operation::MakeDir => "makedir",
            Operation::Rename => "rename",
        }
    }

    /// Arguments expected after the path.
    pub fn extra_args(&self) -> usize {
        match self {
            Operation::Save | Operation::Rename => 1,
            _ => 0,
        }
    }
}

/// A validated storage command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Load(FileRef),
    Save { path: FileRef, contents: Vec<u8> },
    Delete(FileRef),
    List(FileRef),
    MakeDir(FileRef),
    Rename { from: FileRef, to: FileRef },
}

impl Command {
    pub fn operation(&self) -> Operation {
        match self {
            Command::Load(_) => Operation::Load,
            Command::Save { .. } => Operation::Save,
            Command::Delete(_) => Operation::Delete,
            Command::List(_) => Operation::List,
            Command::MakeDir(_) => Operation::MakeDir,
            Command::Rename { .. } => Operation::Rename,
        }
    }

    /// The primary path the command acts on.
    pub fn path(&self) -> &FileRef {
        match self {
            Command::Load(path)
            | Command::Delete(path)
            | Command::List(path)
            | Command::MakeDir(path) => path,
            Command::Save { path, .. } => path,
            Command::Rename { from, .. } => from,
        }
    }
}

// Payloads are summarized, never dumped into logs.
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Save { path, contents } => {
                write!(f, "save {} ({} bytes)", path, contents.len())
            }
            Command::Rename { from, to } => write!(f, "rename {} -> {}", from, to),
            other => write!(f, "{} {}", other.operation().name(), other.path()),
        }
    }
}

/// Correlates a command with the one message that answers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
