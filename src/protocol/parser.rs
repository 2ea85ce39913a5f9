//! Command parsing
//!
//! Turns inbound messages of the form `[operation, path, ...extra]` into
//! validated commands, and decodes host-session lines into such messages.

use serde::Deserialize;

use crate::error::ValidationError;
use crate::protocol::commands::{Command, Operation, RequestId};
use crate::storage::FileRef;

/// One decoded inbound line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub id: Option<RequestId>,
    pub parts: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireInbound {
    Tagged { id: u64, message: Vec<String> },
    Bare(Vec<String>),
}

/// Decodes a JSON line: either `["load", "/a"]` or
/// `{"id": 7, "message": ["load", "/a"]}`.
pub fn decode_line(line: &str) -> Result<InboundMessage, ValidationError> {
    let wire: WireInbound = serde_json::from_str(line.trim())
        .map_err(|e| ValidationError::Malformed(e.to_string()))?;
    Ok(match wire {
        WireInbound::Tagged { id, message } => InboundMessage {
            id: Some(RequestId(id)),
            parts: message,
        },
        WireInbound::Bare(parts) => InboundMessage { id: None, parts },
    })
}

/// Validates an inbound message and builds the command it names.
///
/// Checks the operation name, the exact argument count and that every path
/// argument is absolute.
pub fn parse_command(parts: &[String]) -> Result<Command, ValidationError> {
    let (name, args) = parts.split_first().ok_or(ValidationError::EmptyMessage)?;
    let operation = Operation::from_name(name)
        .ok_or_else(|| ValidationError::UnknownOperation(name.clone()))?;

    let expected = 1 + operation.extra_args();
    if args.len() != expected {
        return Err(ValidationError::WrongArity {
            operation: operation.name(),
            expected,
            actual: args.len(),
        });
    }

    let path = FileRef::parse(&args[0])?;
    let command = match operation {
        Operation::Load => Command::Load(path),
        Operation::Save => Command::Save {
            path,
            contents: args[1].as_bytes().to_vec(),
        },
        Operation::Delete => Command::Delete(path),
        Operation::List => Command::List(path),
        Operation::MakeDir => Command::MakeDir(path),
        Operation::Rename => Command::Rename {
            from: path,
            to: FileRef::parse(&args[1])?,
        },
    };
    Ok(command)
}
