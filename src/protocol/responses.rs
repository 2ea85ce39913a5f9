//! Response handling
//!
//! Outbound messages posted to the host and their line encoding.

use serde::Serialize;

use crate::protocol::commands::RequestId;

/// Status texts carried by `STAT` messages.
pub const SAVE_SUCCESS: &str = "Save success";
pub const DELETE_SUCCESS: &str = "Delete success";
pub const NOTHING_TO_DELETE: &str = "File/Directory not found";
pub const MAKE_DIRECTORY_SUCCESS: &str = "Make directory success";
pub const RENAME_SUCCESS: &str = "Rename success";

/// A message posted to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostMessage {
    /// The store opened; sent once per service.
    Ready,
    /// Contents of a loaded file.
    Disp(Vec<u8>),
    /// Directory entries.
    List(Vec<String>),
    /// Human-readable success.
    Stat(String),
    /// Human-readable failure.
    Err(String),
}

impl HostMessage {
    pub fn tag(&self) -> &'static str {
        match self {
            HostMessage::Ready => "READY",
            HostMessage::Disp(_) => "DISP",
            HostMessage::List(_) => "LIST",
            HostMessage::Stat(_) => "STAT",
            HostMessage::Err(_) => "ERR",
        }
    }

    /// Flattens the message into `[TAG, args...]`.
    pub fn to_wire(&self) -> Vec<String> {
        let mut parts = vec![self.tag().to_string()];
        match self {
            HostMessage::Ready => {}
            HostMessage::Disp(payload) => parts.push(String::from_utf8_lossy(payload).into_owned()),
            HostMessage::List(entries) => parts.extend(entries.iter().cloned()),
            HostMessage::Stat(text) | HostMessage::Err(text) => parts.push(text.clone()),
        }
        parts
    }
}

/// A host message with the id of the command it answers, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub id: Option<RequestId>,
    pub message: HostMessage,
}

impl Envelope {
    pub fn reply(id: RequestId, message: HostMessage) -> Self {
        Self {
            id: Some(id),
            message,
        }
    }

    pub fn notice(message: HostMessage) -> Self {
        Self { id: None, message }
    }
}

#[derive(Serialize)]
struct WireEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<RequestId>,
    message: Vec<String>,
}

/// Encodes an envelope as one JSON line, without the trailing newline.
pub fn encode_envelope(envelope: &Envelope) -> Result<String, serde_json::Error> {
    serde_json::to_string(&WireEnvelope {
        id: envelope.id,
        message: envelope.message.to_wire(),
    })
}
