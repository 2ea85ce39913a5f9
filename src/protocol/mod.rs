//! Host protocol
//!
//! Inbound command parsing, outbound message shapes and their line codec.

pub mod commands;
pub mod parser;
pub mod responses;

pub use commands::{Command, Operation, RequestId};
pub use parser::{InboundMessage, decode_line, parse_command};
pub use responses::{Envelope, HostMessage, encode_envelope};
