//! Result publisher
//!
//! Packages command results into outbound host messages. Every command that
//! reaches the publisher produces exactly one message.

use log::{debug, warn};
use tokio::sync::mpsc;

use crate::error::handlers::{storage_error_message, validation_error_message};
use crate::error::{StorageError, ValidationError};
use crate::protocol::responses::{
    DELETE_SUCCESS, MAKE_DIRECTORY_SUCCESS, NOTHING_TO_DELETE, RENAME_SUCCESS, SAVE_SUCCESS,
};
use crate::protocol::{Envelope, HostMessage, RequestId};
use crate::storage::{IoResult, Outcome};

/// Receiving end of the outbound channel, held by the host.
pub type Outbound = mpsc::UnboundedReceiver<Envelope>;

#[derive(Debug, Clone)]
pub struct Publisher {
    outbound: mpsc::UnboundedSender<Envelope>,
}

impl Publisher {
    pub fn channel() -> (Self, Outbound) {
        let (outbound, receiver) = mpsc::unbounded_channel();
        (Self { outbound }, receiver)
    }

    /// Announce that the store is open.
    pub fn ready(&self) {
        self.post(Envelope::notice(HostMessage::Ready));
    }

    /// Announce that the store could not be opened.
    pub fn open_failed(&self, err: &StorageError) {
        self.post(Envelope::notice(HostMessage::Err(storage_error_message(err))));
    }

    /// Publish the terminal message for a dispatched command.
    pub fn publish(&self, id: RequestId, result: IoResult) {
        self.post(Envelope::reply(id, result_message(result)));
    }

    /// Publish the terminal message for a message rejected by validation.
    pub fn reject(&self, id: RequestId, err: &ValidationError) {
        self.post(Envelope::reply(
            id,
            HostMessage::Err(validation_error_message(err)),
        ));
    }

    fn post(&self, envelope: Envelope) {
        debug!(
            "Posting {} to host (request {:?})",
            envelope.message.tag(),
            envelope.id
        );
        if self.outbound.send(envelope).is_err() {
            warn!("Host channel closed; outbound message dropped");
        }
    }
}

/// Maps a command result onto the message that reports it.
pub fn result_message(result: IoResult) -> HostMessage {
    match result {
        Ok(Outcome::Saved { .. }) => HostMessage::Stat(SAVE_SUCCESS.to_string()),
        Ok(Outcome::Loaded(data)) => HostMessage::Disp(data),
        Ok(Outcome::Deleted) => HostMessage::Stat(DELETE_SUCCESS.to_string()),
        Ok(Outcome::NothingToDelete) => HostMessage::Stat(NOTHING_TO_DELETE.to_string()),
        Ok(Outcome::Listed(entries)) => HostMessage::List(entries),
        Ok(Outcome::DirectoryCreated) => HostMessage::Stat(MAKE_DIRECTORY_SUCCESS.to_string()),
        Ok(Outcome::Renamed) => HostMessage::Stat(RENAME_SUCCESS.to_string()),
        Err(e) => HostMessage::Err(storage_error_message(&e)),
    }
}
