//! Command router
//!
//! Validates inbound messages and enqueues one job per valid command. The
//! router never touches the store and never blocks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::{mpsc, oneshot};

use crate::error::{StorageError, ValidationError};
use crate::protocol::{Command, RequestId, parse_command};
use crate::service::worker::Job;
use crate::storage::IoResult;

pub struct Router {
    jobs: Option<mpsc::UnboundedSender<Job>>,
    next_id: AtomicU64,
}

/// A dispatched command whose result has not arrived yet.
#[derive(Debug)]
pub struct Pending {
    id: RequestId,
    reply: oneshot::Receiver<IoResult>,
}

impl Router {
    pub(crate) fn new(jobs: mpsc::UnboundedSender<Job>) -> Self {
        Self {
            jobs: Some(jobs),
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocates the next correlation id.
    pub fn next_id(&self) -> RequestId {
        RequestId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Records an id chosen by the host. Allocated ids stay above every id
    /// the host has used so far.
    pub fn observe(&self, id: RequestId) {
        self.next_id
            .fetch_max(id.0.saturating_add(1), Ordering::Relaxed);
    }

    /// Validates `parts` and enqueues the command under `id`.
    pub fn route(&self, id: RequestId, parts: &[String]) -> Result<Pending, ValidationError> {
        let command = parse_command(parts)?;
        Ok(self.dispatch(id, command))
    }

    /// Enqueues an already validated command.
    pub fn dispatch(&self, id: RequestId, command: Command) -> Pending {
        let (reply, receiver) = oneshot::channel();
        debug!("Enqueueing {} {}", id, command);

        match &self.jobs {
            Some(jobs) => {
                // A failed send drops the reply slot, which the waiter sees
                // as a stopped worker.
                if jobs.send(Job { id, command, reply }).is_err() {
                    warn!("File worker is gone; {} not enqueued", id);
                }
            }
            None => warn!("Router closed; {} not enqueued", id),
        }

        Pending {
            id,
            reply: receiver,
        }
    }

    /// Stops accepting work so the worker can drain and exit.
    pub(crate) fn close(&mut self) {
        self.jobs = None;
    }
}

impl Pending {
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Waits for the result, giving up after `deadline` if one is set.
    ///
    /// Giving up does not abort a job the worker already started; a job still
    /// in the queue is skipped.
    pub async fn wait(self, deadline: Option<Duration>) -> IoResult {
        match deadline {
            Some(limit) => match tokio::time::timeout(limit, self.reply).await {
                Ok(received) => received.unwrap_or(Err(StorageError::WorkerStopped)),
                Err(_) => {
                    warn!("{} timed out after {:?}", self.id, limit);
                    Err(StorageError::TimedOut(limit))
                }
            },
            None => self
                .reply
                .await
                .unwrap_or(Err(StorageError::WorkerStopped)),
        }
    }

    /// Blocking variant of [`Pending::wait`] without a deadline. Must not be
    /// called from inside an async runtime.
    pub fn wait_blocking(self) -> IoResult {
        self.reply
            .blocking_recv()
            .unwrap_or(Err(StorageError::WorkerStopped))
    }
}
