//! File worker
//!
//! A dedicated thread that owns the storage handle and runs one command at a
//! time, in the order the router enqueued them.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use log::{debug, error, info, warn};
use tokio::sync::{mpsc, oneshot};

use crate::error::{IoStage, StorageError, codes};
use crate::protocol::{Command, RequestId};
use crate::service::publisher::Publisher;
use crate::storage::{IoResult, StorageHandle, operations};

/// A queued command and the slot its result goes into.
pub(crate) struct Job {
    pub id: RequestId,
    pub command: Command,
    pub reply: oneshot::Sender<IoResult>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WorkerOptions {
    pub sorted_listing: bool,
}

/// Starts the worker thread. The store is opened on that thread before the
/// first job is taken off the queue.
pub(crate) fn spawn_worker(
    handle: StorageHandle,
    jobs: mpsc::UnboundedReceiver<Job>,
    publisher: Publisher,
    options: WorkerOptions,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("file-worker".to_string())
        .spawn(move || run(handle, jobs, publisher, options))
}

fn run(
    mut handle: StorageHandle,
    mut jobs: mpsc::UnboundedReceiver<Job>,
    publisher: Publisher,
    options: WorkerOptions,
) {
    match handle.open() {
        Ok(()) => publisher.ready(),
        Err(e) => publisher.open_failed(&e),
    }
    drop(publisher);

    while let Some(job) = jobs.blocking_recv() {
        if job.reply.is_closed() {
            warn!("Skipping {} {}: requester no longer waiting", job.id, job.command);
            continue;
        }

        debug!("Running {} {}", job.id, job.command);
        let result = execute(&mut handle, &job.command, &options);
        if job.reply.send(result).is_err() {
            warn!("Requester for {} went away before completion", job.id);
        }
    }

    info!("File worker for {} store stopped", handle.backend_name());
}

/// Runs one command to completion. A panic inside the backend fails only
/// this command.
pub fn execute(handle: &mut StorageHandle, command: &Command, options: &WorkerOptions) -> IoResult {
    panic::catch_unwind(AssertUnwindSafe(|| dispatch(handle, command, options))).unwrap_or_else(
        |_| {
            error!("Storage operation panicked: {}", command);
            Err(StorageError::Io {
                stage: IoStage::Internal,
                code: codes::FAILED,
            })
        },
    )
}

fn dispatch(handle: &mut StorageHandle, command: &Command, options: &WorkerOptions) -> IoResult {
    match command {
        Command::Load(path) => operations::load(handle, path),
        Command::Save { path, contents } => operations::save(handle, path, contents),
        Command::Delete(path) => operations::delete(handle, path),
        Command::List(path) => operations::list(handle, path, options.sorted_listing),
        Command::MakeDir(path) => operations::make_dir(handle, path),
        Command::Rename { from, to } => operations::rename(handle, from, to),
    }
}
