//! Service core
//!
//! `FileService` owns the router, the publisher and the worker thread for one
//! store. Dropping the service closes the queue and joins the worker, so
//! queued and in-flight commands finish before teardown returns.

use std::io;
use std::thread::JoinHandle;
use std::time::Duration;

use log::{error, info};
use tokio::sync::mpsc;

use crate::error::ValidationError;
use crate::protocol::{Command, InboundMessage, RequestId};
use crate::service::publisher::{Outbound, Publisher};
use crate::service::router::Router;
use crate::service::worker::{WorkerOptions, spawn_worker};
use crate::storage::{Backend, IoResult, StorageHandle};

/// Capacity requested from the backend when none is configured.
pub const DEFAULT_CAPACITY: u64 = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ServiceOptions {
    pub capacity: u64,
    pub sorted_listing: bool,
    pub operation_timeout: Option<Duration>,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            sorted_listing: false,
            operation_timeout: None,
        }
    }
}

pub struct FileService {
    router: Router,
    publisher: Publisher,
    worker: Option<JoinHandle<()>>,
    operation_timeout: Option<Duration>,
}

impl FileService {
    /// Starts the worker thread for `backend` and returns the service with
    /// the channel its outbound messages arrive on. The first outbound
    /// message is `READY`, or an `ERR` if the store failed to open.
    pub fn start(backend: Box<dyn Backend>, options: ServiceOptions) -> io::Result<(Self, Outbound)> {
        let (publisher, outbound) = Publisher::channel();
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();

        let handle = StorageHandle::new(backend, options.capacity);
        info!(
            "Starting file service on {} store (capacity {} bytes)",
            handle.backend_name(),
            options.capacity
        );
        let worker = spawn_worker(
            handle,
            jobs_rx,
            publisher.clone(),
            WorkerOptions {
                sorted_listing: options.sorted_listing,
            },
        )?;

        let service = Self {
            router: Router::new(jobs_tx),
            publisher,
            worker: Some(worker),
            operation_timeout: options.operation_timeout,
        };
        Ok((service, outbound))
    }

    /// Accepts one inbound host message.
    ///
    /// Returns immediately. Exactly one outbound message carrying the
    /// returned id follows, either right away for a rejected message or once
    /// the worker finishes the command. Must be called within a Tokio
    /// runtime.
    pub fn post_message(&self, message: InboundMessage) -> RequestId {
        let id = match message.id {
            Some(id) => {
                self.router.observe(id);
                id
            }
            None => self.router.next_id(),
        };

        match self.router.route(id, &message.parts) {
            Ok(pending) => {
                let publisher = self.publisher.clone();
                let deadline = self.operation_timeout;
                tokio::spawn(async move {
                    let result = pending.wait(deadline).await;
                    publisher.publish(id, result);
                });
            }
            Err(e) => self.publisher.reject(id, &e),
        }
        id
    }

    /// Answers a message that could not be decoded with an `ERR`.
    pub fn reject(&self, err: ValidationError) -> RequestId {
        let id = self.router.next_id();
        self.publisher.reject(id, &err);
        id
    }

    /// Runs `command` and returns its result directly, bypassing the
    /// outbound channel.
    pub async fn execute(&self, command: Command) -> IoResult {
        let id = self.router.next_id();
        self.router
            .dispatch(id, command)
            .wait(self.operation_timeout)
            .await
    }

    /// Blocking variant of [`FileService::execute`] for callers outside an
    /// async runtime. No deadline applies.
    pub fn execute_blocking(&self, command: Command) -> IoResult {
        let id = self.router.next_id();
        self.router.dispatch(id, command).wait_blocking()
    }

    /// Closes the queue and waits for the worker to finish.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.router.close();
        if let Some(worker) = self.worker.take() {
            info!("Waiting for file worker to finish");
            if worker.join().is_err() {
                error!("File worker panicked");
            }
        }
    }
}

impl Drop for FileService {
    fn drop(&mut self) {
        self.stop();
    }
}
