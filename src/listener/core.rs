use log::{debug, error, info, warn};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, watch};
use tokio::time::timeout;

use crate::config::ListenerConfig;

const MAX_REQUEST_LINE: u64 = 2048;

pub struct StatusListener {
    listener: TcpListener,
    connections: Arc<Semaphore>,
    max_connections: usize,
    read_timeout: Duration,
    response: Arc<str>,
}

impl StatusListener {
    pub async fn bind(config: &ListenerConfig) -> io::Result<Self> {
        let socket = config.socket();
        let listener = match TcpListener::bind(&socket).await {
            Ok(listener) => {
                info!("Listener bound to {}", socket);
                listener
            }
            Err(e) => {
                error!("Failed to bind to {}: {}", socket, e);
                return Err(e);
            }
        };

        Ok(Self {
            listener,
            connections: Arc::new(Semaphore::new(config.max_connections)),
            max_connections: config.max_connections,
            read_timeout: config.read_timeout(),
            response: Arc::from(config.response.as_str()),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until `shutdown` turns true or its sender goes
    /// away, then waits for in-flight connections to finish.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Starting listener on {:?} (max {} connections)",
            self.listener.local_addr().ok(),
            self.max_connections
        );

        while !*shutdown.borrow() {
            // A slot is reserved before accepting so a full listener leaves
            // new peers in the backlog.
            let permit = tokio::select! {
                permit = Arc::clone(&self.connections).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            };

            let accepted = tokio::select! {
                accepted = self.listener.accept() => accepted,
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            };

            match accepted {
                Ok((stream, addr)) => {
                    let read_timeout = self.read_timeout;
                    let response = Arc::clone(&self.response);
                    tokio::spawn(async move {
                        if let Err(e) =
                            handle_connection(stream, addr, read_timeout, response, permit).await
                        {
                            warn!("Failed to handle connection {}: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                }
            }
        }

        info!("Listener stopping; waiting for open connections");
        // Every permit returns once its connection task ends.
        let all = u32::try_from(self.max_connections).unwrap_or(u32::MAX);
        if self.connections.acquire_many(all).await.is_err() {
            warn!("Connection limiter closed during shutdown");
        }
        info!("Listener stopped");
    }
}

/// Reads one request line, answers with the fixed response and closes.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    read_timeout: Duration,
    response: Arc<str>,
    _permit: OwnedSemaphorePermit,
) -> io::Result<()> {
    let mut reader = BufReader::new(stream);
    let mut line = Vec::new();

    let read = timeout(
        read_timeout,
        (&mut reader).take(MAX_REQUEST_LINE).read_until(b'\n', &mut line),
    )
    .await;
    match read {
        Ok(Ok(n)) => debug!(
            "Request from {} ({} bytes): {}",
            addr,
            n,
            String::from_utf8_lossy(&line).trim_end()
        ),
        Ok(Err(e)) => return Err(e),
        Err(_) => {
            warn!("Connection {} sent no request within {:?}", addr, read_timeout);
            return Ok(());
        }
    }

    let stream = reader.get_mut();
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}
