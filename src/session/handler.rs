use log::{debug, error, info, warn};
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task;

use crate::error::ValidationError;
use crate::protocol::{decode_line, encode_envelope};
use crate::service::{FileService, Outbound};

/// Drives one host session until the inbound side reaches end of input.
///
/// - Each inbound line is a JSON message handed to `FileService::post_message`.
/// - Outbound envelopes are written as JSON lines by a separate task, in the
///   order the service publishes them.
/// - On end of input the service is shut down, the remaining results are
///   flushed and the writer is handed back.
pub async fn serve_host<R, W>(
    service: FileService,
    outbound: Outbound,
    mut reader: R,
    writer: W,
    max_line_bytes: usize,
) -> io::Result<W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let forwarder = tokio::spawn(forward_outbound(outbound, writer));
    let read_limit = (max_line_bytes as u64).saturating_add(1);
    let mut line = Vec::new();

    loop {
        line.clear();
        let read = (&mut reader)
            .take(read_limit)
            .read_until(b'\n', &mut line)
            .await;
        match read {
            Ok(0) => {
                info!("Host closed the inbound channel");
                break;
            }
            Ok(n) => {
                if n > max_line_bytes {
                    let total = if line.ends_with(b"\n") {
                        n
                    } else {
                        match discard_line(&mut reader).await {
                            Ok(rest) => n + rest,
                            Err(e) => {
                                error!("Failed to read from host: {}", e);
                                break;
                            }
                        }
                    };
                    service.reject(ValidationError::TooLong(total));
                    continue;
                }

                let text = match std::str::from_utf8(&line) {
                    Ok(text) => text.trim_end_matches(['\r', '\n']),
                    Err(_) => {
                        service.reject(ValidationError::Malformed(
                            "message is not valid UTF-8".into(),
                        ));
                        continue;
                    }
                };
                if text.trim().is_empty() {
                    continue;
                }

                match decode_line(text) {
                    Ok(message) => {
                        let id = service.post_message(message);
                        debug!("Accepted host message {}", id);
                    }
                    Err(e) => {
                        service.reject(e);
                    }
                }
            }
            Err(e) => {
                error!("Failed to read from host: {}", e);
                break;
            }
        }
    }

    // Joining the worker blocks, so it must not run on a runtime thread.
    task::spawn_blocking(move || service.shutdown())
        .await
        .map_err(|e| io::Error::other(e.to_string()))?;

    forwarder.await.map_err(|e| io::Error::other(e.to_string()))?
}

/// Skips input up to and including the next newline without buffering it.
/// Returns the number of bytes skipped.
async fn discard_line<R>(reader: &mut R) -> io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut skipped = 0;
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(skipped);
        }
        match available.iter().position(|&b| b == b'\n') {
            Some(end) => {
                reader.consume(end + 1);
                return Ok(skipped + end + 1);
            }
            None => {
                let len = available.len();
                reader.consume(len);
                skipped += len;
            }
        }
    }
}

async fn forward_outbound<W>(mut outbound: Outbound, mut writer: W) -> io::Result<W>
where
    W: AsyncWrite + Unpin,
{
    while let Some(envelope) = outbound.recv().await {
        let mut line = match encode_envelope(&envelope) {
            Ok(line) => line,
            Err(e) => {
                warn!("Dropping unencodable {} message: {}", envelope.message.tag(), e);
                continue;
            }
        };
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
    }
    debug!("Outbound channel closed");
    Ok(writer)
}
