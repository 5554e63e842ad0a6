//! Stdin/stdout JSON bridge for the host command channel.
//!
//! Reads newline-delimited JSON `CommandEnvelope` messages, dispatches them
//! through [`HostBridge`], and writes `ResponseEnvelope` and `EventEnvelope`
//! messages as newline-delimited JSON.
//!
//! Stdout is exclusively reserved for the JSON protocol; all diagnostic
//! output (tracing, logs) must be routed to stderr.

use crate::error::{Result, WidgetError};
use crate::host::contract::{CommandEnvelope, CommandName, EventEnvelope, ResponseEnvelope};
use crate::host::handler::HostBridge;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::Mutex;
use tokio::sync::broadcast::error::RecvError;

/// Run the bridge over the process's stdin/stdout.
pub async fn run_stdio_bridge(bridge: HostBridge) -> Result<()> {
    let reader = BufReader::new(tokio::io::stdin());
    let writer = BufWriter::new(tokio::io::stdout());
    run_bridge(bridge, reader, writer).await
}

/// Run the bridge until the input closes or a `runtime.stop` command is
/// handled.
///
/// Two tasks operate concurrently:
///
/// 1. **Reader** -- parses each line as a `CommandEnvelope`, dispatches it,
///    and writes the `ResponseEnvelope`.
/// 2. **Event forwarder** -- writes every widget runtime event as an
///    `EventEnvelope`.
///
/// The widget loop is shut down when the reader finishes.
pub async fn run_bridge<R, W>(bridge: HostBridge, reader: R, writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let writer = Arc::new(Mutex::new(writer));

    let event_writer = Arc::clone(&writer);
    let mut event_rx = bridge.widget().subscribe();
    let event_handle = tokio::spawn(async move {
        let mut seq = 0_u64;
        loop {
            match event_rx.recv().await {
                Ok(event) => {
                    seq += 1;
                    let envelope = EventEnvelope::from_runtime(seq, &event);
                    match serde_json::to_string(&envelope) {
                        Ok(json) => {
                            let mut w = event_writer.lock().await;
                            if let Err(e) = write_line(&mut *w, &json).await {
                                tracing::warn!(
                                    error = %e,
                                    "failed to write event envelope; stopping event forwarder"
                                );
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "failed to serialize event envelope; skipping");
                        }
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "event forwarder lagged; some events were dropped");
                }
                Err(RecvError::Closed) => {
                    tracing::info!("runtime event channel closed; stopping event forwarder");
                    break;
                }
            }
        }
    });

    let reader_result = run_reader(&bridge, reader, Arc::clone(&writer)).await;

    bridge.widget().shutdown();
    event_handle.abort();
    let _ = event_handle.await;

    reader_result
}

async fn run_reader<R, W>(bridge: &HostBridge, mut reader: R, writer: Arc<Mutex<W>>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        let bytes_read = reader
            .read_line(&mut line)
            .await
            .map_err(|e| WidgetError::Channel(format!("failed to read command input: {e}")))?;

        if bytes_read == 0 {
            tracing::info!("command input closed (EOF); shutting down bridge");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let envelope: CommandEnvelope = match serde_json::from_str(trimmed) {
            Ok(env) => env,
            Err(e) => {
                tracing::warn!(error = %e, raw_line = %trimmed, "failed to parse command envelope");
                let response = ResponseEnvelope::error(
                    "parse-error",
                    format!("failed to parse command envelope: {e}"),
                );
                let json = serde_json::to_string(&response)?;
                let mut w = writer.lock().await;
                write_line(&mut *w, &json).await?;
                continue;
            }
        };

        let is_stop = envelope.command == CommandName::RuntimeStop;
        let response = bridge.dispatch(envelope).await;
        let json = serde_json::to_string(&response)?;
        {
            let mut w = writer.lock().await;
            write_line(&mut *w, &json).await?;
        }

        if is_stop && response.ok {
            tracing::info!("runtime.stop handled; shutting down bridge");
            break;
        }
    }
    Ok(())
}

/// Write a single JSON line and flush.
async fn write_line<W: AsyncWrite + Unpin + ?Sized>(writer: &mut W, json: &str) -> Result<()> {
    writer
        .write_all(json.as_bytes())
        .await
        .map_err(|e| WidgetError::Channel(format!("failed to write output: {e}")))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| WidgetError::Channel(format!("failed to write newline: {e}")))?;
    writer
        .flush()
        .await
        .map_err(|e| WidgetError::Channel(format!("failed to flush output: {e}")))?;
    Ok(())
}
