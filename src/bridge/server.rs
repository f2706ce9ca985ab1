//! Sequential bridge server.
//!
//! Calls are queued on an mpsc channel and answered strictly one at a
//! time; each is run on `spawn_blocking` and its response comes back
//! through a oneshot channel.

use super::{MethodCall, MethodResponse, PdfCombinerPlugin};
use crate::error::PipelineError;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

const QUEUE_DEPTH: usize = 32;

type Envelope = (MethodCall, oneshot::Sender<MethodResponse>);

/// Cloneable sender side of a running bridge.
#[derive(Clone)]
pub struct BridgeHandle {
    tx: mpsc::Sender<Envelope>,
}

impl BridgeHandle {
    /// Queue `call` and wait for its response.
    pub async fn call(&self, call: MethodCall) -> Result<MethodResponse, PipelineError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send((call, reply))
            .await
            .map_err(|_| PipelineError::Internal("bridge server has stopped".into()))?;
        response
            .await
            .map_err(|_| PipelineError::Internal("bridge server dropped the call".into()))
    }
}

/// Start the server task. It runs until every [`BridgeHandle`] is dropped,
/// then drops the plugin (releasing its engine).
pub fn spawn_bridge(plugin: PdfCombinerPlugin) -> (BridgeHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<Envelope>(QUEUE_DEPTH);
    let plugin = Arc::new(plugin);

    let task = tokio::spawn(async move {
        info!("Bridge server started");
        while let Some((call, reply)) = rx.recv().await {
            debug!("→ {}", call.method);
            let worker = Arc::clone(&plugin);
            let response = tokio::task::spawn_blocking(move || worker.handle(&call))
                .await
                .unwrap_or_else(|e| {
                    MethodResponse::from(&PipelineError::Internal(format!(
                        "Bridge task panicked: {}",
                        e
                    )))
                });
            // The caller may have given up waiting.
            let _ = reply.send(response);
        }
        info!("Bridge server stopped");
    });

    (BridgeHandle { tx }, task)
}

/// Speak newline-delimited JSON: one [`MethodCall`] per input line, one
/// [`MethodResponse`] per output line. Blank lines are ignored; lines that
/// are not a valid call get an `invalid_arguments` error.
pub async fn serve_json_lines<R, W>(
    handle: &BridgeHandle,
    reader: R,
    mut writer: W,
) -> Result<(), PipelineError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let io_err = |e: std::io::Error| PipelineError::Internal(format!("bridge I/O error: {e}"));
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await.map_err(io_err)? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<MethodCall>(line) {
            Ok(call) => handle.call(call).await?,
            Err(e) => MethodResponse::from(&PipelineError::InvalidArguments(format!(
                "malformed method call: {e}"
            ))),
        };
        let mut encoded = serde_json::to_string(&response)
            .map_err(|e| PipelineError::Internal(e.to_string()))?;
        encoded.push('\n');
        writer.write_all(encoded.as_bytes()).await.map_err(io_err)?;
        writer.flush().await.map_err(io_err)?;
    }
    Ok(())
}
