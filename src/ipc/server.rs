//! TCP IPC server: accept loop and per-connection handler.
//!
//! All connections share one graph behind a single `Mutex`; each request is
//! dispatched with the lock held, so engine operations never interleave.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::graph::ResourceAllocationGraph;
use crate::ipc::codec::{read_frame, write_frame, MSG_ERROR, MSG_REQUEST, MSG_RESPONSE};
use crate::ipc::router;
use crate::types::IpcConfig;

/// Encode a JSON value to msgpack. Logs and returns an error on failure
/// instead of silently producing an empty vec.
fn encode_msgpack(value: &serde_json::Value) -> std::io::Result<Vec<u8>> {
    rmp_serde::to_vec_named(value).map_err(|e| {
        tracing::error!("Msgpack encoding failed: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
    })
}

fn error_payload(request_id: &str, code: &str, message: String) -> serde_json::Value {
    serde_json::json!({
        "id": request_id,
        "ok": false,
        "error": {
            "code": code,
            "message": message,
        }
    })
}

/// IPC server wrapping the graph engine.
#[derive(Debug)]
pub struct IpcServer {
    graph: Arc<Mutex<ResourceAllocationGraph>>,
    addr: SocketAddr,
    cancel: CancellationToken,
    ipc_config: IpcConfig,
}

impl IpcServer {
    pub fn new(
        graph: Arc<Mutex<ResourceAllocationGraph>>,
        addr: SocketAddr,
        ipc_config: IpcConfig,
    ) -> Self {
        Self {
            graph,
            addr,
            cancel: CancellationToken::new(),
            ipc_config,
        }
    }

    /// Token that stops the accept loop and every open connection when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Bind and run the server until cancelled or a fatal error occurs.
    pub async fn serve(&self) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        self.serve_on(listener).await
    }

    /// Run the accept loop on an already-bound listener.
    pub async fn serve_on(&self, listener: TcpListener) -> std::io::Result<()> {
        let conn_semaphore = Arc::new(Semaphore::new(self.ipc_config.max_connections));
        tracing::info!(
            "IPC server listening on {} (max_connections={})",
            listener.local_addr()?,
            self.ipc_config.max_connections,
        );

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("IPC server shutting down");
                    break;
                }
                accept = listener.accept() => {
                    let (stream, peer) = accept?;

                    let permit = match conn_semaphore.clone().try_acquire_owned() {
                        Ok(permit) => permit,
                        Err(_) => {
                            tracing::warn!(
                                "Connection from {} rejected: at max_connections ({})",
                                peer,
                                self.ipc_config.max_connections,
                            );
                            drop(stream);
                            continue;
                        }
                    };

                    tracing::debug!("IPC connection from {} (active={})",
                        peer,
                        self.ipc_config.max_connections - conn_semaphore.available_permits(),
                    );
                    let graph = self.graph.clone();
                    let cancel = self.cancel.clone();
                    let ipc_config = self.ipc_config.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, graph, cancel, ipc_config, permit).await {
                            tracing::warn!("Connection from {} error: {}", peer, e);
                        }
                    });
                }
            }
        }
        Ok(())
    }

    /// Request graceful shutdown.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

/// Handle a single TCP connection: read frames → dispatch → write responses.
async fn handle_connection(
    stream: TcpStream,
    graph: Arc<Mutex<ResourceAllocationGraph>>,
    cancel: CancellationToken,
    ipc_config: IpcConfig,
    _permit: OwnedSemaphorePermit, // held for connection lifetime
) -> std::io::Result<()> {
    let (mut reader, mut writer) = stream.into_split();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            frame_result = tokio::time::timeout(ipc_config.read_timeout, read_frame(&mut reader, ipc_config.max_frame_bytes)) => {
                let (msg_type, payload_bytes) = match frame_result {
                    Err(_elapsed) => {
                        tracing::debug!("Read timeout ({:?}), dropping connection", ipc_config.read_timeout);
                        break;
                    }
                    Ok(result) => match result? {
                        Some(f) => f,
                        None => break, // clean EOF
                    },
                };

                if msg_type != MSG_REQUEST {
                    let err = error_payload(
                        "",
                        "INVALID_ARGUMENT",
                        format!("Unexpected message type: 0x{:02X}", msg_type),
                    );
                    timed_write(&mut writer, MSG_ERROR, &encode_msgpack(&err)?, ipc_config.write_timeout).await?;
                    continue;
                }

                let request: serde_json::Value = match rmp_serde::from_slice(&payload_bytes) {
                    Ok(v) => v,
                    Err(e) => {
                        let err = error_payload("", "INVALID_ARGUMENT", format!("Invalid msgpack: {}", e));
                        timed_write(&mut writer, MSG_ERROR, &encode_msgpack(&err)?, ipc_config.write_timeout).await?;
                        continue;
                    }
                };

                let request_id = request.get("id")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();
                let service = request.get("service")
                    .and_then(|v| v.as_str())
                    .unwrap_or("");
                let method = request.get("method")
                    .and_then(|v| v.as_str())
                    .unwrap_or("");
                let body = request.get("body")
                    .cloned()
                    .unwrap_or(serde_json::Value::Object(serde_json::Map::new()));

                // Graph lock released before response writing
                let result = {
                    let mut graph_guard = graph.lock().await;
                    router::route_request(&mut graph_guard, service, method, body)
                };

                match result {
                    Ok(response_body) => {
                        let response = serde_json::json!({
                            "id": request_id,
                            "ok": true,
                            "body": response_body,
                        });
                        timed_write(&mut writer, MSG_RESPONSE, &encode_msgpack(&response)?, ipc_config.write_timeout).await?;
                    }
                    Err(e) => {
                        tracing::debug!(service, method, error = %e, "request failed");
                        let response = error_payload(&request_id, e.to_ipc_error_code(), e.to_string());
                        timed_write(&mut writer, MSG_ERROR, &encode_msgpack(&response)?, ipc_config.write_timeout).await?;
                    }
                }
            }
        }
    }

    Ok(())
}

/// Write a frame with a timeout. Returns an error if the write takes too long
/// (prevents slow consumers from holding connections indefinitely).
async fn timed_write<W: tokio::io::AsyncWriteExt + Unpin>(
    writer: &mut W,
    msg_type: u8,
    payload: &[u8],
    timeout: Duration,
) -> std::io::Result<()> {
    tokio::time::timeout(timeout, write_frame(writer, msg_type, payload))
        .await
        .map_err(|_| {
            tracing::warn!("Write timeout ({:?}), dropping connection", timeout);
            std::io::Error::new(std::io::ErrorKind::TimedOut, "write timeout")
        })?
}
