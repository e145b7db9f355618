//! Stdio transport — reads framed JSON-RPC from stdin, writes to stdout.
//!
//! Requests are dispatched concurrently: each one runs in its own task and
//! settles through the [`RequestRouter`], while a single writer task owns
//! stdout so frames never interleave.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::protocol::ProtocolHandler;
use crate::types::{AdapterError, AdapterResult, JsonRpcMessage, RequestId};

use super::framing::{encode_frame, FrameCodec};
use super::router::{Outbound, RequestRouter, REQUEST_TIMEOUT};

/// Stdio transport for desktop MCP clients.
pub struct StdioTransport {
    handler: Arc<ProtocolHandler>,
    request_timeout: Duration,
}

impl StdioTransport {
    pub fn new(handler: ProtocolHandler) -> Self {
        Self {
            handler: Arc::new(handler),
            request_timeout: REQUEST_TIMEOUT,
        }
    }

    /// Override the per-request timeout. Used by tests.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Run the transport on the process's stdin/stdout until EOF or a
    /// termination signal.
    pub async fn run(&self) -> AdapterResult<()> {
        info!("stdio transport started");
        self.run_on(tokio::io::stdin(), tokio::io::stdout(), shutdown_signal())
            .await
    }

    /// Transport loop over arbitrary streams. Tests drive this with
    /// in-memory duplex pipes.
    pub async fn run_on<R, W, S>(&self, reader: R, writer: W, shutdown: S) -> AdapterResult<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
        S: Future<Output = ()>,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let writer_task = tokio::spawn(write_loop(writer, rx));
        let router = RequestRouter::new(tx, self.request_timeout);

        let mut reader = reader;
        let mut codec = FrameCodec::new();
        let mut read_buf = vec![0u8; 8 * 1024];
        let mut read_error: Option<std::io::Error> = None;
        let mut shutdown = std::pin::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown signal received");
                    break;
                }
                read = reader.read(&mut read_buf) => match read {
                    Ok(0) => {
                        info!("EOF on stdin, shutting down");
                        break;
                    }
                    Ok(n) => {
                        codec.push(&read_buf[..n]);
                        while let Some(body) = codec.next_frame() {
                            self.dispatch_frame(&router, body);
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "stdin read failed");
                        read_error = Some(e);
                        break;
                    }
                },
            }
        }

        // Drain: settle in-flight requests with shutdown errors, answer any
        // frames still sitting in the codec the same way, then let the
        // writer flush its queue and stop.
        router.begin_shutdown();
        while let Some(body) = codec.next_frame() {
            self.dispatch_frame(&router, body);
        }
        self.handler.begin_shutdown().await;
        router.close_writer();
        let _ = writer_task.await;

        match read_error {
            Some(e) => Err(AdapterError::Io(e)),
            None => Ok(()),
        }
    }

    /// Route one decoded frame. Requests go through the router so their
    /// settlement is tracked; notifications are fire-and-forget.
    fn dispatch_frame(&self, router: &Arc<RequestRouter>, body: Vec<u8>) {
        match serde_json::from_slice::<JsonRpcMessage>(&body) {
            Ok(JsonRpcMessage::Request(request)) => {
                let id = request.id.clone();
                if router.is_shutting_down() {
                    router.reject(id, &AdapterError::ShuttingDown);
                    return;
                }
                if !router.register(id.clone()) {
                    warn!(method = %request.method, "duplicate in-flight request id");
                    router.reject(
                        id,
                        &AdapterError::InvalidRequest(
                            "duplicate in-flight request id".to_string(),
                        ),
                    );
                    return;
                }

                let handler = Arc::clone(&self.handler);
                let router = Arc::clone(router);
                tokio::spawn(async move {
                    let message = handler.handle_request(request).await;
                    router.complete(&id, message);
                });
            }
            Ok(JsonRpcMessage::Notification(notification)) => {
                let handler = Arc::clone(&self.handler);
                tokio::spawn(async move {
                    handler.handle_notification(notification).await;
                });
            }
            Ok(_) => {
                warn!("ignoring a message that is neither request nor notification");
            }
            Err(e) => {
                warn!(error = %e, "frame body is not valid JSON-RPC");
                router.reject(RequestId::Null, &AdapterError::ParseError(e.to_string()));
            }
        }
    }
}

/// Single owner of the output stream. Stops on the `Close` sentinel or on a
/// write failure, flushing what it can.
async fn write_loop<W>(mut writer: W, mut rx: mpsc::UnboundedReceiver<Outbound>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(item) = rx.recv().await {
        match item {
            Outbound::Message(message) => {
                let body = match serde_json::to_vec(&message) {
                    Ok(body) => body,
                    Err(e) => {
                        error!(error = %e, "failed to serialize outbound message");
                        continue;
                    }
                };
                let frame = encode_frame(&body);
                if let Err(e) = writer.write_all(&frame).await {
                    warn!(error = %e, "stdout write failed, stopping writer");
                    break;
                }
                if let Err(e) = writer.flush().await {
                    warn!(error = %e, "stdout flush failed, stopping writer");
                    break;
                }
            }
            Outbound::Close => break,
        }
    }
    let _ = writer.shutdown().await;
}

/// Resolves on Ctrl-C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
