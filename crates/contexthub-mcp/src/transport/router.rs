//! Request settlement bookkeeping.
//!
//! Every inbound request id is registered here, and every terminal message
//! (response, error, timeout, shutdown error) flows back through
//! [`RequestRouter::complete`]. The pending map is the single source of truth
//! for whether a request is still owed an answer, which is what makes the
//! one-terminal-message guarantee hold when a watchdog and a late handler
//! race.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::types::{AdapterError, JsonRpcMessage, RequestId};

/// How long a request may stay unanswered before the watchdog replaces it
/// with a timeout error.
pub const REQUEST_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Items on the outbound writer channel. `Close` is the writer's stop
/// sentinel; the channel stays open as long as dispatch tasks hold the
/// router, so dropping senders alone would never end the writer.
#[derive(Debug)]
pub enum Outbound {
    Message(JsonRpcMessage),
    Close,
}

struct PendingRequest {
    registered_at: Instant,
    watchdog: JoinHandle<()>,
}

pub struct RequestRouter {
    pending: Mutex<HashMap<RequestId, PendingRequest>>,
    outbound: mpsc::UnboundedSender<Outbound>,
    shutting_down: AtomicBool,
    request_timeout: Duration,
}

impl RequestRouter {
    pub fn new(
        outbound: mpsc::UnboundedSender<Outbound>,
        request_timeout: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            pending: Mutex::new(HashMap::new()),
            outbound,
            shutting_down: AtomicBool::new(false),
            request_timeout,
        })
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    pub fn pending_count(&self) -> usize {
        self.lock_pending().len()
    }

    /// Track a new request and arm its timeout watchdog. Returns false when
    /// the id is already in flight, in which case the caller must reject the
    /// newcomer and leave the original untouched.
    pub fn register(self: &Arc<Self>, id: RequestId) -> bool {
        let mut pending = self.lock_pending();
        if pending.contains_key(&id) {
            return false;
        }

        let router = Arc::clone(self);
        let watchdog_id = id.clone();
        let timeout = self.request_timeout;
        let watchdog = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            router.expire(&watchdog_id);
        });

        pending.insert(
            id,
            PendingRequest {
                registered_at: Instant::now(),
                watchdog,
            },
        );
        true
    }

    /// Settle a request with its terminal message. A request that already
    /// timed out (or was drained by shutdown) is gone from the map, and the
    /// late message is dropped so the client never sees a second answer.
    pub fn complete(&self, id: &RequestId, message: JsonRpcMessage) {
        let entry = self.lock_pending().remove(id);
        match entry {
            Some(request) => {
                request.watchdog.abort();
                debug!(
                    elapsed_ms = request.registered_at.elapsed().as_millis() as u64,
                    "request settled"
                );
                self.send(message);
            }
            None => {
                debug!("dropping terminal message for already-settled request");
            }
        }
    }

    /// Watchdog path: the request ran out of time. Removal from the map is
    /// the claim; whoever removes the entry owns the terminal message.
    fn expire(&self, id: &RequestId) {
        let entry = self.lock_pending().remove(id);
        if let Some(request) = entry {
            drop(request.watchdog);
            warn!(
                elapsed_ms = request.registered_at.elapsed().as_millis() as u64,
                "request timed out, answering with an error"
            );
            let err = AdapterError::RequestTimeout;
            self.send(JsonRpcMessage::Error(err.to_json_rpc_error(id.clone())));
        }
    }

    /// Send an error for a request that was never registered (malformed
    /// envelope, duplicate id, shutdown rejection).
    pub fn reject(&self, id: RequestId, err: &AdapterError) {
        self.send(JsonRpcMessage::Error(err.to_json_rpc_error(id)));
    }

    /// Flip into shutdown mode and drain the pending map: every in-flight
    /// request is settled with a shutdown error right now. Idempotent.
    pub fn begin_shutdown(&self) {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }

        let drained: Vec<(RequestId, PendingRequest)> =
            self.lock_pending().drain().collect();
        if !drained.is_empty() {
            warn!(
                count = drained.len(),
                "shutting down with requests in flight, settling them with errors"
            );
        }
        for (id, request) in drained {
            request.watchdog.abort();
            let err = AdapterError::ShuttingDown;
            self.send(JsonRpcMessage::Error(err.to_json_rpc_error(id)));
        }
    }

    /// Ask the writer task to finish once everything queued so far is out.
    /// The channel is FIFO, so errors queued by [`begin_shutdown`] are
    /// flushed before the writer stops.
    pub fn close_writer(&self) {
        if self.outbound.send(Outbound::Close).is_err() {
            debug!("writer already gone");
        }
    }

    fn send(&self, message: JsonRpcMessage) {
        if self.outbound.send(Outbound::Message(message)).is_err() {
            debug!("outbound channel closed, dropping message");
        }
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, HashMap<RequestId, PendingRequest>> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
