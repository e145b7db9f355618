//! Request dispatcher. Owns the session lifecycle and routes methods to the
//! tool and resource registries.

use std::sync::Arc;
use std::time::Duration;

use contexthub::ContextClient;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::resources::ResourceRegistry;
use crate::tools::ToolRegistry;
use crate::types::{
    AdapterError, AdapterResult, CancelRequestParams, InitializeParams, InitializeResult,
    JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, ResourceListResult,
    ResourceReadParams, ToolCallParams, ToolListResult,
};

use super::lifecycle::{SessionLifecycle, SessionState};
use super::negotiation::negotiate_version;
use super::validator::validate_request;

/// How long to wait for `initialized` before promoting the session anyway.
pub const INIT_FALLBACK_WINDOW: Duration = Duration::from_millis(15_000);

/// Stateful protocol handler shared by every in-flight request task.
pub struct ProtocolHandler {
    client: Arc<ContextClient>,
    lifecycle: Arc<Mutex<SessionLifecycle>>,
    init_fallback: Duration,
}

impl ProtocolHandler {
    pub fn new(client: Arc<ContextClient>) -> Self {
        Self {
            client,
            lifecycle: Arc::new(Mutex::new(SessionLifecycle::new())),
            init_fallback: INIT_FALLBACK_WINDOW,
        }
    }

    /// Shorten the `initialized` fallback window. Used by tests.
    pub fn with_init_fallback(mut self, window: Duration) -> Self {
        self.init_fallback = window;
        self
    }

    pub async fn session_state(&self) -> SessionState {
        self.lifecycle.lock().await.state()
    }

    /// Mark the session as shutting down and cancel the fallback timer.
    pub async fn begin_shutdown(&self) {
        self.lifecycle.lock().await.begin_shutdown();
    }

    /// Handle one request to a terminal message: exactly one success
    /// response or one error envelope, never both.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcMessage {
        if let Err(err) = validate_request(&request) {
            return JsonRpcMessage::Error(err.to_json_rpc_error(request.id));
        }

        let id = request.id.clone();
        self.warn_if_not_ready(&request.method).await;
        debug!(method = %request.method, "dispatching request");

        match self.dispatch_request(request).await {
            Ok(value) => JsonRpcMessage::Response(JsonRpcResponse::new(id, value)),
            Err(err) => JsonRpcMessage::Error(err.to_json_rpc_error(id)),
        }
    }

    async fn dispatch_request(&self, request: JsonRpcRequest) -> AdapterResult<Value> {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params).await,
            "tools/list" => self.handle_tools_list(),
            "tools/call" => self.handle_tools_call(request.params).await,
            "resources/list" => self.handle_resources_list(),
            "resources/read" => self.handle_resources_read(request.params).await,
            "ping" => Ok(Value::Object(serde_json::Map::new())),
            other => Err(AdapterError::MethodNotFound(other.to_string())),
        }
    }

    /// Requests are served in any state, but arriving before the handshake
    /// finished is worth a trace.
    async fn warn_if_not_ready(&self, method: &str) {
        if matches!(method, "initialize" | "ping") {
            return;
        }
        let lifecycle = self.lifecycle.lock().await;
        if matches!(
            lifecycle.state(),
            SessionState::Uninitialized | SessionState::Initializing
        ) {
            warn!(
                method,
                state = %lifecycle.state(),
                "request before initialization completed, processing best-effort"
            );
        }
    }

    pub async fn handle_notification(&self, notification: JsonRpcNotification) {
        match notification.method.as_str() {
            "initialized" | "notifications/initialized" => {
                let mut lifecycle = self.lifecycle.lock().await;
                if !lifecycle.confirm_initialized() {
                    debug!(state = %lifecycle.state(), "redundant initialized notification");
                }
            }
            "notifications/cancelled" | "$/cancelRequest" => {
                self.log_cancellation(notification.params);
            }
            other => {
                debug!(method = other, "ignoring unknown notification");
            }
        }
    }

    /// Cancellation is acknowledged in the logs only. The router keeps its
    /// own settlement bookkeeping and the original request still produces
    /// exactly one terminal message.
    fn log_cancellation(&self, params: Option<Value>) {
        let parsed = params.map(serde_json::from_value::<CancelRequestParams>);
        match parsed {
            Some(Ok(cancel)) => info!(
                request_id = %cancel.request_id,
                reason = cancel.reason.as_deref().unwrap_or("unspecified"),
                "client cancelled a request, letting it settle normally"
            ),
            _ => info!("client cancelled a request, letting it settle normally"),
        }
    }

    async fn handle_initialize(&self, params: Option<Value>) -> AdapterResult<Value> {
        let params: InitializeParams = params
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| AdapterError::InvalidParams(e.to_string()))?
            .ok_or_else(|| AdapterError::InvalidParams("missing initialize params".to_string()))?;

        let version = negotiate_version(&params.protocol_version);
        info!(
            client = %params.client_info.name,
            client_version = %params.client_info.version,
            protocol = version,
            "initializing session"
        );

        let mut lifecycle = self.lifecycle.lock().await;
        lifecycle.begin_initialize(version.to_string());
        self.arm_fallback_timer(&mut lifecycle);

        serde_json::to_value(InitializeResult::for_version(version))
            .map_err(AdapterError::from)
    }

    /// Start the promotion timer: if the client never confirms with
    /// `initialized`, the session becomes Ready on its own once the window
    /// elapses.
    fn arm_fallback_timer(&self, lifecycle: &mut SessionLifecycle) {
        let shared = Arc::clone(&self.lifecycle);
        let window = self.init_fallback;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let mut lifecycle = shared.lock().await;
            if lifecycle.fallback_promote() {
                warn!(
                    window_ms = window.as_millis() as u64,
                    "client never sent initialized, promoting session to ready"
                );
            }
        });
        lifecycle.arm_fallback(timer.abort_handle());
    }

    fn handle_tools_list(&self) -> AdapterResult<Value> {
        let result = ToolListResult {
            tools: ToolRegistry::list_tools(),
            next_cursor: None,
        };
        serde_json::to_value(result).map_err(AdapterError::from)
    }

    async fn handle_tools_call(&self, params: Option<Value>) -> AdapterResult<Value> {
        let params: ToolCallParams = params
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| AdapterError::InvalidParams(e.to_string()))?
            .ok_or_else(|| AdapterError::InvalidParams("missing tool call params".to_string()))?;

        let result = ToolRegistry::call(&params.name, params.arguments, &self.client).await?;
        serde_json::to_value(result).map_err(AdapterError::from)
    }

    fn handle_resources_list(&self) -> AdapterResult<Value> {
        let result = ResourceListResult {
            resources: ResourceRegistry::list_resources(self.client.project_id()),
            next_cursor: None,
        };
        serde_json::to_value(result).map_err(AdapterError::from)
    }

    async fn handle_resources_read(&self, params: Option<Value>) -> AdapterResult<Value> {
        let params: ResourceReadParams = params
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| AdapterError::InvalidParams(e.to_string()))?
            .ok_or_else(|| {
                AdapterError::InvalidParams("missing resource read params".to_string())
            })?;

        let result = ResourceRegistry::read(&params.uri, &self.client).await?;
        serde_json::to_value(result).map_err(AdapterError::from)
    }
}
