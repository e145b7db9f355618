//! Error types and JSON-RPC error codes for the adapter.

use contexthub::HubError;
use serde_json::Value;

use super::message::{JsonRpcError, RequestId};

/// Standard JSON-RPC 2.0 error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// Adapter-specific codes, in the JSON-RPC server-error range.
pub mod adapter_error_codes {
    pub const REQUEST_TIMEOUT: i32 = -32001;
    pub const SERVER_SHUTTING_DOWN: i32 = -32002;
    pub const UNAUTHORIZED: i32 = -32003;
    pub const FORBIDDEN: i32 = -32004;
    pub const NOT_FOUND: i32 = -32005;
    pub const RATE_LIMITED: i32 = -32006;
    pub const SERVICE_UNAVAILABLE: i32 = -32007;
}

/// All errors a request can surface as.
#[derive(thiserror::Error, Debug)]
pub enum AdapterError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Request timed out")]
    RequestTimeout,

    #[error("Server shutting down")]
    ShuttingDown,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A backend call failed; the display text is the backend error's own.
    #[error("{0}")]
    Backend(#[from] HubError),
}

pub type AdapterResult<T> = Result<T, AdapterError>;

impl AdapterError {
    pub fn code(&self) -> i32 {
        use adapter_error_codes::*;
        use error_codes::*;
        match self {
            AdapterError::ParseError(_) => PARSE_ERROR,
            AdapterError::InvalidRequest(_) => INVALID_REQUEST,
            AdapterError::MethodNotFound(_) | AdapterError::ToolNotFound(_) => METHOD_NOT_FOUND,
            AdapterError::InvalidParams(_) => INVALID_PARAMS,
            AdapterError::InternalError(_) => INTERNAL_ERROR,
            AdapterError::RequestTimeout => REQUEST_TIMEOUT,
            AdapterError::ShuttingDown => SERVER_SHUTTING_DOWN,
            AdapterError::Transport(_) | AdapterError::Io(_) => INTERNAL_ERROR,
            AdapterError::Json(_) => PARSE_ERROR,
            AdapterError::Backend(hub) => match hub {
                HubError::InvalidParams(_) => INVALID_PARAMS,
                HubError::Unauthorized => UNAUTHORIZED,
                HubError::Forbidden => FORBIDDEN,
                HubError::NotFound => NOT_FOUND,
                HubError::RateLimited { .. } => RATE_LIMITED,
                HubError::ServiceUnavailable { .. } => SERVICE_UNAVAILABLE,
                // The backend never answered; from the client's side that is
                // the service being unavailable.
                HubError::Timeout | HubError::Network(_) => SERVICE_UNAVAILABLE,
                HubError::Internal { .. } | HubError::Url(_) | HubError::Decode(_) => {
                    INTERNAL_ERROR
                }
            },
        }
    }

    /// Structured diagnostic payload for the error envelope's `data` field.
    pub fn data(&self) -> Option<Value> {
        match self {
            AdapterError::Backend(hub) => hub.diagnostic_data(),
            _ => None,
        }
    }

    pub fn to_json_rpc_error(&self, id: RequestId) -> JsonRpcError {
        JsonRpcError::with_data(id, self.code(), self.to_string(), self.data())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_not_found_keeps_code_and_message() {
        let err = AdapterError::Backend(HubError::from_status(404, ""));
        assert_eq!(err.code(), adapter_error_codes::NOT_FOUND);
        assert_eq!(err.to_string(), "Resource not found");
    }

    #[test]
    fn rate_limit_data_reaches_the_envelope() {
        let err = AdapterError::Backend(HubError::from_status(429, r#"{"retryAfter": 5}"#));
        let envelope = err.to_json_rpc_error(RequestId::Number(7));
        assert_eq!(envelope.error.code, adapter_error_codes::RATE_LIMITED);
        assert_eq!(envelope.error.data.unwrap()["retry_after"], 5);
    }

    #[test]
    fn unmapped_status_is_internal_error() {
        let err = AdapterError::Backend(HubError::from_status(418, "short and stout"));
        assert_eq!(err.code(), error_codes::INTERNAL_ERROR);
        assert!(err.to_string().contains("418"));
    }

    #[test]
    fn lifecycle_errors_use_adapter_codes() {
        assert_eq!(
            AdapterError::RequestTimeout.code(),
            adapter_error_codes::REQUEST_TIMEOUT
        );
        assert_eq!(
            AdapterError::ShuttingDown.code(),
            adapter_error_codes::SERVER_SHUTTING_DOWN
        );
    }
}
