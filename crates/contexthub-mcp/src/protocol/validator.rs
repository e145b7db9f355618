//! Structural validation of incoming requests.

use crate::types::{AdapterError, AdapterResult, JsonRpcRequest, JSONRPC_VERSION};

/// Reject envelopes that are JSON but not valid JSON-RPC 2.0 requests.
pub fn validate_request(request: &JsonRpcRequest) -> AdapterResult<()> {
    if request.jsonrpc != JSONRPC_VERSION {
        return Err(AdapterError::InvalidRequest(format!(
            "unsupported jsonrpc version \"{}\"",
            request.jsonrpc
        )));
    }
    if request.method.is_empty() {
        return Err(AdapterError::InvalidRequest(
            "method must not be empty".to_string(),
        ));
    }
    Ok(())
}
