//! MCP tool implementations.

use contexthub::HubError;
use tracing::warn;
use uuid::Uuid;

use crate::types::{AdapterError, AdapterResult, ToolCallResult};

pub mod add_file;
pub mod delete_file;
pub mod generate_initial_context;
pub mod get_contexts;
pub mod get_file;
pub mod registry;
pub mod update_file;

pub use registry::ToolRegistry;

/// Validate a UUID argument. Malformed ids are the caller's mistake and
/// surface as a protocol error, not a tool result.
pub(crate) fn parse_uuid(field: &str, raw: &str) -> AdapterResult<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|_| AdapterError::InvalidParams(format!("{field} must be a UUID, got \"{raw}\"")))
}

/// A well-formed call that failed against the backend becomes an
/// error-flagged tool result so the model can read and react to it.
pub(crate) fn tool_failure(tool: &str, err: HubError) -> ToolCallResult {
    warn!(tool, error = %err, "tool call failed against the backend");
    ToolCallResult::error(format!("{tool} failed: {err}"))
}
