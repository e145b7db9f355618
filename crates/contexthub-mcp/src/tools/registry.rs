//! Tool registration and dispatch.

use contexthub::ContextClient;
use serde_json::Value;

use crate::types::{AdapterError, AdapterResult, ToolCallResult, ToolDefinition};

use super::{
    add_file, delete_file, generate_initial_context, get_contexts, get_file, update_file,
};

pub struct ToolRegistry;

impl ToolRegistry {
    pub fn list_tools() -> Vec<ToolDefinition> {
        vec![
            get_contexts::definition(),
            get_file::definition(),
            add_file::definition(),
            generate_initial_context::definition(),
            update_file::definition(),
            delete_file::definition(),
        ]
    }

    /// Dispatch a tool call. Unknown names and malformed arguments are
    /// protocol errors; backend failures come back inside the result with
    /// `isError` set.
    pub async fn call(
        name: &str,
        arguments: Option<Value>,
        client: &ContextClient,
    ) -> AdapterResult<ToolCallResult> {
        let args = arguments.unwrap_or(Value::Object(serde_json::Map::new()));

        match name {
            "get_contexts" => get_contexts::execute(args, client).await,
            "get_file" => get_file::execute(args, client).await,
            "add_file" => add_file::execute(args, client).await,
            "generate_initial_context" => generate_initial_context::execute(args, client).await,
            "update_file" => update_file::execute(args, client).await,
            "delete_file" => delete_file::execute(args, client).await,
            _ => Err(AdapterError::ToolNotFound(name.to_string())),
        }
    }
}
