//! Tool: get_file — Fetch one context file with its content.

use serde::Deserialize;
use serde_json::{json, Value};

use contexthub::ContextClient;

use crate::types::{AdapterError, AdapterResult, ToolCallResult, ToolDefinition};

use super::{parse_uuid, tool_failure};

#[derive(Debug, Deserialize)]
struct GetFileParams {
    file_id: String,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "get_file".to_string(),
        description: Some("Fetch a single context file by id, including its content".to_string()),
        input_schema: json!({
            "type": "object",
            "properties": {
                "file_id": {
                    "type": "string",
                    "format": "uuid",
                    "description": "Id of the file to fetch"
                }
            },
            "required": ["file_id"]
        }),
    }
}

pub async fn execute(args: Value, client: &ContextClient) -> AdapterResult<ToolCallResult> {
    let params: GetFileParams =
        serde_json::from_value(args).map_err(|e| AdapterError::InvalidParams(e.to_string()))?;

    let file_id = parse_uuid("file_id", &params.file_id)?;

    match client.get_file(file_id).await {
        Ok(file) => Ok(ToolCallResult::json(&file)),
        Err(err) => Ok(tool_failure("get_file", err)),
    }
}
