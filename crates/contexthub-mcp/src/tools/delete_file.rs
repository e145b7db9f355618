//! Tool: delete_file — Remove a context file.

use serde::Deserialize;
use serde_json::{json, Value};

use contexthub::ContextClient;

use crate::types::{AdapterError, AdapterResult, ToolCallResult, ToolDefinition};

use super::{parse_uuid, tool_failure};

#[derive(Debug, Deserialize)]
struct DeleteFileParams {
    file_id: String,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "delete_file".to_string(),
        description: Some("Delete a context file by id".to_string()),
        input_schema: json!({
            "type": "object",
            "properties": {
                "file_id": {
                    "type": "string",
                    "format": "uuid",
                    "description": "Id of the file to delete"
                }
            },
            "required": ["file_id"]
        }),
    }
}

pub async fn execute(args: Value, client: &ContextClient) -> AdapterResult<ToolCallResult> {
    let params: DeleteFileParams =
        serde_json::from_value(args).map_err(|e| AdapterError::InvalidParams(e.to_string()))?;

    let file_id = parse_uuid("file_id", &params.file_id)?;

    match client.delete_file(file_id).await {
        Ok(()) => Ok(ToolCallResult::json(&json!({
            "status": "deleted",
            "fileId": file_id,
        }))),
        Err(err) => Ok(tool_failure("delete_file", err)),
    }
}
