//! Tool: update_file — Replace a context file's name and content.

use serde::Deserialize;
use serde_json::{json, Value};

use contexthub::{ContextClient, ContextFileUpdate};

use crate::types::{AdapterError, AdapterResult, ToolCallResult, ToolDefinition};

use super::{parse_uuid, tool_failure};

#[derive(Debug, Deserialize)]
struct UpdateFileParams {
    file_id: String,
    filename: String,
    content: String,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "update_file".to_string(),
        description: Some("Replace an existing context file's name and content".to_string()),
        input_schema: json!({
            "type": "object",
            "properties": {
                "file_id": {
                    "type": "string",
                    "format": "uuid",
                    "description": "Id of the file to update"
                },
                "filename": { "type": "string", "description": "New file name" },
                "content": { "type": "string", "description": "New full content" }
            },
            "required": ["file_id", "filename", "content"]
        }),
    }
}

pub async fn execute(args: Value, client: &ContextClient) -> AdapterResult<ToolCallResult> {
    let params: UpdateFileParams =
        serde_json::from_value(args).map_err(|e| AdapterError::InvalidParams(e.to_string()))?;

    let file_id = parse_uuid("file_id", &params.file_id)?;
    if params.filename.trim().is_empty() {
        return Err(AdapterError::InvalidParams(
            "filename must not be empty".to_string(),
        ));
    }

    let update = ContextFileUpdate {
        filename: params.filename,
        content: params.content,
    };

    match client.update_file(file_id, &update).await {
        Ok(file) => Ok(ToolCallResult::json(&json!({
            "status": "updated",
            "file": file,
        }))),
        Err(err) => Ok(tool_failure("update_file", err)),
    }
}
