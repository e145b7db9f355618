//! Tool: add_file — Create a context file in the configured project.

use serde::Deserialize;
use serde_json::{json, Value};

use contexthub::{ContextClient, CreateOutcome, NewContextFile};

use crate::types::{AdapterError, AdapterResult, ToolCallResult, ToolDefinition};

use super::tool_failure;

#[derive(Debug, Deserialize)]
struct AddFileParams {
    filename: String,
    content: String,
    #[serde(default)]
    file_type: Option<String>,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "add_file".to_string(),
        description: Some(
            "Add a context file to the project. Concurrent adds of the same filename \
             collapse into a single create"
                .to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "filename": { "type": "string", "description": "Name of the file to create" },
                "content": { "type": "string", "description": "Full file content" },
                "file_type": {
                    "type": "string",
                    "description": "Optional type hint, e.g. \"markdown\""
                }
            },
            "required": ["filename", "content"]
        }),
    }
}

pub async fn execute(args: Value, client: &ContextClient) -> AdapterResult<ToolCallResult> {
    let params: AddFileParams =
        serde_json::from_value(args).map_err(|e| AdapterError::InvalidParams(e.to_string()))?;

    if params.filename.trim().is_empty() {
        return Err(AdapterError::InvalidParams(
            "filename must not be empty".to_string(),
        ));
    }

    let file = NewContextFile {
        filename: params.filename,
        content: params.content,
        file_type: params.file_type,
    };

    match client.add_file(file).await {
        Ok(outcome) => Ok(outcome_result(&outcome)),
        Err(err) => Ok(tool_failure("add_file", err)),
    }
}

/// Both create outcomes are successes; the status string tells the caller
/// which one happened.
pub(crate) fn outcome_result(outcome: &CreateOutcome) -> ToolCallResult {
    let status = match outcome {
        CreateOutcome::Created(_) => "added",
        CreateOutcome::AlreadyExists(_) => "already exists",
    };
    ToolCallResult::json(&json!({
        "status": status,
        "file": outcome.file(),
    }))
}
