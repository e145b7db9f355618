//! Tool: generate_initial_context — Seed a project with its starter file.

use serde::Deserialize;
use serde_json::{json, Value};

use contexthub::{ContextClient, NewContextFile};

use crate::types::{AdapterError, AdapterResult, ToolCallResult, ToolDefinition};

use super::{add_file::outcome_result, tool_failure};

const DEFAULT_FILENAME: &str = "initial-context.md";
const DEFAULT_FILE_TYPE: &str = "markdown";

#[derive(Debug, Deserialize)]
struct GenerateInitialContextParams {
    content: String,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    file_type: Option<String>,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "generate_initial_context".to_string(),
        description: Some(
            "Write the project's starter context file. Safe to call from several \
             clients at once; only one file is created"
                .to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "content": { "type": "string", "description": "Starter document content" },
                "filename": {
                    "type": "string",
                    "description": "Defaults to \"initial-context.md\""
                },
                "file_type": {
                    "type": "string",
                    "description": "Defaults to \"markdown\""
                }
            },
            "required": ["content"]
        }),
    }
}

pub async fn execute(args: Value, client: &ContextClient) -> AdapterResult<ToolCallResult> {
    let params: GenerateInitialContextParams =
        serde_json::from_value(args).map_err(|e| AdapterError::InvalidParams(e.to_string()))?;

    let filename = params
        .filename
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string());
    if filename.trim().is_empty() {
        return Err(AdapterError::InvalidParams(
            "filename must not be empty".to_string(),
        ));
    }

    let file = NewContextFile {
        filename,
        content: params.content,
        file_type: Some(
            params
                .file_type
                .unwrap_or_else(|| DEFAULT_FILE_TYPE.to_string()),
        ),
    };

    match client.add_file(file).await {
        Ok(outcome) => Ok(outcome_result(&outcome)),
        Err(err) => Ok(tool_failure("generate_initial_context", err)),
    }
}
