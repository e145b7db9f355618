//! Tool: get_contexts — List a project's context files.

use serde::Deserialize;
use serde_json::{json, Value};

use contexthub::ContextClient;

use crate::types::{AdapterError, AdapterResult, ToolCallResult, ToolDefinition};

use super::{parse_uuid, tool_failure};

#[derive(Debug, Deserialize)]
struct GetContextsParams {
    #[serde(default)]
    project_id: Option<String>,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "get_contexts".to_string(),
        description: Some(
            "List all context files in a project, with names, types and timestamps".to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "project_id": {
                    "type": "string",
                    "format": "uuid",
                    "description": "Project to list; defaults to the configured project"
                }
            }
        }),
    }
}

pub async fn execute(args: Value, client: &ContextClient) -> AdapterResult<ToolCallResult> {
    let params: GetContextsParams =
        serde_json::from_value(args).map_err(|e| AdapterError::InvalidParams(e.to_string()))?;

    let project_id = match params.project_id {
        Some(raw) => parse_uuid("project_id", &raw)?,
        None => client.project_id(),
    };

    match client.get_context(project_id).await {
        Ok(context) => Ok(ToolCallResult::json(&context)),
        Err(err) => Ok(tool_failure("get_contexts", err)),
    }
}
