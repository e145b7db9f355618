//! Resource: contexthub://projects/{project_id}/files

use contexthub::ContextClient;
use uuid::Uuid;

use crate::types::{AdapterResult, ReadResourceResult, ResourceContent, ResourceDefinition};

pub fn uri_for(project_id: Uuid) -> String {
    format!("contexthub://projects/{project_id}/files")
}

pub fn definition(project_id: Uuid) -> ResourceDefinition {
    ResourceDefinition {
        uri: uri_for(project_id),
        name: "Project context files".to_string(),
        description: Some("All context files in the backing project, as JSON".to_string()),
        mime_type: Some("application/json".to_string()),
    }
}

pub async fn read_listing(uri: &str, client: &ContextClient) -> AdapterResult<ReadResourceResult> {
    let context = client.list_context().await?;

    Ok(ReadResourceResult {
        contents: vec![ResourceContent {
            uri: uri.to_string(),
            mime_type: Some("application/json".to_string()),
            text: Some(serde_json::to_string_pretty(&context).unwrap_or_default()),
        }],
    })
}
