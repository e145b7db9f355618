//! Resource registration and dispatch.

use contexthub::ContextClient;
use uuid::Uuid;

use crate::types::{AdapterError, AdapterResult, ReadResourceResult, ResourceDefinition};

use super::project;

pub struct ResourceRegistry;

impl ResourceRegistry {
    pub fn list_resources(project_id: Uuid) -> Vec<ResourceDefinition> {
        vec![project::definition(project_id)]
    }

    /// Read a resource by URI. Only the backing project's listing is
    /// addressable; anything else is a bad URI. A backend failure here is a
    /// protocol error, unlike tool calls.
    pub async fn read(uri: &str, client: &ContextClient) -> AdapterResult<ReadResourceResult> {
        if uri == project::uri_for(client.project_id()) {
            return project::read_listing(uri, client).await;
        }
        Err(AdapterError::InvalidParams(format!(
            "unknown resource URI: {uri}"
        )))
    }
}
