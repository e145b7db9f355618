//! Core data types for ContextHub projects and their context files.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single context file stored in a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextFile {
    pub id: Uuid,
    pub filename: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A project's context listing as returned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectContext {
    pub project_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub files: Vec<ContextFile>,
}

impl ProjectContext {
    /// Look up a file by its exact filename.
    pub fn find_file(&self, filename: &str) -> Option<&ContextFile> {
        self.files.iter().find(|f| f.filename == filename)
    }
}

/// Payload for creating a new context file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContextFile {
    pub filename: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
}

/// Payload for replacing a file's name and content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextFileUpdate {
    pub filename: String,
    pub content: String,
}

/// Result of a deduplicated create: either this call created the file, or an
/// equivalent file was already there.
#[derive(Debug, Clone)]
pub enum CreateOutcome {
    Created(ContextFile),
    AlreadyExists(ContextFile),
}

impl CreateOutcome {
    /// The file, whichever way it came to exist.
    pub fn file(&self) -> &ContextFile {
        match self {
            CreateOutcome::Created(file) | CreateOutcome::AlreadyExists(file) => file,
        }
    }

    /// True when the file predated this call.
    pub fn already_existed(&self) -> bool {
        matches!(self, CreateOutcome::AlreadyExists(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_file_deserializes_camel_case() {
        let raw = serde_json::json!({
            "id": "7f2c1b4e-9a3d-4f6b-8c2e-1d5a7b9c3e0f",
            "filename": "notes.md",
            "content": "# Notes",
            "fileType": "markdown",
            "createdAt": "2025-06-01T12:00:00Z"
        });
        let file: ContextFile = serde_json::from_value(raw).unwrap();
        assert_eq!(file.filename, "notes.md");
        assert_eq!(file.file_type.as_deref(), Some("markdown"));
        assert!(file.created_at.is_some());
        assert!(file.updated_at.is_none());
    }

    #[test]
    fn project_context_tolerates_missing_files() {
        let raw = serde_json::json!({
            "projectId": "7f2c1b4e-9a3d-4f6b-8c2e-1d5a7b9c3e0f"
        });
        let context: ProjectContext = serde_json::from_value(raw).unwrap();
        assert!(context.files.is_empty());
        assert!(context.find_file("anything.md").is_none());
    }

    #[test]
    fn new_file_omits_absent_file_type() {
        let file = NewContextFile {
            filename: "a.md".to_string(),
            content: "x".to_string(),
            file_type: None,
        };
        let value = serde_json::to_value(&file).unwrap();
        assert!(value.get("fileType").is_none());
    }
}
