//! HTTP gateway to the ContextHub REST API.
//!
//! Every call is scoped to one project and authenticated with a bearer token.
//! Read operations retry transient network failures; writes never do, the
//! dedup layer in [`crate::dedup`] is what guards creates instead.

use std::time::Duration;

use reqwest::{Client, Method, Response};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::dedup::WriteLockMap;
use crate::error::{HubError, HubResult};
use crate::retry::{retry_with_backoff, BackoffPolicy};
use crate::types::{
    ContextFile, ContextFileUpdate, CreateOutcome, NewContextFile, ProjectContext,
};

/// Header carrying the project scope on every request.
pub const PROJECT_HEADER: &str = "X-Project-Id";

/// Default per-call timeout. Aborts the network operation, not just the wait.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for [`ContextClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the ContextHub API, e.g. `http://localhost:8000`.
    pub base_url: Url,
    /// Bearer token sent on every call.
    pub api_token: String,
    /// Project all calls are scoped to by default.
    pub project_id: Uuid,
    /// Per-call timeout.
    pub timeout: Duration,
    /// Backoff schedule for transient-failure retries on reads.
    pub backoff: BackoffPolicy,
}

impl ClientConfig {
    pub fn new(base_url: Url, api_token: impl Into<String>, project_id: Uuid) -> Self {
        Self {
            base_url,
            api_token: api_token.into(),
            project_id,
            timeout: DEFAULT_TIMEOUT,
            backoff: BackoffPolicy::default(),
        }
    }
}

/// Authenticated client for one ContextHub project.
#[derive(Debug)]
pub struct ContextClient {
    http: Client,
    base: String,
    config: ClientConfig,
    locks: WriteLockMap,
}

impl ContextClient {
    /// Build a client. Fails only when the underlying HTTP client cannot be
    /// constructed.
    pub fn new(config: ClientConfig) -> HubResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(HubError::Network)?;
        let base = config.base_url.as_str().trim_end_matches('/').to_string();
        Ok(Self {
            http,
            base,
            config,
            locks: WriteLockMap::new(),
        })
    }

    /// The project this client is scoped to.
    pub fn project_id(&self) -> Uuid {
        self.config.project_id
    }

    pub async fn get(&self, path: &str) -> HubResult<Value> {
        self.send(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> HubResult<Value> {
        self.send(Method::POST, path, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> HubResult<Value> {
        self.send(Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> HubResult<Value> {
        self.send(Method::DELETE, path, None).await
    }

    /// Issue one authenticated request, mapping non-2xx statuses onto
    /// [`HubError`] and decoding the body opportunistically.
    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> HubResult<Value> {
        let url = format!("{}{}", self.base, path);
        debug!(%method, %url, "backend request");
        let mut request = self
            .http
            .request(method, &url)
            .bearer_auth(&self.config.api_token)
            .header(PROJECT_HEADER, self.config.project_id.to_string());
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        Self::decode(response).await
    }

    async fn decode(response: Response) -> HubResult<Value> {
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "backend returned error status");
            return Err(HubError::from_status(status.as_u16(), &text));
        }
        if text.is_empty() {
            return Ok(Value::Null);
        }
        // Bodies are JSON in practice; anything else passes through as text.
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }

    /// Fetch a project's full context listing. Retries transient network
    /// failures.
    pub async fn get_context(&self, project_id: Uuid) -> HubResult<ProjectContext> {
        let path = format!("/contexts/{project_id}");
        let value = retry_with_backoff(&self.config.backoff, HubError::is_transient, || {
            self.get(&path)
        })
        .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Listing for the configured project.
    pub async fn list_context(&self) -> HubResult<ProjectContext> {
        self.get_context(self.config.project_id).await
    }

    /// Fetch a single file by id. Retries transient network failures.
    pub async fn get_file(&self, file_id: Uuid) -> HubResult<ContextFile> {
        let path = format!("/contexts/{}/files/{file_id}", self.config.project_id);
        let value = retry_with_backoff(&self.config.backoff, HubError::is_transient, || {
            self.get(&path)
        })
        .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Create a context file in the configured project, deduplicating
    /// concurrent creates of the same filename.
    ///
    /// Racing callers collapse onto one backend POST: losers wait for the
    /// winner and observe the created file through a fresh listing. A conflict
    /// reported by the backend itself (an external writer got there first) is
    /// treated as success and resolved to the existing file.
    pub async fn add_file(&self, file: NewContextFile) -> HubResult<CreateOutcome> {
        let project_id = self.config.project_id;
        let key = (project_id, file.filename.clone());
        self.locks
            .create_once(
                key,
                || self.find_existing(project_id, &file.filename),
                || self.create_file(project_id, &file),
            )
            .await
    }

    /// Replace a file's name and content.
    pub async fn update_file(
        &self,
        file_id: Uuid,
        update: &ContextFileUpdate,
    ) -> HubResult<ContextFile> {
        let body = serde_json::to_value(update)?;
        let value = self.put(&format!("/files/{file_id}"), &body).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Delete a file.
    pub async fn delete_file(&self, file_id: Uuid) -> HubResult<()> {
        self.delete(&format!("/files/{file_id}")).await?;
        Ok(())
    }

    async fn find_existing(
        &self,
        project_id: Uuid,
        filename: &str,
    ) -> HubResult<Option<CreateOutcome>> {
        let context = self.get_context(project_id).await?;
        Ok(context
            .find_file(filename)
            .cloned()
            .map(CreateOutcome::AlreadyExists))
    }

    async fn create_file(
        &self,
        project_id: Uuid,
        file: &NewContextFile,
    ) -> HubResult<CreateOutcome> {
        // Last-instant re-check: an external writer may have created the file
        // since this process last looked.
        if let Some(existing) = self.find_existing(project_id, &file.filename).await? {
            return Ok(existing);
        }
        let body = serde_json::to_value(file)?;
        let path = format!("/contexts/{project_id}/files");
        match self.post(&path, &body).await {
            Ok(value) => Ok(CreateOutcome::Created(serde_json::from_value(value)?)),
            Err(err) if err.is_conflict() => {
                debug!(filename = %file.filename, "create conflict, resolving to the existing file");
                match self.find_existing(project_id, &file.filename).await? {
                    Some(existing) => Ok(existing),
                    // A conflict with no visible file: surface the original error.
                    None => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }
}
