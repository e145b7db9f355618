//! Configuration loading and resolution.

use std::time::Duration;

use anyhow::{bail, Context};
use url::Url;
use uuid::Uuid;

use contexthub::ClientConfig;

pub const URL_ENV: &str = "CONTEXTHUB_URL";
pub const TOKEN_ENV: &str = "CONTEXTHUB_TOKEN";
pub const PROJECT_ENV: &str = "CONTEXTHUB_PROJECT";
pub const TIMEOUT_ENV: &str = "CONTEXTHUB_TIMEOUT_MS";

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Everything the adapter needs to reach its backend. Each setting resolves
/// flag first, then environment variable, then default; the token and
/// project have no default.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    pub backend_url: Url,
    pub api_token: String,
    pub project_id: Uuid,
    pub backend_timeout: Duration,
}

impl AdapterConfig {
    pub fn resolve(
        url_flag: Option<String>,
        token_flag: Option<String>,
        project_flag: Option<String>,
        timeout_ms_flag: Option<u64>,
    ) -> anyhow::Result<Self> {
        let raw_url = url_flag
            .or_else(|| std::env::var(URL_ENV).ok())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());
        let backend_url =
            Url::parse(&raw_url).with_context(|| format!("invalid backend URL \"{raw_url}\""))?;

        let Some(api_token) = token_flag.or_else(|| std::env::var(TOKEN_ENV).ok()) else {
            bail!("an API token is required: pass --token or set {TOKEN_ENV}");
        };

        let Some(raw_project) = project_flag.or_else(|| std::env::var(PROJECT_ENV).ok()) else {
            bail!("a project id is required: pass --project or set {PROJECT_ENV}");
        };
        let project_id = Uuid::parse_str(&raw_project)
            .with_context(|| format!("project id must be a UUID, got \"{raw_project}\""))?;

        let backend_timeout = match timeout_ms_flag {
            Some(ms) => Duration::from_millis(ms),
            None => match std::env::var(TIMEOUT_ENV) {
                Ok(raw) => {
                    let ms: u64 = raw.parse().with_context(|| {
                        format!("{TIMEOUT_ENV} must be milliseconds, got \"{raw}\"")
                    })?;
                    Duration::from_millis(ms)
                }
                Err(_) => contexthub::DEFAULT_TIMEOUT,
            },
        };

        Ok(Self {
            backend_url,
            api_token,
            project_id,
            backend_timeout,
        })
    }

    /// Backend client settings derived from the resolved configuration.
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(
            self.backend_url.clone(),
            self.api_token.clone(),
            self.project_id,
        );
        config.timeout = self.backend_timeout;
        config
    }
}
