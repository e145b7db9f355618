//! ContextHub — core client library for project context files: typed REST access,
//! transient-failure retry, and deduplicated creates.

pub mod client;
pub mod dedup;
pub mod error;
pub mod retry;
pub mod types;

pub use client::{ClientConfig, ContextClient, DEFAULT_TIMEOUT, PROJECT_HEADER};
pub use dedup::{Claim, WriteClaim, WriteKey, WriteLockMap};
pub use error::{HubError, HubResult};
pub use retry::{retry_with_backoff, BackoffPolicy};
pub use types::*;
