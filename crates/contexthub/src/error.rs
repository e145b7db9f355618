//! Error taxonomy for backend calls.
//!
//! Non-2xx responses map onto a fixed set of variants; everything the backend
//! never answered (connect failures, timeouts) is kept separate so the retry
//! layer can tell the two classes apart.

use serde_json::Value;

/// Errors produced by the ContextHub client.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// HTTP 400. Carries the backend's own message when the body has one.
    #[error("Invalid request: {0}")]
    InvalidParams(String),

    /// HTTP 401.
    #[error("Unauthorized: the backend rejected the API token")]
    Unauthorized,

    /// HTTP 403.
    #[error("Forbidden: the token has no access to this project")]
    Forbidden,

    /// HTTP 404.
    #[error("Resource not found")]
    NotFound,

    /// HTTP 429. `retry_after` is taken from the body when the backend
    /// supplies one.
    #[error("Rate limited by the backend")]
    RateLimited { retry_after: Option<u64> },

    /// HTTP 500 and any status with no mapping of its own.
    #[error("Backend internal error (HTTP {status}): {body}")]
    Internal { status: u16, body: String },

    /// HTTP 502, 503, 504.
    #[error("Backend unavailable (HTTP {status})")]
    ServiceUnavailable { status: u16 },

    /// The per-call timeout fired before the backend answered.
    #[error("Backend request timed out")]
    Timeout,

    /// Transport-level failure with no HTTP response at all.
    #[error("Network error: {0}")]
    Network(reqwest::Error),

    #[error("Invalid backend URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Unexpected backend payload: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type HubResult<T> = Result<T, HubError>;

impl HubError {
    /// Map a non-2xx response to an error, inspecting the body for structured
    /// detail where the status calls for it.
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            400 => HubError::InvalidParams(
                body_message(body).unwrap_or_else(|| body.to_string()),
            ),
            401 => HubError::Unauthorized,
            403 => HubError::Forbidden,
            404 => HubError::NotFound,
            429 => HubError::RateLimited {
                retry_after: retry_after_from_body(body),
            },
            502 | 503 | 504 => HubError::ServiceUnavailable { status },
            // 500 and anything unmapped surface as internal errors keeping
            // the raw status and body.
            _ => HubError::Internal {
                status,
                body: body.to_string(),
            },
        }
    }

    /// Whether the retry combinator may run the request again.
    ///
    /// Only network-class failures qualify. Anything the backend actually
    /// answered, a 5xx included, is final as far as retry is concerned.
    pub fn is_transient(&self) -> bool {
        match self {
            HubError::Timeout => true,
            HubError::Network(err) => err.is_connect() || err.is_timeout(),
            _ => false,
        }
    }

    /// Backend-reported create conflict: HTTP 409, or any error whose text
    /// says the resource already exists.
    pub fn is_conflict(&self) -> bool {
        if let HubError::Internal { status: 409, .. } = self {
            return true;
        }
        self.to_string().to_ascii_lowercase().contains("already exists")
    }

    /// Structured diagnostic payload for protocol-level error envelopes.
    pub fn diagnostic_data(&self) -> Option<Value> {
        match self {
            HubError::RateLimited { retry_after } => retry_after
                .map(|seconds| serde_json::json!({ "retry_after": seconds })),
            HubError::Internal { status, body } => {
                Some(serde_json::json!({ "status": status, "body": body }))
            }
            HubError::ServiceUnavailable { status } => {
                Some(serde_json::json!({ "status": status }))
            }
            _ => None,
        }
    }
}

impl From<reqwest::Error> for HubError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            HubError::Timeout
        } else {
            HubError::Network(err)
        }
    }
}

/// Pull a human-readable message out of a JSON error body, if there is one.
fn body_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .or_else(|| value.get("error"))?
        .as_str()
        .map(str::to_string)
}

fn retry_after_from_body(body: &str) -> Option<u64> {
    let value: Value = serde_json::from_str(body).ok()?;
    value.get("retryAfter")?.as_u64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_has_fixed_message() {
        let err = HubError::from_status(404, "");
        assert!(matches!(err, HubError::NotFound));
        assert_eq!(err.to_string(), "Resource not found");
    }

    #[test]
    fn rate_limit_surfaces_retry_after() {
        let err = HubError::from_status(429, r#"{"retryAfter": 5}"#);
        match &err {
            HubError::RateLimited { retry_after } => assert_eq!(*retry_after, Some(5)),
            other => panic!("expected RateLimited, got {other:?}"),
        }
        let data = err.diagnostic_data().unwrap();
        assert_eq!(data["retry_after"], 5);
    }

    #[test]
    fn rate_limit_without_body_detail() {
        let err = HubError::from_status(429, "slow down");
        match err {
            HubError::RateLimited { retry_after } => assert_eq!(retry_after, None),
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[test]
    fn unmapped_status_becomes_internal_with_status_in_message() {
        let err = HubError::from_status(418, "short and stout");
        assert!(err.to_string().contains("418"));
        assert!(matches!(err, HubError::Internal { status: 418, .. }));
    }

    #[test]
    fn bad_gateway_family_is_service_unavailable() {
        for status in [502u16, 503, 504] {
            let err = HubError::from_status(status, "");
            assert!(
                matches!(err, HubError::ServiceUnavailable { status: s } if s == status),
                "status {status} mapped to {err:?}"
            );
        }
    }

    #[test]
    fn bad_request_prefers_body_message() {
        let err = HubError::from_status(400, r#"{"message": "filename is required"}"#);
        assert_eq!(err.to_string(), "Invalid request: filename is required");
    }

    #[test]
    fn http_errors_are_never_transient() {
        for status in [400u16, 401, 404, 429, 500, 503] {
            assert!(!HubError::from_status(status, "").is_transient());
        }
        assert!(HubError::Timeout.is_transient());
    }

    #[test]
    fn conflict_detection() {
        assert!(HubError::from_status(409, "duplicate").is_conflict());
        assert!(HubError::InvalidParams("File already exists".to_string()).is_conflict());
        assert!(!HubError::NotFound.is_conflict());
    }
}
