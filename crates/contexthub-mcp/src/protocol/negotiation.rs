//! Protocol version negotiation.

use tracing::warn;

use crate::types::{DEFAULT_PROTOCOL_VERSION, SUPPORTED_PROTOCOL_VERSIONS};

/// Pick the version to answer an `initialize` with: the client's version
/// when we support it, our preferred default otherwise. The session always
/// proceeds; an unknown version is logged, not rejected.
pub fn negotiate_version(requested: &str) -> &'static str {
    match SUPPORTED_PROTOCOL_VERSIONS
        .iter()
        .find(|version| **version == requested)
    {
        Some(version) => version,
        None => {
            warn!(
                requested,
                fallback = DEFAULT_PROTOCOL_VERSION,
                "client requested an unsupported protocol version"
            );
            DEFAULT_PROTOCOL_VERSION
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echoes_any_supported_version() {
        for version in SUPPORTED_PROTOCOL_VERSIONS {
            assert_eq!(negotiate_version(version), *version);
        }
    }

    #[test]
    fn falls_back_on_unknown_version() {
        assert_eq!(negotiate_version("1999-12-31"), DEFAULT_PROTOCOL_VERSION);
        assert_eq!(negotiate_version(""), DEFAULT_PROTOCOL_VERSION);
    }
}
