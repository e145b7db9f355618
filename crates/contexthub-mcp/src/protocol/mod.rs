//! MCP protocol layer: request dispatch, session lifecycle, and version
//! negotiation.

pub mod handler;
pub mod lifecycle;
pub mod negotiation;
pub mod validator;

pub use handler::{ProtocolHandler, INIT_FALLBACK_WINDOW};
pub use lifecycle::{SessionLifecycle, SessionState};
pub use negotiation::negotiate_version;
pub use validator::validate_request;
