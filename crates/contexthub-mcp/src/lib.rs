//! ContextHub MCP adapter — project context files exposed to MCP hosts.

pub mod config;
pub mod protocol;
pub mod repl;
pub mod resources;
pub mod tools;
pub mod transport;
pub mod types;

pub use config::AdapterConfig;
pub use protocol::ProtocolHandler;
pub use transport::StdioTransport;
