//! MCP resource implementations.

pub mod project;
pub mod registry;

pub use registry::ResourceRegistry;
