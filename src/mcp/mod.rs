//! Model Context Protocol (MCP) server for Jira.
//!
//! JSON-RPC 2.0 message types, the transports they travel over, and the server
//! loop that dispatches `tools/call` requests into the tool registry.

pub mod errors;
pub mod protocol;
pub mod server;
pub mod tools;
pub mod transport;

pub use self::{server::MCPServer, tools::MCPTool, transport::MCPTransport};

/// MCP Protocol version implemented by this server
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Server information
pub const SERVER_NAME: &str = "Jira MCP";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
