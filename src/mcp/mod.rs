//! Model Context Protocol over JSON-RPC 2.0.
//!
//! - **types**: JSON-RPC 2.0 and MCP wire types
//! - **transport**: line-delimited transport over any reader/writer, bound to stdio
//! - **server**: request loop dispatching `tools/*` to a [`ToolProvider`]
//! - **error**: protocol-level errors

pub mod error;
pub mod server;
pub mod transport;
pub mod types;

pub use error::McpError;
pub use server::{McpServer, ToolProvider};
pub use transport::{LineTransport, McpTransport, StdioTransport};
pub use types::*;
