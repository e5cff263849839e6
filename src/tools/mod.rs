// Docker tools exposed over MCP
// Catalog, argument validation and dispatch onto the Docker client

pub mod args;
pub mod catalog;
pub mod dispatch;

pub use catalog::{tool_catalog, ToolName};
pub use dispatch::{DockerTools, ToolError};
