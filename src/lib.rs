// Docker MCP server
// Exposes Docker Engine operations as Model Context Protocol tools over stdio

pub mod config;
pub mod docker;
pub mod mcp;
pub mod models;
pub mod tools;

use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use config::{ConfigError, ServerConfig};
use docker::{DockerClient, DockerError};
use mcp::{McpError, McpServer, StdioTransport};
use tools::DockerTools;

/// Name reported to clients in `initialize`
pub const SERVER_NAME: &str = "docker-mcp-server";

/// Failures that end the process
#[derive(Error, Debug)]
pub enum ServeError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Docker(#[from] DockerError),
    #[error(transparent)]
    Mcp(#[from] McpError),
}

/// Connect to Docker, check the daemon answers, then serve MCP on stdin/stdout
/// until stdin closes.
pub async fn run(config: ServerConfig) -> Result<(), ServeError> {
    let client = DockerClient::connect(&config.endpoint, config.timeout)?;
    client.ping().await?;
    let version = client.version().await?;
    info!(
        docker_version = %version,
        endpoint = ?config.endpoint,
        "Connected to Docker daemon"
    );

    let mut server = McpServer::new(DockerTools::new(Arc::new(client))).with_name(SERVER_NAME);
    let mut transport = StdioTransport::stdio();
    info!("Serving MCP on stdio");
    server.run(&mut transport).await?;
    info!("stdin closed, shutting down");
    Ok(())
}
