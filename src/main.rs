use clap::Parser;
use std::process::ExitCode;
use tracing::error;

use docker_mcp_server::config::{Cli, ServerConfig};
use docker_mcp_server::ServeError;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // stdout belongs to the protocol; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(&cli.log_level))
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    match serve(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "docker-mcp-server exited with an error");
            ExitCode::FAILURE
        }
    }
}

async fn serve(cli: Cli) -> Result<(), ServeError> {
    let config = ServerConfig::from_cli(cli)?;
    docker_mcp_server::run(config).await
}
