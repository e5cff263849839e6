// Docker client wrapper using Bollard
// Owns the single connection handle shared by every tool call

use bollard::container::LogOutput;
use bollard::{Docker, API_DEFAULT_VERSION};
use futures::{Stream, StreamExt};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::config::DockerEndpoint;

#[derive(Error, Debug)]
pub enum DockerError {
    #[error("Failed to connect to Docker: {0}")]
    ConnectionFailed(String),
    #[error("Docker operation failed: {0}")]
    OperationFailed(String),
    #[error("Invalid build context: {0}")]
    InvalidBuildContext(String),
}

impl From<bollard::errors::Error> for DockerError {
    fn from(err: bollard::errors::Error) -> Self {
        match err {
            // Display for these variants drops the daemon's text
            bollard::errors::Error::DockerStreamError { error } => {
                DockerError::OperationFailed(error)
            }
            bollard::errors::Error::DockerContainerWaitError { error, code } => {
                DockerError::OperationFailed(format!("{} (exit code {})", error, code))
            }
            other => DockerError::OperationFailed(other.to_string()),
        }
    }
}

impl From<std::io::Error> for DockerError {
    fn from(err: std::io::Error) -> Self {
        DockerError::OperationFailed(err.to_string())
    }
}

/// Docker client wrapper providing high-level operations
///
/// Resource operations live next to their DTOs in `container`, `image`,
/// `network` and `volume`.
pub struct DockerClient {
    pub(super) docker: Docker,
}

impl DockerClient {
    /// Build a client for the given endpoint.
    ///
    /// bollard connects lazily, so this only fails on malformed addresses
    /// or unreadable TLS material. Use [`DockerClient::ping`] to check the daemon.
    pub fn connect(endpoint: &DockerEndpoint, timeout: Duration) -> Result<Self, DockerError> {
        let secs = timeout.as_secs();
        let docker = match endpoint {
            DockerEndpoint::Defaults => {
                Docker::connect_with_defaults().map(|docker| docker.with_timeout(timeout))
            }
            DockerEndpoint::Socket(path) => connect_socket(path, secs)?,
            DockerEndpoint::Tcp { host, port, tls: None } => Docker::connect_with_http(
                &format!("http://{}:{}", host, port),
                secs,
                API_DEFAULT_VERSION,
            ),
            DockerEndpoint::Tcp {
                host,
                port,
                tls: Some(cert_dir),
            } => Docker::connect_with_ssl(
                &format!("{}:{}", host, port),
                &cert_dir.join("key.pem"),
                &cert_dir.join("cert.pem"),
                &cert_dir.join("ca.pem"),
                secs,
                API_DEFAULT_VERSION,
            ),
        }
        .map_err(|e| DockerError::ConnectionFailed(e.to_string()))?;

        Ok(Self { docker })
    }

    /// Check that the daemon answers
    pub async fn ping(&self) -> Result<(), DockerError> {
        self.docker
            .ping()
            .await
            .map_err(|e| DockerError::ConnectionFailed(e.to_string()))?;
        Ok(())
    }

    /// Get Docker version information
    pub async fn version(&self) -> Result<String, DockerError> {
        let version = self.docker.version().await?;
        Ok(version.version.unwrap_or_else(|| "unknown".to_string()))
    }
}

#[cfg(unix)]
fn connect_socket(
    path: &std::path::Path,
    secs: u64,
) -> Result<Result<Docker, bollard::errors::Error>, DockerError> {
    Ok(Docker::connect_with_unix(
        &path.to_string_lossy(),
        secs,
        API_DEFAULT_VERSION,
    ))
}

#[cfg(not(unix))]
fn connect_socket(
    path: &std::path::Path,
    _secs: u64,
) -> Result<Result<Docker, bollard::errors::Error>, DockerError> {
    Err(DockerError::ConnectionFailed(format!(
        "unix sockets are not supported on this platform: {}",
        path.display()
    )))
}

/// Drain a progress stream (pull, push, build) into JSON values.
///
/// `to_value` shapes each item and may reject it. The first error, from the
/// stream or from `to_value`, aborts the drain.
pub(super) async fn collect_progress<S, T, F>(
    stream: S,
    mut to_value: F,
) -> Result<Vec<Value>, DockerError>
where
    S: Stream<Item = Result<T, bollard::errors::Error>>,
    F: FnMut(T) -> Result<Value, DockerError>,
{
    let mut stream = std::pin::pin!(stream);
    let mut details = Vec::new();
    while let Some(item) = stream.next().await {
        details.push(to_value(item?)?);
    }
    Ok(details)
}

/// Serialize a progress item as-is
pub(super) fn progress_value<T: Serialize>(info: T) -> Result<Value, DockerError> {
    serde_json::to_value(info).map_err(|e| DockerError::OperationFailed(e.to_string()))
}

/// Concatenate a log stream into a single string
pub(super) async fn collect_logs<S>(stream: S) -> Result<String, DockerError>
where
    S: Stream<Item = Result<LogOutput, bollard::errors::Error>>,
{
    let mut stream = std::pin::pin!(stream);
    let mut result = String::new();
    while let Some(log_result) = stream.next().await {
        match log_result {
            Ok(LogOutput::StdOut { message })
            | Ok(LogOutput::StdErr { message })
            | Ok(LogOutput::Console { message }) => {
                result.push_str(&String::from_utf8_lossy(&message));
            }
            Ok(LogOutput::StdIn { .. }) => {}
            Err(e) => {
                return Err(DockerError::OperationFailed(format!(
                    "Error reading container logs: {}",
                    e
                )));
            }
        }
    }
    Ok(result)
}
