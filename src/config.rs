// Server configuration
// Command-line flags with environment fallbacks, resolved into a Docker endpoint

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Default bollard request timeout, in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Wire protocol used when connecting to a TCP daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    /// Port the Docker daemon conventionally listens on for this protocol
    pub fn default_port(self) -> u16 {
        match self {
            Protocol::Http => 2375,
            Protocol::Https => 2376,
        }
    }
}

/// Docker MCP server - exposes Docker Engine operations as MCP tools on stdio.
#[derive(Parser, Debug, Clone)]
#[command(name = "docker-mcp-server", version, about)]
pub struct Cli {
    /// Path to the Docker daemon's unix socket. Takes precedence over --host.
    #[arg(long, env = "DOCKER_MCP_SOCKET")]
    pub socket: Option<PathBuf>,

    /// Remote Docker daemon host name or IP.
    #[arg(long, env = "DOCKER_MCP_HOST")]
    pub host: Option<String>,

    /// Remote Docker daemon port (defaults to 2375 for http, 2376 for https).
    #[arg(long, env = "DOCKER_MCP_PORT")]
    pub port: Option<u16>,

    /// Protocol for a remote daemon.
    #[arg(long, env = "DOCKER_MCP_PROTOCOL", value_enum, default_value_t = Protocol::Http)]
    pub protocol: Protocol,

    /// Directory holding key.pem, cert.pem and ca.pem for https.
    #[arg(long, env = "DOCKER_CERT_PATH")]
    pub cert_path: Option<PathBuf>,

    /// Docker request timeout in seconds.
    #[arg(long, env = "DOCKER_MCP_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, env = "DOCKER_MCP_LOG", default_value = "info")]
    pub log_level: String,
}

/// Where the Docker daemon lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DockerEndpoint {
    /// bollard's defaults: DOCKER_HOST if set, otherwise the local socket
    Defaults,
    /// Explicit unix socket
    Socket(PathBuf),
    /// TCP daemon, optionally over TLS with certificates from `tls`
    Tcp {
        host: String,
        port: u16,
        tls: Option<PathBuf>,
    },
}

/// Errors raised while turning flags into a usable configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("https requires --cert-path (or DOCKER_CERT_PATH)")]
    MissingCertPath,
    #[error("timeout must be greater than zero")]
    ZeroTimeout,
}

/// Resolved server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub endpoint: DockerEndpoint,
    pub timeout: Duration,
}

impl ServerConfig {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        if cli.timeout == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        let endpoint = match (cli.socket, cli.host) {
            (Some(socket), host) => {
                if let Some(host) = host {
                    tracing::warn!(
                        socket = %socket.display(),
                        host = %host,
                        "Both socket and host given; using the socket"
                    );
                }
                DockerEndpoint::Socket(socket)
            }
            (None, Some(host)) => {
                let tls = match cli.protocol {
                    Protocol::Http => None,
                    Protocol::Https => Some(cli.cert_path.ok_or(ConfigError::MissingCertPath)?),
                };
                DockerEndpoint::Tcp {
                    host,
                    port: cli.port.unwrap_or_else(|| cli.protocol.default_port()),
                    tls,
                }
            }
            (None, None) => DockerEndpoint::Defaults,
        };

        Ok(Self {
            endpoint,
            timeout: Duration::from_secs(cli.timeout),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(args: &[&str]) -> Result<ServerConfig, ConfigError> {
        let mut argv = vec!["docker-mcp-server"];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).unwrap();
        ServerConfig::from_cli(cli)
    }

    #[test]
    fn test_defaults_when_nothing_given() {
        let config = resolve(&[]).unwrap();
        assert_eq!(config.endpoint, DockerEndpoint::Defaults);
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_socket_endpoint() {
        let config = resolve(&["--socket", "/run/user/1000/docker.sock"]).unwrap();
        assert_eq!(
            config.endpoint,
            DockerEndpoint::Socket(PathBuf::from("/run/user/1000/docker.sock"))
        );
    }

    #[test]
    fn test_socket_wins_over_host() {
        let config = resolve(&["--socket", "/var/run/docker.sock", "--host", "10.0.0.5"]).unwrap();
        assert_eq!(
            config.endpoint,
            DockerEndpoint::Socket(PathBuf::from("/var/run/docker.sock"))
        );
    }

    #[test]
    fn test_http_host_uses_default_port() {
        let config = resolve(&["--host", "10.0.0.5"]).unwrap();
        assert_eq!(
            config.endpoint,
            DockerEndpoint::Tcp {
                host: "10.0.0.5".to_string(),
                port: 2375,
                tls: None,
            }
        );
    }

    #[test]
    fn test_https_requires_cert_path() {
        let result = resolve(&["--host", "docker.internal", "--protocol", "https"]);
        assert!(matches!(result, Err(ConfigError::MissingCertPath)));

        let config = resolve(&[
            "--host",
            "docker.internal",
            "--protocol",
            "https",
            "--cert-path",
            "/etc/docker/certs",
            "--port",
            "3376",
        ])
        .unwrap();
        assert_eq!(
            config.endpoint,
            DockerEndpoint::Tcp {
                host: "docker.internal".to_string(),
                port: 3376,
                tls: Some(PathBuf::from("/etc/docker/certs")),
            }
        );
    }

    #[test]
    fn test_zero_timeout_rejected() {
        assert!(matches!(resolve(&["--timeout", "0"]), Err(ConfigError::ZeroTimeout)));
    }
}
