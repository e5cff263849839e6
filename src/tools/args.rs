// Tool arguments
// Typed views of the `arguments` object of each tool, plus normalization
// into the request types the Docker layer takes

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use crate::docker::{BuildRequest, ContainerSpec, LogRequest, PortMapping, Restart, VolumeMount};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("unterminated {0} quote in command")]
    UnterminatedQuote(char),
    #[error("invalid restart policy '{0}' (expected no, always, unless-stopped or on-failure[:N])")]
    InvalidRestart(String),
    #[error("invalid port mapping '{key}': {reason}")]
    InvalidPort { key: String, reason: String },
}

/// Deserialize a tool's arguments; a missing or null object counts as `{}`
pub fn parse_arguments<T: DeserializeOwned>(arguments: Value) -> Result<T, serde_json::Error> {
    let arguments = match arguments {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    serde_json::from_value(arguments)
}

/// A filter value as clients send it
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    One(String),
    Many(Vec<String>),
}

/// Convert client filters into the Engine API's `map<string, [string]>`
pub fn normalize_filters(filters: HashMap<String, FilterValue>) -> HashMap<String, Vec<String>> {
    filters
        .into_iter()
        .map(|(key, value)| {
            let values = match value {
                FilterValue::One(v) => vec![v],
                FilterValue::Many(vs) => vs,
            };
            (key, values)
        })
        .collect()
}

/// `command` is either an argv array or a shell-like string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CommandArg {
    Argv(Vec<String>),
    Line(String),
}

impl CommandArg {
    pub fn into_argv(self) -> Result<Vec<String>, ArgumentError> {
        match self {
            CommandArg::Argv(argv) => Ok(argv),
            CommandArg::Line(line) => split_command(&line),
        }
    }
}

/// Split a command line into argv tokens.
///
/// Whitespace separates tokens. Single quotes keep everything literal,
/// double quotes allow `\"` and `\\` escapes, and outside quotes a
/// backslash escapes the next character. No expansion of any kind.
pub fn split_command(line: &str) -> Result<Vec<String>, ArgumentError> {
    let mut argv = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match quote {
            Some('\'') => {
                if c == '\'' {
                    quote = None;
                } else {
                    current.push(c);
                }
            }
            Some(q) => match c {
                '"' => quote = None,
                '\\' => match chars.next() {
                    Some(next @ ('"' | '\\')) => current.push(next),
                    Some(next) => {
                        current.push('\\');
                        current.push(next);
                    }
                    None => return Err(ArgumentError::UnterminatedQuote(q)),
                },
                _ => current.push(c),
            },
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    in_token = true;
                }
                '\\' => {
                    in_token = true;
                    // A trailing backslash stays literal
                    current.push(chars.next().unwrap_or('\\'));
                }
                c if c.is_whitespace() => {
                    if in_token {
                        argv.push(std::mem::take(&mut current));
                        in_token = false;
                    }
                }
                _ => {
                    current.push(c);
                    in_token = true;
                }
            },
        }
    }

    if let Some(q) = quote {
        return Err(ArgumentError::UnterminatedQuote(q));
    }
    if in_token {
        argv.push(current);
    }
    Ok(argv)
}

/// Parse `no`, `always`, `unless-stopped` or `on-failure[:N]`
pub fn parse_restart(policy: &str) -> Result<Restart, ArgumentError> {
    let invalid = || ArgumentError::InvalidRestart(policy.to_string());
    match policy.trim() {
        "no" => Ok(Restart::No),
        "always" => Ok(Restart::Always),
        "unless-stopped" => Ok(Restart::UnlessStopped),
        "on-failure" => Ok(Restart::OnFailure { max_retries: None }),
        other => {
            let retries = other.strip_prefix("on-failure:").ok_or_else(invalid)?;
            let max_retries = retries.parse::<i64>().map_err(|_| invalid())?;
            if max_retries < 0 {
                return Err(invalid());
            }
            Ok(Restart::OnFailure {
                max_retries: Some(max_retries),
            })
        }
    }
}

/// Parse one `ports` entry: `"80"` or `"53/udp"` mapped to `"8080"` or `"127.0.0.1:8080"`
pub fn parse_port(container_port: &str, host: &str) -> Result<PortMapping, ArgumentError> {
    let invalid = |reason: &str| ArgumentError::InvalidPort {
        key: container_port.to_string(),
        reason: reason.to_string(),
    };

    let (port, proto) = match container_port.split_once('/') {
        Some((port, proto)) => (port, proto),
        None => (container_port, "tcp"),
    };
    if port.is_empty() || !port.chars().all(|c| c.is_ascii_digit() || c == '-') {
        return Err(invalid("container port must be a number or range"));
    }
    if !matches!(proto, "tcp" | "udp" | "sctp") {
        return Err(invalid("protocol must be tcp, udp or sctp"));
    }

    let (host_ip, host_port) = match host.rsplit_once(':') {
        Some((ip, port)) => {
            let ip = ip.trim_start_matches('[').trim_end_matches(']');
            (Some(ip.to_string()).filter(|ip| !ip.is_empty()), port)
        }
        None => (None, host),
    };
    if !host_port.chars().all(|c| c.is_ascii_digit() || c == '-') {
        return Err(invalid("host port must be a number or range"));
    }

    Ok(PortMapping {
        container_port: format!("{}/{}", port, proto),
        host_ip,
        host_port: host_port.to_string(),
    })
}

/// `all` and `filters`, shared by the list tools
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListArgs {
    #[serde(default)]
    pub all: bool,
    #[serde(default)]
    pub filters: HashMap<String, FilterValue>,
}

impl ListArgs {
    pub fn filters(self) -> HashMap<String, Vec<String>> {
        normalize_filters(self.filters)
    }
}

/// Arguments of `create_container`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerArgs {
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub env: Option<Vec<String>>,
    #[serde(default)]
    pub ports: BTreeMap<String, String>,
    #[serde(default)]
    pub volumes: Vec<String>,
    #[serde(default)]
    pub command: Option<CommandArg>,
    #[serde(default)]
    pub working_dir: Option<String>,
    #[serde(default)]
    pub restart: Option<String>,
}

impl ContainerArgs {
    pub fn into_spec(self) -> Result<ContainerSpec, ArgumentError> {
        let cmd = match self.command {
            Some(command) => Some(command.into_argv()?).filter(|argv| !argv.is_empty()),
            None => None,
        };
        let ports = self
            .ports
            .iter()
            .map(|(container, host)| parse_port(container, host))
            .collect::<Result<Vec<_>, _>>()?;
        let restart = self.restart.as_deref().map(parse_restart).transpose()?;

        Ok(ContainerSpec {
            name: self.name,
            image: self.image,
            env: self.env,
            cmd,
            working_dir: self.working_dir,
            ports,
            volumes: self.volumes.iter().map(|v| VolumeMount::parse(v)).collect(),
            restart,
            auto_remove: false,
        })
    }
}

/// Arguments of `run_container`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunArgs {
    #[serde(flatten)]
    pub container: ContainerArgs,
    #[serde(default = "default_detach")]
    pub detach: bool,
    #[serde(default)]
    pub auto_remove: bool,
}

fn default_detach() -> bool {
    true
}

impl RunArgs {
    /// The container spec and whether to return without waiting
    pub fn into_spec(self) -> Result<(ContainerSpec, bool), ArgumentError> {
        let mut spec = self.container.into_spec()?;
        spec.auto_remove = self.auto_remove;
        Ok((spec, self.detach))
    }
}

/// A single container, image or network id
#[derive(Debug, Clone, Deserialize)]
pub struct IdArgs {
    pub id: String,
}

/// Arguments of `fetch_container_logs`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsArgs {
    pub id: String,
    #[serde(default = "default_tail")]
    pub tail: u64,
    /// Accepted but never honoured; logs are a snapshot
    #[serde(default)]
    pub follow: bool,
    #[serde(default)]
    pub timestamps: bool,
}

fn default_tail() -> u64 {
    100
}

impl LogsArgs {
    pub fn request(&self) -> LogRequest {
        LogRequest {
            tail: self.tail,
            timestamps: self.timestamps,
        }
    }
}

/// `image` and `tag`, for pull and push
#[derive(Debug, Clone, Deserialize)]
pub struct ImageRefArgs {
    pub image: String,
    #[serde(default = "default_tag")]
    pub tag: String,
}

fn default_tag() -> String {
    "latest".to_string()
}

/// Arguments of `build_image`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildArgs {
    pub tag: String,
    #[serde(default = "default_dockerfile")]
    pub dockerfile: String,
    #[serde(default = "default_context")]
    pub context: String,
    #[serde(default)]
    pub build_args: HashMap<String, String>,
}

fn default_dockerfile() -> String {
    "Dockerfile".to_string()
}

fn default_context() -> String {
    ".".to_string()
}

impl From<BuildArgs> for BuildRequest {
    fn from(args: BuildArgs) -> Self {
        BuildRequest {
            context: args.context,
            dockerfile: args.dockerfile,
            tag: args.tag,
            build_args: args.build_args,
        }
    }
}

/// Arguments of `remove_image`
#[derive(Debug, Clone, Deserialize)]
pub struct RemoveImageArgs {
    pub id: String,
    #[serde(default)]
    pub force: bool,
}

/// Arguments of `create_network`
#[derive(Debug, Clone, Deserialize)]
pub struct CreateNetworkArgs {
    pub name: String,
    #[serde(default = "default_network_driver")]
    pub driver: String,
    #[serde(default)]
    pub options: HashMap<String, String>,
}

fn default_network_driver() -> String {
    "bridge".to_string()
}

/// Arguments of `create_volume`
#[derive(Debug, Clone, Deserialize)]
pub struct CreateVolumeArgs {
    pub name: String,
    #[serde(default = "default_volume_driver")]
    pub driver: String,
    #[serde(default)]
    pub options: HashMap<String, String>,
}

fn default_volume_driver() -> String {
    "local".to_string()
}

/// Arguments of `remove_volume`
#[derive(Debug, Clone, Deserialize)]
pub struct RemoveVolumeArgs {
    pub name: String,
    #[serde(default)]
    pub force: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_split_command_plain_words() {
        assert_eq!(
            split_command("  echo   hello world ").unwrap(),
            vec!["echo", "hello", "world"]
        );
        assert!(split_command("").unwrap().is_empty());
    }

    #[test]
    fn test_split_command_quotes_and_escapes() {
        assert_eq!(
            split_command(r#"sh -c "echo \"hi there\"""#).unwrap(),
            vec!["sh", "-c", "echo \"hi there\""]
        );
        assert_eq!(
            split_command(r"nginx -g 'daemon off;'").unwrap(),
            vec!["nginx", "-g", "daemon off;"]
        );
        assert_eq!(split_command(r"touch my\ file").unwrap(), vec!["touch", "my file"]);
        assert_eq!(split_command(r#"printf '' x"#).unwrap(), vec!["printf", "", "x"]);
    }

    #[test]
    fn test_split_command_unterminated_quote() {
        assert_eq!(
            split_command("echo 'oops"),
            Err(ArgumentError::UnterminatedQuote('\''))
        );
        assert_eq!(
            split_command("echo \"oops"),
            Err(ArgumentError::UnterminatedQuote('"'))
        );
    }

    #[test]
    fn test_parse_restart() {
        assert_eq!(parse_restart("no").unwrap(), Restart::No);
        assert_eq!(parse_restart("always").unwrap(), Restart::Always);
        assert_eq!(parse_restart("unless-stopped").unwrap(), Restart::UnlessStopped);
        assert_eq!(
            parse_restart("on-failure").unwrap(),
            Restart::OnFailure { max_retries: None }
        );
        assert_eq!(
            parse_restart("on-failure:3").unwrap(),
            Restart::OnFailure { max_retries: Some(3) }
        );
        assert!(parse_restart("sometimes").is_err());
        assert!(parse_restart("on-failure:x").is_err());
        assert!(parse_restart("on-failure:-1").is_err());
    }

    #[test]
    fn test_parse_port_defaults_to_tcp() {
        let mapping = parse_port("80", "8080").unwrap();
        assert_eq!(mapping.container_port, "80/tcp");
        assert_eq!(mapping.host_ip, None);
        assert_eq!(mapping.host_port, "8080");
    }

    #[test]
    fn test_parse_port_with_host_ip() {
        let mapping = parse_port("53/udp", "127.0.0.1:5353").unwrap();
        assert_eq!(mapping.container_port, "53/udp");
        assert_eq!(mapping.host_ip.as_deref(), Some("127.0.0.1"));
        assert_eq!(mapping.host_port, "5353");

        let v6 = parse_port("443", "[::1]:8443").unwrap();
        assert_eq!(v6.host_ip.as_deref(), Some("::1"));
        assert_eq!(v6.host_port, "8443");
    }

    #[test]
    fn test_parse_port_rejects_garbage() {
        assert!(parse_port("http", "80").is_err());
        assert!(parse_port("80/icmp", "80").is_err());
        assert!(parse_port("80", "eighty").is_err());
    }

    #[test]
    fn test_filters_accept_string_or_array() {
        let args: ListArgs = parse_arguments(json!({
            "all": true,
            "filters": {"status": "running", "label": ["a=1", "b=2"]}
        }))
        .unwrap();
        assert!(args.all);

        let filters = args.filters();
        assert_eq!(filters["status"], vec!["running"]);
        assert_eq!(filters["label"], vec!["a=1", "b=2"]);
    }

    #[test]
    fn test_null_arguments_count_as_empty_object() {
        let args: ListArgs = parse_arguments(Value::Null).unwrap();
        assert!(!args.all);
        assert!(args.filters.is_empty());
    }

    #[test]
    fn test_create_container_requires_image() {
        let err = parse_arguments::<ContainerArgs>(json!({"name": "web"})).unwrap_err();
        assert!(err.to_string().contains("image"));
    }

    #[test]
    fn test_container_args_into_spec() {
        let args: ContainerArgs = parse_arguments(json!({
            "name": "web",
            "image": "nginx:alpine",
            "env": ["MODE=prod"],
            "ports": {"80": "8080"},
            "volumes": ["/srv/html:/usr/share/nginx/html:ro", "/var/cache/nginx"],
            "command": "nginx -g 'daemon off;'",
            "workingDir": "/srv",
            "restart": "on-failure:2",
            "unknownKey": 1
        }))
        .unwrap();

        let spec = args.into_spec().unwrap();
        assert_eq!(spec.name, "web");
        assert_eq!(spec.cmd.unwrap(), vec!["nginx", "-g", "daemon off;"]);
        assert_eq!(spec.working_dir.as_deref(), Some("/srv"));
        assert_eq!(spec.ports[0].container_port, "80/tcp");
        assert_eq!(
            spec.volumes,
            vec![
                VolumeMount::Bind("/srv/html:/usr/share/nginx/html:ro".to_string()),
                VolumeMount::Anonymous("/var/cache/nginx".to_string()),
            ]
        );
        assert_eq!(spec.restart, Some(Restart::OnFailure { max_retries: Some(2) }));
        assert!(!spec.auto_remove);
    }

    #[test]
    fn test_command_array_passes_through() {
        let args: ContainerArgs = parse_arguments(json!({
            "name": "t",
            "image": "alpine",
            "command": ["sh", "-c", "echo 'unsplit'"]
        }))
        .unwrap();
        assert_eq!(
            args.into_spec().unwrap().cmd.unwrap(),
            vec!["sh", "-c", "echo 'unsplit'"]
        );
    }

    #[test]
    fn test_bad_restart_fails_validation() {
        let args: ContainerArgs = parse_arguments(json!({
            "name": "t",
            "image": "alpine",
            "restart": "forever"
        }))
        .unwrap();
        assert!(matches!(
            args.into_spec(),
            Err(ArgumentError::InvalidRestart(_))
        ));
    }

    #[test]
    fn test_run_args_defaults() {
        let args: RunArgs = parse_arguments(json!({"name": "t", "image": "alpine"})).unwrap();
        let (spec, detach) = args.into_spec().unwrap();
        assert!(detach);
        assert!(!spec.auto_remove);

        let args: RunArgs = parse_arguments(json!({
            "name": "t",
            "image": "alpine",
            "detach": false,
            "autoRemove": true
        }))
        .unwrap();
        let (spec, detach) = args.into_spec().unwrap();
        assert!(!detach);
        assert!(spec.auto_remove);
    }

    #[test]
    fn test_defaults_for_logs_images_networks_volumes() {
        let logs: LogsArgs = parse_arguments(json!({"id": "abc"})).unwrap();
        assert_eq!(logs.tail, 100);
        assert!(!logs.follow);
        assert!(!logs.request().timestamps);

        let pull: ImageRefArgs = parse_arguments(json!({"image": "hello-world"})).unwrap();
        assert_eq!(pull.tag, "latest");

        let build: BuildArgs = parse_arguments(json!({"tag": "app:dev"})).unwrap();
        let request = BuildRequest::from(build);
        assert_eq!(request.dockerfile, "Dockerfile");
        assert_eq!(request.context, ".");
        assert!(request.build_args.is_empty());

        let network: CreateNetworkArgs = parse_arguments(json!({"name": "backend"})).unwrap();
        assert_eq!(network.driver, "bridge");

        let volume: CreateVolumeArgs = parse_arguments(json!({"name": "data"})).unwrap();
        assert_eq!(volume.driver, "local");

        let remove: RemoveVolumeArgs = parse_arguments(json!({"name": "data"})).unwrap();
        assert!(!remove.force);
    }

    #[test]
    fn test_negative_tail_is_rejected() {
        assert!(parse_arguments::<LogsArgs>(json!({"id": "abc", "tail": -5})).is_err());
    }
}
