// Tool catalog
// The fixed set of Docker tools with their descriptions and input schemas

use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

use crate::mcp::ToolInfo;

/// Every tool this server exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    ListContainers,
    CreateContainer,
    RunContainer,
    RecreateContainer,
    StartContainer,
    FetchContainerLogs,
    StopContainer,
    RemoveContainer,
    ListImages,
    PullImage,
    PushImage,
    BuildImage,
    RemoveImage,
    ListNetworks,
    CreateNetwork,
    RemoveNetwork,
    ListVolumes,
    CreateVolume,
    RemoveVolume,
}

impl ToolName {
    /// Catalog order, as returned by `tools/list`
    pub const ALL: [ToolName; 19] = [
        ToolName::ListContainers,
        ToolName::CreateContainer,
        ToolName::RunContainer,
        ToolName::RecreateContainer,
        ToolName::StartContainer,
        ToolName::FetchContainerLogs,
        ToolName::StopContainer,
        ToolName::RemoveContainer,
        ToolName::ListImages,
        ToolName::PullImage,
        ToolName::PushImage,
        ToolName::BuildImage,
        ToolName::RemoveImage,
        ToolName::ListNetworks,
        ToolName::CreateNetwork,
        ToolName::RemoveNetwork,
        ToolName::ListVolumes,
        ToolName::CreateVolume,
        ToolName::RemoveVolume,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::ListContainers => "list_containers",
            ToolName::CreateContainer => "create_container",
            ToolName::RunContainer => "run_container",
            ToolName::RecreateContainer => "recreate_container",
            ToolName::StartContainer => "start_container",
            ToolName::FetchContainerLogs => "fetch_container_logs",
            ToolName::StopContainer => "stop_container",
            ToolName::RemoveContainer => "remove_container",
            ToolName::ListImages => "list_images",
            ToolName::PullImage => "pull_image",
            ToolName::PushImage => "push_image",
            ToolName::BuildImage => "build_image",
            ToolName::RemoveImage => "remove_image",
            ToolName::ListNetworks => "list_networks",
            ToolName::CreateNetwork => "create_network",
            ToolName::RemoveNetwork => "remove_network",
            ToolName::ListVolumes => "list_volumes",
            ToolName::CreateVolume => "create_volume",
            ToolName::RemoveVolume => "remove_volume",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ToolName::ListContainers => "List Docker containers with optional filtering",
            ToolName::CreateContainer => "Create a new Docker container",
            ToolName::RunContainer => "Create and start a Docker container",
            ToolName::RecreateContainer => "Recreate an existing container with same configuration",
            ToolName::StartContainer => "Start a stopped container",
            ToolName::FetchContainerLogs => "Fetch logs from a container",
            ToolName::StopContainer => "Stop a running container",
            ToolName::RemoveContainer => "Remove a container",
            ToolName::ListImages => "List Docker images",
            ToolName::PullImage => "Pull an image from a registry",
            ToolName::PushImage => "Push an image to a registry",
            ToolName::BuildImage => "Build an image from a Dockerfile",
            ToolName::RemoveImage => "Remove an image",
            ToolName::ListNetworks => "List Docker networks",
            ToolName::CreateNetwork => "Create a new Docker network",
            ToolName::RemoveNetwork => "Remove a Docker network",
            ToolName::ListVolumes => "List Docker volumes",
            ToolName::CreateVolume => "Create a new Docker volume",
            ToolName::RemoveVolume => "Remove a Docker volume",
        }
    }

    /// JSON schema for the tool's arguments
    pub fn input_schema(self) -> Value {
        match self {
            ToolName::ListContainers => object(
                json!({
                    "all": {"type": "boolean", "description": "Show all containers (default shows only running)"},
                    "filters": filters_schema("Filters to apply when listing containers"),
                }),
                &[],
            ),
            ToolName::CreateContainer => object(container_properties(false), &["name", "image"]),
            ToolName::RunContainer => object(container_properties(true), &["name", "image"]),
            ToolName::RecreateContainer
            | ToolName::StartContainer
            | ToolName::StopContainer
            | ToolName::RemoveContainer => object(
                json!({"id": {"type": "string", "description": "Container ID or name"}}),
                &["id"],
            ),
            ToolName::FetchContainerLogs => object(
                json!({
                    "id": {"type": "string", "description": "Container ID or name"},
                    "tail": {"type": "integer", "minimum": 0, "description": "Number of lines to show from end of logs (default: 100)"},
                    "follow": {"type": "boolean", "description": "Follow log output (accepted for compatibility; logs are always returned as a snapshot)"},
                    "timestamps": {"type": "boolean", "description": "Show timestamps"},
                }),
                &["id"],
            ),
            ToolName::ListImages => object(
                json!({
                    "all": {"type": "boolean", "description": "Show all images (including intermediate)"},
                    "filters": filters_schema("Filters to apply when listing images"),
                }),
                &[],
            ),
            ToolName::PullImage => object(
                json!({
                    "image": {"type": "string", "description": "Image name"},
                    "tag": {"type": "string", "description": "Image tag (default: latest)"},
                }),
                &["image"],
            ),
            ToolName::PushImage => object(
                json!({
                    "image": {"type": "string", "description": "Image name"},
                    "tag": {"type": "string", "description": "Image tag (default: latest)"},
                }),
                &["image"],
            ),
            ToolName::BuildImage => object(
                json!({
                    "dockerfile": {"type": "string", "description": "Path to Dockerfile relative to the context (default: Dockerfile)"},
                    "context": {"type": "string", "description": "Build context directory or tar archive (default: .)"},
                    "tag": {"type": "string", "description": "Image tag"},
                    "buildArgs": string_map_schema("Build arguments"),
                }),
                &["tag"],
            ),
            ToolName::RemoveImage => object(
                json!({
                    "id": {"type": "string", "description": "Image ID or name"},
                    "force": {"type": "boolean", "description": "Force removal"},
                }),
                &["id"],
            ),
            ToolName::ListNetworks => object(
                json!({"filters": filters_schema("Filters to apply when listing networks")}),
                &[],
            ),
            ToolName::CreateNetwork => object(
                json!({
                    "name": {"type": "string", "description": "Network name"},
                    "driver": {"type": "string", "description": "Network driver (default: bridge)"},
                    "options": string_map_schema("Driver options"),
                }),
                &["name"],
            ),
            ToolName::RemoveNetwork => object(
                json!({"id": {"type": "string", "description": "Network ID or name"}}),
                &["id"],
            ),
            ToolName::ListVolumes => object(
                json!({"filters": filters_schema("Filters to apply when listing volumes")}),
                &[],
            ),
            ToolName::CreateVolume => object(
                json!({
                    "name": {"type": "string", "description": "Volume name"},
                    "driver": {"type": "string", "description": "Volume driver (default: local)"},
                    "options": string_map_schema("Driver options"),
                }),
                &["name"],
            ),
            ToolName::RemoveVolume => object(
                json!({
                    "name": {"type": "string", "description": "Volume name"},
                    "force": {"type": "boolean", "description": "Force removal"},
                }),
                &["name"],
            ),
        }
    }

    pub fn info(self) -> ToolInfo {
        ToolInfo {
            name: self.as_str().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|tool| tool.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// The full catalog for `tools/list`
pub fn tool_catalog() -> Vec<ToolInfo> {
    ToolName::ALL.into_iter().map(ToolName::info).collect()
}

fn object(properties: Value, required: &[&str]) -> Value {
    let mut schema = json!({"type": "object", "properties": properties});
    if !required.is_empty() {
        schema["required"] = json!(required);
    }
    schema
}

fn string_map_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "additionalProperties": {"type": "string"},
        "description": description,
    })
}

fn filters_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "additionalProperties": {
            "oneOf": [
                {"type": "string"},
                {"type": "array", "items": {"type": "string"}}
            ]
        },
        "description": description,
    })
}

fn container_properties(run: bool) -> Value {
    let mut properties = json!({
        "name": {"type": "string", "description": "Container name"},
        "image": {"type": "string", "description": "Docker image to use"},
        "env": {"type": "array", "items": {"type": "string"}, "description": "Environment variables (KEY=value)"},
        "ports": {
            "type": "object",
            "additionalProperties": {"type": "string"},
            "description": "Port mappings: container port (e.g. \"80\" or \"53/udp\") to host port (\"8080\" or \"127.0.0.1:8080\")"
        },
        "volumes": {"type": "array", "items": {"type": "string"}, "description": "Volume mounts (host:container[:mode] binds, or a bare container path for an anonymous volume)"},
        "command": {
            "oneOf": [{"type": "string"}, {"type": "array", "items": {"type": "string"}}],
            "description": "Command to run"
        },
        "workingDir": {"type": "string", "description": "Working directory"},
        "restart": {"type": "string", "description": "Restart policy (no, always, unless-stopped, on-failure[:max-retries])"},
    });
    if run {
        properties["detach"] = json!({"type": "boolean", "description": "Run in detached mode (default: true); when false, wait for the container to exit"});
        properties["autoRemove"] = json!({"type": "boolean", "description": "Automatically remove container when it exits"});
    }
    properties
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_has_every_tool_once() {
        let catalog = tool_catalog();
        assert_eq!(catalog.len(), 19);
        let names: HashSet<_> = catalog.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names.len(), 19);
        assert!(names.contains("fetch_container_logs"));
        assert!(names.contains("remove_volume"));
    }

    #[test]
    fn test_tool_name_parses_its_own_string() {
        for tool in ToolName::ALL {
            assert_eq!(tool.as_str().parse::<ToolName>(), Ok(tool));
        }
        assert_eq!("exec_container".parse::<ToolName>(), Err("exec_container".to_string()));
    }

    #[test]
    fn test_every_schema_is_an_object() {
        for tool in ToolName::ALL {
            let schema = tool.input_schema();
            assert_eq!(schema["type"], "object", "{}", tool);
            assert!(schema["properties"].is_object(), "{}", tool);
        }
    }

    #[test]
    fn test_required_fields() {
        let required = |tool: ToolName| -> Vec<String> {
            tool.input_schema()["required"]
                .as_array()
                .map(|r| r.iter().map(|v| v.as_str().unwrap().to_string()).collect())
                .unwrap_or_default()
        };

        assert!(required(ToolName::ListContainers).is_empty());
        assert_eq!(required(ToolName::CreateContainer), vec!["name", "image"]);
        assert_eq!(required(ToolName::RunContainer), vec!["name", "image"]);
        assert_eq!(required(ToolName::FetchContainerLogs), vec!["id"]);
        assert_eq!(required(ToolName::BuildImage), vec!["tag"]);
        assert_eq!(required(ToolName::RemoveVolume), vec!["name"]);
    }

    #[test]
    fn test_only_run_container_has_detach() {
        assert!(ToolName::RunContainer.input_schema()["properties"]["autoRemove"].is_object());
        assert!(ToolName::CreateContainer.input_schema()["properties"]
            .get("detach")
            .is_none());
    }
}
