// Tool dispatch
// Routes `tools/call` to the Docker client and folds every failure into an
// error-flagged result

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use super::args::{
    parse_arguments, ArgumentError, BuildArgs, ContainerArgs, CreateNetworkArgs, CreateVolumeArgs,
    IdArgs, ImageRefArgs, ListArgs, LogsArgs, RemoveImageArgs, RemoveVolumeArgs, RunArgs,
};
use super::catalog::{tool_catalog, ToolName};
use crate::docker::{DockerClient, DockerError};
use crate::mcp::{CallToolResult, ToolInfo, ToolProvider};
use crate::models::{IdAck, NetworkCreated, VolumeRemoved};

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: ToolName, message: String },
    #[error("Failed to {action}: {source}")]
    Docker {
        action: &'static str,
        #[source]
        source: DockerError,
    },
    #[error("Failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ToolError {
    fn invalid(tool: ToolName) -> impl FnOnce(ArgumentError) -> ToolError {
        move |err| ToolError::InvalidArguments {
            tool,
            message: err.to_string(),
        }
    }

    fn docker(action: &'static str) -> impl FnOnce(DockerError) -> ToolError {
        move |source| ToolError::Docker { action, source }
    }
}

fn arguments<T: DeserializeOwned>(tool: ToolName, arguments: Value) -> Result<T, ToolError> {
    parse_arguments(arguments).map_err(|err| ToolError::InvalidArguments {
        tool,
        message: err.to_string(),
    })
}

fn encode<T: Serialize>(payload: T) -> Result<Value, ToolError> {
    Ok(serde_json::to_value(payload)?)
}

/// The Docker tool set, backed by one shared client
pub struct DockerTools {
    client: Arc<DockerClient>,
}

impl DockerTools {
    pub fn new(client: Arc<DockerClient>) -> Self {
        Self { client }
    }

    /// Validate the arguments, run the operation and return its JSON payload
    pub async fn execute(&self, tool: ToolName, args: Value) -> Result<Value, ToolError> {
        let client = &self.client;
        match tool {
            ToolName::ListContainers => {
                let args: ListArgs = arguments(tool, args)?;
                let all = args.all;
                let containers = client
                    .list_containers(all, args.filters())
                    .await
                    .map_err(ToolError::docker("list containers"))?;
                encode(containers)
            }
            ToolName::CreateContainer => {
                let args: ContainerArgs = arguments(tool, args)?;
                let spec = args.into_spec().map_err(ToolError::invalid(tool))?;
                let id = client
                    .create_container(&spec)
                    .await
                    .map_err(ToolError::docker("create container"))?;
                encode(IdAck::new(
                    id,
                    format!("Container {} created successfully", spec.name),
                ))
            }
            ToolName::RunContainer => {
                let args: RunArgs = arguments(tool, args)?;
                let (spec, detach) = args.into_spec().map_err(ToolError::invalid(tool))?;
                let ack = client
                    .run_container(&spec, detach)
                    .await
                    .map_err(ToolError::docker("run container"))?;
                encode(ack)
            }
            ToolName::RecreateContainer => {
                let args: IdArgs = arguments(tool, args)?;
                let id = client
                    .recreate_container(&args.id)
                    .await
                    .map_err(ToolError::docker("recreate container"))?;
                encode(IdAck::new(id, "Container recreated successfully"))
            }
            ToolName::StartContainer => {
                let args: IdArgs = arguments(tool, args)?;
                client
                    .start_container(&args.id)
                    .await
                    .map_err(ToolError::docker("start container"))?;
                encode(IdAck::new(args.id, "Container started successfully"))
            }
            ToolName::FetchContainerLogs => {
                let args: LogsArgs = arguments(tool, args)?;
                if args.follow {
                    debug!(container_id = %args.id, "Ignoring follow; returning a log snapshot");
                }
                let logs = client
                    .fetch_logs(&args.id, &args.request())
                    .await
                    .map_err(ToolError::docker("fetch container logs"))?;
                encode(logs)
            }
            ToolName::StopContainer => {
                let args: IdArgs = arguments(tool, args)?;
                client
                    .stop_container(&args.id)
                    .await
                    .map_err(ToolError::docker("stop container"))?;
                encode(IdAck::new(args.id, "Container stopped successfully"))
            }
            ToolName::RemoveContainer => {
                let args: IdArgs = arguments(tool, args)?;
                client
                    .remove_container(&args.id)
                    .await
                    .map_err(ToolError::docker("remove container"))?;
                encode(IdAck::new(args.id, "Container removed successfully"))
            }
            ToolName::ListImages => {
                let args: ListArgs = arguments(tool, args)?;
                let all = args.all;
                let images = client
                    .list_images(all, args.filters())
                    .await
                    .map_err(ToolError::docker("list images"))?;
                encode(images)
            }
            ToolName::PullImage => {
                let args: ImageRefArgs = arguments(tool, args)?;
                let pulled = client
                    .pull_image(&args.image, &args.tag)
                    .await
                    .map_err(ToolError::docker("pull image"))?;
                encode(pulled)
            }
            ToolName::PushImage => {
                let args: ImageRefArgs = arguments(tool, args)?;
                let pushed = client
                    .push_image(&args.image, &args.tag)
                    .await
                    .map_err(ToolError::docker("push image"))?;
                encode(pushed)
            }
            ToolName::BuildImage => {
                let args: BuildArgs = arguments(tool, args)?;
                let built = client
                    .build_image(&args.into())
                    .await
                    .map_err(ToolError::docker("build image"))?;
                encode(built)
            }
            ToolName::RemoveImage => {
                let args: RemoveImageArgs = arguments(tool, args)?;
                client
                    .remove_image(&args.id, args.force)
                    .await
                    .map_err(ToolError::docker("remove image"))?;
                encode(IdAck::new(args.id, "Image removed successfully"))
            }
            ToolName::ListNetworks => {
                let args: ListArgs = arguments(tool, args)?;
                let networks = client
                    .list_networks(args.filters())
                    .await
                    .map_err(ToolError::docker("list networks"))?;
                encode(networks)
            }
            ToolName::CreateNetwork => {
                let args: CreateNetworkArgs = arguments(tool, args)?;
                let id = client
                    .create_network(&args.name, &args.driver, args.options)
                    .await
                    .map_err(ToolError::docker("create network"))?;
                encode(NetworkCreated {
                    id,
                    name: args.name,
                    message: "Network created successfully".to_string(),
                })
            }
            ToolName::RemoveNetwork => {
                let args: IdArgs = arguments(tool, args)?;
                client
                    .remove_network(&args.id)
                    .await
                    .map_err(ToolError::docker("remove network"))?;
                encode(IdAck::new(args.id, "Network removed successfully"))
            }
            ToolName::ListVolumes => {
                let args: ListArgs = arguments(tool, args)?;
                let volumes = client
                    .list_volumes(args.filters())
                    .await
                    .map_err(ToolError::docker("list volumes"))?;
                encode(volumes)
            }
            ToolName::CreateVolume => {
                let args: CreateVolumeArgs = arguments(tool, args)?;
                let created = client
                    .create_volume(&args.name, &args.driver, args.options)
                    .await
                    .map_err(ToolError::docker("create volume"))?;
                encode(created)
            }
            ToolName::RemoveVolume => {
                let args: RemoveVolumeArgs = arguments(tool, args)?;
                client
                    .remove_volume(&args.name, args.force)
                    .await
                    .map_err(ToolError::docker("remove volume"))?;
                encode(VolumeRemoved {
                    name: args.name,
                    message: "Volume removed successfully".to_string(),
                })
            }
        }
    }
}

#[async_trait]
impl ToolProvider for DockerTools {
    fn tools(&self) -> Vec<ToolInfo> {
        tool_catalog()
    }

    async fn call(&self, name: &str, arguments: Value) -> CallToolResult {
        let outcome = match name.parse::<ToolName>() {
            Ok(tool) => self.execute(tool, arguments).await,
            Err(unknown) => Err(ToolError::UnknownTool(unknown)),
        };
        let text = outcome.and_then(|payload| Ok(serde_json::to_string_pretty(&payload)?));

        match text {
            Ok(text) => {
                debug!(tool = %name, "Tool call succeeded");
                CallToolResult::text(text)
            }
            Err(err) => {
                warn!(tool = %name, error = %err, "Tool call failed");
                CallToolResult::error(format!("Error: {}", err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docker::client::tests::unreachable_client;
    use crate::mcp::ToolContent;
    use serde_json::json;

    fn tools() -> DockerTools {
        DockerTools::new(Arc::new(unreachable_client()))
    }

    fn text(result: &CallToolResult) -> &str {
        match &result.content[0] {
            ToolContent::Text { text } => text,
        }
    }

    #[test]
    fn test_provider_lists_catalog() {
        assert_eq!(tools().tools().len(), ToolName::ALL.len());
    }

    #[tokio::test]
    async fn test_unknown_tool_is_error_result() {
        let result = tools().call("exec_container", json!({})).await;
        assert!(result.is_error);
        assert_eq!(text(&result), "Error: Unknown tool: exec_container");
    }

    #[tokio::test]
    async fn test_missing_image_rejected_before_docker() {
        let result = tools().call("run_container", json!({"name": "web"})).await;
        assert!(result.is_error);
        assert!(text(&result).starts_with("Error: Invalid arguments for run_container"));
        assert!(text(&result).contains("image"));
    }

    #[tokio::test]
    async fn test_bad_command_rejected_before_docker() {
        let result = tools()
            .call(
                "create_container",
                json!({"name": "web", "image": "alpine", "command": "echo 'unclosed"}),
            )
            .await;
        assert!(result.is_error);
        assert!(text(&result).contains("unterminated ' quote"));
    }

    #[tokio::test]
    async fn test_wrong_argument_type_is_invalid() {
        let result = tools()
            .call("list_containers", json!({"all": "yes"}))
            .await;
        assert!(result.is_error);
        assert!(text(&result).starts_with("Error: Invalid arguments for list_containers"));
    }

    #[tokio::test]
    async fn test_null_arguments_for_required_field() {
        let result = tools().call("stop_container", Value::Null).await;
        assert!(result.is_error);
        assert!(text(&result).contains("missing field `id`"));
    }

    #[tokio::test]
    async fn test_docker_failure_is_prefixed_with_action() {
        let result = tools().call("list_volumes", json!({})).await;
        assert!(result.is_error);
        assert!(text(&result).starts_with("Error: Failed to list volumes: "));
    }

    #[tokio::test]
    async fn test_missing_build_context_reports_build_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("absent");
        let result = tools()
            .call(
                "build_image",
                json!({"tag": "app:dev", "context": missing.to_string_lossy()}),
            )
            .await;
        assert!(result.is_error);
        assert!(text(&result).starts_with("Error: Failed to build image: Invalid build context"));
    }
}
