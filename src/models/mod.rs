// Response models returned by the Docker tools
// Reshaped, camelCase views of the Engine API objects bollard hands back

use bollard::models::{BuildInfo, ContainerSummary, ImageSummary, Network, Port, Volume};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Container as listed by `list_containers`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerEntry {
    pub id: Option<String>,
    pub names: Option<Vec<String>>,
    pub image: Option<String>,
    pub command: Option<String>,
    /// Creation time in seconds since the epoch
    pub created: Option<i64>,
    pub status: Option<String>,
    pub state: Option<String>,
    /// Docker's own port objects (IP, PrivatePort, PublicPort, Type)
    pub ports: Option<Vec<Port>>,
}

impl From<ContainerSummary> for ContainerEntry {
    fn from(c: ContainerSummary) -> Self {
        Self {
            id: c.id,
            names: c.names,
            image: c.image,
            command: c.command,
            created: c.created,
            status: c.status,
            state: c.state,
            ports: c.ports,
        }
    }
}

/// Image as listed by `list_images`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageEntry {
    pub id: String,
    pub repo_tags: Vec<String>,
    pub repo_digests: Vec<String>,
    pub created: i64,
    pub size: i64,
}

impl From<ImageSummary> for ImageEntry {
    fn from(img: ImageSummary) -> Self {
        Self {
            id: img.id,
            repo_tags: img.repo_tags,
            repo_digests: img.repo_digests,
            created: img.created,
            size: img.size,
        }
    }
}

/// Network as listed by `list_networks`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkEntry {
    pub id: Option<String>,
    pub name: Option<String>,
    pub driver: Option<String>,
    pub scope: Option<String>,
    pub created: Option<String>,
    pub options: Option<HashMap<String, String>>,
}

impl From<Network> for NetworkEntry {
    fn from(n: Network) -> Self {
        Self {
            id: n.id,
            name: n.name,
            driver: n.driver,
            scope: n.scope,
            created: n.created,
            options: n.options,
        }
    }
}

/// Volume as listed by `list_volumes`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeEntry {
    pub name: String,
    pub driver: String,
    pub mountpoint: String,
    /// "unknown" when the daemon does not report a creation time
    pub created: String,
    pub options: HashMap<String, String>,
    pub labels: HashMap<String, String>,
}

impl From<Volume> for VolumeEntry {
    fn from(v: Volume) -> Self {
        Self {
            name: v.name,
            driver: v.driver,
            mountpoint: v.mountpoint,
            created: v.created_at.unwrap_or_else(|| "unknown".to_string()),
            options: v.options,
            labels: v.labels,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeListing {
    pub volumes: Vec<VolumeEntry>,
    pub warnings: Option<Vec<String>>,
}

/// Acknowledgement for operations keyed by container, image or network id
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdAck {
    pub id: String,
    pub message: String,
    /// Exit status, only set by a non-detached `run_container`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i64>,
}

impl IdAck {
    pub fn new(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            message: message.into(),
            exit_code: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerLogs {
    pub id: String,
    pub logs: String,
}

/// Result of a pull or push, with the daemon's progress messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageTransfer {
    pub image: String,
    pub message: String,
    pub details: Vec<Value>,
}

/// One line of build output
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildProgress {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
    /// Id of the built image, reported once at the end
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
}

impl From<BuildInfo> for BuildProgress {
    fn from(info: BuildInfo) -> Self {
        Self {
            id: info.id,
            stream: info.stream,
            status: info.status,
            progress: info.progress,
            image_id: info.aux.and_then(|aux| aux.id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageBuild {
    pub tag: String,
    pub message: String,
    pub details: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkCreated {
    pub id: Option<String>,
    pub name: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeCreated {
    pub name: String,
    pub driver: String,
    pub mountpoint: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeRemoved {
    pub name: String,
    pub message: String,
}
