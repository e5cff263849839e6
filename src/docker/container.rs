// Container lifecycle operations
// Builds Engine API configs from normalized tool arguments and drives bollard

use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, ListContainersOptions, LogsOptions,
    RemoveContainerOptions, StartContainerOptions, StopContainerOptions, WaitContainerOptions,
};
use bollard::models::{HostConfig, PortBinding, RestartPolicy, RestartPolicyNameEnum};
use futures::StreamExt;
use std::collections::HashMap;
use tracing::{debug, info};

use super::client::{collect_logs, DockerClient, DockerError};
use crate::models::{ContainerEntry, ContainerLogs, IdAck};

/// One published port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMapping {
    /// Key format: "port/protocol" (e.g., "8080/tcp")
    pub container_port: String,
    pub host_ip: Option<String>,
    /// Empty string lets the daemon pick a free port
    pub host_port: String,
}

/// A volume entry from a run request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VolumeMount {
    /// `source:target[:mode]`, passed to HostConfig.Binds verbatim
    Bind(String),
    /// Bare container path, becomes an anonymous volume
    Anonymous(String),
}

impl VolumeMount {
    pub fn parse(spec: &str) -> Self {
        if spec.contains(':') {
            VolumeMount::Bind(spec.to_string())
        } else {
            VolumeMount::Anonymous(spec.to_string())
        }
    }
}

/// Restart policy requested for a container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restart {
    No,
    Always,
    UnlessStopped,
    OnFailure { max_retries: Option<i64> },
}

impl Restart {
    fn to_policy(self) -> RestartPolicy {
        let (name, maximum_retry_count) = match self {
            Restart::No => (RestartPolicyNameEnum::NO, None),
            Restart::Always => (RestartPolicyNameEnum::ALWAYS, None),
            Restart::UnlessStopped => (RestartPolicyNameEnum::UNLESS_STOPPED, None),
            Restart::OnFailure { max_retries } => (RestartPolicyNameEnum::ON_FAILURE, max_retries),
        };
        RestartPolicy {
            name: Some(name),
            maximum_retry_count,
        }
    }
}

/// Everything needed to create a container
#[derive(Debug, Clone, Default)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub env: Option<Vec<String>>,
    pub cmd: Option<Vec<String>>,
    pub working_dir: Option<String>,
    pub ports: Vec<PortMapping>,
    pub volumes: Vec<VolumeMount>,
    pub restart: Option<Restart>,
    pub auto_remove: bool,
}

impl ContainerSpec {
    /// Assemble the Engine API create body
    pub fn to_config(&self) -> Config<String> {
        let mut exposed_ports: HashMap<String, HashMap<(), ()>> = HashMap::new();
        let mut port_bindings: HashMap<String, Option<Vec<PortBinding>>> = HashMap::new();
        for mapping in &self.ports {
            exposed_ports.insert(mapping.container_port.clone(), HashMap::new());
            let binding = PortBinding {
                host_ip: mapping.host_ip.clone(),
                host_port: Some(mapping.host_port.clone()),
            };
            port_bindings
                .entry(mapping.container_port.clone())
                .or_insert_with(|| Some(Vec::new()))
                .get_or_insert_with(Vec::new)
                .push(binding);
        }

        let mut binds = Vec::new();
        let mut volumes: HashMap<String, HashMap<(), ()>> = HashMap::new();
        for mount in &self.volumes {
            match mount {
                VolumeMount::Bind(spec) => binds.push(spec.clone()),
                VolumeMount::Anonymous(path) => {
                    volumes.insert(path.clone(), HashMap::new());
                }
            }
        }

        let mut host_config = HostConfig::default();
        if !binds.is_empty() {
            host_config.binds = Some(binds);
        }
        if !port_bindings.is_empty() {
            host_config.port_bindings = Some(port_bindings);
        }
        host_config.restart_policy = self.restart.map(Restart::to_policy);
        if self.auto_remove {
            host_config.auto_remove = Some(true);
        }

        let mut config = Config::<String> {
            image: Some(self.image.clone()),
            env: self.env.clone(),
            cmd: self.cmd.clone(),
            working_dir: self.working_dir.clone(),
            host_config: Some(host_config),
            ..Default::default()
        };
        if !exposed_ports.is_empty() {
            config.exposed_ports = Some(exposed_ports);
        }
        if !volumes.is_empty() {
            config.volumes = Some(volumes);
        }
        config
    }
}

/// Options for `fetch_logs`
#[derive(Debug, Clone)]
pub struct LogRequest {
    pub tail: u64,
    pub timestamps: bool,
}

/// State of a container after a remove request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Removal {
    Gone,
    InProgress,
}

fn removal_outcome(result: Result<(), bollard::errors::Error>) -> Result<Removal, DockerError> {
    match result {
        Ok(()) => Ok(Removal::Gone),
        // Removed on stop by AutoRemove
        Err(bollard::errors::Error::DockerResponseServerError { status_code: 404, .. }) => {
            Ok(Removal::Gone)
        }
        // "removal of container ... is already in progress"
        Err(bollard::errors::Error::DockerResponseServerError { status_code: 409, .. }) => {
            Ok(Removal::InProgress)
        }
        Err(e) => Err(e.into()),
    }
}

impl DockerClient {
    /// List containers, optionally including stopped ones
    pub async fn list_containers(
        &self,
        all: bool,
        filters: HashMap<String, Vec<String>>,
    ) -> Result<Vec<ContainerEntry>, DockerError> {
        let options = ListContainersOptions {
            all,
            filters,
            ..Default::default()
        };
        let containers = self.docker.list_containers(Some(options)).await?;
        Ok(containers.into_iter().map(ContainerEntry::from).collect())
    }

    /// Create a container and return its id
    pub async fn create_container(&self, spec: &ContainerSpec) -> Result<String, DockerError> {
        self.create_from_config(&spec.name, spec.to_config()).await
    }

    async fn create_from_config(
        &self,
        name: &str,
        config: Config<String>,
    ) -> Result<String, DockerError> {
        let options = CreateContainerOptions {
            name: name.to_string(),
            platform: None,
        };
        let response = self.docker.create_container(Some(options), config).await?;
        for warning in &response.warnings {
            debug!(container = %name, warning = %warning, "Container create warning");
        }
        info!(container = %name, container_id = %response.id, "Container created");
        Ok(response.id)
    }

    /// Create and start a container.
    ///
    /// When `detach` is false, waits for the container to exit and reports its status code.
    /// Auto-removal then happens here after the wait, so the daemon cannot delete the
    /// container before the wait request reaches it.
    pub async fn run_container(&self, spec: &ContainerSpec, detach: bool) -> Result<IdAck, DockerError> {
        let message = format!("Container {} created and started successfully", spec.name);
        if detach {
            let id = self.create_container(spec).await?;
            self.start_container(&id).await?;
            return Ok(IdAck::new(id, message));
        }

        let attached = ContainerSpec {
            auto_remove: false,
            ..spec.clone()
        };
        let id = self.create_container(&attached).await?;
        self.start_container(&id).await?;
        let exit_code = self.wait_container(&id).await?;
        debug!(container_id = %id, exit_code = exit_code, "Container exited");
        if spec.auto_remove {
            self.remove_container(&id).await?;
        }

        let mut ack = IdAck::new(id, message);
        ack.exit_code = Some(exit_code);
        Ok(ack)
    }

    async fn wait_container(&self, container_id: &str) -> Result<i64, DockerError> {
        let mut stream = self
            .docker
            .wait_container(container_id, None::<WaitContainerOptions<String>>);
        let mut status_code = 0;
        while let Some(result) = stream.next().await {
            match result {
                Ok(response) => status_code = response.status_code,
                // bollard reports a non-zero exit as an error
                Err(bollard::errors::Error::DockerContainerWaitError { code, .. }) => {
                    status_code = code;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(status_code)
    }

    /// Replace a container with a fresh one built from its inspected configuration
    pub async fn recreate_container(&self, container_id: &str) -> Result<String, DockerError> {
        let info = self
            .docker
            .inspect_container(container_id, None::<InspectContainerOptions>)
            .await?;

        match self
            .docker
            .stop_container(container_id, None::<StopContainerOptions>)
            .await
        {
            Ok(()) => {}
            // Already stopped
            Err(bollard::errors::Error::DockerResponseServerError { status_code: 304, .. }) => {}
            Err(e) => return Err(e.into()),
        }

        let remove = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        let removed = self.docker.remove_container(container_id, Some(remove)).await;
        if removal_outcome(removed)? == Removal::InProgress {
            // The name stays taken until the daemon finishes
            debug!(container_id = %container_id, "Removal already in progress, waiting");
            self.wait_removed(container_id).await?;
        }

        let name = info
            .name
            .as_deref()
            .unwrap_or(container_id)
            .trim_start_matches('/')
            .to_string();
        let old = info.config.unwrap_or_default();
        let config = Config::<String> {
            image: old.image,
            env: old.env,
            cmd: old.cmd,
            entrypoint: old.entrypoint,
            working_dir: old.working_dir,
            user: old.user,
            labels: old.labels,
            exposed_ports: old.exposed_ports,
            volumes: old.volumes,
            tty: old.tty,
            open_stdin: old.open_stdin,
            host_config: info.host_config,
            ..Default::default()
        };

        let new_id = self.create_from_config(&name, config).await?;
        self.start_container(&new_id).await?;
        info!(old_id = %container_id, new_id = %new_id, "Container recreated");
        Ok(new_id)
    }

    async fn wait_removed(&self, container_id: &str) -> Result<(), DockerError> {
        let options = WaitContainerOptions {
            condition: "removed",
        };
        let mut stream = self.docker.wait_container(container_id, Some(options));
        while let Some(result) = stream.next().await {
            match result {
                Ok(_) | Err(bollard::errors::Error::DockerContainerWaitError { .. }) => {}
                Err(bollard::errors::Error::DockerResponseServerError { status_code: 404, .. }) => {
                    break
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Start a container
    pub async fn start_container(&self, container_id: &str) -> Result<(), DockerError> {
        self.docker
            .start_container(container_id, None::<StartContainerOptions<String>>)
            .await?;
        Ok(())
    }

    /// Stop a container using the daemon's default grace period
    pub async fn stop_container(&self, container_id: &str) -> Result<(), DockerError> {
        self.docker
            .stop_container(container_id, None::<StopContainerOptions>)
            .await?;
        Ok(())
    }

    /// Force-remove a container
    pub async fn remove_container(&self, container_id: &str) -> Result<(), DockerError> {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        self.docker.remove_container(container_id, Some(options)).await?;
        Ok(())
    }

    /// Get recent container logs (non-streaming)
    pub async fn fetch_logs(
        &self,
        container_id: &str,
        request: &LogRequest,
    ) -> Result<ContainerLogs, DockerError> {
        let options = LogsOptions::<String> {
            follow: false,
            stdout: true,
            stderr: true,
            timestamps: request.timestamps,
            tail: request.tail.to_string(),
            ..Default::default()
        };
        let logs = collect_logs(self.docker.logs(container_id, Some(options))).await?;
        Ok(ContainerLogs {
            id: container_id.to_string(),
            logs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn web_spec() -> ContainerSpec {
        ContainerSpec {
            name: "web".to_string(),
            image: "nginx:alpine".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_volume_mount_split_on_colon() {
        assert_eq!(
            VolumeMount::parse("/srv/data:/data:ro"),
            VolumeMount::Bind("/srv/data:/data:ro".to_string())
        );
        assert_eq!(VolumeMount::parse("/cache"), VolumeMount::Anonymous("/cache".to_string()));
    }

    #[test]
    fn test_minimal_config_has_no_ports_or_volumes() {
        let config = web_spec().to_config();
        assert_eq!(config.image.as_deref(), Some("nginx:alpine"));
        assert!(config.exposed_ports.is_none());
        assert!(config.volumes.is_none());
        let host = config.host_config.unwrap();
        assert!(host.port_bindings.is_none());
        assert!(host.binds.is_none());
        assert!(host.restart_policy.is_none());
        assert!(host.auto_remove.is_none());
    }

    #[test]
    fn test_ports_become_exposed_and_bound() {
        let mut spec = web_spec();
        spec.ports = vec![
            PortMapping {
                container_port: "80/tcp".to_string(),
                host_ip: None,
                host_port: "8080".to_string(),
            },
            PortMapping {
                container_port: "53/udp".to_string(),
                host_ip: Some("127.0.0.1".to_string()),
                host_port: "5353".to_string(),
            },
        ];

        let config = spec.to_config();
        let exposed = config.exposed_ports.unwrap();
        assert!(exposed.contains_key("80/tcp"));
        assert!(exposed.contains_key("53/udp"));

        let bindings = config.host_config.unwrap().port_bindings.unwrap();
        let http = bindings["80/tcp"].as_ref().unwrap();
        assert_eq!(http[0].host_port.as_deref(), Some("8080"));
        assert_eq!(http[0].host_ip, None);
        let dns = bindings["53/udp"].as_ref().unwrap();
        assert_eq!(dns[0].host_ip.as_deref(), Some("127.0.0.1"));
    }

    #[test]
    fn test_volumes_split_between_binds_and_anonymous() {
        let mut spec = web_spec();
        spec.volumes = vec![
            VolumeMount::parse("/host/html:/usr/share/nginx/html"),
            VolumeMount::parse("/var/cache/nginx"),
        ];

        let config = spec.to_config();
        assert!(config.volumes.unwrap().contains_key("/var/cache/nginx"));
        assert_eq!(
            config.host_config.unwrap().binds.unwrap(),
            vec!["/host/html:/usr/share/nginx/html".to_string()]
        );
    }

    #[test]
    fn test_restart_and_auto_remove() {
        let mut spec = web_spec();
        spec.restart = Some(Restart::OnFailure { max_retries: Some(5) });
        spec.auto_remove = true;

        let host = spec.to_config().host_config.unwrap();
        let policy = host.restart_policy.unwrap();
        assert_eq!(policy.name, Some(RestartPolicyNameEnum::ON_FAILURE));
        assert_eq!(policy.maximum_retry_count, Some(5));
        assert_eq!(host.auto_remove, Some(true));
    }

    fn server_error(status_code: u16, message: &str) -> bollard::errors::Error {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_removal_outcome_during_recreate() {
        assert_eq!(removal_outcome(Ok(())).unwrap(), Removal::Gone);
        assert_eq!(
            removal_outcome(Err(server_error(404, "No such container: web"))).unwrap(),
            Removal::Gone
        );
        assert_eq!(
            removal_outcome(Err(server_error(
                409,
                "removal of container web is already in progress"
            )))
            .unwrap(),
            Removal::InProgress
        );

        let err = removal_outcome(Err(server_error(500, "driver failed"))).unwrap_err();
        assert!(err.to_string().contains("driver failed"));
    }

    #[test]
    fn test_command_and_working_dir_pass_through() {
        let mut spec = web_spec();
        spec.cmd = Some(vec!["nginx".to_string(), "-g".to_string(), "daemon off;".to_string()]);
        spec.working_dir = Some("/app".to_string());
        spec.env = Some(vec!["MODE=prod".to_string()]);

        let config = spec.to_config();
        assert_eq!(config.cmd.unwrap().len(), 3);
        assert_eq!(config.working_dir.as_deref(), Some("/app"));
        assert_eq!(config.env.unwrap(), vec!["MODE=prod".to_string()]);
    }
}
