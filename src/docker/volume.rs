// Volume operations

use bollard::volume::{CreateVolumeOptions, ListVolumesOptions, RemoveVolumeOptions};
use std::collections::HashMap;
use tracing::info;

use super::client::{DockerClient, DockerError};
use crate::models::{VolumeCreated, VolumeEntry, VolumeListing};

impl DockerClient {
    /// List volumes matching the given filters
    pub async fn list_volumes(
        &self,
        filters: HashMap<String, Vec<String>>,
    ) -> Result<VolumeListing, DockerError> {
        let options = ListVolumesOptions { filters };
        let response = self.docker.list_volumes(Some(options)).await?;
        Ok(VolumeListing {
            volumes: response
                .volumes
                .unwrap_or_default()
                .into_iter()
                .map(VolumeEntry::from)
                .collect(),
            warnings: response.warnings,
        })
    }

    /// Create a named volume
    pub async fn create_volume(
        &self,
        name: &str,
        driver: &str,
        driver_opts: HashMap<String, String>,
    ) -> Result<VolumeCreated, DockerError> {
        let options = CreateVolumeOptions {
            name: name.to_string(),
            driver: driver.to_string(),
            driver_opts,
            ..Default::default()
        };
        let volume = self.docker.create_volume(options).await?;
        info!(volume = %volume.name, driver = %volume.driver, "Created Docker volume");
        Ok(VolumeCreated {
            name: volume.name,
            driver: volume.driver,
            mountpoint: volume.mountpoint,
            message: "Volume created successfully".to_string(),
        })
    }

    /// Remove a volume
    pub async fn remove_volume(&self, name: &str, force: bool) -> Result<(), DockerError> {
        let options = RemoveVolumeOptions { force };
        self.docker.remove_volume(name, Some(options)).await?;
        info!(volume = %name, "Removed Docker volume");
        Ok(())
    }
}
