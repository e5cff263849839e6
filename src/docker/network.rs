// Network operations

use bollard::network::{CreateNetworkOptions, ListNetworksOptions};
use std::collections::HashMap;
use tracing::info;

use super::client::{DockerClient, DockerError};
use crate::models::NetworkEntry;

impl DockerClient {
    /// List networks matching the given filters
    pub async fn list_networks(
        &self,
        filters: HashMap<String, Vec<String>>,
    ) -> Result<Vec<NetworkEntry>, DockerError> {
        let options = ListNetworksOptions { filters };
        let networks = self.docker.list_networks(Some(options)).await?;
        Ok(networks.into_iter().map(NetworkEntry::from).collect())
    }

    /// Create a network and return its id when the daemon reports one
    pub async fn create_network(
        &self,
        name: &str,
        driver: &str,
        options: HashMap<String, String>,
    ) -> Result<Option<String>, DockerError> {
        let config = CreateNetworkOptions {
            name: name.to_string(),
            driver: driver.to_string(),
            options,
            ..Default::default()
        };
        let response = self.docker.create_network(config).await?;
        let id: Option<String> = response.id.into();
        info!(network = %name, driver = %driver, network_id = ?id, "Created Docker network");
        Ok(id)
    }

    /// Remove a network by id or name
    pub async fn remove_network(&self, network: &str) -> Result<(), DockerError> {
        self.docker.remove_network(network).await?;
        info!(network = %network, "Removed Docker network");
        Ok(())
    }
}
