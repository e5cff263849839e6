// Docker integration module using Bollard
// One shared client; container, image, network and volume operations

pub mod client;
pub mod container;
pub mod image;
pub mod network;
pub mod volume;

pub use client::{DockerClient, DockerError};
pub use container::{ContainerSpec, LogRequest, PortMapping, Restart, VolumeMount};
pub use image::BuildRequest;
