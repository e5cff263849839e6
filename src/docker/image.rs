// Image operations
// Listing, registry pull/push, and builds from a local context directory

use bollard::image::{
    BuildImageOptions, CreateImageOptions, ListImagesOptions, PushImageOptions, RemoveImageOptions,
};
use bollard::models::BuildInfo;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

use super::client::{collect_progress, progress_value, DockerClient, DockerError};
use crate::models::{BuildProgress, ImageBuild, ImageEntry, ImageTransfer};

/// Parameters for `build_image`
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Directory to pack, or a ready-made tar archive
    pub context: String,
    /// Dockerfile path relative to the context root
    pub dockerfile: String,
    pub tag: String,
    pub build_args: HashMap<String, String>,
}

/// Join a repository and tag into a single reference
pub fn image_reference(image: &str, tag: &str) -> String {
    format!("{}:{}", image, tag)
}

/// Produce the tar body for a build.
///
/// Directories are archived with paths relative to their root; an existing
/// file is taken to already be a tar archive.
pub fn pack_build_context(context: &Path) -> Result<Vec<u8>, DockerError> {
    if context.is_file() {
        debug!(path = %context.display(), "Using prebuilt context archive");
        return Ok(std::fs::read(context)?);
    }
    if !context.is_dir() {
        return Err(DockerError::InvalidBuildContext(format!(
            "{} does not exist",
            context.display()
        )));
    }

    let mut tar_builder = tar::Builder::new(Vec::new());
    tar_builder.follow_symlinks(false);

    let mut entries = 0usize;
    for entry in WalkDir::new(context).min_depth(1) {
        let entry = entry.map_err(|e| DockerError::InvalidBuildContext(e.to_string()))?;
        let relative = entry
            .path()
            .strip_prefix(context)
            .map_err(|e| DockerError::InvalidBuildContext(e.to_string()))?;
        tar_builder.append_path_with_name(entry.path(), relative)?;
        entries += 1;
    }

    let tar_data = tar_builder.into_inner()?;
    debug!(
        context = %context.display(),
        entries = entries,
        bytes = tar_data.len(),
        "Packed build context"
    );
    Ok(tar_data)
}

/// Shape one build output line; an error line fails the build with its message
fn build_progress(mut info: BuildInfo) -> Result<Value, DockerError> {
    if let Some(error) = info.error.take() {
        return Err(DockerError::OperationFailed(error));
    }
    progress_value(BuildProgress::from(info))
}

impl DockerClient {
    /// List images
    pub async fn list_images(
        &self,
        all: bool,
        filters: HashMap<String, Vec<String>>,
    ) -> Result<Vec<ImageEntry>, DockerError> {
        let options = ListImagesOptions {
            all,
            filters,
            ..Default::default()
        };
        let images = self.docker.list_images(Some(options)).await?;
        Ok(images.into_iter().map(ImageEntry::from).collect())
    }

    /// Pull an image from its registry
    pub async fn pull_image(&self, image: &str, tag: &str) -> Result<ImageTransfer, DockerError> {
        let reference = image_reference(image, tag);
        info!(image = %reference, "Pulling image");

        let options = CreateImageOptions {
            from_image: image.to_string(),
            tag: tag.to_string(),
            ..Default::default()
        };
        let details =
            collect_progress(self.docker.create_image(Some(options), None, None), progress_value)
                .await?;

        info!(image = %reference, "Image pulled successfully");
        Ok(ImageTransfer {
            image: reference,
            message: "Image pulled successfully".to_string(),
            details,
        })
    }

    /// Push a local image to its registry
    pub async fn push_image(&self, image: &str, tag: &str) -> Result<ImageTransfer, DockerError> {
        let reference = image_reference(image, tag);
        info!(image = %reference, "Pushing image");

        let options = PushImageOptions {
            tag: tag.to_string(),
        };
        let details =
            collect_progress(self.docker.push_image(image, Some(options), None), progress_value)
                .await?;

        info!(image = %reference, "Image pushed successfully");
        Ok(ImageTransfer {
            image: reference,
            message: "Image pushed successfully".to_string(),
            details,
        })
    }

    /// Build an image from a context directory or archive
    pub async fn build_image(&self, request: &BuildRequest) -> Result<ImageBuild, DockerError> {
        let context = Path::new(&request.context);
        let tar_data = pack_build_context(context)?;

        info!(
            tag = %request.tag,
            dockerfile = %request.dockerfile,
            context = %context.display(),
            "Building Docker image"
        );

        let options = BuildImageOptions {
            dockerfile: request.dockerfile.clone(),
            t: request.tag.clone(),
            buildargs: request.build_args.clone(),
            rm: true,
            ..Default::default()
        };
        let details = collect_progress(
            self.docker.build_image(options, None, Some(tar_data.into())),
            build_progress,
        )
        .await?;

        info!(tag = %request.tag, "Docker image built successfully");
        Ok(ImageBuild {
            tag: request.tag.clone(),
            message: "Image built successfully".to_string(),
            details,
        })
    }

    /// Remove an image
    pub async fn remove_image(&self, image: &str, force: bool) -> Result<(), DockerError> {
        let options = RemoveImageOptions {
            force,
            noprune: false,
        };
        let deleted = self.docker.remove_image(image, Some(options), None).await?;
        debug!(image = %image, layers = deleted.len(), "Image removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn archive_paths(data: &[u8]) -> Vec<String> {
        let mut archive = tar::Archive::new(data);
        archive
            .entries()
            .unwrap()
            .map(|entry| entry.unwrap().path().unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_image_reference() {
        assert_eq!(image_reference("hello-world", "latest"), "hello-world:latest");
        assert_eq!(
            image_reference("ghcr.io/acme/api", "1.2.0"),
            "ghcr.io/acme/api:1.2.0"
        );
    }

    #[test]
    fn test_pack_directory_uses_relative_paths() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("Dockerfile"), "FROM alpine\nCOPY app /app\n").unwrap();
        fs::create_dir_all(tmp.path().join("app")).unwrap();
        fs::write(tmp.path().join("app").join("main.sh"), "echo hi\n").unwrap();

        let data = pack_build_context(tmp.path()).unwrap();
        let paths = archive_paths(&data);

        assert!(paths.iter().any(|p| p == "Dockerfile"));
        assert!(paths.iter().any(|p| p.trim_end_matches('/') == "app"));
        assert!(paths.iter().any(|p| p == "app/main.sh"));
        assert!(paths.iter().all(|p| !p.starts_with('/')));
    }

    #[test]
    fn test_pack_existing_archive_is_passed_through() {
        let tmp = tempdir().unwrap();
        let archive = tmp.path().join("context.tar");
        fs::write(&archive, b"not really a tarball").unwrap();

        let data = pack_build_context(&archive).unwrap();
        assert_eq!(data, b"not really a tarball");
    }

    #[test]
    fn test_build_error_line_fails_with_its_message() {
        let failed = BuildInfo {
            error: Some("COPY failed: file not found".to_string()),
            ..Default::default()
        };
        let err = build_progress(failed).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Docker operation failed: COPY failed: file not found"
        );

        let step = BuildInfo {
            stream: Some("Step 1/1 : FROM alpine".to_string()),
            ..Default::default()
        };
        assert_eq!(build_progress(step).unwrap()["stream"], "Step 1/1 : FROM alpine");
    }

    #[test]
    fn test_pack_missing_context_fails() {
        let tmp = tempdir().unwrap();
        let err = pack_build_context(&tmp.path().join("nope")).unwrap_err();
        assert!(matches!(err, DockerError::InvalidBuildContext(_)));
    }
}
