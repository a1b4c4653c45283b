//! Reading reference images from disk and writing results back.

use makeover_core::error::{MakeoverError, Result};
use makeover_core::image::{Artifact, ImageRef};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Infers the MIME type from a filename extension using the `mime_guess` library.
fn infer_mime_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string()
}

/// Reads an image file into an [`ImageRef`] named after the file.
///
/// Files whose extension does not map to an `image/*` type are rejected.
pub async fn load_image(path: &Path) -> Result<ImageRef> {
    let mime_type = infer_mime_type(path);
    if !mime_type.starts_with("image/") {
        return Err(MakeoverError::validation(format!(
            "{} is not an image ({})",
            path.display(),
            mime_type
        )));
    }

    let bytes = fs::read(path).await.map_err(|e| {
        MakeoverError::io(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    tracing::debug!(name = %name, mime_type = %mime_type, len = bytes.len(), "Loaded image");
    Ok(ImageRef::new(name, mime_type, bytes))
}

/// Loads several images, failing on the first unreadable one.
pub async fn load_images<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<ImageRef>> {
    let mut images = Vec::with_capacity(paths.len());
    for path in paths {
        images.push(load_image(path.as_ref()).await?);
    }
    Ok(images)
}

/// File name used when exporting an artifact: `makeover-<millis>.<ext>`.
pub fn export_file_name(artifact: &Artifact) -> String {
    format!(
        "makeover-{}.{}",
        chrono::Utc::now().timestamp_millis(),
        artifact.extension()
    )
}

/// Writes an artifact into `dir`, creating the directory if needed.
///
/// Returns the path of the written file.
pub async fn save_artifact(artifact: &Artifact, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir).await.map_err(|e| {
        MakeoverError::io(format!("Failed to create {}: {}", dir.display(), e))
    })?;

    let path = dir.join(export_file_name(artifact));
    fs::write(&path, artifact.bytes()).await.map_err(|e| {
        MakeoverError::io(format!("Failed to write {}: {}", path.display(), e))
    })?;

    tracing::info!(path = %path.display(), artifact = %artifact.id(), "Saved artifact");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_image_reads_bytes_and_mime() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("portrait.jpg");
        std::fs::write(&path, [0xFFu8, 0xD8, 0xFF]).unwrap();

        let image = load_image(&path).await.unwrap();

        assert_eq!(image.name(), "portrait.jpg");
        assert_eq!(image.mime_type(), "image/jpeg");
        assert_eq!(image.bytes(), &[0xFFu8, 0xD8, 0xFF][..]);
    }

    #[tokio::test]
    async fn test_load_image_rejects_non_images() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();

        let err = load_image(&path).await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_load_image_missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = load_image(&temp_dir.path().join("gone.png"))
            .await
            .unwrap_err();
        assert!(err.is_io());
    }

    #[tokio::test]
    async fn test_load_images_keeps_order() {
        let temp_dir = TempDir::new().unwrap();
        let paths: Vec<PathBuf> = ["a.png", "b.webp", "c.gif"]
            .iter()
            .map(|name| {
                let path = temp_dir.path().join(name);
                std::fs::write(&path, [1u8]).unwrap();
                path
            })
            .collect();

        let images = load_images(&paths).await.unwrap();
        let names: Vec<&str> = images.iter().map(|image| image.name()).collect();
        assert_eq!(names, vec!["a.png", "b.webp", "c.gif"]);
    }

    #[tokio::test]
    async fn test_save_artifact_creates_dir_and_names_file() {
        let temp_dir = TempDir::new().unwrap();
        let out_dir = temp_dir.path().join("nested").join("exports");
        let artifact = Artifact::new("image/jpeg", vec![7u8, 8, 9]);

        let path = save_artifact(&artifact, &out_dir).await.unwrap();

        let file_name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(file_name.starts_with("makeover-"));
        assert!(file_name.ends_with(".jpg"));
        assert_eq!(std::fs::read(&path).unwrap(), vec![7u8, 8, 9]);
    }
}
