//! Local media host for avatar and cover image uploads.
//!
//! Uploads are staged in a temp directory, then published into the media
//! directory under a random name. Published files are served under
//! `<public_url>/media/<name>`.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid media URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Upload has no file name")]
    MissingFileName,
}

#[derive(Debug, Clone)]
pub struct MediaStore {
    media_dir: PathBuf,
    temp_dir: PathBuf,
    public_url: Url,
}

/// Keep only a short alphanumeric extension from an uploaded file name.
fn sanitized_extension(name: &str) -> Option<String> {
    let ext = Path::new(name).extension()?.to_str()?;
    if ext.is_empty() || ext.len() > 10 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

fn random_name(original: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    match sanitized_extension(original) {
        Some(ext) => format!("{}.{}", id, ext),
        None => id,
    }
}

impl MediaStore {
    pub fn new(media_dir: PathBuf, temp_dir: PathBuf, public_url: Url) -> Self {
        Self {
            media_dir,
            temp_dir,
            public_url,
        }
    }

    pub fn media_dir(&self) -> &Path {
        &self.media_dir
    }

    /// Create both directories if missing.
    pub async fn ensure_dirs(&self) -> Result<(), MediaError> {
        tokio::fs::create_dir_all(&self.media_dir).await?;
        tokio::fs::create_dir_all(&self.temp_dir).await?;
        Ok(())
    }

    /// Write raw upload bytes into the temp directory.
    pub async fn stage(&self, bytes: &[u8], original_name: &str) -> Result<PathBuf, MediaError> {
        tokio::fs::create_dir_all(&self.temp_dir).await?;
        let path = self.temp_dir.join(random_name(original_name));
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), size = bytes.len(), "Staged upload");
        Ok(path)
    }

    /// Publish a staged file and return its public URL.
    ///
    /// The staged file is removed whether or not publishing succeeded.
    pub async fn upload(&self, local_path: &Path) -> Result<Url, MediaError> {
        let result = self.publish(local_path).await;
        if let Err(e) = tokio::fs::remove_file(local_path).await {
            warn!(path = %local_path.display(), error = %e, "Failed to remove staged upload");
        }
        result
    }

    async fn publish(&self, local_path: &Path) -> Result<Url, MediaError> {
        let original = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or(MediaError::MissingFileName)?;
        let name = random_name(original);

        tokio::fs::create_dir_all(&self.media_dir).await?;
        tokio::fs::copy(local_path, self.media_dir.join(&name)).await?;

        let url = self.public_url.join(&format!("media/{}", name))?;
        debug!(url = %url, "Published upload");
        Ok(url)
    }
}
