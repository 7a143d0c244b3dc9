use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unsupported image format")]
    UnsupportedImage,
}

/// Local filesystem store for profile pictures.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    base_path: PathBuf,
}

impl MediaStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn full_path(&self, relative_path: &str) -> PathBuf {
        self.base_path.join(relative_path)
    }

    /// Write an avatar under `avatars/<user_id>/` and return its relative path.
    ///
    /// The stored name is randomised so a replaced picture never collides
    /// with the one being deleted.
    pub async fn store_avatar(
        &self,
        user_id: Uuid,
        original_name: &str,
        data: &[u8],
    ) -> Result<String, StorageError> {
        let ext = image_extension(data).ok_or(StorageError::UnsupportedImage)?;

        let dir = self.base_path.join("avatars").join(user_id.to_string());
        fs::create_dir_all(&dir).await?;

        let stem = Path::new(&sanitize_filename(original_name))
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("avatar")
            .to_string();
        let file_path = dir.join(format!("{stem}_{}.{ext}", Uuid::new_v4().simple()));

        fs::write(&file_path, data).await?;

        let relative = file_path
            .strip_prefix(&self.base_path)
            .unwrap_or(&file_path)
            .to_string_lossy()
            .to_string();

        Ok(relative)
    }

    pub async fn delete_file(&self, relative_path: &str) -> Result<(), StorageError> {
        let path = self.full_path(&sanitize_relative(relative_path));
        if fs::metadata(&path).await.is_ok() {
            fs::remove_file(path).await?;
        }
        Ok(())
    }
}

/// Public URL of a stored file, as served under `/media`.
pub fn media_url(relative_path: &str) -> String {
    format!("/media/{}", sanitize_relative(relative_path))
}

/// Detect JPEG / PNG / WebP from magic bytes.
pub fn image_extension(data: &[u8]) -> Option<&'static str> {
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("jpg")
    } else if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        Some("png")
    } else if data.len() > 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        Some("webp")
    } else {
        None
    }
}

/// Sanitize a filename to prevent path traversal
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect::<String>()
        .trim()
        .to_string();
    if sanitized == ".." || sanitized == "." || sanitized.contains("..") {
        return sanitized.replace("..", "__");
    }
    sanitized
}

fn sanitize_relative(path: &str) -> String {
    path.split('/')
        .filter(|seg| !seg.is_empty() && *seg != "." && *seg != "..")
        .collect::<Vec<_>>()
        .join("/")
}
