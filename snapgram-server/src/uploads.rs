use axum::{
    extract::multipart::{Field, MultipartError},
    http::StatusCode,
};
use chrono::Utc;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::config::UploadSettings;

/// Image extensions accepted for upload (compared case-insensitively)
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Length of the random part of generated file names
const RANDOM_SUFFIX_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Only image files are allowed (jpg, jpeg, png, gif, webp)")]
    UnsupportedType,

    #[error("File exceeds the maximum upload size of {max_bytes} bytes")]
    TooLarge { max_bytes: usize },

    #[error("Malformed upload: {0}")]
    Malformed(String),

    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

/// A file read from a request and validated, not yet written to disk
#[derive(Debug)]
pub struct PendingUpload {
    pub extension: String,
    pub bytes: Vec<u8>,
}

/// Flat directory of uploaded images, served under `public_path`
#[derive(Clone, Debug)]
pub struct UploadStore {
    dir: PathBuf,
    public_path: String,
    max_bytes: usize,
}

impl UploadStore {
    pub fn new(settings: &UploadSettings) -> Self {
        Self {
            dir: PathBuf::from(&settings.dir),
            public_path: settings.public_path.trim_end_matches('/').to_string(),
            max_bytes: settings.max_bytes,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn public_path(&self) -> &str {
        &self.public_path
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    /// Lowercased extension of `file_name` if it is on the allow-list.
    /// Only the name is looked at, never the content.
    pub fn validate_extension(file_name: &str) -> Result<String, UploadError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .ok_or(UploadError::UnsupportedType)?;

        if ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            Ok(extension)
        } else {
            Err(UploadError::UnsupportedType)
        }
    }

    pub fn check_size(&self, len: usize) -> Result<(), UploadError> {
        if len > self.max_bytes {
            return Err(UploadError::TooLarge {
                max_bytes: self.max_bytes,
            });
        }
        Ok(())
    }

    /// `<unix-millis>-<random>.<ext>`
    pub fn generate_file_name(extension: &str) -> String {
        let random = Uuid::new_v4().simple().to_string();
        format!(
            "{}-{}.{}",
            Utc::now().timestamp_millis(),
            &random[..RANDOM_SUFFIX_LEN],
            extension
        )
    }

    /// Read a multipart file field, rejecting it as soon as it is known to be
    /// unacceptable. Nothing is written to disk here.
    pub async fn read_field(&self, mut field: Field<'_>) -> Result<PendingUpload, UploadError> {
        let file_name = field
            .file_name()
            .ok_or_else(|| UploadError::Malformed("file field has no file name".to_string()))?
            .to_string();
        let extension = Self::validate_extension(&file_name)?;

        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(|e| self.chunk_error(e))? {
            self.check_size(bytes.len() + chunk.len())?;
            bytes.extend_from_slice(&chunk);
        }

        if bytes.is_empty() {
            return Err(UploadError::Malformed("uploaded file is empty".to_string()));
        }

        Ok(PendingUpload { extension, bytes })
    }

    /// A stream cut off by the request body limit is reported as an
    /// oversized file rather than a broken one.
    fn chunk_error(&self, err: MultipartError) -> UploadError {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            UploadError::TooLarge {
                max_bytes: self.max_bytes,
            }
        } else {
            UploadError::Malformed(err.body_text())
        }
    }

    /// Write a validated upload under a fresh name and return its reference path
    pub async fn store(&self, upload: &PendingUpload) -> Result<String, UploadError> {
        let file_name = Self::generate_file_name(&upload.extension);
        let path = self.dir.join(&file_name);

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        file.write_all(&upload.bytes).await?;
        file.flush().await?;

        tracing::debug!("Stored upload {} ({} bytes)", file_name, upload.bytes.len());
        Ok(format!("{}/{}", self.public_path, file_name))
    }

    /// Delete a previously stored file by its reference path. References that
    /// do not point directly into the upload directory are ignored.
    pub async fn remove(&self, reference: &str) {
        let Some(file_name) = self.file_name_for(reference) else {
            tracing::warn!("Refusing to remove upload outside upload dir: {}", reference);
            return;
        };

        if let Err(e) = tokio::fs::remove_file(self.dir.join(file_name)).await {
            tracing::warn!("Failed to remove upload {}: {}", reference, e);
        }
    }

    fn file_name_for<'a>(&self, reference: &'a str) -> Option<&'a str> {
        let file_name = reference
            .strip_prefix(self.public_path.as_str())?
            .strip_prefix('/')?;
        let is_plain = !file_name.is_empty()
            && !file_name.contains('/')
            && !file_name.contains('\\')
            && file_name != ".."
            && file_name != ".";
        is_plain.then_some(file_name)
    }
}
