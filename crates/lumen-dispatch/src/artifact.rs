//! Files chosen for upload.

use std::fmt;
use std::path::Path;

use bytes::Bytes;
use tokio::io::AsyncReadExt;

use crate::error::ArtifactError;

/// A file held in memory until it is uploaded.
#[derive(Clone, PartialEq)]
pub struct UploadArtifact {
  pub name: String,
  pub size: u64,
  pub mime_type: String,
  bytes: Bytes,
}

impl UploadArtifact {
  /// Wrap in-memory content. The MIME type is derived from the file name.
  pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
    let name = name.into();
    let bytes = bytes.into();
    let mime_type = extension_of(&name)
      .map(|ext| mime_for_extension(&ext))
      .unwrap_or("application/octet-stream")
      .to_string();

    Self {
      size: bytes.len() as u64,
      name,
      mime_type,
      bytes,
    }
  }

  /// Read a file from disk.
  pub async fn from_path(path: &Path) -> std::io::Result<Self> {
    let bytes = tokio::fs::read(path).await?;
    Ok(Self::new(file_name(path), bytes))
  }

  /// Read a file from disk unless it is larger than `limit` bytes.
  ///
  /// The size is taken from the file's metadata before anything is read, and
  /// the read itself stops one byte past the limit in case the file grows.
  pub async fn from_path_with_limit(path: &Path, limit: u64) -> Result<Self, ArtifactError> {
    let io_error = |source: std::io::Error| ArtifactError::Io {
      path: path.to_path_buf(),
      source,
    };

    let file = tokio::fs::File::open(path).await.map_err(io_error)?;
    let size = file.metadata().await.map_err(io_error)?.len();
    if size > limit {
      return Err(ArtifactError::TooLarge {
        name: file_name(path),
        size,
        limit,
      });
    }

    let mut bytes = Vec::with_capacity(size as usize);
    file
      .take(limit.saturating_add(1))
      .read_to_end(&mut bytes)
      .await
      .map_err(io_error)?;
    if bytes.len() as u64 > limit {
      return Err(ArtifactError::TooLarge {
        name: file_name(path),
        size: bytes.len() as u64,
        limit,
      });
    }

    Ok(Self::new(file_name(path), bytes))
  }

  /// Lowercased extension without the dot.
  pub fn extension(&self) -> Option<String> {
    extension_of(&self.name)
  }

  pub fn bytes(&self) -> &Bytes {
    &self.bytes
  }
}

// Content is left out so a large upload does not flood logs.
impl fmt::Debug for UploadArtifact {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("UploadArtifact")
      .field("name", &self.name)
      .field("size", &self.size)
      .field("mime_type", &self.mime_type)
      .finish_non_exhaustive()
  }
}

fn file_name(path: &Path) -> String {
  path
    .file_name()
    .and_then(|n| n.to_str())
    .unwrap_or("upload")
    .to_string()
}

fn extension_of(name: &str) -> Option<String> {
  Path::new(name)
    .extension()
    .and_then(|e| e.to_str())
    .map(|e| e.to_ascii_lowercase())
}

/// MIME type for a lowercased file extension.
pub fn mime_for_extension(ext: &str) -> &'static str {
  match ext {
    "csv" => "text/csv",
    "json" => "application/json",
    "txt" => "text/plain",
    "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "xls" => "application/vnd.ms-excel",
    _ => "application/octet-stream",
  }
}
