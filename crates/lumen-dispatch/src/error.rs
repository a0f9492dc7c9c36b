use std::path::PathBuf;

use thiserror::Error;

/// Failures below the HTTP layer: connection, DNS, TLS, body encoding.
#[derive(Debug, Error)]
pub enum TransportError {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("invalid request path '{path}': {message}")]
  InvalidPath { path: String, message: String },

  /// The server could not be reached at all.
  #[error("connection failed: {0}")]
  Connection(String),
}

/// Failures loading a file for upload.
#[derive(Debug, Error)]
pub enum ArtifactError {
  #[error("failed to read {path}: {source}")]
  Io {
    path: PathBuf,
    source: std::io::Error,
  },

  /// The file is over the caller's limit. Nothing past the limit was read.
  #[error("{name} is {size} bytes, the limit is {limit} bytes")]
  TooLarge { name: String, size: u64, limit: u64 },
}

/// Errors returned by [`crate::Dispatcher::dispatch`].
#[derive(Debug, Error)]
pub enum DispatchError {
  /// The server answered with a non-2xx status.
  #[error("{message} (status {status})")]
  Server { status: u16, message: String },

  /// The request never produced a response.
  #[error("network error: {0}")]
  Network(#[from] TransportError),

  /// The call's timeout elapsed and the request was abandoned.
  #[error("processing timeout after {timeout_ms}ms")]
  Timeout { timeout_ms: u64 },

  #[error("request cancelled")]
  Cancelled,

  /// A 2xx response whose body is not JSON.
  #[error("invalid response from server: {0}")]
  InvalidResponse(String),

  #[error("invalid client configuration: {0}")]
  Config(#[from] lumen_config::ConfigError),
}

impl DispatchError {
  /// HTTP status, if the server answered.
  pub fn status(&self) -> Option<u16> {
    match self {
      DispatchError::Server { status, .. } => Some(*status),
      _ => None,
    }
  }

  pub fn is_timeout(&self) -> bool {
    matches!(self, DispatchError::Timeout { .. })
  }
}
