use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config: {0}")]
  Parse(#[from] serde_json::Error),

  #[error("invalid base url '{url}': {message}")]
  InvalidBaseUrl { url: String, message: String },

  #[error("unknown journey type: {0}")]
  UnknownJourney(String),

  #[error("unknown tier: {0}")]
  UnknownTier(String),

  #[error("tier '{0}' is configured more than once")]
  DuplicateTier(String),
}
