use lumen_dispatch::{ArtifactError, DispatchError};
use lumen_workflow::WorkflowError;
use thiserror::Error;

/// Client-side validation failures. Raised before any request is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("{field} is required")]
  Missing { field: String },

  #[error("invalid {field}: {message}")]
  Invalid { field: String, message: String },

  #[error("file too large: {name} is {size} bytes, the limit is {limit} bytes")]
  FileTooLarge { name: String, size: u64, limit: u64 },

  #[error("unsupported file type: {name} (expected one of: {expected})")]
  UnsupportedFileType { name: String, expected: String },
}

impl ValidationError {
  pub fn missing(field: impl Into<String>) -> Self {
    Self::Missing {
      field: field.into(),
    }
  }

  pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
    Self::Invalid {
      field: field.into(),
      message: message.into(),
    }
  }
}

/// Errors from driving a flow.
#[derive(Debug, Error)]
pub enum RunError {
  #[error(transparent)]
  Validation(#[from] ValidationError),

  #[error(transparent)]
  Workflow(#[from] WorkflowError),

  #[error(transparent)]
  Dispatch(#[from] DispatchError),

  #[error(transparent)]
  Artifact(#[from] ArtifactError),

  /// `drive_to_terminal` could not get past a step.
  #[error("cannot continue past step '{step}': it is incomplete")]
  Blocked { step: String },
}

impl RunError {
  /// Whether a request reached (or tried to reach) the server.
  pub fn is_dispatch(&self) -> bool {
    matches!(self, RunError::Dispatch(_))
  }
}
