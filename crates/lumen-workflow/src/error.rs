use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
  #[error("workflow has no steps")]
  NoSteps,

  #[error("duplicate step: {0}")]
  DuplicateStep(String),

  #[error("cannot submit from step '{step}', submission happens at the last step")]
  NotAtTerminalStep { step: String },

  #[error("step '{step}' is incomplete")]
  Incomplete { step: String },

  #[error("a submission is already in flight")]
  AlreadyExecuting,

  #[error("submission already settled, retry or reset first")]
  Settled,

  #[error("no submission is in flight")]
  NotExecuting,

  #[error("only a failed submission can be retried")]
  NotFailed,
}
