//! Free-trial file upload.
//!
//! The file is checked against the trial tier's limits before anything is
//! sent. The server answers with either analysis results or a request for a
//! PII decision, which continues in [`PiiDecisionFlow`](super::pii_decision::PiiDecisionFlow).

use std::path::Path;

use lumen_config::TierLimits;
use lumen_dispatch::{AnalysisResult, ArtifactError, Call, UploadArtifact};
use lumen_workflow::StepDef;

use super::non_blank;
use crate::error::{RunError, ValidationError};
use crate::flow::Flow;

/// File extensions the trial upload accepts.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["csv", "json", "xlsx", "xls"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialUploadStep {
  Select,
  Upload,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct TrialUploadRequest {
  pub artifact: Option<UploadArtifact>,
  /// Project name. Defaults to the file name.
  pub name: Option<String>,
  pub questions: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct TrialUploadFlow {
  limits: TierLimits,
}

impl TrialUploadFlow {
  pub fn new(limits: TierLimits) -> Self {
    Self { limits }
  }

  pub fn limits(&self) -> &TierLimits {
    &self.limits
  }

  /// Load a file for upload, refusing anything over the tier's size limit
  /// before its contents are read.
  pub async fn open(&self, path: &Path) -> Result<UploadArtifact, RunError> {
    UploadArtifact::from_path_with_limit(path, self.limits.max_file_size_bytes)
      .await
      .map_err(|e| match e {
        ArtifactError::TooLarge { name, size, limit } => {
          ValidationError::FileTooLarge { name, size, limit }.into()
        }
        other => RunError::Artifact(other),
      })
  }

  /// The temp file id when the server held the upload back for a PII decision.
  pub fn pending_pii_decision(result: &AnalysisResult) -> Option<String> {
    if !result.bool_field("requiresPIIDecision").unwrap_or(false) {
      return None;
    }
    result.str_field("tempFileId").map(str::to_string)
  }

  fn check(&self, artifact: &UploadArtifact) -> Result<(), ValidationError> {
    if !self.limits.allows_file_size(artifact.size) {
      return Err(ValidationError::FileTooLarge {
        name: artifact.name.clone(),
        size: artifact.size,
        limit: self.limits.max_file_size_bytes,
      });
    }

    let supported = artifact
      .extension()
      .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()));
    if !supported {
      return Err(ValidationError::UnsupportedFileType {
        name: artifact.name.clone(),
        expected: SUPPORTED_EXTENSIONS.join(", "),
      });
    }

    Ok(())
  }
}

impl Flow for TrialUploadFlow {
  type Step = TrialUploadStep;
  type Request = TrialUploadRequest;

  fn name(&self) -> &'static str {
    "trial_upload"
  }

  fn steps(&self) -> Vec<StepDef<TrialUploadStep, TrialUploadRequest>> {
    vec![
      StepDef::new(TrialUploadStep::Select, "select file", |r: &TrialUploadRequest| {
        r.artifact.is_some()
      }),
      StepDef::always(TrialUploadStep::Upload, "upload"),
    ]
  }

  fn build_call(&self, request: &TrialUploadRequest) -> Result<Call, ValidationError> {
    let artifact = request
      .artifact
      .as_ref()
      .ok_or_else(|| ValidationError::missing("file"))?;
    self.check(artifact)?;

    let name = non_blank(request.name.as_deref())
      .unwrap_or(artifact.name.as_str())
      .to_string();
    let questions = request
      .questions
      .iter()
      .map(|q| q.trim())
      .filter(|q| !q.is_empty())
      .collect::<Vec<_>>()
      .join("\n");

    let fields = vec![
      ("name".to_string(), name),
      ("questions".to_string(), questions),
      ("trial".to_string(), "true".to_string()),
    ];

    Ok(Call::post_multipart("/api/upload", artifact.clone(), fields))
  }

  fn on_success(&self, request: &mut TrialUploadRequest) {
    request.artifact = None;
  }
}
