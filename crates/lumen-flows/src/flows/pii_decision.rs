//! Answering the server's PII question about a held trial upload.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use lumen_dispatch::Call;
use lumen_workflow::StepDef;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::ValidationError;
use crate::flow::Flow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PiiStep {
  Decide,
  Submit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PiiDecision {
  /// Keep the detected columns.
  Include,
  /// Drop the detected columns, or only the listed ones.
  Exclude,
}

impl PiiDecision {
  pub fn as_str(&self) -> &'static str {
    match self {
      PiiDecision::Include => "include",
      PiiDecision::Exclude => "exclude",
    }
  }
}

impl fmt::Display for PiiDecision {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for PiiDecision {
  type Err = ValidationError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "include" => Ok(PiiDecision::Include),
      "exclude" => Ok(PiiDecision::Exclude),
      other => Err(ValidationError::invalid(
        "pii decision",
        format!("'{}' is not one of include, exclude", other),
      )),
    }
  }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct PiiDecisionRequest {
  pub decision: Option<PiiDecision>,
  /// Columns to drop on `Exclude`. Empty means every detected column.
  pub excluded_columns: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PiiDecisionFlow {
  temp_file_id: String,
  timeout: Duration,
}

impl PiiDecisionFlow {
  pub fn new(temp_file_id: impl Into<String>, timeout: Duration) -> Self {
    Self {
      temp_file_id: temp_file_id.into(),
      timeout,
    }
  }

  pub fn temp_file_id(&self) -> &str {
    &self.temp_file_id
  }
}

impl Flow for PiiDecisionFlow {
  type Step = PiiStep;
  type Request = PiiDecisionRequest;

  fn name(&self) -> &'static str {
    "pii_decision"
  }

  fn steps(&self) -> Vec<StepDef<PiiStep, PiiDecisionRequest>> {
    vec![
      StepDef::new(PiiStep::Decide, "decide", |r: &PiiDecisionRequest| {
        r.decision.is_some()
      }),
      StepDef::always(PiiStep::Submit, "submit"),
    ]
  }

  fn build_call(&self, request: &PiiDecisionRequest) -> Result<Call, ValidationError> {
    if self.temp_file_id.trim().is_empty() {
      return Err(ValidationError::missing("temp file id"));
    }
    let decision = request
      .decision
      .ok_or_else(|| ValidationError::missing("pii decision"))?;

    let excluded: Vec<&str> = match decision {
      PiiDecision::Include => Vec::new(),
      PiiDecision::Exclude => request
        .excluded_columns
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect(),
    };

    let body = json!({
      "tempFileId": self.temp_file_id,
      "decision": decision,
      "excludedColumns": excluded,
    });

    Ok(Call::post_json("/api/trial-pii-decision", body).with_timeout(self.timeout))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn flow() -> PiiDecisionFlow {
    PiiDecisionFlow::new("tmp-1", Duration::from_secs(60))
  }

  #[test]
  fn test_exclude_sends_listed_columns() {
    let request = PiiDecisionRequest {
      decision: Some(PiiDecision::Exclude),
      excluded_columns: vec!["email".into(), "".into(), "phone".into()],
    };
    let call = flow().build_call(&request).unwrap();
    assert_eq!(call.path, "/api/trial-pii-decision");
    assert_eq!(call.timeout, Some(Duration::from_secs(60)));
    assert_eq!(
      call.json().unwrap(),
      &json!({
        "tempFileId": "tmp-1",
        "decision": "exclude",
        "excludedColumns": ["email", "phone"]
      })
    );
  }

  #[test]
  fn test_include_ignores_column_list() {
    let request = PiiDecisionRequest {
      decision: Some(PiiDecision::Include),
      excluded_columns: vec!["email".into()],
    };
    let call = flow().build_call(&request).unwrap();
    assert_eq!(call.json().unwrap()["excludedColumns"], json!([]));
  }

  #[test]
  fn test_decision_required() {
    assert_eq!(
      flow().build_call(&PiiDecisionRequest::default()),
      Err(ValidationError::missing("pii decision"))
    );
    assert!("maybe".parse::<PiiDecision>().is_err());
  }
}
