//! Running one of the ML service's analyses over a project.

use std::fmt;
use std::str::FromStr;

use lumen_dispatch::Call;
use lumen_workflow::StepDef;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::non_blank;
use crate::error::ValidationError;
use crate::flow::Flow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MlStep {
  AnalysisType,
  Columns,
  Execute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MlAnalysisType {
  Regression,
  Classification,
  Clustering,
  Anomaly,
}

impl MlAnalysisType {
  pub const ALL: [MlAnalysisType; 4] = [
    MlAnalysisType::Regression,
    MlAnalysisType::Classification,
    MlAnalysisType::Clustering,
    MlAnalysisType::Anomaly,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      MlAnalysisType::Regression => "regression",
      MlAnalysisType::Classification => "classification",
      MlAnalysisType::Clustering => "clustering",
      MlAnalysisType::Anomaly => "anomaly",
    }
  }

  /// Supervised analyses predict a target column.
  pub fn requires_target(&self) -> bool {
    matches!(self, MlAnalysisType::Regression | MlAnalysisType::Classification)
  }
}

impl fmt::Display for MlAnalysisType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for MlAnalysisType {
  type Err = ValidationError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let normalized = s.trim().to_ascii_lowercase();
    Self::ALL
      .into_iter()
      .find(|t| t.as_str() == normalized)
      .ok_or_else(|| {
        ValidationError::invalid(
          "analysis type",
          format!(
            "'{}' is not one of regression, classification, clustering, anomaly",
            s
          ),
        )
      })
  }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct MlAnalysisRequest {
  pub analysis_type: Option<MlAnalysisType>,
  pub target_column: Option<String>,
  pub features: Vec<String>,
  /// Passed through to the ML service untouched.
  pub parameters: Map<String, Value>,
}

impl MlAnalysisRequest {
  pub fn target(&self) -> Option<&str> {
    non_blank(self.target_column.as_deref())
  }

  /// Trimmed, non-blank feature columns. Empty lets the ML service pick every
  /// numeric column (minus the target).
  pub fn feature_columns(&self) -> Vec<&str> {
    self
      .features
      .iter()
      .map(|f| f.trim())
      .filter(|f| !f.is_empty())
      .collect()
  }
}

fn columns_problem(request: &MlAnalysisRequest) -> Option<ValidationError> {
  let analysis_type = request.analysis_type?;
  if !analysis_type.requires_target() {
    return None;
  }
  match request.target() {
    None => Some(ValidationError::missing("target column")),
    Some(target) if request.feature_columns().contains(&target) => {
      Some(ValidationError::invalid(
        "target column",
        format!("'{}' is also listed as a feature", target),
      ))
    }
    Some(_) => None,
  }
}

#[derive(Debug, Clone)]
pub struct MlAnalysisFlow {
  project_id: String,
}

impl MlAnalysisFlow {
  pub fn new(project_id: impl Into<String>) -> Self {
    Self {
      project_id: project_id.into(),
    }
  }
}

impl Flow for MlAnalysisFlow {
  type Step = MlStep;
  type Request = MlAnalysisRequest;

  fn name(&self) -> &'static str {
    "ml_analysis"
  }

  fn steps(&self) -> Vec<StepDef<MlStep, MlAnalysisRequest>> {
    vec![
      StepDef::new(MlStep::AnalysisType, "analysis type", |r: &MlAnalysisRequest| {
        r.analysis_type.is_some()
      }),
      StepDef::new(MlStep::Columns, "columns", |r: &MlAnalysisRequest| {
        columns_problem(r).is_none()
      }),
      StepDef::always(MlStep::Execute, "execute"),
    ]
  }

  fn build_call(&self, request: &MlAnalysisRequest) -> Result<Call, ValidationError> {
    let analysis_type = request
      .analysis_type
      .ok_or_else(|| ValidationError::missing("analysis type"))?;
    if let Some(problem) = columns_problem(request) {
      return Err(problem);
    }

    let mut body = json!({
      "projectId": self.project_id,
      "analysisType": analysis_type,
      "targetColumn": request.target(),
      "parameters": request.parameters,
    });

    let features = request.feature_columns();
    if !features.is_empty() {
      body["features"] = json!(features);
    }

    Ok(Call::post_json("/api/ml/run-analysis", body))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_supervised_needs_target() {
    let mut r = MlAnalysisRequest {
      analysis_type: Some(MlAnalysisType::Regression),
      features: vec!["spend".into(), "visits".into()],
      ..Default::default()
    };
    assert_eq!(
      columns_problem(&r),
      Some(ValidationError::missing("target column"))
    );

    r.target_column = Some("spend".into());
    assert!(matches!(
      columns_problem(&r),
      Some(ValidationError::Invalid { .. })
    ));

    r.target_column = Some("revenue".into());
    assert_eq!(columns_problem(&r), None);
  }

  #[test]
  fn test_clustering_without_target() {
    let r = MlAnalysisRequest {
      analysis_type: Some(MlAnalysisType::Clustering),
      features: vec!["a".into(), "b".into()],
      ..Default::default()
    };
    let call = MlAnalysisFlow::new("p1").build_call(&r).unwrap();
    assert_eq!(call.path, "/api/ml/run-analysis");
    assert_eq!(
      call.json().unwrap(),
      &json!({
        "projectId": "p1",
        "analysisType": "clustering",
        "targetColumn": null,
        "features": ["a", "b"],
        "parameters": {}
      })
    );
  }

  #[test]
  fn test_padded_feature_matching_target_is_rejected() {
    let r = MlAnalysisRequest {
      analysis_type: Some(MlAnalysisType::Regression),
      target_column: Some("spend".into()),
      features: vec![" spend".into(), "visits".into()],
      ..Default::default()
    };
    assert!(matches!(
      MlAnalysisFlow::new("p1").build_call(&r),
      Err(ValidationError::Invalid { .. })
    ));

    let steps = MlAnalysisFlow::new("p1").steps();
    assert!(!steps[1].is_complete(&r));
  }

  #[test]
  fn test_features_are_optional() {
    let flow = MlAnalysisFlow::new("p1");

    let r = MlAnalysisRequest {
      analysis_type: Some(MlAnalysisType::Anomaly),
      features: vec!["  ".into()],
      ..Default::default()
    };
    let call = flow.build_call(&r).unwrap();
    assert_eq!(
      call.json().unwrap(),
      &json!({
        "projectId": "p1",
        "analysisType": "anomaly",
        "targetColumn": null,
        "parameters": {}
      })
    );

    // Supervised types still need a target when features are left to the server.
    let r = MlAnalysisRequest {
      analysis_type: Some(MlAnalysisType::Classification),
      target_column: Some("churned".into()),
      ..Default::default()
    };
    let body = flow.build_call(&r).unwrap().json().cloned().unwrap();
    assert_eq!(body["targetColumn"], "churned");
    assert!(body.get("features").is_none());
  }

  #[test]
  fn test_parse_type() {
    assert_eq!(
      " Classification ".parse::<MlAnalysisType>().unwrap(),
      MlAnalysisType::Classification
    );
    assert!("forecast".parse::<MlAnalysisType>().is_err());
  }
}
