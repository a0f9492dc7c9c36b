//! Guided step-by-step analysis: goal, analysis, variables, run.

use std::fmt;
use std::str::FromStr;

use lumen_dispatch::Call;
use lumen_workflow::StepDef;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::non_blank;
use crate::error::ValidationError;
use crate::flow::Flow;

const DEFAULT_TEST_SIZE: f64 = 0.2;
const DEFAULT_CROSS_VALIDATION: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuidedStep {
  Goal,
  Analysis,
  Variables,
  Execute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuidedAnalysisType {
  Anova,
  Ancova,
  Regression,
  MachineLearning,
  Comprehensive,
}

impl GuidedAnalysisType {
  pub const ALL: [GuidedAnalysisType; 5] = [
    GuidedAnalysisType::Anova,
    GuidedAnalysisType::Ancova,
    GuidedAnalysisType::Regression,
    GuidedAnalysisType::MachineLearning,
    GuidedAnalysisType::Comprehensive,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      GuidedAnalysisType::Anova => "anova",
      GuidedAnalysisType::Ancova => "ancova",
      GuidedAnalysisType::Regression => "regression",
      GuidedAnalysisType::MachineLearning => "machine_learning",
      GuidedAnalysisType::Comprehensive => "comprehensive",
    }
  }

  /// Everything except the comprehensive overview works on chosen variables.
  pub fn needs_variables(&self) -> bool {
    !matches!(self, GuidedAnalysisType::Comprehensive)
  }
}

impl fmt::Display for GuidedAnalysisType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for GuidedAnalysisType {
  type Err = ValidationError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
    Self::ALL
      .into_iter()
      .find(|t| t.as_str() == normalized)
      .ok_or_else(|| {
        ValidationError::invalid(
          "analysis type",
          format!(
            "'{}' is not one of anova, ancova, regression, machine_learning, comprehensive",
            s
          ),
        )
      })
  }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
  #[default]
  RandomForest,
  Linear,
}

impl FromStr for Algorithm {
  type Err = ValidationError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
      "random_forest" => Ok(Algorithm::RandomForest),
      "linear" => Ok(Algorithm::Linear),
      other => Err(ValidationError::invalid(
        "algorithm",
        format!("'{}' is not one of random_forest, linear", other),
      )),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GuidedAnalysisRequest {
  pub goal: String,
  pub questions: Vec<String>,
  pub analysis_type: Option<GuidedAnalysisType>,
  /// Dependent variable for statistical types, target for machine learning.
  pub target: Option<String>,
  /// Independent variables, or features for machine learning.
  pub features: Vec<String>,
  pub algorithm: Algorithm,
  pub test_size: f64,
  pub cross_validation: u32,
}

impl Default for GuidedAnalysisRequest {
  fn default() -> Self {
    Self {
      goal: String::new(),
      questions: Vec::new(),
      analysis_type: None,
      target: None,
      features: Vec::new(),
      algorithm: Algorithm::default(),
      test_size: DEFAULT_TEST_SIZE,
      cross_validation: DEFAULT_CROSS_VALIDATION,
    }
  }
}

impl GuidedAnalysisRequest {
  fn target_column(&self) -> Option<&str> {
    non_blank(self.target.as_deref())
  }

  fn feature_columns(&self) -> Vec<&str> {
    self
      .features
      .iter()
      .map(|f| f.trim())
      .filter(|f| !f.is_empty())
      .collect()
  }
}

fn variables_problem(request: &GuidedAnalysisRequest) -> Option<ValidationError> {
  let analysis_type = request.analysis_type?;
  if !analysis_type.needs_variables() {
    return None;
  }

  let Some(target) = request.target_column() else {
    return Some(ValidationError::missing("dependent variable"));
  };
  let features = request.feature_columns();
  if features.is_empty() {
    return Some(ValidationError::missing("independent variables"));
  }
  if features.contains(&target) {
    return Some(ValidationError::invalid(
      "dependent variable",
      format!("'{}' is also an independent variable", target),
    ));
  }

  if analysis_type == GuidedAnalysisType::MachineLearning {
    if !(request.test_size > 0.0 && request.test_size < 1.0) {
      return Some(ValidationError::invalid(
        "test size",
        format!("{} must be between 0 and 1", request.test_size),
      ));
    }
    if request.cross_validation < 2 {
      return Some(ValidationError::invalid(
        "cross validation",
        format!("{} folds, at least 2 are needed", request.cross_validation),
      ));
    }
  }

  None
}

#[derive(Debug, Clone)]
pub struct GuidedAnalysisFlow {
  project_id: String,
}

impl GuidedAnalysisFlow {
  pub fn new(project_id: impl Into<String>) -> Self {
    Self {
      project_id: project_id.into(),
    }
  }
}

impl Flow for GuidedAnalysisFlow {
  type Step = GuidedStep;
  type Request = GuidedAnalysisRequest;

  fn name(&self) -> &'static str {
    "guided_analysis"
  }

  fn steps(&self) -> Vec<StepDef<GuidedStep, GuidedAnalysisRequest>> {
    vec![
      StepDef::new(GuidedStep::Goal, "goal", |r: &GuidedAnalysisRequest| {
        !r.goal.trim().is_empty()
      }),
      StepDef::new(GuidedStep::Analysis, "analysis type", |r: &GuidedAnalysisRequest| {
        r.analysis_type.is_some()
      }),
      StepDef::new(GuidedStep::Variables, "variables", |r: &GuidedAnalysisRequest| {
        variables_problem(r).is_none()
      }),
      StepDef::always(GuidedStep::Execute, "execute"),
    ]
  }

  fn build_call(&self, request: &GuidedAnalysisRequest) -> Result<Call, ValidationError> {
    let goal = request.goal.trim();
    if goal.is_empty() {
      return Err(ValidationError::missing("goal"));
    }
    let analysis_type = request
      .analysis_type
      .ok_or_else(|| ValidationError::missing("analysis type"))?;
    if let Some(problem) = variables_problem(request) {
      return Err(problem);
    }

    let mut body = json!({
      "projectId": self.project_id,
      "goal": goal,
      "questions": request.questions,
      "analysisType": analysis_type,
    });

    let extra = match analysis_type {
      GuidedAnalysisType::Comprehensive => None,
      GuidedAnalysisType::MachineLearning => Some(json!({
        "targetVariable": request.target_column(),
        "features": request.feature_columns(),
        "algorithm": request.algorithm,
        "testSize": request.test_size,
        "crossValidation": request.cross_validation,
      })),
      _ => Some(json!({
        "dependentVariable": request.target_column(),
        "independentVariables": request.feature_columns(),
      })),
    };

    if let (Some(Value::Object(extra)), Value::Object(body)) = (extra, &mut body) {
      body.extend(extra);
    }

    Ok(Call::post_json("/api/step-by-step-analysis", body))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn request(analysis_type: GuidedAnalysisType) -> GuidedAnalysisRequest {
    GuidedAnalysisRequest {
      goal: "Why did churn rise?".into(),
      analysis_type: Some(analysis_type),
      target: Some("churn".into()),
      features: vec!["tenure".into(), "plan".into()],
      ..Default::default()
    }
  }

  #[test]
  fn test_comprehensive_needs_no_variables() {
    let r = GuidedAnalysisRequest {
      goal: "overview".into(),
      analysis_type: Some(GuidedAnalysisType::Comprehensive),
      ..Default::default()
    };
    let call = GuidedAnalysisFlow::new("p1").build_call(&r).unwrap();
    assert_eq!(
      call.json().unwrap(),
      &json!({
        "projectId": "p1",
        "goal": "overview",
        "questions": [],
        "analysisType": "comprehensive"
      })
    );
  }

  #[test]
  fn test_statistical_body() {
    let call = GuidedAnalysisFlow::new("p1")
      .build_call(&request(GuidedAnalysisType::Anova))
      .unwrap();
    let body = call.json().unwrap();
    assert_eq!(body["dependentVariable"], "churn");
    assert_eq!(body["independentVariables"], json!(["tenure", "plan"]));
    assert!(body.get("algorithm").is_none());
  }

  #[test]
  fn test_machine_learning_body_uses_defaults() {
    let call = GuidedAnalysisFlow::new("p1")
      .build_call(&request(GuidedAnalysisType::MachineLearning))
      .unwrap();
    let body = call.json().unwrap();
    assert_eq!(body["targetVariable"], "churn");
    assert_eq!(body["features"], json!(["tenure", "plan"]));
    assert_eq!(body["algorithm"], "random_forest");
    assert_eq!(body["testSize"], 0.2);
    assert_eq!(body["crossValidation"], 5);
    assert!(body.get("dependentVariable").is_none());
  }

  #[test]
  fn test_variable_rules() {
    let mut r = request(GuidedAnalysisType::Regression);
    r.features.push("churn".into());
    assert!(matches!(
      variables_problem(&r),
      Some(ValidationError::Invalid { .. })
    ));

    let mut r = request(GuidedAnalysisType::Ancova);
    r.features.clear();
    assert_eq!(
      variables_problem(&r),
      Some(ValidationError::missing("independent variables"))
    );

    let mut r = request(GuidedAnalysisType::MachineLearning);
    r.test_size = 1.0;
    assert!(variables_problem(&r).is_some());
    r.test_size = 0.3;
    r.cross_validation = 1;
    assert!(variables_problem(&r).is_some());
    r.cross_validation = 3;
    assert!(variables_problem(&r).is_none());
  }

  #[test]
  fn test_parse_type_accepts_dashes() {
    assert_eq!(
      "machine-learning".parse::<GuidedAnalysisType>().unwrap(),
      GuidedAnalysisType::MachineLearning
    );
    assert_eq!("Linear".parse::<Algorithm>().unwrap(), Algorithm::Linear);
  }
}
