//! Joining the current dataset with one or more others.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use lumen_dispatch::Call;
use lumen_workflow::StepDef;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::non_blank;
use crate::error::ValidationError;
use crate::flow::Flow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinStep {
  Select,
  Strategy,
  Columns,
  Execute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinType {
  Inner,
  Left,
  Right,
  Outer,
}

impl JoinType {
  pub fn as_str(&self) -> &'static str {
    match self {
      JoinType::Inner => "inner",
      JoinType::Left => "left",
      JoinType::Right => "right",
      JoinType::Outer => "outer",
    }
  }
}

impl fmt::Display for JoinType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for JoinType {
  type Err = ValidationError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "inner" => Ok(JoinType::Inner),
      "left" => Ok(JoinType::Left),
      "right" => Ok(JoinType::Right),
      "outer" | "full" => Ok(JoinType::Outer),
      other => Err(ValidationError::invalid(
        "join type",
        format!("'{}' is not one of inner, left, right, outer", other),
      )),
    }
  }
}

/// What the user has picked so far.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct JoinRequest {
  /// Datasets to join with the current one, in selection order.
  pub datasets: Vec<String>,
  pub join_type: Option<JoinType>,
  /// Join column per dataset id, the current dataset included.
  pub join_keys: BTreeMap<String, String>,
}

impl JoinRequest {
  /// Add a dataset. Selecting one twice is a no-op.
  pub fn select(&mut self, dataset_id: impl Into<String>) {
    let id = dataset_id.into();
    if !self.datasets.contains(&id) {
      self.datasets.push(id);
    }
  }

  /// Remove a dataset and forget its join key.
  pub fn deselect(&mut self, dataset_id: &str) {
    self.datasets.retain(|d| d != dataset_id);
    self.join_keys.remove(dataset_id);
  }

  pub fn set_key(&mut self, dataset_id: impl Into<String>, column: impl Into<String>) {
    self.join_keys.insert(dataset_id.into(), column.into());
  }

  fn key_for(&self, dataset_id: &str) -> Option<&str> {
    non_blank(self.join_keys.get(dataset_id).map(String::as_str))
  }
}

/// Join workflow for the dataset `current_project`.
#[derive(Debug, Clone)]
pub struct JoinFlow {
  current_project: String,
}

impl JoinFlow {
  pub fn new(current_project: impl Into<String>) -> Self {
    Self {
      current_project: current_project.into(),
    }
  }

  pub fn current_project(&self) -> &str {
    &self.current_project
  }

  /// True once at least one other dataset is selected and every dataset in
  /// the join, the current one included, has a join column.
  pub fn can_perform_join(&self, request: &JoinRequest) -> bool {
    can_perform_join(&self.current_project, request)
  }
}

fn has_valid_selection(current: &str, request: &JoinRequest) -> bool {
  !request.datasets.is_empty()
    && request
      .datasets
      .iter()
      .all(|d| !d.trim().is_empty() && d != current)
}

fn can_perform_join(current: &str, request: &JoinRequest) -> bool {
  has_valid_selection(current, request)
    && request.key_for(current).is_some()
    && request.datasets.iter().all(|d| request.key_for(d).is_some())
}

impl Flow for JoinFlow {
  type Step = JoinStep;
  type Request = JoinRequest;

  fn name(&self) -> &'static str {
    "join"
  }

  fn steps(&self) -> Vec<StepDef<JoinStep, JoinRequest>> {
    let select_current = self.current_project.clone();
    let columns_current = self.current_project.clone();

    vec![
      StepDef::new(JoinStep::Select, "select datasets", move |r: &JoinRequest| {
        has_valid_selection(&select_current, r)
      }),
      StepDef::new(JoinStep::Strategy, "join type", |r: &JoinRequest| {
        r.join_type.is_some()
      }),
      StepDef::new(JoinStep::Columns, "join keys", move |r: &JoinRequest| {
        can_perform_join(&columns_current, r)
      }),
      StepDef::always(JoinStep::Execute, "execute"),
    ]
  }

  fn build_call(&self, request: &JoinRequest) -> Result<Call, ValidationError> {
    let current = self.current_project.as_str();

    if request.datasets.is_empty() {
      return Err(ValidationError::missing("datasets to join"));
    }
    if let Some(d) = request.datasets.iter().find(|d| d.as_str() == current) {
      return Err(ValidationError::invalid(
        "datasets to join",
        format!("'{}' is the current dataset", d),
      ));
    }
    let join_type = request
      .join_type
      .ok_or_else(|| ValidationError::missing("join type"))?;

    let mut join_keys = BTreeMap::new();
    for id in request.datasets.iter().map(String::as_str).chain([current]) {
      let key = request
        .key_for(id)
        .ok_or_else(|| ValidationError::missing(format!("join key for {}", id)))?;
      join_keys.insert(id.to_string(), key.to_string());
    }

    let body = json!({
      "joinWithProjects": request.datasets,
      "joinType": join_type,
      "joinKeys": join_keys,
    });

    Ok(Call::post_json(
      format!("/api/join-datasets/{}", current),
      body,
    ))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn filled() -> JoinRequest {
    let mut r = JoinRequest::default();
    r.select("p2");
    r.join_type = Some(JoinType::Inner);
    r.set_key("p1", "customer_id");
    r.set_key("p2", "customer_id");
    r
  }

  #[test]
  fn test_can_perform_join_needs_every_key() {
    let flow = JoinFlow::new("p1");
    let mut r = JoinRequest::default();
    r.select("p2");
    assert!(!flow.can_perform_join(&r));

    r.set_key("p2", "customer_id");
    assert!(!flow.can_perform_join(&r));

    r.set_key("p1", "  ");
    assert!(!flow.can_perform_join(&r));

    r.set_key("p1", "customer_id");
    assert!(flow.can_perform_join(&r));
  }

  #[test]
  fn test_selecting_current_dataset_is_invalid() {
    let flow = JoinFlow::new("p1");
    let mut r = filled();
    r.select("p1");
    assert!(!flow.can_perform_join(&r));
    assert!(matches!(
      flow.build_call(&r),
      Err(ValidationError::Invalid { .. })
    ));
  }

  #[test]
  fn test_deselect_drops_key() {
    let mut r = filled();
    r.select("p3");
    r.set_key("p3", "id");
    r.deselect("p3");
    assert_eq!(r.datasets, vec!["p2"]);
    assert!(!r.join_keys.contains_key("p3"));
  }

  #[test]
  fn test_build_call_body() {
    let flow = JoinFlow::new("p1");
    let mut r = filled();
    // A stale key for a dataset that is not selected is not sent.
    r.set_key("p9", "stale");

    let call = flow.build_call(&r).unwrap();
    assert_eq!(call.path, "/api/join-datasets/p1");
    assert_eq!(
      call.json().unwrap(),
      &json!({
        "joinWithProjects": ["p2"],
        "joinType": "inner",
        "joinKeys": { "p1": "customer_id", "p2": "customer_id" }
      })
    );
  }

  #[test]
  fn test_parse_join_type() {
    assert_eq!("FULL".parse::<JoinType>().unwrap(), JoinType::Outer);
    assert!("cross".parse::<JoinType>().is_err());
  }
}
