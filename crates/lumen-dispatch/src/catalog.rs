//! The ML analysis catalog served by `/api/ml/analysis-types`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DispatchError;
use crate::result::AnalysisResult;

/// One entry of the analysis catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisTypeInfo {
  pub id: String,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub requires_target: bool,
}

impl AnalysisTypeInfo {
  /// Read the catalog out of a response. The list may be the whole body or
  /// sit under `analysisTypes` or `types`.
  pub fn from_result(result: &AnalysisResult) -> Result<Vec<Self>, DispatchError> {
    let list = match result.as_value() {
      Value::Array(_) => result.as_value(),
      other => other
        .get("analysisTypes")
        .or_else(|| other.get("types"))
        .ok_or_else(|| {
          DispatchError::InvalidResponse("analysis type list missing from response".to_string())
        })?,
    };

    serde_json::from_value(list.clone())
      .map_err(|e| DispatchError::InvalidResponse(format!("malformed analysis type list: {}", e)))
  }
}
