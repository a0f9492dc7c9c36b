use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON returned by a successful call.
///
/// The client treats this as display data. The accessors below cover the
/// sections that get rendered; anything else is reachable through
/// [`AnalysisResult::field`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisResult(Value);

impl AnalysisResult {
  pub fn new(value: Value) -> Self {
    Self(value)
  }

  pub fn as_value(&self) -> &Value {
    &self.0
  }

  pub fn into_value(self) -> Value {
    self.0
  }

  pub fn field(&self, name: &str) -> Option<&Value> {
    self.0.get(name)
  }

  pub fn str_field(&self, name: &str) -> Option<&str> {
    self.field(name).and_then(Value::as_str)
  }

  pub fn bool_field(&self, name: &str) -> Option<bool> {
    self.field(name).and_then(Value::as_bool)
  }

  /// A top-level field, or the same field under `results` when the service
  /// nests its output there.
  pub fn section(&self, name: &str) -> Option<&Value> {
    self
      .field(name)
      .or_else(|| self.field("results").and_then(|r| r.get(name)))
  }

  /// The `metrics` object.
  pub fn metrics(&self) -> Option<&Map<String, Value>> {
    self.section("metrics").and_then(Value::as_object)
  }

  pub fn insights(&self) -> Vec<String> {
    self.section("insights").map(text_items).unwrap_or_default()
  }

  pub fn recommendations(&self) -> Vec<String> {
    self.section("recommendations").map(text_items).unwrap_or_default()
  }
}

/// Flatten a list-ish JSON value into display lines.
///
/// Accepts an array of strings, an array of objects carrying a text field, or
/// an object of `label -> text` pairs.
pub(crate) fn text_items(value: &Value) -> Vec<String> {
  match value {
    Value::Array(items) => items.iter().filter_map(item_text).collect(),
    Value::Object(map) => map
      .iter()
      .map(|(k, v)| match v.as_str() {
        Some(s) => format!("{}: {}", k, s),
        None => format!("{}: {}", k, v),
      })
      .collect(),
    Value::String(s) => vec![s.clone()],
    _ => Vec::new(),
  }
}

fn item_text(item: &Value) -> Option<String> {
  match item {
    Value::String(s) => Some(s.clone()),
    Value::Object(map) => ["text", "description", "message", "title"]
      .iter()
      .find_map(|key| map.get(*key).and_then(Value::as_str))
      .map(str::to_string)
      .or_else(|| Some(item.to_string())),
    Value::Null => None,
    other => Some(other.to_string()),
  }
}
