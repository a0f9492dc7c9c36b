use std::fmt;

use serde::Serialize;

type Predicate<R> = Box<dyn Fn(&R) -> bool + Send + Sync>;

/// One step of a workflow: an id token, a display label and the predicate
/// that must hold before the user may move past it.
pub struct StepDef<S, R> {
  pub id: S,
  pub label: &'static str,
  is_complete: Predicate<R>,
}

impl<S, R> StepDef<S, R> {
  pub fn new(
    id: S,
    label: &'static str,
    is_complete: impl Fn(&R) -> bool + Send + Sync + 'static,
  ) -> Self {
    Self {
      id,
      label,
      is_complete: Box::new(is_complete),
    }
  }

  /// A step with nothing to collect, typically the submit step.
  pub fn always(id: S, label: &'static str) -> Self {
    Self::new(id, label, |_| true)
  }

  pub fn is_complete(&self, request: &R) -> bool {
    (self.is_complete)(request)
  }
}

impl<S: fmt::Debug, R> fmt::Debug for StepDef<S, R> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("StepDef")
      .field("id", &self.id)
      .field("label", &self.label)
      .finish_non_exhaustive()
  }
}

/// Serializable view of a step, for listing and display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepInfo<S> {
  pub id: S,
  pub label: &'static str,
  pub complete: bool,
}
