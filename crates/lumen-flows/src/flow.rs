use std::fmt;

use lumen_dispatch::Call;
use lumen_workflow::StepDef;

use crate::error::ValidationError;

/// A wizard: ordered steps over a request, and the call its last step makes.
///
/// Context that must survive a reset (the project being worked on, the
/// caller's tier) belongs on the flow itself. Everything the user picks goes
/// in `Request`.
pub trait Flow: Send + Sync {
  type Step: Copy + PartialEq + fmt::Debug + Send + Sync + 'static;
  type Request: Default + fmt::Debug + Send + Sync + 'static;

  /// Short name used in logs and events.
  fn name(&self) -> &'static str;

  fn steps(&self) -> Vec<StepDef<Self::Step, Self::Request>>;

  /// Validate the request and build the terminal call.
  fn build_call(&self, request: &Self::Request) -> Result<Call, ValidationError>;

  /// Called after a successful submission.
  fn on_success(&self, _request: &mut Self::Request) {}
}
