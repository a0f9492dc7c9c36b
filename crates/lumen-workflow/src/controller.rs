//! The step controller.

use std::fmt;

use crate::error::WorkflowError;
use crate::step::{StepDef, StepInfo};

/// Where the controller currently is.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase<O> {
  /// Collecting input at step `n`.
  Collect(usize),
  /// The terminal request is in flight.
  Executing,
  /// The terminal request succeeded.
  Done(O),
  /// The terminal request failed with the given message.
  Failed(String),
}

/// Holds the current step, the request being built, and the outcome of the
/// terminal submission.
///
/// `S` is the step token, `R` the request collected across steps, `O` the
/// result of a successful submission.
pub struct StepController<S, R, O> {
  steps: Vec<StepDef<S, R>>,
  request: R,
  phase: Phase<O>,
}

impl<S, R, O> StepController<S, R, O>
where
  S: Copy + PartialEq + fmt::Debug,
  R: Default,
{
  /// Create a controller positioned at the first step with an empty request.
  pub fn new(steps: Vec<StepDef<S, R>>) -> Result<Self, WorkflowError> {
    Self::with_request(steps, R::default())
  }

  /// Create a controller with a pre-filled request.
  pub fn with_request(steps: Vec<StepDef<S, R>>, request: R) -> Result<Self, WorkflowError> {
    if steps.is_empty() {
      return Err(WorkflowError::NoSteps);
    }

    for (i, step) in steps.iter().enumerate() {
      if steps[..i].iter().any(|earlier| earlier.id == step.id) {
        return Err(WorkflowError::DuplicateStep(format!("{:?}", step.id)));
      }
    }

    Ok(Self {
      steps,
      request,
      phase: Phase::Collect(0),
    })
  }

  fn last(&self) -> usize {
    self.steps.len() - 1
  }

  /// Where the workflow is: collecting input, executing, or finished.
  pub fn phase(&self) -> &Phase<O> {
    &self.phase
  }

  /// The request as edited so far.
  pub fn request(&self) -> &R {
    &self.request
  }

  /// Index of the current step. Once the terminal step is submitted this
  /// stays on the last step.
  pub fn current_index(&self) -> usize {
    match self.phase {
      Phase::Collect(i) => i,
      _ => self.last(),
    }
  }

  /// Id of the step at [`current_index`](Self::current_index).
  pub fn current_step(&self) -> S {
    self.steps[self.current_index()].id
  }

  /// Display label of the current step.
  pub fn current_label(&self) -> &'static str {
    self.steps[self.current_index()].label
  }

  /// Whether the current step is the last one, the only step that can submit.
  pub fn is_terminal(&self) -> bool {
    self.current_index() == self.last()
  }

  /// True while a submission is in flight. Edits and navigation are refused.
  pub fn is_busy(&self) -> bool {
    matches!(self.phase, Phase::Executing)
  }

  /// The successful result, if the submission is done.
  pub fn result(&self) -> Option<&O> {
    match &self.phase {
      Phase::Done(result) => Some(result),
      _ => None,
    }
  }

  /// The first step in `0..=through` whose predicate does not hold.
  pub fn first_incomplete(&self, through: usize) -> Option<usize> {
    self
      .steps
      .iter()
      .take(through.saturating_add(1))
      .position(|step| !step.is_complete(&self.request))
  }

  /// Label of the first incomplete step up to and including the current one.
  pub fn blocking_step(&self) -> Option<&'static str> {
    self
      .first_incomplete(self.current_index())
      .map(|i| self.steps[i].label)
  }

  pub fn can_advance(&self) -> bool {
    match self.phase {
      Phase::Collect(i) => i < self.last() && self.first_incomplete(i).is_none(),
      _ => false,
    }
  }

  /// Move to the next step. Returns `false` and stays put when any step up to
  /// the current one is incomplete, or when there is no next step.
  pub fn advance(&mut self) -> bool {
    if !self.can_advance() {
      return false;
    }
    if let Phase::Collect(i) = self.phase {
      self.phase = Phase::Collect(i + 1);
    }
    true
  }

  /// Move to the previous step. A settled submission goes back to the last
  /// step so its parameters can be edited. Ignored while executing.
  pub fn retreat(&mut self) -> bool {
    match self.phase {
      Phase::Collect(0) | Phase::Executing => false,
      Phase::Collect(i) => {
        self.phase = Phase::Collect(i - 1);
        true
      }
      Phase::Done(_) | Phase::Failed(_) => {
        self.phase = Phase::Collect(self.last());
        true
      }
    }
  }

  /// Clear the request and return to the first step.
  pub fn reset(&mut self) {
    self.request = R::default();
    self.phase = Phase::Collect(0);
  }

  /// Mutate the request. Refused while a submission is in flight.
  pub fn update(&mut self, f: impl FnOnce(&mut R)) -> bool {
    if self.is_busy() {
      return false;
    }
    f(&mut self.request);
    true
  }

  /// Whether `begin_submit` would succeed right now.
  pub fn check_submit(&self) -> Result<(), WorkflowError> {
    match self.phase {
      Phase::Executing => return Err(WorkflowError::AlreadyExecuting),
      Phase::Done(_) | Phase::Failed(_) => return Err(WorkflowError::Settled),
      Phase::Collect(i) if i != self.last() => {
        return Err(WorkflowError::NotAtTerminalStep {
          step: self.steps[i].label.to_string(),
        });
      }
      Phase::Collect(_) => {}
    }

    match self.first_incomplete(self.last()) {
      Some(i) => Err(WorkflowError::Incomplete {
        step: self.steps[i].label.to_string(),
      }),
      None => Ok(()),
    }
  }

  /// Start the terminal submission.
  pub fn begin_submit(&mut self) -> Result<&R, WorkflowError> {
    self.check_submit()?;
    self.phase = Phase::Executing;
    Ok(&self.request)
  }

  /// Record the outcome of the in-flight submission.
  pub fn complete(&mut self, outcome: Result<O, String>) -> Result<(), WorkflowError> {
    if !self.is_busy() {
      return Err(WorkflowError::NotExecuting);
    }
    self.phase = match outcome {
      Ok(result) => Phase::Done(result),
      Err(message) => Phase::Failed(message),
    };
    Ok(())
  }

  /// Re-enter `Executing` after a failure.
  pub fn retry(&mut self) -> Result<&R, WorkflowError> {
    match self.phase {
      Phase::Failed(_) => {
        self.phase = Phase::Executing;
        Ok(&self.request)
      }
      Phase::Executing => Err(WorkflowError::AlreadyExecuting),
      _ => Err(WorkflowError::NotFailed),
    }
  }

  pub fn steps(&self) -> Vec<StepInfo<S>> {
    self
      .steps
      .iter()
      .map(|step| StepInfo {
        id: step.id,
        label: step.label,
        complete: step.is_complete(&self.request),
      })
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Debug, Clone, Copy, PartialEq, Eq)]
  enum Step {
    Select,
    Strategy,
    Columns,
    Execute,
  }

  #[derive(Debug, Default, Clone, PartialEq)]
  struct Form {
    selected: bool,
    strategy: bool,
    columns: bool,
  }

  type Controller = StepController<Step, Form, String>;

  fn controller() -> Controller {
    StepController::new(vec![
      StepDef::new(Step::Select, "select", |f: &Form| f.selected),
      StepDef::new(Step::Strategy, "strategy", |f: &Form| f.strategy),
      StepDef::new(Step::Columns, "columns", |f: &Form| f.columns),
      StepDef::always(Step::Execute, "execute"),
    ])
    .unwrap()
  }

  fn filled() -> Controller {
    let mut c = controller();
    c.update(|f| {
      f.selected = true;
      f.strategy = true;
      f.columns = true;
    });
    assert!(c.advance());
    assert!(c.advance());
    assert!(c.advance());
    c
  }

  #[test]
  fn test_rejects_empty_and_duplicate_steps() {
    let empty: Result<Controller, _> = StepController::new(vec![]);
    assert_eq!(empty.err(), Some(WorkflowError::NoSteps));

    let dup: Result<Controller, _> = StepController::new(vec![
      StepDef::always(Step::Select, "select"),
      StepDef::always(Step::Select, "select again"),
    ]);
    assert!(matches!(dup.err(), Some(WorkflowError::DuplicateStep(_))));
  }

  #[test]
  fn test_advance_is_noop_when_incomplete() {
    let mut c = controller();
    assert!(!c.advance());
    assert_eq!(c.current_step(), Step::Select);
    assert_eq!(c.blocking_step(), Some("select"));

    c.update(|f| f.selected = true);
    assert!(c.advance());
    assert_eq!(c.current_step(), Step::Strategy);
  }

  #[test]
  fn test_advance_rechecks_earlier_steps() {
    let mut c = controller();
    c.update(|f| {
      f.selected = true;
      f.strategy = true;
    });
    assert!(c.advance());
    assert_eq!(c.current_step(), Step::Strategy);

    // Clearing an earlier answer blocks progress from a later step.
    c.update(|f| f.selected = false);
    assert!(!c.advance());
    assert_eq!(c.current_step(), Step::Strategy);
    assert_eq!(c.blocking_step(), Some("select"));
  }

  #[test]
  fn test_advance_stops_at_last_step() {
    let mut c = filled();
    assert!(c.is_terminal());
    assert!(!c.advance());
    assert_eq!(c.current_step(), Step::Execute);
  }

  #[test]
  fn test_retreat_never_fails() {
    let mut c = controller();
    assert!(!c.retreat());
    assert_eq!(c.current_index(), 0);

    let mut c = filled();
    assert!(c.retreat());
    assert_eq!(c.current_step(), Step::Columns);
  }

  #[test]
  fn test_reset_clears_request_from_any_phase() {
    let mut c = filled();
    c.begin_submit().unwrap();
    c.complete(Ok("ok".to_string())).unwrap();

    c.reset();
    assert_eq!(c.current_index(), 0);
    assert_eq!(c.request(), &Form::default());
    assert_eq!(c.phase(), &Phase::Collect(0));

    let mut c = filled();
    c.begin_submit().unwrap();
    c.reset();
    assert_eq!(c.phase(), &Phase::Collect(0));
    assert_eq!(c.request(), &Form::default());
  }

  #[test]
  fn test_submit_requires_terminal_step() {
    let mut c = controller();
    c.update(|f| f.selected = true);
    let err = c.begin_submit().unwrap_err();
    assert!(matches!(err, WorkflowError::NotAtTerminalStep { step } if step == "select"));
  }

  #[test]
  fn test_submit_rechecks_every_step() {
    let mut c = filled();
    c.update(|f| f.columns = false);
    let err = c.begin_submit().unwrap_err();
    assert_eq!(
      err,
      WorkflowError::Incomplete {
        step: "columns".to_string()
      }
    );
    assert_eq!(c.phase(), &Phase::Collect(3));
  }

  #[test]
  fn test_duplicate_submission_rejected() {
    let mut c = filled();
    c.begin_submit().unwrap();
    assert!(c.is_busy());
    assert_eq!(c.begin_submit().unwrap_err(), WorkflowError::AlreadyExecuting);
    assert!(!c.update(|f| f.selected = false));
    assert!(!c.retreat());
  }

  #[test]
  fn test_failed_submission_stays_terminal_and_retries() {
    let mut c = filled();
    c.begin_submit().unwrap();
    c.complete(Err("server exploded".to_string())).unwrap();

    assert_eq!(c.phase(), &Phase::Failed("server exploded".to_string()));
    assert_eq!(c.current_step(), Step::Execute);
    assert!(!c.advance());
    assert_eq!(c.begin_submit().unwrap_err(), WorkflowError::Settled);

    c.retry().unwrap();
    assert!(c.is_busy());
    c.complete(Ok("done".to_string())).unwrap();
    assert_eq!(c.result(), Some(&"done".to_string()));
  }

  #[test]
  fn test_retry_and_complete_guard_phase() {
    let mut c = filled();
    assert_eq!(c.retry().unwrap_err(), WorkflowError::NotFailed);
    assert_eq!(
      c.complete(Ok(String::new())).unwrap_err(),
      WorkflowError::NotExecuting
    );
  }

  #[test]
  fn test_retreat_from_settled_returns_to_last_step() {
    let mut c = filled();
    c.begin_submit().unwrap();
    c.complete(Err("nope".to_string())).unwrap();
    assert!(c.retreat());
    assert_eq!(c.phase(), &Phase::Collect(3));
  }

  #[derive(Debug, Clone, Copy)]
  enum Action {
    Advance,
    Retreat,
    Reset,
    ToggleSelected,
    ToggleStrategy,
    ToggleColumns,
  }

  const ACTIONS: [Action; 6] = [
    Action::Advance,
    Action::Retreat,
    Action::Reset,
    Action::ToggleSelected,
    Action::ToggleStrategy,
    Action::ToggleColumns,
  ];

  fn apply(c: &mut Controller, action: Action) {
    let before = c.current_index();
    let ready = c.first_incomplete(before).is_none();

    match action {
      Action::Advance => {
        let moved = c.advance();
        if moved {
          assert!(ready, "advanced past an incomplete step");
          assert_eq!(c.current_index(), before + 1);
        } else {
          assert_eq!(c.current_index(), before);
        }
      }
      Action::Retreat => {
        c.retreat();
        assert_eq!(c.current_index(), before.saturating_sub(1));
      }
      Action::Reset => {
        c.reset();
        assert_eq!(c.current_index(), 0);
        assert_eq!(c.request(), &Form::default());
      }
      Action::ToggleSelected => {
        c.update(|f| f.selected = !f.selected);
      }
      Action::ToggleStrategy => {
        c.update(|f| f.strategy = !f.strategy);
      }
      Action::ToggleColumns => {
        c.update(|f| f.columns = !f.columns);
      }
    }
  }

  /// Replays every action sequence up to `depth` long, checking each step.
  fn walk(history: &mut Vec<Action>, depth: usize) {
    let mut c = controller();
    for action in history.iter() {
      apply(&mut c, *action);
    }
    if depth == 0 {
      return;
    }
    for action in ACTIONS {
      history.push(action);
      walk(history, depth - 1);
      history.pop();
    }
  }

  #[test]
  fn test_no_action_sequence_skips_an_incomplete_step() {
    walk(&mut Vec::new(), 5);
  }
}
