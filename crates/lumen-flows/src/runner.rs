//! Drives one flow: step navigation plus the single terminal request.

use std::sync::Arc;

use lumen_dispatch::{AnalysisResult, Call, Dispatcher};
use lumen_workflow::{Phase, StepController, StepInfo, WorkflowError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::error::RunError;
use crate::events::{FlowEvent, FlowNotifier, NoopNotifier};
use crate::flow::Flow;

/// A flow instance bound to a dispatcher.
///
/// Every method that can start a request takes `&mut self`, so one runner
/// never has two requests in flight.
pub struct FlowRunner<F: Flow> {
  run_id: String,
  flow: F,
  controller: StepController<F::Step, F::Request, AnalysisResult>,
  dispatcher: Arc<Dispatcher>,
  notifier: Arc<dyn FlowNotifier>,
  cancel: CancellationToken,
  attempts: u32,
}

impl<F: Flow> FlowRunner<F> {
  pub fn new(flow: F, dispatcher: Arc<Dispatcher>) -> Result<Self, RunError> {
    let controller = StepController::new(flow.steps())?;
    Ok(Self {
      run_id: uuid::Uuid::new_v4().to_string(),
      flow,
      controller,
      dispatcher,
      notifier: Arc::new(NoopNotifier),
      cancel: CancellationToken::new(),
      attempts: 0,
    })
  }

  pub fn with_notifier(mut self, notifier: Arc<dyn FlowNotifier>) -> Self {
    self.notifier = notifier;
    self
  }

  /// Use `cancel` to abort in-flight requests from outside the runner.
  pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
    self.cancel = cancel;
    self
  }

  /// Unique id of this run, attached to its log events.
  pub fn run_id(&self) -> &str {
    &self.run_id
  }

  /// The flow definition this runner drives.
  pub fn flow(&self) -> &F {
    &self.flow
  }

  /// The request as edited so far.
  pub fn request(&self) -> &F::Request {
    self.controller.request()
  }

  /// The underlying controller's phase.
  pub fn phase(&self) -> &Phase<AnalysisResult> {
    self.controller.phase()
  }

  /// Id of the step the user is on.
  pub fn current_step(&self) -> F::Step {
    self.controller.current_step()
  }

  /// Display label of the step the user is on.
  pub fn current_label(&self) -> &'static str {
    self.controller.current_label()
  }

  /// True while a submission is in flight.
  pub fn is_busy(&self) -> bool {
    self.controller.is_busy()
  }

  /// Every step with its label and completion state, in order.
  pub fn steps(&self) -> Vec<StepInfo<F::Step>> {
    self.controller.steps()
  }

  /// The successful result, once the submission is done.
  pub fn result(&self) -> Option<&AnalysisResult> {
    self.controller.result()
  }

  /// Edit the request. Refused while a request is in flight.
  pub fn update(&mut self, f: impl FnOnce(&mut F::Request)) -> bool {
    self.controller.update(f)
  }

  pub fn advance(&mut self) -> bool {
    let from = self.controller.current_label();
    if self.controller.advance() {
      let to = self.controller.current_label();
      debug!(run_id = %self.run_id, flow = self.flow.name(), from, to, "step advanced");
      self.emit(FlowEvent::StepAdvanced {
        run_id: self.run_id.clone(),
        flow: self.flow.name().to_string(),
        from: from.to_string(),
        to: to.to_string(),
      });
      return true;
    }

    let blocking = self.controller.blocking_step().unwrap_or(from);
    debug!(run_id = %self.run_id, flow = self.flow.name(), step = from, blocking, "step blocked");
    self.emit(FlowEvent::StepBlocked {
      run_id: self.run_id.clone(),
      flow: self.flow.name().to_string(),
      step: from.to_string(),
      blocking: blocking.to_string(),
    });
    false
  }

  pub fn retreat(&mut self) -> bool {
    if !self.controller.retreat() {
      return false;
    }
    self.emit(FlowEvent::StepRetreated {
      run_id: self.run_id.clone(),
      flow: self.flow.name().to_string(),
      to: self.controller.current_label().to_string(),
    });
    true
  }

  pub fn reset(&mut self) {
    self.controller.reset();
    self.attempts = 0;
    info!(run_id = %self.run_id, flow = self.flow.name(), "flow reset");
    self.emit(FlowEvent::Reset {
      run_id: self.run_id.clone(),
      flow: self.flow.name().to_string(),
    });
  }

  /// Advance until the last step, failing on the first step that blocks.
  pub fn drive_to_terminal(&mut self) -> Result<(), RunError> {
    while !self.controller.is_terminal() {
      if !self.advance() {
        let step = self
          .controller
          .blocking_step()
          .unwrap_or(self.controller.current_label());
        return Err(RunError::Blocked {
          step: step.to_string(),
        });
      }
    }
    Ok(())
  }

  /// Submit the request from the last step.
  ///
  /// Validation runs first; a rejected request leaves the runner where it
  /// was and nothing is sent.
  pub async fn submit(&mut self) -> Result<AnalysisResult, RunError> {
    self.controller.check_submit()?;
    let call = self.flow.build_call(self.controller.request())?;
    self.controller.begin_submit()?;
    self.execute(call).await
  }

  /// Send the request again after a failure.
  pub async fn retry(&mut self) -> Result<AnalysisResult, RunError> {
    let call = match self.controller.phase() {
      Phase::Failed(_) => self.flow.build_call(self.controller.request())?,
      Phase::Executing => return Err(WorkflowError::AlreadyExecuting.into()),
      _ => return Err(WorkflowError::NotFailed.into()),
    };
    self.controller.retry()?;
    self.execute(call).await
  }

  #[instrument(
    name = "flow_submit",
    skip(self, call),
    fields(run_id = %self.run_id, flow = self.flow.name(), path = %call.path)
  )]
  async fn execute(&mut self, call: Call) -> Result<AnalysisResult, RunError> {
    self.attempts += 1;
    info!(attempt = self.attempts, "submission started");
    self.emit(FlowEvent::Submitted {
      run_id: self.run_id.clone(),
      flow: self.flow.name().to_string(),
      path: call.path.clone(),
      attempt: self.attempts,
    });

    let outcome = self.dispatcher.dispatch(&call, &self.cancel).await;

    match outcome {
      Ok(result) => {
        self.controller.complete(Ok(result.clone()))?;
        self.controller.update(|request| self.flow.on_success(request));
        info!("submission completed");
        self.emit(FlowEvent::Completed {
          run_id: self.run_id.clone(),
          flow: self.flow.name().to_string(),
        });
        Ok(result)
      }
      Err(e) => {
        if e.is_timeout() {
          warn!(error = %e, "submission timed out");
        } else {
          error!(error = %e, "submission failed");
        }
        self.controller.complete(Err(e.to_string()))?;
        self.emit(FlowEvent::Failed {
          run_id: self.run_id.clone(),
          flow: self.flow.name().to_string(),
          error: e.to_string(),
          timed_out: e.is_timeout(),
        });
        Err(e.into())
      }
    }
  }

  fn emit(&self, event: FlowEvent) {
    self.notifier.notify(event);
  }
}
