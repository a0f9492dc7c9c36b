//! Lumen Workflow
//!
//! A wizard-style state machine. A workflow is an ordered list of steps, each
//! with a completion predicate over a request that the user fills in as they
//! go. The last step submits the request; the result lands the controller in
//! `Done` or `Failed`.
//!
//! ```text
//! Collect(0) -> Collect(1) -> ... -> Collect(last) -> Executing -> Done
//!                                                              \-> Failed -> (retry) Executing
//! ```
//!
//! The controller never talks to the network. Pairing it with a dispatcher is
//! the job of `lumen-flows`.

mod controller;
mod error;
mod step;

pub use controller::{Phase, StepController};
pub use error::WorkflowError;
pub use step::{StepDef, StepInfo};
