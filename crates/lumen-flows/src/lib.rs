//! Lumen Flows
//!
//! The concrete workflows of the Lumen client and the runner that drives
//! them.
//!
//! # Architecture
//!
//! ```text
//! FlowRunner<F: Flow>
//! ├── StepController   - which step we are on, what has been collected
//! ├── F::build_call    - client-side validation, request body
//! ├── Dispatcher       - one HTTP request per submission
//! └── FlowNotifier     - events for whoever is watching
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use lumen_flows::{FlowRunner, JoinFlow, JoinType};
//!
//! let mut runner = FlowRunner::new(JoinFlow::new("p1"), dispatcher)?;
//! runner.update(|r| {
//!   r.select("p2");
//!   r.join_type = Some(JoinType::Inner);
//!   r.set_key("p1", "customer_id");
//!   r.set_key("p2", "customer_id");
//! });
//! runner.drive_to_terminal()?;
//! let result = runner.submit().await?;
//! ```

mod error;
mod events;
mod flow;
mod flows;
mod render;
mod runner;

pub use error::{RunError, ValidationError};
pub use events::{ChannelNotifier, FlowEvent, FlowNotifier, NoopNotifier};
pub use flow::Flow;
pub use flows::guided::{
  Algorithm, GuidedAnalysisFlow, GuidedAnalysisRequest, GuidedAnalysisType, GuidedStep,
};
pub use flows::join::{JoinFlow, JoinRequest, JoinStep, JoinType};
pub use flows::ml_analysis::{MlAnalysisFlow, MlAnalysisRequest, MlAnalysisType, MlStep};
pub use flows::payment::{PaymentFlow, PaymentRequest, PaymentStep};
pub use flows::pii_decision::{PiiDecision, PiiDecisionFlow, PiiDecisionRequest, PiiStep};
pub use flows::trial_upload::{
  SUPPORTED_EXTENSIONS, TrialUploadFlow, TrialUploadRequest, TrialUploadStep,
};
pub use flows::upgrade::{UpgradeFlow, UpgradeRequest, UpgradeStep};
pub use render::{Block, render_blocks, render_text};
pub use runner::FlowRunner;
