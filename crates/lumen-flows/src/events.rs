//! Flow events and notifiers.
//!
//! Events are emitted as a flow moves between steps and settles its
//! submission, so a front-end can refresh, show a busy indicator or raise a
//! toast without polling the runner.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events emitted while a flow is driven.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FlowEvent {
  /// Moved forward one step.
  StepAdvanced {
    run_id: String,
    flow: String,
    from: String,
    to: String,
  },

  /// `advance` was refused because a step is incomplete.
  StepBlocked {
    run_id: String,
    flow: String,
    step: String,
    blocking: String,
  },

  /// Moved back one step.
  StepRetreated {
    run_id: String,
    flow: String,
    to: String,
  },

  /// Request cleared, back at the first step.
  Reset { run_id: String, flow: String },

  /// The terminal call went out.
  Submitted {
    run_id: String,
    flow: String,
    path: String,
    attempt: u32,
  },

  /// The terminal call succeeded.
  Completed { run_id: String, flow: String },

  /// The terminal call failed.
  Failed {
    run_id: String,
    flow: String,
    error: String,
    timed_out: bool,
  },
}

/// Receives flow events.
pub trait FlowNotifier: Send + Sync {
  fn notify(&self, event: FlowEvent);
}

/// Discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl FlowNotifier for NoopNotifier {
  fn notify(&self, _event: FlowEvent) {}
}

/// Forwards events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  // Unbounded: a flow emits a handful of events per user action, and the
  // runner must never wait on a slow consumer.
  sender: mpsc::UnboundedSender<FlowEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<FlowEvent>) -> Self {
    Self { sender }
  }
}

impl FlowNotifier for ChannelNotifier {
  fn notify(&self, event: FlowEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}
