//! Pay-per-analysis: creating a payment intent for one analysis.
//!
//! Confirming the intent happens in the payment provider's own UI and is not
//! driven from here. The result carries the `clientSecret` it needs.

use lumen_config::TierLimits;
use lumen_dispatch::Call;
use lumen_workflow::StepDef;
use serde_json::json;

use super::non_blank;
use crate::error::ValidationError;
use crate::flow::Flow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStep {
  Configure,
  Pay,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct PaymentRequest {
  pub analysis_type: Option<String>,
  pub record_count: u64,
}

#[derive(Debug, Clone)]
pub struct PaymentFlow {
  project_id: String,
  limits: TierLimits,
}

impl PaymentFlow {
  /// `limits` are the caller's current tier; the record count must fit them.
  pub fn new(project_id: impl Into<String>, limits: TierLimits) -> Self {
    Self {
      project_id: project_id.into(),
      limits,
    }
  }

  pub fn limits(&self) -> &TierLimits {
    &self.limits
  }
}

fn check_records(limits: &TierLimits, records: u64) -> Result<(), ValidationError> {
  if records == 0 {
    return Err(ValidationError::invalid(
      "record count",
      "must be greater than zero",
    ));
  }
  match limits.max_records {
    Some(max) if !limits.allows_records(records) => Err(ValidationError::invalid(
      "record count",
      format!("{} exceeds the {} plan limit of {}", records, limits.tier, max),
    )),
    _ => Ok(()),
  }
}

fn is_configured(limits: &TierLimits, request: &PaymentRequest) -> bool {
  non_blank(request.analysis_type.as_deref()).is_some()
    && check_records(limits, request.record_count).is_ok()
}

impl Flow for PaymentFlow {
  type Step = PaymentStep;
  type Request = PaymentRequest;

  fn name(&self) -> &'static str {
    "payment"
  }

  fn steps(&self) -> Vec<StepDef<PaymentStep, PaymentRequest>> {
    let limits = self.limits.clone();
    vec![
      StepDef::new(PaymentStep::Configure, "configure", move |r: &PaymentRequest| {
        is_configured(&limits, r)
      }),
      StepDef::always(PaymentStep::Pay, "pay"),
    ]
  }

  fn build_call(&self, request: &PaymentRequest) -> Result<Call, ValidationError> {
    let analysis_type = non_blank(request.analysis_type.as_deref())
      .ok_or_else(|| ValidationError::missing("analysis type"))?;
    check_records(&self.limits, request.record_count)?;

    let body = json!({
      "projectId": self.project_id,
      "analysisType": analysis_type,
      "recordCount": request.record_count,
    });

    Ok(Call::post_json("/api/create-payment-intent", body))
  }
}

#[cfg(test)]
mod tests {
  use lumen_config::{Tier, default_tiers};

  use super::*;

  fn limits(tier: Tier) -> TierLimits {
    default_tiers().into_iter().find(|l| l.tier == tier).unwrap()
  }

  #[test]
  fn test_configure_predicate() {
    let trial = limits(Tier::Trial);
    let mut r = PaymentRequest::default();
    assert!(!is_configured(&trial, &r));
    r.analysis_type = Some("regression".into());
    assert!(!is_configured(&trial, &r));
    r.record_count = 1200;
    assert!(is_configured(&trial, &r));
    r.record_count = 10_001;
    assert!(!is_configured(&trial, &r));
  }

  #[test]
  fn test_build_call() {
    let r = PaymentRequest {
      analysis_type: Some("regression".into()),
      record_count: 1200,
    };
    let call = PaymentFlow::new("p7", limits(Tier::Trial))
      .build_call(&r)
      .unwrap();
    assert_eq!(call.path, "/api/create-payment-intent");
    assert_eq!(
      call.json().unwrap(),
      &json!({ "projectId": "p7", "analysisType": "regression", "recordCount": 1200 })
    );
  }

  #[test]
  fn test_zero_records_rejected() {
    let r = PaymentRequest {
      analysis_type: Some("regression".into()),
      record_count: 0,
    };
    assert!(matches!(
      PaymentFlow::new("p7", limits(Tier::Trial)).build_call(&r),
      Err(ValidationError::Invalid { .. })
    ));
  }

  #[test]
  fn test_records_over_tier_limit_rejected() {
    let r = PaymentRequest {
      analysis_type: Some("regression".into()),
      record_count: 250_000,
    };

    let flow = PaymentFlow::new("p7", limits(Tier::Starter));
    match flow.build_call(&r) {
      Err(ValidationError::Invalid { field, message }) => {
        assert_eq!(field, "record count");
        assert!(message.contains("starter"));
        assert!(message.contains("100000"));
      }
      other => panic!("expected Invalid, got {:?}", other),
    }
    assert!(!flow.steps()[0].is_complete(&r));

    let flow = PaymentFlow::new("p7", limits(Tier::Enterprise));
    assert!(flow.build_call(&r).is_ok());
    assert!(flow.steps()[0].is_complete(&r));
  }
}
