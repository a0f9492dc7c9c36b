//! Moving the account to another subscription tier.

use lumen_config::Tier;
use lumen_dispatch::Call;
use lumen_workflow::StepDef;
use serde_json::json;

use crate::error::ValidationError;
use crate::flow::Flow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeStep {
  Plan,
  Confirm,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct UpgradeRequest {
  pub tier: Option<Tier>,
}

#[derive(Debug, Clone)]
pub struct UpgradeFlow {
  current_tier: Tier,
}

impl UpgradeFlow {
  pub fn new(current_tier: Tier) -> Self {
    Self { current_tier }
  }

  pub fn current_tier(&self) -> Tier {
    self.current_tier
  }
}

impl Flow for UpgradeFlow {
  type Step = UpgradeStep;
  type Request = UpgradeRequest;

  fn name(&self) -> &'static str {
    "upgrade"
  }

  fn steps(&self) -> Vec<StepDef<UpgradeStep, UpgradeRequest>> {
    let current = self.current_tier;
    vec![
      StepDef::new(UpgradeStep::Plan, "choose plan", move |r: &UpgradeRequest| {
        r.tier.is_some_and(|t| t != current)
      }),
      StepDef::always(UpgradeStep::Confirm, "confirm"),
    ]
  }

  fn build_call(&self, request: &UpgradeRequest) -> Result<Call, ValidationError> {
    let tier = request.tier.ok_or_else(|| ValidationError::missing("tier"))?;
    if tier == self.current_tier {
      return Err(ValidationError::invalid(
        "tier",
        format!("already on the {} plan", tier),
      ));
    }

    Ok(Call::post_json(
      "/api/subscription/upgrade",
      json!({ "tier": tier }),
    ))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_same_tier_rejected() {
    let flow = UpgradeFlow::new(Tier::Starter);
    let r = UpgradeRequest {
      tier: Some(Tier::Starter),
    };
    assert!(matches!(
      flow.build_call(&r),
      Err(ValidationError::Invalid { .. })
    ));
  }

  #[test]
  fn test_build_call() {
    let flow = UpgradeFlow::new(Tier::Trial);
    let r = UpgradeRequest {
      tier: Some(Tier::Professional),
    };
    let call = flow.build_call(&r).unwrap();
    assert_eq!(call.path, "/api/subscription/upgrade");
    assert_eq!(call.json().unwrap(), &json!({ "tier": "professional" }));
  }
}
