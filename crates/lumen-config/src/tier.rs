use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const MB: u64 = 1024 * 1024;

/// A subscription plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
  Trial,
  Starter,
  Professional,
  Enterprise,
}

impl Tier {
  pub const ALL: [Tier; 4] = [
    Tier::Trial,
    Tier::Starter,
    Tier::Professional,
    Tier::Enterprise,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Tier::Trial => "trial",
      Tier::Starter => "starter",
      Tier::Professional => "professional",
      Tier::Enterprise => "enterprise",
    }
  }
}

impl fmt::Display for Tier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Tier {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Tier::ALL
      .into_iter()
      .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
      .ok_or_else(|| ConfigError::UnknownTier(s.to_string()))
  }
}

/// Usage limits attached to a tier.
///
/// `None` means unlimited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimits {
  pub tier: Tier,
  pub max_file_size_bytes: u64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub max_records: Option<u64>,
}

impl TierLimits {
  /// Whether a file of `size` bytes fits this tier.
  pub fn allows_file_size(&self, size: u64) -> bool {
    size <= self.max_file_size_bytes
  }

  /// Whether `records` rows fit this tier.
  pub fn allows_records(&self, records: u64) -> bool {
    self.max_records.is_none_or(|max| records <= max)
  }
}

/// Built-in tier table used when the config file does not provide one.
pub fn default_tiers() -> Vec<TierLimits> {
  vec![
    TierLimits {
      tier: Tier::Trial,
      max_file_size_bytes: 10 * MB,
      max_records: Some(10_000),
    },
    TierLimits {
      tier: Tier::Starter,
      max_file_size_bytes: 50 * MB,
      max_records: Some(100_000),
    },
    TierLimits {
      tier: Tier::Professional,
      max_file_size_bytes: 100 * MB,
      max_records: Some(1_000_000),
    },
    TierLimits {
      tier: Tier::Enterprise,
      max_file_size_bytes: 500 * MB,
      max_records: None,
    },
  ]
}
