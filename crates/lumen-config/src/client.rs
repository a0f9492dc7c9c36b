use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;
use crate::tier::{Tier, TierLimits, default_tiers};

const DEFAULT_BASE_URL: &str = "http://localhost:5000";
const DEFAULT_PII_DECISION_TIMEOUT_MS: u64 = 60_000;

/// Connection and limit settings for talking to the analytics backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
  /// Root URL of the backend, e.g. "https://app.example.com".
  #[serde(default = "default_base_url")]
  pub base_url: String,

  /// Bearer token attached as `Authorization` on every request.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub token: Option<String>,

  /// Timeout applied to every request. Unset means wait indefinitely.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub request_timeout_ms: Option<u64>,

  /// Timeout for the free-trial PII decision call.
  #[serde(default = "default_pii_decision_timeout_ms")]
  pub pii_decision_timeout_ms: u64,

  #[serde(default = "default_tiers")]
  pub tiers: Vec<TierLimits>,
}

fn default_base_url() -> String {
  DEFAULT_BASE_URL.to_string()
}

fn default_pii_decision_timeout_ms() -> u64 {
  DEFAULT_PII_DECISION_TIMEOUT_MS
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
      token: None,
      request_timeout_ms: None,
      pii_decision_timeout_ms: DEFAULT_PII_DECISION_TIMEOUT_MS,
      tiers: default_tiers(),
    }
  }
}

impl ClientConfig {
  /// Parse and validate a JSON config document.
  pub fn from_json(content: &str) -> Result<Self, ConfigError> {
    let config: ClientConfig = serde_json::from_str(content)?;
    config.validate()?;
    Ok(config)
  }

  /// Load a config file. A missing file yields the defaults.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    match std::fs::read_to_string(path) {
      Ok(content) => Self::from_json(&content),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
      Err(source) => Err(ConfigError::Io {
        path: path.to_path_buf(),
        source,
      }),
    }
  }

  /// Check the base url and the tier table.
  pub fn validate(&self) -> Result<(), ConfigError> {
    self.parsed_base_url()?;

    let mut seen = HashSet::new();
    for limits in &self.tiers {
      if !seen.insert(limits.tier) {
        return Err(ConfigError::DuplicateTier(limits.tier.to_string()));
      }
    }
    Ok(())
  }

  /// The base url as a parsed `Url`. Only http and https are accepted.
  pub fn parsed_base_url(&self) -> Result<Url, ConfigError> {
    let invalid = |message: String| ConfigError::InvalidBaseUrl {
      url: self.base_url.clone(),
      message,
    };

    let url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
      "http" | "https" => Ok(url),
      other => Err(invalid(format!("unsupported scheme '{}'", other))),
    }
  }

  /// Limits for `tier`, falling back to the built-in table when the
  /// configured one omits it.
  pub fn limits(&self, tier: Tier) -> TierLimits {
    self
      .tiers
      .iter()
      .find(|l| l.tier == tier)
      .cloned()
      .or_else(|| default_tiers().into_iter().find(|l| l.tier == tier))
      .unwrap_or(TierLimits {
        tier,
        max_file_size_bytes: 0,
        max_records: Some(0),
      })
  }

  pub fn request_timeout(&self) -> Option<Duration> {
    self.request_timeout_ms.map(Duration::from_millis)
  }

  pub fn pii_decision_timeout(&self) -> Duration {
    Duration::from_millis(self.pii_decision_timeout_ms)
  }
}
