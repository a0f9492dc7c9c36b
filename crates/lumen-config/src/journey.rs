//! Onboarding journey preference.
//!
//! The preference is a plain file in the data directory. Callers load it and
//! hand it to whatever needs it; nothing reads it behind their back.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A named onboarding path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JourneyType {
  AiGuided,
  TemplateBased,
  SelfService,
  Consultation,
}

impl JourneyType {
  pub const ALL: [JourneyType; 4] = [
    JourneyType::AiGuided,
    JourneyType::TemplateBased,
    JourneyType::SelfService,
    JourneyType::Consultation,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      JourneyType::AiGuided => "ai-guided",
      JourneyType::TemplateBased => "template-based",
      JourneyType::SelfService => "self-service",
      JourneyType::Consultation => "consultation",
    }
  }
}

impl fmt::Display for JourneyType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for JourneyType {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
    JourneyType::ALL
      .into_iter()
      .find(|j| j.as_str() == normalized)
      .ok_or_else(|| ConfigError::UnknownJourney(s.to_string()))
  }
}

/// Client-side preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub journey: Option<JourneyType>,
}

impl Preferences {
  /// Load preferences from `path`. A missing file yields the defaults.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    match std::fs::read_to_string(path) {
      Ok(content) => Ok(serde_json::from_str(&content)?),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
      Err(source) => Err(ConfigError::Io {
        path: path.to_path_buf(),
        source,
      }),
    }
  }

  /// Write preferences to `path`, creating the parent directory if needed.
  pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
    let io_err = |source| ConfigError::Io {
      path: path.to_path_buf(),
      source,
    };

    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let content = serde_json::to_string_pretty(self)?;
    std::fs::write(path, content).map_err(io_err)
  }
}
