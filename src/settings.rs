//! Where the CLI finds its configuration.
//!
//! Layering, lowest first: built-in defaults, the config file, then flags and
//! environment variables (clap folds those two together).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lumen_config::ClientConfig;

pub struct Settings {
  pub data_dir: PathBuf,
  pub config: ClientConfig,
}

impl Settings {
  pub fn resolve(
    data_dir: Option<PathBuf>,
    config_path: Option<PathBuf>,
    base_url: Option<String>,
    token: Option<String>,
  ) -> Result<Self> {
    let data_dir = match data_dir {
      Some(dir) => dir,
      None => dirs::home_dir()
        .context("could not determine home directory")?
        .join(".lumen"),
    };
    let config_path = config_path.unwrap_or_else(|| data_dir.join("config.json"));

    let mut config = ClientConfig::load(&config_path)
      .with_context(|| format!("failed to load config: {}", config_path.display()))?;

    if let Some(base_url) = base_url {
      config.base_url = base_url;
    }
    if let Some(token) = token {
      config.token = Some(token);
    }
    config
      .validate()
      .with_context(|| format!("invalid config: {}", config_path.display()))?;

    Ok(Self { data_dir, config })
  }

  pub fn preferences_path(&self) -> PathBuf {
    preferences_path(&self.data_dir)
  }
}

pub fn preferences_path(data_dir: &Path) -> PathBuf {
  data_dir.join("preferences.json")
}
