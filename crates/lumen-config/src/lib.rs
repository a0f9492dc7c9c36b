//! Lumen Config
//!
//! Serializable configuration for the Lumen client. Nothing in here is read
//! from ambient global state: the CLI loads these types from JSON files and
//! passes them down explicitly.
//!
//! Configuration can come from:
//! - a JSON config file (`~/.lumen/config.json` by default)
//! - CLI flags and `LUMEN_*` environment variables layered on top
//!
//! # Example
//!
//! ```json
//! {
//!   "base_url": "https://app.example.com",
//!   "token": "secret",
//!   "pii_decision_timeout_ms": 60000,
//!   "tiers": [
//!     { "tier": "trial", "max_file_size_bytes": 10485760, "max_records": 1000 }
//!   ]
//! }
//! ```

mod client;
mod error;
mod journey;
mod tier;

pub use client::ClientConfig;
pub use error::ConfigError;
pub use journey::{JourneyType, Preferences};
pub use tier::{Tier, TierLimits, default_tiers};
