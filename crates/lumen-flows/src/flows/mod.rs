pub mod guided;
pub mod join;
pub mod ml_analysis;
pub mod payment;
pub mod pii_decision;
pub mod trial_upload;
pub mod upgrade;

/// Trimmed value, or `None` when blank.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
  value.map(str::trim).filter(|v| !v.is_empty())
}
