use serde_json::Value;
use tracing::{
  debug,
  warn
};

use crate::backend::{
  DocumentSnapshot,
  Fields,
  MergePatch
};
use crate::calendar::{
  MAX_YEAR,
  MIN_YEAR
};
use crate::error::ValidationError;

const LIST_FIELD: &str = "list";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearsOutcome {
  Loaded,
  /// Absent or unusable document; the default window must be written.
  NeedsDefaults
}

/// User-managed list of selectable years, always ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearRegistry {
  years:   Vec<i32>,
  loading: bool
}

impl Default for YearRegistry {
  fn default() -> Self {
    Self {
      years:   vec![],
      loading: true
    }
  }
}

pub fn parse_year_input(raw: &str) -> Result<i32, ValidationError> {
  raw.trim()
    .parse::<i32>()
    .ok()
    .filter(|year| (MIN_YEAR..=MAX_YEAR).contains(year))
    .ok_or(ValidationError::InvalidYear)
}

pub fn default_document(window: &[i32]) -> Fields {
  let mut fields = Fields::new();
  fields.insert(
    LIST_FIELD.into(),
    Value::Array(window.iter().copied().map(Value::from).collect())
  );
  fields
}

impl YearRegistry {
  pub fn years(&self) -> &[i32] {
    &self.years
  }

  pub fn is_loading(&self) -> bool {
    self.loading
  }

  pub fn contains(&self, year: i32) -> bool {
    self.years.contains(&year)
  }

  pub fn reset(&mut self) {
    *self = Self::default();
  }

  pub fn apply_snapshot(&mut self, snapshot: &DocumentSnapshot) -> YearsOutcome {
    let Some(list) = snapshot
      .data
      .as_ref()
      .and_then(|fields| fields.get(LIST_FIELD))
      .and_then(Value::as_array)
    else {
      warn!(exists = snapshot.exists(), "year list missing or malformed");
      return YearsOutcome::NeedsDefaults;
    };

    let mut years: Vec<i32> = list
      .iter()
      .filter_map(|v| v.as_i64().and_then(|y| i32::try_from(y).ok()))
      .collect();
    if years.is_empty() {
      warn!("year list has no usable entries");
      return YearsOutcome::NeedsDefaults;
    }
    years.sort_unstable();
    years.dedup();
    debug!(?years, "year list updated");
    self.years = years;
    self.loading = false;
    YearsOutcome::Loaded
  }

  /// Listener failure or failed default write: use the window locally.
  pub fn fall_back(&mut self, window: &[i32]) {
    let mut years = window.to_vec();
    years.sort_unstable();
    self.years = years;
    self.loading = false;
  }

  pub fn add_patch(&self, raw: &str) -> Result<(i32, MergePatch), ValidationError> {
    let year = parse_year_input(raw)?;
    if self.contains(year) {
      return Err(ValidationError::DuplicateYear(year));
    }
    Ok((year, MergePatch::new().union(LIST_FIELD, Value::from(year))))
  }

  pub fn delete_patch(&self, year: i32) -> Result<MergePatch, ValidationError> {
    if self.years.len() <= 1 {
      return Err(ValidationError::LastYear);
    }
    if !self.contains(year) {
      return Err(ValidationError::UnknownYear(year));
    }
    Ok(MergePatch::new().remove(LIST_FIELD, Value::from(year)))
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;
  use serde_json::json;

  use super::*;

  fn snapshot(value: Option<Value>) -> DocumentSnapshot {
    DocumentSnapshot {
      path: "years".into(),
      data: value.and_then(|v| v.as_object().cloned())
    }
  }

  fn loaded(list: Value) -> YearRegistry {
    let mut registry = YearRegistry::default();
    assert_eq!(
      registry.apply_snapshot(&snapshot(Some(json!({ "list": list })))),
      YearsOutcome::Loaded
    );
    registry
  }

  #[test]
  fn list_is_presented_ascending() {
    let registry = loaded(json!([2027, 2025, 2026, 2025]));
    assert_eq!(registry.years(), &[2025, 2026, 2027]);
    assert!(!registry.is_loading());
  }

  #[test]
  fn malformed_documents_need_defaults() {
    let mut registry = YearRegistry::default();
    for doc in [
      None,
      Some(json!({})),
      Some(json!({ "list": "2025" })),
      Some(json!({ "list": ["a", null] }))
    ] {
      assert_eq!(registry.apply_snapshot(&snapshot(doc)), YearsOutcome::NeedsDefaults);
    }
    assert!(registry.is_loading());
    registry.fall_back(&[2026, 2027, 2028]);
    assert_eq!(registry.years(), &[2026, 2027, 2028]);
  }

  #[test]
  fn year_input_must_be_in_range() {
    assert_eq!(parse_year_input(" 2025 "), Ok(2025));
    for bad in ["", "abc", "1899", "2201", "20.5"] {
      assert_eq!(parse_year_input(bad), Err(ValidationError::InvalidYear), "{bad}");
    }
  }

  #[test]
  fn duplicate_year_is_rejected() {
    let registry = loaded(json!([2025]));
    assert_eq!(registry.add_patch("2025"), Err(ValidationError::DuplicateYear(2025)));
    let (year, _) = registry.add_patch("2030").expect("new year");
    assert_eq!(year, 2030);
  }

  #[test]
  fn last_year_cannot_be_deleted() {
    let registry = loaded(json!([2025]));
    assert_eq!(registry.delete_patch(2025), Err(ValidationError::LastYear));

    let registry = loaded(json!([2025, 2026]));
    assert_eq!(registry.delete_patch(1999), Err(ValidationError::UnknownYear(1999)));
    assert!(registry.delete_patch(2026).is_ok());
  }

  #[test]
  fn default_document_lists_the_window() {
    assert_eq!(
      Value::Object(default_document(&[2026, 2027, 2028])),
      json!({ "list": [2026, 2027, 2028] })
    );
  }
}
