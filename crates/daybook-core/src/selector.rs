//! Date selection and data scope.
//!
//! Pure state: no backend access. The workspace consults it to decide which
//! task listeners must exist.

use tracing::warn;

use crate::calendar;
use crate::error::ValidationError;
use crate::model::Companion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
  #[default]
  Own,
  Companion
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
  pub year:  Option<i32>,
  /// Zero-based month index.
  pub month: Option<usize>,
  pub day:   Option<u32>
}

/// A fully specified calendar day, as stored on tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullDate {
  pub year:  i32,
  pub month: &'static str,
  pub day:   u32
}

impl Selection {
  pub fn full_date(&self) -> Option<FullDate> {
    Some(FullDate {
      year:  self.year?,
      month: calendar::month_name(self.month?)?,
      day:   self.day?
    })
  }

  pub fn is_empty(&self) -> bool {
    *self == Self::default()
  }
}

/// Identity whose tasks are shown. Companion scope without a selected
/// companion falls back to the signed-in user.
pub fn effective_identity<'a>(
  scope: Scope,
  signed_in: Option<&'a str>,
  companion: Option<&'a str>
) -> Option<&'a str> {
  let signed_in = signed_in?;
  match (scope, companion) {
    | (Scope::Companion, Some(companion)) => Some(companion),
    | _ => Some(signed_in)
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewSelector {
  selection: Selection,
  scope:     Scope,
  companion: Option<String>
}

impl ViewSelector {
  pub fn selection(&self) -> Selection {
    self.selection
  }

  pub fn scope(&self) -> Scope {
    self.scope
  }

  pub fn companion(&self) -> Option<&str> {
    self.companion.as_deref()
  }

  pub fn effective_identity<'a>(&'a self, signed_in: Option<&'a str>) -> Option<&'a str> {
    effective_identity(self.scope, signed_in, self.companion())
  }

  pub fn reset(&mut self) {
    *self = Self::default();
  }

  pub fn clear_date(&mut self) {
    self.selection = Selection::default();
  }

  pub fn select_year(&mut self, year: Option<i32>) {
    self.selection = Selection {
      year,
      month: None,
      day:   None
    };
  }

  pub fn select_month(&mut self, month: Option<usize>) -> Result<(), ValidationError> {
    if month.is_some() && self.selection.year.is_none() {
      return Err(ValidationError::NoYearSelected);
    }
    self.selection.month = month.filter(|m| *m < calendar::MONTHS.len());
    self.selection.day = None;
    Ok(())
  }

  pub fn select_day(&mut self, day: Option<u32>) -> Result<(), ValidationError> {
    match day {
      | None => {
        self.selection.day = None;
        Ok(())
      }
      | Some(day) if self.valid_days().contains(&day) => {
        self.selection.day = Some(day);
        Ok(())
      }
      | Some(day) => Err(ValidationError::InvalidDay(day))
    }
  }

  /// Days selectable for the current year and month; empty until both
  /// are chosen.
  pub fn valid_days(&self) -> Vec<u32> {
    match (self.selection.year, self.selection.month) {
      | (Some(year), Some(month)) => calendar::days_of_month(year, month),
      | _ => vec![]
    }
  }

  /// Switches between own and companion scope. Clears the date on every
  /// attempt, including a refused one.
  pub fn toggle_scope(&mut self, companions: &[Companion]) -> Result<Scope, ValidationError> {
    self.clear_date();
    match self.scope {
      | Scope::Own => {
        let first = companions.first().ok_or(ValidationError::NoCompanions)?;
        let still_listed = self
          .companion
          .as_deref()
          .is_some_and(|uid| companions.iter().any(|c| c.uid == uid));
        if !still_listed {
          self.companion = Some(first.uid.clone());
        }
        self.scope = Scope::Companion;
      }
      | Scope::Companion => {
        self.scope = Scope::Own;
        self.companion = None;
      }
    }
    Ok(self.scope)
  }

  pub fn select_companion(
    &mut self,
    uid: &str,
    companions: &[Companion]
  ) -> Result<(), ValidationError> {
    if self.scope != Scope::Companion || !companions.iter().any(|c| c.uid == uid) {
      return Err(ValidationError::UnknownCompanion);
    }
    self.companion = Some(uid.to_string());
    self.clear_date();
    Ok(())
  }

  pub fn view_own(&mut self) {
    self.scope = Scope::Own;
    self.companion = None;
  }

  /// Drops back to own scope when the viewed companion is no longer
  /// listed. Returns whether anything changed.
  pub fn revalidate(&mut self, companions: &[Companion]) -> bool {
    let viewed_gone = self
      .companion
      .as_deref()
      .is_some_and(|uid| !companions.iter().any(|c| c.uid == uid));
    if viewed_gone || (self.scope == Scope::Companion && self.companion.is_none()) {
      self.scope = Scope::Own;
      self.companion = None;
      return true;
    }
    false
  }

  /// Applies a stored task's date. An unknown month leaves the selection
  /// untouched; a day outside the month leaves the day unset.
  pub fn jump_to(&mut self, year: i32, month: &str, day: u32) {
    let Some(month_index) = calendar::month_index(month) else {
      warn!(month, "recent task has an unknown month; selection unchanged");
      return;
    };
    self.selection = Selection {
      year:  Some(year),
      month: Some(month_index),
      day:   None
    };
    if calendar::is_valid_day(year, month_index, day) {
      self.selection.day = Some(day);
    } else {
      warn!(year, month, day, "recent task day is outside its month; day reset");
    }
  }
}
