use std::cell::Cell;

use chrono::{
  DateTime,
  Duration,
  Local,
  NaiveDate,
  Utc
};

pub trait Clock {
  fn now(&self) -> DateTime<Utc>;

  /// Calendar date used for defaults such as the year window.
  fn today(&self) -> NaiveDate {
    self.now().date_naive()
  }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }

  fn today(&self) -> NaiveDate {
    Local::now().date_naive()
  }
}

/// Manually advanced clock for deterministic timestamps.
#[derive(Debug)]
pub struct ManualClock {
  now: Cell<DateTime<Utc>>
}

impl ManualClock {
  pub fn new(start: DateTime<Utc>) -> Self {
    Self {
      now: Cell::new(start)
    }
  }

  pub fn advance(&self, by: Duration) {
    self.now.set(self.now.get() + by);
  }
}

impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> {
    self.now.get()
  }
}
