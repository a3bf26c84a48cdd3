use chrono::{
  Datelike,
  NaiveDate
};

/// Month names as stored on task documents. Tasks carry the name, never the
/// index, so this table is part of the wire format.
pub const MONTHS: [&str; 12] = [
  "January",
  "February",
  "March",
  "April",
  "May",
  "June",
  "July",
  "August",
  "September",
  "October",
  "November",
  "December"
];

pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 2200;

pub fn month_name(month_index: usize) -> Option<&'static str> {
  MONTHS.get(month_index).copied()
}

pub fn month_index(name: &str) -> Option<usize> {
  MONTHS.iter().position(|m| *m == name)
}

/// Number of days in the zero-based `month_index` of `year`, leap years
/// included. `None` when the month index is outside 0..=11 or the year is
/// outside chrono's representable range.
pub fn days_in_month(year: i32, month_index: usize) -> Option<u32> {
  if month_index > 11 {
    return None;
  }
  let month = month_index as u32 + 1;
  let first = NaiveDate::from_ymd_opt(year, month, 1)?;
  let next = if month == 12 {
    NaiveDate::from_ymd_opt(year + 1, 1, 1)?
  } else {
    NaiveDate::from_ymd_opt(year, month + 1, 1)?
  };
  u32::try_from(next.signed_duration_since(first).num_days()).ok()
}

/// Selectable days `1..=n` for the month, empty for an invalid month.
pub fn days_of_month(year: i32, month_index: usize) -> Vec<u32> {
  days_in_month(year, month_index)
    .map(|n| (1..=n).collect())
    .unwrap_or_default()
}

pub fn is_valid_day(year: i32, month_index: usize, day: u32) -> bool {
  day >= 1 && days_in_month(year, month_index).is_some_and(|n| day <= n)
}

/// Default year registry: the current year and the two following it.
pub fn default_year_window(today: NaiveDate) -> Vec<i32> {
  let year = today.year();
  vec![year, year + 1, year + 2]
}
