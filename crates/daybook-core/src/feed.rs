//! Recent and per-date task lists of the effective identity.

use tracing::warn;

use crate::backend::{
  CollectionQuery,
  Direction,
  MergePatch,
  QuerySnapshot
};
use crate::error::ValidationError;
use crate::model::Task;
use crate::paths::Paths;
use crate::selector::{
  FullDate,
  Scope
};

pub const CONFIRM_DELETE_TASK: &str = "Are you sure you want to delete this task?";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFeed {
  recent:         Vec<Task>,
  recent_loading: bool,
  dated:          Vec<Task>,
  dated_loading:  bool
}

pub fn recent_query(paths: &Paths, uid: &str, limit: usize) -> CollectionQuery {
  CollectionQuery::new(paths.tasks(uid))
    .order_by("createdAt", Direction::Descending)
    .limit(limit)
}

pub fn dated_query(paths: &Paths, uid: &str, date: &FullDate) -> CollectionQuery {
  CollectionQuery::new(paths.tasks(uid))
    .where_eq("year", date.year)
    .where_eq("month", date.month)
    .where_eq("day", date.day)
}

/// Word used in fetch errors for the scope being viewed.
pub fn scope_label(scope: Scope) -> &'static str {
  match scope {
    | Scope::Own => "user",
    | Scope::Companion => "companion"
  }
}

fn parse_tasks(snapshot: &QuerySnapshot) -> Vec<Task> {
  snapshot
    .documents
    .iter()
    .filter_map(|doc| match Task::from_document(&doc.id, &doc.data) {
      | Ok(task) => Some(task),
      | Err(error) => {
        warn!(id = %doc.id, %error, "skipping unreadable task");
        None
      }
    })
    .collect()
}

/// Creation time ascending; tasks still awaiting their timestamp first.
pub fn sort_by_creation(tasks: &mut [Task]) {
  tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at));
}

pub fn new_task_patch(text: &str, date: &FullDate, owner: &str) -> Result<MergePatch, ValidationError> {
  let text = text.trim();
  if text.is_empty() {
    return Err(ValidationError::EmptyTask);
  }
  Ok(MergePatch::new()
    .set("text", text)
    .set("completed", false)
    .set("year", date.year)
    .set("month", date.month)
    .set("day", date.day)
    .server_timestamp("createdAt")
    .set("userId", owner))
}

impl TaskFeed {
  pub fn recent(&self) -> &[Task] {
    &self.recent
  }

  pub fn dated(&self) -> &[Task] {
    &self.dated
  }

  pub fn is_recent_loading(&self) -> bool {
    self.recent_loading
  }

  pub fn is_dated_loading(&self) -> bool {
    self.dated_loading
  }

  pub fn task(&self, id: &str) -> Option<&Task> {
    self.dated
      .iter()
      .chain(self.recent.iter())
      .find(|t| t.id == id)
  }

  pub fn begin_recent(&mut self) {
    self.recent_loading = true;
  }

  pub fn begin_dated(&mut self) {
    self.dated_loading = true;
  }

  /// Backend already orders and limits the recent list.
  pub fn apply_recent(&mut self, snapshot: &QuerySnapshot) {
    self.recent = parse_tasks(snapshot);
    self.recent_loading = false;
  }

  pub fn apply_dated(&mut self, snapshot: &QuerySnapshot) {
    let mut tasks = parse_tasks(snapshot);
    sort_by_creation(&mut tasks);
    self.dated = tasks;
    self.dated_loading = false;
  }

  pub fn recent_failed(&mut self) {
    self.recent_loading = false;
  }

  pub fn dated_failed(&mut self) {
    self.dated_loading = false;
  }

  pub fn clear_recent(&mut self) {
    self.recent.clear();
    self.recent_loading = false;
  }

  pub fn clear_dated(&mut self) {
    self.dated.clear();
    self.dated_loading = false;
  }

  pub fn reset(&mut self) {
    *self = Self::default();
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;
  use serde_json::{
    json,
    Value
  };

  use super::*;
  use crate::backend::{
    FieldUpdate,
    QueryDocument
  };

  fn doc(id: &str, value: Value) -> QueryDocument {
    QueryDocument {
      id:   id.into(),
      data: value.as_object().cloned().unwrap_or_default()
    }
  }

  fn march_fourth() -> FullDate {
    FullDate {
      year:  2025,
      month: "March",
      day:   4
    }
  }

  #[test]
  fn dated_tasks_sort_with_pending_timestamps_first() {
    let mut feed = TaskFeed::default();
    feed.begin_dated();
    feed.apply_dated(&QuerySnapshot {
      documents: vec![
        doc("late", json!({ "text": "b", "year": 2025, "month": "March", "day": 4,
          "createdAt": "2025-03-04T10:00:00.000000Z" })),
        doc("pending", json!({ "text": "c", "year": 2025, "month": "March", "day": 4 })),
        doc("early", json!({ "text": "a", "year": 2025, "month": "March", "day": 4,
          "createdAt": "2025-03-04T09:00:00.000000Z" })),
        doc("junk", json!({ "text": 5 }))
      ]
    });
    let ids: Vec<&str> = feed.dated().iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["pending", "early", "late"]);
    assert!(!feed.is_dated_loading());
  }

  #[test]
  fn queries_target_the_effective_owner() {
    let paths = Paths::new("app");
    let recent = recent_query(&paths, "bob", 5);
    assert_eq!(recent.collection, "artifacts/app/users/bob/tasks");
    assert_eq!(recent.limit, Some(5));
    assert_eq!(
      recent.order_by,
      Some(("createdAt".to_string(), Direction::Descending))
    );

    let dated = dated_query(&paths, "bob", &march_fourth());
    assert_eq!(
      dated.filters,
      vec![
        ("year".to_string(), json!(2025)),
        ("month".to_string(), json!("March")),
        ("day".to_string(), json!(4))
      ]
    );
  }

  #[test]
  fn new_task_requires_text_and_stamps_creation() {
    assert_eq!(
      new_task_patch("  ", &march_fourth(), "ann"),
      Err(ValidationError::EmptyTask)
    );
    let patch = new_task_patch(" water plants ", &march_fourth(), "ann").expect("valid");
    assert_eq!(patch.get("text"), Some(&FieldUpdate::Set(json!("water plants"))));
    assert_eq!(patch.get("createdAt"), Some(&FieldUpdate::ServerTimestamp));
    assert_eq!(patch.get("userId"), Some(&FieldUpdate::Set(json!("ann"))));
  }
}
