//! Boundary to the service that owns authentication, documents and live
//! queries.
//!
//! The client never touches storage directly: it issues writes that
//! complete asynchronously and registers handlers that receive a full
//! snapshot whenever the watched document or query result changes. Dropping
//! (or cancelling) the returned [`Subscription`] stops delivery.

pub mod memory;

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use serde_json::Value;
use tracing::info;

pub use memory::{
  MemoryService,
  MemorySession,
  Persistence
};

use crate::clock::Clock;
use crate::config::{
  Config,
  MEMORY_BACKEND
};
use crate::error::{
  AuthError,
  BackendError,
  ConfigError
};
use crate::model::UserIdentity;

pub type Fields = serde_json::Map<String, Value>;

pub type Completion<T> = LocalBoxFuture<'static, Result<T, BackendError>>;
pub type AuthCompletion<T> = LocalBoxFuture<'static, Result<T, AuthError>>;
pub type SnapshotHandler<T> = Box<dyn Fn(Result<T, BackendError>)>;
pub type AuthHandler = Box<dyn Fn(Option<UserIdentity>)>;

/// Live listener registration. Delivery stops when this is cancelled or
/// dropped.
pub struct Subscription {
  cancel: Option<Box<dyn FnOnce()>>
}

impl Subscription {
  pub fn new(cancel: impl FnOnce() + 'static) -> Self {
    Self {
      cancel: Some(Box::new(cancel))
    }
  }

  pub fn cancel(mut self) {
    if let Some(cancel) = self.cancel.take() {
      cancel();
    }
  }
}

impl Drop for Subscription {
  fn drop(&mut self) {
    if let Some(cancel) = self.cancel.take() {
      cancel();
    }
  }
}

impl fmt::Debug for Subscription {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Subscription")
      .field("active", &self.cancel.is_some())
      .finish()
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
  pub path: String,
  pub data: Option<Fields>
}

impl DocumentSnapshot {
  pub fn exists(&self) -> bool {
    self.data.is_some()
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryDocument {
  pub id:   String,
  pub data: Fields
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuerySnapshot {
  pub documents: Vec<QueryDocument>
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
  Set(Value),
  /// Appends each element not already present in the stored array.
  ArrayUnion(Vec<Value>),
  /// Removes every stored element equal to one of these.
  ArrayRemove(Vec<Value>),
  /// Replaced by the service's clock when the write is applied.
  ServerTimestamp
}

/// Partial write: named fields are updated, every other field is kept.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MergePatch {
  fields: BTreeMap<String, FieldUpdate>
}

impl MergePatch {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
    self.fields
      .insert(field.to_string(), FieldUpdate::Set(value.into()));
    self
  }

  pub fn union(mut self, field: &str, value: Value) -> Self {
    self.fields
      .insert(field.to_string(), FieldUpdate::ArrayUnion(vec![value]));
    self
  }

  pub fn remove(mut self, field: &str, value: Value) -> Self {
    self.fields
      .insert(field.to_string(), FieldUpdate::ArrayRemove(vec![value]));
    self
  }

  pub fn server_timestamp(mut self, field: &str) -> Self {
    self.fields
      .insert(field.to_string(), FieldUpdate::ServerTimestamp);
    self
  }

  pub fn get(&self, field: &str) -> Option<&FieldUpdate> {
    self.fields.get(field)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldUpdate)> {
    self.fields.iter()
  }

  pub fn is_empty(&self) -> bool {
    self.fields.is_empty()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
  Ascending,
  Descending
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionQuery {
  pub collection: String,
  pub filters:    Vec<(String, Value)>,
  pub order_by:   Option<(String, Direction)>,
  pub limit:      Option<usize>
}

impl CollectionQuery {
  pub fn new(collection: impl Into<String>) -> Self {
    Self {
      collection: collection.into(),
      filters:    vec![],
      order_by:   None,
      limit:      None
    }
  }

  pub fn where_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
    self.filters.push((field.to_string(), value.into()));
    self
  }

  pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
    self.order_by = Some((field.to_string(), direction));
    self
  }

  pub fn limit(mut self, limit: usize) -> Self {
    self.limit = Some(limit);
    self
  }

  pub fn matches(&self, fields: &Fields) -> bool {
    self.filters
      .iter()
      .all(|(field, expected)| fields.get(field) == Some(expected))
  }
}

pub trait AuthBackend {
  fn register(&self, email: &str, password: &str, display_name: &str)
  -> AuthCompletion<UserIdentity>;

  fn sign_in(&self, email: &str, password: &str) -> AuthCompletion<UserIdentity>;

  fn sign_out(&self) -> AuthCompletion<()>;

  /// Delivers the current identity immediately, then on every change.
  fn watch_auth(&self, handler: AuthHandler) -> Subscription;
}

pub trait DocumentBackend {
  fn watch_document(&self, path: &str, handler: SnapshotHandler<DocumentSnapshot>)
  -> Subscription;

  fn watch_query(
    &self,
    query: &CollectionQuery,
    handler: SnapshotHandler<QuerySnapshot>
  ) -> Subscription;

  /// Replaces the whole document.
  fn set_document(&self, path: &str, fields: Fields) -> Completion<()>;

  /// Applies a partial update, creating the document when absent.
  fn merge_document(&self, path: &str, patch: MergePatch) -> Completion<()>;

  /// Creates a document with a service-assigned id and returns the id.
  fn create_document(&self, collection: &str, patch: MergePatch) -> Completion<String>;

  fn delete_document(&self, path: &str) -> Completion<()>;
}

pub trait Backend: AuthBackend + DocumentBackend {}

impl<T: AuthBackend + DocumentBackend> Backend for T {}

/// Opens the backend named by the configuration for one client session.
#[tracing::instrument(skip(config, persistence, clock))]
pub fn connect(
  config: &Config,
  persistence: Option<Rc<dyn Persistence>>,
  clock: Rc<dyn Clock>,
  session: &str
) -> Result<Rc<dyn Backend>, ConfigError> {
  match config.backend.kind.as_str() {
    | MEMORY_BACKEND => {
      info!(session, persisted = persistence.is_some(), "opening in-process backend");
      let service = MemoryService::open(persistence, clock, config.auth.min_password_len);
      Ok(Rc::new(service.session(session)))
    }
    | other => Err(ConfigError::UnsupportedBackend(other.to_string()))
  }
}

#[cfg(test)]
mod tests {
  use std::cell::Cell;

  use serde_json::json;

  use super::*;

  #[test]
  fn subscription_cancels_once_on_drop() {
    let calls = Rc::new(Cell::new(0));
    {
      let calls = calls.clone();
      let _sub = Subscription::new(move || calls.set(calls.get() + 1));
    }
    assert_eq!(calls.get(), 1);

    let explicit = {
      let calls = calls.clone();
      Subscription::new(move || calls.set(calls.get() + 1))
    };
    explicit.cancel();
    assert_eq!(calls.get(), 2);
  }

  #[test]
  fn query_filters_require_exact_matches() {
    let query = CollectionQuery::new("tasks")
      .where_eq("year", 2025)
      .where_eq("month", "March");
    let mut fields = Fields::new();
    fields.insert("year".into(), json!(2025));
    fields.insert("month".into(), json!("March"));
    assert!(query.matches(&fields));

    fields.insert("month".into(), json!("April"));
    assert!(!query.matches(&fields));
    fields.remove("month");
    assert!(!query.matches(&fields));
  }
}
