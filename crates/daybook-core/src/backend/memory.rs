//! In-process document service.
//!
//! One [`MemoryService`] holds accounts and documents; each device or
//! browser talks to it through its own [`MemorySession`], which carries the
//! signed-in user. Every committed change re-evaluates all live watchers and
//! delivers a fresh snapshot to those whose result changed.
//!
//! Access policy: a user reads and writes only under their own
//! `users/{uid}` subtree, except that the `tasks` collection of an owner is
//! readable by anyone listed in that owner's companions.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::rc::{
  Rc,
  Weak
};

use argon2::Argon2;
use argon2::password_hash::{
  PasswordHash,
  PasswordHasher,
  PasswordVerifier,
  SaltString
};
use chrono::{
  DateTime,
  Duration,
  SecondsFormat,
  Utc
};
use futures::future;
use serde::{
  Deserialize,
  Serialize
};
use serde_json::Value;
use tracing::{
  debug,
  info,
  warn
};
use uuid::Uuid;

use super::{
  AuthBackend,
  AuthCompletion,
  AuthHandler,
  CollectionQuery,
  Completion,
  Direction,
  DocumentBackend,
  DocumentSnapshot,
  FieldUpdate,
  Fields,
  MergePatch,
  QueryDocument,
  QuerySnapshot,
  SnapshotHandler,
  Subscription
};
use crate::clock::Clock;
use crate::error::{
  AuthError,
  AuthErrorCode,
  BackendError
};
use crate::model::{
  Preferences,
  UserIdentity
};
use crate::paths::{
  self,
  Area,
  Paths
};

/// Storage for the serialized service state.
pub trait Persistence {
  fn load(&self) -> Option<String>;
  fn save(&self, state: &str);
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredState {
  /// Keyed by normalized email.
  #[serde(default)]
  accounts:  BTreeMap<String, Account>,
  /// Session name to signed-in uid.
  #[serde(default)]
  sessions:  BTreeMap<String, String>,
  #[serde(default)]
  documents: BTreeMap<String, Fields>
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Account {
  uid:           String,
  email:         String,
  display_name:  Option<String>,
  /// PHC-encoded argon2 hash.
  password_hash: String
}

impl Account {
  fn identity(&self) -> UserIdentity {
    UserIdentity {
      uid:          self.uid.clone(),
      display_name: self.display_name.clone(),
      email:        Some(self.email.clone())
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
enum Snapshot {
  Document(DocumentSnapshot),
  Query(QuerySnapshot)
}

enum Target {
  Document {
    path:    String,
    handler: Rc<dyn Fn(Result<DocumentSnapshot, BackendError>)>
  },
  Query {
    query:   CollectionQuery,
    handler: Rc<dyn Fn(Result<QuerySnapshot, BackendError>)>
  }
}

struct Watcher {
  session: String,
  target:  Target,
  last:    Option<Result<Snapshot, BackendError>>
}

struct AuthWatcher {
  session: String,
  handler: Rc<dyn Fn(Option<UserIdentity>)>,
  last:    Option<Option<UserIdentity>>
}

#[derive(Default)]
struct Faults {
  write: Option<String>,
  watch: Option<String>
}

#[derive(Default)]
struct Inner {
  state:         StoredState,
  watchers:      BTreeMap<u64, Watcher>,
  auth_watchers: BTreeMap<u64, AuthWatcher>,
  next_watcher:  u64,
  last_stamp:    Option<DateTime<Utc>>,
  writes:        u64,
  faults:        Faults
}

type Delivery = Box<dyn FnOnce()>;

impl Inner {
  fn watcher_id(&mut self) -> u64 {
    self.next_watcher += 1;
    self.next_watcher
  }

  fn viewer(&self, session: &str) -> Option<&str> {
    self.state.sessions.get(session).map(String::as_str)
  }

  fn identity_of(&self, uid: &str) -> Option<UserIdentity> {
    self.state
      .accounts
      .values()
      .find(|account| account.uid == uid)
      .map(Account::identity)
  }

  /// Strictly increasing service time, so creation order is total.
  fn stamp(&mut self, now: DateTime<Utc>) -> String {
    let next = match self.last_stamp {
      | Some(last) if now <= last => last + Duration::microseconds(1),
      | _ => now
    };
    self.last_stamp = Some(next);
    next.to_rfc3339_opts(SecondsFormat::Micros, true)
  }

  fn check_write(&self, session: &str, path: &str) -> Result<(), BackendError> {
    if let Some(message) = &self.faults.write {
      return Err(BackendError::Unavailable(message.clone()));
    }
    let writer = self
      .viewer(session)
      .ok_or(BackendError::PermissionDenied)?;
    match paths::locate(path) {
      | Some(loc) if loc.owner == writer => Ok(()),
      | _ => Err(BackendError::PermissionDenied)
    }
  }

  fn can_read(&self, viewer: Option<&str>, path: &str) -> bool {
    let (Some(viewer), Some(loc)) = (viewer, paths::locate(path)) else {
      return false;
    };
    if loc.owner == viewer {
      return true;
    }
    if loc.area != Area::Tasks {
      return false;
    }
    let prefs_path = Paths::new(loc.app_id).preferences(loc.owner);
    self.state
      .documents
      .get(&prefs_path)
      .is_some_and(|fields| Preferences::from_fields(fields).companion(viewer).is_some())
  }

  fn read_document(&self, session: &str, path: &str) -> Result<Snapshot, BackendError> {
    if !self.can_read(self.viewer(session), path) {
      return Err(BackendError::PermissionDenied);
    }
    Ok(Snapshot::Document(DocumentSnapshot {
      path: path.to_string(),
      data: self.state.documents.get(path).cloned()
    }))
  }

  fn run_query(&self, session: &str, query: &CollectionQuery) -> Result<Snapshot, BackendError> {
    if !self.can_read(self.viewer(session), &query.collection) {
      return Err(BackendError::PermissionDenied);
    }
    let prefix = format!("{}/", query.collection);
    let mut documents: Vec<QueryDocument> = self
      .state
      .documents
      .range(prefix.clone()..)
      .take_while(|(path, _)| path.starts_with(&prefix))
      .filter(|(path, _)| !path[prefix.len()..].contains('/'))
      .filter(|(_, fields)| query.matches(fields))
      .map(|(path, fields)| QueryDocument {
        id:   path[prefix.len()..].to_string(),
        data: fields.clone()
      })
      .collect();

    if let Some((field, direction)) = &query.order_by {
      documents.retain(|doc| doc.data.get(field).is_some_and(|v| !v.is_null()));
      documents.sort_by(|a, b| {
        let ord = compare_values(a.data.get(field), b.data.get(field));
        let ord = match direction {
          | Direction::Ascending => ord,
          | Direction::Descending => ord.reverse()
        };
        ord.then_with(|| a.id.cmp(&b.id))
      });
    }
    if let Some(limit) = query.limit {
      documents.truncate(limit);
    }
    Ok(Snapshot::Query(QuerySnapshot { documents }))
  }

  /// Re-evaluates every watcher and returns the deliveries for those
  /// whose result changed. Called with the borrow held; the deliveries run
  /// after it is released.
  fn collect_deliveries(&mut self) -> Vec<Delivery> {
    let mut out: Vec<Delivery> = Vec::new();

    let mut results = Vec::with_capacity(self.watchers.len());
    for (id, watcher) in &self.watchers {
      let result = match &watcher.target {
        | Target::Document { path, .. } => self.read_document(&watcher.session, path),
        | Target::Query { query, .. } => self.run_query(&watcher.session, query)
      };
      results.push((*id, result));
    }

    for (id, result) in results {
      let Some(watcher) = self.watchers.get_mut(&id) else {
        continue;
      };
      if watcher.last.as_ref() == Some(&result) {
        continue;
      }
      watcher.last = Some(result.clone());
      match (&watcher.target, result) {
        | (Target::Document { handler, .. }, Ok(Snapshot::Document(snap))) => {
          let handler = handler.clone();
          out.push(Box::new(move || handler(Ok(snap))));
        }
        | (Target::Query { handler, .. }, Ok(Snapshot::Query(snap))) => {
          let handler = handler.clone();
          out.push(Box::new(move || handler(Ok(snap))));
        }
        | (Target::Document { handler, .. }, Err(err)) => {
          let handler = handler.clone();
          out.push(Box::new(move || handler(Err(err))));
        }
        | (Target::Query { handler, .. }, Err(err)) => {
          let handler = handler.clone();
          out.push(Box::new(move || handler(Err(err))));
        }
        | _ => {}
      }
    }

    let current: Vec<(u64, Option<UserIdentity>)> = self
      .auth_watchers
      .iter()
      .map(|(id, w)| (*id, self.viewer(&w.session).and_then(|uid| self.identity_of(uid))))
      .collect();
    for (id, identity) in current {
      let Some(watcher) = self.auth_watchers.get_mut(&id) else {
        continue;
      };
      if watcher.last.as_ref() == Some(&identity) {
        continue;
      }
      watcher.last = Some(identity.clone());
      let handler = watcher.handler.clone();
      out.push(Box::new(move || handler(identity)));
    }

    out
  }
}

/// Shared service state. Cloning yields another handle to the same service.
#[derive(Clone)]
pub struct MemoryService {
  inner:            Rc<RefCell<Inner>>,
  persistence:      Option<Rc<dyn Persistence>>,
  clock:            Rc<dyn Clock>,
  min_password_len: usize
}

impl MemoryService {
  #[tracing::instrument(skip(persistence, clock))]
  pub fn open(
    persistence: Option<Rc<dyn Persistence>>,
    clock: Rc<dyn Clock>,
    min_password_len: usize
  ) -> Self {
    let state = persistence
      .as_ref()
      .and_then(|p| p.load())
      .and_then(|raw| match serde_json::from_str::<StoredState>(&raw) {
        | Ok(state) => Some(state),
        | Err(error) => {
          warn!(%error, "discarding unreadable persisted backend state");
          None
        }
      })
      .unwrap_or_default();

    info!(
      accounts = state.accounts.len(),
      documents = state.documents.len(),
      "opened in-process backend"
    );

    Self {
      inner: Rc::new(RefCell::new(Inner {
        state,
        ..Inner::default()
      })),
      persistence,
      clock,
      min_password_len
    }
  }

  pub fn session(&self, name: &str) -> MemorySession {
    MemorySession {
      service: self.clone(),
      name:    name.to_string()
    }
  }

  /// Makes every subsequent write fail with `message` (`None` clears).
  pub fn fail_writes(&self, message: Option<&str>) {
    self.inner.borrow_mut().faults.write = message.map(str::to_string);
  }

  /// Makes every subsequent watch registration fail with `message`.
  pub fn fail_watches(&self, message: Option<&str>) {
    self.inner.borrow_mut().faults.watch = message.map(str::to_string);
  }

  pub fn document(&self, path: &str) -> Option<Fields> {
    self.inner.borrow().state.documents.get(path).cloned()
  }

  /// Number of writes applied so far.
  pub fn write_count(&self) -> u64 {
    self.inner.borrow().writes
  }

  pub fn active_watchers(&self) -> usize {
    let inner = self.inner.borrow();
    inner.watchers.len() + inner.auth_watchers.len()
  }

  /// Persists and fans out after a change. Must run without the borrow.
  fn commit(&self) {
    let (serialized, deliveries) = {
      let mut inner = self.inner.borrow_mut();
      let serialized = self
        .persistence
        .as_ref()
        .map(|_| serde_json::to_string(&inner.state));
      (serialized, inner.collect_deliveries())
    };

    if let (Some(persistence), Some(serialized)) = (&self.persistence, serialized) {
      match serialized {
        | Ok(json) => persistence.save(&json),
        | Err(error) => warn!(%error, "failed to serialize backend state")
      }
    }

    debug!(count = deliveries.len(), "delivering snapshots");
    for deliver in deliveries {
      deliver();
    }
  }

  fn write<T>(
    &self,
    session: &str,
    path: &str,
    apply: impl FnOnce(&mut Inner) -> Result<T, BackendError>
  ) -> Result<T, BackendError> {
    let result = {
      let mut inner = self.inner.borrow_mut();
      inner.check_write(session, path)?;
      let result = apply(&mut inner)?;
      inner.writes += 1;
      result
    };
    self.commit();
    Ok(result)
  }

  fn register_watcher(&self, session: &str, target: Target) -> Subscription {
    let id = {
      let mut inner = self.inner.borrow_mut();
      let id = inner.watcher_id();
      inner.watchers.insert(
        id,
        Watcher {
          session: session.to_string(),
          target,
          last: None
        }
      );
      id
    };
    self.commit();

    let weak: Weak<RefCell<Inner>> = Rc::downgrade(&self.inner);
    Subscription::new(move || {
      if let Some(inner) = weak.upgrade() {
        inner.borrow_mut().watchers.remove(&id);
      }
    })
  }

  fn watch_fault(&self) -> Option<BackendError> {
    self.inner
      .borrow()
      .faults
      .watch
      .clone()
      .map(BackendError::Unavailable)
  }
}

/// One client's view of a [`MemoryService`].
#[derive(Clone)]
pub struct MemorySession {
  service: MemoryService,
  name:    String
}

impl MemorySession {
  pub fn service(&self) -> &MemoryService {
    &self.service
  }

  pub fn current_user(&self) -> Option<UserIdentity> {
    let inner = self.service.inner.borrow();
    inner
      .viewer(&self.name)
      .and_then(|uid| inner.identity_of(uid))
  }

  fn register_account(
    &self,
    email: &str,
    password: &str,
    display_name: &str
  ) -> Result<UserIdentity, AuthError> {
    let email = normalize_email(email);
    if !looks_like_email(&email) {
      return Err(AuthError::new(
        AuthErrorCode::InvalidEmail,
        "The email address is badly formatted."
      ));
    }
    if password.chars().count() < self.service.min_password_len {
      return Err(AuthError::new(
        AuthErrorCode::WeakPassword(self.service.min_password_len),
        format!(
          "Password should be at least {} characters.",
          self.service.min_password_len
        )
      ));
    }

    let identity = {
      let mut inner = self.service.inner.borrow_mut();
      if inner.state.accounts.contains_key(&email) {
        return Err(AuthError::new(
          AuthErrorCode::EmailAlreadyInUse,
          "The email address is already in use by another account."
        ));
      }
      let account = Account {
        uid:           Uuid::new_v4().simple().to_string(),
        email:         email.clone(),
        display_name:  Some(display_name.trim().to_string()),
        password_hash: hash_password(password)?
      };
      let identity = account.identity();
      inner
        .state
        .sessions
        .insert(self.name.clone(), account.uid.clone());
      inner.state.accounts.insert(email, account);
      identity
    };

    info!(uid = %identity.uid, session = %self.name, "registered account");
    self.service.commit();
    Ok(identity)
  }

  fn authenticate(&self, email: &str, password: &str) -> Result<UserIdentity, AuthError> {
    let email = normalize_email(email);
    if !looks_like_email(&email) {
      return Err(AuthError::new(
        AuthErrorCode::InvalidEmail,
        "The email address is badly formatted."
      ));
    }

    let identity = {
      let mut inner = self.service.inner.borrow_mut();
      let invalid = || {
        AuthError::new(
          AuthErrorCode::InvalidCredential,
          "The supplied auth credential is incorrect."
        )
      };
      let account = inner.state.accounts.get(&email).ok_or_else(invalid)?;
      if !verify_password(&account.password_hash, password)? {
        return Err(invalid());
      }
      let identity = account.identity();
      inner
        .state
        .sessions
        .insert(self.name.clone(), identity.uid.clone());
      identity
    };

    info!(uid = %identity.uid, session = %self.name, "signed in");
    self.service.commit();
    Ok(identity)
  }
}

impl AuthBackend for MemorySession {
  #[tracing::instrument(skip(self, password, display_name), fields(session = %self.name))]
  fn register(
    &self,
    email: &str,
    password: &str,
    display_name: &str
  ) -> AuthCompletion<UserIdentity> {
    Box::pin(future::ready(self.register_account(email, password, display_name)))
  }

  #[tracing::instrument(skip(self, password), fields(session = %self.name))]
  fn sign_in(&self, email: &str, password: &str) -> AuthCompletion<UserIdentity> {
    Box::pin(future::ready(self.authenticate(email, password)))
  }

  #[tracing::instrument(skip(self), fields(session = %self.name))]
  fn sign_out(&self) -> AuthCompletion<()> {
    let removed = self
      .service
      .inner
      .borrow_mut()
      .state
      .sessions
      .remove(&self.name);
    if removed.is_some() {
      info!(session = %self.name, "signed out");
      self.service.commit();
    }
    Box::pin(future::ready(Ok(())))
  }

  fn watch_auth(&self, handler: AuthHandler) -> Subscription {
    let id = {
      let mut inner = self.service.inner.borrow_mut();
      let id = inner.watcher_id();
      inner.auth_watchers.insert(
        id,
        AuthWatcher {
          session: self.name.clone(),
          handler: Rc::from(handler),
          last:    None
        }
      );
      id
    };
    self.service.commit();

    let weak = Rc::downgrade(&self.service.inner);
    Subscription::new(move || {
      if let Some(inner) = weak.upgrade() {
        inner.borrow_mut().auth_watchers.remove(&id);
      }
    })
  }
}

impl DocumentBackend for MemorySession {
  #[tracing::instrument(skip(self, handler), fields(session = %self.name))]
  fn watch_document(
    &self,
    path: &str,
    handler: SnapshotHandler<DocumentSnapshot>
  ) -> Subscription {
    if let Some(err) = self.service.watch_fault() {
      warn!(%err, "document watch rejected");
      handler(Err(err));
      return Subscription::new(|| {});
    }
    self.service.register_watcher(
      &self.name,
      Target::Document {
        path:    path.to_string(),
        handler: Rc::from(handler)
      }
    )
  }

  #[tracing::instrument(skip(self, query, handler), fields(session = %self.name, collection = %query.collection))]
  fn watch_query(
    &self,
    query: &CollectionQuery,
    handler: SnapshotHandler<QuerySnapshot>
  ) -> Subscription {
    if let Some(err) = self.service.watch_fault() {
      warn!(%err, "query watch rejected");
      handler(Err(err));
      return Subscription::new(|| {});
    }
    self.service.register_watcher(
      &self.name,
      Target::Query {
        query:   query.clone(),
        handler: Rc::from(handler)
      }
    )
  }

  #[tracing::instrument(skip(self, fields), fields(session = %self.name))]
  fn set_document(&self, path: &str, fields: Fields) -> Completion<()> {
    let result = self.service.write(&self.name, path, |inner| {
      inner.state.documents.insert(path.to_string(), fields);
      Ok(())
    });
    Box::pin(future::ready(result))
  }

  #[tracing::instrument(skip(self, patch), fields(session = %self.name))]
  fn merge_document(&self, path: &str, patch: MergePatch) -> Completion<()> {
    let now = self.service.clock.now();
    let result = self.service.write(&self.name, path, |inner| {
      let stamp = inner.stamp(now);
      let doc = inner.state.documents.entry(path.to_string()).or_default();
      apply_patch(doc, &patch, &stamp);
      Ok(())
    });
    Box::pin(future::ready(result))
  }

  #[tracing::instrument(skip(self, patch), fields(session = %self.name))]
  fn create_document(&self, collection: &str, patch: MergePatch) -> Completion<String> {
    let now = self.service.clock.now();
    let id = Uuid::new_v4().simple().to_string();
    let path = format!("{collection}/{id}");
    let result = self.service.write(&self.name, &path, |inner| {
      let stamp = inner.stamp(now);
      let mut doc = Fields::new();
      apply_patch(&mut doc, &patch, &stamp);
      inner.state.documents.insert(path.clone(), doc);
      Ok(id.clone())
    });
    Box::pin(future::ready(result))
  }

  #[tracing::instrument(skip(self), fields(session = %self.name))]
  fn delete_document(&self, path: &str) -> Completion<()> {
    let result = self.service.write(&self.name, path, |inner| {
      inner.state.documents.remove(path);
      Ok(())
    });
    Box::pin(future::ready(result))
  }
}

fn apply_patch(doc: &mut Fields, patch: &MergePatch, stamp: &str) {
  for (field, update) in patch.iter() {
    match update {
      | FieldUpdate::Set(value) => {
        doc.insert(field.clone(), value.clone());
      }
      | FieldUpdate::ArrayUnion(values) => {
        let slot = doc
          .entry(field.clone())
          .or_insert_with(|| Value::Array(vec![]));
        if !slot.is_array() {
          *slot = Value::Array(vec![]);
        }
        if let Value::Array(items) = slot {
          for value in values {
            if !items.contains(value) {
              items.push(value.clone());
            }
          }
        }
      }
      | FieldUpdate::ArrayRemove(values) => match doc.get_mut(field) {
        | Some(Value::Array(items)) => items.retain(|item| !values.contains(item)),
        | _ => {
          doc.insert(field.clone(), Value::Array(vec![]));
        }
      },
      | FieldUpdate::ServerTimestamp => {
        doc.insert(field.clone(), Value::from(stamp));
      }
    }
  }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
  fn rank(value: Option<&Value>) -> u8 {
    match value {
      | None | Some(Value::Null) => 0,
      | Some(Value::Bool(_)) => 1,
      | Some(Value::Number(_)) => 2,
      | Some(Value::String(_)) => 3,
      | Some(Value::Array(_)) => 4,
      | Some(Value::Object(_)) => 5
    }
  }

  match (a, b) {
    | (Some(Value::Number(x)), Some(Value::Number(y))) => x
      .as_f64()
      .partial_cmp(&y.as_f64())
      .unwrap_or(Ordering::Equal),
    | (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
    | (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
    | _ => rank(a).cmp(&rank(b))
  }
}

fn normalize_email(email: &str) -> String {
  email.trim().to_ascii_lowercase()
}

fn looks_like_email(email: &str) -> bool {
  let Some((local, domain)) = email.split_once('@') else {
    return false;
  };
  !local.is_empty()
    && !domain.contains('@')
    && !email.chars().any(char::is_whitespace)
    && domain
      .split_once('.')
      .is_some_and(|(head, tail)| !head.is_empty() && !tail.is_empty())
    && !domain.ends_with('.')
}

fn internal(error: impl std::fmt::Display) -> AuthError {
  AuthError::new(
    AuthErrorCode::Other("auth/internal-error".into()),
    error.to_string()
  )
}

fn hash_password(password: &str) -> Result<String, AuthError> {
  let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes()).map_err(internal)?;
  let hash = Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map_err(internal)?;
  Ok(hash.to_string())
}

fn verify_password(stored: &str, password: &str) -> Result<bool, AuthError> {
  let parsed = PasswordHash::new(stored).map_err(internal)?;
  Ok(Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .is_ok())
}
