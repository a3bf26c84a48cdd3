//! Client state machine.
//!
//! A [`Workspace`] owns every store and the live listeners feeding them.
//! Operations validate locally, start backend calls on the local spawner and
//! return immediately; results, snapshots, confirmation answers and auth
//! changes come back as [`Event`]s and are applied by [`Workspace::pump`].
//! Nothing re-enters the workspace from inside a backend callback.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use futures::channel::mpsc::{
  self,
  UnboundedReceiver,
  UnboundedSender
};
use futures::task::{
  LocalSpawn,
  LocalSpawnExt
};
use futures::{
  FutureExt,
  StreamExt
};
use tracing::{
  debug,
  info,
  warn
};

use crate::backend::{
  Backend,
  Completion,
  DocumentSnapshot,
  MergePatch,
  QuerySnapshot,
  Subscription
};
use crate::calendar;
use crate::clock::Clock;
use crate::config::Config;
use crate::confirm::ConfirmService;
use crate::error::{
  ActionError,
  AuthError,
  BackendError,
  ValidationError
};
use crate::feed::{
  self,
  TaskFeed,
  CONFIRM_DELETE_TASK
};
use crate::model::{
  Companion,
  Preferences,
  Theme,
  UserIdentity
};
use crate::paths::Paths;
use crate::preferences::{
  PreferenceStore,
  PreferencesOutcome,
  INIT_FAILED,
  LOAD_FAILED
};
use crate::selector::{
  FullDate,
  Scope,
  ViewSelector
};
use crate::session::{
  self,
  SessionChange,
  SessionStore
};
use crate::years::{
  self,
  YearRegistry,
  YearsOutcome
};

const SETTINGS_TTL: Duration = Duration::from_secs(2);
const SCOPE_TTL: Duration = Duration::from_secs(3);

/// Executor and user-facing services the workspace depends on.
#[derive(Clone)]
pub struct Runtime {
  pub spawner: Rc<dyn LocalSpawn>,
  pub confirm: Rc<dyn ConfirmService>,
  pub clock:   Rc<dyn Clock>
}

/// Where a message is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeSlot {
  Auth,
  General,
  Settings,
  Years,
  Recent
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
  pub id:   u64,
  pub text: String,
  /// Clear after this long, if set.
  pub ttl:  Option<Duration>
}

#[derive(Debug, Default)]
struct Notices {
  auth:     Option<Notice>,
  general:  Option<Notice>,
  settings: Option<Notice>,
  years:    Option<Notice>,
  recent:   Option<Notice>,
  next_id:  u64
}

impl Notices {
  fn slot(&mut self, slot: NoticeSlot) -> &mut Option<Notice> {
    match slot {
      | NoticeSlot::Auth => &mut self.auth,
      | NoticeSlot::General => &mut self.general,
      | NoticeSlot::Settings => &mut self.settings,
      | NoticeSlot::Years => &mut self.years,
      | NoticeSlot::Recent => &mut self.recent
    }
  }

  fn get(&self, slot: NoticeSlot) -> Option<&Notice> {
    match slot {
      | NoticeSlot::Auth => self.auth.as_ref(),
      | NoticeSlot::General => self.general.as_ref(),
      | NoticeSlot::Settings => self.settings.as_ref(),
      | NoticeSlot::Years => self.years.as_ref(),
      | NoticeSlot::Recent => self.recent.as_ref()
    }
  }

  fn post(&mut self, slot: NoticeSlot, text: String, ttl: Option<Duration>) {
    self.next_id += 1;
    let id = self.next_id;
    *self.slot(slot) = Some(Notice { id, text, ttl });
  }
}

/// Writes whose outcome the workspace reports on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
  SeedPreferences,
  InitPreferences,
  InitYears,
  Theme,
  Nickname,
  AddCompanion,
  RemoveCompanion(String),
  AddYear,
  DeleteYear(i32),
  AddTask,
  ToggleTask,
  DeleteTask
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
  DeleteYear(i32),
  DeleteTask(String)
}

#[derive(Debug)]
pub enum AuthOutcome {
  Registered(Result<UserIdentity, AuthError>),
  SignedIn(Result<UserIdentity, AuthError>),
  SignedOut(Result<(), AuthError>)
}

#[derive(Debug)]
pub enum Event {
  AuthChanged(Option<UserIdentity>),
  AuthSettled(AuthOutcome),
  Preferences {
    generation: u64,
    result:     Result<DocumentSnapshot, BackendError>
  },
  Years {
    generation: u64,
    result:     Result<DocumentSnapshot, BackendError>
  },
  RecentTasks {
    generation: u64,
    result:     Result<QuerySnapshot, BackendError>
  },
  DatedTasks {
    generation: u64,
    result:     Result<QuerySnapshot, BackendError>
  },
  Written {
    op:     WriteOp,
    result: Result<(), BackendError>
  },
  Confirmed {
    action:   PendingAction,
    accepted: bool
  }
}

type Notifier = Rc<dyn Fn()>;

/// Sending half of the event queue, shared by every callback.
#[derive(Clone)]
struct EventSink {
  tx:       UnboundedSender<Event>,
  notifier: Rc<RefCell<Option<Notifier>>>
}

impl EventSink {
  fn send(&self, event: Event) {
    if self.tx.unbounded_send(event).is_err() {
      debug!("workspace gone; dropping event");
      return;
    }
    let notifier = self.notifier.borrow().clone();
    if let Some(notify) = notifier {
      notify();
    }
  }
}

struct Listener<K> {
  key:           K,
  generation:    u64,
  _subscription: Subscription
}

#[derive(Default)]
struct Listeners {
  auth:            Option<Subscription>,
  preferences:     Option<Listener<String>>,
  years:           Option<Listener<String>>,
  recent:          Option<Listener<String>>,
  dated:           Option<Listener<(String, FullDate)>>,
  next_generation: u64
}

fn is_current<K>(listener: &Option<Listener<K>>, generation: u64) -> bool {
  listener.as_ref().is_some_and(|l| l.generation == generation)
}

pub struct Workspace {
  backend:      Option<Rc<dyn Backend>>,
  paths:        Paths,
  recent_limit: usize,
  runtime:      Runtime,
  sink:         EventSink,
  inbox:        UnboundedReceiver<Event>,
  listeners:    Listeners,
  session:      SessionStore,
  preferences:  PreferenceStore,
  years:        YearRegistry,
  selector:     ViewSelector,
  feed:         TaskFeed,
  notices:      Notices
}

impl Workspace {
  pub fn new(config: &Config, backend: Option<Rc<dyn Backend>>, runtime: Runtime) -> Self {
    let (tx, inbox) = mpsc::unbounded();
    Self {
      backend,
      paths:        Paths::new(config.app_id.clone()),
      recent_limit: config.tasks.recent_limit,
      runtime,
      sink: EventSink {
        tx,
        notifier: Rc::new(RefCell::new(None))
      },
      inbox,
      listeners:   Listeners::default(),
      session:     SessionStore::default(),
      preferences: PreferenceStore::default(),
      years:       YearRegistry::default(),
      selector:    ViewSelector::default(),
      feed:        TaskFeed::default(),
      notices:     Notices::default()
    }
  }

  /// Called after each queued event, from whatever context produced it.
  /// Must not call back into the workspace synchronously.
  pub fn set_notifier(&self, notify: impl Fn() + 'static) {
    *self.sink.notifier.borrow_mut() = Some(Rc::new(notify));
  }

  /// Records a setup failure that prevents any backend access.
  pub fn fail_setup(&mut self, message: impl Into<String>) {
    let message = message.into();
    warn!(%message, "workspace setup failed");
    self.session.fail(message);
  }

  /// Subscribes to the auth stream.
  #[tracing::instrument(skip(self))]
  pub fn start(&mut self) {
    let Some(backend) = self.backend.clone() else {
      if self.session.config_error().is_none() {
        self.fail_setup(ActionError::NotConfigured.to_string());
      }
      return;
    };
    let sink = self.sink.clone();
    self.listeners.auth = Some(
      backend.watch_auth(Box::new(move |identity| sink.send(Event::AuthChanged(identity))))
    );
    info!(app_id = self.paths.app_id(), "listening for auth changes");
  }

  /// Applies every queued event. Returns how many were handled.
  pub fn pump(&mut self) -> usize {
    let mut handled = 0;
    while let Some(Some(event)) = self.inbox.next().now_or_never() {
      self.handle(event);
      handled += 1;
    }
    if handled > 0 {
      self.reconcile_listeners();
    }
    handled
  }

  // ----- read accessors -----

  pub fn session(&self) -> &SessionStore {
    &self.session
  }

  pub fn user(&self) -> Option<&UserIdentity> {
    self.session.user()
  }

  pub fn preferences(&self) -> &Preferences {
    self.preferences.current()
  }

  pub fn theme(&self) -> Theme {
    self.preferences.theme()
  }

  pub fn companions(&self) -> &[Companion] {
    self.preferences.companions()
  }

  pub fn years(&self) -> &YearRegistry {
    &self.years
  }

  pub fn selector(&self) -> &ViewSelector {
    &self.selector
  }

  pub fn feed(&self) -> &TaskFeed {
    &self.feed
  }

  pub fn notice(&self, slot: NoticeSlot) -> Option<&Notice> {
    self.notices.get(slot)
  }

  pub fn paths(&self) -> &Paths {
    &self.paths
  }

  pub fn effective_identity(&self) -> Option<&str> {
    self.selector.effective_identity(self.session.uid())
  }

  pub fn viewed_companion(&self) -> Option<&Companion> {
    match self.selector.scope() {
      | Scope::Companion => self
        .selector
        .companion()
        .and_then(|uid| self.preferences.current().companion(uid)),
      | Scope::Own => None
    }
  }

  pub fn is_read_only(&self) -> bool {
    self.selector.scope() == Scope::Companion
  }

  /// Clears the notice only if it is still the one with `id`.
  pub fn clear_notice(&mut self, slot: NoticeSlot, id: u64) {
    let current = self.notices.slot(slot);
    if current.as_ref().is_some_and(|n| n.id == id) {
      *current = None;
    }
  }

  pub fn dismiss_notice(&mut self, slot: NoticeSlot) {
    *self.notices.slot(slot) = None;
  }

  // ----- auth -----

  #[tracing::instrument(skip(self, password, display_name))]
  pub fn register(
    &mut self,
    email: &str,
    password: &str,
    display_name: &str
  ) -> Result<(), ActionError> {
    self.dismiss_notice(NoticeSlot::Auth);
    let backend = self.auth_backend()?;
    let display_name = session::validate_registration(email, password, display_name)
      .map_err(|e| self.reject(NoticeSlot::Auth, e.into()))?;
    let pending = backend.register(email, password, display_name);
    let sink = self.sink.clone();
    self.spawn(async move {
      let result = pending.await;
      sink.send(Event::AuthSettled(AuthOutcome::Registered(result)));
    });
    Ok(())
  }

  #[tracing::instrument(skip(self, password))]
  pub fn sign_in(&mut self, email: &str, password: &str) -> Result<(), ActionError> {
    self.dismiss_notice(NoticeSlot::Auth);
    let backend = self.auth_backend()?;
    session::validate_sign_in(email, password)
      .map_err(|e| self.reject(NoticeSlot::Auth, e.into()))?;
    let pending = backend.sign_in(email, password);
    let sink = self.sink.clone();
    self.spawn(async move {
      let result = pending.await;
      sink.send(Event::AuthSettled(AuthOutcome::SignedIn(result)));
    });
    Ok(())
  }

  #[tracing::instrument(skip(self))]
  pub fn sign_out(&mut self) -> Result<(), ActionError> {
    self.dismiss_notice(NoticeSlot::Auth);
    let backend = self.auth_backend()?;
    let pending = backend.sign_out();
    let sink = self.sink.clone();
    self.spawn(async move {
      let result = pending.await;
      sink.send(Event::AuthSettled(AuthOutcome::SignedOut(result)));
    });
    Ok(())
  }

  // ----- preferences -----

  #[tracing::instrument(skip(self))]
  pub fn toggle_theme(&mut self) -> Result<(), ActionError> {
    let (backend, uid) = self.signed_in("save theme", NoticeSlot::Settings)?;
    let (theme, patch) = self.preferences.theme_patch();
    debug!(theme = theme.as_str(), "saving theme");
    let write = backend.merge_document(&self.paths.preferences(&uid), patch);
    self.track(WriteOp::Theme, write);
    Ok(())
  }

  #[tracing::instrument(skip(self))]
  pub fn save_nickname(&mut self, nickname: &str) -> Result<(), ActionError> {
    let patch = PreferenceStore::nickname_patch(nickname)
      .map_err(|e| self.reject(NoticeSlot::Settings, e.into()))?;
    let (backend, uid) = self.signed_in("save nickname", NoticeSlot::Settings)?;
    let write = backend.merge_document(&self.paths.preferences(&uid), patch);
    self.track(WriteOp::Nickname, write);
    Ok(())
  }

  #[tracing::instrument(skip(self))]
  pub fn add_companion(&mut self, uid: &str, nickname: &str) -> Result<(), ActionError> {
    let (companion, patch) = self
      .preferences
      .add_companion_patch(self.session.uid(), uid, nickname)
      .map_err(|e| self.reject(NoticeSlot::Settings, e.into()))?;
    let (backend, owner) = self.signed_in("add companion", NoticeSlot::Settings)?;
    info!(companion = %companion.uid, "adding companion");
    let write = backend.merge_document(&self.paths.preferences(&owner), patch);
    self.track(WriteOp::AddCompanion, write);
    Ok(())
  }

  #[tracing::instrument(skip(self))]
  pub fn remove_companion(&mut self, uid: &str) -> Result<(), ActionError> {
    let (backend, owner) = self.signed_in("remove companion", NoticeSlot::Settings)?;
    let (companion, patch) = self
      .preferences
      .remove_companion_patch(uid)
      .map_err(|e| self.reject(NoticeSlot::Settings, e.into()))?;
    let write = backend.merge_document(&self.paths.preferences(&owner), patch);
    self.track(WriteOp::RemoveCompanion(companion.uid), write);
    Ok(())
  }

  // ----- years -----

  #[tracing::instrument(skip(self))]
  pub fn add_year(&mut self, raw: &str) -> Result<(), ActionError> {
    self.dismiss_notice(NoticeSlot::Years);
    let (year, patch) = self
      .years
      .add_patch(raw)
      .map_err(|e| self.reject(NoticeSlot::Years, e.into()))?;
    let (backend, uid) = self.signed_in("add year", NoticeSlot::Years)?;
    info!(year, "adding year");
    let write = backend.merge_document(&self.paths.years(&uid), patch);
    self.track(WriteOp::AddYear, write);
    Ok(())
  }

  /// Asks for confirmation; the write happens once the answer arrives.
  #[tracing::instrument(skip(self))]
  pub fn delete_year(&mut self, year: i32) -> Result<(), ActionError> {
    self.dismiss_notice(NoticeSlot::Years);
    if self.years.years().len() <= 1 {
      return Err(self.reject(NoticeSlot::Years, ValidationError::LastYear.into()));
    }
    self.signed_in("delete year", NoticeSlot::Years)?;
    if !self.years.contains(year) {
      return Err(self.reject(NoticeSlot::Years, ValidationError::UnknownYear(year).into()));
    }
    self.ask(
      &format!("Are you sure you want to delete the year {year}? This action cannot be undone."),
      PendingAction::DeleteYear(year)
    );
    Ok(())
  }

  // ----- selection -----

  pub fn select_year(&mut self, year: Option<i32>) -> Result<(), ActionError> {
    self.dismiss_notice(NoticeSlot::General);
    if let Some(year) = year.filter(|y| !self.years.contains(*y)) {
      return Err(self.reject(NoticeSlot::General, ValidationError::UnknownYear(year).into()));
    }
    self.selector.select_year(year);
    self.reconcile_listeners();
    Ok(())
  }

  pub fn select_month(&mut self, month: Option<usize>) -> Result<(), ActionError> {
    self.dismiss_notice(NoticeSlot::General);
    self.selector
      .select_month(month)
      .map_err(|e| self.reject(NoticeSlot::General, e.into()))?;
    self.reconcile_listeners();
    Ok(())
  }

  pub fn select_day(&mut self, day: Option<u32>) -> Result<(), ActionError> {
    self.dismiss_notice(NoticeSlot::General);
    self.selector
      .select_day(day)
      .map_err(|e| self.reject(NoticeSlot::General, e.into()))?;
    self.reconcile_listeners();
    Ok(())
  }

  /// Own ↔ companion. The date is cleared even when the switch is refused.
  #[tracing::instrument(skip(self))]
  pub fn toggle_scope(&mut self) -> Result<(), ActionError> {
    let companions = self.preferences.companions().to_vec();
    let outcome = self.selector.toggle_scope(&companions);
    self.feed.clear_dated();
    self.reconcile_listeners();
    match outcome {
      | Ok(scope) => {
        debug!(?scope, "scope switched");
        Ok(())
      }
      | Err(e) => {
        let err = ActionError::from(e);
        self.notices
          .post(NoticeSlot::General, err.to_string(), Some(SCOPE_TTL));
        Err(err)
      }
    }
  }

  pub fn select_companion(&mut self, uid: &str) -> Result<(), ActionError> {
    let companions = self.preferences.companions().to_vec();
    self.selector
      .select_companion(uid, &companions)
      .map_err(|e| self.reject(NoticeSlot::General, e.into()))?;
    self.feed.clear_dated();
    self.reconcile_listeners();
    Ok(())
  }

  /// Jumps the date selection to a task from the recent list.
  pub fn open_recent_task(&mut self, task_id: &str) -> Result<(), ActionError> {
    let Some(task) = self.feed.recent().iter().find(|t| t.id == task_id) else {
      warn!(task_id, "recent task not in feed");
      return Ok(());
    };
    let (year, month, day) = (task.year, task.month.clone(), task.day);
    self.selector.jump_to(year, &month, day);
    self.reconcile_listeners();
    Ok(())
  }

  // ----- tasks -----

  #[tracing::instrument(skip(self, text))]
  pub fn add_task(&mut self, text: &str) -> Result<(), ActionError> {
    if self.is_read_only() {
      return Err(self.reject(NoticeSlot::General, ActionError::ReadOnly));
    }
    if text.trim().is_empty() {
      return Err(self.reject(NoticeSlot::General, ValidationError::EmptyTask.into()));
    }
    let target = self
      .backend
      .clone()
      .zip(self.session.uid().map(str::to_string))
      .zip(self.selector.selection().full_date());
    let Some(((backend, uid), date)) = target else {
      return Err(self.reject(NoticeSlot::General, ValidationError::IncompleteDate.into()));
    };
    self.dismiss_notice(NoticeSlot::General);
    let patch = feed::new_task_patch(text, &date, &uid)
      .map_err(|e| self.reject(NoticeSlot::General, e.into()))?;
    let write = backend.create_document(&self.paths.tasks(&uid), patch);
    self.track(WriteOp::AddTask, Box::pin(write.map(|r| r.map(|_| ()))));
    Ok(())
  }

  /// Flips completion. Silently ignored in companion scope.
  #[tracing::instrument(skip(self))]
  pub fn toggle_task(&mut self, task_id: &str) -> Result<(), ActionError> {
    if self.is_read_only() {
      return Ok(());
    }
    let (Some(backend), Some(uid)) = (self.backend.clone(), self.session.uid()) else {
      return Ok(());
    };
    let path = self.paths.task(uid, task_id);
    let Some(completed) = self.feed.task(task_id).map(|t| t.completed) else {
      warn!(task_id, "toggled task not in feed");
      return Ok(());
    };
    self.dismiss_notice(NoticeSlot::General);
    let patch = MergePatch::new().set("completed", !completed);
    let write = backend.merge_document(&path, patch);
    self.track(WriteOp::ToggleTask, write);
    Ok(())
  }

  /// Asks for confirmation first. Silently ignored in companion scope.
  #[tracing::instrument(skip(self))]
  pub fn delete_task(&mut self, task_id: &str) -> Result<(), ActionError> {
    if self.is_read_only() || self.backend.is_none() || self.session.uid().is_none() {
      return Ok(());
    }
    self.dismiss_notice(NoticeSlot::General);
    self.ask(CONFIRM_DELETE_TASK, PendingAction::DeleteTask(task_id.to_string()));
    Ok(())
  }

  // ----- internals -----

  fn spawn(&self, work: impl Future<Output = ()> + 'static) {
    if let Err(error) = self.runtime.spawner.spawn_local(work) {
      warn!(%error, "failed to spawn backend call");
    }
  }

  fn track(&self, op: WriteOp, write: Completion<()>) {
    let sink = self.sink.clone();
    self.spawn(async move {
      let result = write.await;
      sink.send(Event::Written { op, result });
    });
  }

  fn ask(&self, message: &str, action: PendingAction) {
    let answer = self.runtime.confirm.confirm(message);
    let sink = self.sink.clone();
    self.spawn(async move {
      let accepted = answer.await;
      sink.send(Event::Confirmed { action, accepted });
    });
  }

  fn reject(&mut self, slot: NoticeSlot, err: ActionError) -> ActionError {
    debug!(?slot, %err, "operation rejected");
    self.notices.post(slot, err.to_string(), None);
    err
  }

  fn auth_backend(&mut self) -> Result<Rc<dyn Backend>, ActionError> {
    match self.backend.clone() {
      | Some(backend) => Ok(backend),
      | None => Err(self.reject(NoticeSlot::Auth, ActionError::NotConfigured))
    }
  }

  fn signed_in(
    &mut self,
    action: &'static str,
    slot: NoticeSlot
  ) -> Result<(Rc<dyn Backend>, String), ActionError> {
    match (self.backend.clone(), self.session.uid()) {
      | (Some(backend), Some(uid)) => Ok((backend, uid.to_string())),
      | _ => Err(self.reject(slot, ActionError::Unavailable { action }))
    }
  }

  fn year_window(&self) -> Vec<i32> {
    calendar::default_year_window(self.runtime.clock.today())
  }

  fn next_generation(&mut self) -> u64 {
    self.listeners.next_generation += 1;
    self.listeners.next_generation
  }

  fn handle(&mut self, event: Event) {
    match event {
      | Event::AuthChanged(identity) => self.on_auth_changed(identity),
      | Event::AuthSettled(outcome) => self.on_auth_settled(outcome),
      | Event::Preferences { generation, result } => {
        if !is_current(&self.listeners.preferences, generation) {
          debug!(generation, "stale preferences snapshot");
          return;
        }
        self.on_preferences(result);
      }
      | Event::Years { generation, result } => {
        if !is_current(&self.listeners.years, generation) {
          debug!(generation, "stale years snapshot");
          return;
        }
        self.on_years(result);
      }
      | Event::RecentTasks { generation, result } => {
        if !is_current(&self.listeners.recent, generation) {
          debug!(generation, "stale recent tasks snapshot");
          return;
        }
        match result {
          | Ok(snapshot) => self.feed.apply_recent(&snapshot),
          | Err(error) => {
            warn!(%error, "recent tasks listener failed");
            self.feed.recent_failed();
            let text = format!(
              "Failed to fetch recent tasks for {}: {error}",
              feed::scope_label(self.selector.scope())
            );
            self.notices.post(NoticeSlot::Recent, text, None);
          }
        }
      }
      | Event::DatedTasks { generation, result } => {
        if !is_current(&self.listeners.dated, generation) {
          debug!(generation, "stale dated tasks snapshot");
          return;
        }
        match result {
          | Ok(snapshot) => self.feed.apply_dated(&snapshot),
          | Err(error) => {
            warn!(%error, "dated tasks listener failed");
            self.feed.dated_failed();
            let text = format!(
              "Failed to fetch tasks for {}: {error}.",
              feed::scope_label(self.selector.scope())
            );
            self.notices.post(NoticeSlot::General, text, None);
          }
        }
      }
      | Event::Written { op, result } => self.on_written(op, result),
      | Event::Confirmed { action, accepted } => self.on_confirmed(action, accepted)
    }
  }

  fn on_auth_changed(&mut self, identity: Option<UserIdentity>) {
    match self.session.apply(identity) {
      | SessionChange::SignedIn | SessionChange::Switched => {
        self.dismiss_notice(NoticeSlot::Auth);
        self.reset_user_stores();
      }
      | SessionChange::SignedOut => self.reset_user_stores(),
      | SessionChange::Unchanged => {}
    }
  }

  fn reset_user_stores(&mut self) {
    self.preferences.reset();
    self.years.reset();
    self.feed.reset();
    self.selector.reset();
  }

  fn on_auth_settled(&mut self, outcome: AuthOutcome) {
    match outcome {
      | AuthOutcome::Registered(Ok(identity)) => {
        let Some(backend) = self.backend.clone() else {
          return;
        };
        let write = backend.set_document(
          &self.paths.preferences(&identity.uid),
          Preferences::default().to_fields()
        );
        self.track(WriteOp::SeedPreferences, write);
      }
      | AuthOutcome::SignedIn(Ok(identity)) => {
        debug!(uid = %identity.uid, "sign-in settled");
      }
      | AuthOutcome::SignedOut(Ok(())) => {
        self.selector.clear_date();
        self.feed.clear_dated();
      }
      | AuthOutcome::Registered(Err(error))
      | AuthOutcome::SignedIn(Err(error))
      | AuthOutcome::SignedOut(Err(error)) => {
        warn!(code = error.code.as_str(), message = %error.message, "auth failed");
        self.notices
          .post(NoticeSlot::Auth, ActionError::from(error).to_string(), None);
      }
    }
  }

  fn on_preferences(&mut self, result: Result<DocumentSnapshot, BackendError>) {
    match result {
      | Ok(snapshot) => match self.preferences.apply_snapshot(&snapshot) {
        | PreferencesOutcome::Loaded => {}
        | PreferencesOutcome::Missing => {
          let (Some(backend), Some(uid)) = (self.backend.clone(), self.session.uid())
          else {
            return;
          };
          info!(uid, "creating default preferences");
          let write = backend.set_document(
            &self.paths.preferences(uid),
            Preferences::default().to_fields()
          );
          self.track(WriteOp::InitPreferences, write);
        }
      },
      | Err(error) => {
        self.preferences.apply_error(&error);
        self.notices
          .post(NoticeSlot::Settings, LOAD_FAILED.to_string(), None);
      }
    }
    if self.selector.revalidate(self.preferences.companions()) {
      info!("viewed companion no longer listed; back to own tasks");
    }
  }

  fn on_years(&mut self, result: Result<DocumentSnapshot, BackendError>) {
    match result {
      | Ok(snapshot) => match self.years.apply_snapshot(&snapshot) {
        | YearsOutcome::Loaded => {}
        | YearsOutcome::NeedsDefaults => {
          let (Some(backend), Some(uid)) = (self.backend.clone(), self.session.uid())
          else {
            return;
          };
          let window = self.year_window();
          info!(uid, ?window, "writing default year list");
          let write = backend
            .set_document(&self.paths.years(uid), years::default_document(&window));
          self.track(WriteOp::InitYears, write);
        }
      },
      | Err(error) => {
        warn!(%error, "years listener failed");
        let window = self.year_window();
        self.years.fall_back(&window);
        self.notices.post(
          NoticeSlot::Years,
          format!("Failed to fetch years: {error}"),
          None
        );
      }
    }
  }

  fn on_written(&mut self, op: WriteOp, result: Result<(), BackendError>) {
    let error = match result {
      | Ok(()) => {
        self.on_write_succeeded(op);
        return;
      }
      | Err(error) => error
    };
    warn!(?op, %error, "write failed");
    let settings = |text: &str| (NoticeSlot::Settings, text.to_string());
    let (slot, text) = match op {
      | WriteOp::SeedPreferences => return,
      | WriteOp::InitPreferences => {
        self.preferences.init_failed(&error);
        settings(INIT_FAILED)
      }
      | WriteOp::InitYears => {
        let window = self.year_window();
        self.years.fall_back(&window);
        return;
      }
      | WriteOp::Theme => settings("Failed to save theme."),
      | WriteOp::Nickname => settings("Failed to save nickname."),
      | WriteOp::AddCompanion => settings("Failed to add companion."),
      | WriteOp::RemoveCompanion(_) => settings("Failed to remove companion."),
      | WriteOp::AddYear => (NoticeSlot::Years, format!("Failed to add year: {error}")),
      | WriteOp::DeleteYear(_) => {
        (NoticeSlot::Years, format!("Failed to delete year: {error}"))
      }
      | WriteOp::AddTask => (NoticeSlot::General, format!("Failed to add task: {error}.")),
      | WriteOp::ToggleTask => {
        (NoticeSlot::General, format!("Failed to update task: {error}."))
      }
      | WriteOp::DeleteTask => {
        (NoticeSlot::General, format!("Failed to delete task: {error}."))
      }
    };
    self.notices.post(slot, text, None);
  }

  fn on_write_succeeded(&mut self, op: WriteOp) {
    let saved = match op {
      | WriteOp::Theme => "Theme saved!",
      | WriteOp::Nickname => "Nickname saved!",
      | WriteOp::AddCompanion => "Companion added successfully!",
      | WriteOp::RemoveCompanion(uid) => {
        if self.selector.companion() == Some(uid.as_str()) {
          self.selector.view_own();
        }
        "Companion removed."
      }
      | WriteOp::DeleteYear(year) => {
        if self.selector.selection().year == Some(year) {
          self.selector.clear_date();
        }
        return;
      }
      | _ => return
    };
    self.notices
      .post(NoticeSlot::Settings, saved.to_string(), Some(SETTINGS_TTL));
  }

  fn on_confirmed(&mut self, action: PendingAction, accepted: bool) {
    if !accepted {
      debug!(?action, "confirmation declined");
      return;
    }
    match action {
      | PendingAction::DeleteYear(year) => {
        let patch = match self.years.delete_patch(year) {
          | Ok(patch) => patch,
          | Err(e) => {
            self.reject(NoticeSlot::Years, e.into());
            return;
          }
        };
        let Ok((backend, uid)) = self.signed_in("delete year", NoticeSlot::Years) else {
          return;
        };
        info!(year, "deleting year");
        let write = backend.merge_document(&self.paths.years(&uid), patch);
        self.track(WriteOp::DeleteYear(year), write);
      }
      | PendingAction::DeleteTask(task_id) => {
        if self.is_read_only() {
          return;
        }
        let (Some(backend), Some(uid)) = (self.backend.clone(), self.session.uid()) else {
          return;
        };
        info!(task_id, "deleting task");
        let write = backend.delete_document(&self.paths.task(uid, &task_id));
        self.track(WriteOp::DeleteTask, write);
      }
    }
  }

  /// Brings every listener in line with the current keys: a changed key
  /// drops the old subscription before the new one is created.
  fn reconcile_listeners(&mut self) {
    let Some(backend) = self.backend.clone() else {
      return;
    };
    let uid = self.session.uid().map(str::to_string);

    if self.listeners.preferences.as_ref().map(|l| &l.key) != uid.as_ref() {
      self.listeners.preferences = None;
      if let Some(uid) = &uid {
        let generation = self.next_generation();
        let sink = self.sink.clone();
        let subscription = backend.watch_document(
          &self.paths.preferences(uid),
          Box::new(move |result| sink.send(Event::Preferences { generation, result }))
        );
        self.listeners.preferences = Some(Listener {
          key: uid.clone(),
          generation,
          _subscription: subscription
        });
      }
    }

    if self.listeners.years.as_ref().map(|l| &l.key) != uid.as_ref() {
      self.listeners.years = None;
      if let Some(uid) = &uid {
        self.dismiss_notice(NoticeSlot::Years);
        let generation = self.next_generation();
        let sink = self.sink.clone();
        let subscription = backend.watch_document(
          &self.paths.years(uid),
          Box::new(move |result| sink.send(Event::Years { generation, result }))
        );
        self.listeners.years = Some(Listener {
          key: uid.clone(),
          generation,
          _subscription: subscription
        });
      }
    }

    let effective = self.effective_identity().map(str::to_string);
    if self.listeners.recent.as_ref().map(|l| &l.key) != effective.as_ref() {
      self.listeners.recent = None;
      self.feed.clear_recent();
      if let Some(owner) = &effective {
        self.dismiss_notice(NoticeSlot::Recent);
        self.feed.begin_recent();
        let generation = self.next_generation();
        let sink = self.sink.clone();
        let query = feed::recent_query(&self.paths, owner, self.recent_limit);
        let subscription = backend.watch_query(
          &query,
          Box::new(move |result| sink.send(Event::RecentTasks { generation, result }))
        );
        self.listeners.recent = Some(Listener {
          key: owner.clone(),
          generation,
          _subscription: subscription
        });
      }
    }

    let dated_key = effective
      .clone()
      .zip(self.selector.selection().full_date());
    if self.listeners.dated.as_ref().map(|l| &l.key) != dated_key.as_ref() {
      self.listeners.dated = None;
      self.feed.clear_dated();
      if let Some((owner, date)) = dated_key {
        self.dismiss_notice(NoticeSlot::General);
        self.feed.begin_dated();
        let generation = self.next_generation();
        let sink = self.sink.clone();
        let query = feed::dated_query(&self.paths, &owner, &date);
        let subscription = backend.watch_query(
          &query,
          Box::new(move |result| sink.send(Event::DatedTasks { generation, result }))
        );
        self.listeners.dated = Some(Listener {
          key: (owner, date),
          generation,
          _subscription: subscription
        });
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    TimeZone,
    Utc
  };
  use futures::executor::LocalPool;
  use futures::future::{
    self,
    LocalBoxFuture
  };
  use pretty_assertions::assert_eq;

  use super::*;
  use crate::clock::ManualClock;

  struct Decline;

  impl ConfirmService for Decline {
    fn confirm(&self, _message: &str) -> LocalBoxFuture<'static, bool> {
      Box::pin(future::ready(false))
    }
  }

  fn identity(uid: &str) -> UserIdentity {
    UserIdentity {
      uid:          uid.into(),
      display_name: Some(uid.into()),
      email:        Some(format!("{uid}@x.com"))
    }
  }

  fn detached(pool: &LocalPool) -> Workspace {
    let runtime = Runtime {
      spawner: Rc::new(pool.spawner()),
      confirm: Rc::new(Decline),
      clock:   Rc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
          .single()
          .expect("valid time")
      ))
    };
    Workspace::new(&Config::default(), None, runtime)
  }

  #[test]
  fn switching_user_clears_the_previous_users_stores() {
    let pool = LocalPool::new();
    let mut ws = detached(&pool);
    ws.handle(Event::AuthChanged(Some(identity("ann"))));

    let prefs = Preferences {
      nickname: "Ann's Planner".into(),
      ..Preferences::default()
    };
    ws.preferences.apply_snapshot(&DocumentSnapshot {
      path: ws.paths.preferences("ann"),
      data: Some(prefs.to_fields())
    });
    ws.years.apply_snapshot(&DocumentSnapshot {
      path: ws.paths.years("ann"),
      data: Some(years::default_document(&[2026, 2030]))
    });
    ws.selector.select_year(Some(2030));
    assert_eq!(ws.preferences().nickname, "Ann's Planner");
    assert_eq!(ws.years().years(), &[2026, 2030]);

    ws.handle(Event::AuthChanged(Some(identity("bob"))));

    assert_eq!(ws.user().map(|u| u.uid.as_str()), Some("bob"));
    assert_eq!(ws.preferences(), &Preferences::default());
    assert!(ws.years().years().is_empty());
    assert!(ws.selector().selection().is_empty());
  }

  #[test]
  fn repeated_identity_keeps_loaded_stores() {
    let pool = LocalPool::new();
    let mut ws = detached(&pool);
    ws.handle(Event::AuthChanged(Some(identity("ann"))));
    ws.years.apply_snapshot(&DocumentSnapshot {
      path: ws.paths.years("ann"),
      data: Some(years::default_document(&[2026]))
    });

    ws.handle(Event::AuthChanged(Some(identity("ann"))));

    assert_eq!(ws.years().years(), &[2026]);
  }
}
