use serde_json::Value;
use tracing::{
  debug,
  warn
};

use crate::backend::{
  DocumentSnapshot,
  MergePatch
};
use crate::error::{
  BackendError,
  ValidationError
};
use crate::model::{
  Companion,
  Preferences,
  Theme
};

pub const INIT_FAILED: &str = "Could not initialize preferences.";
pub const LOAD_FAILED: &str = "Could not load preferences.";

/// What the workspace must do after a preferences snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreferencesOutcome {
  Loaded,
  /// No document yet; write the defaults and wait for the echo.
  Missing
}

/// Last known preferences of the signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferenceStore {
  current: Preferences,
  loaded:  bool
}

impl PreferenceStore {
  pub fn current(&self) -> &Preferences {
    &self.current
  }

  pub fn theme(&self) -> Theme {
    self.current.theme
  }

  pub fn companions(&self) -> &[Companion] {
    &self.current.companions
  }

  pub fn is_loaded(&self) -> bool {
    self.loaded
  }

  pub fn reset(&mut self) {
    *self = Self::default();
  }

  pub fn apply_snapshot(&mut self, snapshot: &DocumentSnapshot) -> PreferencesOutcome {
    match &snapshot.data {
      | Some(fields) => {
        self.current = Preferences::from_fields(fields);
        self.loaded = true;
        debug!(
          theme = self.current.theme.as_str(),
          companions = self.current.companions.len(),
          "preferences updated"
        );
        PreferencesOutcome::Loaded
      }
      | None => PreferencesOutcome::Missing
    }
  }

  /// Listener failure: fall back to defaults.
  pub fn apply_error(&mut self, error: &BackendError) {
    warn!(%error, "preferences listener failed");
    self.current = Preferences::default();
    self.loaded = true;
  }

  /// Writing the initial document failed: use defaults locally.
  pub fn init_failed(&mut self, error: &BackendError) {
    warn!(%error, "could not create default preferences");
    self.current = Preferences::default();
    self.loaded = true;
  }

  pub fn theme_patch(&self) -> (Theme, MergePatch) {
    let next = self.current.theme.toggled();
    (next, MergePatch::new().set("theme", next.as_str()))
  }

  pub fn nickname_patch(raw: &str) -> Result<MergePatch, ValidationError> {
    let nickname = raw.trim();
    if nickname.is_empty() {
      return Err(ValidationError::EmptyNickname);
    }
    Ok(MergePatch::new().set("nickname", nickname))
  }

  /// Validates a new companion against the current list.
  pub fn add_companion_patch(
    &self,
    own_uid: Option<&str>,
    uid: &str,
    nickname: &str
  ) -> Result<(Companion, MergePatch), ValidationError> {
    let uid = uid.trim();
    let nickname = nickname.trim();
    if uid.is_empty() {
      return Err(ValidationError::EmptyCompanionId);
    }
    if nickname.is_empty() {
      return Err(ValidationError::EmptyCompanionNickname);
    }
    if own_uid == Some(uid) {
      return Err(ValidationError::SelfCompanion);
    }
    if self.current.companion(uid).is_some() {
      return Err(ValidationError::DuplicateCompanion);
    }
    let companion = Companion::new(uid, nickname);
    let patch = MergePatch::new().union("companions", companion.to_value());
    Ok((companion, patch))
  }

  /// Removes the stored entry exactly as listed.
  pub fn remove_companion_patch(
    &self,
    uid: &str
  ) -> Result<(Companion, MergePatch), ValidationError> {
    let companion = self
      .current
      .companion(uid)
      .cloned()
      .ok_or(ValidationError::UnknownCompanion)?;
    let value: Value = companion.to_value();
    Ok((companion, MergePatch::new().remove("companions", value)))
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;
  use serde_json::json;

  use super::*;
  use crate::backend::FieldUpdate;
  use crate::model::DEFAULT_NICKNAME;

  fn snapshot(value: Option<Value>) -> DocumentSnapshot {
    DocumentSnapshot {
      path: "prefs".into(),
      data: value.and_then(|v| v.as_object().cloned())
    }
  }

  fn loaded(value: Value) -> PreferenceStore {
    let mut store = PreferenceStore::default();
    assert_eq!(
      store.apply_snapshot(&snapshot(Some(value))),
      PreferencesOutcome::Loaded
    );
    store
  }

  #[test]
  fn absent_document_requests_defaults_without_local_change() {
    let mut store = PreferenceStore::default();
    assert_eq!(store.apply_snapshot(&snapshot(None)), PreferencesOutcome::Missing);
    assert!(!store.is_loaded());
  }

  #[test]
  fn listener_error_falls_back_to_defaults() {
    let mut store = loaded(json!({ "theme": "light", "nickname": "Mine" }));
    store.apply_error(&BackendError::PermissionDenied);
    assert_eq!(store.current(), &Preferences::default());
    assert_eq!(store.current().nickname, DEFAULT_NICKNAME);
  }

  #[test]
  fn theme_patch_flips_only_the_theme() {
    let store = loaded(json!({ "theme": "dark" }));
    let (next, patch) = store.theme_patch();
    assert_eq!(next, Theme::Light);
    assert_eq!(patch.get("theme"), Some(&FieldUpdate::Set(json!("light"))));
    assert!(patch.get("nickname").is_none());
  }

  #[test]
  fn nickname_is_trimmed_and_required() {
    assert_eq!(
      PreferenceStore::nickname_patch("   "),
      Err(ValidationError::EmptyNickname)
    );
    let patch = PreferenceStore::nickname_patch("  Planner ").expect("valid");
    assert_eq!(patch.get("nickname"), Some(&FieldUpdate::Set(json!("Planner"))));
  }

  #[test]
  fn companion_additions_are_validated() {
    let store = loaded(json!({ "companions": [{ "uid": "u1", "nickname": "One" }] }));
    let me = Some("me");
    assert_eq!(
      store.add_companion_patch(me, " ", "x"),
      Err(ValidationError::EmptyCompanionId)
    );
    assert_eq!(
      store.add_companion_patch(me, "u2", " "),
      Err(ValidationError::EmptyCompanionNickname)
    );
    assert_eq!(
      store.add_companion_patch(me, " me ", "Self"),
      Err(ValidationError::SelfCompanion)
    );
    assert_eq!(
      store.add_companion_patch(me, "u1", "Again"),
      Err(ValidationError::DuplicateCompanion)
    );

    let (companion, patch) = store.add_companion_patch(me, " u2 ", " Two ").expect("valid");
    assert_eq!(companion, Companion::new("u2", "Two"));
    assert_eq!(
      patch.get("companions"),
      Some(&FieldUpdate::ArrayUnion(vec![json!({ "uid": "u2", "nickname": "Two" })]))
    );
  }

  #[test]
  fn removal_uses_the_stored_entry() {
    let store = loaded(json!({ "companions": [{ "uid": "u1", "nickname": "One" }] }));
    assert_eq!(
      store.remove_companion_patch("zz"),
      Err(ValidationError::UnknownCompanion)
    );
    let (_, patch) = store.remove_companion_patch("u1").expect("listed");
    assert_eq!(
      patch.get("companions"),
      Some(&FieldUpdate::ArrayRemove(vec![json!({ "uid": "u1", "nickname": "One" })]))
    );
  }
}
