use tracing::info;

use crate::error::ValidationError;
use crate::model::UserIdentity;

/// How the signed-in identity changed with an auth event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChange {
  SignedIn,
  /// A different user replaced the signed-in one.
  Switched,
  SignedOut,
  Unchanged
}

/// Signed-in identity as reported by the auth stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStore {
  user:         Option<UserIdentity>,
  ready:        bool,
  config_error: Option<String>
}

impl SessionStore {
  pub fn user(&self) -> Option<&UserIdentity> {
    self.user.as_ref()
  }

  pub fn uid(&self) -> Option<&str> {
    self.user.as_ref().map(|u| u.uid.as_str())
  }

  /// True once the first auth event (or a setup failure) has arrived.
  pub fn is_ready(&self) -> bool {
    self.ready
  }

  pub fn config_error(&self) -> Option<&str> {
    self.config_error.as_deref()
  }

  pub fn apply(&mut self, identity: Option<UserIdentity>) -> SessionChange {
    self.ready = true;
    let change = match (&self.user, &identity) {
      | (None, Some(_)) => SessionChange::SignedIn,
      | (Some(old), Some(new)) if old.uid != new.uid => SessionChange::Switched,
      | (Some(_), None) => SessionChange::SignedOut,
      | _ => SessionChange::Unchanged
    };
    if change != SessionChange::Unchanged {
      info!(?change, uid = identity.as_ref().map(|u| u.uid.as_str()), "session changed");
    }
    self.user = identity;
    change
  }

  /// Auth could not be set up. Persistent, never retried.
  pub fn fail(&mut self, message: impl Into<String>) {
    self.config_error = Some(message.into());
    self.ready = true;
  }
}

pub fn validate_sign_in(email: &str, password: &str) -> Result<(), ValidationError> {
  if email.is_empty() || password.is_empty() {
    return Err(ValidationError::MissingCredentials);
  }
  Ok(())
}

/// Returns the trimmed display name.
pub fn validate_registration<'a>(
  email: &str,
  password: &str,
  display_name: &'a str
) -> Result<&'a str, ValidationError> {
  validate_sign_in(email, password)?;
  let display_name = display_name.trim();
  if display_name.is_empty() {
    return Err(ValidationError::MissingDisplayName);
  }
  Ok(display_name)
}
