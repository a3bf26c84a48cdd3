//! Error taxonomy shared by the stores and the workspace.
//!
//! `Display` of the user-facing variants is the exact text shown in the UI.

use crate::config::DEFAULT_MIN_PASSWORD_LEN;

/// Input rejected locally, before anything is written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
  #[error("Email and password cannot be empty.")]
  MissingCredentials,

  #[error("Display name cannot be empty for registration.")]
  MissingDisplayName,

  #[error("Nickname cannot be empty.")]
  EmptyNickname,

  #[error("Companion User ID cannot be empty.")]
  EmptyCompanionId,

  #[error("Companion Nickname cannot be empty.")]
  EmptyCompanionNickname,

  #[error("You cannot add yourself as a companion.")]
  SelfCompanion,

  #[error("This user is already a companion.")]
  DuplicateCompanion,

  #[error("Companion not found in your list.")]
  UnknownCompanion,

  #[error("Please enter a valid year (e.g., 2025).")]
  InvalidYear,

  #[error("Year {0} already exists.")]
  DuplicateYear(i32),

  #[error("Cannot delete the last year. Add another year first.")]
  LastYear,

  #[error("Year {0} is not in your list.")]
  UnknownYear(i32),

  #[error("Select a year before choosing a month.")]
  NoYearSelected,

  #[error("Day {0} is not valid for the selected month.")]
  InvalidDay(u32),

  #[error("Task description cannot be empty.")]
  EmptyTask,

  #[error("Please select a full date.")]
  IncompleteDate,

  #[error("You don't have any companions set up to view their tasks.")]
  NoCompanions
}

/// Failure reported by the backend for a read, write or subscription.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
  #[error("{0}")]
  Unavailable(String),

  #[error("Missing or insufficient permissions.")]
  PermissionDenied
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthErrorCode {
  EmailAlreadyInUse,
  /// Carries the minimum length the service enforces.
  WeakPassword(usize),
  InvalidEmail,
  UserNotFound,
  WrongPassword,
  InvalidCredential,
  Other(String)
}

impl AuthErrorCode {
  pub fn parse(code: &str) -> Self {
    match code {
      | "auth/email-already-in-use" => Self::EmailAlreadyInUse,
      | "auth/weak-password" => Self::WeakPassword(DEFAULT_MIN_PASSWORD_LEN),
      | "auth/invalid-email" => Self::InvalidEmail,
      | "auth/user-not-found" => Self::UserNotFound,
      | "auth/wrong-password" => Self::WrongPassword,
      | "auth/invalid-credential" => Self::InvalidCredential,
      | other => Self::Other(other.to_string())
    }
  }

  pub fn as_str(&self) -> &str {
    match self {
      | Self::EmailAlreadyInUse => "auth/email-already-in-use",
      | Self::WeakPassword(_) => "auth/weak-password",
      | Self::InvalidEmail => "auth/invalid-email",
      | Self::UserNotFound => "auth/user-not-found",
      | Self::WrongPassword => "auth/wrong-password",
      | Self::InvalidCredential => "auth/invalid-credential",
      | Self::Other(code) => code
    }
  }
}

/// Authentication failure as reported by the auth service: a machine code
/// plus the service's own message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", self.user_message())]
pub struct AuthError {
  pub code:    AuthErrorCode,
  pub message: String
}

impl AuthError {
  pub fn new(code: AuthErrorCode, message: impl Into<String>) -> Self {
    Self {
      code,
      message: message.into()
    }
  }

  /// Text shown on the sign-in screen. Unmapped codes fall back to the
  /// raw service message.
  pub fn user_message(&self) -> String {
    match self.code {
      | AuthErrorCode::EmailAlreadyInUse => "This email address is already in use.".into(),
      | AuthErrorCode::WeakPassword(min) => {
        format!("The password is too weak (at least {min} characters).")
      }
      | AuthErrorCode::InvalidEmail => "The email address is not valid.".into(),
      | AuthErrorCode::UserNotFound
      | AuthErrorCode::WrongPassword
      | AuthErrorCode::InvalidCredential => "Invalid email or password.".into(),
      | AuthErrorCode::Other(_) => self.message.clone()
    }
  }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("invalid configuration: {0}")]
  Parse(#[from] toml::de::Error),

  #[error("invalid value for `{key}`: {reason}")]
  Invalid { key: String, reason: String },

  #[error("unknown configuration key `{0}`")]
  UnknownKey(String),

  #[error("unsupported backend kind `{0}`")]
  UnsupportedBackend(String)
}

/// Outcome of a rejected workspace operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
  #[error(transparent)]
  Validation(#[from] ValidationError),

  #[error(transparent)]
  Auth(#[from] AuthError),

  #[error("Cannot {action}: user or database not available.")]
  Unavailable { action: &'static str },

  #[error("Cannot add tasks for your companion (read-only view).")]
  ReadOnly,

  #[error("Authentication service is not configured.")]
  NotConfigured
}
