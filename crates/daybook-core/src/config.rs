use std::str::FromStr;

use anyhow::Context;
use serde::{
  Deserialize,
  Serialize
};
use tracing::{
  debug,
  info
};

use crate::error::ConfigError;

pub const DEFAULT_APP_ID: &str = "task-manager-default";
pub const DEFAULT_MIN_PASSWORD_LEN: usize = 6;
pub const MEMORY_BACKEND: &str = "memory";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
  /// Namespace for every document path.
  pub app_id:    String,
  pub log_level: String,
  pub backend:   BackendConfig,
  pub auth:      AuthConfig,
  pub tasks:     TaskConfig
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
  pub kind:        String,
  /// Browser storage key for persisting the in-process backend. Unset
  /// means state lives only as long as the page.
  pub storage_key: Option<String>
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
  pub min_password_len: usize
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TaskConfig {
  pub recent_limit: usize
}

impl Default for Config {
  fn default() -> Self {
    Self {
      app_id:    DEFAULT_APP_ID.to_string(),
      log_level: "info".to_string(),
      backend:   BackendConfig::default(),
      auth:      AuthConfig::default(),
      tasks:     TaskConfig::default()
    }
  }
}

impl Default for BackendConfig {
  fn default() -> Self {
    Self {
      kind:        MEMORY_BACKEND.to_string(),
      storage_key: None
    }
  }
}

impl Default for AuthConfig {
  fn default() -> Self {
    Self {
      min_password_len: DEFAULT_MIN_PASSWORD_LEN
    }
  }
}

impl Default for TaskConfig {
  fn default() -> Self {
    Self { recent_limit: 5 }
  }
}

impl Config {
  /// Parses a TOML document, applies `key = value` overrides on top and
  /// validates the result.
  #[tracing::instrument(skip(text, overrides))]
  pub fn load<I>(text: &str, overrides: I) -> anyhow::Result<Self>
  where
    I: IntoIterator<Item = (String, String)>,
  {
    let mut cfg: Config = toml::from_str(text)
      .map_err(ConfigError::from)
      .context("failed to parse daybook configuration")?;
    cfg.apply_overrides(overrides)
      .context("failed to apply configuration overrides")?;
    cfg.validate().context("configuration rejected")?;
    info!(app_id = %cfg.app_id, backend = %cfg.backend.kind, "loaded configuration");
    Ok(cfg)
  }

  #[tracing::instrument(skip(self, overrides))]
  pub fn apply_overrides<I>(&mut self, overrides: I) -> Result<(), ConfigError>
  where
    I: IntoIterator<Item = (String, String)>,
  {
    for (key, value) in overrides {
      let value = value.trim().to_string();
      debug!(key = %key, value = %value, "applying override");
      match key.as_str() {
        | "app_id" => self.app_id = value,
        | "log_level" => self.log_level = value,
        | "backend.kind" => self.backend.kind = value,
        | "backend.storage_key" => {
          self.backend.storage_key = (!value.is_empty()).then_some(value)
        }
        | "auth.min_password_len" => {
          self.auth.min_password_len = parse_number(&key, &value)?
        }
        | "tasks.recent_limit" => self.tasks.recent_limit = parse_number(&key, &value)?,
        | _ => return Err(ConfigError::UnknownKey(key))
      }
    }
    Ok(())
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.app_id.is_empty()
      || self
        .app_id
        .chars()
        .any(|c| c == '/' || c.is_whitespace())
    {
      return Err(invalid(
        "app_id",
        "must be non-empty without slashes or whitespace"
      ));
    }
    if tracing::Level::from_str(&self.log_level).is_err() {
      return Err(invalid(
        "log_level",
        "expected one of trace, debug, info, warn, error"
      ));
    }
    if self.backend.kind != MEMORY_BACKEND {
      return Err(ConfigError::UnsupportedBackend(self.backend.kind.clone()));
    }
    if self.auth.min_password_len == 0 {
      return Err(invalid("auth.min_password_len", "must be at least 1"));
    }
    if self.tasks.recent_limit == 0 {
      return Err(invalid("tasks.recent_limit", "must be at least 1"));
    }
    Ok(())
  }

  pub fn level(&self) -> tracing::Level {
    tracing::Level::from_str(&self.log_level).unwrap_or(tracing::Level::INFO)
  }
}

fn parse_number(key: &str, value: &str) -> Result<usize, ConfigError> {
  value
    .parse()
    .map_err(|_| invalid(key, &format!("`{value}` is not a number")))
}

fn invalid(key: &str, reason: &str) -> ConfigError {
  ConfigError::Invalid {
    key:    key.to_string(),
    reason: reason.to_string()
  }
}
