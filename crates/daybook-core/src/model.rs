use std::collections::BTreeSet;

use chrono::{
  DateTime,
  Utc
};
use serde::{
  Deserialize,
  Serialize
};
use serde_json::Value;
use tracing::warn;

use crate::backend::Fields;

pub const DEFAULT_NICKNAME: &str = "Task Manager Deluxe";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
  pub uid:          String,
  #[serde(default)]
  pub display_name: Option<String>,
  #[serde(default)]
  pub email:        Option<String>
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
  Light,
  #[default]
  Dark
}

impl Theme {
  pub fn parse(raw: &str) -> Option<Self> {
    match raw {
      | "light" => Some(Self::Light),
      | "dark" => Some(Self::Dark),
      | _ => None
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      | Self::Light => "light",
      | Self::Dark => "dark"
    }
  }

  pub fn toggled(self) -> Self {
    match self {
      | Self::Light => Self::Dark,
      | Self::Dark => Self::Light
    }
  }

  /// Class applied to the document body.
  pub fn body_class(self) -> &'static str {
    match self {
      | Self::Light => "theme-light",
      | Self::Dark => "theme-dark"
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Companion {
  pub uid:      String,
  pub nickname: String
}

impl Companion {
  pub fn new(uid: impl Into<String>, nickname: impl Into<String>) -> Self {
    Self {
      uid:      uid.into(),
      nickname: nickname.into()
    }
  }

  /// Leading characters of the uid, for compact display.
  pub fn short_uid(&self) -> &str {
    match self.uid.char_indices().nth(6) {
      | Some((idx, _)) => &self.uid[..idx],
      | None => &self.uid
    }
  }

  pub fn to_value(&self) -> Value {
    serde_json::json!({ "uid": self.uid, "nickname": self.nickname })
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
  pub theme:      Theme,
  pub nickname:   String,
  #[serde(default)]
  pub companions: Vec<Companion>
}

impl Default for Preferences {
  fn default() -> Self {
    Self {
      theme:      Theme::default(),
      nickname:   DEFAULT_NICKNAME.to_string(),
      companions: vec![]
    }
  }
}

impl Preferences {
  /// Projects a stored preferences document, substituting the built-in
  /// default for every missing or unusable field. Companion entries that
  /// do not parse are dropped, and later entries repeating an id are
  /// ignored.
  pub fn from_fields(fields: &Fields) -> Self {
    let theme = fields
      .get("theme")
      .and_then(Value::as_str)
      .and_then(Theme::parse)
      .unwrap_or_default();

    let nickname = fields
      .get("nickname")
      .and_then(Value::as_str)
      .filter(|n| !n.is_empty())
      .unwrap_or(DEFAULT_NICKNAME)
      .to_string();

    let mut seen = BTreeSet::new();
    let companions = fields
      .get("companions")
      .and_then(Value::as_array)
      .map(|entries| {
        entries
          .iter()
          .filter_map(|entry| {
            match serde_json::from_value::<Companion>(entry.clone()) {
              | Ok(companion) => Some(companion),
              | Err(error) => {
                warn!(%error, "skipping malformed companion entry");
                None
              }
            }
          })
          .filter(|companion| seen.insert(companion.uid.clone()))
          .collect()
      })
      .unwrap_or_default();

    Self {
      theme,
      nickname,
      companions
    }
  }

  pub fn to_fields(&self) -> Fields {
    let mut fields = Fields::new();
    fields.insert("theme".into(), Value::from(self.theme.as_str()));
    fields.insert("nickname".into(), Value::from(self.nickname.clone()));
    fields.insert(
      "companions".into(),
      Value::Array(self.companions.iter().map(Companion::to_value).collect())
    );
    fields
  }

  pub fn companion(&self, uid: &str) -> Option<&Companion> {
    self.companions.iter().find(|c| c.uid == uid)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
  #[serde(skip)]
  pub id: String,

  pub text: String,

  #[serde(default)]
  pub completed: bool,

  pub year: i32,

  pub month: String,

  pub day: u32,

  #[serde(default, rename = "createdAt")]
  pub created_at: Option<DateTime<Utc>>,

  #[serde(default, rename = "userId")]
  pub user_id: Option<String>
}

impl Task {
  pub fn from_document(id: &str, fields: &Fields) -> Result<Self, serde_json::Error> {
    let mut task: Task = serde_json::from_value(Value::Object(fields.clone()))?;
    task.id = id.to_string();
    Ok(task)
  }
}
