use daybook_core::Persistence;
use web_sys::Storage;

/// Keeps the in-process backend state in `localStorage` under one key.
#[derive(Debug, Clone)]
pub struct LocalStore {
  key: String
}

impl LocalStore {
  pub fn new(key: impl Into<String>) -> Self {
    Self { key: key.into() }
  }
}

fn local_storage() -> Option<Storage> {
  web_sys::window().and_then(|window| window.local_storage().ok().flatten())
}

impl Persistence for LocalStore {
  fn load(&self) -> Option<String> {
    local_storage().and_then(|storage| storage.get_item(&self.key).ok().flatten())
  }

  fn save(&self, state: &str) {
    let Some(storage) = local_storage() else {
      tracing::warn!(key = %self.key, "localStorage unavailable; state not saved");
      return;
    };
    if let Err(error) = storage.set_item(&self.key, state) {
      tracing::warn!(key = %self.key, ?error, "failed writing localStorage");
    }
  }
}
