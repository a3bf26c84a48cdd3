//! Backend document layout.

const ROOT: &str = "artifacts";
const USERS: &str = "users";
const USER_CONFIGURATION: &str = "userConfiguration";
const TASKS: &str = "tasks";

pub const PREFERENCES_DOC: &str = "appPreferencesDoc";
pub const YEARS_DOC: &str = "manageableYearsDoc";

/// Builds document and collection paths scoped to one application id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
  app_id: String
}

impl Paths {
  pub fn new(app_id: impl Into<String>) -> Self {
    Self {
      app_id: app_id.into()
    }
  }

  pub fn app_id(&self) -> &str {
    &self.app_id
  }

  fn user_root(&self, uid: &str) -> String {
    format!("{ROOT}/{}/{USERS}/{uid}", self.app_id)
  }

  pub fn preferences(&self, uid: &str) -> String {
    format!("{}/{USER_CONFIGURATION}/{PREFERENCES_DOC}", self.user_root(uid))
  }

  pub fn years(&self, uid: &str) -> String {
    format!("{}/{USER_CONFIGURATION}/{YEARS_DOC}", self.user_root(uid))
  }

  pub fn tasks(&self, uid: &str) -> String {
    format!("{}/{TASKS}", self.user_root(uid))
  }

  pub fn task(&self, uid: &str, task_id: &str) -> String {
    format!("{}/{task_id}", self.tasks(uid))
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Area {
  UserConfiguration,
  Tasks,
  Other
}

/// Owner and area of a path under `artifacts/{app}/users/{uid}/...`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location<'a> {
  pub app_id: &'a str,
  pub owner:  &'a str,
  pub area:   Area
}

pub fn locate(path: &str) -> Option<Location<'_>> {
  let mut segments = path.split('/');
  if segments.next()? != ROOT {
    return None;
  }
  let app_id = segments.next().filter(|s| !s.is_empty())?;
  if segments.next()? != USERS {
    return None;
  }
  let owner = segments.next().filter(|s| !s.is_empty())?;
  let area = match segments.next() {
    | Some(USER_CONFIGURATION) => Area::UserConfiguration,
    | Some(TASKS) => Area::Tasks,
    | _ => Area::Other
  };
  Some(Location {
    app_id,
    owner,
    area
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn builds_user_scoped_paths() {
    let paths = Paths::new("task-manager-default");
    assert_eq!(
      paths.preferences("ann"),
      "artifacts/task-manager-default/users/ann/userConfiguration/appPreferencesDoc"
    );
    assert_eq!(
      paths.years("ann"),
      "artifacts/task-manager-default/users/ann/userConfiguration/manageableYearsDoc"
    );
    assert_eq!(
      paths.task("ann", "t1"),
      "artifacts/task-manager-default/users/ann/tasks/t1"
    );
  }

  #[test]
  fn locates_owner_and_area() {
    let paths = Paths::new("app");
    let task = paths.task("bob", "t9");
    let loc = locate(&task).expect("task path");
    assert_eq!(loc.owner, "bob");
    assert_eq!(loc.area, Area::Tasks);

    let tasks = paths.tasks("bob");
    let loc = locate(&tasks).expect("collection path");
    assert_eq!(loc.area, Area::Tasks);

    let years = paths.years("bob");
    let loc = locate(&years).expect("years path");
    assert_eq!(loc.area, Area::UserConfiguration);

    assert!(locate("elsewhere/app/users/bob").is_none());
    assert!(locate("artifacts/app/users/").is_none());
  }
}
