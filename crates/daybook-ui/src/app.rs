use std::cell::RefCell;
use std::rc::Rc;

use chrono::{
  Datelike,
  Local
};
use daybook_core::clock::{
  Clock,
  SystemClock
};
use daybook_core::confirm::ModalController;
use daybook_core::model::Theme;
use daybook_core::{
  ActionError,
  Config,
  NoticeSlot,
  Persistence,
  Runtime,
  Workspace,
  connect
};
use gloo::console::log;
use yew::{
  Callback,
  Html,
  MouseEvent,
  Properties,
  UseForceUpdateHandle,
  function_component,
  html,
  use_effect_with,
  use_force_update,
  use_state
};

use crate::components::{
  AuthRequest,
  AuthScreen,
  DatePicker,
  NoticeBanner,
  SettingsModal,
  Sidebar,
  TaskSection
};
use crate::confirm_dialog::DomConfirmDialog;
use crate::spawn::BrowserSpawner;
use crate::storage::LocalStore;

/// Backend session name for this browser.
const SESSION: &str = "browser";

#[derive(Properties, PartialEq)]
pub struct AppProps {
  pub config:      Config,
  pub setup_error: Option<String>
}

/// The workspace plus a way to re-render after touching it.
#[derive(Clone)]
struct Shell {
  workspace: Rc<RefCell<Workspace>>,
  refresh:   UseForceUpdateHandle
}

impl PartialEq for Shell {
  fn eq(&self, other: &Self) -> bool {
    Rc::ptr_eq(&self.workspace, &other.workspace)
  }
}

impl Shell {
  #[tracing::instrument(skip_all)]
  fn boot(props: &AppProps, refresh: UseForceUpdateHandle) -> Self {
    let config = &props.config;
    let clock: Rc<dyn Clock> = Rc::new(SystemClock);
    let runtime = Runtime {
      spawner: Rc::new(BrowserSpawner),
      confirm: Rc::new(ModalController::new(DomConfirmDialog::default())),
      clock:   clock.clone()
    };

    let workspace = if let Some(error) = &props.setup_error {
      let mut workspace = Workspace::new(config, None, runtime);
      workspace.fail_setup(error.clone());
      workspace
    } else {
      let persistence = config
        .backend
        .storage_key
        .as_ref()
        .map(|key| Rc::new(LocalStore::new(key.clone())) as Rc<dyn Persistence>);
      match connect(config, persistence, clock, SESSION) {
        | Ok(backend) => Workspace::new(config, Some(backend), runtime),
        | Err(error) => {
          tracing::error!(%error, "backend unavailable");
          let mut workspace = Workspace::new(config, None, runtime);
          workspace.fail_setup(format!("Configuration error: {error}"));
          workspace
        }
      }
    };
    let workspace = Rc::new(RefCell::new(workspace));
    let weak = Rc::downgrade(&workspace);
    let wake = refresh.clone();
    workspace.borrow().set_notifier(move || {
      let weak = weak.clone();
      let wake = wake.clone();
      // Events can be raised while the workspace is borrowed, so drain
      // them from a fresh task.
      wasm_bindgen_futures::spawn_local(async move {
        let Some(workspace) = weak.upgrade() else {
          return;
        };
        let handled = match workspace.try_borrow_mut() {
          | Ok(mut workspace) => workspace.pump(),
          | Err(_) => 0
        };
        if handled > 0 {
          wake.force_update();
        }
      });
    });
    workspace.borrow_mut().start();

    Self { workspace, refresh }
  }

  fn act(&self, action: &'static str, f: impl FnOnce(&mut Workspace) -> Result<(), ActionError>) {
    let outcome = match self.workspace.try_borrow_mut() {
      | Ok(mut workspace) => f(&mut workspace),
      | Err(_) => {
        tracing::warn!(action, "workspace busy; interaction dropped");
        return;
      }
    };
    if let Err(error) = outcome {
      log!(format!("{action} rejected: {error}"));
    }
    self.refresh.force_update();
  }

  fn callback<T: 'static>(
    &self,
    action: &'static str,
    f: impl Fn(&mut Workspace, T) -> Result<(), ActionError> + 'static
  ) -> Callback<T> {
    let shell = self.clone();
    Callback::from(move |value: T| shell.act(action, |workspace| f(workspace, value)))
  }

  fn expire(&self, slot: NoticeSlot) -> Callback<u64> {
    self.callback("expire notice", move |workspace, id| {
      workspace.clear_notice(slot, id);
      Ok(())
    })
  }
}

fn apply_body_class(theme: Theme) {
  let Some(body) = web_sys::window()
    .and_then(|window| window.document())
    .and_then(|document| document.body())
  else {
    return;
  };
  body.set_class_name(theme.body_class());
}

#[function_component(App)]
pub fn app(props: &AppProps) -> Html {
  let refresh = use_force_update();
  let shell = use_state(|| Shell::boot(props, refresh.clone()));
  let shell = (*shell).clone();
  let settings_open = use_state(|| false);

  let theme = shell.workspace.borrow().theme();
  use_effect_with(theme, |theme| apply_body_class(*theme));

  let ws = shell.workspace.borrow();
  let nickname = ws.preferences().nickname.clone();
  let footer = format!("© {} {}", Local::now().year(), nickname);

  if !ws.session().is_ready() {
    return html! {
      <div class="loading-screen">
        <div class="loading-text">{ "Initializing..." }</div>
        <div class="loading-spinner"></div>
      </div>
    };
  }

  let Some(user) = ws.user().cloned() else {
    let on_submit = shell.callback("authenticate", |workspace, request: AuthRequest| match request {
      | AuthRequest::SignIn { email, password } => workspace.sign_in(&email, &password),
      | AuthRequest::Register {
        email,
        password,
        display_name
      } => workspace.register(&email, &password, &display_name)
    });
    let on_switch = shell.callback("switch auth mode", |workspace, ()| {
      workspace.dismiss_notice(NoticeSlot::Auth);
      Ok(())
    });
    return html! {
      <AuthScreen
        notice={ws.notice(NoticeSlot::Auth).cloned()}
        setup_error={ws.session().config_error().map(str::to_string)}
        {footer}
        {on_submit}
        {on_switch}
        on_expire={shell.expire(NoticeSlot::Auth)}
      />
    };
  };

  let viewed = ws.viewed_companion().cloned();
  let title = viewed
    .as_ref()
    .map(|companion| format!("{}'s Tasks", companion.nickname))
    .unwrap_or_else(|| nickname.clone());
  let selection = ws.selector().selection();

  let open_settings = {
    let settings_open = settings_open.clone();
    Callback::from(move |_: MouseEvent| settings_open.set(true))
  };
  let close_settings = {
    let settings_open = settings_open.clone();
    let shell = shell.clone();
    Callback::from(move |()| {
      settings_open.set(false);
      shell.act("close settings", |workspace| {
        workspace.dismiss_notice(NoticeSlot::Settings);
        Ok(())
      });
    })
  };
  let sign_out = {
    let on_sign_out = shell.callback("sign out", |workspace, ()| workspace.sign_out());
    let settings_open = settings_open.clone();
    Callback::from(move |_: MouseEvent| {
      settings_open.set(false);
      on_sign_out.emit(());
    })
  };

  let tasks_area = match selection.full_date() {
    | Some(date) => html! {
      <TaskSection
        {date}
        companion={viewed.as_ref().map(|c| c.nickname.clone())}
        tasks={ws.feed().dated().to_vec()}
        loading={ws.feed().is_dated_loading()}
        on_add={shell.callback("add task", |workspace, text: String| workspace.add_task(&text))}
        on_toggle={shell.callback("toggle task", |workspace, id: String| workspace.toggle_task(&id))}
        on_delete={shell.callback("delete task", |workspace, id: String| workspace.delete_task(&id))}
      />
    },
    | None if selection.year.is_some() && selection.month.is_some() => {
      if ws.selector().valid_days().is_empty() {
        html! {}
      } else {
        html! { <p class="info-message">{ "Please select a day to view or add tasks." }</p> }
      }
    }
    | None if selection.year.is_some() => {
      html! { <p class="info-message">{ "Please select a month." }</p> }
    }
    | None if !ws.years().years().is_empty() => {
      html! { <p class="info-message">{ "Please select a year to begin." }</p> }
    }
    | None => html! {}
  };

  html! {
    <div class="app-layout">
      <SettingsModal
        open={*settings_open}
        uid={user.uid.clone()}
        theme={ws.theme()}
        nickname={nickname.clone()}
        companions={ws.companions().to_vec()}
        years={ws.years().years().to_vec()}
        years_loading={ws.years().is_loading()}
        settings_notice={ws.notice(NoticeSlot::Settings).cloned()}
        years_notice={ws.notice(NoticeSlot::Years).cloned()}
        on_close={close_settings}
        on_toggle_theme={shell.callback("toggle theme", |workspace, ()| workspace.toggle_theme())}
        on_save_nickname={shell.callback("save nickname", |workspace, raw: String| workspace.save_nickname(&raw))}
        on_add_year={shell.callback("add year", |workspace, raw: String| workspace.add_year(&raw))}
        on_delete_year={shell.callback("delete year", |workspace, year: i32| workspace.delete_year(year))}
        on_add_companion={shell.callback("add companion", |workspace, (uid, nickname): (String, String)| {
          workspace.add_companion(&uid, &nickname)
        })}
        on_remove_companion={shell.callback("remove companion", |workspace, uid: String| workspace.remove_companion(&uid))}
        on_expire_settings={shell.expire(NoticeSlot::Settings)}
        on_expire_years={shell.expire(NoticeSlot::Years)}
      />
      <Sidebar
        title={title.clone()}
        scope={ws.selector().scope()}
        companions={ws.companions().to_vec()}
        viewed={viewed.as_ref().map(|c| c.uid.clone())}
        recent={ws.feed().recent().to_vec()}
        recent_loading={ws.feed().is_recent_loading()}
        recent_notice={ws.notice(NoticeSlot::Recent).cloned()}
        on_toggle_scope={shell.callback("toggle scope", |workspace, ()| workspace.toggle_scope())}
        on_select_companion={shell.callback("select companion", |workspace, uid: String| workspace.select_companion(&uid))}
        on_open_recent={shell.callback("open recent task", |workspace, id: String| workspace.open_recent_task(&id))}
        on_expire={shell.expire(NoticeSlot::Recent)}
      />
      <main class="main-content-area">
        <div class="main-container">
          <header class="app-header">
            <div>
              <h1 class="main-title">{ title }</h1>
              <p class="user-email-display">
                { format!("Logged in as: {}", user.display_name.as_deref().or(user.email.as_deref()).unwrap_or_default()) }
              </p>
              <p class="user-uid-display">{ format!("My User ID: {}", user.uid) }</p>
            </div>
            <div class="header-actions">
              <button class="button-icon settings-button" title="App Settings" onclick={open_settings}>
                <span>{ "Options" }</span>
              </button>
              <button class="button button-logout" onclick={sign_out}>{ "Logout" }</button>
            </div>
          </header>

          <NoticeBanner
            notice={ws.notice(NoticeSlot::General).cloned()}
            class="main-error"
            always_error={true}
            on_expire={shell.expire(NoticeSlot::General)}
          />

          <DatePicker
            years={ws.years().years().to_vec()}
            years_loading={ws.years().is_loading()}
            {selection}
            valid_days={ws.selector().valid_days()}
            on_year={shell.callback("select year", |workspace, year| workspace.select_year(year))}
            on_month={shell.callback("select month", |workspace, month| workspace.select_month(month))}
            on_day={shell.callback("select day", |workspace, day| workspace.select_day(day))}
          />

          { tasks_area }
        </div>
        <footer class="app-footer main-app-footer"><p>{ footer }</p></footer>
      </main>
    </div>
  }
}

