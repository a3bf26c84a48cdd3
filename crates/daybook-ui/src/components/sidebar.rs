use daybook_core::model::{
  Companion,
  Task
};
use daybook_core::selector::Scope;
use daybook_core::workspace::Notice;
use yew::{
  Callback,
  Html,
  Properties,
  classes,
  function_component,
  html
};

use super::NoticeBanner;

#[derive(Properties, PartialEq)]
pub struct SidebarProps {
  pub title:               String,
  pub scope:               Scope,
  pub companions:          Vec<Companion>,
  /// Uid of the companion being viewed.
  pub viewed:              Option<String>,
  pub recent:              Vec<Task>,
  pub recent_loading:      bool,
  pub recent_notice:       Option<Notice>,
  pub on_toggle_scope:     Callback<()>,
  pub on_select_companion: Callback<String>,
  pub on_open_recent:      Callback<String>,
  pub on_expire:           Callback<u64>
}

#[function_component(Sidebar)]
pub fn sidebar(props: &SidebarProps) -> Html {
  let on_toggle_scope = props.on_toggle_scope.clone();
  let own = props.scope == Scope::Own;
  let toggle_label = if own {
    "View Companion's Tasks"
  } else {
    "View My Tasks"
  };
  let viewed_nickname = props.viewed.as_ref().and_then(|uid| {
    props
      .companions
      .iter()
      .find(|c| &c.uid == uid)
      .map(|c| c.nickname.clone())
  });

  let companion_list = if own || props.companions.is_empty() {
    html! {}
  } else {
    html! {
      <div class="companion-selection-sidebar">
        <h3 class="sidebar-subtitle">{ "Select Companion:" }</h3>
        <ul class="companion-list-sidebar">
          {
            for props.companions.iter().map(|companion| {
              let on_select = props.on_select_companion.clone();
              let uid = companion.uid.clone();
              let active = props.viewed.as_deref() == Some(companion.uid.as_str());
              html! {
                <li
                  key={companion.uid.clone()}
                  class={classes!("companion-list-item", active.then_some("active"))}
                  onclick={move |_| on_select.emit(uid.clone())}
                >
                  { &companion.nickname }
                </li>
              }
            })
          }
        </ul>
      </div>
    }
  };

  let recent_body = if props.recent_loading {
    html! { <p class="sidebar-loading">{ "Loading recent tasks..." }</p> }
  } else if props.recent.is_empty() {
    if props.recent_notice.is_some() {
      html! {}
    } else {
      html! { <p class="sidebar-empty">{ "No recent tasks found." }</p> }
    }
  } else {
    html! {
      <ul class="recent-tasks-list">
        {
          for props.recent.iter().map(|task| {
            let on_open = props.on_open_recent.clone();
            let id = task.id.clone();
            html! {
              <li
                key={task.id.clone()}
                class="recent-task-item"
                title={format!("Go to task: {}", task.text)}
                onclick={move |_| on_open.emit(id.clone())}
              >
                <span class="recent-task-text">{ &task.text }</span>
                <span class="recent-task-date">
                  { format!("{} {}, {}", task.month, task.day, task.year) }
                </span>
              </li>
            }
          })
        }
      </ul>
    }
  };

  html! {
    <aside class="sidebar">
      <h2 class="sidebar-title">{ &props.title }</h2>
      <div class="view-mode-toggle">
        <button
          class={classes!("button", "button-secondary", own.then_some("active"))}
          disabled={props.companions.is_empty()}
          onclick={move |_| on_toggle_scope.emit(())}
        >
          { toggle_label }
        </button>
      </div>
      { companion_list }
      <h3 class="sidebar-subtitle">
        { "Recent Tasks" }
        { viewed_nickname.map(|nickname| format!(" (for {nickname})")).unwrap_or_default() }
      </h3>
      <NoticeBanner
        notice={props.recent_notice.clone()}
        class="sidebar-error"
        always_error={true}
        on_expire={props.on_expire.clone()}
      />
      { recent_body }
    </aside>
  }
}
