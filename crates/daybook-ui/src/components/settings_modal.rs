use daybook_core::model::{
  Companion,
  Theme
};
use daybook_core::workspace::Notice;
use web_sys::{
  HtmlInputElement,
  InputEvent,
  MouseEvent
};
use yew::{
  Callback,
  Html,
  Properties,
  TargetCast,
  UseStateHandle,
  function_component,
  html,
  use_effect_with,
  use_state
};

use super::NoticeBanner;

#[derive(Properties, PartialEq)]
pub struct SettingsModalProps {
  pub open:                bool,
  pub uid:                 String,
  pub theme:               Theme,
  pub nickname:            String,
  pub companions:          Vec<Companion>,
  pub years:               Vec<i32>,
  pub years_loading:       bool,
  pub settings_notice:     Option<Notice>,
  pub years_notice:        Option<Notice>,
  pub on_close:            Callback<()>,
  pub on_toggle_theme:     Callback<()>,
  pub on_save_nickname:    Callback<String>,
  pub on_add_year:         Callback<String>,
  pub on_delete_year:      Callback<i32>,
  pub on_add_companion:    Callback<(String, String)>,
  pub on_remove_companion: Callback<String>,
  pub on_expire_settings:  Callback<u64>,
  pub on_expire_years:     Callback<u64>
}

fn bind(state: &UseStateHandle<String>) -> Callback<InputEvent> {
  let state = state.clone();
  Callback::from(move |event: InputEvent| {
    state.set(event.target_unchecked_into::<HtmlInputElement>().value())
  })
}

#[function_component(SettingsModal)]
pub fn settings_modal(props: &SettingsModalProps) -> Html {
  let nickname_input = use_state(|| props.nickname.clone());
  let year_input = use_state(String::new);
  let companion_uid = use_state(String::new);
  let companion_nickname = use_state(String::new);

  {
    let nickname_input = nickname_input.clone();
    use_effect_with((props.open, props.nickname.clone()), move |(_, nickname)| {
      nickname_input.set(nickname.clone());
    });
  }

  if !props.open {
    return html! {};
  }

  let close_backdrop = {
    let on_close = props.on_close.clone();
    Callback::from(move |_: MouseEvent| on_close.emit(()))
  };
  let close_button = close_backdrop.clone();
  let on_toggle_theme = {
    let on_toggle_theme = props.on_toggle_theme.clone();
    Callback::from(move |_: MouseEvent| on_toggle_theme.emit(()))
  };
  let on_save_nickname = {
    let on_save = props.on_save_nickname.clone();
    let nickname_input = nickname_input.clone();
    Callback::from(move |_: MouseEvent| on_save.emit((*nickname_input).clone()))
  };
  let on_add_year = {
    let on_add = props.on_add_year.clone();
    let year_input = year_input.clone();
    Callback::from(move |_: MouseEvent| {
      on_add.emit((*year_input).clone());
      year_input.set(String::new());
    })
  };
  let on_add_companion = {
    let on_add = props.on_add_companion.clone();
    let uid = companion_uid.clone();
    let nickname = companion_nickname.clone();
    Callback::from(move |_: MouseEvent| {
      let complete = !uid.trim().is_empty() && !nickname.trim().is_empty();
      on_add.emit(((*uid).clone(), (*nickname).clone()));
      if complete {
        uid.set(String::new());
        nickname.set(String::new());
      }
    })
  };

  let theme_label = match props.theme {
    | Theme::Dark => "Switch to Light Mode",
    | Theme::Light => "Switch to Dark Mode"
  };

  html! {
    <div class="settings-modal-overlay" onclick={close_backdrop}>
      <div class="settings-modal-content" onclick={Callback::from(|e: MouseEvent| e.stop_propagation())}>
        <div class="settings-modal-header">
          <h2>{ "App Settings" }</h2>
          <button class="button-icon close-modal-button" title="Close settings" onclick={close_button}>
            { "×" }
          </button>
        </div>

        <NoticeBanner
          notice={props.settings_notice.clone()}
          class="settings-message"
          on_expire={props.on_expire_settings.clone()}
        />

        <div class="settings-section">
          <h3 class="subsection-title">{ "My Account" }</h3>
          <p class="info-text">
            { "Your User ID: " }
            <strong class="uid-emphasis">{ &props.uid }</strong>
          </p>
          <p class="placeholder-text small-text">
            { "Share this ID with someone you want to set as your companion, or someone who wants to set you as theirs." }
          </p>
        </div>

        <div class="settings-section">
          <h3 class="subsection-title">{ "Manage Available Years" }</h3>
          <NoticeBanner
            notice={props.years_notice.clone()}
            class="years-message"
            always_error={true}
            on_expire={props.on_expire_years.clone()}
          />
          <div class="add-year-form">
            <input
              type="number"
              class="form-group-input"
              placeholder="Enter year (e.g., 2026)"
              value={(*year_input).clone()}
              oninput={bind(&year_input)}
            />
            <button class="button button-primary add-year-button" onclick={on_add_year}>
              { "Add Year" }
            </button>
          </div>
          {
            if props.years_loading {
              html! { <p class="loading-text-tasks">{ "Loading years..." }</p> }
            } else {
              html! {
                <div class="manageable-years-display">
                  <ul class="year-tags-list">
                    {
                      for props.years.iter().map(|year| {
                        let year = *year;
                        let on_delete = props.on_delete_year.clone();
                        html! {
                          <li key={year} class="year-tag">
                            <span>{ year }</span>
                            <button
                              class="button-icon delete-year-button"
                              title={format!("Delete year {year}")}
                              onclick={move |_: MouseEvent| on_delete.emit(year)}
                            >
                              { "×" }
                            </button>
                          </li>
                        }
                      })
                    }
                  </ul>
                </div>
              }
            }
          }
        </div>

        <div class="settings-section">
          <h3 class="subsection-title">{ "Manage Companions" }</h3>
          <div class="add-companion-form">
            <input
              type="text"
              class="form-group-input"
              placeholder="Companion's User ID"
              value={(*companion_uid).clone()}
              oninput={bind(&companion_uid)}
            />
            <input
              type="text"
              class="form-group-input"
              placeholder="Companion's Nickname"
              value={(*companion_nickname).clone()}
              oninput={bind(&companion_nickname)}
            />
            <button class="button button-primary" onclick={on_add_companion}>
              { "Add Companion" }
            </button>
          </div>
          {
            if props.companions.is_empty() {
              html! { <p class="placeholder-text">{ "No companions added yet." }</p> }
            } else {
              html! {
                <ul class="companion-list-settings">
                  {
                    for props.companions.iter().map(|companion| {
                      let on_remove = props.on_remove_companion.clone();
                      let uid = companion.uid.clone();
                      html! {
                        <li key={companion.uid.clone()} class="companion-item">
                          <span>
                            { &companion.nickname }
                            <span class="small-text">{ format!(" ({}...)", companion.short_uid()) }</span>
                          </span>
                          <button
                            class="button button-danger button-small"
                            onclick={move |_: MouseEvent| on_remove.emit(uid.clone())}
                          >
                            { "Remove" }
                          </button>
                        </li>
                      }
                    })
                  }
                </ul>
              }
            }
          }
        </div>

        <div class="settings-section">
          <h3 class="subsection-title">{ "Appearance" }</h3>
          <button class="button button-secondary" onclick={on_toggle_theme}>{ theme_label }</button>
        </div>

        <div class="settings-section">
          <h3 class="subsection-title">{ "App Nickname" }</h3>
          <p class="info-text">{ format!("Current: {}", props.nickname) }</p>
          <div class="nickname-form">
            <input
              type="text"
              class="form-group-input"
              placeholder="New nickname"
              value={(*nickname_input).clone()}
              oninput={bind(&nickname_input)}
            />
            <button class="button button-primary" onclick={on_save_nickname}>{ "Save Nickname" }</button>
          </div>
        </div>
      </div>
    </div>
  }
}
