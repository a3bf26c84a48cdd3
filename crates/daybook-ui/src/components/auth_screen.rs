use daybook_core::workspace::Notice;
use web_sys::{
  HtmlInputElement,
  InputEvent,
  MouseEvent,
  SubmitEvent
};
use yew::{
  Callback,
  Html,
  Properties,
  TargetCast,
  function_component,
  html,
  use_state
};

use super::NoticeBanner;

#[derive(Debug, Clone, PartialEq)]
pub enum AuthRequest {
  SignIn {
    email:    String,
    password: String
  },
  Register {
    email:        String,
    password:     String,
    display_name: String
  }
}

#[derive(Properties, PartialEq)]
pub struct AuthScreenProps {
  pub notice:      Option<Notice>,
  pub setup_error: Option<String>,
  pub footer:      String,
  pub on_submit:   Callback<AuthRequest>,
  /// Fired when switching between login and registration.
  pub on_switch:   Callback<()>,
  pub on_expire:   Callback<u64>
}

fn input_value(event: InputEvent) -> String {
  event.target_unchecked_into::<HtmlInputElement>().value()
}

#[function_component(AuthScreen)]
pub fn auth_screen(props: &AuthScreenProps) -> Html {
  let is_login = use_state(|| true);
  let email = use_state(String::new);
  let password = use_state(String::new);
  let display_name = use_state(String::new);

  let onsubmit = {
    let is_login = is_login.clone();
    let email = email.clone();
    let password = password.clone();
    let display_name = display_name.clone();
    let on_submit = props.on_submit.clone();
    Callback::from(move |event: SubmitEvent| {
      event.prevent_default();
      let request = if *is_login {
        AuthRequest::SignIn {
          email:    (*email).clone(),
          password: (*password).clone()
        }
      } else {
        AuthRequest::Register {
          email:        (*email).clone(),
          password:     (*password).clone(),
          display_name: (*display_name).clone()
        }
      };
      on_submit.emit(request);
    })
  };

  let on_switch = {
    let is_login = is_login.clone();
    let email = email.clone();
    let password = password.clone();
    let display_name = display_name.clone();
    let on_switch = props.on_switch.clone();
    Callback::from(move |_: MouseEvent| {
      is_login.set(!*is_login);
      email.set(String::new());
      password.set(String::new());
      display_name.set(String::new());
      on_switch.emit(());
    })
  };

  let set_email = {
    let email = email.clone();
    Callback::from(move |event: InputEvent| email.set(input_value(event)))
  };
  let set_password = {
    let password = password.clone();
    Callback::from(move |event: InputEvent| password.set(input_value(event)))
  };
  let set_display_name = {
    let display_name = display_name.clone();
    Callback::from(move |event: InputEvent| display_name.set(input_value(event)))
  };

  let (title, submit_label, switch_label) = if *is_login {
    ("Login to Task Manager", "Login", "Need an account? Register")
  } else {
    ("Register for Task Manager", "Register", "Already have an account? Login")
  };

  html! {
    <div class="auth-screen">
      <div class="auth-container">
        <h1 class="auth-title">{ title }</h1>
        <NoticeBanner
          notice={props.notice.clone()}
          class="auth-error"
          always_error={true}
          on_expire={props.on_expire.clone()}
        />
        {
          if let Some(error) = &props.setup_error {
            html! { <div class="error-message auth-error">{ error }</div> }
          } else {
            html! {}
          }
        }
        <form class="auth-form" {onsubmit}>
          {
            if *is_login {
              html! {}
            } else {
              html! {
                <div class="form-group">
                  <label for="displayName">{ "Display Name" }</label>
                  <input
                    id="displayName"
                    type="text"
                    class="form-group-input"
                    placeholder="Your Name"
                    value={(*display_name).clone()}
                    oninput={set_display_name}
                  />
                </div>
              }
            }
          }
          <div class="form-group">
            <label for="email">{ "Email Address" }</label>
            <input
              id="email"
              type="email"
              class="form-group-input"
              placeholder="you@example.com"
              value={(*email).clone()}
              oninput={set_email}
            />
          </div>
          <div class="form-group">
            <label for="password">{ "Password" }</label>
            <input
              id="password"
              type="password"
              class="form-group-input"
              placeholder="••••••••"
              value={(*password).clone()}
              oninput={set_password}
            />
          </div>
          <button type="submit" class="button button-primary button-full-width">
            { submit_label }
          </button>
        </form>
        <button class="auth-toggle-button" onclick={on_switch}>{ switch_label }</button>
      </div>
      <footer class="app-footer auth-footer"><p>{ &props.footer }</p></footer>
    </div>
  }
}
