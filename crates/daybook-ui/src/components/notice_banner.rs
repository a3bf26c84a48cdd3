use daybook_core::workspace::Notice;
use gloo::timers::callback::Timeout;
use yew::{
  Callback,
  Html,
  Properties,
  classes,
  function_component,
  html,
  use_effect_with
};

#[derive(Properties, PartialEq)]
pub struct NoticeBannerProps {
  pub notice:       Option<Notice>,
  pub class:        &'static str,
  /// Styles every message as an error instead of only failures.
  #[prop_or_default]
  pub always_error: bool,
  pub on_expire:    Callback<u64>
}

/// Shows one notice slot and clears transient notices when their time is up.
#[function_component(NoticeBanner)]
pub fn notice_banner(props: &NoticeBannerProps) -> Html {
  {
    let on_expire = props.on_expire.clone();
    use_effect_with(props.notice.clone(), move |notice| {
      let timer = notice.as_ref().and_then(|notice| {
        let ttl = notice.ttl?;
        let id = notice.id;
        let millis = u32::try_from(ttl.as_millis()).unwrap_or(u32::MAX);
        Some(Timeout::new(millis, move || on_expire.emit(id)))
      });
      move || drop(timer)
    });
  }

  let Some(notice) = &props.notice else {
    return html! {};
  };
  let is_error = props.always_error
    || notice.text.starts_with("Failed")
    || notice.text.starts_with("Cannot");

  html! {
    <div class={classes!("info-message", props.class, is_error.then_some("error-message"))}>
      { &notice.text }
    </div>
  }
}
