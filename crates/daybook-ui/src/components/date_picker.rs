use daybook_core::calendar::MONTHS;
use daybook_core::selector::Selection;
use web_sys::{
  Event,
  HtmlSelectElement
};
use yew::{
  Callback,
  Html,
  Properties,
  TargetCast,
  function_component,
  html
};

#[derive(Properties, PartialEq)]
pub struct DatePickerProps {
  pub years:         Vec<i32>,
  pub years_loading: bool,
  pub selection:     Selection,
  pub valid_days:    Vec<u32>,
  pub on_year:       Callback<Option<i32>>,
  pub on_month:      Callback<Option<usize>>,
  pub on_day:        Callback<Option<u32>>
}

/// Parses a `<select>` value; the empty placeholder option means "none".
fn selected<T: std::str::FromStr>(event: &Event) -> Option<T> {
  let value = event.target_unchecked_into::<HtmlSelectElement>().value();
  if value.is_empty() {
    return None;
  }
  match value.parse() {
    | Ok(parsed) => Some(parsed),
    | Err(_) => {
      tracing::warn!(value, "unexpected select value");
      None
    }
  }
}

#[function_component(DatePicker)]
pub fn date_picker(props: &DatePickerProps) -> Html {
  let selection = props.selection;

  let on_year = props.on_year.clone();
  let on_month = props.on_month.clone();
  let on_day = props.on_day.clone();

  let year_placeholder = if props.years_loading {
    "Loading..."
  } else {
    "Select Year"
  };

  html! {
    <section class="date-selection-section card">
      <h2 class="section-title">{ "Select Date" }</h2>
      <div class="date-selectors-grid">
        <div class="form-group">
          <label for="year-select">{ "Year" }</label>
          <select
            id="year-select"
            disabled={props.years_loading || props.years.is_empty()}
            onchange={move |e: Event| on_year.emit(selected(&e))}
          >
            <option value="" disabled={true} selected={selection.year.is_none()}>
              { year_placeholder }
            </option>
            {
              for props.years.iter().map(|year| html! {
                <option
                  value={year.to_string()}
                  selected={selection.year == Some(*year)}
                >
                  { *year }
                </option>
              })
            }
          </select>
        </div>
        <div class="form-group">
          <label for="month-select">{ "Month" }</label>
          <select
            id="month-select"
            disabled={selection.year.is_none()}
            onchange={move |e: Event| on_month.emit(selected(&e))}
          >
            <option value="" disabled={true} selected={selection.month.is_none()}>
              { "Select Month" }
            </option>
            {
              for MONTHS.iter().enumerate().map(|(index, name)| html! {
                <option
                  value={index.to_string()}
                  selected={selection.month == Some(index)}
                >
                  { *name }
                </option>
              })
            }
          </select>
        </div>
        <div class="form-group">
          <label for="day-select">{ "Day" }</label>
          <select
            id="day-select"
            disabled={selection.month.is_none() || props.valid_days.is_empty()}
            onchange={move |e: Event| on_day.emit(selected(&e))}
          >
            <option value="" disabled={true} selected={selection.day.is_none()}>
              { "Select Day" }
            </option>
            {
              for props.valid_days.iter().map(|day| html! {
                <option
                  value={day.to_string()}
                  selected={selection.day == Some(*day)}
                >
                  { *day }
                </option>
              })
            }
          </select>
        </div>
      </div>
    </section>
  }
}
