use daybook_core::model::Task;
use daybook_core::selector::FullDate;
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
  classes,
  function_component,
  html,
  use_state
};

#[derive(Properties, PartialEq)]
pub struct TaskSectionProps {
  pub date:      FullDate,
  /// Nickname of the companion whose tasks are shown, if any.
  pub companion: Option<String>,
  pub tasks:     Vec<Task>,
  pub loading:   bool,
  pub on_add:    Callback<String>,
  pub on_toggle: Callback<String>,
  pub on_delete: Callback<String>
}

#[function_component(TaskSection)]
pub fn task_section(props: &TaskSectionProps) -> Html {
  let draft = use_state(String::new);
  let read_only = props.companion.is_some();

  let onsubmit = {
    let draft = draft.clone();
    let on_add = props.on_add.clone();
    Callback::from(move |event: SubmitEvent| {
      event.prevent_default();
      let text = (*draft).clone();
      let accepted = !text.trim().is_empty();
      on_add.emit(text);
      if accepted && !read_only {
        draft.set(String::new());
      }
    })
  };
  let oninput = {
    let draft = draft.clone();
    Callback::from(move |event: InputEvent| {
      draft.set(event.target_unchecked_into::<HtmlInputElement>().value())
    })
  };

  let FullDate { year, month, day } = props.date;
  let suffix = props
    .companion
    .as_ref()
    .map(|nickname| format!(" ({nickname}'s Tasks - Read Only)"))
    .unwrap_or_default();

  let body = if props.loading {
    html! { <p class="loading-text-tasks">{ "Loading tasks..." }</p> }
  } else if props.tasks.is_empty() {
    html! {
      <p class="no-tasks-message">
        { "No tasks for this date." }
        { if read_only { "" } else { " Add one!" } }
      </p>
    }
  } else {
    html! {
      <ul class="task-list">
        {
          for props.tasks.iter().map(|task| {
            let on_toggle = props.on_toggle.clone();
            let on_delete = props.on_delete.clone();
            let toggle_id = task.id.clone();
            let delete_id = task.id.clone();
            html! {
              <li key={task.id.clone()} class={classes!("task-item", task.completed.then_some("completed"))}>
                <div class="task-item-content">
                  <input
                    type="checkbox"
                    class="task-checkbox"
                    checked={task.completed}
                    disabled={read_only}
                    onchange={move |_| on_toggle.emit(toggle_id.clone())}
                  />
                  <span class="task-text">{ &task.text }</span>
                </div>
                <button
                  class="button-icon delete-task-button"
                  title="Delete task"
                  disabled={read_only}
                  style={if read_only { "visibility:hidden;" } else { "visibility:visible;" }}
                  onclick={move |_: MouseEvent| on_delete.emit(delete_id.clone())}
                >
                  { "Delete" }
                </button>
              </li>
            }
          })
        }
      </ul>
    }
  };

  html! {
    <section class="tasks-section">
      <h2 class="section-title">{ format!("Tasks for {month} {day}, {year}{suffix}") }</h2>
      <form class="add-task-form" {onsubmit}>
        <input
          type="text"
          class="task-input-field form-group-input"
          placeholder="Enter new task..."
          value={(*draft).clone()}
          disabled={read_only}
          {oninput}
        />
        <button type="submit" class="button button-primary add-task-button" disabled={read_only}>
          { "Add Task" }
        </button>
      </form>
      { body }
    </section>
  }
}
