//! Confirmation overlay built directly on the DOM, outside the Yew tree.

use std::cell::RefCell;
use std::rc::Rc;

use daybook_core::confirm::{
  ModalResponder,
  ModalView
};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{
  JsCast,
  JsValue
};
use web_sys::{
  Document,
  Element,
  HtmlElement
};

const OVERLAY_ID: &str = "custom-confirm-modal";

type SharedResponder = Rc<RefCell<Option<ModalResponder>>>;

#[derive(Default)]
pub struct DomConfirmDialog {
  mounted: Option<Mounted>
}

struct Mounted {
  overlay:   Element,
  // Dropped on unmount; the buttons go away with the overlay.
  _handlers: [Closure<dyn FnMut()>; 2]
}

impl ModalView for DomConfirmDialog {
  fn mount(&mut self, message: &str, responder: ModalResponder) {
    self.unmount();
    let Some(document) = web_sys::window().and_then(|window| window.document()) else {
      tracing::error!("no document; declining confirmation");
      decline_later(responder);
      return;
    };
    if let Some(stale) = document.get_element_by_id(OVERLAY_ID) {
      stale.remove();
    }

    let slot: SharedResponder = Rc::new(RefCell::new(Some(responder)));
    match build(&document, message, &slot) {
      | Ok(mounted) => self.mounted = Some(mounted),
      | Err(error) => {
        tracing::error!(?error, "failed to build confirmation dialog");
        if let Some(responder) = slot.borrow_mut().take() {
          decline_later(responder);
        }
      }
    }
  }

  fn unmount(&mut self) {
    if let Some(mounted) = self.mounted.take() {
      mounted.overlay.remove();
    }
  }
}

fn build(document: &Document, message: &str, slot: &SharedResponder) -> Result<Mounted, JsValue> {
  let body = document
    .body()
    .ok_or_else(|| JsValue::from_str("document has no body"))?;

  let overlay = document.create_element("div")?;
  overlay.set_id(OVERLAY_ID);
  overlay.set_class_name("confirm-modal-overlay");

  let content = document.create_element("div")?;
  content.set_class_name("confirm-modal-content");

  let text = document.create_element("p")?;
  text.set_class_name("confirm-modal-message");
  text.set_text_content(Some(message));

  let buttons = document.create_element("div")?;
  buttons.set_class_name("confirm-modal-buttons");

  let ok = button(document, "confirmOk", "OK", "button button-danger")?;
  let cancel = button(document, "confirmCancel", "Cancel", "button button-secondary")?;
  let on_ok = answer_handler(slot.clone(), true);
  let on_cancel = answer_handler(slot.clone(), false);
  ok.set_onclick(Some(on_ok.as_ref().unchecked_ref()));
  cancel.set_onclick(Some(on_cancel.as_ref().unchecked_ref()));

  buttons.append_child(&ok)?;
  buttons.append_child(&cancel)?;
  content.append_child(&text)?;
  content.append_child(&buttons)?;
  overlay.append_child(&content)?;
  body.append_child(&overlay)?;

  Ok(Mounted {
    overlay,
    _handlers: [on_ok, on_cancel]
  })
}

fn button(document: &Document, id: &str, label: &str, class: &str) -> Result<HtmlElement, JsValue> {
  let element = document
    .create_element("button")?
    .dyn_into::<HtmlElement>()
    .map_err(JsValue::from)?;
  element.set_id(id);
  element.set_class_name(class);
  element.set_text_content(Some(label));
  Ok(element)
}

/// Answering unmounts the dialog, which drops this closure, so the answer
/// is delivered from a fresh task rather than from inside the click.
fn answer_handler(slot: SharedResponder, accepted: bool) -> Closure<dyn FnMut()> {
  Closure::new(move || {
    if let Some(responder) = slot.borrow_mut().take() {
      tracing::debug!(accepted, "confirmation answered");
      wasm_bindgen_futures::spawn_local(async move { responder.respond(accepted) });
    }
  })
}

fn decline_later(responder: ModalResponder) {
  wasm_bindgen_futures::spawn_local(async move { responder.respond(false) });
}
