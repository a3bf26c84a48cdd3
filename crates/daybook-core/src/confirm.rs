//! Asynchronous yes/no confirmation.
//!
//! Operations that destroy data ask a [`ConfirmService`] before writing. The
//! browser build plugs a DOM dialog into [`ModalController`]; tests script
//! the answers directly.

use std::cell::RefCell;
use std::rc::{
  Rc,
  Weak
};

use futures::channel::oneshot;
use futures::future::LocalBoxFuture;
use tracing::debug;

pub trait ConfirmService {
  /// Resolves to `true` only when the user accepts.
  fn confirm(&self, message: &str) -> LocalBoxFuture<'static, bool>;
}

/// Presentation half of the modal. `mount` must not call back into the
/// responder synchronously.
pub trait ModalView {
  fn mount(&mut self, message: &str, responder: ModalResponder);
  fn unmount(&mut self);
}

struct Pending {
  ticket: u64,
  reply:  oneshot::Sender<bool>
}

struct ModalState {
  view:        Box<dyn ModalView>,
  pending:     Option<Pending>,
  next_ticket: u64
}

/// Keeps at most one dialog mounted. A new request dismisses the previous
/// one, which resolves as declined.
#[derive(Clone)]
pub struct ModalController {
  state: Rc<RefCell<ModalState>>
}

impl ModalController {
  pub fn new(view: impl ModalView + 'static) -> Self {
    Self {
      state: Rc::new(RefCell::new(ModalState {
        view:        Box::new(view),
        pending:     None,
        next_ticket: 0
      }))
    }
  }

  pub fn is_open(&self) -> bool {
    self.state.borrow().pending.is_some()
  }
}

impl ConfirmService for ModalController {
  fn confirm(&self, message: &str) -> LocalBoxFuture<'static, bool> {
    let (reply, answer) = oneshot::channel();
    {
      let mut state = self.state.borrow_mut();
      if let Some(previous) = state.pending.take() {
        debug!(ticket = previous.ticket, "replacing open confirmation");
        state.view.unmount();
        let _ = previous.reply.send(false);
      }
      state.next_ticket += 1;
      let ticket = state.next_ticket;
      state.pending = Some(Pending { ticket, reply });
      let responder = ModalResponder {
        ticket,
        state: Rc::downgrade(&self.state)
      };
      state.view.mount(message, responder);
    }
    Box::pin(async move { answer.await.unwrap_or(false) })
  }
}

/// Handed to the view so its buttons can answer one specific request.
/// Answers for a request that was already replaced are ignored.
pub struct ModalResponder {
  ticket: u64,
  state:  Weak<RefCell<ModalState>>
}

impl ModalResponder {
  pub fn respond(self, accepted: bool) {
    let Some(state) = self.state.upgrade() else {
      return;
    };
    let mut state = state.borrow_mut();
    let ticket = self.ticket;
    if let Some(pending) = state.pending.take_if(|p| p.ticket == ticket) {
      state.view.unmount();
      let _ = pending.reply.send(accepted);
    }
  }
}

#[cfg(test)]
mod tests {
  use futures::executor::block_on;
  use futures::FutureExt;

  use super::*;

  #[derive(Default)]
  struct Recorded {
    mounted:    Vec<String>,
    unmounts:   usize,
    responders: Vec<ModalResponder>
  }

  struct FakeView(Rc<RefCell<Recorded>>);

  impl ModalView for FakeView {
    fn mount(&mut self, message: &str, responder: ModalResponder) {
      let mut rec = self.0.borrow_mut();
      rec.mounted.push(message.to_string());
      rec.responders.push(responder);
    }

    fn unmount(&mut self) {
      self.0.borrow_mut().unmounts += 1;
    }
  }

  fn controller() -> (ModalController, Rc<RefCell<Recorded>>) {
    let rec = Rc::new(RefCell::new(Recorded::default()));
    (ModalController::new(FakeView(rec.clone())), rec)
  }

  #[test]
  fn accept_resolves_true_and_unmounts() {
    let (modal, rec) = controller();
    let answer = modal.confirm("Delete?");
    assert!(modal.is_open());

    let responder = rec.borrow_mut().responders.remove(0);
    responder.respond(true);
    assert!(block_on(answer));
    assert!(!modal.is_open());
    assert_eq!(rec.borrow().unmounts, 1);
  }

  #[test]
  fn second_request_declines_the_first() {
    let (modal, rec) = controller();
    let first = modal.confirm("first");
    let second = modal.confirm("second");

    assert_eq!(rec.borrow().mounted, vec!["first", "second"]);
    assert_eq!(rec.borrow().unmounts, 1);
    assert_eq!(first.now_or_never(), Some(false));

    let stale = rec.borrow_mut().responders.remove(0);
    stale.respond(true);
    assert!(modal.is_open());

    let live = rec.borrow_mut().responders.remove(0);
    live.respond(false);
    assert!(!block_on(second));
    assert_eq!(rec.borrow().unmounts, 2);
  }

  #[test]
  fn dropping_the_controller_declines() {
    let (modal, _rec) = controller();
    let answer = modal.confirm("gone");
    drop(modal);
    assert!(!block_on(answer));
  }
}
