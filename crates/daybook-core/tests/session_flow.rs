mod common;

use common::{notice, pick_date, uid, Harness, PASSWORD};
use daybook_core::error::ValidationError;
use daybook_core::model::Preferences;
use daybook_core::{ActionError, Config, NoticeSlot, Workspace};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

#[test]
fn registration_creates_default_preferences() {
    let mut h = Harness::new();
    let ann = h.signed_in("laptop", "a@x.com", "Ann");
    let uid = uid(&ann);

    let doc = h
        .service
        .document(&ann.workspace.paths().preferences(&uid))
        .expect("preferences document");
    assert_eq!(
        Value::Object(doc),
        json!({ "theme": "dark", "nickname": "Task Manager Deluxe", "companions": [] })
    );
    assert_eq!(ann.workspace.preferences(), &Preferences::default());
    assert_eq!(ann.workspace.years().years(), &[2026, 2027, 2028]);
    assert_eq!(
        ann.workspace.user().and_then(|u| u.display_name.as_deref()),
        Some("Ann")
    );
}

#[test]
fn auth_failures_map_to_messages() {
    let mut h = Harness::new();
    let _ann = h.signed_in("laptop", "a@x.com", "Ann");
    let mut other = h.client("phone");
    h.settle(&mut [&mut other]);
    assert!(other.workspace.session().is_ready());
    assert!(other.workspace.user().is_none());

    other
        .workspace
        .register("a@x.com", PASSWORD, "Again")
        .expect("accepted locally");
    h.settle(&mut [&mut other]);
    assert_eq!(
        notice(&other, NoticeSlot::Auth).as_deref(),
        Some("This email address is already in use.")
    );

    other
        .workspace
        .sign_in("a@x.com", "wrong-pass")
        .expect("accepted locally");
    h.settle(&mut [&mut other]);
    assert_eq!(
        notice(&other, NoticeSlot::Auth).as_deref(),
        Some("Invalid email or password.")
    );

    other
        .workspace
        .register("b@x.com", "123", "Bo")
        .expect("accepted locally");
    h.settle(&mut [&mut other]);
    assert_eq!(
        notice(&other, NoticeSlot::Auth).as_deref(),
        Some("The password is too weak (at least 6 characters).")
    );

    other
        .workspace
        .register("nonsense", PASSWORD, "Bo")
        .expect("accepted locally");
    h.settle(&mut [&mut other]);
    assert_eq!(
        notice(&other, NoticeSlot::Auth).as_deref(),
        Some("The email address is not valid.")
    );
    assert!(other.workspace.user().is_none());
}

#[test]
fn empty_fields_are_rejected_locally() {
    let mut h = Harness::new();
    let mut client = h.client("laptop");
    h.settle(&mut [&mut client]);

    assert_eq!(
        client.workspace.register("", PASSWORD, "Ann"),
        Err(ActionError::Validation(ValidationError::MissingCredentials))
    );
    assert_eq!(
        notice(&client, NoticeSlot::Auth).as_deref(),
        Some("Email and password cannot be empty.")
    );
    assert_eq!(
        client.workspace.register("a@x.com", PASSWORD, "   "),
        Err(ActionError::Validation(ValidationError::MissingDisplayName))
    );
    assert_eq!(
        client.workspace.sign_in("a@x.com", ""),
        Err(ActionError::Validation(ValidationError::MissingCredentials))
    );
    assert_eq!(h.service.write_count(), 0);
}

#[test]
fn second_device_signs_in_to_the_same_data() {
    let mut h = Harness::new();
    let mut laptop = h.signed_in("laptop", "a@x.com", "Ann");
    laptop.workspace.save_nickname("Home").expect("valid nickname");
    h.settle(&mut [&mut laptop]);

    let mut phone = h.client("phone");
    h.settle(&mut [&mut phone]);
    phone
        .workspace
        .sign_in(" A@X.com", PASSWORD)
        .expect("accepted locally");
    h.settle(&mut [&mut laptop, &mut phone]);

    assert_eq!(uid(&phone), uid(&laptop));
    assert_eq!(phone.workspace.preferences().nickname, "Home");
}

#[test]
fn sign_out_resets_to_defaults() {
    let mut h = Harness::new();
    let mut ann = h.signed_in("laptop", "a@x.com", "Ann");
    ann.workspace.toggle_theme().expect("theme");
    h.settle(&mut [&mut ann]);
    pick_date(&mut ann, 2026, 2, 4);
    h.settle(&mut [&mut ann]);
    assert!(ann.workspace.selector().selection().full_date().is_some());

    ann.workspace.sign_out().expect("sign out");
    h.settle(&mut [&mut ann]);

    assert!(ann.workspace.user().is_none());
    assert_eq!(ann.workspace.preferences(), &Preferences::default());
    assert!(ann.workspace.years().years().is_empty());
    assert!(ann.workspace.selector().selection().is_empty());
    assert!(ann.workspace.feed().recent().is_empty());
    assert!(ann.workspace.feed().dated().is_empty());
    assert_eq!(h.service.active_watchers(), 1);
}

#[test]
fn missing_backend_is_a_configuration_error() {
    let h = Harness::new();
    let (runtime, _confirm) = h.runtime();
    let mut ws = Workspace::new(&Config::default(), None, runtime);
    ws.start();

    assert!(ws.session().is_ready());
    assert_eq!(
        ws.session().config_error(),
        Some("Authentication service is not configured.")
    );
    assert_eq!(ws.sign_in("a@x.com", PASSWORD), Err(ActionError::NotConfigured));
    assert_eq!(
        ws.toggle_theme(),
        Err(ActionError::Unavailable { action: "save theme" })
    );
    assert_eq!(
        ws.notice(NoticeSlot::Settings).map(|n| n.text.as_str()),
        Some("Cannot save theme: user or database not available.")
    );
}
