mod common;

use std::time::Duration;

use common::{notice, uid, Harness, PASSWORD};
use daybook_core::error::ValidationError;
use daybook_core::model::{Companion, Theme};
use daybook_core::selector::Scope;
use daybook_core::{ActionError, NoticeSlot};
use pretty_assertions::assert_eq;

#[test]
fn theme_and_nickname_merge_without_clobbering() {
    let mut h = Harness::new();
    let mut ann = h.signed_in("laptop", "a@x.com", "Ann");

    ann.workspace.save_nickname("  Planner ").expect("nickname");
    h.settle(&mut [&mut ann]);
    assert_eq!(notice(&ann, NoticeSlot::Settings).as_deref(), Some("Nickname saved!"));

    ann.workspace.toggle_theme().expect("theme");
    h.settle(&mut [&mut ann]);

    assert_eq!(ann.workspace.theme(), Theme::Light);
    assert_eq!(ann.workspace.preferences().nickname, "Planner");

    let saved = ann
        .workspace
        .notice(NoticeSlot::Settings)
        .cloned()
        .expect("settings notice");
    assert_eq!(saved.text, "Theme saved!");
    assert_eq!(saved.ttl, Some(Duration::from_secs(2)));

    ann.workspace.clear_notice(NoticeSlot::Settings, saved.id + 1);
    assert!(ann.workspace.notice(NoticeSlot::Settings).is_some());
    ann.workspace.clear_notice(NoticeSlot::Settings, saved.id);
    assert!(ann.workspace.notice(NoticeSlot::Settings).is_none());
}

#[test]
fn blank_nickname_is_rejected_without_a_write() {
    let mut h = Harness::new();
    let mut ann = h.signed_in("laptop", "a@x.com", "Ann");
    let writes = h.service.write_count();

    assert_eq!(
        ann.workspace.save_nickname("   "),
        Err(ActionError::Validation(ValidationError::EmptyNickname))
    );
    h.settle(&mut [&mut ann]);
    assert_eq!(h.service.write_count(), writes);
    assert_eq!(
        notice(&ann, NoticeSlot::Settings).as_deref(),
        Some("Nickname cannot be empty.")
    );
}

#[test]
fn failed_save_reports_and_keeps_last_known_value() {
    let mut h = Harness::new();
    let mut ann = h.signed_in("laptop", "a@x.com", "Ann");

    h.service.fail_writes(Some("offline"));
    ann.workspace.toggle_theme().expect("accepted locally");
    h.settle(&mut [&mut ann]);

    assert_eq!(ann.workspace.theme(), Theme::Dark);
    assert_eq!(
        notice(&ann, NoticeSlot::Settings).as_deref(),
        Some("Failed to save theme.")
    );
}

#[test]
fn companion_additions_are_validated() {
    let mut h = Harness::new();
    let mut ann = h.signed_in("laptop", "a@x.com", "Ann");
    let bob = h.signed_in("bob-laptop", "b@x.com", "Bob");
    let (ann_uid, bob_uid) = (uid(&ann), uid(&bob));

    assert_eq!(
        ann.workspace.add_companion(&ann_uid, "Me"),
        Err(ActionError::Validation(ValidationError::SelfCompanion))
    );
    assert_eq!(
        notice(&ann, NoticeSlot::Settings).as_deref(),
        Some("You cannot add yourself as a companion.")
    );

    ann.workspace.add_companion(&bob_uid, " Bob ").expect("new companion");
    h.settle(&mut [&mut ann]);
    assert_eq!(ann.workspace.companions(), &[Companion::new(bob_uid.clone(), "Bob")]);
    assert_eq!(
        notice(&ann, NoticeSlot::Settings).as_deref(),
        Some("Companion added successfully!")
    );

    let writes = h.service.write_count();
    assert_eq!(
        ann.workspace.add_companion(&bob_uid, "Bobby"),
        Err(ActionError::Validation(ValidationError::DuplicateCompanion))
    );
    assert_eq!(
        ann.workspace.add_companion("  ", "Nobody"),
        Err(ActionError::Validation(ValidationError::EmptyCompanionId))
    );
    assert_eq!(
        ann.workspace.add_companion("u9", ""),
        Err(ActionError::Validation(ValidationError::EmptyCompanionNickname))
    );
    assert_eq!(
        ann.workspace.remove_companion("u9"),
        Err(ActionError::Validation(ValidationError::UnknownCompanion))
    );
    h.settle(&mut [&mut ann]);
    assert_eq!(h.service.write_count(), writes);
    assert_eq!(ann.workspace.companions().len(), 1);
}

#[test]
fn concurrent_additions_from_two_devices_both_survive() {
    let mut h = Harness::new();
    let mut laptop = h.signed_in("laptop", "a@x.com", "Ann");
    let mut phone = h.client("phone");
    h.settle(&mut [&mut phone]);
    phone
        .workspace
        .sign_in("a@x.com", PASSWORD)
        .expect("accepted locally");
    h.settle(&mut [&mut laptop, &mut phone]);

    laptop.workspace.add_companion("u1", "One").expect("u1");
    phone.workspace.add_companion("u2", "Two").expect("u2");
    h.settle(&mut [&mut laptop, &mut phone]);

    let expected = [Companion::new("u1", "One"), Companion::new("u2", "Two")];
    assert_eq!(laptop.workspace.companions(), &expected);
    assert_eq!(phone.workspace.companions(), &expected);
}

#[test]
fn zero_companions_keeps_own_scope() {
    let mut h = Harness::new();
    let mut ann = h.signed_in("laptop", "a@x.com", "Ann");

    assert_eq!(
        ann.workspace.toggle_scope(),
        Err(ActionError::Validation(ValidationError::NoCompanions))
    );
    assert_eq!(ann.workspace.selector().scope(), Scope::Own);
    let shown = ann
        .workspace
        .notice(NoticeSlot::General)
        .cloned()
        .expect("general notice");
    assert_eq!(
        shown.text,
        "You don't have any companions set up to view their tasks."
    );
    assert_eq!(shown.ttl, Some(Duration::from_secs(3)));
    h.settle(&mut [&mut ann]);
}

#[test]
fn removing_the_viewed_companion_reverts_to_own_scope() {
    let mut h = Harness::new();
    let mut ann = h.signed_in("laptop", "a@x.com", "Ann");
    let me = uid(&ann);

    ann.workspace.add_companion("u1", "One").expect("u1");
    ann.workspace.add_companion("u2", "Two").expect("u2");
    h.settle(&mut [&mut ann]);

    ann.workspace.toggle_scope().expect("companion scope");
    h.settle(&mut [&mut ann]);
    assert_eq!(ann.workspace.selector().scope(), Scope::Companion);
    assert_eq!(ann.workspace.effective_identity(), Some("u1"));
    assert_eq!(
        ann.workspace.viewed_companion(),
        Some(&Companion::new("u1", "One"))
    );

    ann.workspace.remove_companion("u1").expect("listed");
    h.settle(&mut [&mut ann]);

    assert_eq!(ann.workspace.selector().scope(), Scope::Own);
    assert_eq!(ann.workspace.effective_identity(), Some(me.as_str()));
    assert_eq!(ann.workspace.companions(), &[Companion::new("u2", "Two")]);
    assert_eq!(
        notice(&ann, NoticeSlot::Settings).as_deref(),
        Some("Companion removed.")
    );
}
