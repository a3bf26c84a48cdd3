mod common;

use common::{notice, pick_date, uid, Harness};
use daybook_core::backend::{DocumentBackend, Fields};
use daybook_core::error::ValidationError;
use daybook_core::{ActionError, NoticeSlot};
use futures::executor::block_on;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn object(value: Value) -> Fields {
    value.as_object().cloned().expect("object literal")
}

#[test]
fn adding_years_keeps_the_list_sorted_and_unique() {
    let mut h = Harness::new();
    let mut ann = h.signed_in("laptop", "a@x.com", "Ann");

    ann.workspace.add_year(" 2030 ").expect("new year");
    ann.workspace.add_year("2024").expect("new year");
    h.settle(&mut [&mut ann]);
    assert_eq!(ann.workspace.years().years(), &[2024, 2026, 2027, 2028, 2030]);

    let writes = h.service.write_count();
    assert_eq!(
        ann.workspace.add_year("2027"),
        Err(ActionError::Validation(ValidationError::DuplicateYear(2027)))
    );
    assert_eq!(
        notice(&ann, NoticeSlot::Years).as_deref(),
        Some("Year 2027 already exists.")
    );
    assert_eq!(
        ann.workspace.add_year("twenty"),
        Err(ActionError::Validation(ValidationError::InvalidYear))
    );
    assert_eq!(
        ann.workspace.add_year("2201"),
        Err(ActionError::Validation(ValidationError::InvalidYear))
    );
    h.settle(&mut [&mut ann]);
    assert_eq!(h.service.write_count(), writes);
}

#[test]
fn deleting_a_year_waits_for_confirmation() {
    let mut h = Harness::new();
    let mut ann = h.signed_in("laptop", "a@x.com", "Ann");

    ann.confirm.answer(false);
    ann.workspace.delete_year(2028).expect("asks");
    h.settle(&mut [&mut ann]);
    assert!(ann.workspace.years().contains(2028));
    assert_eq!(
        ann.confirm.asked(),
        vec!["Are you sure you want to delete the year 2028? This action cannot be undone."]
    );

    pick_date(&mut ann, 2028, 0, 15);
    h.settle(&mut [&mut ann]);
    ann.confirm.answer(true);
    ann.workspace.delete_year(2028).expect("asks");
    h.settle(&mut [&mut ann]);

    assert_eq!(ann.workspace.years().years(), &[2026, 2027]);
    assert!(ann.workspace.selector().selection().is_empty());
}

#[test]
fn the_last_year_cannot_be_deleted() {
    let mut h = Harness::new();
    let mut ann = h.signed_in("laptop", "a@x.com", "Ann");
    let path = ann.workspace.paths().years(&uid(&ann));

    block_on(h.service.session("laptop").set_document(&path, object(json!({ "list": [2026] }))))
        .expect("direct write");
    h.settle(&mut [&mut ann]);
    assert_eq!(ann.workspace.years().years(), &[2026]);

    assert_eq!(
        ann.workspace.delete_year(2026),
        Err(ActionError::Validation(ValidationError::LastYear))
    );
    assert_eq!(
        notice(&ann, NoticeSlot::Years).as_deref(),
        Some("Cannot delete the last year. Add another year first.")
    );
    assert!(ann.confirm.asked().is_empty());
}

#[test]
fn malformed_year_document_is_replaced_with_defaults() {
    let mut h = Harness::new();
    let mut ann = h.signed_in("laptop", "a@x.com", "Ann");
    let path = ann.workspace.paths().years(&uid(&ann));

    block_on(h.service.session("laptop").set_document(&path, object(json!({ "list": "oops" }))))
        .expect("direct write");
    h.settle(&mut [&mut ann]);

    assert_eq!(
        Value::Object(h.service.document(&path).expect("years document")),
        json!({ "list": [2026, 2027, 2028] })
    );
    assert_eq!(ann.workspace.years().years(), &[2026, 2027, 2028]);
}

#[test]
fn listener_failure_falls_back_to_the_default_window() {
    let mut h = Harness::new();
    h.service.fail_watches(Some("quota exceeded"));
    let mut ann = h.signed_in("laptop", "a@x.com", "Ann");
    h.settle(&mut [&mut ann]);

    assert_eq!(ann.workspace.years().years(), &[2026, 2027, 2028]);
    assert!(!ann.workspace.years().is_loading());
    assert_eq!(
        notice(&ann, NoticeSlot::Years).as_deref(),
        Some("Failed to fetch years: quota exceeded")
    );
    assert_eq!(
        notice(&ann, NoticeSlot::Settings).as_deref(),
        Some("Could not load preferences.")
    );
}
