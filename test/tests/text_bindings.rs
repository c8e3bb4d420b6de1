//! Tests for data (inner content) and attribute bindings.

use bindery_test::prelude::*;
use rstest::rstest;

#[test]
fn name_change_updates_the_text_once() {
    let model = Model::with_fields([("name", "Ann")]);
    let component = rendered(ComponentClass::new("<p>Hello {name}</p>"), &model);
    let tracker = ChangeTracker::new();
    component.bind("name", tracker.handler()).unwrap();
    assert_eq!(markup(&component), "<p>Hello Ann</p>");

    model.set("name", "Bob");
    assert_eq!(markup(&component), "<p>Hello Bob</p>");

    // same value again: no event, no delivery
    model.set("name", "Bob");
    assert_eq!(tracker.values(), [Value::from("Bob")]);
}

#[test]
fn one_time_placeholders_keep_their_first_value() {
    let model = Model::with_fields([("name", "Ann")]);
    let component = rendered(ComponentClass::new("<p>{:name} / {name}</p>"), &model);

    model.set("name", "Bob");
    assert_eq!(markup(&component), "<p>Ann / Bob</p>");
}

#[test]
fn missing_values_render_empty() {
    let model = Model::new();
    let component = rendered(ComponentClass::new("<p>[{missing.deep[3].field}]</p>"), &model);
    assert_eq!(markup(&component), "<p>[]</p>");
}

#[rstest]
#[case("<p>{name}</p>", "<em>Ann</em>", "<p><em>Ann</em></p>")]
#[case("<p>{@name}</p>", "<em>Ann</em>", "<p>&lt;em&gt;Ann&lt;/em&gt;</p>")]
#[case("<p>{%name}</p>", "a b&c", "<p>a%20b%26c</p>")]
#[case("<p>{!name}</p>", "", "<p>true</p>")]
fn placeholder_transforms(#[case] template: &str, #[case] value: &str, #[case] expected: &str) {
    let model = Model::with_fields([("name", value)]);
    let component = rendered(ComponentClass::new(template), &model);
    assert_eq!(markup(&component), expected);
}

#[test]
fn children_of_a_bound_element_are_replaced() {
    let model = Model::with_fields([("count", 2)]);
    let component = rendered(
        ComponentClass::new("<div>{count} items<span>{ignored}</span></div>"),
        &model,
    );
    assert_eq!(markup(&component), "<div>2 items</div>");
}

#[test]
fn attributes_follow_their_placeholders() {
    let model = Model::with_fields([("id", Value::from(7)), ("name", Value::from("Ann"))]);
    let component = rendered(
        ComponentClass::new(r#"<a href="/users/{id}" title="{name} ({id})">{name}</a>"#),
        &model,
    );
    let element = component.element().unwrap();
    assert_eq!(element.attribute("href").as_deref(), Some("/users/7"));
    assert_eq!(element.attribute("title").as_deref(), Some("Ann (7)"));
    assert!(!element.has_attribute("data-attribute-href"));

    model.set("id", 8);
    assert_eq!(element.attribute("href").as_deref(), Some("/users/8"));
    assert_eq!(element.attribute("title").as_deref(), Some("Ann (8)"));
}

#[test]
fn boolean_attributes_are_toggled_by_presence() {
    let model = Model::with_fields([("done", false)]);
    let component = rendered(
        ComponentClass::new(r#"<input type="checkbox" checked="{done}">"#),
        &model,
    );
    assert_eq!(markup(&component), r#"<input type="checkbox">"#);

    model.set("done", true);
    assert_eq!(markup(&component), r#"<input type="checkbox" checked="">"#);

    model.set("done", false);
    assert_eq!(markup(&component), r#"<input type="checkbox">"#);
}

#[test]
fn manual_bindings_are_deduplicated() {
    let model = Model::with_fields([("name", "Ann")]);
    let component = rendered(ComponentClass::new("<p>{name}</p>"), &model);
    let tracker = ChangeTracker::new();
    let before = component.registration_count();

    let first = component.bind("name", tracker.handler()).unwrap();
    let second = component.bind("name", tracker.handler()).unwrap();
    assert_eq!(first, second);
    assert_eq!(component.registration_count(), before + 1);
    assert_eq!(component.root_listener_count(), 1);

    model.set("name", "Bob");
    assert_eq!(tracker.count(), 1);

    assert!(component.unbind(first));
    assert!(!component.unbind(first));
    assert!(!component.is_bound(first));
    model.set("name", "Cy");
    assert_eq!(tracker.count(), 1);
    assert_eq!(markup(&component), "<p>Cy</p>");
}

#[test]
fn manual_bindings_reject_bad_paths() {
    let component = rendered(ComponentClass::new("<p></p>"), &Model::new());
    let result = component.bind("a..b", ChangeTracker::new().handler());
    assert!(matches!(
        result,
        Err(BindError::Grammar {
            kind: GrammarKind::Path,
            ..
        })
    ));
}
