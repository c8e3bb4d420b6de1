//! Tests for class and inline style bindings.

use bindery_test::prelude::*;
use rstest::rstest;

#[test]
fn active_class_follows_the_flag() {
    let model = Model::with_fields([("isActive", false)]);
    let component = rendered(
        ComponentClass::new(r#"<li data-class="active:{isActive}">item</li>"#),
        &model,
    );
    assert_eq!(markup(&component), "<li>item</li>");

    model.set("isActive", true);
    assert_eq!(markup(&component), r#"<li class="active">item</li>"#);

    model.set("isActive", false);
    assert_eq!(markup(&component), "<li>item</li>");
}

#[test]
fn bare_terms_apply_the_value_as_the_class() {
    let model = Model::with_fields([("theme", "dark")]);
    let component = rendered(
        ComponentClass::new(r#"<div class="card" data-class="{theme}"></div>"#),
        &model,
    );
    let element = component.element().unwrap();
    assert_eq!(element.classes(), ["card", "dark"]);

    model.set("theme", "light");
    assert_eq!(element.classes(), ["card", "light"]);

    model.set("theme", Value::Null);
    assert_eq!(element.classes(), ["card"]);
}

#[rstest]
#[case(true, false)]
#[case(false, true)]
fn negated_terms_invert_the_value(#[case] visible: bool, #[case] hidden: bool) {
    let model = Model::with_fields([("visible", visible)]);
    let component = rendered(
        ComponentClass::new(r#"<div data-class="hidden:{!visible}"></div>"#),
        &model,
    );
    assert_eq!(component.element().unwrap().has_class("hidden"), hidden);

    model.set("visible", !visible);
    assert_eq!(component.element().unwrap().has_class("hidden"), !hidden);
}

#[test]
fn several_terms_on_one_element_are_independent() {
    let model = Model::with_fields([
        ("selected", Value::from(true)),
        ("disabled", Value::from(false)),
    ]);
    let component = rendered(
        ComponentClass::new(r#"<li data-class="selected:{selected} disabled:{disabled}"></li>"#),
        &model,
    );
    let element = component.element().unwrap();
    assert_eq!(element.classes(), ["selected"]);

    model.set("disabled", true);
    model.set("selected", false);
    assert_eq!(element.classes(), ["disabled"]);
}

#[test]
fn style_properties_follow_their_values() {
    let model = Model::with_fields([
        ("width", Value::from(10)),
        ("opacity", Value::from(0.5)),
        ("color", Value::from("red")),
        ("bg", Value::from("#fff")),
    ]);
    let component = rendered(
        ComponentClass::new(
            r#"<div data-style="width:{width}; opacity:{opacity}; color: {color}; backgroundColor:{bg}"></div>"#,
        ),
        &model,
    );
    let element = component.element().unwrap();
    assert_eq!(element.style_property("width").as_deref(), Some("10px"));
    assert_eq!(element.style_property("opacity").as_deref(), Some("0.5"));
    assert_eq!(element.style_property("color").as_deref(), Some("red"));
    assert_eq!(element.style_property("background-color").as_deref(), Some("#fff"));

    model.set("width", "50%");
    model.set("color", Value::Null);
    assert_eq!(element.style_property("width").as_deref(), Some("50%"));
    assert_eq!(element.style_property("color"), None);
}

#[test]
fn one_time_style_terms_are_not_observed() {
    let model = Model::with_fields([("height", 20)]);
    let component = rendered(
        ComponentClass::new(r#"<div data-style="height:{:height}"></div>"#),
        &model,
    );
    assert_eq!(component.root_listener_count(), 0);

    model.set("height", 40);
    assert_eq!(
        component.element().unwrap().style_property("height").as_deref(),
        Some("20px")
    );
}

#[test]
fn model_style_field_adds_component_classes() {
    let model = Model::with_fields([("style", "compact")]);
    let component = rendered(ComponentClass::new(r#"<nav class="menu"></nav>"#), &model);
    assert_eq!(markup(&component), r#"<nav class="menu compact"></nav>"#);

    model.set("style", "wide striped");
    assert_eq!(markup(&component), r#"<nav class="menu wide striped"></nav>"#);
}
