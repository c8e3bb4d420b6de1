//! Tests for subview bindings (`data-subview`).

use bindery_test::prelude::*;

#[test]
fn null_then_model_creates_exactly_one_child() {
    registry::register("subview-card", ComponentClass::new("<article>{title}</article>"));

    let model = Model::with_fields([("child", Value::Null)]);
    let component = rendered(
        ComponentClass::new(r#"<div><h1>Title</h1><section data-subview="{child}"></section></div>"#),
        &model,
    );
    assert!(component.subview("child").is_none());
    assert_eq!(markup(&component), "<div><h1>Title</h1><section></section></div>");

    model.set(
        "child",
        Model::with_fields([("view", "subview-card"), ("title", "Hello")]),
    );
    let child = component.subview("child").unwrap();
    assert_eq!(component.children().len(), 1);
    assert!(child.parent().unwrap().ptr_eq(&component));
    assert_eq!(
        markup(&component),
        "<div><h1>Title</h1><section><article>Hello</article></section></div>"
    );
}

#[test]
fn model_swaps_keep_the_child() {
    let model = Model::with_fields([("user", Value::Null)]);
    let component = rendered(
        ComponentClass::new(r#"<div data-subview="{user}:profile"><p>{name}</p></div>"#),
        &model,
    );
    // an inline template creates a child even for a null model
    let child = component.subview("profile").unwrap();
    assert_eq!(markup(&component), "<div><p></p></div>");

    let ann = Model::with_fields([("name", "Ann")]);
    model.set("user", ann.clone());
    assert!(component.subview("profile").unwrap().ptr_eq(&child));
    assert_eq!(markup(&component), "<div><p>Ann</p></div>");

    ann.set("name", "Bob");
    assert_eq!(markup(&component), "<div><p>Bob</p></div>");

    model.set("user", Model::with_fields([("name", "Cy")]));
    assert!(component.subview("profile").unwrap().ptr_eq(&child));
    assert_eq!(markup(&component), "<div><p>Cy</p></div>");
    ListenerAudit::new().model("ann", &ann).assert_clean();
}

#[test]
fn class_changes_replace_the_child() {
    registry::register("subview-short", ComponentClass::new("<b>{title}</b>"));
    registry::register("subview-long", ComponentClass::new("<em>{title}</em>"));

    let model = Model::with_fields([(
        "item",
        Model::with_fields([("view", "subview-short"), ("title", "a")]),
    )]);
    let component = rendered(
        ComponentClass::new(r#"<p data-subview="{item}"></p>"#),
        &model,
    );
    let first = component.subview("item").unwrap();
    assert_eq!(markup(&component), "<p><b>a</b></p>");

    model.set(
        "item",
        Model::with_fields([("view", "subview-long"), ("title", "b")]),
    );
    let second = component.subview("item").unwrap();
    assert!(!second.ptr_eq(&first));
    assert!(!first.is_rendered());
    assert!(first.parent().is_none());
    assert_eq!(markup(&component), "<p><em>b</em></p>");

    model.set("item", Value::Null);
    assert!(component.subview("item").is_none());
    assert_eq!(markup(&component), "<p></p>");
}

#[test]
fn nested_paths_drive_the_subview() {
    let inner = Model::with_fields([("name", "Ann")]);
    let model = Model::with_fields([(
        "team",
        Model::with_fields([("lead", inner.clone())]),
    )]);
    let component = rendered(
        ComponentClass::new(r#"<div data-subview="{team.lead}:lead"><span>{name}</span></div>"#),
        &model,
    );
    assert_eq!(markup(&component), "<div><span>Ann</span></div>");

    model.set(
        "team",
        Model::with_fields([("lead", Model::with_fields([("name", "Bob")]))]),
    );
    assert_eq!(markup(&component), "<div><span>Bob</span></div>");
    ListenerAudit::new().model("old lead", &inner).assert_clean();
}

#[test]
fn replacement_children_inherit_activation() {
    let tracker = LifecycleTracker::new();
    registry::register("subview-tracked", tracker.track(ComponentClass::new("<i>{n}</i>")));

    let model = Model::with_fields([(
        "item",
        Model::with_fields([("view", "subview-tracked"), ("n", "1")]),
    )]);
    let body = container();
    let component = mounted(
        ComponentClass::new(r#"<span data-subview="{item}"></span>"#),
        &model,
        body,
    );
    assert_eq!(tracker.activations(), 1);

    // same class: the child re-renders in place and is reactivated
    model.set(
        "item",
        Model::with_fields([("view", "subview-tracked"), ("n", "2")]),
    );
    assert_eq!(tracker.activations(), 2);
    assert_eq!(tracker.deactivations(), 1);
    assert!(component.subview("item").unwrap().is_active());
    assert_eq!(body.inner_markup(), "<span><i>2</i></span>");

    component.unload();
    assert_eq!(tracker.deactivations(), 2);
    assert!(body.children().is_empty());
}

#[test]
fn unknown_template_ids_fail_the_render() {
    let component = Component::new(
        ComponentClass::new(r#"<div data-subview="{x}" data-template="subview-nowhere"></div>"#),
        Model::new(),
    );
    assert!(matches!(
        component.render(),
        Err(BindError::UnresolvedReference { .. })
    ));
    assert!(!component.is_rendered());
    assert!(component.element().is_none());
}
