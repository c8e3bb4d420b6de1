//! Tests for the render / activate / unload lifecycle.

use bindery_test::prelude::*;

#[test]
fn rerender_keeps_the_document_position() {
    let tracker = LifecycleTracker::new();
    let model = Model::with_fields([("name", "Ann")]);
    let body = container();
    body.append_child(NodeId::element("header"));
    let component = rendered(tracker.track(ComponentClass::new("<p>{name}</p>")), &model);
    body.append_child(component.element().unwrap());
    body.append_child(NodeId::element("footer"));
    component.activate();

    let old = component.element().unwrap();
    component.render().unwrap();

    assert!(!old.is_valid());
    assert_eq!(body.inner_markup(), "<header></header><p>Ann</p><footer></footer>");
    assert!(component.is_active());
    assert_eq!(tracker.activations(), 2);
    assert_eq!(tracker.deactivations(), 1);
    assert_eq!(tracker.size_updates(), 1);

    model.set("name", "Bob");
    assert_eq!(body.inner_markup(), "<header></header><p>Bob</p><footer></footer>");
}

#[test]
fn rerender_picks_up_a_new_model() {
    let first = Model::with_fields([("name", "Ann")]);
    let second = Model::with_fields([("name", "Bob")]);
    let component = rendered(ComponentClass::new("<p>{name}</p>"), &first);

    component.set_model(second.clone());
    // bindings follow the rendered model until the next render
    first.set("name", "Ann 2");
    assert_eq!(markup(&component), "<p>Ann 2</p>");

    component.render().unwrap();
    assert_eq!(markup(&component), "<p>Bob</p>");
    ListenerAudit::new().model("first", &first).assert_clean();
    assert!(second.listener_count() > 0);
}

#[test]
fn unload_and_render_round_trip() {
    let model = Model::with_fields([("name", "Ann"), ("flag", "x")]);
    let component = rendered(
        ComponentClass::new(r#"<p data-class="on:{flag}">{name}</p>"#),
        &model,
    );
    assert_eq!(component.root_listener_count(), 2);

    component.unload();
    assert!(!component.is_rendered());
    assert!(component.element().is_none());
    assert_eq!(component.root_listener_count(), 0);
    ListenerAudit::new().model("model", &model).assert_clean();

    // a second unload has nothing left to do
    component.unload();
    assert!(!component.is_rendered());

    component.render().unwrap();
    model.set("name", "Bob");
    assert_eq!(markup(&component), r#"<p class="on">Bob</p>"#);
}

#[test]
fn unload_releases_replaced_intermediates() {
    let old_address = Model::with_fields([("city", "Oslo")]);
    let old_user = Model::with_fields([("address", old_address.clone())]);
    let model = Model::with_fields([("user", old_user.clone())]);
    let component = rendered(ComponentClass::new("<p>{user.address.city}</p>"), &model);
    assert_eq!(old_address.listener_count(), 1);

    model.set(
        "user",
        Model::with_fields([("address", Model::with_fields([("city", "Rome")]))]),
    );
    assert_eq!(markup(&component), "<p>Rome</p>");
    ListenerAudit::new()
        .model("old user", &old_user)
        .model("old address", &old_address)
        .assert_clean();

    old_address.set("city", "ignored");
    assert_eq!(markup(&component), "<p>Rome</p>");
}

#[test]
fn remove_detaches_the_component() {
    let tracker = LifecycleTracker::new();
    let model = Model::with_fields([("name", "Ann")]);
    let body = container();
    let component = mounted(tracker.track(ComponentClass::new("<p>{name}</p>")), &model, body);
    assert_eq!(body.children().len(), 1);

    component.remove();
    assert!(body.children().is_empty());
    assert!(!component.is_active());
    assert!(!component.is_rendered());
    assert!(component.parent().is_none());
    assert_eq!(tracker.deactivations(), 1);
    ListenerAudit::new().model("model", &model).assert_clean();
}

#[test]
fn activation_is_idempotent() {
    let tracker = LifecycleTracker::new();
    let component = rendered(tracker.track(ComponentClass::new("<p></p>")), &Model::new());

    component.activate();
    component.activate();
    assert_eq!(tracker.activations(), 1);

    component.update_size();
    component.deactivate();
    component.deactivate();
    assert_eq!(tracker.size_updates(), 1);
    assert_eq!(tracker.deactivations(), 1);
}

#[test]
fn non_model_values_are_rejected() {
    let component = Component::new(ComponentClass::new("<p></p>"), 5);
    assert!(matches!(component.render(), Err(BindError::MissingModel)));
    assert!(!component.is_rendered());
}

#[test]
fn malformed_class_bindings_fail_the_render() {
    let component = Component::new(
        ComponentClass::new(r#"<div><span data-class="oops"></span></div>"#),
        Model::new(),
    );
    let err = component.render().unwrap_err();
    assert!(matches!(
        err,
        BindError::Grammar {
            kind: GrammarKind::Class,
            ..
        }
    ));
    assert_eq!(err.to_string(), r#"invalid class binding: "oops""#);
    assert!(!component.is_rendered());
}

#[test]
fn unknown_repeater_templates_fail_the_render() {
    let model = Model::with_fields([("items", Collection::new())]);
    let component = Component::new(
        ComponentClass::new(r#"<ul data-source="{items}" data-template="lifecycle-nowhere"></ul>"#),
        model.clone(),
    );
    let err = component.render().unwrap_err();
    assert!(matches!(err, BindError::UnresolvedReference { ref id } if id == "lifecycle-nowhere"));
    ListenerAudit::new().model("model", &model).assert_clean();
}

#[test]
fn empty_templates_render_nothing() {
    let component = rendered(ComponentClass::new(""), &Model::new());
    assert!(component.is_rendered());
    assert!(component.element().is_none());
    assert!(component.bind("name", ChangeTracker::new().handler()).is_ok());
}
