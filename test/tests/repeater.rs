//! Tests for repeater bindings (`data-source`).

use bindery_test::prelude::*;

fn row(title: &str) -> Model {
    Model::with_fields([("title", title)])
}

fn list_model(items: &Collection) -> Model {
    Model::with_fields([("items", Value::from(items.clone()))])
}

const LIST: &str = r#"<ul data-source="{items}"><li>{title}</li></ul>"#;

#[test]
fn removing_an_item_keeps_the_other_children() {
    let items = Collection::from_iter([row("a"), row("b"), row("c")]);
    let component = rendered(ComponentClass::new(LIST), &list_model(&items));
    assert_eq!(markup(&component), "<ul><li>a</li><li>b</li><li>c</li></ul>");

    let repeater = component.repeater("items").unwrap();
    let before = repeater.children();
    assert_eq!(before.len(), 3);

    items.remove_at(1);
    assert_eq!(markup(&component), "<ul><li>a</li><li>c</li></ul>");
    let after = repeater.children();
    assert_eq!(after.len(), 2);
    assert!(after[0].ptr_eq(&before[0]));
    assert!(after[1].ptr_eq(&before[2]));
    assert!(!before[1].is_rendered());
    assert!(before[1].parent().is_none());
    assert!(after[0].parent().unwrap().ptr_eq(&component));
}

#[test]
fn adds_land_at_their_index() {
    let items = Collection::from_iter([row("a"), row("c")]);
    let component = rendered(ComponentClass::new(LIST), &list_model(&items));

    items.insert(1, row("b"));
    items.push(row("d"));
    items.insert(0, row("0"));
    assert_eq!(
        markup(&component),
        "<ul><li>0</li><li>a</li><li>b</li><li>c</li><li>d</li></ul>"
    );
}

#[test]
fn children_stay_bound_to_their_items() {
    let first = row("a");
    let items = Collection::from_iter([first.clone()]);
    let component = rendered(ComponentClass::new(LIST), &list_model(&items));

    first.set("title", "A");
    assert_eq!(markup(&component), "<ul><li>A</li></ul>");
}

#[test]
fn reset_replaces_every_child() {
    let items = Collection::from_iter([row("a"), row("b")]);
    let component = rendered(ComponentClass::new(LIST), &list_model(&items));
    let old = component.repeater("items").unwrap().children();

    items.reset([Value::from(row("x")), Value::from(row("y")), Value::from(row("z"))]);
    assert_eq!(markup(&component), "<ul><li>x</li><li>y</li><li>z</li></ul>");
    assert!(old.iter().all(|child| !child.is_rendered()));
    assert_eq!(component.children().len(), 3);
}

#[test]
fn replacing_the_collection_rebuilds_from_scratch() {
    let items = Collection::from_iter([row("a")]);
    let model = list_model(&items);
    let component = rendered(ComponentClass::new(LIST), &model);
    let repeater = component.repeater("items").unwrap();
    assert!(repeater.is_observing());

    let replacement = Collection::from_iter([row("b"), row("c")]);
    model.set("items", replacement.clone());
    assert_eq!(markup(&component), "<ul><li>b</li><li>c</li></ul>");
    ListenerAudit::new().collection("old items", &items).assert_clean();

    // the old collection no longer drives the list
    items.push(row("ignored"));
    replacement.push(row("d"));
    assert_eq!(markup(&component), "<ul><li>b</li><li>c</li><li>d</li></ul>");

    model.set("items", Value::Null);
    assert_eq!(markup(&component), "<ul></ul>");
    assert!(!repeater.is_observing());
    ListenerAudit::new().collection("replacement", &replacement).assert_clean();
}

#[test]
fn plain_lists_are_rendered_once() {
    let model = Model::with_fields([(
        "items",
        Value::from(vec![Value::from(row("a")), Value::from(row("b"))]),
    )]);
    let component = rendered(ComponentClass::new(LIST), &model);
    assert_eq!(markup(&component), "<ul><li>a</li><li>b</li></ul>");
    assert!(!component.repeater("items").unwrap().is_observing());
}

#[test]
fn identifiers_name_the_repeater() {
    let items = Collection::from_iter([row("a")]);
    let component = rendered(
        ComponentClass::new(r#"<ol data-source="{items}:rows"><li>{title}</li></ol>"#),
        &list_model(&items),
    );
    assert!(component.repeater("items").is_none());
    assert_eq!(component.repeater("rows").unwrap().len(), 1);
}

#[test]
fn view_fields_pick_registered_classes() {
    registry::register("repeater-card", ComponentClass::new("<li class=\"card\">{title}</li>"));
    registry::register("repeater-note", ComponentClass::new("<li class=\"note\">{title}</li>"));

    let items = Collection::from_iter([
        Model::with_fields([("view", "repeater-card"), ("title", "a")]),
        Model::with_fields([("view", "repeater-note"), ("title", "b")]),
    ]);
    let component = rendered(
        ComponentClass::new(r#"<ul data-source="{items}"></ul>"#),
        &list_model(&items),
    );
    assert_eq!(
        markup(&component),
        r#"<ul><li class="card">a</li><li class="note">b</li></ul>"#
    );
}

#[test]
fn items_without_a_class_leave_empty_slots() {
    registry::register("repeater-slot", ComponentClass::new("<li>{title}</li>"));

    let items = Collection::from_iter([Model::with_fields([
        ("view", "repeater-slot"),
        ("title", "a"),
    ])]);
    let component = rendered(
        ComponentClass::new(r#"<ul data-source="{items}"></ul>"#),
        &list_model(&items),
    );
    let repeater = component.repeater("items").unwrap();

    // no `view` field and no inline template: nothing to create
    items.push(Value::from("plain"));
    // an unknown class is logged and leaves the slot empty
    items.push(Model::with_fields([("view", "repeater-missing"), ("title", "?")]));
    items.push(Model::with_fields([("view", "repeater-slot"), ("title", "c")]));
    assert_eq!(repeater.len(), 4);
    assert_eq!(markup(&component), "<ul><li>a</li><li>c</li></ul>");

    items.insert(2, Model::with_fields([("view", "repeater-slot"), ("title", "b")]));
    assert_eq!(markup(&component), "<ul><li>a</li><li>b</li><li>c</li></ul>");

    items.remove_at(1);
    items.remove_at(2);
    assert_eq!(markup(&component), "<ul><li>a</li><li>b</li><li>c</li></ul>");
    items.remove_at(2);
    assert_eq!(markup(&component), "<ul><li>a</li><li>b</li></ul>");
}

#[test]
fn children_follow_the_parent_activation() {
    let tracker = LifecycleTracker::new();
    registry::register("repeater-tracked", tracker.track(ComponentClass::new("<li>{title}</li>")));

    let items = Collection::from_iter([row("a"), row("b")]);
    let body = container();
    let component = mounted(
        ComponentClass::new(r#"<ul data-source="{items}" data-template="repeater-tracked"></ul>"#),
        &list_model(&items),
        body,
    );
    assert_eq!(tracker.activations(), 2);
    assert!(component.children().iter().all(Component::is_active));

    items.push(row("c"));
    assert_eq!(tracker.activations(), 3);
    assert_eq!(tracker.size_updates(), 1);

    items.remove_at(0);
    assert_eq!(tracker.deactivations(), 1);

    component.deactivate();
    assert_eq!(tracker.deactivations(), 3);
}

#[test]
fn unload_releases_the_collection() {
    let items = Collection::from_iter([row("a"), row("b")]);
    let model = list_model(&items);
    let component = rendered(ComponentClass::new(LIST), &model);
    let children = component.children();
    assert!(items.listener_count() > 0);

    component.unload();
    ListenerAudit::new()
        .model("model", &model)
        .collection("items", &items)
        .model("first row", &items.at(0).as_model().unwrap().clone())
        .assert_clean();
    assert!(children.iter().all(|child| !child.is_rendered()));
}
