//! Testing utilities for bindery components.
//!
//! This crate provides small helpers for driving components in tests and
//! observing what they do: change recorders, lifecycle trackers and
//! listener accounting for models and collections.
//!
//! # Example
//!
//! ```rust
//! use bindery_test::prelude::*;
//!
//! let model = Model::with_fields([("name", "Ann")]);
//! let component = rendered(ComponentClass::new("<p>{name}</p>"), &model);
//!
//! let tracker = ChangeTracker::new();
//! component.bind("name", tracker.handler()).unwrap();
//!
//! model.set("name", "Bob");
//! assert_eq!(markup(&component), "<p>Bob</p>");
//! assert_eq!(tracker.values(), vec![Value::from("Bob")]);
//! ```

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use bindery::{BindingHandler, Collection, Component, ComponentClass, Model, NodeId, Value};

/// Prelude module for convenient imports in tests.
pub mod prelude {
    pub use super::{
        ChangeTracker, LifecycleTracker, ListenerAudit, container, init_tracing, markup,
        mounted, rendered,
    };
    pub use bindery::{
        BindError, BindingHandle, Collection, Component, ComponentClass, Config, GrammarKind,
        Model, NodeId, Value, registry,
    };
}

/// Install a `tracing` subscriber that honours `RUST_LOG`. Safe to call from
/// every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Create and render a component.
///
/// # Panics
///
/// Panics if the render fails.
pub fn rendered(class: impl Into<Rc<ComponentClass>>, model: &Model) -> Component {
    init_tracing();
    let component = Component::new(class, model.clone());
    if let Err(err) = component.render() {
        panic!("render failed: {err}");
    }
    component
}

/// Render a component, attach it to `parent` and activate it.
pub fn mounted(class: impl Into<Rc<ComponentClass>>, model: &Model, parent: NodeId) -> Component {
    let component = rendered(class, model);
    if let Some(element) = component.element() {
        parent.append_child(element);
    }
    component.activate();
    component
}

/// A detached `<body>` element to mount components into.
pub fn container() -> NodeId {
    NodeId::element("body")
}

/// The component's element as markup, or an empty string if it has none.
pub fn markup(component: &Component) -> String {
    component
        .element()
        .map(|element| element.outer_markup())
        .unwrap_or_default()
}

/// Records the values delivered to a binding handler.
///
/// The tracker hands out one shared handler, so binding it twice to the same
/// expression is deduplicated just like any other handler.
#[derive(Clone)]
pub struct ChangeTracker {
    values: Rc<RefCell<Vec<Value>>>,
    handler: BindingHandler,
}

impl Default for ChangeTracker {
    fn default() -> Self {
        let values = Rc::new(RefCell::new(Vec::new()));
        let sink = values.clone();
        Self {
            values,
            handler: Rc::new(move |value: &Value| sink.borrow_mut().push(value.clone())),
        }
    }
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The handler to bind.
    pub fn handler(&self) -> BindingHandler {
        self.handler.clone()
    }

    /// Returns the number of deliveries recorded.
    pub fn count(&self) -> usize {
        self.values.borrow().len()
    }

    /// Returns the delivered values in order.
    pub fn values(&self) -> Vec<Value> {
        self.values.borrow().clone()
    }

    pub fn last(&self) -> Option<Value> {
        self.values.borrow().last().cloned()
    }

    pub fn reset(&self) {
        self.values.borrow_mut().clear();
    }
}

/// Counts lifecycle hook invocations of a component class.
#[derive(Clone, Default)]
pub struct LifecycleTracker {
    activations: Rc<Cell<usize>>,
    deactivations: Rc<Cell<usize>>,
    size_updates: Rc<Cell<usize>>,
}

impl LifecycleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install counting hooks on `class`.
    pub fn track(&self, class: ComponentClass) -> ComponentClass {
        let activations = self.activations.clone();
        let deactivations = self.deactivations.clone();
        let size_updates = self.size_updates.clone();
        class
            .on_activate(move |_| activations.set(activations.get() + 1))
            .on_deactivate(move |_| deactivations.set(deactivations.get() + 1))
            .on_update_size(move |_| size_updates.set(size_updates.get() + 1))
    }

    pub fn activations(&self) -> usize {
        self.activations.get()
    }

    pub fn deactivations(&self) -> usize {
        self.deactivations.get()
    }

    pub fn size_updates(&self) -> usize {
        self.size_updates.get()
    }
}

/// Listener counts of a set of models and collections, to check that
/// teardown leaves nothing subscribed.
#[derive(Clone, Default)]
pub struct ListenerAudit {
    models: Vec<(String, Model)>,
    collections: Vec<(String, Collection)>,
}

impl ListenerAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(mut self, name: &str, model: &Model) -> Self {
        self.models.push((name.to_string(), model.clone()));
        self
    }

    pub fn collection(mut self, name: &str, collection: &Collection) -> Self {
        self.collections.push((name.to_string(), collection.clone()));
        self
    }

    /// Returns `(name, listener count)` for every audited object.
    pub fn counts(&self) -> Vec<(String, usize)> {
        let models = self
            .models
            .iter()
            .map(|(name, model)| (name.clone(), model.listener_count()));
        let collections = self
            .collections
            .iter()
            .map(|(name, collection)| (name.clone(), collection.listener_count()));
        models.chain(collections).collect()
    }

    /// Returns the sum of all listener counts.
    pub fn total(&self) -> usize {
        self.counts().iter().map(|(_, count)| count).sum()
    }

    /// Panics with the offending counts if anything is still subscribed.
    pub fn assert_clean(&self) {
        let dirty: Vec<_> = self
            .counts()
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .collect();
        assert!(dirty.is_empty(), "listeners left behind: {dirty:?}");
    }
}
