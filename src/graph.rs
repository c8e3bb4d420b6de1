//! The change-propagation graph.
//!
//! Every bound path expression gets one root listener, shared by all handlers
//! bound to that expression. A root listener owns a chain of model listeners,
//! one per observable object the path passes through:
//!
//! ```text
//! user.friends[1].name
//!
//!   FieldNode(model, "user")
//!     └─ FieldNode(user, "friends")
//!          └─ CollectionNode(friends, [1])     add / remove / reset
//!               └─ FieldNode(friends[1], "name")
//! ```
//!
//! When any node fires, its subtree is torn down and rebuilt against the
//! objects now on the path, and only then is the root asked to re-resolve the
//! expression and notify its handlers. Plain maps and lists are immutable
//! values, so they are walked through without listeners.
//!
//! Roots whose first segment names a generated field listen to the
//! component's synthetic emitter instead of walking the model.

use std::{
    cell::{Cell, RefCell},
    rc::{Rc, Weak},
};

use bindery_model::{Collection, Event, EventEmitter, EventKind, ListenerId, Model, Value};
use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;

use crate::path::{Index, PathExpression, Segment};

new_key_type! {
    /// Registration token returned when a handler is bound to an expression.
    pub struct BindingHandle;
}

/// A change handler. Two registrations are the same binding when they share an
/// expression and the handler `Rc` is the same allocation.
pub type BindingHandler = Rc<dyn Fn(&Value)>;

pub(crate) type Resolver = Rc<dyn Fn(&PathExpression) -> Value>;

type Notify = Rc<dyn Fn()>;

/// Where a graph's roots get their notifications from.
pub(crate) struct GraphSources {
    pub(crate) model: Option<Model>,
    pub(crate) generated: Rc<EventEmitter>,
    pub(crate) is_generated: Rc<dyn Fn(&str) -> bool>,
    pub(crate) resolver: Resolver,
}

struct Registration {
    root: Rc<str>,
    handler: BindingHandler,
}

struct GraphInner {
    sources: GraphSources,
    registrations: RefCell<SlotMap<BindingHandle, Registration>>,
    roots: RefCell<FxHashMap<Rc<str>, Rc<RootListener>>>,
}

/// The listener graph of one component render.
#[derive(Clone)]
pub(crate) struct BindingGraph {
    inner: Rc<GraphInner>,
}

impl BindingGraph {
    pub(crate) fn new(sources: GraphSources) -> Self {
        Self {
            inner: Rc::new(GraphInner {
                sources,
                registrations: Default::default(),
                roots: Default::default(),
            }),
        }
    }

    /// Bind `handler` to `expression`, returning the registration and the
    /// current value.
    ///
    /// Binding the same handler to the same expression again returns the
    /// existing registration.
    pub(crate) fn activate(
        &self,
        expression: &PathExpression,
        handler: BindingHandler,
    ) -> (BindingHandle, Value) {
        let key = expression.source();
        let existing = self.inner.roots.borrow().get(&key).cloned();

        if let Some(root) = &existing {
            let registrations = self.inner.registrations.borrow();
            let duplicate = root.handles.borrow().iter().copied().find(|handle| {
                registrations
                    .get(*handle)
                    .is_some_and(|r| Rc::ptr_eq(&r.handler, &handler))
            });
            if let Some(handle) = duplicate {
                drop(registrations);
                return (handle, self.resolve(expression));
            }
        }

        let root = match existing {
            Some(root) => root,
            None => {
                let root = RootListener::attach(&self.inner, expression.clone());
                self.inner.roots.borrow_mut().insert(key.clone(), root.clone());
                root
            }
        };

        let handle = self
            .inner
            .registrations
            .borrow_mut()
            .insert(Registration { root: key, handler });
        root.handles.borrow_mut().push(handle);
        tracing::trace!(expression = %expression, "binding activated");

        (handle, self.resolve(expression))
    }

    /// Remove a registration. The root listener goes away with its last
    /// handler. Returns `false` for unknown handles.
    pub(crate) fn deactivate(&self, handle: BindingHandle) -> bool {
        let Some(registration) = self.inner.registrations.borrow_mut().remove(handle) else {
            return false;
        };
        let root = self.inner.roots.borrow().get(&registration.root).cloned();
        if let Some(root) = root {
            let now_empty = {
                let mut handles = root.handles.borrow_mut();
                handles.retain(|h| *h != handle);
                handles.is_empty()
            };
            if now_empty {
                self.inner.roots.borrow_mut().remove(&registration.root);
                root.detach();
                tracing::trace!(expression = %root.expression, "root listener removed");
            }
        }
        true
    }

    /// Drop every registration and detach every listener.
    pub(crate) fn clear(&self) {
        let roots: Vec<_> = self.inner.roots.borrow_mut().drain().map(|(_, r)| r).collect();
        self.inner.registrations.borrow_mut().clear();
        for root in roots {
            root.detach();
        }
    }

    pub(crate) fn contains(&self, handle: BindingHandle) -> bool {
        self.inner.registrations.borrow().contains_key(handle)
    }

    pub(crate) fn root_count(&self) -> usize {
        self.inner.roots.borrow().len()
    }

    pub(crate) fn registration_count(&self) -> usize {
        self.inner.registrations.borrow().len()
    }

    fn resolve(&self, expression: &PathExpression) -> Value {
        (self.inner.sources.resolver)(expression)
    }
}

enum RootSource {
    Model(Rc<FieldNode>),
    Generated {
        emitter: Rc<EventEmitter>,
        listener: ListenerId,
    },
}

struct RootListener {
    expression: PathExpression,
    wildcard: bool,
    graph: Weak<GraphInner>,
    last_value: RefCell<Value>,
    handles: RefCell<SmallVec<[BindingHandle; 2]>>,
    source: RefCell<Option<RootSource>>,
}

impl RootListener {
    fn attach(graph: &Rc<GraphInner>, expression: PathExpression) -> Rc<Self> {
        let root = Rc::new(RootListener {
            wildcard: expression.is_wildcard(),
            last_value: RefCell::new((graph.sources.resolver)(&expression)),
            expression,
            graph: Rc::downgrade(graph),
            handles: Default::default(),
            source: Default::default(),
        });

        let weak = Rc::downgrade(&root);
        let notify: Notify = Rc::new(move || {
            if let Some(root) = weak.upgrade() {
                root.notify();
            }
        });

        let root_field = root.expression.root_field();
        let source = if (graph.sources.is_generated)(root_field) {
            let emitter = graph.sources.generated.clone();
            let listener = emitter.on(EventKind::change(root_field), move |_| notify());
            Some(RootSource::Generated { emitter, listener })
        } else {
            graph.sources.model.as_ref().map(|model| {
                RootSource::Model(FieldNode::attach(
                    root.expression.shared_segments(),
                    0,
                    model.clone(),
                    notify,
                ))
            })
        };
        *root.source.borrow_mut() = source;
        root
    }

    fn detach(&self) {
        match self.source.borrow_mut().take() {
            Some(RootSource::Model(node)) => node.detach(),
            Some(RootSource::Generated { emitter, listener }) => {
                emitter.off(listener);
            }
            None => {}
        }
    }

    fn notify(&self) {
        let Some(graph) = self.graph.upgrade() else {
            return;
        };
        let value = (graph.sources.resolver)(&self.expression);
        if !self.wildcard {
            if self.last_value.borrow().same(&value) {
                return;
            }
            *self.last_value.borrow_mut() = value.clone();
        }

        let handlers: SmallVec<[(BindingHandle, BindingHandler); 2]> = {
            let registrations = graph.registrations.borrow();
            self.handles
                .borrow()
                .iter()
                .filter_map(|h| registrations.get(*h).map(|r| (*h, r.handler.clone())))
                .collect()
        };
        tracing::trace!(expression = %self.expression, handlers = handlers.len(), "propagating change");

        for (handle, handler) in handlers {
            // an earlier handler may have unbound this one
            if !graph.registrations.borrow().contains_key(handle) {
                continue;
            }
            handler(&value);
        }
    }
}

enum ChildNode {
    Field(Rc<FieldNode>),
    Collection(Rc<CollectionNode>),
}

impl ChildNode {
    fn detach(&self) {
        match self {
            ChildNode::Field(node) => node.detach(),
            ChildNode::Collection(node) => node.detach(),
        }
    }
}

/// Listens to `change:<field>` on one model for segment `position`.
struct FieldNode {
    segments: Rc<[Segment]>,
    position: usize,
    model: Model,
    listener: Cell<Option<ListenerId>>,
    child: RefCell<Option<ChildNode>>,
    notify: Notify,
}

impl FieldNode {
    fn attach(segments: Rc<[Segment]>, position: usize, model: Model, notify: Notify) -> Rc<Self> {
        let node = Rc::new(FieldNode {
            segments,
            position,
            model,
            listener: Cell::new(None),
            child: RefCell::new(None),
            notify,
        });

        let weak = Rc::downgrade(&node);
        let field = &node.segments[position].field;
        let listener = node.model.on(EventKind::change(field), move |_| {
            if let Some(node) = weak.upgrade() {
                node.changed();
            }
        });
        node.listener.set(Some(listener));
        let child = node.build_child();
        *node.child.borrow_mut() = child;
        node
    }

    fn build_child(&self) -> Option<ChildNode> {
        let segment = &self.segments[self.position];
        let value = self.model.get(&segment.field);
        after_field(&self.segments, self.position, value, &self.notify)
    }

    fn changed(&self) {
        let stale = self.child.borrow_mut().take();
        if let Some(stale) = stale {
            stale.detach();
        }
        let fresh = self.build_child();
        *self.child.borrow_mut() = fresh;
        (self.notify)();
    }

    fn detach(&self) {
        if let Some(listener) = self.listener.take() {
            self.model.off(listener);
        }
        let child = self.child.borrow_mut().take();
        if let Some(child) = child {
            child.detach();
        }
    }
}

/// Listens to membership changes of the collection read by segment
/// `position`, tracking the item at its index if it has one.
struct CollectionNode {
    segments: Rc<[Segment]>,
    position: usize,
    collection: Collection,
    index: Option<usize>,
    listeners: RefCell<SmallVec<[ListenerId; 3]>>,
    tracked: RefCell<Value>,
    child: RefCell<Option<ChildNode>>,
    notify: Notify,
}

impl CollectionNode {
    fn attach(
        segments: Rc<[Segment]>,
        position: usize,
        collection: Collection,
        notify: Notify,
    ) -> Rc<Self> {
        let index = match segments[position].index {
            Some(Index::At(index)) => Some(index),
            _ => None,
        };
        let tracked = index.map_or(Value::Null, |i| collection.at(i));
        let node = Rc::new(CollectionNode {
            segments,
            position,
            collection,
            index,
            listeners: Default::default(),
            tracked: RefCell::new(tracked.clone()),
            child: RefCell::new(None),
            notify,
        });

        let listeners: SmallVec<[ListenerId; 3]> = [EventKind::Add, EventKind::Remove, EventKind::Reset]
            .into_iter()
            .map(|kind| {
                let weak = Rc::downgrade(&node);
                node.collection.on(kind, move |_: &Event| {
                    if let Some(node) = weak.upgrade() {
                        node.changed();
                    }
                })
            })
            .collect();
        *node.listeners.borrow_mut() = listeners;

        if index.is_some() {
            let child = descend(&node.segments, node.position + 1, tracked, &node.notify);
            *node.child.borrow_mut() = child;
        }
        node
    }

    fn changed(&self) {
        if let Some(index) = self.index {
            let item = self.collection.at(index);
            if item.same(&self.tracked.borrow()) {
                return;
            }
            let stale = self.child.borrow_mut().take();
            if let Some(stale) = stale {
                stale.detach();
            }
            *self.tracked.borrow_mut() = item.clone();
            let fresh = descend(&self.segments, self.position + 1, item, &self.notify);
            *self.child.borrow_mut() = fresh;
        }
        (self.notify)();
    }

    fn detach(&self) {
        for listener in self.listeners.borrow_mut().drain(..) {
            self.collection.off(listener);
        }
        let child = self.child.borrow_mut().take();
        if let Some(child) = child {
            child.detach();
        }
    }
}

/// Build the listeners for what follows the field read by segment `position`.
fn after_field(
    segments: &Rc<[Segment]>,
    position: usize,
    value: Value,
    notify: &Notify,
) -> Option<ChildNode> {
    let segment = &segments[position];
    match (&segment.index, value) {
        (Some(_), Value::Collection(collection)) => Some(ChildNode::Collection(
            CollectionNode::attach(segments.clone(), position, collection, notify.clone()),
        )),
        (_, value) => descend(segments, position + 1, segment.index_into(value), notify),
    }
}

/// Build the listeners for segment `position` onwards, applied to `value`.
/// Plain maps are walked through statically until an observable object or the
/// end of the path is reached.
fn descend(
    segments: &Rc<[Segment]>,
    mut position: usize,
    mut value: Value,
    notify: &Notify,
) -> Option<ChildNode> {
    while position < segments.len() {
        match value {
            Value::Model(model) => {
                return Some(ChildNode::Field(FieldNode::attach(
                    segments.clone(),
                    position,
                    model,
                    notify.clone(),
                )));
            }
            Value::Map(_) => {
                let segment = &segments[position];
                let field_value = value.field(&segment.field);
                if segment.index.is_some()
                    && let Value::Collection(collection) = field_value
                {
                    return Some(ChildNode::Collection(CollectionNode::attach(
                        segments.clone(),
                        position,
                        collection,
                        notify.clone(),
                    )));
                }
                value = segment.index_into(field_value);
                position += 1;
            }
            _ => return None,
        }
    }
    None
}
