//! A container holding one child component per item of a collection.
//!
//! Children live in slots that mirror the collection index for index. An item
//! without a usable class gets an empty slot, so indices carried by later
//! `add`/`remove` notifications still line up. A child's position in the
//! document is the number of realized slots before it.

use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use bindery_dom::NodeId;
use bindery_model::{Collection, Event, EventKind, ListenerId, Value};
use smallvec::SmallVec;

use crate::{
    component::{Component, ComponentClass},
    error::Result,
    path::PathExpression,
    policy::{BindingKind, BindingPolicy, Handles},
    subview::{class_for, destroy_child, mount_child, spawn_child},
};

struct Source {
    collection: Collection,
    listeners: SmallVec<[ListenerId; 3]>,
}

pub struct RepeaterBinding {
    this: Weak<RepeaterBinding>,
    container: NodeId,
    path: PathExpression,
    identifier: Rc<str>,
    class: Option<Rc<ComponentClass>>,
    slots: RefCell<Vec<Option<Component>>>,
    source: RefCell<Option<Source>>,
    handles: Handles,
}

impl RepeaterBinding {
    pub(crate) fn new(
        container: NodeId,
        path: PathExpression,
        identifier: Rc<str>,
        class: Option<Rc<ComponentClass>>,
    ) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            container,
            path,
            identifier,
            class,
            slots: RefCell::new(Vec::new()),
            source: RefCell::new(None),
            handles: Handles::default(),
        })
    }

    pub fn path(&self) -> &PathExpression {
        &self.path
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The realized children, in collection order.
    pub fn children(&self) -> Vec<Component> {
        self.slots.borrow().iter().flatten().cloned().collect()
    }

    /// The number of slots, realized or not.
    pub fn len(&self) -> usize {
        self.slots.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.borrow().is_empty()
    }

    /// Whether a live collection is being followed.
    pub fn is_observing(&self) -> bool {
        self.source.borrow().is_some()
    }

    /// Tear everything down and build it again from the current value of the
    /// source expression.
    fn rebuild(&self, component: &Component) -> Result<()> {
        self.clear(component);
        self.release_source();

        let items = match component.resolve(&self.path) {
            Value::Collection(collection) => {
                self.observe(component, &collection);
                collection.items()
            }
            Value::List(items) => items.to_vec(),
            _ => Vec::new(),
        };
        tracing::debug!(repeater = %self.identifier, items = items.len(), "populating repeater");
        for (index, item) in items.into_iter().enumerate() {
            self.insert(component, index, item)?;
        }
        Ok(())
    }

    fn observe(&self, component: &Component, collection: &Collection) {
        let listeners = [EventKind::Add, EventKind::Remove, EventKind::Reset]
            .into_iter()
            .map(|kind| {
                let this = self.this.clone();
                let owner = component.downgrade();
                collection.on(kind, move |event| {
                    let (Some(this), Some(component)) = (this.upgrade(), owner.upgrade()) else {
                        return;
                    };
                    if let Err(err) = this.collection_changed(&component, event) {
                        tracing::error!(repeater = %this.identifier, %err, "failed to update repeater");
                    }
                })
            })
            .collect();
        *self.source.borrow_mut() = Some(Source {
            collection: collection.clone(),
            listeners,
        });
    }

    pub(crate) fn release_source(&self) {
        let source = self.source.borrow_mut().take();
        if let Some(source) = source {
            for listener in source.listeners {
                source.collection.off(listener);
            }
        }
    }

    fn collection_changed(&self, component: &Component, event: &Event) -> Result<()> {
        match event {
            Event::Add { item, index } => self.insert(component, *index, item.clone()),
            Event::Remove { index, .. } => {
                self.remove(component, *index);
                Ok(())
            }
            Event::Reset => {
                self.clear(component);
                let items = self
                    .source
                    .borrow()
                    .as_ref()
                    .map(|s| s.collection.items())
                    .unwrap_or_default();
                let mut result = Ok(());
                for (index, item) in items.into_iter().enumerate() {
                    // keep filling the remaining slots after a failure
                    if let Err(err) = self.insert(component, index, item) {
                        result = Err(err);
                    }
                }
                result
            }
            Event::Change { .. } => Ok(()),
        }
    }

    /// Insert a slot for `item` at `index`. An index past the end appends.
    ///
    /// If the child cannot be created the slot is still inserted, empty, and
    /// the error is returned.
    fn insert(&self, component: &Component, index: usize, item: Value) -> Result<()> {
        let (index, position) = {
            let slots = self.slots.borrow();
            let index = index.min(slots.len());
            let position = slots[..index]
                .iter()
                .flatten()
                .filter(|child| child.element().is_some())
                .count();
            (index, position)
        };

        let (child, outcome) = match class_for(&item, self.class.as_ref())
            .and_then(|class| class.map(|class| spawn_child(component, class, item)).transpose())
        {
            Ok(child) => (child, Ok(())),
            Err(err) => (None, Err(err)),
        };

        if let Some(element) = child.as_ref().and_then(Component::element) {
            self.container.insert_element_child(position, element);
        }
        self.slots.borrow_mut().insert(index, child.clone());
        if let Some(child) = &child {
            mount_child(component, child);
        }
        outcome
    }

    fn remove(&self, component: &Component, index: usize) {
        let slot = {
            let mut slots = self.slots.borrow_mut();
            if index >= slots.len() {
                return;
            }
            slots.remove(index)
        };
        if let Some(child) = slot {
            destroy_child(component, &child);
        }
    }

    /// Remove every slot, last first.
    fn clear(&self, component: &Component) {
        loop {
            let slot = self.slots.borrow_mut().pop();
            match slot {
                Some(Some(child)) => destroy_child(component, &child),
                Some(None) => {}
                None => break,
            }
        }
    }
}

impl BindingPolicy for RepeaterBinding {
    fn kind(&self) -> BindingKind {
        BindingKind::Repeater
    }

    fn element(&self) -> NodeId {
        self.container
    }

    fn activate(self: Rc<Self>, component: &Component) -> Result<()> {
        self.handles
            .listen(&self, component, std::slice::from_ref(&self.path));
        self.rebuild(component)
    }

    fn apply(&self, component: &Component) -> Result<()> {
        self.rebuild(component)
    }

    fn deactivate(&self, component: &Component) {
        self.handles.release(component);
        self.clear(component);
        self.release_source();
    }
}
