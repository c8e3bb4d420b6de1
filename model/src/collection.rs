use std::{cell::RefCell, fmt, rc::Rc};

use crate::{
    Value,
    emitter::{Event, EventEmitter, EventKind, ListenerId},
    id::ObjectId,
    json::SerializeCx,
};

struct CollectionInner {
    id: ObjectId,
    items: RefCell<Vec<Value>>,
    events: EventEmitter,
}

/// An observable ordered sequence.
///
/// Mutations emit `add` and `remove` with the affected item and its index, or
/// `reset` when the whole contents are replaced.
#[derive(Clone)]
pub struct Collection(Rc<CollectionInner>);

impl Default for Collection {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Into<Value>> FromIterator<V> for Collection {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        let collection = Collection::new();
        collection
            .0
            .items
            .borrow_mut()
            .extend(iter.into_iter().map(Into::into));
        collection
    }
}

impl Collection {
    pub fn new() -> Self {
        Collection(Rc::new(CollectionInner {
            id: ObjectId::next(),
            items: RefCell::new(Vec::new()),
            events: EventEmitter::new(),
        }))
    }

    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    pub fn ptr_eq(&self, other: &Collection) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn len(&self) -> usize {
        self.0.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The item at `index`, or `Null` if out of range.
    pub fn at(&self, index: usize) -> Value {
        self.0.items.borrow().get(index).cloned().unwrap_or_default()
    }

    /// A snapshot of the current items.
    pub fn items(&self) -> Vec<Value> {
        self.0.items.borrow().clone()
    }

    pub fn index_of(&self, item: &Value) -> Option<usize> {
        self.0.items.borrow().iter().position(|v| v.same(item))
    }

    /// Append an item and emit `add`.
    pub fn push(&self, item: impl Into<Value>) {
        let index = self.len();
        self.insert(index, item);
    }

    /// Insert an item and emit `add`. An index past the end appends.
    pub fn insert(&self, index: usize, item: impl Into<Value>) {
        let item = item.into();
        let index = {
            let mut items = self.0.items.borrow_mut();
            let index = index.min(items.len());
            items.insert(index, item.clone());
            index
        };
        self.0.events.emit(&Event::Add { item, index });
    }

    /// Remove the item at `index` and emit `remove`.
    pub fn remove_at(&self, index: usize) -> Option<Value> {
        let item = {
            let mut items = self.0.items.borrow_mut();
            if index >= items.len() {
                return None;
            }
            items.remove(index)
        };
        self.0.events.emit(&Event::Remove {
            item: item.clone(),
            index,
        });
        Some(item)
    }

    /// Remove the first item identical to `item`.
    pub fn remove(&self, item: &Value) -> bool {
        match self.index_of(item) {
            Some(index) => self.remove_at(index).is_some(),
            None => false,
        }
    }

    /// Replace the whole contents and emit `reset`.
    pub fn reset(&self, items: impl IntoIterator<Item = Value>) {
        *self.0.items.borrow_mut() = items.into_iter().collect();
        self.0.events.emit(&Event::Reset);
    }

    pub fn on(&self, kind: EventKind, handler: impl Fn(&Event) + 'static) -> ListenerId {
        self.0.events.on(kind, handler)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.0.events.off(id)
    }

    pub fn events(&self) -> &EventEmitter {
        &self.0.events
    }

    pub fn listener_count(&self) -> usize {
        self.0.events.listener_count()
    }

    pub fn clone_deep(&self) -> Collection {
        self.items()
            .into_iter()
            .map(|v| match v {
                Value::Model(m) => Value::Model(m.clone_deep()),
                Value::Collection(c) => Value::Collection(c.clone_deep()),
                other => other,
            })
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Value {
        self.to_json_with(&mut SerializeCx::default())
    }

    pub fn to_json_with(&self, cx: &mut SerializeCx) -> serde_json::Value {
        if !cx.enter(self.id()) {
            return serde_json::Value::Null;
        }
        let items = self
            .items()
            .iter()
            .map(|v| v.to_json_with(cx))
            .collect();
        cx.exit(self.id());
        serde_json::Value::Array(items)
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("id", &self.id().as_u64())
            .field("len", &self.len())
            .finish()
    }
}
