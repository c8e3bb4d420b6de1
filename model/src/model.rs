use std::{cell::RefCell, fmt, rc::Rc};

use indexmap::IndexMap;

use crate::{
    Value,
    emitter::{Event, EventEmitter, EventKind, ListenerId},
    id::ObjectId,
    json::SerializeCx,
};

struct ModelInner {
    id: ObjectId,
    fields: RefCell<IndexMap<Rc<str>, Value>>,
    events: EventEmitter,
}

/// An observable key/value object.
///
/// `Model` is a cheap `Rc` handle; clones refer to the same object. Setting a
/// field to a value that differs from the current one emits `change:<field>`
/// synchronously, after the new value has been stored.
#[derive(Clone)]
pub struct Model(Rc<ModelInner>);

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Model {
    pub fn new() -> Self {
        Model(Rc::new(ModelInner {
            id: ObjectId::next(),
            fields: RefCell::new(IndexMap::new()),
            events: EventEmitter::new(),
        }))
    }

    /// Create a model with initial fields. No events are emitted.
    pub fn with_fields<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        let model = Model::new();
        {
            let mut map = model.0.fields.borrow_mut();
            for (k, v) in fields {
                map.insert(k.as_ref().into(), v.into());
            }
        }
        model
    }

    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    pub fn ptr_eq(&self, other: &Model) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// The value of a single field. Missing fields read as `Null`.
    pub fn get(&self, field: &str) -> Value {
        self.0.fields.borrow().get(field).cloned().unwrap_or_default()
    }

    /// Whether the field is present and not `Null`.
    pub fn has(&self, field: &str) -> bool {
        self.0
            .fields
            .borrow()
            .get(field)
            .is_some_and(|v| !v.is_null())
    }

    /// Assign a field and emit `change:<field>` if the value changed.
    ///
    /// Returns whether a change was emitted.
    pub fn set(&self, field: &str, value: impl Into<Value>) -> bool {
        let value = value.into();
        let field: Rc<str> = field.into();
        {
            let mut fields = self.0.fields.borrow_mut();
            match fields.get(&*field) {
                Some(current) if *current == value => return false,
                None if value.is_null() => return false,
                _ => {}
            }
            fields.insert(field.clone(), value.clone());
        }
        tracing::trace!(model = self.id().as_u64(), %field, "field changed");
        self.0.events.emit(&Event::Change { field, value });
        true
    }

    /// Remove a field, emitting a change to `Null` if it was set.
    pub fn unset(&self, field: &str) -> bool {
        let removed = self.0.fields.borrow_mut().shift_remove(field);
        match removed {
            Some(previous) if !previous.is_null() => {
                self.0.events.emit(&Event::Change {
                    field: field.into(),
                    value: Value::Null,
                });
                true
            }
            _ => false,
        }
    }

    pub fn field_names(&self) -> Vec<Rc<str>> {
        self.0.fields.borrow().keys().cloned().collect()
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

    /// Number of listeners currently attached, across all event kinds.
    pub fn listener_count(&self) -> usize {
        self.0.events.listener_count()
    }

    /// A copy of this model in which nested models and collections are copied
    /// too. Listeners are not copied.
    pub fn clone_deep(&self) -> Model {
        let fields: Vec<(Rc<str>, Value)> = self
            .0
            .fields
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let copy = Model::new();
        {
            let mut map = copy.0.fields.borrow_mut();
            for (k, v) in fields {
                let v = match v {
                    Value::Model(m) => Value::Model(m.clone_deep()),
                    Value::Collection(c) => Value::Collection(c.clone_deep()),
                    other => other,
                };
                map.insert(k, v);
            }
        }
        copy
    }

    pub fn to_json(&self) -> serde_json::Value {
        self.to_json_with(&mut SerializeCx::default())
    }

    /// Serialize this model, with nested models and collections inlined.
    ///
    /// A model that is already being serialized further up the stack renders as
    /// `null`.
    pub fn to_json_with(&self, cx: &mut SerializeCx) -> serde_json::Value {
        if !cx.enter(self.id()) {
            return serde_json::Value::Null;
        }
        let fields: Vec<(Rc<str>, Value)> = self
            .0
            .fields
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let object = fields
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_json_with(cx)))
            .collect();
        cx.exit(self.id());
        serde_json::Value::Object(object)
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("id", &self.id().as_u64())
            .field("fields", &self.field_names())
            .finish()
    }
}
