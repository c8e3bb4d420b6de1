//! Event emission for observable objects.
//!
//! Every [`Model`](crate::Model) and [`Collection`](crate::Collection) owns an
//! [`EventEmitter`]. Listeners are registered with [`EventEmitter::on`], which
//! returns a [`ListenerId`] that must be handed back to [`EventEmitter::off`] to
//! unsubscribe. Handlers are never compared by identity.

use std::{cell::RefCell, fmt, rc::Rc};

use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;

use crate::Value;

new_key_type! {
    /// Registration token returned by [`EventEmitter::on`].
    pub struct ListenerId;
}

/// The kind of notification a listener subscribes to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `change:<field>` on a model (or a synthetic field of a component).
    Change(Rc<str>),
    /// An item was inserted into a collection.
    Add,
    /// An item was removed from a collection.
    Remove,
    /// The contents of a collection were replaced wholesale.
    Reset,
}

impl EventKind {
    pub fn change(field: &str) -> Self {
        EventKind::Change(field.into())
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Change(field) => write!(f, "change:{field}"),
            EventKind::Add => f.write_str("add"),
            EventKind::Remove => f.write_str("remove"),
            EventKind::Reset => f.write_str("reset"),
        }
    }
}

/// A notification delivered to listeners.
#[derive(Clone, Debug)]
pub enum Event {
    Change { field: Rc<str>, value: Value },
    Add { item: Value, index: usize },
    Remove { item: Value, index: usize },
    Reset,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Change { field, .. } => EventKind::Change(field.clone()),
            Event::Add { .. } => EventKind::Add,
            Event::Remove { .. } => EventKind::Remove,
            Event::Reset => EventKind::Reset,
        }
    }

    /// The index carried by `add`/`remove` notifications.
    pub fn index(&self) -> Option<usize> {
        match self {
            Event::Add { index, .. } | Event::Remove { index, .. } => Some(*index),
            _ => None,
        }
    }
}

type Handler = Rc<dyn Fn(&Event)>;

/// A list of listeners keyed by [`ListenerId`].
#[derive(Default)]
pub struct EventEmitter {
    listeners: RefCell<SlotMap<ListenerId, (EventKind, Handler)>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `handler` to notifications of `kind`.
    pub fn on(&self, kind: EventKind, handler: impl Fn(&Event) + 'static) -> ListenerId {
        tracing::trace!(%kind, "listener attached");
        self.listeners
            .borrow_mut()
            .insert((kind, Rc::new(handler)))
    }

    /// Unsubscribe a listener. Returns `false` if it was already gone.
    pub fn off(&self, id: ListenerId) -> bool {
        let removed = self.listeners.borrow_mut().remove(id);
        if let Some((kind, _)) = &removed {
            tracing::trace!(%kind, "listener detached");
        }
        removed.is_some()
    }

    /// Drop every listener.
    pub fn off_all(&self) {
        self.listeners.borrow_mut().clear();
    }

    /// Deliver `event` to every listener of its kind.
    ///
    /// The listener list is snapshotted before delivery, and a listener removed by
    /// an earlier handler in the same delivery is skipped.
    pub fn emit(&self, event: &Event) {
        let kind = event.kind();
        let handlers: SmallVec<[(ListenerId, Handler); 4]> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(_, (k, _))| *k == kind)
            .map(|(id, (_, handler))| (id, handler.clone()))
            .collect();

        for (id, handler) in handlers {
            if !self.listeners.borrow().contains_key(id) {
                continue;
            }
            handler(event);
        }
    }

    pub fn contains(&self, id: ListenerId) -> bool {
        self.listeners.borrow().contains_key(id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn listener_count_for(&self, kind: &EventKind) -> usize {
        self.listeners
            .borrow()
            .values()
            .filter(|(k, _)| k == kind)
            .count()
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
