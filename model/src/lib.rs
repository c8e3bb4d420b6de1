//! # bindery_model
//!
//! Observable models and collections: the storage primitive the bindery binding
//! engine subscribes to.
//!
//! A [`Model`] is a key/value object that emits `change:<field>` whenever a field
//! is assigned a different value. A [`Collection`] is an ordered sequence that
//! emits `add`, `remove` and `reset`. Both are cheap `Rc` handles and are meant
//! to be used from a single thread.
//!
//! ```rust
//! use bindery_model::{Collection, EventKind, Model, Value};
//!
//! let todos = Collection::from_iter([Model::with_fields([("title", "Write docs")])]);
//! let app = Model::with_fields([("todos", Value::from(todos.clone()))]);
//!
//! let id = todos.on(EventKind::Add, |event| println!("added at {:?}", event.index()));
//! todos.push(Model::with_fields([("title", "Ship it")]));
//! todos.off(id);
//!
//! assert_eq!(app.get("todos").as_collection().map(|c| c.len()), Some(2));
//! ```

mod collection;
mod emitter;
mod id;
mod json;
mod model;
mod value;

pub use collection::Collection;
pub use emitter::{Event, EventEmitter, EventKind, ListenerId};
pub use id::ObjectId;
pub use json::SerializeCx;
pub use model::Model;
pub use value::Value;
