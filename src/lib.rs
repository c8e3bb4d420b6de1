//! # bindery
//!
//! Declarative data bindings between observable models and a document tree.
//!
//! A [`ComponentClass`] holds a markup template whose elements carry binding
//! expressions. Rendering a [`Component`] turns the template into an element,
//! finds the bindings and subscribes to exactly the model fields they read.
//! From then on every effective change to the model is pushed into the
//! document, and nothing else is touched.
//!
//! ```rust
//! use bindery::{Component, ComponentClass, Model, Value};
//!
//! let model = Model::with_fields([
//!     ("name", Value::from("Ann")),
//!     ("isActive", Value::from(false)),
//! ]);
//! let class = ComponentClass::new(r#"<p data-class="active:{isActive}">Hello {name}</p>"#);
//! let component = Component::new(class, model.clone());
//! component.render()?;
//!
//! let element = component.element().unwrap();
//! assert_eq!(element.outer_markup(), "<p>Hello Ann</p>");
//!
//! model.set("name", "Bob");
//! model.set("isActive", true);
//! assert_eq!(element.outer_markup(), r#"<p class="active">Hello Bob</p>"#);
//! # Ok::<(), bindery::BindError>(())
//! ```
//!
//! ## Binding syntax
//!
//! Placeholders are written `{path}`, where a path is a dotted sequence of
//! fields with optional indices: `user.friends[0].name`. `items[]` follows a
//! collection's membership instead of a single item. Inside text and attribute
//! values a placeholder may be prefixed with `:` to render it once without
//! observing it, and with one of `%` (URL-encode), `@` (escape HTML) or `!`
//! (negate).
//!
//! The [`extract`] module documents the attributes that declare class, style,
//! subview and repeater bindings.
//!
//! ## Threading
//!
//! Models, components and document nodes are `!Send`; a component and
//! everything it binds to live on one thread. Only the style registry is
//! shared between threads.

mod component;
mod config;
mod error;
pub mod extract;
mod generator;
mod graph;
pub mod path;
pub mod placeholder;
pub mod policy;
pub mod registry;
mod repeater;
mod subview;
mod template;

pub use bindery_dom as dom;
pub use bindery_dom::NodeId;
pub use bindery_model as model;
pub use bindery_model::{Collection, Event, EventKind, ListenerId, Model, Value};
pub use component::{Component, ComponentClass, Hook, STYLE_FIELD, WeakComponent};
pub use config::{Config, RETAIN_METADATA_ENV};
pub use error::{BindError, GrammarKind, Result};
pub use generator::{GeneratorDef, GeneratorFn};
pub use graph::{BindingHandle, BindingHandler};
pub use path::PathExpression;
pub use policy::{BindingKind, BindingPolicy, Bindings};
pub use repeater::RepeaterBinding;
pub use subview::{SubviewBinding, VIEW_FIELD};
pub use template::{RenderContext, Template};
