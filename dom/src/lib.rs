//! # bindery_dom
//!
//! A minimal document tree for the bindery binding engine.
//!
//! Nodes live in thread-local storage and are addressed by copyable
//! [`NodeId`] handles, the same way a retained-mode UI keeps its views in a
//! slot map. The tree supports what declarative bindings need: attributes,
//! class lists, inline style declarations, inner markup and sibling-aware
//! insertion.
//!
//! ```rust
//! use bindery_dom::{NodeId, parse_element};
//!
//! let list = parse_element("<ul><li>one</li></ul>").unwrap().unwrap();
//! let item = NodeId::element("li");
//! item.set_text_content("two");
//! list.append_child(item);
//! item.add_class("last");
//!
//! assert_eq!(
//!     list.outer_markup(),
//!     r#"<ul><li>one</li><li class="last">two</li></ul>"#
//! );
//! ```

mod error;
mod id;
pub mod markup;
mod storage;

pub use error::MarkupError;
pub use id::NodeId;
pub use markup::{decode_entities, parse_element, parse_fragment};
