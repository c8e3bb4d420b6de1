//! Named component classes and the shared stylesheet.
//!
//! Component classes are registered per thread, like everything else that
//! holds `Rc`s. Styles accumulate process-wide until [`flush`] or [`inject`]
//! takes them.

use std::{cell::RefCell, rc::Rc};

use bindery_dom::NodeId;
use parking_lot::{Mutex, const_mutex};
use rustc_hash::FxHashMap;

use crate::component::ComponentClass;

/// Marks the `<style>` element written by [`inject`].
pub const STYLE_MARKER: &str = "data-bindery";

thread_local! {
    static COMPONENTS: RefCell<FxHashMap<String, Rc<ComponentClass>>> =
        RefCell::new(FxHashMap::default());
}

static STYLES: Mutex<String> = const_mutex(String::new());

/// Register `class` under `id`, replacing any class already registered there.
pub fn register(id: &str, class: impl Into<Rc<ComponentClass>>) -> Rc<ComponentClass> {
    let class = class.into();
    tracing::debug!(id, "registering component class");
    COMPONENTS.with_borrow_mut(|components| components.insert(id.to_string(), class.clone()));
    class
}

pub fn lookup(id: &str) -> Option<Rc<ComponentClass>> {
    COMPONENTS.with_borrow(|components| components.get(id).cloned())
}

pub fn unregister(id: &str) -> Option<Rc<ComponentClass>> {
    COMPONENTS.with_borrow_mut(|components| components.remove(id))
}

/// Append a component's stylesheet to the shared one.
pub fn register_style(id: &str, css: &str) {
    if css.is_empty() {
        return;
    }
    let mut styles = STYLES.lock();
    styles.push_str("\n\n/* ");
    styles.push_str(id);
    styles.push_str(" */\n\n");
    styles.push_str(css);
}

/// Take everything registered since the last flush.
pub fn flush() -> String {
    std::mem::take(&mut *STYLES.lock())
}

/// Flush the registered styles into a `<style>` element appended to `head`,
/// removing the one a previous call wrote.
pub fn inject(head: NodeId) -> NodeId {
    for previous in head.query_attribute(STYLE_MARKER) {
        if previous != head && previous.tag().as_deref() == Some("style") {
            previous.remove();
        }
    }
    let css = flush();
    tracing::debug!(bytes = css.len(), "injecting stylesheet");

    let style = NodeId::element("style");
    style.set_attribute("type", "text/css");
    style.set_attribute(STYLE_MARKER, "true");
    style.set_text_content(&css);
    head.append_child(style);
    style
}
