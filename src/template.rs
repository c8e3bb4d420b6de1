//! The templating collaborator: render context in, markup string out.

use std::{fmt, rc::Rc};

/// The render context handed to a template: the model's JSON form merged with
/// the current generated-field values.
pub type RenderContext = serde_json::Map<String, serde_json::Value>;

/// A component's markup source.
///
/// Markup is used verbatim. A function template can build its markup from the
/// render context with whatever templating it likes.
#[derive(Clone)]
pub enum Template {
    Markup(Rc<str>),
    Fn(Rc<dyn Fn(&RenderContext) -> String>),
}

impl Template {
    pub fn from_fn(f: impl Fn(&RenderContext) -> String + 'static) -> Self {
        Template::Fn(Rc::new(f))
    }

    pub fn render(&self, context: &RenderContext) -> String {
        match self {
            Template::Markup(markup) => markup.to_string(),
            Template::Fn(f) => f(context),
        }
    }
}

impl Default for Template {
    fn default() -> Self {
        Template::Markup("<div></div>".into())
    }
}

impl From<&str> for Template {
    fn from(markup: &str) -> Self {
        Template::Markup(markup.into())
    }
}

impl From<String> for Template {
    fn from(markup: String) -> Self {
        Template::Markup(markup.into())
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Template::Markup(markup) => f.debug_tuple("Markup").field(markup).finish(),
            Template::Fn(_) => f.write_str("Fn(..)"),
        }
    }
}
