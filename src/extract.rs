//! Binding extraction: one depth-first pass over a freshly created element.
//!
//! Recognised markup:
//!
//! | attribute / content            | binding                                  |
//! |--------------------------------|------------------------------------------|
//! | text containing `{expr}`       | data (inner content)                     |
//! | `data-value="..."`             | data (inner content)                     |
//! | any attribute with `{expr}`    | attribute                                |
//! | `data-class="name:{expr} ..."` | one class binding per term               |
//! | `data-style="prop:{expr}; ..."`| one style binding per property           |
//! | `data-subview="{expr}[:id]"`   | subview, optional `data-template="id"`   |
//! | `data-source="{expr}[:id]"`    | repeater, optional `data-template="id"`  |
//! | `data-id="name"`/`"name[]"`    | named element(s)                         |
//!
//! Subview and repeater containers are claimed before anything else reads
//! them: their content becomes the child template and is removed from the
//! document, so it is never scanned as part of the parent.

use std::{rc::Rc, sync::LazyLock};

use bindery_dom::NodeId;
use indexmap::IndexMap;
use regex::Regex;

use crate::{
    component::ComponentClass,
    config::Config,
    error::{BindError, GrammarKind, Result},
    path::PathExpression,
    placeholder::Interpolation,
    policy::{
        AttributeBinding, BOOLEAN_ATTRIBUTES, Bindings, BoundTerm, ClassBinding, DataBinding,
        StyleBinding,
    },
    registry,
    repeater::RepeaterBinding,
    subview::SubviewBinding,
};

const ID_ATTRIBUTE: &str = "data-id";
const VALUE_ATTRIBUTE: &str = "data-value";
const CLASS_ATTRIBUTE: &str = "data-class";
const STYLE_ATTRIBUTE: &str = "data-style";
const SUBVIEW_ATTRIBUTE: &str = "data-subview";
const SOURCE_ATTRIBUTE: &str = "data-source";
const TEMPLATE_ATTRIBUTE: &str = "data-template";

/// Prefix that hides a bound attribute from the markup parser.
pub const ESCAPED_ATTRIBUTE_PREFIX: &str = "data-attribute-";

const RESERVED_ATTRIBUTES: &[&str] = &[
    ID_ATTRIBUTE,
    VALUE_ATTRIBUTE,
    CLASS_ATTRIBUTE,
    STYLE_ATTRIBUTE,
    SUBVIEW_ATTRIBUTE,
    SOURCE_ATTRIBUTE,
    TEMPLATE_ATTRIBUTE,
];

const CLASS_TERM: &str = r"(?:([_a-zA-Z0-9\-]+):)?\{(:?)(!?)([^{}]+?)\}";
const STYLE_TERM: &str = r"([_a-zA-Z0-9\-]+):\s*\{(:?)(!?)([^{}]+?)\};?";

static CLASS_TERMS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(CLASS_TERM).expect("valid regex"));
static CLASS_LIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^\s*(?:{CLASS_TERM}\s*)*$")).expect("valid regex")
});
static STYLE_TERMS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(STYLE_TERM).expect("valid regex"));
static STYLE_LIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^\s*(?:{STYLE_TERM}\s*)*$")).expect("valid regex")
});
static CONTAINER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{(.+?)\}(?::(\w+))?$").expect("valid regex"));
static UNSAFE_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    let names = BOOLEAN_ATTRIBUTES
        .iter()
        .chain(&["href", "src"])
        .copied()
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r#"\s+((?:{names})="[^"]*\{{.*?")"#)).expect("valid regex")
});

/// Rename bound boolean, `href` and `src` attributes to their
/// `data-attribute-` form so the raw placeholder never reaches the element.
pub fn escape_unsafe_attributes(markup: &str) -> String {
    UNSAFE_ATTRIBUTE
        .replace_all(markup, format!(" {ESCAPED_ATTRIBUTE_PREFIX}$1"))
        .into_owned()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Named {
    One(NodeId),
    Many(Vec<NodeId>),
}

/// Elements marked with `data-id`.
#[derive(Clone, Debug, Default)]
pub struct NamedElements(IndexMap<String, Named>);

impl NamedElements {
    fn insert(&mut self, name: &str, element: NodeId) {
        match name.strip_suffix("[]") {
            Some(name) => match self.0.get_mut(name) {
                Some(Named::Many(elements)) => elements.push(element),
                _ => {
                    self.0.insert(name.to_string(), Named::Many(vec![element]));
                }
            },
            None => {
                self.0.insert(name.to_string(), Named::One(element));
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<NodeId> {
        match self.0.get(name)? {
            Named::One(element) => Some(*element),
            Named::Many(_) => None,
        }
    }

    pub fn get_all(&self, name: &str) -> Vec<NodeId> {
        match self.0.get(name) {
            Some(Named::Many(elements)) => elements.clone(),
            Some(Named::One(element)) => vec![*element],
            None => Vec::new(),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct Extraction {
    pub bindings: Bindings,
    pub named: NamedElements,
}

/// Find every binding in `root` and its descendants.
///
/// Binding attributes are removed as they are read unless
/// `config.retain_metadata` is set.
pub fn extract(root: NodeId, config: &Config) -> Result<Extraction> {
    let mut extraction = Extraction::default();
    visit(root, config, &mut extraction)?;
    Ok(extraction)
}

fn visit(element: NodeId, config: &Config, out: &mut Extraction) -> Result<()> {
    if let Some(name) = element.attribute(ID_ATTRIBUTE) {
        out.named.insert(&name, element);
    }

    let claimed = if let Some(source) = element.attribute(SOURCE_ATTRIBUTE) {
        let (path, identifier, class) =
            claim_container(element, &source, GrammarKind::Repeater, config)?;
        strip(element, SOURCE_ATTRIBUTE, config);
        out.bindings
            .repeater
            .push(RepeaterBinding::new(element, path, identifier, class));
        true
    } else if let Some(source) = element.attribute(SUBVIEW_ATTRIBUTE) {
        let (path, identifier, class) =
            claim_container(element, &source, GrammarKind::Subview, config)?;
        strip(element, SUBVIEW_ATTRIBUTE, config);
        out.bindings.subview.push(Rc::new(SubviewBinding::new(
            element, path, identifier, class,
        )));
        true
    } else {
        false
    };

    let data_bound = !claimed && extract_data(element, config, out);
    extract_attributes(element, config, out);
    if let Some(terms) = element.attribute(CLASS_ATTRIBUTE) {
        extract_classes(element, &terms, out)?;
        strip(element, CLASS_ATTRIBUTE, config);
    }
    if let Some(terms) = element.attribute(STYLE_ATTRIBUTE) {
        extract_styles(element, &terms, out)?;
        strip(element, STYLE_ATTRIBUTE, config);
    }

    if !claimed && !data_bound {
        for child in element.element_children() {
            visit(child, config, out)?;
        }
    }
    Ok(())
}

fn strip(element: NodeId, attribute: &str, config: &Config) {
    if !config.retain_metadata {
        element.remove_attribute(attribute);
    }
}

/// Parse a `{expr}[:identifier]` container and take its content as the child
/// template.
fn claim_container(
    element: NodeId,
    source: &str,
    kind: GrammarKind,
    config: &Config,
) -> Result<(PathExpression, Rc<str>, Option<Rc<ComponentClass>>)> {
    let invalid = || BindError::grammar(kind, source);
    let captures = CONTAINER.captures(source).ok_or_else(invalid)?;
    let path = PathExpression::parse(&captures[1]).map_err(|_| invalid())?;
    let identifier: Rc<str> = match captures.get(2) {
        Some(identifier) => identifier.as_str().into(),
        None => path.as_str().into(),
    };

    let class = match element.attribute(TEMPLATE_ATTRIBUTE) {
        Some(id) => {
            let class = registry::lookup(&id).ok_or(BindError::UnresolvedReference { id })?;
            strip(element, TEMPLATE_ATTRIBUTE, config);
            Some(class)
        }
        None => {
            let markup = element.inner_markup();
            (!markup.trim().is_empty()).then(|| Rc::new(ComponentClass::new(markup.trim())))
        }
    };
    element.clear_children();
    tracing::trace!(%kind, expression = %path, %identifier, "claimed container");
    Ok((path, identifier, class))
}

/// Returns whether the element's content is now driven by a binding.
fn extract_data(element: NodeId, config: &Config, out: &mut Extraction) -> bool {
    let source = element.attribute(VALUE_ATTRIBUTE).or_else(|| {
        element
            .children()
            .into_iter()
            .filter_map(|child| child.text_value())
            .find(|text| Interpolation::parse(text).is_some())
    });
    let Some(source) = source else {
        return false;
    };
    let Some(interpolation) = Interpolation::parse(&source) else {
        strip(element, VALUE_ATTRIBUTE, config);
        return false;
    };

    if config.retain_metadata {
        element.set_attribute(VALUE_ATTRIBUTE, &source);
    } else {
        element.remove_attribute(VALUE_ATTRIBUTE);
    }
    out.bindings
        .data
        .push(Rc::new(DataBinding::new(element, interpolation)));
    true
}

fn extract_attributes(element: NodeId, config: &Config, out: &mut Extraction) {
    for (name, value) in element.attributes() {
        if RESERVED_ATTRIBUTES.contains(&name.as_str()) || !value.contains('{') {
            continue;
        }
        let Some(interpolation) = Interpolation::parse(&value) else {
            continue;
        };
        let target = match name.strip_prefix(ESCAPED_ATTRIBUTE_PREFIX) {
            Some(target) => {
                strip(element, &name, config);
                target.to_string()
            }
            None => name,
        };
        out.bindings
            .attribute
            .push(Rc::new(AttributeBinding::new(element, target, interpolation)));
    }
}

fn extract_classes(element: NodeId, terms: &str, out: &mut Extraction) -> Result<()> {
    let invalid = || BindError::grammar(GrammarKind::Class, terms);
    if !CLASS_LIST.is_match(terms) {
        return Err(invalid());
    }
    for captures in CLASS_TERMS.captures_iter(terms) {
        let path = PathExpression::parse(&captures[4]).map_err(|_| invalid())?;
        let term = BoundTerm::new(path, &captures[2] == ":", &captures[3] == "!");
        let class_name = captures.get(1).map(|name| Rc::from(name.as_str()));
        out.bindings
            .class
            .push(Rc::new(ClassBinding::new(element, class_name, term)));
    }
    Ok(())
}

fn extract_styles(element: NodeId, terms: &str, out: &mut Extraction) -> Result<()> {
    let invalid = || BindError::grammar(GrammarKind::Style, terms);
    if !STYLE_LIST.is_match(terms) {
        return Err(invalid());
    }
    for captures in STYLE_TERMS.captures_iter(terms) {
        let path = PathExpression::parse(&captures[4]).map_err(|_| invalid())?;
        let term = BoundTerm::new(path, &captures[2] == ":", &captures[3] == "!");
        out.bindings
            .style
            .push(Rc::new(StyleBinding::new(element, &captures[1], term)));
    }
    Ok(())
}
