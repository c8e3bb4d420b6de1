//! Binding descriptors and the policy they share.
//!
//! Every descriptor follows the same lifecycle: [`activate`] subscribes its
//! paths and applies the current value, [`apply`] recomputes the value from the
//! component and performs the document side effect, and [`deactivate`] drops
//! the subscriptions. Values are never cached between applies.
//!
//! [`activate`]: BindingPolicy::activate
//! [`apply`]: BindingPolicy::apply
//! [`deactivate`]: BindingPolicy::deactivate

use std::{
    cell::RefCell,
    fmt,
    rc::{Rc, Weak},
};

use bindery_dom::NodeId;
use bindery_model::Value;
use smallvec::SmallVec;

use crate::{
    component::Component,
    error::Result,
    graph::{BindingHandle, BindingHandler},
    path::PathExpression,
    placeholder::Interpolation,
    repeater::RepeaterBinding,
    subview::SubviewBinding,
};

/// Attributes that are toggled by presence rather than given a value.
pub const BOOLEAN_ATTRIBUTES: &[&str] = &[
    "async",
    "autofocus",
    "autoplay",
    "checked",
    "controls",
    "default",
    "defer",
    "disabled",
    "formnovalidate",
    "hidden",
    "ismap",
    "loop",
    "multiple",
    "muted",
    "novalidate",
    "open",
    "readonly",
    "required",
    "reversed",
    "scoped",
    "seamless",
    "selected",
    "truespeed",
    "typemustmatch",
];

// Properties that take a bare number.
const UNITLESS_PROPERTIES: &[&str] = &[
    "animation-iteration-count",
    "column-count",
    "fill-opacity",
    "flex",
    "flex-grow",
    "flex-shrink",
    "font-weight",
    "grid-area",
    "grid-column",
    "grid-row",
    "line-height",
    "opacity",
    "order",
    "orphans",
    "widows",
    "z-index",
    "zoom",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BindingKind {
    Data,
    Attribute,
    Class,
    Style,
    Subview,
    Repeater,
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BindingKind::Data => "data",
            BindingKind::Attribute => "attribute",
            BindingKind::Class => "class",
            BindingKind::Style => "style",
            BindingKind::Subview => "subview",
            BindingKind::Repeater => "repeater",
        })
    }
}

pub trait BindingPolicy {
    fn kind(&self) -> BindingKind;

    /// The element this binding writes to.
    fn element(&self) -> NodeId;

    /// Subscribe to the bound paths and apply the current value.
    fn activate(self: Rc<Self>, component: &Component) -> Result<()>;

    /// Recompute the bound value and update the document.
    fn apply(&self, component: &Component) -> Result<()>;

    /// Drop every subscription. Safe to call more than once.
    fn deactivate(&self, component: &Component);
}

/// The registrations a descriptor holds in its component's graph.
#[derive(Default)]
pub(crate) struct Handles(RefCell<SmallVec<[BindingHandle; 2]>>);

impl Handles {
    /// Bind `paths` to a handler that re-applies `binding`. All paths share
    /// one handler.
    pub(crate) fn listen<P: BindingPolicy + 'static>(
        &self,
        binding: &Rc<P>,
        component: &Component,
        paths: &[PathExpression],
    ) {
        let owner = component.downgrade();
        let target: Weak<P> = Rc::downgrade(binding);
        let handler: BindingHandler = Rc::new(move |_: &Value| {
            let (Some(component), Some(binding)) = (owner.upgrade(), target.upgrade()) else {
                return;
            };
            if let Err(err) = binding.apply(&component) {
                tracing::error!(kind = %binding.kind(), %err, "failed to apply binding update");
            }
        });

        let bound: SmallVec<[BindingHandle; 2]> = paths
            .iter()
            .filter_map(|path| component.bind_path(path, handler.clone()))
            .collect();
        let mut handles = self.0.borrow_mut();
        for handle in bound {
            if !handles.contains(&handle) {
                handles.push(handle);
            }
        }
    }

    pub(crate) fn release(&self, component: &Component) {
        let handles = std::mem::take(&mut *self.0.borrow_mut());
        for handle in handles {
            component.unbind(handle);
        }
    }
}

/// Values of one-time placeholders, captured when the binding activates.
#[derive(Default)]
struct Captured(RefCell<Vec<Value>>);

impl Captured {
    fn capture(&self, interpolation: &Interpolation, component: &Component) {
        let values = interpolation
            .placeholders()
            .iter()
            .map(|p| {
                if p.one_time {
                    component.resolve(&p.path)
                } else {
                    Value::Null
                }
            })
            .collect();
        *self.0.borrow_mut() = values;
    }

    fn substitute(&self, interpolation: &Interpolation, component: &Component) -> String {
        let captured = self.0.borrow().clone();
        interpolation.substitute(|position, placeholder| {
            if placeholder.one_time {
                captured.get(position).cloned().unwrap_or_default()
            } else {
                component.resolve(&placeholder.path)
            }
        })
    }

    fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

/// Inner content driven by a string with placeholders.
pub struct DataBinding {
    element: NodeId,
    interpolation: Interpolation,
    captured: Captured,
    handles: Handles,
}

impl DataBinding {
    pub(crate) fn new(element: NodeId, interpolation: Interpolation) -> Self {
        Self {
            element,
            interpolation,
            captured: Captured::default(),
            handles: Handles::default(),
        }
    }

    pub fn expression(&self) -> &str {
        self.interpolation.source()
    }
}

impl BindingPolicy for DataBinding {
    fn kind(&self) -> BindingKind {
        BindingKind::Data
    }

    fn element(&self) -> NodeId {
        self.element
    }

    fn activate(self: Rc<Self>, component: &Component) -> Result<()> {
        self.captured.capture(&self.interpolation, component);
        self.handles
            .listen(&self, component, &self.interpolation.live_paths());
        self.apply(component)
    }

    fn apply(&self, component: &Component) -> Result<()> {
        let markup = self.captured.substitute(&self.interpolation, component);
        self.element.set_inner_markup(&markup)?;
        Ok(())
    }

    fn deactivate(&self, component: &Component) {
        self.handles.release(component);
        self.captured.clear();
    }
}

/// One attribute driven by a string with placeholders.
pub struct AttributeBinding {
    element: NodeId,
    attribute: String,
    interpolation: Interpolation,
    captured: Captured,
    handles: Handles,
}

impl AttributeBinding {
    pub(crate) fn new(element: NodeId, attribute: String, interpolation: Interpolation) -> Self {
        Self {
            element,
            attribute,
            interpolation,
            captured: Captured::default(),
            handles: Handles::default(),
        }
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn expression(&self) -> &str {
        self.interpolation.source()
    }
}

impl BindingPolicy for AttributeBinding {
    fn kind(&self) -> BindingKind {
        BindingKind::Attribute
    }

    fn element(&self) -> NodeId {
        self.element
    }

    fn activate(self: Rc<Self>, component: &Component) -> Result<()> {
        self.captured.capture(&self.interpolation, component);
        self.handles
            .listen(&self, component, &self.interpolation.live_paths());
        self.apply(component)
    }

    fn apply(&self, component: &Component) -> Result<()> {
        let value = self.captured.substitute(&self.interpolation, component);
        if BOOLEAN_ATTRIBUTES.contains(&self.attribute.as_str()) {
            self.element
                .set_flag_attribute(&self.attribute, value == "true");
        } else {
            self.element.set_attribute(&self.attribute, &value);
        }
        Ok(())
    }

    fn deactivate(&self, component: &Component) {
        self.handles.release(component);
        self.captured.clear();
    }
}

/// A single `{[:][!]path}` term of a class or style binding.
pub struct BoundTerm {
    path: PathExpression,
    one_time: bool,
    negate: bool,
    captured: RefCell<Value>,
}

impl BoundTerm {
    pub(crate) fn new(path: PathExpression, one_time: bool, negate: bool) -> Self {
        Self {
            path,
            one_time,
            negate,
            captured: RefCell::new(Value::Null),
        }
    }

    pub fn path(&self) -> &PathExpression {
        &self.path
    }

    pub fn is_one_time(&self) -> bool {
        self.one_time
    }

    pub fn is_negated(&self) -> bool {
        self.negate
    }

    fn listen<P: BindingPolicy + 'static>(
        &self,
        handles: &Handles,
        binding: &Rc<P>,
        component: &Component,
    ) {
        if self.one_time {
            *self.captured.borrow_mut() = component.resolve(&self.path);
        } else {
            handles.listen(binding, component, std::slice::from_ref(&self.path));
        }
    }

    fn value(&self, component: &Component) -> Value {
        let value = if self.one_time {
            self.captured.borrow().clone()
        } else {
            component.resolve(&self.path)
        };
        if self.negate {
            Value::Bool(!value.is_truthy())
        } else {
            value
        }
    }

    fn release(&self) {
        *self.captured.borrow_mut() = Value::Null;
    }
}

/// One class toggled, or supplied, by a bound value.
pub struct ClassBinding {
    element: NodeId,
    class_name: Option<Rc<str>>,
    term: BoundTerm,
    applied: RefCell<Option<String>>,
    handles: Handles,
}

impl ClassBinding {
    pub(crate) fn new(element: NodeId, class_name: Option<Rc<str>>, term: BoundTerm) -> Self {
        Self {
            element,
            class_name,
            term,
            applied: RefCell::new(None),
            handles: Handles::default(),
        }
    }

    /// The class applied when the value is truthy. `None` means the value
    /// itself is the class.
    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    pub fn term(&self) -> &BoundTerm {
        &self.term
    }

    /// The class currently applied by this binding.
    pub fn applied(&self) -> Option<String> {
        self.applied.borrow().clone()
    }
}

impl BindingPolicy for ClassBinding {
    fn kind(&self) -> BindingKind {
        BindingKind::Class
    }

    fn element(&self) -> NodeId {
        self.element
    }

    fn activate(self: Rc<Self>, component: &Component) -> Result<()> {
        self.term.listen(&self.handles, &self, component);
        self.apply(component)
    }

    fn apply(&self, component: &Component) -> Result<()> {
        let value = self.term.value(component);
        let next = value
            .is_truthy()
            .then(|| match &self.class_name {
                Some(name) => name.to_string(),
                None => value.to_string(),
            })
            .filter(|class| !class.trim().is_empty());

        let previous = self.applied.replace(next.clone());
        if previous == next {
            return Ok(());
        }
        if let Some(previous) = previous {
            for class in previous.split_whitespace() {
                self.element.remove_class(class);
            }
        }
        if let Some(next) = next {
            for class in next.split_whitespace() {
                self.element.add_class(class);
            }
        }
        Ok(())
    }

    fn deactivate(&self, component: &Component) {
        self.handles.release(component);
        self.term.release();
        self.applied.replace(None);
    }
}

/// One inline style property driven by a bound value.
pub struct StyleBinding {
    element: NodeId,
    property: String,
    term: BoundTerm,
    handles: Handles,
}

impl StyleBinding {
    pub(crate) fn new(element: NodeId, property: &str, term: BoundTerm) -> Self {
        Self {
            element,
            property: css_property_name(property),
            term,
            handles: Handles::default(),
        }
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn term(&self) -> &BoundTerm {
        &self.term
    }
}

impl BindingPolicy for StyleBinding {
    fn kind(&self) -> BindingKind {
        BindingKind::Style
    }

    fn element(&self) -> NodeId {
        self.element
    }

    fn activate(self: Rc<Self>, component: &Component) -> Result<()> {
        self.term.listen(&self.handles, &self, component);
        self.apply(component)
    }

    fn apply(&self, component: &Component) -> Result<()> {
        match css_value(&self.property, self.term.value(component)) {
            Some(value) => self.element.set_style_property(&self.property, &value),
            None => self.element.remove_style_property(&self.property),
        }
        Ok(())
    }

    fn deactivate(&self, component: &Component) {
        self.handles.release(component);
        self.term.release();
    }
}

/// `backgroundColor` and `background-color` both name `background-color`.
fn css_property_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// The declaration value for `value`, or `None` to remove the property.
fn css_value(property: &str, value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Number(_) if !UNITLESS_PROPERTIES.contains(&property) => Some(format!("{value}px")),
        value => Some(value.to_string()).filter(|v| !v.is_empty()),
    }
}

/// Every binding found in one render, grouped by kind in document order.
#[derive(Clone, Default)]
pub struct Bindings {
    pub data: Vec<Rc<DataBinding>>,
    pub attribute: Vec<Rc<AttributeBinding>>,
    pub class: Vec<Rc<ClassBinding>>,
    pub style: Vec<Rc<StyleBinding>>,
    pub subview: Vec<Rc<SubviewBinding>>,
    pub repeater: Vec<Rc<RepeaterBinding>>,
}

impl Bindings {
    pub fn len(&self) -> usize {
        self.data.len()
            + self.attribute.len()
            + self.class.len()
            + self.style.len()
            + self.subview.len()
            + self.repeater.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count(&self, kind: BindingKind) -> usize {
        match kind {
            BindingKind::Data => self.data.len(),
            BindingKind::Attribute => self.attribute.len(),
            BindingKind::Class => self.class.len(),
            BindingKind::Style => self.style.len(),
            BindingKind::Subview => self.subview.len(),
            BindingKind::Repeater => self.repeater.len(),
        }
    }

    /// Activate data, attribute, class, style, subview and repeater bindings,
    /// in that order.
    pub(crate) fn activate(&self, component: &Component) -> Result<()> {
        activate_all(&self.data, component)?;
        activate_all(&self.attribute, component)?;
        activate_all(&self.class, component)?;
        activate_all(&self.style, component)?;
        activate_all(&self.subview, component)?;
        activate_all(&self.repeater, component)
    }

    /// Deactivate child-owning bindings first so children go before their
    /// container's other bindings.
    pub(crate) fn deactivate(&self, component: &Component) {
        deactivate_all(&self.subview, component);
        deactivate_all(&self.repeater, component);
        deactivate_all(&self.data, component);
        deactivate_all(&self.attribute, component);
        deactivate_all(&self.class, component);
        deactivate_all(&self.style, component);
    }
}

impl fmt::Debug for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bindings")
            .field("data", &self.data.len())
            .field("attribute", &self.attribute.len())
            .field("class", &self.class.len())
            .field("style", &self.style.len())
            .field("subview", &self.subview.len())
            .field("repeater", &self.repeater.len())
            .finish()
    }
}

fn activate_all<P: BindingPolicy>(bindings: &[Rc<P>], component: &Component) -> Result<()> {
    for binding in bindings {
        tracing::trace!(kind = %binding.kind(), "activating binding");
        binding.clone().activate(component)?;
    }
    Ok(())
}

fn deactivate_all<P: BindingPolicy>(bindings: &[Rc<P>], component: &Component) {
    for binding in bindings {
        binding.deactivate(component);
    }
}
