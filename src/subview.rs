//! A container holding at most one child component, driven by a bound value.
//!
//! The child's class comes from the bound model's `view` field when it names a
//! registered class, otherwise from the container's own template. When the
//! value changes to one that needs a different class, the old child is
//! destroyed and a new one created in its place. When only the model changes,
//! the existing child takes the new model and re-renders, keeping its identity.

use std::{cell::RefCell, rc::Rc};

use bindery_dom::NodeId;
use bindery_model::Value;

use crate::{
    component::{Component, ComponentClass},
    error::{BindError, Result},
    path::PathExpression,
    policy::{BindingKind, BindingPolicy, Handles},
    registry,
};

/// The field of a model that names the class used to display it.
pub const VIEW_FIELD: &str = "view";

pub struct SubviewBinding {
    container: NodeId,
    path: PathExpression,
    identifier: Rc<str>,
    class: Option<Rc<ComponentClass>>,
    child: RefCell<Option<Component>>,
    handles: Handles,
}

impl SubviewBinding {
    pub(crate) fn new(
        container: NodeId,
        path: PathExpression,
        identifier: Rc<str>,
        class: Option<Rc<ComponentClass>>,
    ) -> Self {
        Self {
            container,
            path,
            identifier,
            class,
            child: RefCell::new(None),
            handles: Handles::default(),
        }
    }

    pub fn path(&self) -> &PathExpression {
        &self.path
    }

    /// The name this subview is looked up by.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The class used when the model does not name one.
    pub fn default_class(&self) -> Option<&Rc<ComponentClass>> {
        self.class.as_ref()
    }

    pub fn child(&self) -> Option<Component> {
        self.child.borrow().clone()
    }

    fn destroy_child(&self, component: &Component) {
        let child = self.child.borrow_mut().take();
        if let Some(child) = child {
            destroy_child(component, &child);
        }
    }
}

impl BindingPolicy for SubviewBinding {
    fn kind(&self) -> BindingKind {
        BindingKind::Subview
    }

    fn element(&self) -> NodeId {
        self.container
    }

    fn activate(self: Rc<Self>, component: &Component) -> Result<()> {
        self.handles
            .listen(&self, component, std::slice::from_ref(&self.path));
        self.apply(component)
    }

    fn apply(&self, component: &Component) -> Result<()> {
        let model = component.resolve(&self.path);
        let class = class_for(&model, self.class.as_ref())?;
        let current = self.child();

        if let (Some(child), Some(class)) = (&current, &class)
            && Rc::ptr_eq(child.class(), class)
        {
            if !child.model().same(&model) {
                tracing::debug!(subview = %self.identifier, "swapping subview model");
                child.set_model(model);
                child.render()?;
            }
            return Ok(());
        }

        self.destroy_child(component);
        if let Some(class) = class {
            tracing::debug!(subview = %self.identifier, "creating subview");
            let child = spawn_child(component, class, model)?;
            if let Some(element) = child.element() {
                self.container.append_child(element);
            }
            *self.child.borrow_mut() = Some(child.clone());
            mount_child(component, &child);
        }
        Ok(())
    }

    fn deactivate(&self, component: &Component) {
        self.handles.release(component);
        self.destroy_child(component);
    }
}

/// The class a child for `model` should have: the class named by the model's
/// `view` field if it has one, `fallback` otherwise.
pub(crate) fn class_for(
    model: &Value,
    fallback: Option<&Rc<ComponentClass>>,
) -> Result<Option<Rc<ComponentClass>>> {
    if let Value::Model(model) = model
        && model.has(VIEW_FIELD)
    {
        let id = model.get(VIEW_FIELD).to_string();
        return match registry::lookup(&id) {
            Some(class) => Ok(Some(class)),
            None => Err(BindError::UnresolvedReference { id }),
        };
    }
    Ok(fallback.cloned())
}

/// Create and render a child of `parent`. The child is not yet attached to the
/// document.
pub(crate) fn spawn_child(
    parent: &Component,
    class: Rc<ComponentClass>,
    model: Value,
) -> Result<Component> {
    let child = Component::new(class, model);
    child.set_parent(Some(parent));
    if let Err(err) = child.render() {
        child.set_parent(None);
        return Err(err);
    }
    Ok(child)
}

/// Bring a freshly attached child up to its parent's activation state.
pub(crate) fn mount_child(parent: &Component, child: &Component) {
    if parent.is_active() {
        child.activate();
        child.update_size();
    }
}

pub(crate) fn destroy_child(parent: &Component, child: &Component) {
    tracing::debug!("destroying child component");
    if parent.is_active() {
        child.deactivate();
    }
    child.remove();
    if child.parent().is_some_and(|p| p.ptr_eq(parent)) {
        child.set_parent(None);
    }
}
