//! Components: a template, a model, and the bindings that keep them in sync.
//!
//! A [`Component`] moves through `unrendered → rendered → active`. Rendering
//! builds the element from the class template, extracts its bindings and
//! pushes the current model values into it. Activation only matters for
//! lifecycle hooks and for the children created by subview and repeater
//! bindings, which follow their parent's activation state.
//!
//! [`Component::render`] can be called again at any time. The old element is
//! unloaded and the new one takes its place in the document, and an active
//! component is active again afterwards.

use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::{Rc, Weak},
};

use bindery_dom::{NodeId, parse_element};
use bindery_model::{Event, EventKind, ListenerId, Model, Value};
use educe::Educe;

use crate::{
    config::Config,
    error::{BindError, Result},
    extract::{Extraction, NamedElements, escape_unsafe_attributes, extract},
    generator::{GeneratorFn, Generators},
    graph::{BindingGraph, BindingHandle, BindingHandler, GraphSources},
    path::PathExpression,
    policy::Bindings,
    repeater::RepeaterBinding,
    template::{RenderContext, Template},
};

/// The model field holding extra classes for a component's element.
pub const STYLE_FIELD: &str = "style";

/// A lifecycle callback.
pub type Hook = Rc<dyn Fn(&Component)>;

/// What every instance of a kind of component shares: its template, generated
/// fields and lifecycle hooks.
#[derive(Clone, Default, Educe)]
#[educe(Debug)]
pub struct ComponentClass {
    template: Template,
    #[educe(Debug(ignore))]
    generators: Vec<(String, GeneratorFn)>,
    #[educe(Debug(ignore))]
    on_activate: Option<Hook>,
    #[educe(Debug(ignore))]
    on_deactivate: Option<Hook>,
    #[educe(Debug(ignore))]
    on_update_size: Option<Hook>,
}

impl ComponentClass {
    pub fn new(template: impl Into<Template>) -> Self {
        Self {
            template: template.into(),
            ..Default::default()
        }
    }

    /// Add a generated field. `definition` is `name` or `name {dep,dep}`; the
    /// dependency list is checked when a component of this class renders.
    pub fn generator(
        mut self,
        definition: impl Into<String>,
        compute: impl Fn(&Component) -> Value + 'static,
    ) -> Self {
        self.generators.push((definition.into(), Rc::new(compute)));
        self
    }

    pub fn on_activate(mut self, hook: impl Fn(&Component) + 'static) -> Self {
        self.on_activate = Some(Rc::new(hook));
        self
    }

    pub fn on_deactivate(mut self, hook: impl Fn(&Component) + 'static) -> Self {
        self.on_deactivate = Some(Rc::new(hook));
        self
    }

    pub fn on_update_size(mut self, hook: impl Fn(&Component) + 'static) -> Self {
        self.on_update_size = Some(Rc::new(hook));
        self
    }

    pub fn template(&self) -> &Template {
        &self.template
    }
}

/// Everything built by one render and thrown away by the next unload.
struct RenderState {
    model: Option<Model>,
    graph: BindingGraph,
    generators: Rc<Generators>,
    bindings: RefCell<Bindings>,
    named: RefCell<NamedElements>,
    style_classes: RefCell<Vec<String>>,
    style_listener: Cell<Option<ListenerId>>,
}

struct ComponentInner {
    class: Rc<ComponentClass>,
    model: RefCell<Value>,
    parent: RefCell<Weak<ComponentInner>>,
    active: Cell<bool>,
    rendered: Cell<bool>,
    element: Cell<Option<NodeId>>,
    state: RefCell<Option<Rc<RenderState>>>,
}

impl Drop for ComponentInner {
    fn drop(&mut self) {
        let Some(state) = self.state.get_mut().take() else {
            return;
        };
        state.graph.clear();
        for repeater in &state.bindings.borrow().repeater {
            repeater.release_source();
        }
        if let (Some(model), Some(listener)) = (&state.model, state.style_listener.take()) {
            model.off(listener);
        }
    }
}

/// A shared handle to a component instance.
#[derive(Clone)]
pub struct Component(Rc<ComponentInner>);

/// A non-owning [`Component`] handle.
#[derive(Clone, Default)]
pub struct WeakComponent(Weak<ComponentInner>);

impl WeakComponent {
    pub fn upgrade(&self) -> Option<Component> {
        self.0.upgrade().map(Component)
    }
}

impl Component {
    /// Create an unrendered component. `model` should be a [`Model`] or
    /// `Null`; anything else is rejected by [`render`](Self::render).
    pub fn new(class: impl Into<Rc<ComponentClass>>, model: impl Into<Value>) -> Self {
        Component(Rc::new(ComponentInner {
            class: class.into(),
            model: RefCell::new(model.into()),
            parent: RefCell::new(Weak::new()),
            active: Cell::new(false),
            rendered: Cell::new(false),
            element: Cell::new(None),
            state: RefCell::new(None),
        }))
    }

    pub fn class(&self) -> &Rc<ComponentClass> {
        &self.0.class
    }

    pub fn ptr_eq(&self, other: &Component) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn downgrade(&self) -> WeakComponent {
        WeakComponent(Rc::downgrade(&self.0))
    }

    /// The assigned model. Bindings keep using the model of the last render
    /// until the next one.
    pub fn model(&self) -> Value {
        self.0.model.borrow().clone()
    }

    /// Assign a model to be used from the next render on.
    pub fn set_model(&self, model: impl Into<Value>) {
        let model = model.into();
        *self.0.model.borrow_mut() = model;
    }

    pub fn element(&self) -> Option<NodeId> {
        self.0.element.get()
    }

    pub fn parent(&self) -> Option<Component> {
        self.0.parent.borrow().upgrade().map(Component)
    }

    pub(crate) fn set_parent(&self, parent: Option<&Component>) {
        let parent = parent.map_or_else(Weak::new, |p| Rc::downgrade(&p.0));
        *self.0.parent.borrow_mut() = parent;
    }

    pub fn is_active(&self) -> bool {
        self.0.active.get()
    }

    pub fn is_rendered(&self) -> bool {
        self.0.rendered.get()
    }

    fn state(&self) -> Option<Rc<RenderState>> {
        self.0.state.borrow().clone()
    }

    /// Build the element and wire up its bindings.
    ///
    /// If the component was already rendered it is unloaded first. The new
    /// element takes the old one's place in the document, and an active
    /// component is reactivated.
    pub fn render(&self) -> Result<()> {
        let model = match self.model() {
            Value::Null => None,
            Value::Model(model) => Some(model),
            _ => return Err(BindError::MissingModel),
        };

        let was_active = self.is_active();
        let position = self
            .element()
            .and_then(|element| element.parent().map(|parent| (parent, element.next_sibling())));

        if self.is_rendered() {
            self.unload();
        }
        tracing::debug!(active = was_active, attached = position.is_some(), "rendering component");

        let generators = Rc::new(Generators::parse(
            self.0
                .class
                .generators
                .iter()
                .map(|(definition, compute)| (definition.as_str(), compute)),
        )?);
        let resolver = {
            let owner = self.downgrade();
            Rc::new(move |path: &PathExpression| {
                owner
                    .upgrade()
                    .map_or(Value::Null, |component| component.resolve(path))
            })
        };
        let is_generated = {
            let generators = generators.clone();
            Rc::new(move |name: &str| generators.contains(name))
        };
        let graph = BindingGraph::new(GraphSources {
            model: model.clone(),
            generated: generators.events(),
            is_generated,
            resolver,
        });

        let state = Rc::new(RenderState {
            model,
            graph,
            generators,
            bindings: Default::default(),
            named: Default::default(),
            style_classes: Default::default(),
            style_listener: Cell::new(None),
        });
        *self.0.state.borrow_mut() = Some(state.clone());
        self.0.rendered.set(true);

        if let Err(err) = self.mount(&state) {
            tracing::debug!(%err, "render failed");
            self.unload();
            return Err(err);
        }
        self.attach_style_classes(&state);

        if let (Some((parent, next)), Some(element)) = (position, self.element()) {
            match next {
                Some(next) if next.parent() == Some(parent) => {
                    parent.insert_before(element, next);
                }
                _ => {
                    parent.append_child(element);
                }
            }
        }

        if was_active {
            self.activate();
            self.update_size();
        }
        Ok(())
    }

    fn mount(&self, state: &RenderState) -> Result<()> {
        let context = self.render_context();
        let markup = escape_unsafe_attributes(&self.0.class.template.render(&context));
        let Some(element) = parse_element(&markup)? else {
            return Ok(());
        };
        self.0.element.set(Some(element));

        let Extraction { bindings, named } = extract(element, &Config::current())?;
        tracing::debug!(bindings = ?bindings, "extracted bindings");
        *state.bindings.borrow_mut() = bindings.clone();
        *state.named.borrow_mut() = named;

        self.bind_generators(state);
        bindings.activate(self)
    }

    /// Announce `change:<name>` whenever a generator's dependencies change.
    fn bind_generators(&self, state: &RenderState) {
        for generator in state.generators.iter() {
            let events = state.generators.events();
            let name = generator.def.name.clone();
            let compute = generator.compute.clone();
            let owner = self.downgrade();
            let handler: BindingHandler = Rc::new(move |_| {
                let Some(component) = owner.upgrade() else {
                    return;
                };
                let value = compute(&component);
                events.emit(&Event::Change {
                    field: name.clone(),
                    value,
                });
            });
            for dependency in &generator.def.dependencies {
                state.graph.activate(dependency, handler.clone());
            }
        }
    }

    fn attach_style_classes(&self, state: &RenderState) {
        let Some(model) = &state.model else {
            return;
        };
        self.update_style_classes(&model.get(STYLE_FIELD));
        let owner = self.downgrade();
        let listener = model.on(EventKind::change(STYLE_FIELD), move |event| {
            if let (Some(component), Event::Change { value, .. }) = (owner.upgrade(), event) {
                component.update_style_classes(value);
            }
        });
        state.style_listener.set(Some(listener));
    }

    fn update_style_classes(&self, value: &Value) {
        let (Some(state), Some(element)) = (self.state(), self.element()) else {
            return;
        };
        let classes: Vec<String> = if value.is_truthy() {
            value.to_string().split_whitespace().map(String::from).collect()
        } else {
            Vec::new()
        };
        let previous = state.style_classes.replace(classes.clone());
        for class in &previous {
            element.remove_class(class);
        }
        for class in &classes {
            element.add_class(class);
        }
    }

    /// Tear down everything the last render built. Does nothing on an
    /// unrendered component.
    pub fn unload(&self) {
        if self.is_active() {
            self.deactivate();
        }
        if let Some(state) = self.state() {
            tracing::debug!("unloading component");
            let bindings = std::mem::take(&mut *state.bindings.borrow_mut());
            bindings.deactivate(self);
            state.graph.clear();
            if let (Some(model), Some(listener)) = (&state.model, state.style_listener.take()) {
                model.off(listener);
            }
            *self.0.state.borrow_mut() = None;
        }
        if let Some(element) = self.0.element.take() {
            element.remove();
        }
        self.0.rendered.set(false);
    }

    /// Unload and detach from the parent component.
    pub fn remove(&self) {
        self.unload();
        self.set_parent(None);
    }

    pub fn activate(&self) {
        if self.0.active.replace(true) {
            return;
        }
        tracing::debug!("activating component");
        if let Some(hook) = &self.0.class.on_activate {
            hook(self);
        }
        for child in self.children() {
            child.activate();
        }
    }

    pub fn deactivate(&self) {
        if !self.0.active.replace(false) {
            return;
        }
        tracing::debug!("deactivating component");
        for child in self.children() {
            child.deactivate();
        }
        if let Some(hook) = &self.0.class.on_deactivate {
            hook(self);
        }
    }

    /// Run the size hook here and in every child.
    pub fn update_size(&self) {
        if let Some(hook) = &self.0.class.on_update_size {
            hook(self);
        }
        for child in self.children() {
            child.update_size();
        }
    }

    /// Evaluate an expression against the generated fields and the model.
    pub fn get(&self, expression: &str) -> Result<Value> {
        Ok(self.resolve(&PathExpression::parse(expression)?))
    }

    /// Call `handler` whenever `expression` changes, until the next unload.
    ///
    /// Binding the same handler to the same expression twice returns the
    /// existing handle.
    pub fn bind(&self, expression: &str, handler: BindingHandler) -> Result<BindingHandle> {
        let path = PathExpression::parse(expression)?;
        self.bind_path(&path, handler).ok_or(BindError::NotRendered)
    }

    pub fn unbind(&self, handle: BindingHandle) -> bool {
        self.state()
            .is_some_and(|state| state.graph.deactivate(handle))
    }

    /// Whether `handle` is bound in the current render.
    pub fn is_bound(&self, handle: BindingHandle) -> bool {
        self.state()
            .is_some_and(|state| state.graph.contains(handle))
    }

    pub(crate) fn bind_path(
        &self,
        path: &PathExpression,
        handler: BindingHandler,
    ) -> Option<BindingHandle> {
        let state = self.state()?;
        Some(state.graph.activate(path, handler).0)
    }

    /// The first segment is looked up among the generated fields, then in the
    /// model.
    pub(crate) fn resolve(&self, path: &PathExpression) -> Value {
        let state = self.state();
        let generated = state.as_ref().and_then(|state| {
            state
                .generators
                .get(path.root_field())
                .map(|generator| generator.compute.clone())
        });
        if let Some(compute) = generated {
            let value = compute(self);
            let value = match path.segments().first() {
                Some(first) => first.index_into(value),
                None => value,
            };
            return path.resolve_rest(value);
        }

        let model = match state {
            Some(state) => state.model.clone().map_or(Value::Null, Value::Model),
            None => self.model(),
        };
        path.resolve_in(&model)
    }

    /// The model's JSON form with the current generated values on top.
    pub fn render_context(&self) -> RenderContext {
        let state = self.state();
        let model = match &state {
            Some(state) => state.model.clone().map_or(Value::Null, Value::Model),
            None => self.model(),
        };
        let mut context = match model.to_json() {
            serde_json::Value::Object(map) => map,
            _ => RenderContext::new(),
        };
        if let Some(state) = state {
            for generator in state.generators.iter() {
                let value = (generator.compute)(self);
                context.insert(generator.def.name.to_string(), value.to_json());
            }
        }
        context
    }

    /// The bindings of the current render.
    pub fn bindings(&self) -> Bindings {
        self.state()
            .map(|state| state.bindings.borrow().clone())
            .unwrap_or_default()
    }

    /// The element marked `data-id="name"`.
    pub fn named_element(&self, name: &str) -> Option<NodeId> {
        self.state()?.named.borrow().get(name)
    }

    /// The elements marked `data-id="name[]"`, in document order.
    pub fn named_elements(&self, name: &str) -> Vec<NodeId> {
        self.state()
            .map(|state| state.named.borrow().get_all(name))
            .unwrap_or_default()
    }

    /// The current child of the subview called `identifier`.
    pub fn subview(&self, identifier: &str) -> Option<Component> {
        self.bindings()
            .subview
            .iter()
            .find(|binding| binding.identifier() == identifier)
            .and_then(|binding| binding.child())
    }

    pub fn repeater(&self, identifier: &str) -> Option<Rc<RepeaterBinding>> {
        self.bindings()
            .repeater
            .into_iter()
            .find(|binding| binding.identifier() == identifier)
    }

    /// Every child created by this component's subview and repeater
    /// bindings.
    pub fn children(&self) -> Vec<Component> {
        let bindings = self.bindings();
        let mut children: Vec<Component> = bindings
            .subview
            .iter()
            .filter_map(|binding| binding.child())
            .collect();
        for repeater in &bindings.repeater {
            children.extend(repeater.children());
        }
        children
    }

    /// Root listeners in this render's change graph.
    pub fn root_listener_count(&self) -> usize {
        self.state().map_or(0, |state| state.graph.root_count())
    }

    /// Handlers registered in this render's change graph.
    pub fn registration_count(&self) -> usize {
        self.state()
            .map_or(0, |state| state.graph.registration_count())
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("class", &self.0.class)
            .field("element", &self.element())
            .field("rendered", &self.is_rendered())
            .field("active", &self.is_active())
            .finish()
    }
}
