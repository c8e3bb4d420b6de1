//! Generated fields: component-local values computed on demand.
//!
//! A generator is declared as `name` or `name {dep.one,dep.two}`. Whenever one
//! of the dependency expressions changes, the component announces
//! `change:name` on its synthetic emitter, and bindings rooted at `name`
//! re-read the generator.

use std::{rc::Rc, sync::LazyLock};

use bindery_model::{EventEmitter, Value};
use educe::Educe;
use indexmap::IndexMap;
use regex::Regex;

use crate::{
    component::Component,
    error::{BindError, GrammarKind, Result},
    path::PathExpression,
};

static DEFINITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\w+)(?: \{(.+?)\})?$").expect("valid regex"));

pub type GeneratorFn = Rc<dyn Fn(&Component) -> Value>;

/// A parsed generator definition.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratorDef {
    pub name: Rc<str>,
    pub dependencies: Vec<PathExpression>,
}

impl GeneratorDef {
    pub fn parse(definition: &str) -> Result<Self> {
        let invalid = || BindError::grammar(GrammarKind::Generator, definition);
        let captures = DEFINITION.captures(definition).ok_or_else(invalid)?;
        let dependencies = match captures.get(2) {
            Some(list) => list
                .as_str()
                .split(',')
                .map(|dep| PathExpression::parse(dep).map_err(|_| invalid()))
                .collect::<Result<_>>()?,
            None => Vec::new(),
        };
        Ok(Self {
            name: captures[1].into(),
            dependencies,
        })
    }
}

#[derive(Clone, Educe)]
#[educe(Debug)]
pub(crate) struct Generator {
    pub(crate) def: GeneratorDef,
    #[educe(Debug(ignore))]
    pub(crate) compute: GeneratorFn,
}

/// The generated fields of one render, with the emitter their change events
/// go through.
#[derive(Default, Educe)]
#[educe(Debug)]
pub(crate) struct Generators {
    fields: IndexMap<Rc<str>, Generator>,
    #[educe(Debug(ignore))]
    events: Rc<EventEmitter>,
}

impl Generators {
    pub(crate) fn parse<'a>(
        definitions: impl IntoIterator<Item = (&'a str, &'a GeneratorFn)>,
    ) -> Result<Self> {
        let mut fields = IndexMap::new();
        for (definition, compute) in definitions {
            let def = GeneratorDef::parse(definition)?;
            fields.insert(
                def.name.clone(),
                Generator {
                    def,
                    compute: compute.clone(),
                },
            );
        }
        Ok(Self {
            fields,
            events: Rc::new(EventEmitter::new()),
        })
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Generator> {
        self.fields.get(name)
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Generator> {
        self.fields.values()
    }

    pub(crate) fn events(&self) -> Rc<EventEmitter> {
        self.events.clone()
    }
}
