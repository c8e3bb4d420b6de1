//! Dotted, indexed path expressions such as `user.friends[2].name`.
//!
//! A [`PathExpression`] is parsed once and shared by reference. Resolution never
//! fails: missing fields, out-of-range indices and `Null` intermediates all
//! resolve to [`Value::Null`].

use std::{fmt, hash, rc::Rc, str::FromStr, sync::LazyLock};

use bindery_model::Value;
use regex::Regex;

use crate::error::{BindError, GrammarKind, Result};

static SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^\[\]\s{}]+)(?:\[(\d*)\])?$").expect("valid regex"));

/// The bracketed part of a segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Index {
    /// `name[n]`: the item at position `n`.
    At(usize),
    /// `name[]`: the collection itself, reacting to membership changes.
    Any,
}

/// One `.`-separated part of a path.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Segment {
    pub field: Rc<str>,
    pub index: Option<Index>,
}

impl Segment {
    /// Apply this segment's index to the value read from its field.
    pub fn index_into(&self, value: Value) -> Value {
        match self.index {
            Some(Index::At(index)) => value.item(index),
            Some(Index::Any) | None => value,
        }
    }

    /// Read this segment's field from `value` and apply the index.
    pub fn apply(&self, value: &Value) -> Value {
        self.index_into(value.field(&self.field))
    }
}

/// A parsed path expression.
///
/// Equality and hashing use the source text.
#[derive(Clone)]
pub struct PathExpression {
    source: Rc<str>,
    segments: Rc<[Segment]>,
}

impl PathExpression {
    pub fn parse(source: &str) -> Result<Self> {
        let source = source.trim();
        let invalid = || BindError::grammar(GrammarKind::Path, source);
        if source.is_empty() {
            return Err(invalid());
        }

        let segments = source
            .split('.')
            .map(|part| {
                let captures = SEGMENT.captures(part).ok_or_else(invalid)?;
                let field: Rc<str> = captures[1].into();
                let index = match captures.get(2).map(|m| m.as_str()) {
                    None => None,
                    Some("") => Some(Index::Any),
                    Some(digits) => Some(Index::At(digits.parse().map_err(|_| invalid())?)),
                };
                Ok(Segment { field, index })
            })
            .collect::<Result<Rc<[Segment]>>>()?;

        Ok(Self {
            source: source.into(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub(crate) fn source(&self) -> Rc<str> {
        self.source.clone()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub(crate) fn shared_segments(&self) -> Rc<[Segment]> {
        self.segments.clone()
    }

    /// The field named by the first segment.
    pub fn root_field(&self) -> &str {
        // parse guarantees at least one segment
        self.segments.first().map_or("", |s| &s.field)
    }

    /// Whether any segment uses `[]`.
    pub fn is_wildcard(&self) -> bool {
        self.segments.iter().any(|s| s.index == Some(Index::Any))
    }

    /// Resolve every segment but the first against `root`, the value the first
    /// segment already produced.
    pub fn resolve_rest(&self, root: Value) -> Value {
        descend(root, self.segments.get(1..).unwrap_or_default())
    }

    /// Resolve the whole expression against a value.
    pub fn resolve_in(&self, root: &Value) -> Value {
        match self.segments.split_first() {
            Some((first, rest)) => descend(first.apply(root), rest),
            None => Value::Null,
        }
    }
}

/// Walk `segments` starting at `value`, short-circuiting on `Null`.
pub(crate) fn descend(mut value: Value, segments: &[Segment]) -> Value {
    for segment in segments {
        if value.is_null() {
            break;
        }
        value = segment.apply(&value);
    }
    value
}

impl FromStr for PathExpression {
    type Err = BindError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl PartialEq for PathExpression {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for PathExpression {}

impl hash::Hash for PathExpression {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.source.hash(state);
    }
}

impl fmt::Display for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl fmt::Debug for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PathExpression({:?})", &*self.source)
    }
}
