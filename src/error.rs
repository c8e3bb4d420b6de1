use std::fmt;

use bindery_dom::MarkupError;
use thiserror::Error;

/// The binding grammar that failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrammarKind {
    Path,
    Class,
    Style,
    Subview,
    Repeater,
    Generator,
}

impl fmt::Display for GrammarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GrammarKind::Path => "path",
            GrammarKind::Class => "class binding",
            GrammarKind::Style => "style binding",
            GrammarKind::Subview => "subview binding",
            GrammarKind::Repeater => "repeater binding",
            GrammarKind::Generator => "generator definition",
        })
    }
}

#[derive(Debug, Error)]
pub enum BindError {
    #[error("invalid {kind}: \"{input}\"")]
    Grammar { kind: GrammarKind, input: String },

    #[error("no component class registered as \"{id}\"")]
    UnresolvedReference { id: String },

    #[error("component model must be an observable model or null")]
    MissingModel,

    #[error("component is not rendered")]
    NotRendered,

    #[error(transparent)]
    Markup(#[from] MarkupError),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl BindError {
    pub(crate) fn grammar(kind: GrammarKind, input: impl Into<String>) -> Self {
        BindError::Grammar {
            kind,
            input: input.into(),
        }
    }
}

pub type Result<T, E = BindError> = std::result::Result<T, E>;
