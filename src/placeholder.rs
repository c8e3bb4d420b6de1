//! `{expr}` placeholders embedded in text and attribute values.
//!
//! A placeholder is `{[:][%|@|!]path}`. The leading `:` marks a one-time value
//! that is substituted but never observed. The optional transform is applied to
//! the stringified value: `%` percent-encodes it like `encodeURIComponent`, `@`
//! escapes `& < > "` and `!` negates its truthiness. Braces that do not hold a
//! valid path are left in the output untouched.

use std::{ops::Range, sync::LazyLock};

use bindery_model::Value;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use regex::Regex;

use crate::path::PathExpression;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(:?)([%@!]?)([^{}]*)\}").expect("valid regex"));

// Everything encodeURIComponent escapes.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transform {
    UrlEncode,
    EscapeHtml,
    Negate,
}

impl Transform {
    fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "%" => Some(Transform::UrlEncode),
            "@" => Some(Transform::EscapeHtml),
            "!" => Some(Transform::Negate),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Placeholder {
    /// Byte range of the whole `{...}` in the source text.
    pub range: Range<usize>,
    pub one_time: bool,
    pub transform: Option<Transform>,
    pub path: PathExpression,
}

/// A string with its placeholders located.
#[derive(Clone, Debug)]
pub struct Interpolation {
    source: String,
    placeholders: Vec<Placeholder>,
}

impl Interpolation {
    /// Locate the placeholders in `source`. Returns `None` if there are none.
    pub fn parse(source: &str) -> Option<Self> {
        let placeholders: Vec<_> = PLACEHOLDER
            .captures_iter(source)
            .filter_map(|captures| {
                let whole = captures.get(0)?;
                let path = PathExpression::parse(&captures[3]).ok()?;
                Some(Placeholder {
                    range: whole.range(),
                    one_time: &captures[1] == ":",
                    transform: Transform::from_marker(&captures[2]),
                    path,
                })
            })
            .collect();

        (!placeholders.is_empty()).then(|| Self {
            source: source.to_string(),
            placeholders,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn placeholders(&self) -> &[Placeholder] {
        &self.placeholders
    }

    /// The paths that should be observed, without repeats.
    pub fn live_paths(&self) -> Vec<PathExpression> {
        let mut paths: Vec<PathExpression> = Vec::new();
        for placeholder in self.placeholders.iter().filter(|p| !p.one_time) {
            if !paths.contains(&placeholder.path) {
                paths.push(placeholder.path.clone());
            }
        }
        paths
    }

    /// Substitute every placeholder, taking values from `value_of`, which is
    /// given each placeholder and its position.
    pub fn substitute(&self, mut value_of: impl FnMut(usize, &Placeholder) -> Value) -> String {
        let mut out = String::with_capacity(self.source.len());
        let mut last = 0;
        for (position, placeholder) in self.placeholders.iter().enumerate() {
            out.push_str(&self.source[last..placeholder.range.start]);
            let value = value_of(position, placeholder);
            out.push_str(&format_value(value, placeholder.transform));
            last = placeholder.range.end;
        }
        out.push_str(&self.source[last..]);
        out
    }
}

/// Stringify a value for substitution. `Null` becomes the empty string before
/// the transform runs.
pub fn format_value(value: Value, transform: Option<Transform>) -> String {
    let value = if value.is_null() {
        Value::from("")
    } else {
        value
    };
    match transform {
        None => value.to_string(),
        Some(Transform::Negate) => (!value.is_truthy()).to_string(),
        Some(Transform::EscapeHtml) => escape_html(&value.to_string()),
        Some(Transform::UrlEncode) => {
            utf8_percent_encode(&value.to_string(), URI_COMPONENT).to_string()
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}
