//! A small, forgiving markup parser and serializer.
//!
//! The parser understands elements, quoted/unquoted/bare attributes, text,
//! comments, doctype declarations, void elements and raw-text elements
//! (`script`, `style`). Unclosed elements are closed at the end of input and
//! stray closing tags are ignored.

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::{MarkupError, NodeId};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

fn is_raw_text(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&tag)
}

/// Parse `markup` into a list of detached top-level nodes.
pub fn parse_fragment(markup: &str) -> Result<Vec<NodeId>, MarkupError> {
    Parser::new(markup).parse()
}

/// Parse `markup` and return its first top-level element.
///
/// Any other top-level nodes are discarded. Returns `None` when the markup
/// contains no element.
pub fn parse_element(markup: &str) -> Result<Option<NodeId>, MarkupError> {
    let nodes = parse_fragment(markup)?;
    let mut first = None;
    for node in nodes {
        if first.is_none() && node.is_element() {
            first = Some(node);
        } else {
            node.remove();
        }
    }
    Ok(first)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn parse(mut self) -> Result<Vec<NodeId>, MarkupError> {
        let mut roots = Vec::new();
        // open elements, innermost last
        let mut stack: SmallVec<[(NodeId, String); 16]> = SmallVec::new();

        let result = self.parse_into(&mut roots, &mut stack);
        if let Err(err) = &result {
            tracing::debug!(%err, offset = self.pos, "discarding partially parsed markup");
            for node in &roots {
                node.remove();
            }
            for (node, _) in stack {
                node.remove();
            }
        }
        result.map(|()| roots)
    }

    fn parse_into(
        &mut self,
        roots: &mut Vec<NodeId>,
        stack: &mut SmallVec<[(NodeId, String); 16]>,
    ) -> Result<(), MarkupError> {
        while !self.eof() {
            let rest = self.rest();
            if rest.starts_with("<!--") {
                let end = rest[4..]
                    .find("-->")
                    .ok_or(MarkupError::UnterminatedComment { offset: self.pos })?;
                self.pos += 4 + end + 3;
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                let end = rest
                    .find('>')
                    .ok_or(MarkupError::UnexpectedEof { offset: self.pos })?;
                self.pos += end + 1;
            } else if rest.starts_with("</") {
                let start = self.pos;
                self.pos += 2;
                let tag = self.tag_name(start)?;
                self.skip_whitespace();
                if self.bump() != Some('>') {
                    return Err(MarkupError::UnexpectedEof { offset: start });
                }
                if let Some(depth) = stack.iter().rposition(|(_, t)| *t == tag) {
                    stack.truncate(depth);
                }
            } else if rest.starts_with('<')
                && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic())
            {
                let start = self.pos;
                self.pos += 1;
                let tag = self.tag_name(start)?;
                let (attributes, self_closing) = self.attributes(start)?;
                let node = NodeId::element_with(tag.clone(), attributes);
                attach(stack, roots, node);

                if self_closing || is_void(&tag) {
                    continue;
                }
                if is_raw_text(&tag) {
                    let close = format!("</{tag}");
                    let end = find_ascii_case_insensitive(self.rest(), &close)
                        .unwrap_or(self.rest().len());
                    let text = &self.rest()[..end];
                    if !text.is_empty() {
                        node.append_child(NodeId::text(text));
                    }
                    self.pos += end;
                    if !self.eof() {
                        let gt = self
                            .rest()
                            .find('>')
                            .ok_or(MarkupError::UnexpectedEof { offset: self.pos })?;
                        self.pos += gt + 1;
                    }
                    continue;
                }
                stack.push((node, tag));
            } else {
                let skip = rest.chars().next().map_or(1, char::len_utf8);
                let end = rest[skip..].find('<').map_or(rest.len(), |i| i + skip);
                let text = decode_entities(&rest[..end]);
                self.pos += end;
                attach(stack, roots, NodeId::text(&text));
            }
        }
        Ok(())
    }

    fn tag_name(&mut self, start: usize) -> Result<String, MarkupError> {
        let len = self
            .rest()
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == ':' || c == '_'))
            .unwrap_or(self.rest().len());
        if len == 0 {
            return Err(MarkupError::InvalidTagName { offset: start });
        }
        let name = self.rest()[..len].to_ascii_lowercase();
        self.pos += len;
        Ok(name)
    }

    fn attributes(
        &mut self,
        start: usize,
    ) -> Result<(IndexMap<String, String>, bool), MarkupError> {
        let mut attributes = IndexMap::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(MarkupError::UnexpectedEof { offset: start }),
                Some('>') => {
                    self.bump();
                    return Ok((attributes, false));
                }
                Some('/') if self.rest().starts_with("/>") => {
                    self.pos += 2;
                    return Ok((attributes, true));
                }
                Some('/') => {
                    self.bump();
                }
                Some(_) => {
                    let len = self
                        .rest()
                        .find(|c: char| c.is_whitespace() || matches!(c, '=' | '>' | '/'))
                        .unwrap_or(self.rest().len());
                    if len == 0 {
                        return Err(MarkupError::InvalidAttribute { offset: self.pos });
                    }
                    let name = self.rest()[..len].to_ascii_lowercase();
                    self.pos += len;
                    self.skip_whitespace();
                    let value = if self.peek() == Some('=') {
                        self.bump();
                        self.skip_whitespace();
                        self.attribute_value(start)?
                    } else {
                        String::new()
                    };
                    attributes.entry(name).or_insert(value);
                }
            }
        }
    }

    fn attribute_value(&mut self, start: usize) -> Result<String, MarkupError> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                let end = self
                    .rest()
                    .find(quote)
                    .ok_or(MarkupError::UnexpectedEof { offset: start })?;
                let value = decode_entities(&self.rest()[..end]);
                self.pos += end + 1;
                Ok(value)
            }
            Some(_) => {
                let len = self
                    .rest()
                    .find(|c: char| c.is_whitespace() || c == '>')
                    .unwrap_or(self.rest().len());
                let value = decode_entities(&self.rest()[..len]);
                self.pos += len;
                Ok(value)
            }
            None => Err(MarkupError::UnexpectedEof { offset: start }),
        }
    }
}

fn attach(stack: &[(NodeId, String)], roots: &mut Vec<NodeId>, node: NodeId) {
    match stack.last() {
        Some((parent, _)) => {
            parent.append_child(node);
        }
        None => roots.push(node),
    }
}

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
}

/// Decode the character references this parser supports.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').filter(|end| *end <= 10).and_then(|end| {
            let entity = &rest[1..end];
            let c = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" | "#39" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                    .and_then(char::from_u32),
            }?;
            Some((c, end + 1))
        });
        match decoded {
            Some((c, len)) => {
                out.push(c);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

pub(crate) fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}

fn escape_attribute(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

pub(crate) fn write_node(node: NodeId, out: &mut String) {
    if let Some(text) = node.text_value() {
        let raw = node
            .parent()
            .and_then(|p| p.tag())
            .is_some_and(|t| is_raw_text(&t));
        if raw {
            out.push_str(&text);
        } else {
            escape_text(&text, out);
        }
        return;
    }
    let Some(tag) = node.tag() else {
        return;
    };
    out.push('<');
    out.push_str(&tag);
    for (name, value) in node.attributes() {
        out.push(' ');
        out.push_str(&name);
        out.push_str("=\"");
        escape_attribute(&value, out);
        out.push('"');
    }
    out.push('>');
    if is_void(&tag) {
        return;
    }
    for child in node.children() {
        write_node(child, out);
    }
    out.push_str("</");
    out.push_str(&tag);
    out.push('>');
}
