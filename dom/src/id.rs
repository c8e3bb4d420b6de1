//! # `NodeId`s
//!
//! [`NodeId`]s are handles to nodes in the thread-local document storage. All
//! document operations go through them. Operations on a node that has been
//! removed are no-ops and reads return empty results.

use indexmap::IndexMap;
use slotmap::new_key_type;

use crate::{
    MarkupError, markup,
    storage::{DOM_STORAGE, NodeData},
};

new_key_type! {
    /// A small unique identifier for an element or text node.
    pub struct NodeId;
}

impl NodeId {
    /// Create a detached element with no attributes.
    pub fn element(tag: &str) -> NodeId {
        Self::element_with(tag.to_ascii_lowercase(), IndexMap::new())
    }

    pub(crate) fn element_with(tag: String, attributes: IndexMap<String, String>) -> NodeId {
        DOM_STORAGE.with_borrow_mut(|s| s.insert(NodeData::Element { tag, attributes }))
    }

    /// Create a detached text node.
    pub fn text(content: &str) -> NodeId {
        DOM_STORAGE.with_borrow_mut(|s| s.insert(NodeData::Text(content.to_string())))
    }

    /// Check if this node still exists.
    pub fn is_valid(&self) -> bool {
        DOM_STORAGE.with_borrow(|s| s.nodes.contains_key(*self))
    }

    pub fn is_element(&self) -> bool {
        DOM_STORAGE.with_borrow(|s| matches!(s.nodes.get(*self), Some(NodeData::Element { .. })))
    }

    pub fn is_text(&self) -> bool {
        DOM_STORAGE.with_borrow(|s| matches!(s.nodes.get(*self), Some(NodeData::Text(_))))
    }

    pub fn tag(&self) -> Option<String> {
        DOM_STORAGE.with_borrow(|s| match s.nodes.get(*self) {
            Some(NodeData::Element { tag, .. }) => Some(tag.clone()),
            _ => None,
        })
    }

    /// The content of a text node.
    pub fn text_value(&self) -> Option<String> {
        DOM_STORAGE.with_borrow(|s| match s.nodes.get(*self) {
            Some(NodeData::Text(text)) => Some(text.clone()),
            _ => None,
        })
    }

    /// The concatenated text of this node and all its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        if let Some(text) = self.text_value() {
            out.push_str(&text);
        }
        for child in self.children() {
            out.push_str(&child.text_content());
        }
        out
    }

    // ---------------------------------------------------------------------
    // Tree structure
    // ---------------------------------------------------------------------

    pub fn parent(&self) -> Option<NodeId> {
        DOM_STORAGE.with_borrow(|s| s.parent.get(*self).copied())
    }

    pub fn children(&self) -> Vec<NodeId> {
        DOM_STORAGE.with_borrow(|s| s.children.get(*self).cloned().unwrap_or_default())
    }

    pub fn element_children(&self) -> Vec<NodeId> {
        DOM_STORAGE.with_borrow(|s| {
            s.children
                .get(*self)
                .map(|children| {
                    children
                        .iter()
                        .copied()
                        .filter(|c| matches!(s.nodes.get(*c), Some(NodeData::Element { .. })))
                        .collect()
                })
                .unwrap_or_default()
        })
    }

    /// The node following this one under the same parent.
    pub fn next_sibling(&self) -> Option<NodeId> {
        DOM_STORAGE.with_borrow(|s| {
            let parent = s.parent.get(*self)?;
            let siblings = s.children.get(*parent)?;
            let index = siblings.iter().position(|c| c == self)?;
            siblings.get(index + 1).copied()
        })
    }

    pub fn append_child(&self, child: NodeId) -> bool {
        DOM_STORAGE.with_borrow_mut(|s| s.insert_child(*self, usize::MAX, child))
    }

    pub fn prepend_child(&self, child: NodeId) -> bool {
        DOM_STORAGE.with_borrow_mut(|s| s.insert_child(*self, 0, child))
    }

    /// Insert `child` at position `index` among all child nodes.
    pub fn insert_child(&self, index: usize, child: NodeId) -> bool {
        DOM_STORAGE.with_borrow_mut(|s| s.insert_child(*self, index, child))
    }

    /// Insert `child` so that it becomes the `index`th element child, counting
    /// element children only.
    pub fn insert_element_child(&self, index: usize, child: NodeId) -> bool {
        match self.element_children().get(index) {
            Some(reference) => self.insert_before(child, *reference),
            None => self.append_child(child),
        }
    }

    /// Insert `new` immediately before `reference`, which must be a child of
    /// this node.
    pub fn insert_before(&self, new: NodeId, reference: NodeId) -> bool {
        DOM_STORAGE.with_borrow_mut(|s| {
            if new == reference {
                return false;
            }
            s.detach(new);
            let Some(index) = s
                .children
                .get(*self)
                .and_then(|children| children.iter().position(|c| *c == reference))
            else {
                return false;
            };
            s.insert_child(*self, index, new)
        })
    }

    /// Put `new` where this node is, detaching this node.
    pub fn replace_with(&self, new: NodeId) -> bool {
        let Some(parent) = self.parent() else {
            return false;
        };
        parent.insert_before(new, *self) && {
            self.detach();
            true
        }
    }

    /// Unlink this node from its parent. The subtree stays alive.
    pub fn detach(&self) {
        DOM_STORAGE.with_borrow_mut(|s| s.detach(*self));
    }

    /// Detach this node and free it and all its descendants.
    pub fn remove(&self) {
        DOM_STORAGE.with_borrow_mut(|s| s.dispose(*self));
    }

    /// Free all child nodes.
    pub fn clear_children(&self) {
        for child in self.children() {
            child.remove();
        }
    }

    /// This node followed by all its descendants, in document order.
    pub fn descendants(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![*self];
        while let Some(node) = stack.pop() {
            if !node.is_valid() {
                continue;
            }
            out.push(node);
            let children = node.children();
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// This element and every descendant element that carries `attribute`.
    pub fn query_attribute(&self, attribute: &str) -> Vec<NodeId> {
        self.descendants()
            .into_iter()
            .filter(|n| n.has_attribute(attribute))
            .collect()
    }

    // ---------------------------------------------------------------------
    // Attributes
    // ---------------------------------------------------------------------

    pub fn attribute(&self, name: &str) -> Option<String> {
        DOM_STORAGE.with_borrow(|s| match s.nodes.get(*self) {
            Some(NodeData::Element { attributes, .. }) => attributes.get(name).cloned(),
            _ => None,
        })
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// All attributes in document order.
    pub fn attributes(&self) -> Vec<(String, String)> {
        DOM_STORAGE.with_borrow(|s| match s.nodes.get(*self) {
            Some(NodeData::Element { attributes, .. }) => attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            _ => Vec::new(),
        })
    }

    pub fn set_attribute(&self, name: &str, value: &str) {
        DOM_STORAGE.with_borrow_mut(|s| {
            if let Some(NodeData::Element { attributes, .. }) = s.nodes.get_mut(*self) {
                attributes.insert(name.to_ascii_lowercase(), value.to_string());
            }
        });
    }

    pub fn remove_attribute(&self, name: &str) -> bool {
        DOM_STORAGE.with_borrow_mut(|s| match s.nodes.get_mut(*self) {
            Some(NodeData::Element { attributes, .. }) => attributes.shift_remove(name).is_some(),
            _ => false,
        })
    }

    /// Set or clear a presence-only attribute such as `disabled`.
    pub fn set_flag_attribute(&self, name: &str, present: bool) {
        if present {
            self.set_attribute(name, "");
        } else {
            self.remove_attribute(name);
        }
    }

    // ---------------------------------------------------------------------
    // Classes
    // ---------------------------------------------------------------------

    pub fn classes(&self) -> Vec<String> {
        self.attribute("class")
            .map(|c| c.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().iter().any(|c| c == class)
    }

    /// Add a class. Returns `false` if it was already present.
    pub fn add_class(&self, class: &str) -> bool {
        let mut classes = self.classes();
        if class.is_empty() || classes.iter().any(|c| c == class) {
            return false;
        }
        classes.push(class.to_string());
        self.set_attribute("class", &classes.join(" "));
        true
    }

    pub fn remove_class(&self, class: &str) -> bool {
        let mut classes = self.classes();
        let before = classes.len();
        classes.retain(|c| c != class);
        if classes.len() == before {
            return false;
        }
        if classes.is_empty() {
            self.remove_attribute("class");
        } else {
            self.set_attribute("class", &classes.join(" "));
        }
        true
    }

    // ---------------------------------------------------------------------
    // Inline style
    // ---------------------------------------------------------------------

    /// The inline style declarations, in order.
    pub fn style(&self) -> Vec<(String, String)> {
        self.attribute("style")
            .map(|style| {
                style
                    .split(';')
                    .filter_map(|decl| {
                        let (name, value) = decl.split_once(':')?;
                        let name = name.trim();
                        (!name.is_empty())
                            .then(|| (name.to_ascii_lowercase(), value.trim().to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn style_property(&self, name: &str) -> Option<String> {
        self.style()
            .into_iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn set_style_property(&self, name: &str, value: &str) {
        let mut style = self.style();
        let name = name.to_ascii_lowercase();
        match style.iter_mut().find(|(n, _)| *n == name) {
            Some(decl) => decl.1 = value.to_string(),
            None => style.push((name, value.to_string())),
        }
        self.write_style(&style);
    }

    pub fn remove_style_property(&self, name: &str) {
        let mut style = self.style();
        style.retain(|(n, _)| n != name);
        self.write_style(&style);
    }

    fn write_style(&self, style: &[(String, String)]) {
        if style.is_empty() {
            self.remove_attribute("style");
            return;
        }
        let text = style
            .iter()
            .map(|(n, v)| format!("{n}: {v};"))
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attribute("style", &text);
    }

    // ---------------------------------------------------------------------
    // Content
    // ---------------------------------------------------------------------

    /// Replace the content of this element with the nodes parsed from `markup`.
    pub fn set_inner_markup(&self, markup: &str) -> Result<(), MarkupError> {
        let nodes = markup::parse_fragment(markup)?;
        self.clear_children();
        for node in nodes {
            self.append_child(node);
        }
        Ok(())
    }

    /// Replace the content of this element with a single text node.
    pub fn set_text_content(&self, text: &str) {
        self.clear_children();
        if !text.is_empty() {
            self.append_child(NodeId::text(text));
        }
    }

    pub fn set_text_value(&self, text: &str) {
        DOM_STORAGE.with_borrow_mut(|s| {
            if let Some(NodeData::Text(content)) = s.nodes.get_mut(*self) {
                *content = text.to_string();
            }
        });
    }

    pub fn inner_markup(&self) -> String {
        let mut out = String::new();
        for child in self.children() {
            markup::write_node(child, &mut out);
        }
        out
    }

    pub fn outer_markup(&self) -> String {
        let mut out = String::new();
        markup::write_node(*self, &mut out);
        out
    }
}
