use std::cell::RefCell;

use indexmap::IndexMap;
use slotmap::{SecondaryMap, SlotMap};

use crate::id::NodeId;

thread_local! {
    pub(crate) static DOM_STORAGE: RefCell<DomStorage> = Default::default();
}

pub(crate) enum NodeData {
    Element {
        tag: String,
        attributes: IndexMap<String, String>,
    },
    Text(String),
}

#[derive(Default)]
pub(crate) struct DomStorage {
    pub(crate) nodes: SlotMap<NodeId, NodeData>,
    pub(crate) children: SecondaryMap<NodeId, Vec<NodeId>>,
    // the parent of a node, absent for detached nodes
    pub(crate) parent: SecondaryMap<NodeId, NodeId>,
}

impl DomStorage {
    pub(crate) fn insert(&mut self, data: NodeData) -> NodeId {
        let id = self.nodes.insert(data);
        self.children.insert(id, Vec::new());
        id
    }

    /// Unlink `id` from its parent, leaving the subtree intact.
    pub(crate) fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.parent.remove(id)
            && let Some(children) = self.children.get_mut(parent)
        {
            children.retain(|c| *c != id);
        }
    }

    /// Detach `child` from wherever it is and insert it under `parent` at
    /// `index` (clamped to the child count).
    pub(crate) fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> bool {
        if parent == child || !self.nodes.contains_key(parent) || !self.nodes.contains_key(child) {
            return false;
        }
        if self.is_ancestor(child, parent) {
            return false;
        }
        self.detach(child);
        let Some(children) = self.children.get_mut(parent) else {
            return false;
        };
        let index = index.min(children.len());
        children.insert(index, child);
        self.parent.insert(child, parent);
        true
    }

    fn is_ancestor(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        while let Some(parent) = self.parent.get(node) {
            if *parent == ancestor {
                return true;
            }
            node = *parent;
        }
        false
    }

    /// Detach `id` and free it together with its whole subtree.
    pub(crate) fn dispose(&mut self, id: NodeId) {
        self.detach(id);
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            if let Some(children) = self.children.remove(node) {
                stack.extend(children);
            }
            self.parent.remove(node);
            self.nodes.remove(node);
        }
    }
}
