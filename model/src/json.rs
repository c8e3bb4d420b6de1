//! JSON serialization of model graphs.

use rustc_hash::FxHashSet;

use crate::id::ObjectId;

/// State threaded through a recursive serialization.
///
/// Holds the identities of the observable objects currently being serialized,
/// so a reference back to one of them is rendered as `null` instead of
/// recursing forever. Objects that are merely shared (reachable twice without a
/// cycle) are serialized each time they are reached.
#[derive(Debug, Default)]
pub struct SerializeCx {
    in_progress: FxHashSet<ObjectId>,
}

impl SerializeCx {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if `id` is already being serialized.
    pub(crate) fn enter(&mut self, id: ObjectId) -> bool {
        self.in_progress.insert(id)
    }

    pub(crate) fn exit(&mut self, id: ObjectId) {
        self.in_progress.remove(&id);
    }
}
