use std::sync::atomic::{AtomicU64, Ordering};

/// A stable identifier for an observable object (a [`Model`](crate::Model) or a
/// [`Collection`](crate::Collection)).
///
/// Identifiers are never reused within a process, so they can be used as keys in
/// visited sets and caches without keeping the object alive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(u64);

impl ObjectId {
    pub(crate) fn next() -> ObjectId {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        ObjectId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw numeric value, mostly useful for log output.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}
