//! Hash-consing of unique nodes.
use crate::{NodeId, NodeKind};
use ahash::AHashMap;

/// Maps the structural signature of a unique node to its canonical instance.
///
/// The pool does not track node liveness. Callers must confirm that a hit
/// still refers to an active node with the probed signature, and treat it as
/// a miss otherwise.
#[derive(Default, Clone, Debug)]
pub struct StructuralPool {
    entries: AHashMap<NodeKind, NodeId>,
}

impl StructuralPool {
    pub fn get(&self, kind: &NodeKind) -> Option<NodeId> {
        self.entries.get(kind).copied()
    }

    /// Register `id` as the canonical node for `kind`, replacing any stale
    /// entry.
    pub fn insert(&mut self, kind: NodeKind, id: NodeId) {
        self.entries.insert(kind, id);
    }

    /// Forget `kind` if it is still mapped to `id`.
    pub fn remove(&mut self, kind: &NodeKind, id: NodeId) {
        if self.entries.get(kind) == Some(&id) {
            self.entries.remove(kind);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear()
    }
}
