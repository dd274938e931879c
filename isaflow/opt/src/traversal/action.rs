//! Actions control the traversal of behavior graphs.
use isaflow_ir::{Graph, NodeId};
use isaflow_utils::IsaResult;
use log::trace;

/// Result of performing a visit.
pub type VisResult = IsaResult<Action>;

/// Action performed at the end of visiting a node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Action {
    /// Keep the node and continue the traversal.
    #[default]
    Continue,
    /// Abort the traversal of the current graph.
    Stop,
    /// Replace the node with the given one and delete it. The replacement is
    /// attached first if it is detached.
    Change(NodeId),
    /// Delete the node unless it was already deleted by the hook.
    Delete,
}

impl Action {
    /// Run the traversal specified by `next` if this traversal succeeds.
    /// If the result of this traversal is not `Action::Continue`, do not
    /// run `next()`.
    pub(super) fn and_then<F>(self, mut next: F) -> VisResult
    where
        F: FnMut() -> VisResult,
    {
        match self {
            Action::Continue => next(),
            Action::Change(_) | Action::Stop | Action::Delete => Ok(self),
        }
    }

    /// Perform the action on the node `id` of `graph`. Returns whether the
    /// traversal should go on.
    pub fn apply(self, graph: &mut Graph, id: NodeId) -> IsaResult<bool> {
        match self {
            Action::Continue => Ok(true),
            Action::Stop => Ok(false),
            Action::Change(new) => {
                let new = graph.replace_and_delete(id, new)?;
                trace!("{}: {id} changed to {new}", graph.name());
                Ok(true)
            }
            Action::Delete => {
                if !graph.get(id).is_some_and(|n| n.is_deleted()) {
                    graph.delete(id)?;
                }
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isaflow_ir::{Builder, Type};

    #[test]
    fn delete_is_a_no_op_on_deleted_nodes() {
        let mut g = Graph::new("f");
        let mut b = Builder::new(&mut g);
        let reg = b.read_reg("PC", Type::UInt(32)).unwrap();
        g.delete(reg).unwrap();
        assert!(Action::Delete.apply(&mut g, reg).unwrap());
        assert!(g.get(reg).unwrap().is_deleted());
    }

    #[test]
    fn change_replaces_users() {
        let mut g = Graph::new("f");
        let mut b = Builder::new(&mut g);
        let one = b.constant(1, Type::UInt(8)).unwrap();
        let two = b.constant(2, Type::UInt(8)).unwrap();
        let ret = b.ret(one).unwrap();
        assert!(Action::Change(two).apply(&mut g, one).unwrap());
        assert_eq!(g.inputs(ret), vec![Some(two)]);
        assert!(!g.is_active(one));
        assert!(!Action::Stop.apply(&mut g, two).unwrap());
    }
}
