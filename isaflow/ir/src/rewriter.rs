use crate::{FaultResult, Graph, NodeId, NodeKind};
use isaflow_utils::Id;
use std::collections::HashMap;

/// Computes the new target of an edge.
///
/// Given the graph, the node owning the edge and the current target, return
/// the target the edge should point to. Returning the current target leaves
/// the edge unchanged.
pub trait EdgeRewriter {
    fn rewrite(
        &mut self,
        graph: &Graph,
        owner: NodeId,
        target: Option<NodeId>,
    ) -> Option<NodeId>;
}

impl<F> EdgeRewriter for F
where
    F: FnMut(&Graph, NodeId, Option<NodeId>) -> Option<NodeId>,
{
    fn rewrite(
        &mut self,
        graph: &Graph,
        owner: NodeId,
        target: Option<NodeId>,
    ) -> Option<NodeId> {
        self(graph, owner, target)
    }
}

#[derive(Default, Debug)]
/// Rewrites edges using substitution maps. Node rewrites are tried before
/// parameter rewrites.
pub struct Rewriter {
    /// Mapping from nodes to the nodes replacing them.
    pub node_map: HashMap<NodeId, NodeId>,
    /// Mapping from parameter names to the nodes replacing references to
    /// them.
    pub param_map: HashMap<Id, NodeId>,
}

impl Rewriter {
    /// Return the rewrite of `target`, if any.
    pub fn get(&self, graph: &Graph, target: NodeId) -> Option<NodeId> {
        if let Some(new) = self.node_map.get(&target) {
            return Some(*new);
        }
        if self.param_map.is_empty() {
            return None;
        }
        match graph.get(target).map(|n| n.kind()) {
            Some(NodeKind::FuncParam(p)) => self.param_map.get(&p.name).copied(),
            _ => None,
        }
    }

    /// Rewrite the input and successor edges of `id`.
    pub fn rewrite_node(&mut self, graph: &mut Graph, id: NodeId) -> FaultResult<bool> {
        let inputs = graph.apply_input_rewrite(id, self)?;
        let successors = graph.apply_successor_rewrite(id, self)?;
        Ok(inputs || successors)
    }

    /// Rewrite the edges of every active node of `graph`. Returns the number
    /// of nodes that changed.
    pub fn rewrite_graph(&mut self, graph: &mut Graph) -> FaultResult<usize> {
        let mut changed = 0;
        for id in graph.snapshot() {
            if graph.is_active(id) && self.rewrite_node(graph, id)? {
                changed += 1;
            }
        }
        Ok(changed)
    }
}

impl EdgeRewriter for Rewriter {
    fn rewrite(
        &mut self,
        graph: &Graph,
        _owner: NodeId,
        target: Option<NodeId>,
    ) -> Option<NodeId> {
        target.map(|t| self.get(graph, t).unwrap_or(t))
    }
}
