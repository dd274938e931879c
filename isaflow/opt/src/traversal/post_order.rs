use isaflow_ir::{self as ir, NodeKind};
use isaflow_utils::{Error, IsaResult};
use petgraph::algo;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// The order in which the definitions are traversed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Order {
    /// Use an arbitrary order.
    #[default]
    No,
    /// Traverse definitions in pre-order.
    Pre,
    /// Traverse definitions in post-order.
    Post,
}

/// Define traversal order of definitions: pre-order, post-order, or none.
///
/// ## No order
/// Iterates over the definitions in the order they were lowered.
///
/// ## Post-order
/// If a definition `B` calls the function `A` then `A` is guaranteed to be
/// visited before `B`. This is done by finding a topological order over a
/// graph where `A` has a directed edge to `B`. Recursive calls have no such
/// order and are reported as an error.
///
/// The traversal keeps an `order` vector of indices into the original
/// definition vector, so the definitions are returned in their input order
/// once the traversal is done.
///
/// ## Pre-order
/// Reverse of post-order
pub struct DefTraversal {
    /// A topological ordering of the definitions.
    order: Vec<NodeIndex>,
    /// Vector of definitions in the original ordering.
    defs: Vec<ir::Definition>,
}

impl DefTraversal {
    pub fn new(defs: Vec<ir::Definition>, order: Order) -> IsaResult<Self> {
        let schedule = Self::schedule(&defs, order)?;
        Ok(Self::with_schedule(defs, schedule))
    }

    /// Traverse `defs` in an order computed by [DefTraversal::schedule] for
    /// the same definitions.
    pub(super) fn with_schedule(
        defs: Vec<ir::Definition>,
        order: Vec<NodeIndex>,
    ) -> Self {
        Self { order, defs }
    }

    /// Compute the order of `defs` without taking ownership of them.
    pub(super) fn schedule(
        defs: &[ir::Definition],
        order: Order,
    ) -> IsaResult<Vec<NodeIndex>> {
        // If the order is not specified, keep the definitions in the original order.
        if order == Order::No {
            return Ok((0..defs.len()).map(NodeIndex::new).collect());
        }
        let mut graph: DiGraph<usize, ()> = DiGraph::new();
        // Reverse mapping from names to definitions.
        let rev_map: HashMap<ir::Id, NodeIndex> = defs
            .iter()
            .enumerate()
            .map(|(idx, d)| (d.name, graph.add_node(idx)))
            .collect();

        // Calls of unknown functions are reported by the verifier.
        for (idx, def) in defs.iter().enumerate() {
            for call in def.behavior.nodes_of(ir::Kind::FuncCall) {
                if let NodeKind::FuncCall(c) = def.behavior.kind(call) {
                    if let Some(callee) = rev_map.get(&c.func) {
                        graph.update_edge(*callee, NodeIndex::new(idx), ());
                    }
                }
            }
        }

        let mut topo = algo::toposort(&graph, None).map_err(|cycle| {
            let def = &defs[graph[cycle.node_id()]];
            Error::malformed_structure(format!(
                "function `{}` is recursive",
                def.name
            ))
            .with_pos(def)
        })?;

        // Reverse the order if a pre-order traversal is requested
        if order == Order::Pre {
            topo.reverse();
        }
        Ok(topo)
    }

    /// Traverses definitions in the chosen order and applies `upd`. The
    /// second argument of `upd` holds every other definition.
    pub fn apply_update<F>(&mut self, mut upd: F) -> IsaResult<()>
    where
        F: FnMut(&mut ir::Definition, &[ir::Definition]) -> IsaResult<()>,
    {
        for idx in self.order.iter() {
            let mut def = self.defs.remove(idx.index());
            let res = upd(&mut def, &self.defs);
            self.defs.insert(idx.index(), def);
            res?;
        }

        Ok(())
    }

    /// Returns the underlying definition vector in original order.
    pub fn take(self) -> Vec<ir::Definition> {
        self.defs
    }
}
