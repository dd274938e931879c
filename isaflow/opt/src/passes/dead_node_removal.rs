use crate::traversal::{Action, Named, VisResult, Visitor};
use isaflow_ir::{self as ir, Family, Graph, NodeId};
use isaflow_utils::IsaResult;
use log::debug;

/// Removes value nodes that nothing uses.
///
/// Deleting a node can leave its inputs without users, so they are queued
/// in turn. Side effects and control nodes are never removed.
#[derive(Default)]
pub struct DeadNodeRemoval;

impl Named for DeadNodeRemoval {
    fn name() -> &'static str {
        "dead-node-removal"
    }

    fn description() -> &'static str {
        "delete unused value nodes"
    }
}

fn removable(graph: &Graph, id: NodeId) -> bool {
    let kind = graph.kind(id).kind();
    graph.is_active(id)
        && kind.is_a(Family::Dependency)
        && !kind.is_a(Family::SideEffect)
        && graph.usages(id).is_empty()
}

impl DeadNodeRemoval {
    /// Delete the unused values of `graph`. Returns the number of deleted
    /// nodes.
    pub fn run(graph: &mut Graph) -> IsaResult<u64> {
        let mut removed = 0;
        let mut worklist: Vec<NodeId> =
            graph.nodes().filter(|id| removable(graph, *id)).collect();
        while let Some(id) = worklist.pop() {
            // Queued twice when it lost several users.
            if !removable(graph, id) {
                continue;
            }
            let inputs = graph.inputs(id);
            graph.delete(id)?;
            removed += 1;
            worklist.extend(
                inputs
                    .into_iter()
                    .flatten()
                    .filter(|input| removable(graph, *input)),
            );
        }
        Ok(removed)
    }
}

impl Visitor for DeadNodeRemoval {
    fn start(
        &mut self,
        def: &mut ir::Definition,
        _defs: &[ir::Definition],
    ) -> VisResult {
        let removed = Self::run(&mut def.behavior)?;
        if removed > 0 {
            debug!(
                "{}: removed {removed} node(s), {} left",
                def.name,
                def.behavior.len()
            );
        }
        Ok(Action::Stop)
    }
}
