use isaflow_ir::{Graph, NodeId};
use isaflow_utils::{Error, IsaResult};
use petgraph::{
    algo,
    graph::{DiGraph, NodeIndex},
};
use std::collections::HashMap;

/// An ordering of the live nodes of a graph in which every node comes after
/// the nodes its input edges point to. Successor edges are ignored.
pub struct DataflowOrder {
    order: Vec<NodeId>,
}

impl DataflowOrder {
    pub fn new(graph: &Graph) -> IsaResult<Self> {
        let mut gr: DiGraph<NodeId, ()> = DiGraph::new();
        let rev_map: HashMap<NodeId, NodeIndex> =
            graph.nodes().map(|id| (id, gr.add_node(id))).collect();

        for id in graph.nodes() {
            let idx = rev_map[&id];
            for input in graph.inputs(id).into_iter().flatten() {
                let Some(&src) = rev_map.get(&input) else {
                    return Err(Error::internal(format!(
                        "{id} reads {input}, which is not a live node of `{}`",
                        graph.name()
                    )));
                };
                gr.update_edge(src, idx, ());
            }
        }

        let order = algo::toposort(&gr, None).map_err(|cycle| {
            Error::malformed_structure(format!(
                "`{}`: {} depends on itself",
                graph.name(),
                gr[cycle.node_id()]
            ))
            .with_pos(graph)
        })?;
        Ok(Self {
            order: order.into_iter().map(|idx| gr[idx]).collect(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.order.iter().copied()
    }

    /// Position of each node in the order.
    pub fn positions(&self) -> HashMap<NodeId, usize> {
        self.order.iter().enumerate().map(|(i, id)| (*id, i)).collect()
    }

    pub fn take(self) -> Vec<NodeId> {
        self.order
    }
}
