use crate::traversal::{Action, Named, VisResult, Visitor};
use isaflow_ir::{self as ir, Family, Graph, Kind, NodeId, NodeKind};
use isaflow_utils::IsaResult;
use log::debug;
use std::collections::{HashMap, VecDeque};

/// Merges structurally equal nodes.
///
/// Unique nodes are deduplicated when they are attached, but rewrites can
/// leave several copies of the same pure computation around. Two nodes are
/// merged when they have the same payload, which includes the identity of
/// their inputs. Merging a node changes the payload of its users, so they are
/// queued again until nothing changes.
#[derive(Default)]
pub struct Canonicalize;

impl Named for Canonicalize {
    fn name() -> &'static str {
        "canonicalize"
    }

    fn description() -> &'static str {
        "merge structurally equal nodes"
    }
}

/// Nodes that can be merged without changing the behavior: unique nodes and
/// operations whose result only depends on their inputs.
fn mergeable(kind: Kind) -> bool {
    kind.is_a(Family::Unique)
        || kind.is_a(Family::Cast)
        || matches!(kind, Kind::BuiltInCall | Kind::Select | Kind::Slice)
}

impl Canonicalize {
    /// Merge the equal nodes of `graph`. Returns the number of nodes removed.
    pub fn run(graph: &mut Graph) -> IsaResult<u64> {
        let mut merged = 0;
        let mut seen: HashMap<NodeKind, NodeId> = HashMap::new();
        let mut worklist: VecDeque<NodeId> = graph
            .nodes()
            .filter(|id| mergeable(graph.kind(*id).kind()))
            .collect();

        while let Some(id) = worklist.pop_front() {
            if !graph.is_active(id) {
                continue;
            }
            let kind = graph.kind(id).clone();
            match seen.get(&kind) {
                // Entries whose node changed since they were recorded are
                // overwritten.
                Some(&canon)
                    if canon != id
                        && graph.is_active(canon)
                        && graph.kind(canon) == &kind =>
                {
                    let users = graph.users(id);
                    graph.replace_and_delete(id, canon)?;
                    merged += 1;
                    worklist.extend(
                        users
                            .into_iter()
                            .filter(|u| mergeable(graph.kind(*u).kind())),
                    );
                }
                _ => {
                    seen.insert(kind, id);
                }
            }
        }
        Ok(merged)
    }
}

impl Visitor for Canonicalize {
    fn start(
        &mut self,
        def: &mut ir::Definition,
        _defs: &[ir::Definition],
    ) -> VisResult {
        let merged = Self::run(&mut def.behavior)?;
        if merged > 0 {
            debug!("{}: merged {merged} node(s)", def.name);
        }
        Ok(Action::Stop)
    }
}
