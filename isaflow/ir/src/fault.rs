//! Internal consistency faults raised by graph operations.
use crate::{Family, Kind, NodeId};
use isaflow_utils::Error;
use thiserror::Error;

/// A violated precondition of a graph operation. The graph is left unchanged
/// when an operation returns a fault.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphFault {
    #[error("cannot delete {node}: it is still used by {} edge(s)", .users.len())]
    HasUsages { node: NodeId, users: Vec<NodeId> },
    #[error("{0} was deleted")]
    Deleted(NodeId),
    #[error("{0} is not attached to the graph")]
    Detached(NodeId),
    #[error("{0} is attached to the graph and cannot be modified in place")]
    Attached(NodeId),
    #[error("required input `{slot}` of {node} is unset")]
    MissingInput { node: NodeId, slot: &'static str },
    #[error("slot `{slot}` of {node} expects a {expected:?} node but got {found}")]
    TypeMismatch {
        node: NodeId,
        slot: &'static str,
        expected: Family,
        found: Kind,
    },
    #[error("{new} cannot replace {old} because it depends on it")]
    SelfReplacement { old: NodeId, new: NodeId },
    #[error("{0} forms a cycle through its detached edges")]
    Cycle(NodeId),
    #[error("{0} does not belong to this graph")]
    UnknownNode(NodeId),
}

pub type FaultResult<T> = Result<T, GraphFault>;

impl From<GraphFault> for Error {
    fn from(fault: GraphFault) -> Self {
        Error::internal(fault.to_string())
    }
}
