//! The node and edge model shared by every node kind.
use crate::impl_index;
use crate::NodeKind;
use smallvec::SmallVec;
use std::fmt::Display;
use std::sync::atomic::{AtomicU32, Ordering};

/// Index of a node inside the arena of its graph.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct NodeId(u32);
impl_index!(NodeId);

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Process-unique identity of a graph.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct GraphId(u32);

impl GraphId {
    /// A graph identity never handed out before.
    pub(crate) fn fresh() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(0);
        GraphId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl Display for GraphId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Process-unique identity of a node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct GlobalId {
    pub graph: GraphId,
    pub node: NodeId,
}

impl Display for GlobalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.graph, self.node)
    }
}

/// Supertypes of node kinds used for dispatch, filtering and slot typing.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Family {
    /// Matches every kind.
    Any,
    /// Nodes on the control-flow chain.
    Control,
    /// The node a behavior ends with.
    Terminal,
    /// Control nodes closing a block and collecting its side effects.
    BlockEnd,
    /// Nodes hanging off the control chain.
    Dependency,
    /// Dependencies producing a value.
    Value,
    /// Dependencies mutating architectural state.
    SideEffect,
    /// Width and type conversions.
    Cast,
    /// Kinds that are hash-consed in the structural pool.
    Unique,
}

/// Lifecycle state of a node.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NodeState {
    /// Created but not yet a member of the graph.
    Detached,
    Active,
    Deleted,
}

/// A node stored in the arena of a graph.
#[derive(Clone, Debug)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) state: NodeState,
    /// Graph the node is a member of. Absent while detached or deleted.
    pub(crate) graph: Option<GraphId>,
    /// One entry per incoming input or successor edge from an active node.
    pub(crate) usages: SmallVec<[NodeId; 4]>,
}

impl Node {
    pub(crate) fn detached(kind: NodeKind) -> Self {
        Self {
            kind,
            state: NodeState::Detached,
            graph: None,
            usages: SmallVec::new(),
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn graph(&self) -> Option<GraphId> {
        self.graph
    }

    pub fn is_active(&self) -> bool {
        self.state == NodeState::Active
    }

    pub fn is_deleted(&self) -> bool {
        self.state == NodeState::Deleted
    }

    pub fn usages(&self) -> &[NodeId] {
        &self.usages
    }
}

/// One edge slot of a node.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Slot {
    /// Name of the field declaring the slot.
    pub name: &'static str,
    pub target: Option<NodeId>,
    /// Whether the slot may be left unset.
    pub optional: bool,
    /// Family the target must belong to.
    pub family: Family,
}

/// A field of a node struct holding edges.
pub trait EdgeField {
    /// Append one [Slot] per edge held by the field.
    fn collect_slots(&self, name: &'static str, family: Family, out: &mut Vec<Slot>);

    /// Overwrite the edges of the field with the next values of `values`, in
    /// the order [EdgeField::collect_slots] reported them. Unset values are
    /// ignored for required slots.
    fn assign(&mut self, values: &mut dyn Iterator<Item = Option<NodeId>>);
}

impl EdgeField for NodeId {
    fn collect_slots(&self, name: &'static str, family: Family, out: &mut Vec<Slot>) {
        out.push(Slot {
            name,
            target: Some(*self),
            optional: false,
            family,
        })
    }

    fn assign(&mut self, values: &mut dyn Iterator<Item = Option<NodeId>>) {
        if let Some(Some(n)) = values.next() {
            *self = n;
        }
    }
}

impl EdgeField for Option<NodeId> {
    fn collect_slots(&self, name: &'static str, family: Family, out: &mut Vec<Slot>) {
        out.push(Slot {
            name,
            target: *self,
            optional: true,
            family,
        })
    }

    fn assign(&mut self, values: &mut dyn Iterator<Item = Option<NodeId>>) {
        if let Some(n) = values.next() {
            *self = n;
        }
    }
}

impl EdgeField for Vec<NodeId> {
    fn collect_slots(&self, name: &'static str, family: Family, out: &mut Vec<Slot>) {
        for n in self {
            n.collect_slots(name, family, out)
        }
    }

    fn assign(&mut self, values: &mut dyn Iterator<Item = Option<NodeId>>) {
        for n in self.iter_mut() {
            n.assign(values)
        }
    }
}

/// Edge declarations of a node struct. Implemented by [define_node].
pub trait NodeFields {
    fn input_slots(&self, out: &mut Vec<Slot>);
    fn successor_slots(&self, out: &mut Vec<Slot>);
    fn assign_inputs(&mut self, values: &mut dyn Iterator<Item = Option<NodeId>>);
    fn assign_successors(&mut self, values: &mut dyn Iterator<Item = Option<NodeId>>);
}

/// Declares a node struct together with its [NodeFields] implementation.
///
/// ```ignore
/// define_node! {
///     /// Reads a register file entry.
///     ReadRegFile {
///         inputs { index: NodeId => Value }
///         successors {}
///         data { file: Id, ty: Type }
///     }
/// }
/// ```
/// Input fields are [EdgeField]s typed by the given family. Successors are
/// optional control-flow edges.
#[macro_export]
macro_rules! define_node {
    (
        $(#[$meta:meta])*
        $name:ident {
            inputs { $($in:ident : $in_ty:ty => $fam:ident),* $(,)? }
            successors { $($succ:ident),* $(,)? }
            data { $($data:ident : $data_ty:ty),* $(,)? }
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash)]
        pub struct $name {
            $(pub $in: $in_ty,)*
            $(pub $succ: Option<$crate::NodeId>,)*
            $(pub $data: $data_ty,)*
        }

        impl $crate::NodeFields for $name {
            fn input_slots(&self, _out: &mut Vec<$crate::Slot>) {
                $($crate::EdgeField::collect_slots(
                    &self.$in,
                    stringify!($in),
                    $crate::Family::$fam,
                    _out,
                );)*
            }

            fn successor_slots(&self, _out: &mut Vec<$crate::Slot>) {
                $($crate::EdgeField::collect_slots(
                    &self.$succ,
                    stringify!($succ),
                    $crate::Family::Control,
                    _out,
                );)*
            }

            fn assign_inputs(
                &mut self,
                _values: &mut dyn Iterator<Item = Option<$crate::NodeId>>,
            ) {
                $($crate::EdgeField::assign(&mut self.$in, _values);)*
            }

            fn assign_successors(
                &mut self,
                _values: &mut dyn Iterator<Item = Option<$crate::NodeId>>,
            ) {
                $($crate::EdgeField::assign(&mut self.$succ, _values);)*
            }
        }
    };
}
