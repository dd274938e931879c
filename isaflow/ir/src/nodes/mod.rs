//! The closed set of node kinds.
mod control;
mod dependency;
mod side_effect;

pub use control::{Begin, BranchEnd, If, InstrEnd, Merge, ProcEnd, Return, Start};
pub use dependency::{
    BuiltInCall, Const, FieldRef, FuncCall, FuncParam, Let, ReadMem, ReadReg,
    ReadRegFile, Select, SignExtend, Slice, Truncate, TypeCast, ZeroExtend,
};
pub use side_effect::{WriteMem, WriteReg, WriteRegFile};

use crate::{Family, NodeFields, NodeId, Slot, Type};
use std::fmt::Display;

/// Generates [NodeKind], the payload-free [Kind] tag and the family table.
macro_rules! node_kinds {
    ($($variant:ident => [$($fam:ident),*]),* $(,)?) => {
        /// Payload of a node. Derived equality and hashing compare the data
        /// fields and the identities of the edge targets.
        #[derive(Clone, Debug, PartialEq, Eq, Hash)]
        pub enum NodeKind {
            $($variant($variant),)*
        }

        /// Tag naming a [NodeKind] variant.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Kind {
            $($variant,)*
        }

        impl NodeKind {
            pub fn kind(&self) -> Kind {
                match self {
                    $(NodeKind::$variant(_) => Kind::$variant,)*
                }
            }

            fn fields(&self) -> &dyn NodeFields {
                match self {
                    $(NodeKind::$variant(n) => n,)*
                }
            }

            fn fields_mut(&mut self) -> &mut dyn NodeFields {
                match self {
                    $(NodeKind::$variant(n) => n,)*
                }
            }
        }

        impl Kind {
            pub const ALL: &'static [Kind] = &[$(Kind::$variant),*];

            /// Families this kind belongs to, besides [Family::Any].
            pub fn families(&self) -> &'static [Family] {
                match self {
                    $(Kind::$variant => &[$(Family::$fam),*],)*
                }
            }

            pub fn name(&self) -> &'static str {
                match self {
                    $(Kind::$variant => stringify!($variant),)*
                }
            }
        }

        $(impl From<$variant> for NodeKind {
            fn from(node: $variant) -> Self {
                NodeKind::$variant(node)
            }
        })*
    };
}

node_kinds! {
    Start => [Control],
    Begin => [Control],
    If => [Control],
    Merge => [Control],
    BranchEnd => [Control, BlockEnd],
    Return => [Control, BlockEnd, Terminal],
    InstrEnd => [Control, BlockEnd, Terminal],
    ProcEnd => [Control, BlockEnd, Terminal],
    Const => [Dependency, Value, Unique],
    FuncParam => [Dependency, Value, Unique],
    FieldRef => [Dependency, Value, Unique],
    BuiltInCall => [Dependency, Value],
    FuncCall => [Dependency, Value],
    Select => [Dependency, Value],
    Slice => [Dependency, Value],
    Let => [Dependency, Value],
    ZeroExtend => [Dependency, Value, Cast],
    SignExtend => [Dependency, Value, Cast],
    Truncate => [Dependency, Value, Cast],
    TypeCast => [Dependency, Value, Cast],
    ReadReg => [Dependency, Value],
    ReadRegFile => [Dependency, Value],
    ReadMem => [Dependency, Value],
    WriteReg => [Dependency, SideEffect],
    WriteRegFile => [Dependency, SideEffect],
    WriteMem => [Dependency, SideEffect],
}

impl Kind {
    pub fn is_a(&self, family: Family) -> bool {
        family == Family::Any || self.families().contains(&family)
    }

    pub fn is_unique(&self) -> bool {
        self.is_a(Family::Unique)
    }
}

impl Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl NodeKind {
    pub fn is_a(&self, family: Family) -> bool {
        self.kind().is_a(family)
    }

    pub fn input_slots(&self) -> Vec<Slot> {
        let mut out = Vec::new();
        self.fields().input_slots(&mut out);
        out
    }

    pub fn successor_slots(&self) -> Vec<Slot> {
        let mut out = Vec::new();
        self.fields().successor_slots(&mut out);
        out
    }

    /// Targets of the input slots in declaration order, `None` for unset
    /// optional slots.
    pub fn inputs(&self) -> Vec<Option<NodeId>> {
        self.input_slots().into_iter().map(|s| s.target).collect()
    }

    /// Targets of the successor slots in declaration order.
    pub fn successors(&self) -> Vec<Option<NodeId>> {
        self.successor_slots().into_iter().map(|s| s.target).collect()
    }

    /// Every set edge target, inputs first. A target appears once per edge.
    pub fn edges(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.fields().input_slots(&mut out);
        self.fields().successor_slots(&mut out);
        out.into_iter().filter_map(|s| s.target).collect()
    }

    /// Overwrite the input slots positionally.
    pub fn assign_inputs<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = Option<NodeId>>,
    {
        self.fields_mut().assign_inputs(&mut values.into_iter())
    }

    /// Overwrite the successor slots positionally.
    pub fn assign_successors<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = Option<NodeId>>,
    {
        self.fields_mut()
            .assign_successors(&mut values.into_iter())
    }

    pub fn clear_successors(&mut self) {
        let n = self.successor_slots().len();
        self.assign_successors(std::iter::repeat_n(None, n))
    }

    /// The value type declared by the node itself. `Let` forwards the type
    /// of its value and is resolved by the graph.
    pub fn declared_type(&self) -> Option<Type> {
        match self {
            NodeKind::Const(c) => Some(c.value.ty()),
            NodeKind::FuncParam(FuncParam { ty, .. })
            | NodeKind::FieldRef(FieldRef { ty, .. })
            | NodeKind::BuiltInCall(BuiltInCall { ty, .. })
            | NodeKind::FuncCall(FuncCall { ty, .. })
            | NodeKind::Select(Select { ty, .. })
            | NodeKind::Slice(Slice { ty, .. })
            | NodeKind::ZeroExtend(ZeroExtend { ty, .. })
            | NodeKind::SignExtend(SignExtend { ty, .. })
            | NodeKind::Truncate(Truncate { ty, .. })
            | NodeKind::TypeCast(TypeCast { ty, .. })
            | NodeKind::ReadReg(ReadReg { ty, .. })
            | NodeKind::ReadRegFile(ReadRegFile { ty, .. })
            | NodeKind::ReadMem(ReadMem { ty, .. }) => Some(*ty),
            _ => None,
        }
    }
}

/// Selects nodes by exact kind or by family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeFilter {
    Exact(Kind),
    Family(Family),
}

impl NodeFilter {
    pub fn matches(&self, kind: Kind) -> bool {
        match self {
            NodeFilter::Exact(k) => *k == kind,
            NodeFilter::Family(f) => kind.is_a(*f),
        }
    }
}

impl From<Kind> for NodeFilter {
    fn from(kind: Kind) -> Self {
        NodeFilter::Exact(kind)
    }
}

impl From<Family> for NodeFilter {
    fn from(family: Family) -> Self {
        NodeFilter::Family(family)
    }
}
