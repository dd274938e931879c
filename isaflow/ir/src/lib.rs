//! Graph intermediate representation for the isaflow compiler.
//!
//! Behaviors of functions, instructions and pipeline stages are lowered into
//! mutable directed graphs. The key properties of the representation are:
//! 1. Nodes are owned by the arena of their graph and refer to each other
//!    through [`NodeId`]s. Input edges carry data dependencies, successor
//!    edges carry control flow.
//! 2. The set of node kinds is closed ([`NodeKind`]). Passes dispatch on it
//!    exhaustively and can be written against [`Family`]s of kinds.
//! 3. Constants and references are hash-consed per graph through the
//!    [`StructuralPool`].

// Modules defining internal structures.
mod arena;
mod builder;
mod context;
mod definition;
mod fault;
mod graph;
mod node;
mod nodes;
mod pool;
mod printer;
mod types;
mod verify;

/// Modules to rewrite the IR
pub mod rewriter;

// Re-export types at the module level.
pub use arena::{IndexRef, IndexedMap};
pub use builder::Builder;
pub use context::Context;
pub use definition::{Definition, DefinitionKind, Param};
pub use fault::{FaultResult, GraphFault};
pub use graph::{Graph, NodesOf, Owner};
pub use isaflow_utils::{GetName, Id};
pub use node::{
    EdgeField, Family, GlobalId, GraphId, Node, NodeFields, NodeId, NodeState,
    Slot,
};
pub use nodes::{
    Begin, BranchEnd, BuiltInCall, Const, FieldRef, FuncCall, FuncParam, If,
    InstrEnd, Kind, Let, Merge, NodeFilter, NodeKind, ProcEnd, ReadMem, ReadReg,
    ReadRegFile, Return, Select, SignExtend, Slice, Start, Truncate, TypeCast,
    WriteMem, WriteReg, WriteRegFile, ZeroExtend,
};
pub use pool::StructuralPool;
pub use printer::Printer;
pub use rewriter::{EdgeRewriter, Rewriter};
pub use types::{BuiltIn, Constant, Type};
