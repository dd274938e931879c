//! Passes for the isaflow compiler.
mod canonicalize;
mod constant_folding;
mod dead_node_removal;
mod function_inliner;
mod type_cast_elimination;
mod verify;

pub use canonicalize::Canonicalize;
pub use constant_folding::ConstantFolding;
pub use dead_node_removal::DeadNodeRemoval;
pub use function_inliner::FunctionInliner;
pub use type_cast_elimination::{TypeCastElimination, casts_eliminated};
pub use verify::Verify;
