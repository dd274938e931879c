//! # Passes over the isaflow IR
//!
//! Passes are implemented as [traversal::Visitor]s. A visitor is driven over
//! every [ir::Definition](isaflow_ir::Definition) of a context and receives
//! one hook call per live node of the behavior graph. Each hook returns an
//! [traversal::Action] that keeps, replaces or deletes the node.
//!
//! The [pass_manager::PassManager] registers passes by name and runs
//! pipelines of them; [PassManager::default_passes](pass_manager::PassManager::default_passes)
//! builds the standard set.
pub mod analysis;
pub mod default_passes;
pub mod pass_manager;
pub mod passes;
pub mod traversal;
