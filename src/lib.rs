//! # The isaflow compiler core
//!
//! This crate plumbs together the isaflow crates and provides the entry point
//! used by tools embedding the compiler: they lower their descriptions into
//! an [ir::Context] and hand it to [driver::run] together with the
//! command-line arguments meant for the compiler.
//!
//! Depend on [`isaflow_ir`] and [`isaflow_opt`] directly to build graphs or
//! write passes.
pub mod cmdline;
pub mod driver;

pub use isaflow_ir as ir;
pub use isaflow_opt as opt;
pub use isaflow_utils as utils;
