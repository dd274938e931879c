//! Analysis for isaflow passes.
//!
//! The analyses in this module are read-only views of a behavior graph that
//! passes compute before rewriting it.
mod dataflow_order;

pub use dataflow_order::DataflowOrder;
