//! Helpers for traversing behavior graphs
mod action;
mod construct;
mod diagnostics;
mod post_order;
mod rules;
mod visitor;

pub use action::{Action, VisResult};
pub use construct::{ConstructVisitor, Named, ParseVal, PassOpt};
pub use diagnostics::DiagnosticPass;
pub use post_order::{DefTraversal, Order};
pub use rules::{NodeRule, RuleSet};
pub use visitor::{NodeOrder, Visitor};
