//! Nodes forming the control-flow chain of a behavior.
use crate::{NodeId, define_node};

define_node! {
    /// Entry of a behavior.
    Start {
        inputs {}
        successors { next }
        data {}
    }
}

define_node! {
    /// Entry of a branch of an [If].
    Begin {
        inputs {}
        successors { next }
        data {}
    }
}

define_node! {
    /// Two-way branch on a boolean condition.
    If {
        inputs { condition: NodeId => Value }
        successors { true_branch, false_branch }
        data {}
    }
}

define_node! {
    /// Joins the branches ending in `branch_ends` and continues with `next`.
    Merge {
        inputs { branch_ends: Vec<NodeId> => BlockEnd }
        successors { next }
        data {}
    }
}

define_node! {
    /// End of a branch. Control continues at the [Merge] using it.
    BranchEnd {
        inputs { side_effects: Vec<NodeId> => SideEffect }
        successors {}
        data {}
    }
}

define_node! {
    /// End of a function body.
    Return {
        inputs { value: NodeId => Value }
        successors {}
        data {}
    }
}

define_node! {
    /// End of an instruction behavior.
    InstrEnd {
        inputs { side_effects: Vec<NodeId> => SideEffect }
        successors {}
        data {}
    }
}

define_node! {
    /// End of a pipeline stage behavior.
    ProcEnd {
        inputs { side_effects: Vec<NodeId> => SideEffect }
        successors {}
        data {}
    }
}
