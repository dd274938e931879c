//! Nodes writing architectural state. They are kept alive by the block end
//! collecting them.
use crate::{NodeId, define_node};
use isaflow_utils::Id;

define_node! {
    WriteReg {
        inputs {
            value: NodeId => Value,
            condition: Option<NodeId> => Value,
        }
        successors {}
        data { reg: Id }
    }
}

define_node! {
    WriteRegFile {
        inputs {
            index: NodeId => Value,
            value: NodeId => Value,
            condition: Option<NodeId> => Value,
        }
        successors {}
        data { file: Id }
    }
}

define_node! {
    /// Writes `words` consecutive words starting at `address`.
    WriteMem {
        inputs {
            address: NodeId => Value,
            value: NodeId => Value,
            condition: Option<NodeId> => Value,
        }
        successors {}
        data { mem: Id, words: u32 }
    }
}
