//! Value-producing nodes.
use crate::{BuiltIn, Constant, NodeId, Type, define_node};
use isaflow_utils::Id;

define_node! {
    /// A constant value.
    Const {
        inputs {}
        successors {}
        data { value: Constant }
    }
}

define_node! {
    /// Reference to a parameter of the enclosing function.
    FuncParam {
        inputs {}
        successors {}
        data { name: Id, ty: Type }
    }
}

define_node! {
    /// Reference to a field of the instruction format.
    FieldRef {
        inputs {}
        successors {}
        data { field: Id, ty: Type }
    }
}

define_node! {
    BuiltInCall {
        inputs { args: Vec<NodeId> => Value }
        successors {}
        data { op: BuiltIn, ty: Type }
    }
}

define_node! {
    /// Call of a function definition.
    FuncCall {
        inputs { args: Vec<NodeId> => Value }
        successors {}
        data { func: Id, ty: Type }
    }
}

define_node! {
    /// `condition ? true_case : false_case`
    Select {
        inputs {
            condition: NodeId => Value,
            true_case: NodeId => Value,
            false_case: NodeId => Value,
        }
        successors {}
        data { ty: Type }
    }
}

define_node! {
    /// Bits `hi` down to `lo` of `value`.
    Slice {
        inputs { value: NodeId => Value }
        successors {}
        data { hi: u32, lo: u32, ty: Type }
    }
}

define_node! {
    /// Names an intermediate value.
    Let {
        inputs { value: NodeId => Value }
        successors {}
        data { name: Id }
    }
}

define_node! {
    ZeroExtend {
        inputs { value: NodeId => Value }
        successors {}
        data { ty: Type }
    }
}

define_node! {
    SignExtend {
        inputs { value: NodeId => Value }
        successors {}
        data { ty: Type }
    }
}

define_node! {
    Truncate {
        inputs { value: NodeId => Value }
        successors {}
        data { ty: Type }
    }
}

define_node! {
    /// Conversion whose width behavior depends on the source and target
    /// types.
    TypeCast {
        inputs { value: NodeId => Value }
        successors {}
        data { ty: Type }
    }
}

define_node! {
    ReadReg {
        inputs {}
        successors {}
        data { reg: Id, ty: Type }
    }
}

define_node! {
    ReadRegFile {
        inputs { index: NodeId => Value }
        successors {}
        data { file: Id, ty: Type }
    }
}

define_node! {
    /// Reads `words` consecutive words starting at `address`.
    ReadMem {
        inputs { address: NodeId => Value }
        successors {}
        data { mem: Id, words: u32, ty: Type }
    }
}
