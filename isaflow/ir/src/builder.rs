//! Convenience methods for constructing behavior graphs.
use crate::{self as ir, BuiltIn, Constant, FaultResult, Graph, NodeId, Type};
use isaflow_utils::Id;
use log::trace;

/// IR builder.
/// Wraps a graph and attaches every node it creates.
pub struct Builder<'a> {
    /// Graph the nodes are added to.
    pub graph: &'a mut Graph,
}

impl<'a> Builder<'a> {
    pub fn new(graph: &'a mut Graph) -> Self {
        Self { graph }
    }

    /// Type of `value`, or `Bool` if it has none. Nodes without a type are
    /// rejected when the node using them is attached.
    fn type_of(&self, value: NodeId) -> Type {
        self.graph.type_of(value).unwrap_or(Type::Bool)
    }

    // ============ Values ============

    pub fn constant(&mut self, value: i128, ty: Type) -> FaultResult<NodeId> {
        self.graph.add(ir::Const {
            value: Constant::new(value, ty),
        })
    }

    pub fn bool(&mut self, value: bool) -> FaultResult<NodeId> {
        self.graph.add(ir::Const {
            value: Constant::bool(value),
        })
    }

    pub fn param<S: Into<Id>>(&mut self, name: S, ty: Type) -> FaultResult<NodeId> {
        self.graph.add(ir::FuncParam {
            name: name.into(),
            ty,
        })
    }

    pub fn field<S: Into<Id>>(&mut self, field: S, ty: Type) -> FaultResult<NodeId> {
        self.graph.add(ir::FieldRef {
            field: field.into(),
            ty,
        })
    }

    /// Apply `op` to `args`. Comparisons produce a `Bool`, everything else
    /// the type of the first argument.
    pub fn builtin(&mut self, op: BuiltIn, args: &[NodeId]) -> FaultResult<NodeId> {
        let ty = if op.is_comparison() {
            Type::Bool
        } else {
            args.first().map_or(Type::Bool, |a| self.type_of(*a))
        };
        self.builtin_with_type(op, args, ty)
    }

    pub fn builtin_with_type(
        &mut self,
        op: BuiltIn,
        args: &[NodeId],
        ty: Type,
    ) -> FaultResult<NodeId> {
        self.graph.add(ir::BuiltInCall {
            args: args.to_vec(),
            op,
            ty,
        })
    }

    pub fn call<S: Into<Id>>(
        &mut self,
        func: S,
        args: &[NodeId],
        ty: Type,
    ) -> FaultResult<NodeId> {
        self.graph.add(ir::FuncCall {
            args: args.to_vec(),
            func: func.into(),
            ty,
        })
    }

    pub fn select(
        &mut self,
        condition: NodeId,
        true_case: NodeId,
        false_case: NodeId,
    ) -> FaultResult<NodeId> {
        let ty = self.type_of(true_case);
        self.graph.add(ir::Select {
            condition,
            true_case,
            false_case,
            ty,
        })
    }

    /// Bits `hi` down to `lo` of `value`, keeping the kind of its type.
    pub fn slice(&mut self, value: NodeId, hi: u32, lo: u32) -> FaultResult<NodeId> {
        let ty = self.type_of(value).with_width(hi.saturating_sub(lo) + 1);
        self.graph.add(ir::Slice { value, hi, lo, ty })
    }

    pub fn bind<S: Into<Id>>(&mut self, name: S, value: NodeId) -> FaultResult<NodeId> {
        self.graph.add(ir::Let {
            value,
            name: name.into(),
        })
    }

    pub fn zero_extend(&mut self, value: NodeId, ty: Type) -> FaultResult<NodeId> {
        self.graph.add(ir::ZeroExtend { value, ty })
    }

    pub fn sign_extend(&mut self, value: NodeId, ty: Type) -> FaultResult<NodeId> {
        self.graph.add(ir::SignExtend { value, ty })
    }

    pub fn truncate(&mut self, value: NodeId, ty: Type) -> FaultResult<NodeId> {
        self.graph.add(ir::Truncate { value, ty })
    }

    pub fn cast(&mut self, value: NodeId, ty: Type) -> FaultResult<NodeId> {
        self.graph.add(ir::TypeCast { value, ty })
    }

    pub fn read_reg<S: Into<Id>>(&mut self, reg: S, ty: Type) -> FaultResult<NodeId> {
        self.graph.add(ir::ReadReg {
            reg: reg.into(),
            ty,
        })
    }

    pub fn read_reg_file<S: Into<Id>>(
        &mut self,
        file: S,
        index: NodeId,
        ty: Type,
    ) -> FaultResult<NodeId> {
        self.graph.add(ir::ReadRegFile {
            index,
            file: file.into(),
            ty,
        })
    }

    pub fn read_mem<S: Into<Id>>(
        &mut self,
        mem: S,
        address: NodeId,
        words: u32,
        ty: Type,
    ) -> FaultResult<NodeId> {
        self.graph.add(ir::ReadMem {
            address,
            mem: mem.into(),
            words,
            ty,
        })
    }

    // ============ Side effects ============

    pub fn write_reg<S: Into<Id>>(
        &mut self,
        reg: S,
        value: NodeId,
        condition: Option<NodeId>,
    ) -> FaultResult<NodeId> {
        self.graph.add(ir::WriteReg {
            value,
            condition,
            reg: reg.into(),
        })
    }

    pub fn write_reg_file<S: Into<Id>>(
        &mut self,
        file: S,
        index: NodeId,
        value: NodeId,
        condition: Option<NodeId>,
    ) -> FaultResult<NodeId> {
        self.graph.add(ir::WriteRegFile {
            index,
            value,
            condition,
            file: file.into(),
        })
    }

    pub fn write_mem<S: Into<Id>>(
        &mut self,
        mem: S,
        address: NodeId,
        value: NodeId,
        words: u32,
        condition: Option<NodeId>,
    ) -> FaultResult<NodeId> {
        self.graph.add(ir::WriteMem {
            address,
            value,
            condition,
            mem: mem.into(),
            words,
        })
    }

    // ============ Control flow ============

    pub fn start(&mut self, next: Option<NodeId>) -> FaultResult<NodeId> {
        self.graph.add(ir::Start { next })
    }

    pub fn begin(&mut self, next: Option<NodeId>) -> FaultResult<NodeId> {
        self.graph.add(ir::Begin { next })
    }

    pub fn branch(
        &mut self,
        condition: NodeId,
        true_branch: NodeId,
        false_branch: NodeId,
    ) -> FaultResult<NodeId> {
        self.graph.add(ir::If {
            condition,
            true_branch: Some(true_branch),
            false_branch: Some(false_branch),
        })
    }

    pub fn merge(
        &mut self,
        branch_ends: &[NodeId],
        next: Option<NodeId>,
    ) -> FaultResult<NodeId> {
        self.graph.add(ir::Merge {
            branch_ends: branch_ends.to_vec(),
            next,
        })
    }

    pub fn branch_end(&mut self, side_effects: &[NodeId]) -> FaultResult<NodeId> {
        self.graph.add(ir::BranchEnd {
            side_effects: side_effects.to_vec(),
        })
    }

    pub fn ret(&mut self, value: NodeId) -> FaultResult<NodeId> {
        self.graph.add(ir::Return { value })
    }

    pub fn instr_end(&mut self, side_effects: &[NodeId]) -> FaultResult<NodeId> {
        self.graph.add(ir::InstrEnd {
            side_effects: side_effects.to_vec(),
        })
    }

    pub fn proc_end(&mut self, side_effects: &[NodeId]) -> FaultResult<NodeId> {
        self.graph.add(ir::ProcEnd {
            side_effects: side_effects.to_vec(),
        })
    }

    /// Point the unset successor slots of `from` to `to`.
    pub fn link(&mut self, from: NodeId, to: NodeId) -> FaultResult<bool> {
        trace!("linking {from} -> {to}");
        self.graph.apply_successor_rewrite(
            from,
            &mut |_: &Graph, _: NodeId, t: Option<NodeId>| t.or(Some(to)),
        )
    }

    /// Start a straight-line behavior: `Start -> end`.
    pub fn straight_line(&mut self, end: NodeId) -> FaultResult<NodeId> {
        self.start(Some(end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Kind;

    #[test]
    fn builder_infers_result_types() {
        let mut g = Graph::new("i");
        let mut b = Builder::new(&mut g);
        let rs1 = b.field("rs1", Type::UInt(5)).unwrap();
        let x = b.read_reg_file("X", rs1, Type::SInt(32)).unwrap();
        let sum = b.builtin(BuiltIn::Add, &[x, x]).unwrap();
        let lt = b.builtin(BuiltIn::Slt, &[x, sum]).unwrap();
        let low = b.slice(sum, 7, 0).unwrap();
        let sel = b.select(lt, x, sum).unwrap();
        assert_eq!(g.type_of(sum), Some(Type::SInt(32)));
        assert_eq!(g.type_of(lt), Some(Type::Bool));
        assert_eq!(g.type_of(low), Some(Type::SInt(8)));
        assert_eq!(g.type_of(sel), Some(Type::SInt(32)));
    }

    #[test]
    fn link_fills_unset_successors() {
        let mut g = Graph::new("i");
        let mut b = Builder::new(&mut g);
        let start = b.start(None).unwrap();
        let end = b.instr_end(&[]).unwrap();
        assert!(b.link(start, end).unwrap());
        assert!(!b.link(start, end).unwrap());
        assert_eq!(g.successors(start), vec![Some(end)]);
        assert_eq!(g.predecessor(end), Some(start));
        assert_eq!(g.kind(end).kind(), Kind::InstrEnd);
    }
}
