use crate::traversal::{Action, Named, NodeOrder, VisResult, Visitor};
use isaflow_ir::{self as ir, Constant, Graph, NodeId, NodeKind, Type};
use log::debug;

/// Evaluates built-in calls, selects, slices and casts whose inputs are
/// constants and replaces them with the resulting constant. A select with a
/// constant condition is replaced by the chosen case.
///
/// Nodes are visited in dataflow order so that chains of constant
/// computations fold in a single traversal.
#[derive(Default)]
pub struct ConstantFolding {
    /// Number of nodes folded in the current definition.
    folded: u64,
}

impl Named for ConstantFolding {
    fn name() -> &'static str {
        "constant-folding"
    }

    fn description() -> &'static str {
        "evaluate operations on constant inputs"
    }
}

/// The constant `id` evaluates to, looking through `Let` bindings.
fn constant_of(graph: &Graph, id: NodeId) -> Option<Constant> {
    let mut cur = id;
    loop {
        match graph.kind(cur) {
            NodeKind::Const(c) => return Some(c.value),
            NodeKind::Let(l) => cur = l.value,
            _ => return None,
        }
    }
}

impl ConstantFolding {
    fn fold(&mut self, graph: &mut Graph, value: Option<Constant>) -> VisResult {
        let Some(value) = value else {
            return Ok(Action::Continue);
        };
        self.folded += 1;
        let c = graph.add(ir::Const { value })?;
        Ok(Action::Change(c))
    }

    /// Replace the single-input cast `id` with `f` applied to its constant
    /// input.
    fn fold_unary<F>(&mut self, graph: &mut Graph, id: NodeId, f: F) -> VisResult
    where
        F: FnOnce(Constant) -> Constant,
    {
        let value = graph
            .inputs(id)
            .first()
            .copied()
            .flatten()
            .and_then(|input| constant_of(graph, input));
        self.fold(graph, value.map(f))
    }
}

impl Visitor for ConstantFolding {
    fn node_order() -> NodeOrder {
        NodeOrder::Dataflow
    }

    fn visit_builtin_call(
        &mut self,
        call: &ir::BuiltInCall,
        _id: NodeId,
        graph: &mut Graph,
        _defs: &[ir::Definition],
    ) -> VisResult {
        let args = call
            .args
            .iter()
            .map(|a| constant_of(graph, *a))
            .collect::<Option<Vec<_>>>();
        let value = args.and_then(|args| call.op.eval(&args, call.ty));
        self.fold(graph, value)
    }

    fn visit_select(
        &mut self,
        select: &ir::Select,
        _id: NodeId,
        graph: &mut Graph,
        _defs: &[ir::Definition],
    ) -> VisResult {
        let Some(cond) = constant_of(graph, select.condition) else {
            return Ok(Action::Continue);
        };
        self.folded += 1;
        let chosen = if cond.is_zero() {
            select.false_case
        } else {
            select.true_case
        };
        Ok(Action::Change(chosen))
    }

    fn visit_slice(
        &mut self,
        slice: &ir::Slice,
        id: NodeId,
        graph: &mut Graph,
        _defs: &[ir::Definition],
    ) -> VisResult {
        self.fold_unary(graph, id, |c| c.slice(slice.hi, slice.lo, slice.ty))
    }

    fn visit_zero_extend(
        &mut self,
        ext: &ir::ZeroExtend,
        id: NodeId,
        graph: &mut Graph,
        _defs: &[ir::Definition],
    ) -> VisResult {
        // Reinterpret as unsigned first so that the sign bit is not copied.
        self.fold_unary(graph, id, |c| {
            c.cast_to(Type::UInt(c.ty().width())).cast_to(ext.ty)
        })
    }

    fn visit_sign_extend(
        &mut self,
        ext: &ir::SignExtend,
        id: NodeId,
        graph: &mut Graph,
        _defs: &[ir::Definition],
    ) -> VisResult {
        self.fold_unary(graph, id, |c| {
            c.cast_to(Type::SInt(c.ty().width())).cast_to(ext.ty)
        })
    }

    fn visit_truncate(
        &mut self,
        trunc: &ir::Truncate,
        id: NodeId,
        graph: &mut Graph,
        _defs: &[ir::Definition],
    ) -> VisResult {
        self.fold_unary(graph, id, |c| c.cast_to(trunc.ty))
    }

    fn visit_type_cast(
        &mut self,
        cast: &ir::TypeCast,
        id: NodeId,
        graph: &mut Graph,
        _defs: &[ir::Definition],
    ) -> VisResult {
        self.fold_unary(graph, id, |c| {
            if cast.ty == Type::Bool {
                Constant::bool(!c.is_zero())
            } else {
                c.cast_to(cast.ty)
            }
        })
    }

    fn finish(
        &mut self,
        def: &mut ir::Definition,
        _defs: &[ir::Definition],
    ) -> VisResult {
        if self.folded > 0 {
            debug!("{}: folded {} node(s)", def.name, self.folded);
        }
        Ok(Action::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ir::{Builder, BuiltIn, Definition, Kind};

    fn fold(g: Graph) -> Graph {
        let _ = env_logger::builder().is_test(true).try_init();
        let def = Definition::function("f", vec![], Type::UInt(8), g);
        let mut ctx = ir::Context::new(vec![def]);
        ConstantFolding::do_pass_default(&mut ctx).unwrap();
        ctx.definitions.pop().unwrap().behavior
    }

    fn returned(g: &Graph) -> Option<Constant> {
        let ret = g.single_node_of(Kind::Return)?;
        constant_of(g, g.inputs(ret)[0]?)
    }

    #[test]
    fn chains_fold_in_one_pass() {
        let ty = Type::UInt(8);
        let mut g = Graph::new("f");
        let mut b = Builder::new(&mut g);
        let two = b.constant(2, ty).unwrap();
        let three = b.constant(3, ty).unwrap();
        let prod = b.builtin(BuiltIn::Mul, &[two, three]).unwrap();
        let named = b.bind("six", prod).unwrap();
        let sum = b.builtin(BuiltIn::Add, &[named, three]).unwrap();
        let big = b.builtin(BuiltIn::Mul, &[sum, sum]).unwrap();
        let ret = b.ret(big).unwrap();
        b.straight_line(ret).unwrap();

        let g = fold(g);
        // 81 fits in 8 bits.
        assert_eq!(returned(&g), Some(Constant::new(81, ty)));
        assert!(g.nodes_of(Kind::BuiltInCall).next().is_none());
    }

    #[test]
    fn arithmetic_wraps_at_the_result_width() {
        let ty = Type::UInt(8);
        let mut g = Graph::new("f");
        let mut b = Builder::new(&mut g);
        let a = b.constant(200, ty).unwrap();
        let sum = b.builtin(BuiltIn::Add, &[a, a]).unwrap();
        let ret = b.ret(sum).unwrap();
        b.straight_line(ret).unwrap();
        assert_eq!(returned(&fold(g)), Some(Constant::new(144, ty)));
    }

    #[test]
    fn selects_with_constant_conditions_pick_a_case() {
        let ty = Type::UInt(8);
        let mut g = Graph::new("f");
        let mut b = Builder::new(&mut g);
        let x = b.param("x", ty).unwrap();
        let y = b.param("y", ty).unwrap();
        let yes = b.bool(true).unwrap();
        let sel = b.select(yes, x, y).unwrap();
        let ret = b.ret(sel).unwrap();
        b.straight_line(ret).unwrap();

        let g = fold(g);
        assert_eq!(g.inputs(ret), vec![Some(x)]);
        assert!(!g.is_active(sel));
    }

    #[test]
    fn extensions_respect_the_sign() {
        let mut g = Graph::new("f");
        let mut b = Builder::new(&mut g);
        let minus_one = b.constant(-1, Type::SInt(4)).unwrap();
        let zext = b.zero_extend(minus_one, Type::UInt(8)).unwrap();
        let sext = b.sign_extend(minus_one, Type::SInt(8)).unwrap();
        let low = b.slice(sext, 5, 2).unwrap();
        let ret = b.ret(zext).unwrap();
        b.straight_line(ret).unwrap();

        let g = fold(g);
        assert_eq!(returned(&g), Some(Constant::new(0x0f, Type::UInt(8))));
        let consts = g
            .nodes_of(Kind::Const)
            .filter_map(|c| constant_of(&g, c))
            .collect::<Vec<_>>();
        assert!(consts.contains(&Constant::new(-1, Type::SInt(8))));
        // Bits 5..2 of 0xff.
        assert!(consts.contains(&Constant::new(0xf, Type::SInt(4))));
        assert!(!g.is_active(low));
    }
}
