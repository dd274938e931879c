use crate::traversal::{
    Action, ConstructVisitor, Named, Order, ParseVal, PassOpt, VisResult,
    Visitor,
};
use isaflow_ir::{self as ir, DefinitionKind, Family, Graph, Kind, NodeId, NodeKind};
use isaflow_utils::IsaResult;
use log::debug;
use std::collections::HashMap;

/// Inlines calls of pure functions.
///
/// A call is replaced by a copy of the value tree returned by the callee, in
/// which the references to the callee's parameters are replaced by the
/// arguments of the call. Definitions are visited in post-order so that the
/// callees have already been processed. Only functions without side effects
/// and with a single `Return` are inlined.
pub struct FunctionInliner {
    /// Callees with more live nodes than this are not inlined.
    max_nodes: Option<u64>,
    /// Number of calls inlined in the current definition.
    inlined: u64,
}

impl Named for FunctionInliner {
    fn name() -> &'static str {
        "function-inliner"
    }

    fn description() -> &'static str {
        "inline calls of pure functions"
    }

    fn opts() -> Vec<PassOpt> {
        vec![PassOpt::new(
            "max-nodes",
            "inline only functions with at most this many nodes. Negative values remove the limit",
            ParseVal::Num(256),
            PassOpt::parse_num,
        )]
    }
}

impl ConstructVisitor for FunctionInliner {
    fn from(ctx: &ir::Context) -> IsaResult<Self>
    where
        Self: Sized,
    {
        let opts = Self::get_opts(ctx);
        Ok(FunctionInliner {
            max_nodes: opts[&"max-nodes"].pos_num()?,
            inlined: 0,
        })
    }

    fn clear_data(&mut self) {
        self.inlined = 0;
    }
}

impl FunctionInliner {
    /// The value returned by `callee` and the mapping from its parameter
    /// references to `args`, if the callee can be inlined.
    fn inlinable(
        &self,
        callee: &ir::Definition,
        args: &[NodeId],
    ) -> Option<(NodeId, HashMap<NodeId, NodeId>)> {
        let g = &callee.behavior;
        if callee.kind != DefinitionKind::Function
            || callee.params.len() != args.len()
            || g.nodes_of(Family::SideEffect).next().is_some()
        {
            return None;
        }
        if let Some(max) = self.max_nodes {
            if g.len() as u64 > max {
                debug!("not inlining `{}`: {} nodes", callee.name, g.len());
                return None;
            }
        }
        let NodeKind::Return(ret) = g.kind(g.single_node_of(Kind::Return)?) else {
            return None;
        };

        let mut map = HashMap::new();
        for id in g.nodes_of(Kind::FuncParam) {
            let NodeKind::FuncParam(p) = g.kind(id) else {
                continue;
            };
            let idx = callee.params.iter().position(|d| d.name == p.name)?;
            map.insert(id, args[idx]);
        }
        Some((ret.value, map))
    }
}

impl Visitor for FunctionInliner {
    fn iteration_order() -> Order {
        Order::Post
    }

    fn visit_func_call(
        &mut self,
        call: &ir::FuncCall,
        _id: NodeId,
        graph: &mut Graph,
        defs: &[ir::Definition],
    ) -> VisResult {
        let Some(callee) = defs.iter().find(|d| d.name == call.func) else {
            return Ok(Action::Continue);
        };
        let Some((value, mut map)) = self.inlinable(callee, &call.args) else {
            return Ok(Action::Continue);
        };
        let copy = callee.behavior.copy_into(value, graph, &mut map)?;
        self.inlined += 1;
        Ok(Action::Change(copy))
    }

    fn finish(
        &mut self,
        def: &mut ir::Definition,
        _defs: &[ir::Definition],
    ) -> VisResult {
        if self.inlined > 0 {
            debug!("{}: inlined {} call(s)", def.name, self.inlined);
        }
        Ok(Action::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ir::{Builder, BuiltIn, Definition, Param, Type};

    const TY: Type = Type::UInt(8);

    /// `double(x) = x + x`
    fn double() -> Definition {
        let mut g = Graph::new("double");
        let mut b = Builder::new(&mut g);
        let x = b.param("x", TY).unwrap();
        let sum = b.builtin(BuiltIn::Add, &[x, x]).unwrap();
        let ret = b.ret(sum).unwrap();
        b.straight_line(ret).unwrap();
        Definition::function("double", vec![Param::new("x", TY)], TY, g)
    }

    /// `quad(y) = double(double(y))`
    fn quad() -> Definition {
        let mut g = Graph::new("quad");
        let mut b = Builder::new(&mut g);
        let y = b.param("y", TY).unwrap();
        let inner = b.call("double", &[y], TY).unwrap();
        let outer = b.call("double", &[inner], TY).unwrap();
        let ret = b.ret(outer).unwrap();
        b.straight_line(ret).unwrap();
        Definition::function("quad", vec![Param::new("y", TY)], TY, g)
    }

    /// `A := quad(A)`
    fn instruction() -> Definition {
        let mut g = Graph::new("QUAD");
        let mut b = Builder::new(&mut g);
        let a = b.read_reg("A", TY).unwrap();
        let res = b.call("quad", &[a], TY).unwrap();
        let write = b.write_reg("A", res, None).unwrap();
        let end = b.instr_end(&[write]).unwrap();
        b.straight_line(end).unwrap();
        Definition::instruction("QUAD", g)
    }

    fn run(ctx: &mut ir::Context) -> FunctionInliner {
        let _ = env_logger::builder().is_test(true).try_init();
        FunctionInliner::do_pass_default(ctx).unwrap()
    }

    #[test]
    fn nested_calls_are_flattened() {
        let mut ctx = ir::Context::new(vec![instruction(), quad(), double()]);
        run(&mut ctx);

        let instr = ctx.find("QUAD".into()).unwrap();
        let g = &instr.behavior;
        assert_eq!(g.nodes_of(Kind::FuncCall).count(), 0);
        assert_eq!(g.nodes_of(Kind::FuncParam).count(), 0);
        // (A + A) + (A + A)
        assert_eq!(g.nodes_of(Kind::BuiltInCall).count(), 2);
        let write = g.single_node_of(Kind::WriteReg).unwrap();
        let value = g.inputs(write)[0].unwrap();
        let NodeKind::BuiltInCall(outer) = g.kind(value) else {
            panic!("expected an addition, got {}", g.kind(value).kind());
        };
        assert_eq!(outer.args[0], outer.args[1]);
        assert!(instr.verify().is_empty());

        // Callees are left in place.
        let quad = ctx.find("quad".into()).unwrap();
        assert_eq!(quad.behavior.nodes_of(Kind::FuncCall).count(), 0);
    }

    #[test]
    fn large_and_impure_callees_stay_calls() {
        let mut ctx = ir::Context::new(vec![instruction(), quad(), double()]);
        ctx.extra_opts = vec!["function-inliner:max-nodes=2".to_string()];
        run(&mut ctx);
        let instr = ctx.find("QUAD".into()).unwrap();
        assert_eq!(instr.behavior.nodes_of(Kind::FuncCall).count(), 1);

        // A "function" writing a register.
        let mut g = Graph::new("poke");
        let mut b = Builder::new(&mut g);
        let x = b.param("x", TY).unwrap();
        b.write_reg("A", x, None).unwrap();
        let ret = b.ret(x).unwrap();
        b.straight_line(ret).unwrap();
        let poke = Definition::function("poke", vec![Param::new("x", TY)], TY, g);

        let mut g = Graph::new("USE");
        let mut b = Builder::new(&mut g);
        let a = b.read_reg("A", TY).unwrap();
        let res = b.call("poke", &[a], TY).unwrap();
        let write = b.write_reg("B", res, None).unwrap();
        let end = b.instr_end(&[write]).unwrap();
        b.straight_line(end).unwrap();
        let user = Definition::instruction("USE", g);

        let mut ctx = ir::Context::new(vec![user, poke]);
        run(&mut ctx);
        let user = ctx.find("USE".into()).unwrap();
        assert_eq!(user.behavior.nodes_of(Kind::FuncCall).count(), 1);
    }

    #[test]
    fn callee_constants_merge_with_the_caller() {
        // `add2(x) = (x + 1) + 1`
        let mut g = Graph::new("add2");
        let mut b = Builder::new(&mut g);
        let x = b.param("x", TY).unwrap();
        let one = b.constant(1, TY).unwrap();
        let inner = b.builtin(BuiltIn::Add, &[x, one]).unwrap();
        let outer = b.builtin(BuiltIn::Add, &[inner, one]).unwrap();
        let ret = b.ret(outer).unwrap();
        b.straight_line(ret).unwrap();
        let add2 = Definition::function("add2", vec![Param::new("x", TY)], TY, g);

        // `B := A + 1; C := add2(A)`
        let mut g = Graph::new("BUMP");
        let mut b = Builder::new(&mut g);
        let a = b.read_reg("A", TY).unwrap();
        let one = b.constant(1, TY).unwrap();
        let inc = b.builtin(BuiltIn::Add, &[a, one]).unwrap();
        let res = b.call("add2", &[a], TY).unwrap();
        let w1 = b.write_reg("B", inc, None).unwrap();
        let w2 = b.write_reg("C", res, None).unwrap();
        let end = b.instr_end(&[w1, w2]).unwrap();
        b.straight_line(end).unwrap();
        let bump = Definition::instruction("BUMP", g);

        let mut ctx = ir::Context::new(vec![bump, add2]);
        run(&mut ctx);
        let bump = ctx.find("BUMP".into()).unwrap();
        let g = &bump.behavior;
        assert_eq!(g.nodes_of(Kind::FuncCall).count(), 0);
        assert_eq!(g.nodes_of(Kind::Const).collect::<Vec<_>>(), vec![one]);
        assert_eq!(g.nodes_of(Kind::BuiltInCall).count(), 3);
        assert_eq!(g.users(one).len(), 3);
        assert!(bump.verify().is_empty());
    }
}
