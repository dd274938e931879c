use crate::traversal::{Action, Named, NodeRule, RuleSet, VisResult, Visitor};
use isaflow_ir::{
    self as ir, BuiltIn, Graph, Kind, NodeFilter, NodeId, NodeKind, Type,
};
use isaflow_utils::{Error, IsaResult};

/// Source and target type of the cast `id`, if it is one.
fn cast_types(graph: &Graph, id: NodeId) -> Option<(NodeId, Type, Type)> {
    let NodeKind::TypeCast(cast) = graph.kind(id) else {
        return None;
    };
    let from = graph.type_of(cast.value)?;
    Some((cast.value, from, cast.ty))
}

/// Casts between types of the same width only reinterpret bits.
struct SameWidth;

impl NodeRule for SameWidth {
    fn name(&self) -> &'static str {
        "same-width"
    }

    fn accepts(&self) -> NodeFilter {
        Kind::TypeCast.into()
    }

    fn apply(&mut self, graph: &mut Graph, id: NodeId) -> VisResult {
        match cast_types(graph, id) {
            Some((value, from, to)) if from.is_trivial_cast_to(&to) => {
                Ok(Action::Change(value))
            }
            _ => Ok(Action::Continue),
        }
    }
}

/// A cast to `Bool` tests the value against zero.
struct ToBool;

impl NodeRule for ToBool {
    fn name(&self) -> &'static str {
        "to-bool"
    }

    fn accepts(&self) -> NodeFilter {
        Kind::TypeCast.into()
    }

    fn apply(&mut self, graph: &mut Graph, id: NodeId) -> VisResult {
        let Some((value, from, Type::Bool)) = cast_types(graph, id) else {
            return Ok(Action::Continue);
        };
        let zero = graph.add(ir::Const {
            value: ir::Constant::new(0, from),
        })?;
        let test = graph.detached(ir::BuiltInCall {
            args: vec![value, zero],
            op: BuiltIn::Neq,
            ty: Type::Bool,
        });
        Ok(Action::Change(test))
    }
}

/// Narrowing casts keep the low bits.
struct Narrow;

impl NodeRule for Narrow {
    fn name(&self) -> &'static str {
        "narrow"
    }

    fn accepts(&self) -> NodeFilter {
        Kind::TypeCast.into()
    }

    fn apply(&mut self, graph: &mut Graph, id: NodeId) -> VisResult {
        match cast_types(graph, id) {
            Some((value, from, ty)) if from.width() > ty.width() => {
                Ok(Action::Change(graph.detached(ir::Truncate { value, ty })))
            }
            _ => Ok(Action::Continue),
        }
    }
}

/// Widening casts extend with the sign bit of signed values and with zeros
/// otherwise.
struct Widen;

impl NodeRule for Widen {
    fn name(&self) -> &'static str {
        "widen"
    }

    fn accepts(&self) -> NodeFilter {
        Kind::TypeCast.into()
    }

    fn apply(&mut self, graph: &mut Graph, id: NodeId) -> VisResult {
        match cast_types(graph, id) {
            Some((value, from, ty)) if from.width() < ty.width() => {
                let ext = if from.is_signed() {
                    graph.detached(ir::SignExtend { value, ty })
                } else {
                    graph.detached(ir::ZeroExtend { value, ty })
                };
                Ok(Action::Change(ext))
            }
            _ => Ok(Action::Continue),
        }
    }
}

/// Replaces every [ir::TypeCast] by the explicit operation it performs.
///
/// After this pass, casts only appear as [ir::ZeroExtend],
/// [ir::SignExtend] and [ir::Truncate] nodes or as comparisons against zero.
pub struct TypeCastElimination {
    rules: RuleSet,
}

impl Default for TypeCastElimination {
    fn default() -> Self {
        Self {
            rules: RuleSet::new()
                .with(SameWidth)
                .with(ToBool)
                .with(Narrow)
                .with(Widen),
        }
    }
}

impl Named for TypeCastElimination {
    fn name() -> &'static str {
        "type-cast-elimination"
    }

    fn description() -> &'static str {
        "replace type casts with extensions, truncations and comparisons"
    }
}

impl Visitor for TypeCastElimination {
    fn visit_type_cast(
        &mut self,
        cast: &ir::TypeCast,
        id: NodeId,
        graph: &mut Graph,
        _defs: &[ir::Definition],
    ) -> VisResult {
        let action = self.rules.visit(graph, id)?;
        if action == Action::Continue {
            // Only casts of untyped values are left.
            return Err(Error::pass_assumption(
                Self::name(),
                format!(
                    "cannot eliminate the cast of {} to {}: its input has no type",
                    cast.value, cast.ty
                ),
            )
            .with_pos(graph));
        }
        Ok(action)
    }
}

/// Check that no cast is left in `ctx`.
pub fn casts_eliminated(ctx: &ir::Context) -> IsaResult<()> {
    for def in &ctx.definitions {
        if let Some(id) = def.behavior.nodes_of(Kind::TypeCast).next() {
            return Err(Error::pass_assumption(
                TypeCastElimination::name(),
                format!("{id} in `{}` is still a type cast", def.name),
            )
            .with_pos(def));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ir::{Builder, Definition, Graph};

    fn instruction(from: Type, to: Type) -> (Definition, NodeId) {
        let mut g = Graph::new("CAST");
        let mut b = Builder::new(&mut g);
        let value = b.read_reg("A", from).unwrap();
        let cast = b.cast(value, to).unwrap();
        let write = b.write_reg("B", cast, None).unwrap();
        let end = b.instr_end(&[write]).unwrap();
        b.straight_line(end).unwrap();
        (Definition::instruction("CAST", g), write)
    }

    fn eliminate(from: Type, to: Type) -> (Definition, Kind) {
        let _ = env_logger::builder().is_test(true).try_init();
        let (def, write) = instruction(from, to);
        let mut ctx = ir::Context::new(vec![def]);
        TypeCastElimination::do_pass_default(&mut ctx).unwrap();
        casts_eliminated(&ctx).unwrap();
        let def = ctx.definitions.pop().unwrap();
        let value = def.behavior.inputs(write)[0].unwrap();
        let kind = def.behavior.kind(value).kind();
        (def, kind)
    }

    #[test]
    fn casts_become_explicit_operations() {
        let (_, kind) = eliminate(Type::UInt(8), Type::SInt(8));
        assert_eq!(kind, Kind::ReadReg);
        let (_, kind) = eliminate(Type::UInt(32), Type::UInt(8));
        assert_eq!(kind, Kind::Truncate);
        let (_, kind) = eliminate(Type::SInt(8), Type::SInt(32));
        assert_eq!(kind, Kind::SignExtend);
        let (_, kind) = eliminate(Type::UInt(8), Type::SInt(32));
        assert_eq!(kind, Kind::ZeroExtend);
    }

    #[test]
    fn bool_casts_compare_with_zero() {
        let (def, kind) = eliminate(Type::UInt(8), Type::Bool);
        assert_eq!(kind, Kind::BuiltInCall);
        let g = &def.behavior;
        let call = g.single_node_of(Kind::BuiltInCall).unwrap();
        let NodeKind::BuiltInCall(c) = g.kind(call) else {
            unreachable!()
        };
        assert_eq!(c.op, BuiltIn::Neq);
        assert_eq!(g.type_of(call), Some(Type::Bool));
        assert!(def.verify().is_empty());
    }
}
