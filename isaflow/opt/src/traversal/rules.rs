//! Whole-node rewrites composed out of independent rules.
use super::{Action, VisResult};
use isaflow_ir::{Graph, NodeFilter, NodeId};
use isaflow_utils::IsaResult;
use log::{debug, trace};

/// A rewrite of a single node.
pub trait NodeRule {
    fn name(&self) -> &'static str;

    /// The node shapes this rule is tried on.
    fn accepts(&self) -> NodeFilter;

    /// Rewrite the node `id`. Returning [Action::Continue] declines the node.
    fn apply(&mut self, graph: &mut Graph, id: NodeId) -> VisResult;
}

/// An ordered list of [NodeRule]s.
///
/// A node is offered to every rule that accepts its kind, in the order the
/// rules were added, until one of them returns something other than
/// [Action::Continue].
#[derive(Default)]
pub struct RuleSet {
    rules: Vec<Box<dyn NodeRule>>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<R: NodeRule + 'static>(mut self, rule: R) -> Self {
        self.add(rule);
        self
    }

    pub fn add<R: NodeRule + 'static>(&mut self, rule: R) {
        self.rules.push(Box::new(rule));
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run the accepting rules on `id` and return the first decision. The
    /// action is not performed.
    pub fn visit(&mut self, graph: &mut Graph, id: NodeId) -> VisResult {
        let kind = graph.kind(id).kind();
        for rule in &mut self.rules {
            if !rule.accepts().matches(kind) {
                continue;
            }
            let action = rule.apply(graph, id)?;
            if action != Action::Continue {
                trace!("{}: rule `{}` fired on {id}", graph.name(), rule.name());
                return Ok(action);
            }
        }
        Ok(Action::Continue)
    }

    /// Apply the rules to every live node of `graph` until none of them
    /// fires. Returns the number of rewrites.
    pub fn run(&mut self, graph: &mut Graph) -> IsaResult<usize> {
        let mut rewrites = 0;
        loop {
            let mut changed = false;
            for id in graph.snapshot() {
                if !graph.is_active(id) {
                    continue;
                }
                let rewritten = match self.visit(graph, id)? {
                    Action::Continue => false,
                    Action::Stop => {
                        debug!(
                            "{}: rules stopped after {rewrites} rewrite(s)",
                            graph.name()
                        );
                        return Ok(rewrites);
                    }
                    // A replacement that deduplicates back to the node
                    // itself is no rewrite.
                    Action::Change(new) => graph.replace_and_delete(id, new)? != id,
                    action @ Action::Delete => action.apply(graph, id)?,
                };
                if rewritten {
                    changed = true;
                    rewrites += 1;
                }
            }
            if !changed {
                return Ok(rewrites);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isaflow_ir::{Builder, BuiltIn, Family, Kind, NodeKind, Type};

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    /// `x + 0 -> x`
    struct AddZero;

    impl NodeRule for AddZero {
        fn name(&self) -> &'static str {
            "add-zero"
        }

        fn accepts(&self) -> NodeFilter {
            Kind::BuiltInCall.into()
        }

        fn apply(&mut self, graph: &mut Graph, id: NodeId) -> VisResult {
            let NodeKind::BuiltInCall(call) = graph.kind(id) else {
                return Ok(Action::Continue);
            };
            if call.op != BuiltIn::Add {
                return Ok(Action::Continue);
            }
            let (lhs, rhs) = (call.args[0], call.args[1]);
            match graph.kind(rhs) {
                NodeKind::Const(c) if c.value.is_zero() => Ok(Action::Change(lhs)),
                _ => Ok(Action::Continue),
            }
        }
    }

    /// Declines every value.
    struct Decline;

    impl NodeRule for Decline {
        fn name(&self) -> &'static str {
            "decline"
        }

        fn accepts(&self) -> NodeFilter {
            Family::Value.into()
        }

        fn apply(&mut self, _: &mut Graph, _: NodeId) -> VisResult {
            Ok(Action::Continue)
        }
    }

    #[test]
    fn rules_run_to_a_fixpoint() {
        init_logging();
        let ty = Type::UInt(8);
        let mut g = Graph::new("f");
        let mut b = Builder::new(&mut g);
        let x = b.param("x", ty).unwrap();
        let zero = b.constant(0, ty).unwrap();
        let inner = b.builtin(BuiltIn::Add, &[x, zero]).unwrap();
        let outer = b.builtin(BuiltIn::Add, &[inner, zero]).unwrap();
        let ret = b.ret(outer).unwrap();

        let mut rules = RuleSet::new().with(Decline).with(AddZero);
        assert_eq!(rules.len(), 2);
        assert_eq!(rules.run(&mut g).unwrap(), 2);
        assert_eq!(g.inputs(ret), vec![Some(x)]);
        assert!(!g.is_active(inner));
        assert!(!g.is_active(outer));
    }

    /// Rebuilds every constant from scratch.
    struct Rebuild;

    impl NodeRule for Rebuild {
        fn name(&self) -> &'static str {
            "rebuild"
        }

        fn accepts(&self) -> NodeFilter {
            Kind::Const.into()
        }

        fn apply(&mut self, graph: &mut Graph, id: NodeId) -> VisResult {
            let kind = graph.kind(id).clone();
            Ok(Action::Change(graph.detached(kind)))
        }
    }

    #[test]
    fn replacements_equal_to_the_node_are_not_rewrites() {
        init_logging();
        let ty = Type::UInt(8);
        let mut g = Graph::new("f");
        let mut b = Builder::new(&mut g);
        let one = b.constant(1, ty).unwrap();
        let ret = b.ret(one).unwrap();

        let mut rules = RuleSet::new().with(Rebuild);
        assert_eq!(rules.run(&mut g).unwrap(), 0);
        assert!(g.is_active(one));
        assert_eq!(g.inputs(ret), vec![Some(one)]);
    }

    /// Deletes the reads of `TMP`.
    struct DropTmp;

    impl NodeRule for DropTmp {
        fn name(&self) -> &'static str {
            "drop-tmp"
        }

        fn accepts(&self) -> NodeFilter {
            Kind::ReadReg.into()
        }

        fn apply(&mut self, graph: &mut Graph, id: NodeId) -> VisResult {
            match graph.kind(id) {
                NodeKind::ReadReg(r) if r.reg == "TMP" => Ok(Action::Delete),
                _ => Ok(Action::Continue),
            }
        }
    }

    #[test]
    fn delete_removes_unused_nodes() {
        init_logging();
        let ty = Type::UInt(8);
        let mut g = Graph::new("I");
        let mut b = Builder::new(&mut g);
        let tmp = b.read_reg("TMP", ty).unwrap();
        let a = b.read_reg("A", ty).unwrap();
        let end = b.instr_end(&[]).unwrap();
        b.straight_line(end).unwrap();

        let mut rules = RuleSet::new().with(DropTmp);
        assert_eq!(rules.run(&mut g).unwrap(), 1);
        assert_eq!(g.nodes_of(Kind::ReadReg).collect::<Vec<_>>(), vec![a]);
        assert!(g.get(tmp).unwrap().is_deleted());
    }

    #[test]
    fn delete_fails_on_used_nodes() {
        init_logging();
        let ty = Type::UInt(8);
        let mut g = Graph::new("I");
        let mut b = Builder::new(&mut g);
        let tmp = b.read_reg("TMP", ty).unwrap();
        let write = b.write_reg("A", tmp, None).unwrap();
        let end = b.instr_end(&[write]).unwrap();
        b.straight_line(end).unwrap();

        let err = RuleSet::new().with(DropTmp).run(&mut g).unwrap_err();
        assert!(err.is_internal());
        assert!(err.to_string().contains("still used"), "{err}");
        assert!(g.is_active(tmp));
        assert_eq!(g.nodes_of(Kind::ReadReg).collect::<Vec<_>>(), vec![tmp]);
    }
}
