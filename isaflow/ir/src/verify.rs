//! Consistency checks of behavior graphs and definitions.
//!
//! Verification never mutates and never stops at the first problem: every
//! check runs and reports all violations it finds.
use crate::{
    Definition, DefinitionKind, Family, Graph, Kind, NodeId, NodeKind,
};
use isaflow_utils::{DiagnosticContext, Error};
use petgraph::{Direction, algo, graphmap::DiGraphMap, visit::Dfs};
use std::collections::{HashMap, HashSet, hash_map::Entry};

struct Checker<'a> {
    graph: &'a Graph,
    diag: DiagnosticContext,
}

impl Checker<'_> {
    fn structure(&mut self, msg: String) {
        self.diag.err(
            Error::malformed_structure(format!("`{}`: {msg}", self.graph.name()))
                .with_pos(self.graph),
        )
    }

    fn control(&mut self, msg: String) {
        self.diag.err(
            Error::malformed_control(format!("`{}`: {msg}", self.graph.name()))
                .with_pos(self.graph),
        )
    }

    fn warn(&mut self, msg: String) {
        self.diag.warning(
            Error::misc(format!("`{}`: {msg}", self.graph.name()))
                .with_pos(self.graph),
        )
    }

    /// `n3 (Slice)`
    fn show(&self, id: NodeId) -> String {
        match self.graph.get(id) {
            Some(node) => format!("{id} ({})", node.kind().kind()),
            None => id.to_string(),
        }
    }

    fn width(&self, id: NodeId) -> Option<u32> {
        self.graph.type_of(id).map(|t| t.width())
    }

    /// Every edge of an active node points to an active node of the right
    /// family, and usages mirror the edges exactly.
    fn check_edges(&mut self) {
        let g = self.graph;
        let mut expected: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for id in g.nodes() {
            let kind = g.kind(id);
            for slot in kind.input_slots().into_iter().chain(kind.successor_slots()) {
                let Some(target) = slot.target else {
                    if !slot.optional {
                        self.structure(format!(
                            "required input `{}` of {} is unset",
                            slot.name,
                            self.show(id)
                        ));
                    }
                    continue;
                };
                expected.entry(target).or_default().push(id);
                match g.get(target) {
                    None => self.structure(format!(
                        "`{}` of {} points to unknown node {target}",
                        slot.name,
                        self.show(id)
                    )),
                    Some(node) if !node.is_active() => self.structure(format!(
                        "`{}` of {} points to {:?} node {}",
                        slot.name,
                        self.show(id),
                        node.state(),
                        self.show(target)
                    )),
                    Some(node) if !node.kind().is_a(slot.family) => {
                        self.structure(format!(
                            "`{}` of {} expects a {:?} node but got {}",
                            slot.name,
                            self.show(id),
                            slot.family,
                            self.show(target)
                        ))
                    }
                    Some(_) => {}
                }
            }
        }
        for id in g.nodes() {
            let mut have = g.usages(id).to_vec();
            have.sort();
            let mut want = expected.remove(&id).unwrap_or_default();
            want.sort();
            if have != want {
                self.structure(format!(
                    "usages of {} are {have:?} but its users are {want:?}",
                    self.show(id)
                ));
            }
        }
    }

    /// No two active unique nodes are structurally equal.
    fn check_unique(&mut self) {
        let g = self.graph;
        let mut seen: HashMap<&NodeKind, NodeId> = HashMap::new();
        for id in g.nodes_of(Family::Unique) {
            match seen.entry(g.kind(id)) {
                Entry::Occupied(first) => {
                    let first = *first.get();
                    self.structure(format!(
                        "{} duplicates unique node {first}",
                        self.show(id)
                    ))
                }
                Entry::Vacant(slot) => {
                    slot.insert(id);
                }
            }
        }
    }

    /// The graph ends in exactly one terminal of the kind its owner needs.
    fn check_terminal(&mut self) {
        let g = self.graph;
        let terminals: Vec<NodeId> = g.nodes_of(Family::Terminal).collect();
        let Some(owner) = g.owner() else {
            match terminals.len() {
                0 => self.control("graph has no terminal node".to_string()),
                1 => {}
                n => self.control(format!("graph has {n} terminal nodes")),
            }
            return;
        };
        let expected = owner.kind.terminal();
        let mut count = 0;
        for id in terminals {
            if g.kind(id).kind() == expected {
                count += 1;
            } else {
                self.control(format!(
                    "{} cannot end a {}",
                    self.show(id),
                    owner.kind
                ));
            }
        }
        match count {
            0 => self.control(format!("missing {expected} node")),
            1 => {}
            n => self.control(format!(
                "{n} {expected} nodes but exactly one is allowed"
            )),
        }
    }

    /// The control flow from the start node is an acyclic single-entry
    /// structure in which every path reaches a terminal.
    fn check_control_flow(&mut self) {
        let g = self.graph;
        let starts: Vec<NodeId> = g.nodes_of(Kind::Start).collect();
        if starts.len() > 1 {
            self.control(format!("graph has {} start nodes", starts.len()));
        }
        let Some(&start) = starts.first() else {
            return;
        };

        let mut cfg: DiGraphMap<NodeId, ()> = DiGraphMap::new();
        for id in g.nodes_of(Family::Control) {
            cfg.add_node(id);
            for succ in g.successors(id).into_iter().flatten() {
                cfg.add_edge(id, succ, ());
            }
            if g.kind(id).kind() == Kind::BranchEnd {
                for user in g.users(id) {
                    if g.kind(user).kind() == Kind::Merge {
                        cfg.add_edge(id, user, ());
                    }
                }
            }
        }

        for id in cfg.nodes() {
            let preds = cfg.neighbors_directed(id, Direction::Incoming).count();
            match g.kind(id).kind() {
                Kind::Merge => {}
                Kind::Start if preds > 0 => {
                    self.control(format!("{} has a predecessor", self.show(id)))
                }
                _ if preds > 1 => self.control(format!(
                    "{} has {preds} predecessors",
                    self.show(id)
                )),
                _ => {}
            }
        }
        if algo::is_cyclic_directed(&cfg) {
            self.control("control flow contains a cycle".to_string());
        }

        let mut reachable = HashSet::new();
        let mut dfs = Dfs::new(&cfg, start);
        while let Some(id) = dfs.next(&cfg) {
            reachable.insert(id);
            let kind = g.kind(id);
            if kind.is_a(Family::Terminal) {
                continue;
            }
            if kind.kind() == Kind::BranchEnd {
                let merges = cfg.neighbors_directed(id, Direction::Outgoing).count();
                if merges != 1 {
                    self.control(format!(
                        "{} must be joined by exactly one merge but has {merges}",
                        self.show(id)
                    ));
                }
                continue;
            }
            for slot in kind.successor_slots() {
                if slot.target.is_none() {
                    self.control(format!(
                        "control flow stops at {}: `{}` is unset",
                        self.show(id),
                        slot.name
                    ));
                }
            }
        }
        let mut unreachable =
            cfg.nodes().filter(|id| !reachable.contains(id)).collect::<Vec<_>>();
        unreachable.sort();
        for id in unreachable {
            self.warn(format!("{} is unreachable from {start}", self.show(id)));
        }
    }

    fn check_condition(&mut self, id: NodeId, cond: NodeId) {
        if let Some(w) = self.width(cond).filter(|w| *w != 1) {
            self.structure(format!(
                "condition of {} must be one bit wide but {} has {w} bits",
                self.show(id),
                self.show(cond)
            ))
        }
    }

    /// Invariants local to a single node kind.
    fn check_kinds(&mut self) {
        let g = self.graph;
        for id in g.nodes() {
            match g.kind(id) {
                NodeKind::If(i) => {
                    self.check_condition(id, i.condition);
                    for b in [i.true_branch, i.false_branch].into_iter().flatten() {
                        if g.kind(b).kind() != Kind::Begin {
                            self.control(format!(
                                "branches of {} must start with Begin, not {}",
                                self.show(id),
                                self.show(b)
                            ))
                        }
                    }
                }
                NodeKind::Merge(m) => {
                    if m.branch_ends.is_empty() {
                        self.control(format!("{} merges no branches", self.show(id)))
                    }
                    for end in &m.branch_ends {
                        if g.kind(*end).kind() != Kind::BranchEnd {
                            self.control(format!(
                                "{} can only merge BranchEnd nodes, not {}",
                                self.show(id),
                                self.show(*end)
                            ))
                        }
                    }
                }
                NodeKind::BuiltInCall(c) if c.args.len() != c.op.arity() => {
                    self.structure(format!(
                        "{} applies `{}` to {} arguments but it takes {}",
                        self.show(id),
                        c.op,
                        c.args.len(),
                        c.op.arity()
                    ))
                }
                NodeKind::Select(s) => {
                    self.check_condition(id, s.condition);
                    for case in [s.true_case, s.false_case] {
                        if let Some(w) =
                            self.width(case).filter(|w| *w != s.ty.width())
                        {
                            self.structure(format!(
                                "{} produces {} but case {} has {w} bits",
                                self.show(id),
                                s.ty,
                                self.show(case)
                            ))
                        }
                    }
                }
                NodeKind::Slice(s) => {
                    let width = self.width(s.value);
                    if s.hi < s.lo || width.is_some_and(|w| s.hi >= w) {
                        self.structure(format!(
                            "{} selects bits {}..{} out of range of {}",
                            self.show(id),
                            s.hi,
                            s.lo,
                            self.show(s.value)
                        ))
                    } else {
                        // `hi` may be the largest index, so count in u64.
                        let bits = u64::from(s.hi) - u64::from(s.lo) + 1;
                        if u64::from(s.ty.width()) != bits {
                            self.structure(format!(
                                "{} produces {} from {bits} bits",
                                self.show(id),
                                s.ty,
                            ))
                        }
                    }
                }
                NodeKind::ZeroExtend(crate::ZeroExtend { value, ty })
                | NodeKind::SignExtend(crate::SignExtend { value, ty }) => {
                    if let Some(w) = self.width(*value).filter(|w| *w > ty.width()) {
                        self.structure(format!(
                            "{} extends {w} bits to {ty}",
                            self.show(id)
                        ))
                    }
                }
                NodeKind::Truncate(t) => {
                    if let Some(w) = self.width(t.value).filter(|w| *w < t.ty.width()) {
                        self.structure(format!(
                            "{} truncates {w} bits to {}",
                            self.show(id),
                            t.ty
                        ))
                    }
                }
                NodeKind::WriteReg(crate::WriteReg { condition, .. })
                | NodeKind::WriteRegFile(crate::WriteRegFile { condition, .. })
                | NodeKind::WriteMem(crate::WriteMem { condition, .. }) => {
                    if let Some(cond) = condition {
                        self.check_condition(id, *cond)
                    }
                }
                _ => {}
            }
        }
    }
}

impl Graph {
    /// Check the graph invariants and report every violation.
    pub fn verify(&self) -> DiagnosticContext {
        let mut checker = Checker {
            graph: self,
            diag: DiagnosticContext::default(),
        };
        checker.check_edges();
        checker.check_unique();
        checker.check_terminal();
        checker.check_control_flow();
        checker.check_kinds();
        checker.diag
    }

    /// The subset of [Graph::verify] every transformation must preserve:
    /// edges and usages agree, unique nodes are unique and every node obeys
    /// the rules of its kind. Whether the control flow is complete is not
    /// checked.
    pub fn check_consistency(&self) -> DiagnosticContext {
        let mut checker = Checker {
            graph: self,
            diag: DiagnosticContext::default(),
        };
        checker.check_edges();
        checker.check_unique();
        checker.check_kinds();
        checker.diag
    }
}

impl Definition {
    /// Verify the behavior graph and the definition-level rules: functions
    /// are pure and return their declared type, and parameter references
    /// name declared parameters.
    pub fn verify(&self) -> DiagnosticContext {
        let mut diag = self.behavior.verify();
        let g = &self.behavior;
        let err = |msg: String| {
            Error::malformed_structure(format!("{} `{}`: {msg}", self.kind, self.name))
                .with_pos(self)
        };

        if self.kind == DefinitionKind::Function {
            for id in g.nodes_of(Family::SideEffect) {
                diag.err(err(format!(
                    "functions must be pure but {id} is a {}",
                    g.kind(id).kind()
                )));
            }
            if let Some(ret) = self.ret {
                for id in g.nodes_of(Kind::Return) {
                    let NodeKind::Return(r) = g.kind(id) else {
                        continue;
                    };
                    if let Some(ty) =
                        g.type_of(r.value).filter(|t| !t.is_trivial_cast_to(&ret))
                    {
                        diag.err(err(format!(
                            "returns a {ty} value but is declared to return {ret}"
                        )));
                    }
                }
            }
        }

        for id in g.nodes_of(Kind::FuncParam) {
            let NodeKind::FuncParam(p) = g.kind(id) else {
                continue;
            };
            match self.find_param(p.name) {
                None => diag.err(Error::undefined(p.name, "parameter").with_pos(self)),
                Some(decl) if decl.ty != p.ty => diag.err(err(format!(
                    "parameter `{}` is declared as {} but used as {}",
                    p.name, decl.ty, p.ty
                ))),
                Some(_) => {}
            }
        }
        diag
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Builder, BuiltIn, Param, Type};

    fn messages(diag: &DiagnosticContext) -> Vec<String> {
        diag.errors_iter().map(|e| e.message()).collect()
    }

    /// `X(rd) := X(rs1) + X(rs2)`
    fn add_instruction() -> Definition {
        let mut g = Graph::new("ADD");
        let mut b = Builder::new(&mut g);
        let ty = Type::UInt(32);
        let rs1 = b.field("rs1", Type::UInt(5)).unwrap();
        let rs2 = b.field("rs2", Type::UInt(5)).unwrap();
        let rd = b.field("rd", Type::UInt(5)).unwrap();
        let a = b.read_reg_file("X", rs1, ty).unwrap();
        let c = b.read_reg_file("X", rs2, ty).unwrap();
        let sum = b.builtin(BuiltIn::Add, &[a, c]).unwrap();
        let write = b.write_reg_file("X", rd, sum, None).unwrap();
        let end = b.instr_end(&[write]).unwrap();
        b.straight_line(end).unwrap();
        Definition::instruction("ADD", g)
    }

    #[test]
    fn well_formed_instruction_has_no_diagnostics() {
        let def = add_instruction();
        let diag = def.verify();
        assert!(diag.is_empty(), "{:?}", messages(&diag));
    }

    #[test]
    fn consistency_ignores_incomplete_control_flow() {
        let mut g = Graph::new("f");
        let mut b = Builder::new(&mut g);
        let x = b.param("x", Type::UInt(8)).unwrap();
        let wide = b.param("y", Type::UInt(8)).unwrap();
        b.write_reg("A", x, Some(wide)).unwrap();
        assert!(g.verify().errors_iter().count() > 1);
        let msgs = messages(&g.check_consistency());
        assert_eq!(msgs.len(), 1, "{msgs:?}");
        assert!(msgs[0].contains("must be one bit wide"), "{msgs:?}");
    }

    #[test]
    fn slices_at_the_largest_index_are_checked() {
        let mut g = Graph::new("f");
        let mut b = Builder::new(&mut g);
        let wide = b.param("x", Type::Bits(u32::MAX)).unwrap();
        let low = g
            .add(crate::Slice {
                value: wide,
                hi: u32::MAX - 1,
                lo: 0,
                ty: Type::Bits(8),
            })
            .unwrap();
        let beyond = g
            .add(crate::Slice {
                value: wide,
                hi: u32::MAX,
                lo: 0,
                ty: Type::Bits(8),
            })
            .unwrap();
        let diag = g.verify();
        let msgs = messages(&diag);
        let produces = format!("{low} (Slice) produces Bits<8> from 4294967295 bits");
        let selects = format!("{beyond} (Slice) selects bits");
        assert!(msgs.iter().any(|m| m.contains(&produces)), "{msgs:?}");
        assert!(msgs.iter().any(|m| m.contains(&selects)), "{msgs:?}");
    }

    #[test]
    fn diamond_control_flow_is_accepted() {
        let mut g = Graph::new("BEQ");
        let mut b = Builder::new(&mut g);
        let ty = Type::UInt(32);
        let pc = b.read_reg("PC", ty).unwrap();
        let zero = b.constant(0, ty).unwrap();
        let cond = b.builtin(BuiltIn::Equ, &[pc, zero]).unwrap();
        let write = b.write_reg("PC", zero, None).unwrap();
        let taken = b.branch_end(&[write]).unwrap();
        let not_taken = b.branch_end(&[]).unwrap();
        let then = b.begin(Some(taken)).unwrap();
        let other = b.begin(Some(not_taken)).unwrap();
        let end = b.instr_end(&[]).unwrap();
        b.merge(&[taken, not_taken], Some(end)).unwrap();
        let split = b.branch(cond, then, other).unwrap();
        b.straight_line(split).unwrap();
        let def = Definition::instruction("BEQ", g);
        let diag = def.verify();
        assert!(diag.is_empty(), "{:?}", messages(&diag));
    }

    #[test]
    fn missing_terminal_is_reported() {
        let mut g = Graph::new("f");
        let mut b = Builder::new(&mut g);
        b.constant(1, Type::UInt(8)).unwrap();
        let def = Definition::function("f", vec![], Type::UInt(8), g);
        let msgs = messages(&def.verify());
        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].contains("missing Return node"), "{msgs:?}");
    }

    #[test]
    fn graphs_without_start_may_end_in_return() {
        let mut g = Graph::new("one");
        let mut b = Builder::new(&mut g);
        let one = b.constant(1, Type::UInt(8)).unwrap();
        b.ret(one).unwrap();
        let def = Definition::function("one", vec![], Type::UInt(8), g);
        assert!(def.verify().is_empty());
    }

    #[test]
    fn every_check_runs() {
        let mut g = Graph::new("broken");
        let mut b = Builder::new(&mut g);
        let ty = Type::UInt(8);
        let x = b.read_reg("A", ty).unwrap();
        b.slice(x, 12, 4).unwrap();
        let start = b.start(None).unwrap();
        let end = b.proc_end(&[]).unwrap();
        let ret = b.ret(x).unwrap();
        let def = Definition::stage("broken", g);
        let diag = def.verify();
        let msgs = messages(&diag);
        // Out-of-range slice, stopped control flow and a foreign terminal.
        assert!(msgs.iter().any(|m| m.contains("out of range")), "{msgs:?}");
        assert!(msgs.iter().any(|m| m.contains("control flow stops at")), "{msgs:?}");
        assert!(
            msgs.iter().any(|m| m.contains(&format!("{ret} (Return) cannot end a stage"))),
            "{msgs:?}"
        );
        let warnings = diag.warning_iter().map(|w| w.message()).collect::<Vec<_>>();
        assert!(warnings.iter().any(|w| w.contains(&format!("{end} (ProcEnd) is unreachable from {start}"))));
    }

    #[test]
    fn cycles_and_joins_are_reported() {
        let mut g = Graph::new("loop");
        let mut b = Builder::new(&mut g);
        let first = b.begin(None).unwrap();
        let second = b.begin(Some(first)).unwrap();
        b.start(Some(second)).unwrap();
        b.link(first, second).unwrap();
        b.instr_end(&[]).unwrap();
        let msgs = messages(&Definition::instruction("loop", g).verify());
        assert!(msgs.iter().any(|m| m.contains("contains a cycle")), "{msgs:?}");
        assert!(msgs.iter().any(|m| m.contains(&format!("{second} (Begin) has 2 predecessors"))));
    }

    #[test]
    fn definitions_check_purity_types_and_params() {
        let mut g = Graph::new("f");
        let mut b = Builder::new(&mut g);
        let x = b.param("x", Type::UInt(16)).unwrap();
        let y = b.param("y", Type::UInt(16)).unwrap();
        let sum = b.builtin(BuiltIn::Add, &[x, y]).unwrap();
        b.write_reg("A", sum, None).unwrap();
        b.ret(sum).unwrap();
        let def = Definition::function(
            "f",
            vec![Param::new("x", Type::UInt(8))],
            Type::UInt(32),
            g,
        );
        let msgs = messages(&def.verify());
        assert!(msgs.iter().any(|m| m.contains("must be pure")), "{msgs:?}");
        assert!(msgs.iter().any(|m| m.contains("returns a UInt<16> value")));
        assert!(msgs.iter().any(|m| m == "Undefined parameter name: y"));
        assert!(msgs.iter().any(|m| m.contains("declared as UInt<8> but used as UInt<16>")));
    }

    #[test]
    fn broken_bookkeeping_is_reported() {
        let mut g = Graph::new("f");
        let mut b = Builder::new(&mut g);
        let one = b.constant(1, Type::UInt(8)).unwrap();
        b.ret(one).unwrap();
        // Bypass the graph API to create a duplicate and a dangling usage.
        let dup = g.detached(crate::Const {
            value: crate::Constant::new(1, Type::UInt(8)),
        });
        g.nodes[dup].state = crate::NodeState::Active;
        g.nodes[one].usages.push(dup);
        let msgs = messages(&g.verify());
        assert!(msgs.iter().any(|m| m.contains("duplicates unique node")), "{msgs:?}");
        assert!(msgs.iter().any(|m| m.contains("usages of")), "{msgs:?}");
    }
}
