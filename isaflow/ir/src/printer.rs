//! Implements a formatter for behavior graphs.
//! Printing never mutates the graph.
use crate::{self as ir, Family, Graph, NodeId, NodeKind};
use itertools::Itertools;
use std::io;

/// Printer for the IR.
pub struct Printer;

impl Printer {
    /// Data fields of a node, such as `[add]` or `[7:0]`. Returns the empty
    /// string for nodes without data worth showing.
    fn format_data(kind: &NodeKind) -> String {
        match kind {
            NodeKind::Const(c) => format!("[{}]", c.value.value()),
            NodeKind::FuncParam(p) => format!("[{}]", p.name),
            NodeKind::FieldRef(f) => format!("[{}]", f.field),
            NodeKind::BuiltInCall(c) => format!("[{}]", c.op),
            NodeKind::FuncCall(c) => format!("[{}]", c.func),
            NodeKind::Slice(s) => format!("[{}:{}]", s.hi, s.lo),
            NodeKind::Let(l) => format!("[{}]", l.name),
            NodeKind::ReadReg(r) => format!("[{}]", r.reg),
            NodeKind::ReadRegFile(r) => format!("[{}]", r.file),
            NodeKind::ReadMem(r) => format!("[{}, {}]", r.mem, r.words),
            NodeKind::WriteReg(w) => format!("[{}]", w.reg),
            NodeKind::WriteRegFile(w) => format!("[{}]", w.file),
            NodeKind::WriteMem(w) => format!("[{}, {}]", w.mem, w.words),
            NodeKind::Start(_)
            | NodeKind::Begin(_)
            | NodeKind::If(_)
            | NodeKind::Merge(_)
            | NodeKind::BranchEnd(_)
            | NodeKind::Return(_)
            | NodeKind::InstrEnd(_)
            | NodeKind::ProcEnd(_)
            | NodeKind::Select(_)
            | NodeKind::ZeroExtend(_)
            | NodeKind::SignExtend(_)
            | NodeKind::Truncate(_)
            | NodeKind::TypeCast(_) => String::new(),
        }
    }

    fn format_targets(targets: &[Option<NodeId>]) -> String {
        targets
            .iter()
            .map(|t| t.map_or("_".to_string(), |t| t.to_string()))
            .join(", ")
    }

    /// Format a single node as `n4 = BuiltInCall[add](n2, n3): UInt<32>`.
    pub fn node_to_str(graph: &Graph, id: NodeId) -> String {
        let kind = graph.kind(id);
        let mut buf = format!("{id} = {}{}", kind.kind(), Self::format_data(kind));
        let inputs = kind.inputs();
        if !inputs.is_empty() {
            buf.push_str(&format!("({})", Self::format_targets(&inputs)));
        }
        let successors = kind.successors();
        match successors.len() {
            0 => {}
            1 => buf.push_str(&format!(" -> {}", Self::format_targets(&successors))),
            _ => buf.push_str(&format!(" -> ({})", Self::format_targets(&successors))),
        }
        if let Some(ty) = graph.type_of(id) {
            buf.push_str(&format!(": {ty}"));
        }
        buf
    }

    /// Write every active node of `graph`, one per line.
    pub fn write_graph<F: io::Write>(graph: &Graph, f: &mut F) -> io::Result<()> {
        let header = graph
            .owner()
            .map_or(String::new(), |o| format!(" ({} {})", o.kind, o.name));
        writeln!(f, "graph {}{header} {{", graph.name())?;
        for id in graph.nodes() {
            writeln!(f, "  {}", Self::node_to_str(graph, id))?;
        }
        writeln!(f, "}}")
    }

    pub fn write_definition<F: io::Write>(
        def: &ir::Definition,
        f: &mut F,
    ) -> io::Result<()> {
        let params = def
            .params
            .iter()
            .map(|p| format!("{}: {}", p.name, p.ty))
            .join(", ");
        let ret = def.ret.map_or(String::new(), |t| format!(" -> {t}"));
        writeln!(f, "{} {}({params}){ret}", def.kind, def.name)?;
        Self::write_graph(&def.behavior, f)
    }

    /// Write every definition of the context.
    pub fn write_context<F: io::Write>(ctx: &ir::Context, f: &mut F) -> io::Result<()> {
        for def in &ctx.definitions {
            Self::write_definition(def, f)?;
            writeln!(f)?;
        }
        Ok(())
    }

    pub fn graph_to_string(graph: &Graph) -> String {
        let mut buf = Vec::new();
        Self::write_graph(graph, &mut buf).ok();
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Write a Graphviz rendering of `graph`. Data edges are dashed and point
    /// from an input to its user; control edges are solid.
    pub fn write_dot<F: io::Write>(graph: &Graph, f: &mut F) -> io::Result<()> {
        writeln!(f, "digraph \"{}\" {{", graph.name())?;
        for id in graph.nodes() {
            let kind = graph.kind(id);
            let shape = if kind.is_a(Family::Control) {
                "box"
            } else {
                "ellipse"
            };
            writeln!(
                f,
                "  {id} [shape={shape}, label=\"{id}: {}{}\"];",
                kind.kind(),
                Self::format_data(kind)
            )?;
        }
        for id in graph.nodes() {
            let kind = graph.kind(id);
            for slot in kind.input_slots() {
                if let Some(t) = slot.target {
                    writeln!(f, "  {t} -> {id} [style=dashed, label=\"{}\"];", slot.name)?;
                }
            }
            for slot in kind.successor_slots() {
                if let Some(t) = slot.target {
                    writeln!(f, "  {id} -> {t} [color=red, label=\"{}\"];", slot.name)?;
                }
            }
        }
        writeln!(f, "}}")
    }
}
