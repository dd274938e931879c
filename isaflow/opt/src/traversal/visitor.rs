//! Implements a visitor for behavior graphs.
//! Program passes implemented as the Visitor are directly invoked on
//! [`ir::Context`] to process every [`ir::Definition`] using the pass.
use super::action::{Action, VisResult};
use super::{ConstructVisitor, DefTraversal, Named, Order};
use crate::analysis::DataflowOrder;
use isaflow_ir::{self as ir, Context, Definition, Graph, NodeId, NodeKind};
use isaflow_utils::IsaResult;

/// The order in which the nodes of a graph are visited.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NodeOrder {
    /// Order in which the nodes were created.
    #[default]
    Creation,
    /// Every node after the nodes it reads.
    Dataflow,
}

/// Declare per-kind hooks that fall back to a family hook.
macro_rules! kind_hooks {
    ($($hook:ident($node:ident) => $family:ident),* $(,)?) => {
        $(
            #[doc = concat!("Executed for [ir::", stringify!($node), "] nodes.")]
            fn $hook(
                &mut self,
                _node: &ir::$node,
                id: NodeId,
                graph: &mut Graph,
                defs: &[Definition],
            ) -> VisResult {
                self.$family(id, graph, defs)
            }
        )*
    };
}

/// The visiting interface for behavior graphs.
///
/// Every live node is dispatched to the hook of its kind. Kind hooks default
/// to the hook of their family, and family hooks default to [Visitor::node]:
/// - control kinds call [Visitor::control]; `BranchEnd` goes through
///   [Visitor::block_end] and terminals through [Visitor::terminal] first.
/// - constants and references call [Visitor::unique], casts
///   [Visitor::cast], side effects [Visitor::side_effect] and every other
///   value [Visitor::value]. All of them then call [Visitor::dependency].
///
/// A pass will usually override a few hooks and rely on the defaults for
/// the rest. The [Action] returned by a hook is performed on the visited
/// node before the next node is visited.
pub trait Visitor {
    /// Precondition for this pass to run on the program. If this function returns
    /// None, the pass triggers. Otherwise it aborts and logs the string as the reason.
    fn precondition(_ctx: &ir::Context) -> Option<String>
    where
        Self: Sized,
    {
        None
    }

    /// Define the iteration order in which definitions should be visited
    #[inline(always)]
    fn iteration_order() -> Order
    where
        Self: Sized,
    {
        Order::No
    }

    /// Define the order in which the nodes of a graph should be visited
    #[inline(always)]
    fn node_order() -> NodeOrder
    where
        Self: Sized,
    {
        NodeOrder::Creation
    }

    /// Define the traversal over a definition.
    /// Calls [Visitor::start], visits each node of the behavior graph, and
    /// finally calls [Visitor::finish].
    fn traverse_definition(
        &mut self,
        def: &mut Definition,
        defs: &[Definition],
    ) -> IsaResult<()>
    where
        Self: Sized,
    {
        self.start(def, defs)?
            .and_then(|| {
                self.traverse_graph(&mut def.behavior, defs)?;
                Ok(Action::Continue)
            })?
            .and_then(|| self.finish(def, defs))?;
        Ok(())
    }

    /// Visit the nodes of `graph` that are live when the traversal starts.
    /// Nodes deleted by earlier visits are skipped; [Action::Stop] ends the
    /// traversal.
    fn traverse_graph(
        &mut self,
        graph: &mut Graph,
        defs: &[Definition],
    ) -> IsaResult<()>
    where
        Self: Sized,
    {
        let order = match Self::node_order() {
            NodeOrder::Creation => graph.snapshot(),
            NodeOrder::Dataflow => DataflowOrder::new(graph)?.take(),
        };
        for id in order {
            if !graph.is_active(id) {
                continue;
            }
            let action = self.visit_node(id, graph, defs)?;
            if !action.apply(graph, id)? {
                break;
            }
        }
        Ok(())
    }

    /// Run the visitor on a given program [`ir::Context`].
    ///
    /// After visiting a definition, it calls [ConstructVisitor::clear_data]
    /// to reset the struct.
    fn do_pass(&mut self, context: &mut Context) -> IsaResult<()>
    where
        Self: Sized + ConstructVisitor + Named,
    {
        if let Some(msg) = Self::precondition(&*context) {
            log::info!("Skipping `{}': {msg}", Self::name());
            return Ok(());
        }

        let schedule =
            DefTraversal::schedule(&context.definitions, Self::iteration_order())?;
        // Temporarily take ownership of definitions from context.
        let defs = std::mem::take(&mut context.definitions);
        let mut po = DefTraversal::with_schedule(defs, schedule);
        let res = po.apply_update(|def, defs| {
            self.traverse_definition(def, defs)?;
            self.clear_data();
            Ok(())
        });
        context.definitions = po.take();
        res
    }

    /// Build a [Default] implementation of this pass and call [Visitor::do_pass]
    /// using it.
    #[inline(always)]
    fn do_pass_default(context: &mut Context) -> IsaResult<Self>
    where
        Self: ConstructVisitor + Sized + Named,
    {
        let mut visitor = Self::from(&*context)?;
        visitor.do_pass(context)?;
        Ok(visitor)
    }

    /// Executed before the traversal begins.
    fn start(&mut self, _def: &mut Definition, _defs: &[Definition]) -> VisResult {
        Ok(Action::Continue)
    }

    /// Executed after the traversal ends, unless [Visitor::start] returned
    /// something other than [Action::Continue].
    fn finish(&mut self, _def: &mut Definition, _defs: &[Definition]) -> VisResult {
        Ok(Action::Continue)
    }

    /// Dispatch the node `id` to the hook of its kind.
    fn visit_node(
        &mut self,
        id: NodeId,
        graph: &mut Graph,
        defs: &[Definition],
    ) -> VisResult {
        match graph.kind(id).clone() {
            NodeKind::Start(n) => self.visit_start(&n, id, graph, defs),
            NodeKind::Begin(n) => self.visit_begin(&n, id, graph, defs),
            NodeKind::If(n) => self.visit_if(&n, id, graph, defs),
            NodeKind::Merge(n) => self.visit_merge(&n, id, graph, defs),
            NodeKind::BranchEnd(n) => self.visit_branch_end(&n, id, graph, defs),
            NodeKind::Return(n) => self.visit_return(&n, id, graph, defs),
            NodeKind::InstrEnd(n) => self.visit_instr_end(&n, id, graph, defs),
            NodeKind::ProcEnd(n) => self.visit_proc_end(&n, id, graph, defs),
            NodeKind::Const(n) => self.visit_const(&n, id, graph, defs),
            NodeKind::FuncParam(n) => self.visit_func_param(&n, id, graph, defs),
            NodeKind::FieldRef(n) => self.visit_field_ref(&n, id, graph, defs),
            NodeKind::BuiltInCall(n) => {
                self.visit_builtin_call(&n, id, graph, defs)
            }
            NodeKind::FuncCall(n) => self.visit_func_call(&n, id, graph, defs),
            NodeKind::Select(n) => self.visit_select(&n, id, graph, defs),
            NodeKind::Slice(n) => self.visit_slice(&n, id, graph, defs),
            NodeKind::Let(n) => self.visit_let(&n, id, graph, defs),
            NodeKind::ZeroExtend(n) => self.visit_zero_extend(&n, id, graph, defs),
            NodeKind::SignExtend(n) => self.visit_sign_extend(&n, id, graph, defs),
            NodeKind::Truncate(n) => self.visit_truncate(&n, id, graph, defs),
            NodeKind::TypeCast(n) => self.visit_type_cast(&n, id, graph, defs),
            NodeKind::ReadReg(n) => self.visit_read_reg(&n, id, graph, defs),
            NodeKind::ReadRegFile(n) => {
                self.visit_read_reg_file(&n, id, graph, defs)
            }
            NodeKind::ReadMem(n) => self.visit_read_mem(&n, id, graph, defs),
            NodeKind::WriteReg(n) => self.visit_write_reg(&n, id, graph, defs),
            NodeKind::WriteRegFile(n) => {
                self.visit_write_reg_file(&n, id, graph, defs)
            }
            NodeKind::WriteMem(n) => self.visit_write_mem(&n, id, graph, defs),
        }
    }

    kind_hooks! {
        visit_start(Start) => control,
        visit_begin(Begin) => control,
        visit_if(If) => control,
        visit_merge(Merge) => control,
        visit_branch_end(BranchEnd) => block_end,
        visit_return(Return) => terminal,
        visit_instr_end(InstrEnd) => terminal,
        visit_proc_end(ProcEnd) => terminal,
        visit_const(Const) => unique,
        visit_func_param(FuncParam) => unique,
        visit_field_ref(FieldRef) => unique,
        visit_builtin_call(BuiltInCall) => value,
        visit_func_call(FuncCall) => value,
        visit_select(Select) => value,
        visit_slice(Slice) => value,
        visit_let(Let) => value,
        visit_zero_extend(ZeroExtend) => cast,
        visit_sign_extend(SignExtend) => cast,
        visit_truncate(Truncate) => cast,
        visit_type_cast(TypeCast) => cast,
        visit_read_reg(ReadReg) => value,
        visit_read_reg_file(ReadRegFile) => value,
        visit_read_mem(ReadMem) => value,
        visit_write_reg(WriteReg) => side_effect,
        visit_write_reg_file(WriteRegFile) => side_effect,
        visit_write_mem(WriteMem) => side_effect,
    }

    // ============ Family hooks ============

    fn terminal(&mut self, id: NodeId, graph: &mut Graph, defs: &[Definition]) -> VisResult {
        self.control(id, graph, defs)
    }

    fn block_end(&mut self, id: NodeId, graph: &mut Graph, defs: &[Definition]) -> VisResult {
        self.control(id, graph, defs)
    }

    fn control(&mut self, id: NodeId, graph: &mut Graph, defs: &[Definition]) -> VisResult {
        self.node(id, graph, defs)
    }

    fn unique(&mut self, id: NodeId, graph: &mut Graph, defs: &[Definition]) -> VisResult {
        self.dependency(id, graph, defs)
    }

    fn cast(&mut self, id: NodeId, graph: &mut Graph, defs: &[Definition]) -> VisResult {
        self.dependency(id, graph, defs)
    }

    fn value(&mut self, id: NodeId, graph: &mut Graph, defs: &[Definition]) -> VisResult {
        self.dependency(id, graph, defs)
    }

    fn side_effect(
        &mut self,
        id: NodeId,
        graph: &mut Graph,
        defs: &[Definition],
    ) -> VisResult {
        self.dependency(id, graph, defs)
    }

    fn dependency(
        &mut self,
        id: NodeId,
        graph: &mut Graph,
        defs: &[Definition],
    ) -> VisResult {
        self.node(id, graph, defs)
    }

    /// Executed for every node whose hooks were not overridden.
    fn node(&mut self, _id: NodeId, _graph: &mut Graph, _defs: &[Definition]) -> VisResult {
        Ok(Action::Continue)
    }
}
