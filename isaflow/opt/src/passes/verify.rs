use crate::traversal::{
    Action, ConstructVisitor, DiagnosticPass, Named, VisResult, Visitor,
};
use isaflow_ir::{self as ir, DefinitionKind, Kind, NodeKind};
use isaflow_utils::{DiagnosticContext, Error, IsaResult};

/// Checks every definition with [ir::Definition::verify] and checks that
/// calls name a function of the context with matching parameters.
///
/// All problems are collected. The pass fails after every definition was
/// checked if any of them is an error.
pub struct Verify {
    diag: DiagnosticContext,
}

impl ConstructVisitor for Verify {
    fn from(_ctx: &ir::Context) -> IsaResult<Self>
    where
        Self: Sized,
    {
        Ok(Verify {
            diag: DiagnosticContext::default(),
        })
    }

    // Diagnostics are kept across definitions.
    fn clear_data(&mut self) {}
}

impl Named for Verify {
    fn name() -> &'static str {
        "verify"
    }

    fn description() -> &'static str {
        "Check that behavior graphs are well formed."
    }
}

impl DiagnosticPass for Verify {
    fn diagnostics(&self) -> &DiagnosticContext {
        &self.diag
    }
}

impl Verify {
    fn check_calls(&mut self, def: &ir::Definition, defs: &[ir::Definition]) {
        let g = &def.behavior;
        for id in g.nodes_of(Kind::FuncCall) {
            let NodeKind::FuncCall(call) = g.kind(id) else {
                continue;
            };
            let err = |msg: String| {
                Error::malformed_structure(format!(
                    "{} `{}`: {msg}",
                    def.kind, def.name
                ))
                .with_pos(def)
            };
            let Some(callee) = defs.iter().find(|d| d.name == call.func) else {
                let e = if call.func == def.name {
                    err(format!("function `{}` calls itself", call.func))
                } else {
                    Error::undefined(call.func, "function").with_pos(def)
                };
                self.diag.err(e);
                continue;
            };
            if callee.kind != DefinitionKind::Function {
                self.diag.err(err(format!(
                    "`{}` is a {}, not a function",
                    callee.name, callee.kind
                )));
                continue;
            }
            if callee.params.len() != call.args.len() {
                self.diag.err(err(format!(
                    "`{}` takes {} argument(s) but {id} passes {}",
                    callee.name,
                    callee.params.len(),
                    call.args.len()
                )));
                continue;
            }
            for (param, arg) in callee.params.iter().zip(&call.args) {
                if let Some(ty) =
                    g.type_of(*arg).filter(|t| !t.is_trivial_cast_to(&param.ty))
                {
                    self.diag.err(err(format!(
                        "argument `{}` of `{}` expects {} but got {ty}",
                        param.name, callee.name, param.ty
                    )));
                }
            }
            if let Some(ret) = callee.ret.filter(|r| !r.is_trivial_cast_to(&call.ty))
            {
                self.diag.warning(err(format!(
                    "{id} reads `{}` as {} but it returns {ret}",
                    callee.name, call.ty
                )));
            }
        }
    }
}

impl Visitor for Verify {
    fn start(
        &mut self,
        def: &mut ir::Definition,
        defs: &[ir::Definition],
    ) -> VisResult {
        self.diag.extend(def.verify());
        self.check_calls(def, defs);
        // Nothing to do for individual nodes.
        Ok(Action::Stop)
    }
}
