//! The pass manager: a registry of passes and aliases, and the driver that
//! runs a plan built from them over an [ir::Context].
use crate::traversal::{ConstructVisitor, DiagnosticPass, Named, Visitor};
use isaflow_ir as ir;
use isaflow_utils::{Error, MultiError};
use itertools::Itertools;
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::time::Instant;

pub type PassResult<T> = std::result::Result<T, MultiError>;

/// A registered pass, ready to run on a whole [ir::Context].
pub type PassClosure = Box<dyn Fn(&mut ir::Context) -> PassResult<()>>;

struct Registered {
    run: PassClosure,
    help: String,
    /// Diagnostic passes never change the graphs, so they are not checked
    /// for consistency afterwards.
    diagnostic: bool,
}

/// The passes selected on the command line, in the order they run.
struct Plan {
    passes: Vec<String>,
    excluded: HashSet<String>,
}

/// Registry of the passes and aliases known to the compiler.
#[derive(Default)]
pub struct PassManager {
    passes: HashMap<String, Registered>,
    /// Aliases are stored fully expanded to pass names.
    aliases: HashMap<String, Vec<String>>,
}

impl PassManager {
    /// Register a transformation pass. Fails if a pass with the same name
    /// exists.
    ///
    /// ## Example
    /// ```rust
    /// # use isaflow_opt::{pass_manager::PassManager, passes::ConstantFolding};
    /// # fn main() -> Result<(), isaflow_utils::MultiError> {
    /// let mut pm = PassManager::default();
    /// pm.register_pass::<ConstantFolding>()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn register_pass<Pass>(&mut self) -> PassResult<()>
    where
        Pass: Visitor + ConstructVisitor + Named,
    {
        let run: PassClosure = Box::new(|ctx: &mut ir::Context| -> PassResult<()> {
            Pass::do_pass_default(ctx)?;
            Ok(())
        });
        self.register::<Pass>(run, false)
    }

    /// Register a pass that only reports problems. Its errors fail the run
    /// as one batch; warnings are logged when there are no errors.
    pub fn register_diagnostic<Pass>(&mut self) -> PassResult<()>
    where
        Pass: Visitor + ConstructVisitor + Named + DiagnosticPass,
    {
        let run: PassClosure = Box::new(|ctx: &mut ir::Context| -> PassResult<()> {
            let mut visitor = Pass::from(ctx)?;
            visitor.do_pass(ctx)?;
            let diag = visitor.diagnostics();
            if diag.has_errors() {
                return Err(diag.errors_iter().cloned().collect_vec().into());
            }
            for warning in diag.warning_iter() {
                log::warn!(target: Pass::name(), "{warning:?}");
            }
            Ok(())
        });
        self.register::<Pass>(run, true)
    }

    fn register<Pass: Named>(
        &mut self,
        run: PassClosure,
        diagnostic: bool,
    ) -> PassResult<()> {
        let name = Pass::name();
        if self.passes.contains_key(name) {
            return Err(Error::misc(format!("pass `{name}' is registered twice")).into());
        }
        let mut help = format!("- {name}: {}", Pass::description());
        for opt in Pass::opts() {
            write!(
                help,
                "\n  * {}: {} (default: {})",
                opt.name(),
                opt.description(),
                opt.default()
            )
            .map_err(Error::from)?;
        }
        self.passes.insert(
            name.to_string(),
            Registered {
                run,
                help,
                diagnostic,
            },
        );
        Ok(())
    }

    /// Define `name` as the sequence `passes`. Each entry is a registered
    /// pass or an earlier alias, which is expanded in place.
    pub fn add_alias(
        &mut self,
        name: String,
        passes: Vec<String>,
    ) -> PassResult<()> {
        if self.aliases.contains_key(&name) {
            return Err(Error::misc(format!("alias `{name}' is defined twice")).into());
        }
        let mut expanded = Vec::with_capacity(passes.len());
        for entry in passes {
            match self.aliases.get(&entry) {
                Some(inner) => expanded.extend(inner.iter().cloned()),
                None if self.passes.contains_key(&entry) => expanded.push(entry),
                None => {
                    return Err(Error::misc(format!(
                        "alias `{name}' refers to unknown pass or alias: {entry}"
                    ))
                    .into());
                }
            }
        }
        self.aliases.insert(name, expanded);
        Ok(())
    }

    /// Help for one pass, or the pipeline an alias stands for.
    pub fn specific_help(&self, pass: &str) -> Option<String> {
        if let Some(registered) = self.passes.get(pass) {
            return Some(registered.help.clone());
        }
        let passes = self.aliases.get(pass)?;
        let mut help = format!("`{pass}' is an alias for pass pipeline:");
        for p in passes {
            help.push_str("\n- ");
            help.push_str(p);
        }
        Some(help)
    }

    /// Help for every pass and alias, sorted by name.
    pub fn complete_help(&self) -> String {
        let passes = self
            .passes
            .iter()
            .sorted_by(|a, b| a.0.cmp(b.0))
            .map(|(_, p)| p.help.as_str())
            .join("\n");
        let aliases = self
            .aliases
            .iter()
            .sorted_by(|a, b| a.0.cmp(b.0))
            .map(|(name, passes)| format!("- {name}: {}", passes.join(", ")))
            .join("\n");
        format!("Passes:\n{passes}\n\nAliases:\n{aliases}\n")
    }

    /// The passes an alias stands for, or the name itself.
    fn expand(&self, name: &str) -> Vec<String> {
        match self.aliases.get(name) {
            Some(passes) => passes.clone(),
            None => vec![name.to_string()],
        }
    }

    fn check_known(&self, pass: &str) -> PassResult<()> {
        if self.passes.contains_key(pass) {
            Ok(())
        } else {
            Err(Error::misc(format!(
                "Unknown pass: {pass}. Run the compiler with --list-passes to view registered passes."
            ))
            .into())
        }
    }

    /// Build the plan for the included and excluded passes or aliases.
    /// Every `before:after` insertion moves `after` right behind `before`
    /// when it would otherwise run first.
    fn create_plan(
        &self,
        incls: &[String],
        excls: &[String],
        insns: &[String],
    ) -> PassResult<Plan> {
        let mut passes = incls.iter().flat_map(|n| self.expand(n)).collect_vec();
        let excluded: HashSet<String> =
            excls.iter().flat_map(|n| self.expand(n)).collect();
        for pass in passes.iter().chain(&excluded) {
            self.check_known(pass)?;
        }

        for insn in insns {
            let Some((before, after)) = insn.split_once(':') else {
                log::warn!("ignoring insertion `{insn}': expected `before:after'");
                continue;
            };
            self.check_known(before)?;
            self.check_known(after)?;
            let runs = |p: &str| !excluded.contains(p);
            let position = |p: &str| passes.iter().position(|q| q == p);
            match (position(before), position(after)) {
                (Some(b), Some(a)) if runs(before) && runs(after) => {
                    if b > a {
                        let moved = passes.remove(a);
                        passes.insert(b, moved);
                    }
                }
                _ => log::warn!(
                    "ignoring insertion `{insn}': both passes must be in the plan"
                ),
            }
        }
        Ok(Plan { passes, excluded })
    }

    /// Run the passes selected by `incl` minus `excl`, reordered by the
    /// `before:after` insertions in `insn`.
    ///
    /// After every transformation pass all graphs are checked for
    /// consistency, and the run stops with every violation found. With
    /// `dump_ir`, the context is printed to stdout after each pass.
    pub fn execute_plan(
        &self,
        ctx: &mut ir::Context,
        incl: &[String],
        excl: &[String],
        insn: &[String],
        dump_ir: bool,
    ) -> PassResult<()> {
        let plan = self.create_plan(incl, excl, insn)?;
        for name in &plan.passes {
            if plan.excluded.contains(name) {
                log::info!("{name}: excluded");
                continue;
            }
            let Some(pass) = self.passes.get(name) else {
                continue;
            };
            let start = Instant::now();
            (pass.run)(ctx)?;
            if !pass.diagnostic {
                Self::check_consistency(name, ctx)?;
            }
            if dump_ir {
                ir::Printer::write_context(ctx, &mut std::io::stdout())
                    .map_err(Error::from)?;
            }
            let elapsed = start.elapsed();
            if elapsed.as_secs() > 5 {
                log::warn!("{name}: {}ms", elapsed.as_millis());
            } else {
                log::info!("{name}: {}ms", elapsed.as_millis());
            }
        }
        Ok(())
    }

    /// Check that the pass `name` left every behavior graph consistent. All
    /// violations are reported together.
    fn check_consistency(name: &str, ctx: &ir::Context) -> PassResult<()> {
        let errors = ctx
            .definitions
            .iter()
            .flat_map(|def| {
                def.behavior
                    .check_consistency()
                    .errors_iter()
                    .cloned()
                    .collect_vec()
            })
            .map(|e| e.with_post_msg(Some(format!("found after pass `{name}`"))))
            .collect_vec();
        if errors.is_empty() {
            Ok(())
        } else {
            log::error!("{name}: {} consistency error(s)", errors.len());
            Err(errors.into())
        }
    }
}

/// Register an alias made of pass types and names.
///
/// ## Example
/// ```
/// # use isaflow_opt::{pass_manager::PassManager, register_alias, traversal::Named};
/// # use isaflow_opt::passes::{Canonicalize, DeadNodeRemoval};
/// # fn main() -> Result<(), isaflow_utils::MultiError> {
/// let mut pm = PassManager::default();
/// pm.register_pass::<Canonicalize>()?;
/// pm.register_pass::<DeadNodeRemoval>()?;
/// register_alias!(pm, "cleanup", [Canonicalize, "dead-node-removal"]);
/// # Ok(())
/// # }
/// ```
#[macro_export]
macro_rules! register_alias {
    (@name $pass:ident) => {
        $pass::name().to_string()
    };

    (@name $pass:literal) => {
        $pass.to_string()
    };

    ($manager:expr, $alias:literal, [ $($pass:tt),* $(,)? ]) => {
        $manager.add_alias($alias.to_string(), vec![
            $(register_alias!(@name $pass)),*
        ])?;
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::{Canonicalize, DeadNodeRemoval, Verify};
    use crate::traversal::{Action, VisResult};
    use ir::{Builder, BuiltIn, Definition, Graph, NodeId, Type};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn manager() -> PassResult<PassManager> {
        let mut pm = PassManager::default();
        pm.register_diagnostic::<Verify>()?;
        pm.register_pass::<Canonicalize>()?;
        pm.register_pass::<DeadNodeRemoval>()?;
        register_alias!(pm, "cleanup", [Canonicalize, DeadNodeRemoval]);
        register_alias!(pm, "everything", ["verify", "cleanup"]);
        Ok(pm)
    }

    fn plan(
        pm: &PassManager,
        incl: &[&str],
        excl: &[&str],
        insn: &[&str],
    ) -> Vec<String> {
        let own =
            |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        pm.create_plan(&own(incl), &own(excl), &own(insn)).unwrap().passes
    }

    #[test]
    fn aliases_expand_recursively() {
        let pm = manager().unwrap();
        assert_eq!(
            plan(&pm, &["everything"], &[], &[]),
            ["verify", "canonicalize", "dead-node-removal"]
        );
        let help = pm.specific_help("cleanup").unwrap();
        assert!(help.contains("- canonicalize\n- dead-node-removal"));
        assert!(pm.complete_help().contains("- verify: "));
    }

    #[test]
    fn duplicates_and_unknown_names_are_errors() {
        let mut pm = manager().unwrap();
        assert!(pm.register_pass::<Canonicalize>().is_err());
        assert!(pm.add_alias("cleanup".into(), vec![]).is_err());
        assert!(pm.add_alias("broken".into(), vec!["nope".into()]).is_err());
        let own = vec!["nope".to_string()];
        assert!(pm.create_plan(&own, &[], &[]).is_err());
    }

    #[test]
    fn insertions_reorder_the_plan() {
        let pm = manager().unwrap();
        assert_eq!(
            plan(&pm, &["verify", "cleanup"], &[], &["canonicalize:verify"]),
            ["canonicalize", "verify", "dead-node-removal"]
        );
        // Already in order, or not running at all.
        assert_eq!(
            plan(
                &pm,
                &["cleanup"],
                &[],
                &["canonicalize:dead-node-removal", "verify:canonicalize"]
            ),
            ["canonicalize", "dead-node-removal"]
        );
    }

    #[test]
    fn excluded_passes_do_not_run() {
        let mut pm = PassManager::default();
        let runs = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&runs);
        let counted: PassClosure = Box::new(move |_: &mut ir::Context| -> PassResult<()> {
            log.borrow_mut().push(Canonicalize::name());
            Ok(())
        });
        pm.register::<Canonicalize>(counted, false).unwrap();
        pm.register_pass::<DeadNodeRemoval>().unwrap();

        let mut ctx = ir::Context::default();
        let incl = ["canonicalize".to_string(), "dead-node-removal".to_string()];
        pm.execute_plan(&mut ctx, &incl, &incl[..1], &[], false).unwrap();
        assert!(runs.borrow().is_empty());
        pm.execute_plan(&mut ctx, &incl, &[], &[], false).unwrap();
        assert_eq!(*runs.borrow(), ["canonicalize"]);
    }

    #[test]
    fn diagnostics_are_batched() {
        let mut pm = PassManager::default();
        pm.register_diagnostic::<Verify>().unwrap();

        // Two instructions without an end.
        let defs = ["A", "B"]
            .into_iter()
            .map(|name| {
                let mut g = Graph::new(name);
                let mut b = Builder::new(&mut g);
                let v = b.read_reg("R", Type::UInt(4)).unwrap();
                b.write_reg("R", v, None).unwrap();
                Definition::instruction(name, g)
            })
            .collect();
        let mut ctx = ir::Context::new(defs);
        let err = pm
            .execute_plan(&mut ctx, &["verify".to_string()], &[], &[], false)
            .unwrap_err();
        assert!(err.len() >= 2, "{err}");
    }

    /// Replaces comparisons by a byte, breaking the conditions they feed.
    #[derive(Default)]
    struct WidenConditions;

    impl Named for WidenConditions {
        fn name() -> &'static str {
            "widen-conditions"
        }

        fn description() -> &'static str {
            "replace comparisons by a byte"
        }
    }

    impl Visitor for WidenConditions {
        fn visit_builtin_call(
            &mut self,
            call: &ir::BuiltInCall,
            _id: NodeId,
            graph: &mut Graph,
            _defs: &[Definition],
        ) -> VisResult {
            if call.op != BuiltIn::Equ {
                return Ok(Action::Continue);
            }
            let byte = Builder::new(graph).constant(5, Type::UInt(8))?;
            Ok(Action::Change(byte))
        }
    }

    /// `if R == 0 then R := 1`, expressed as a conditional write.
    fn conditional_write(name: &str) -> Definition {
        let ty = Type::UInt(8);
        let mut g = Graph::new(name);
        let mut b = Builder::new(&mut g);
        let r = b.read_reg("R", ty).unwrap();
        let zero = b.constant(0, ty).unwrap();
        let one = b.constant(1, ty).unwrap();
        let cond = b.builtin(BuiltIn::Equ, &[r, zero]).unwrap();
        let write = b.write_reg("R", one, Some(cond)).unwrap();
        let end = b.instr_end(&[write]).unwrap();
        b.straight_line(end).unwrap();
        Definition::instruction(name, g)
    }

    #[test]
    fn inconsistent_graphs_stop_the_plan() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut pm = manager().unwrap();
        pm.register_pass::<WidenConditions>().unwrap();
        let mut ctx = ir::Context::new(vec![
            conditional_write("A"),
            conditional_write("B"),
        ]);

        let plan = ["verify".to_string(), "canonicalize".to_string()];
        pm.execute_plan(&mut ctx, &plan, &[], &[], false).unwrap();

        let plan = ["widen-conditions".to_string(), "canonicalize".to_string()];
        let err = pm
            .execute_plan(&mut ctx, &plan, &[], &[], false)
            .unwrap_err();
        assert_eq!(err.len(), 2, "{err}");
        for e in err.errors() {
            let msg = format!("{e:?}");
            assert!(msg.contains("must be one bit wide"), "{msg}");
            assert!(msg.contains("found after pass `widen-conditions`"), "{msg}");
        }
    }
}
