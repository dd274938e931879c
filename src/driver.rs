//! Driver for the isaflow compiler.
use crate::cmdline::Opts;
use isaflow_ir as ir;
use isaflow_opt::pass_manager::PassManager;
use isaflow_utils::IsaResult;
use itertools::Itertools;

/// Configure logging for the level requested in `opts`. A logger installed
/// by the embedding tool takes precedence.
pub fn init_logging(opts: &Opts) {
    let res = env_logger::Builder::new()
        .format_timestamp(None)
        .filter_level(opts.log_level)
        .target(env_logger::Target::Stderr)
        .try_init();
    if res.is_err() {
        log::debug!("logger already initialized");
    }
}

/// Run the passes selected by `opts` on `ctx`.
pub fn run(opts: &Opts, ctx: &mut ir::Context) -> IsaResult<()> {
    let pm = PassManager::default_passes()?;

    // list all the available pass options when flag --list-passes is enabled
    if opts.list_passes {
        println!("{}", pm.complete_help());
        return Ok(());
    }

    // Extra options for the passes
    ctx.extra_opts.extend(opts.extra_opts.iter().cloned());
    log::debug!(
        "running [{}] on {} definition(s)",
        opts.pass.iter().join(", "),
        ctx.definitions.len()
    );

    // Run all passes specified by the command line
    pm.execute_plan(
        ctx,
        &opts.pass,
        &opts.disable_pass,
        &opts.insertions,
        opts.dump_ir,
    )?;
    Ok(())
}

/// Parse the command line `args` of `cmd` and run the compiler on `ctx`.
pub fn run_compiler(cmd: &str, args: &[&str], ctx: &mut ir::Context) -> IsaResult<()> {
    let opts = Opts::parse(cmd, args)?;
    init_logging(&opts);
    run(&opts, ctx)
}
