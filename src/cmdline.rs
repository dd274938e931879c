//! Command line parsing for the isaflow compiler.
use argh::FromArgs;
use isaflow_utils::{Error, IsaResult};

#[derive(FromArgs, Debug)]
/// Optimize the behavior graphs of an instruction set description.
pub struct Opts {
    /// run this pass or alias during execution
    #[argh(option, short = 'p', long = "pass", default = "vec![\"all\".into()]")]
    pub pass: Vec<String>,

    /// disable pass during execution
    #[argh(option, short = 'd', long = "disable-pass")]
    pub disable_pass: Vec<String>,

    /// make a pass run right after another one (`before:after`)
    #[argh(option, short = 'i', long = "insert")]
    pub insertions: Vec<String>,

    /// extra options passed to the passes (`pass:opt` or `pass:opt=value`)
    #[argh(option, short = 'x', long = "extra-opt")]
    pub extra_opts: Vec<String>,

    /// print the IR after every pass
    #[argh(switch, long = "dump-ir")]
    pub dump_ir: bool,

    /// list all the available passes and aliases
    #[argh(switch, long = "list-passes")]
    pub list_passes: bool,

    /// logging level
    #[argh(option, long = "log", default = "log::LevelFilter::Warn")]
    pub log_level: log::LevelFilter,
}

impl Opts {
    /// Parse the arguments `args` given to the command `cmd`. Requests for
    /// help and parsing failures are returned as errors carrying the text
    /// argh produced.
    pub fn parse(cmd: &str, args: &[&str]) -> IsaResult<Self> {
        <Opts as FromArgs>::from_args(&[cmd], args)
            .map_err(|exit| Error::misc(exit.output.trim_end()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_run_everything() {
        let opts = Opts::parse("isaflow", &[]).unwrap();
        assert_eq!(opts.pass, ["all"]);
        assert!(opts.disable_pass.is_empty());
        assert!(!opts.dump_ir);
        assert_eq!(opts.log_level, log::LevelFilter::Warn);
    }

    #[test]
    fn repeated_options_accumulate() {
        let opts = Opts::parse(
            "isaflow",
            &[
                "-p",
                "validate",
                "-p",
                "constant-folding",
                "-d",
                "canonicalize",
                "-x",
                "function-inliner:max-nodes=8",
                "--insert",
                "verify:constant-folding",
                "--log",
                "debug",
            ],
        )
        .unwrap();
        assert_eq!(opts.pass, ["validate", "constant-folding"]);
        assert_eq!(opts.disable_pass, ["canonicalize"]);
        assert_eq!(opts.extra_opts, ["function-inliner:max-nodes=8"]);
        assert_eq!(opts.insertions, ["verify:constant-folding"]);
        assert_eq!(opts.log_level, log::LevelFilter::Debug);
    }

    #[test]
    fn bad_arguments_are_errors() {
        assert!(Opts::parse("isaflow", &["--frobnicate"]).is_err());
        let help = Opts::parse("isaflow", &["--help"]).unwrap_err();
        assert!(help.message().contains("--list-passes"));
    }
}
