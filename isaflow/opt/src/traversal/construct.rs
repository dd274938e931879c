use super::Visitor;
use isaflow_ir as ir;
use isaflow_utils::{Error, IsaResult};
use itertools::Itertools;
use linked_hash_map::LinkedHashMap;

#[derive(Clone, Debug, PartialEq, Eq)]
/// The value returned from parsing an option.
pub enum ParseVal {
    /// A boolean option.
    Bool(bool),
    /// A number option.
    Num(i64),
    /// A list of values.
    List(Vec<ParseVal>),
}

impl ParseVal {
    pub fn bool(&self) -> IsaResult<bool> {
        match self {
            ParseVal::Bool(b) => Ok(*b),
            _ => Err(Error::misc(format!("Expected bool, got {self}"))),
        }
    }

    pub fn num(&self) -> IsaResult<i64> {
        match self {
            ParseVal::Num(n) => Ok(*n),
            _ => Err(Error::misc(format!("Expected number, got {self}"))),
        }
    }

    /// The number if it is not negative.
    pub fn pos_num(&self) -> IsaResult<Option<u64>> {
        Ok(u64::try_from(self.num()?).ok())
    }

    pub fn num_list(&self) -> IsaResult<Vec<i64>> {
        match self {
            ParseVal::List(l) => l.iter().map(ParseVal::num).collect(),
            _ => Err(Error::misc(format!(
                "Expected list of numbers, got {self}"
            ))),
        }
    }
}

impl std::fmt::Display for ParseVal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseVal::Bool(b) => write!(f, "{b}"),
            ParseVal::Num(n) => write!(f, "{n}"),
            ParseVal::List(l) => write!(f, "[{}]", l.iter().join(", ")),
        }
    }
}

/// Option that can be passed to a pass.
pub struct PassOpt {
    name: &'static str,
    description: &'static str,
    default: ParseVal,
    parse: fn(&str) -> Option<ParseVal>,
}

impl PassOpt {
    pub const fn new(
        name: &'static str,
        description: &'static str,
        default: ParseVal,
        parse: fn(&str) -> Option<ParseVal>,
    ) -> Self {
        Self {
            name,
            description,
            default,
            parse,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn description(&self) -> &'static str {
        self.description
    }

    pub const fn default(&self) -> &ParseVal {
        &self.default
    }

    fn parse(&self, s: &str) -> Option<ParseVal> {
        (self.parse)(s)
    }

    /// Parse of list using parser for the elements.
    /// Returns `None` if any of the elements fail to parse.
    fn parse_list(
        s: &str,
        parse: fn(&str) -> Option<ParseVal>,
    ) -> Option<ParseVal> {
        s.split(',')
            .map(parse)
            .collect::<Option<Vec<_>>>()
            .map(ParseVal::List)
    }

    pub fn parse_bool(s: &str) -> Option<ParseVal> {
        match s {
            "true" => Some(ParseVal::Bool(true)),
            "false" => Some(ParseVal::Bool(false)),
            _ => None,
        }
    }

    /// Parse a number from a string.
    pub fn parse_num(s: &str) -> Option<ParseVal> {
        s.parse::<i64>().ok().map(ParseVal::Num)
    }

    /// Parse a list of numbers from a string.
    pub fn parse_num_list(s: &str) -> Option<ParseVal> {
        Self::parse_list(s, Self::parse_num)
    }
}

/// Trait that describes named things. Calling [`do_pass`](Visitor::do_pass) and [`do_pass_default`](Visitor::do_pass_default).
/// require this to be implemented.
///
/// This has to be a separate trait from [`Visitor`] because these methods don't recieve `self` which
/// means that it is impossible to create dynamic trait objects.
pub trait Named {
    /// The name of a pass. Is used for identifying passes.
    fn name() -> &'static str;
    /// A short description of the pass.
    fn description() -> &'static str;
    /// Set of options that can be passed to the pass.
    fn opts() -> Vec<PassOpt> {
        vec![]
    }
}

/// Trait defining method that can be used to construct a Visitor from an
/// [ir::Context].
/// This is useful when a pass needs to construct information using the context
/// *before* visiting the definitions.
///
/// For passes that don't need to use the context, this trait can be automatically
/// be derived from [Default].
pub trait ConstructVisitor {
    /// Values of the options of this pass. Options are given in
    /// [ir::Context::extra_opts] as `pass:opt` or `pass:opt=value`; options
    /// that are not given take their default value.
    fn get_opts(ctx: &ir::Context) -> LinkedHashMap<&'static str, ParseVal>
    where
        Self: Named,
    {
        let opts = Self::opts();
        let n = Self::name();
        let mut values: LinkedHashMap<&'static str, ParseVal> = ctx
            .extra_opts
            .iter()
            .filter_map(|opt| {
                let (pass, rest) = opt.split_once(':')?;
                if pass != n {
                    return None;
                }
                let (opt, val) = match rest.split_once('=') {
                    Some((opt, val)) => (opt, Some(val)),
                    None => (rest, None),
                };
                let Some(opt) = opts.iter().find(|o| o.name == opt) else {
                    log::warn!("Ignoring unknown option for pass `{n}`: {opt}");
                    return None;
                };
                let val = match val {
                    Some(v) => {
                        let Some(v) = opt.parse(v) else {
                            log::warn!(
                                "Ignoring invalid value for option `{n}:{}`: {v}",
                                opt.name(),
                            );
                            return None;
                        };
                        v
                    }
                    None => ParseVal::Bool(true),
                };
                Some((opt.name(), val))
            })
            .collect();

        if log::log_enabled!(log::Level::Debug) {
            log::debug!(
                "Extra options for {}: {}",
                Self::name(),
                values.iter().map(|(o, v)| format!("{o}->{v}")).join(", ")
            );
        }

        // For all options that were not provided with values, fill in the defaults.
        for opt in opts {
            if !values.contains_key(opt.name()) {
                values.insert(opt.name(), opt.default.clone());
            }
        }

        values
    }

    /// Construct the visitor using information from the Context
    fn from(_ctx: &ir::Context) -> IsaResult<Self>
    where
        Self: Sized;

    /// Clear the data stored in the visitor. Called before traversing the
    /// next definition by [Visitor::do_pass].
    fn clear_data(&mut self);
}

/// Derive ConstructVisitor when [Default] is provided for a visitor.
impl<T: Default + Sized + Visitor> ConstructVisitor for T {
    fn from(_ctx: &ir::Context) -> IsaResult<Self> {
        Ok(T::default())
    }

    fn clear_data(&mut self) {
        *self = T::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Sample;

    impl Named for Sample {
        fn name() -> &'static str {
            "sample"
        }

        fn description() -> &'static str {
            "test pass"
        }

        fn opts() -> Vec<PassOpt> {
            vec![
                PassOpt::new(
                    "limit",
                    "a limit",
                    ParseVal::Num(10),
                    PassOpt::parse_num,
                ),
                PassOpt::new(
                    "verbose",
                    "print more",
                    ParseVal::Bool(false),
                    PassOpt::parse_bool,
                ),
                PassOpt::new(
                    "widths",
                    "widths to look at",
                    ParseVal::List(vec![]),
                    PassOpt::parse_num_list,
                ),
            ]
        }
    }

    impl Visitor for Sample {}

    fn opts_for(extra: &[&str]) -> LinkedHashMap<&'static str, ParseVal> {
        let mut ctx = ir::Context::default();
        ctx.extra_opts = extra.iter().map(|s| s.to_string()).collect();
        Sample::get_opts(&ctx)
    }

    #[test]
    fn defaults_fill_missing_options() {
        let opts = opts_for(&[]);
        assert_eq!(opts[&"limit"], ParseVal::Num(10));
        assert_eq!(opts[&"verbose"], ParseVal::Bool(false));
        assert_eq!(opts.len(), 3);
    }

    #[test]
    fn given_options_are_parsed() {
        let opts = opts_for(&[
            "sample:limit=3",
            "sample:verbose",
            "sample:widths=8,16",
            "other:limit=5",
        ]);
        assert_eq!(opts[&"limit"].num().unwrap(), 3);
        assert!(opts[&"verbose"].bool().unwrap());
        assert_eq!(opts[&"widths"].num_list().unwrap(), vec![8, 16]);
    }

    #[test]
    fn invalid_and_unknown_options_are_ignored() {
        let opts = opts_for(&["sample:limit=lots", "sample:colour=red"]);
        assert_eq!(opts[&"limit"], ParseVal::Num(10));
        assert!(!opts.contains_key(&"colour"));
        assert_eq!(opts[&"limit"].pos_num().unwrap(), Some(10));
        assert!(opts[&"verbose"].num().is_err());
    }
}
