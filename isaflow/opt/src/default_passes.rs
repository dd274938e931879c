//! Defines the default passes available to [PassManager].
use crate::passes::{
    Canonicalize, ConstantFolding, DeadNodeRemoval, FunctionInliner,
    TypeCastElimination, Verify,
};
use crate::traversal::Named;
use crate::{pass_manager::PassManager, register_alias};
use isaflow_utils::IsaResult;

impl PassManager {
    pub fn default_passes() -> IsaResult<Self> {
        // Construct the pass manager and register all passes.
        let mut pm = PassManager::default();

        // Validation passes
        pm.register_diagnostic::<Verify>()?;

        // Optimization passes
        pm.register_pass::<TypeCastElimination>()?;
        pm.register_pass::<FunctionInliner>()?;
        pm.register_pass::<ConstantFolding>()?;
        pm.register_pass::<Canonicalize>()?;
        pm.register_pass::<DeadNodeRemoval>()?;

        register_alias!(pm, "validate", [Verify]);
        register_alias!(
            pm,
            "pre-opt",
            [
                TypeCastElimination,
                FunctionInliner,
                ConstantFolding, // Inlined arguments are often constants
                Canonicalize,
                DeadNodeRemoval, // Folding and merging leave unused values
            ]
        );
        register_alias!(pm, "all", ["validate", "pre-opt", "validate"]);

        Ok(pm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_expands_to_the_full_pipeline() {
        let pm = PassManager::default_passes().unwrap();
        let help = pm.specific_help("all").unwrap();
        let passes = help.lines().skip(1).collect::<Vec<_>>();
        assert_eq!(
            passes,
            [
                "- verify",
                "- type-cast-elimination",
                "- function-inliner",
                "- constant-folding",
                "- canonicalize",
                "- dead-node-removal",
                "- verify",
            ]
        );
        assert!(pm.complete_help().contains("max-nodes"));
    }
}
