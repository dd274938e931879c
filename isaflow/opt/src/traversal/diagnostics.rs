use isaflow_utils::DiagnosticContext;

/// A pass that implements reporting Diagnostics
pub trait DiagnosticPass {
    /// Return the diagnostics gathered by this pass.
    fn diagnostics(&self) -> &DiagnosticContext;
}
