use crate::{Error, IsaResult, MultiError};

/// How bad a reported problem is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

/// A type for accumulating multiple errors
#[derive(Default, Debug)]
pub struct DiagnosticContext {
    errors: Vec<Error>,
    warnings: Vec<Error>,
}

impl DiagnosticContext {
    /// Report an `error`
    pub fn err(&mut self, error: Error) {
        self.errors.push(error);
    }

    /// Report a `warning`
    pub fn warning(&mut self, warning: Error) {
        self.warnings.push(warning)
    }

    /// Report `diag` with the given severity.
    pub fn report(&mut self, severity: Severity, diag: Error) {
        match severity {
            Severity::Warning => self.warning(diag),
            Severity::Error => self.err(diag),
        }
    }

    pub fn warning_iter(&self) -> impl Iterator<Item = &Error> {
        self.warnings.iter()
    }

    pub fn errors_iter(&self) -> impl Iterator<Item = &Error> {
        self.errors.iter()
    }

    /// Every diagnostic, errors first.
    pub fn iter(&self) -> impl Iterator<Item = (Severity, &Error)> {
        self.errors
            .iter()
            .map(|e| (Severity::Error, e))
            .chain(self.warnings.iter().map(|w| (Severity::Warning, w)))
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    /// Move all diagnostics of `other` into this context.
    pub fn extend(&mut self, other: DiagnosticContext) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Turn the collected errors into a batch. Warnings are dropped.
    pub fn into_result(self) -> Result<(), MultiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(MultiError::new(self.errors))
        }
    }
}

/// Accumuate the error in a [`Result`] type into the [`DiagnosticContext`].
pub trait DiagnosticResult {
    fn accumulate_err(self, diag: &mut DiagnosticContext) -> Self;
}

impl<T> DiagnosticResult for IsaResult<T>
where
    T: Default,
{
    fn accumulate_err(self, diag: &mut DiagnosticContext) -> Self {
        match self {
            Ok(act) => Ok(act),
            Err(err) => {
                diag.err(err);
                Ok(T::default())
            }
        }
    }
}
