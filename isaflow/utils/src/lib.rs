//! Shared utilities for the isaflow compiler.
mod diagnostics;
mod errors;
mod id;
mod position;

pub use diagnostics::{DiagnosticContext, DiagnosticResult, Severity};
pub use errors::{Error, IsaResult, MultiError};
pub use id::{GSym, GetName, Id};
pub use position::{FileIdx, GPosIdx, GlobalPositionTable, PosIdx, WithPos};
