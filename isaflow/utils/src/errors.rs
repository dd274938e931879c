//! Errors generated by the compiler.
use crate::{GPosIdx, Id, WithPos};
use itertools::Itertools;

/// Convience wrapper to represent success or meaningul compiler error.
pub type IsaResult<T> = std::result::Result<T, Error>;

/// Errors generated by the compiler
#[derive(Clone)]
pub struct Error {
    kind: Box<ErrorKind>,
    pos: GPosIdx,
    post_msg: Option<String>,
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.pos == GPosIdx::UNKNOWN {
            write!(f, "{}", self.kind)?
        } else {
            write!(f, "{}", self.pos.format(self.kind.to_string()))?
        }
        if let Some(post) = &self.post_msg {
            write!(f, "\n{}", post)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for Error {}

impl Error {
    pub fn with_pos<T: WithPos>(mut self, pos: &T) -> Self {
        self.pos = pos.copy_span();
        self
    }

    pub fn with_post_msg(mut self, msg: Option<String>) -> Self {
        self.post_msg = msg;
        self
    }

    fn from_kind(kind: ErrorKind) -> Self {
        Self {
            kind: Box::new(kind),
            pos: GPosIdx::UNKNOWN,
            post_msg: None,
        }
    }

    pub fn malformed_structure<S: ToString>(msg: S) -> Self {
        Self::from_kind(ErrorKind::MalformedStructure(msg.to_string()))
    }
    pub fn malformed_control<S: ToString>(msg: S) -> Self {
        Self::from_kind(ErrorKind::MalformedControl(msg.to_string()))
    }
    pub fn undefined<S: ToString>(name: Id, typ: S) -> Self {
        Self::from_kind(ErrorKind::Undefined(name, typ.to_string()))
    }
    pub fn already_bound<S: ToString>(name: Id, typ: S) -> Self {
        Self::from_kind(ErrorKind::AlreadyBound(name, typ.to_string()))
    }
    pub fn pass_assumption<S: ToString, M: ToString>(pass: S, msg: M) -> Self {
        Self::from_kind(ErrorKind::PassAssumption(
            pass.to_string(),
            msg.to_string(),
        ))
    }
    pub fn unsupported<S: ToString>(msg: S) -> Self {
        Self::from_kind(ErrorKind::Unsupported(msg.to_string()))
    }
    pub fn internal<S: ToString>(msg: S) -> Self {
        Self::from_kind(ErrorKind::Internal(msg.to_string()))
    }
    pub fn misc<S: ToString>(msg: S) -> Self {
        Self::from_kind(ErrorKind::Misc(msg.to_string()))
    }

    pub fn location(&self) -> GPosIdx {
        self.pos
    }

    /// The message of the error without position information.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }

    /// True for faults raised by violated compiler invariants rather than by
    /// malformed input.
    pub fn is_internal(&self) -> bool {
        matches!(*self.kind, ErrorKind::Internal(_))
    }
}

/// Standard error type for isaflow errors.
#[derive(Clone)]
enum ErrorKind {
    /// The input specification has a malformed dataflow structure.
    MalformedStructure(String),
    /// The control flow of a behavior is malformed.
    MalformedControl(String),
    /// The name has not been bound.
    Undefined(Id, String),
    /// The name has already been bound.
    AlreadyBound(Id, String),
    /// The input to a pass is incorrect.
    PassAssumption(String, String),
    /// The construct is valid but not handled by the compiler.
    Unsupported(String),
    /// An internal consistency fault of the compiler.
    Internal(String),
    /// A miscellaneous error. Should be replaced with a more precise error.
    Misc(String),
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ErrorKind::*;
        match self {
            MalformedStructure(msg) => write!(f, "Malformed Structure: {msg}"),
            MalformedControl(msg) => write!(f, "Malformed Control: {msg}"),
            Undefined(name, typ) => write!(f, "Undefined {typ} name: {name}"),
            AlreadyBound(name, typ) => {
                write!(f, "Name `{name}' already bound by {typ}")
            }
            PassAssumption(pass, msg) => {
                write!(f, "Pass `{pass}` assumption violated: {msg}")
            }
            Unsupported(msg) => write!(f, "Unsupported: {msg}"),
            Internal(msg) => write!(f, "Internal compiler error: {msg}"),
            Misc(msg) => write!(f, "{msg}"),
        }
    }
}

/// A batch of errors reported together once a pass finished.
#[derive(Clone, Debug)]
pub struct MultiError {
    errors: Vec<Error>,
}

impl MultiError {
    pub fn new(errors: Vec<Error>) -> Self {
        Self { errors }
    }

    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl std::fmt::Display for MultiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.errors.iter().map(|e| format!("{e:?}")).join("\n"))
    }
}

impl std::error::Error for MultiError {}

impl From<Error> for MultiError {
    fn from(e: Error) -> Self {
        Self { errors: vec![e] }
    }
}

impl From<Vec<Error>> for MultiError {
    fn from(errors: Vec<Error>) -> Self {
        Self { errors }
    }
}

/// A batch turns into a single error so that it can flow through `?`.
impl From<MultiError> for Error {
    fn from(multi: MultiError) -> Self {
        match multi.errors.len() {
            1 => multi.errors.into_iter().next().unwrap_or_else(|| {
                Error::internal("error batch emptied while converting")
            }),
            _ => Error::misc(multi.to_string()),
        }
    }
}

// Conversion from other errors
impl From<std::fmt::Error> for Error {
    fn from(e: std::fmt::Error) -> Self {
        Error::misc(format!("formatting error: {e}"))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::misc(format!("IO Error: {}", e))
    }
}
