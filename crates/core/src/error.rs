//! Error taxonomy (SPEC_FULL §6.4) and the `Throw`/`UserThrow` payload
//! discipline (SPEC_FULL §7). Hand-rolled rather than `thiserror`-derived,
//! matching the teacher crate's own `error.rs`.

use std::fmt;

/// A sealed set of error kinds. `Throw`/`UserThrow` carry no data of their
/// own: by the time one is produced, the payload value has already been
/// pushed onto the data stack (SPEC_FULL §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Fatal,
    Null,
    Break,
    Undefined,
    BadType,
    Empty,
    BadArgs,
    MissingArgs,
    UnexpectedEol,
    UnexpectedEoc,
    Dict,
    NoDebug,
    BadOp,
    NoParser,
    BadParse,
    IoError,
    Eof,
    BadEscape,
    Locked,
    Unlocked,
    Lock,
    Thread,
    VmCancelled,
    Malloc,
    System,
    Assert,
    NotImplemented,
    Throw,
    UserThrow,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A VM-level error: the kind plus a human-readable message. For `Throw`/
/// `UserThrow`, the payload itself lives on the data stack and is not
/// duplicated here.
#[derive(Debug, Clone)]
pub struct VmError {
    pub kind: ErrorKind,
    pub message: String,
}

impl VmError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        VmError { kind, message: message.into() }
    }

    pub fn undefined(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::Undefined, format!("undefined identifier: {}", name.into()))
    }

    pub fn bad_type(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadType, msg)
    }

    pub fn bad_args(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadArgs, msg)
    }

    pub fn empty(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Empty, msg)
    }

    pub fn throw() -> Self {
        Self::new(ErrorKind::Throw, "throw")
    }

    /// True for errors that skip continuation-stack unwinding entirely
    /// (SPEC_FULL §7).
    pub fn is_fatal(&self) -> bool {
        self.kind == ErrorKind::Fatal
    }
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for VmError {}

pub type Result<T> = std::result::Result<T, VmError>;
