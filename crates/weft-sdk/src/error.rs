//! Error taxonomy shared by the runtime core and the embedding host.
//!
//! Mirrors spec.md §7: every kind a wrapper or dispatch path can raise, plus
//! the boundary errors (`CompileError`, `DieError`) that only the embedding
//! surface constructs.

use std::fmt;

/// Result alias used throughout the ABI boundary.
pub type AbiResult<T> = Result<T, RuntimeError>;

/// The non-compile-time error kinds a running script can raise.
///
/// Kinds map 1:1 onto spec.md §7's taxonomy, minus `compile-error` and
/// `die`, which are modeled as their own boundary types below since they
/// don't participate in continuation-chain unwinding the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operand shape mismatch (wrong dynamic type for an operation).
    TypeError,
    /// Index or slice out of range.
    BoundsError,
    /// Division (or modulo) by zero.
    DivideByZero,
    /// Field/method access on `null`.
    NullDeref,
    /// A mandatory parameter was not supplied.
    MissingArg,
    /// A named-args call supplied a key with no matching parameter.
    UnknownArg,
    /// A malformed regular expression or failed pattern compile.
    PatternError,
    /// Invariant breach inside the runtime itself; never expected to reach
    /// a user script under normal operation.
    StackInternal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::TypeError => "type-error",
            ErrorKind::BoundsError => "bounds-error",
            ErrorKind::DivideByZero => "divide-by-zero",
            ErrorKind::NullDeref => "null-deref",
            ErrorKind::MissingArg => "missing-arg",
            ErrorKind::UnknownArg => "unknown-arg",
            ErrorKind::PatternError => "pattern-error",
            ErrorKind::StackInternal => "stack-internal",
        };
        f.write_str(s)
    }
}

/// A source location a `RuntimeError` is attributed to.
///
/// `source` is the compilation unit name (as given to `compile`); `offset`
/// is a byte offset into that unit's source text. Line/column/excerpt are
/// derived on demand by the embedding surface (`weft-runtime::error`), not
/// stored here, since deriving them requires the original source text which
/// the core does not retain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLoc {
    pub source: String,
    pub offset: u32,
}

impl SourceLoc {
    pub fn new(source: impl Into<String>, offset: u32) -> Self {
        Self {
            source: source.into(),
            offset,
        }
    }

    /// A placeholder location for errors raised by host-side code that has
    /// no script source to attribute to (e.g. a native function called
    /// directly by the host).
    pub fn unknown() -> Self {
        Self {
            source: String::new(),
            offset: 0,
        }
    }
}

/// A runtime error: the value kind that escapes through the same
/// stack-unwinding channel as a `Continuation`, but is classified
/// separately and is never caught/chained the way continuations are
/// (spec.md §7).
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
    pub loc: SourceLoc,
}

impl RuntimeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, loc: SourceLoc) -> Self {
        Self {
            kind,
            message: message.into(),
            loc,
        }
    }

    pub fn type_error(message: impl Into<String>, loc: SourceLoc) -> Self {
        Self::new(ErrorKind::TypeError, message, loc)
    }

    pub fn bounds_error(message: impl Into<String>, loc: SourceLoc) -> Self {
        Self::new(ErrorKind::BoundsError, message, loc)
    }

    pub fn divide_by_zero(loc: SourceLoc) -> Self {
        Self::new(ErrorKind::DivideByZero, "division by zero", loc)
    }

    pub fn null_deref(message: impl Into<String>, loc: SourceLoc) -> Self {
        Self::new(ErrorKind::NullDeref, message, loc)
    }

    pub fn missing_arg(name: &str, loc: SourceLoc) -> Self {
        Self::new(
            ErrorKind::MissingArg,
            format!("missing mandatory argument '{name}'"),
            loc,
        )
    }

    pub fn unknown_arg(name: &str, loc: SourceLoc) -> Self {
        Self::new(
            ErrorKind::UnknownArg,
            format!("unknown named argument '{name}'"),
            loc,
        )
    }

    pub fn pattern_error(message: impl Into<String>, loc: SourceLoc) -> Self {
        Self::new(ErrorKind::PatternError, message, loc)
    }

    pub fn stack_internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StackInternal, message, SourceLoc::unknown())
    }
}

/// Script-initiated abort (the `die` statement/builtin). A subtype of
/// `RuntimeError` per spec.md §7 and §6's error taxonomy.
#[derive(Debug, Clone, thiserror::Error)]
#[error("die: {message}")]
pub struct DieError {
    pub message: String,
    pub loc: SourceLoc,
}

/// A failure discovered before execution begins (lexing, parsing, codegen).
/// The core never constructs this itself — it is raised by the external
/// `Compiler` collaborator and threaded through the embedding surface.
#[derive(Debug, Clone, thiserror::Error)]
#[error("compile error: {message}")]
pub struct CompileError {
    pub message: String,
    pub loc: SourceLoc,
}
