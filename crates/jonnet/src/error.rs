//! Error taxonomy, backtraces and rendering.
//!
//! Three families of errors leave the pipeline: parse errors (constructed by
//! the external driver), static check errors with a source span, and runtime
//! errors carrying an evaluation backtrace. All of them render through
//! [`Error`], which owns the file name of the program that failed.

use std::fmt;

use serde::Serialize;

use crate::span::CodeRange;

/// Result alias used throughout the evaluator.
///
/// The error is boxed: exceptions carry a backtrace and would otherwise
/// dominate the size of every `Result` in the interpreter.
pub(crate) type EvalResult<T> = Result<T, Box<Exception>>;

/// A runtime error, before the backtrace is attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum EvalError {
    /// A value of the wrong kind reached an operator or host function.
    TypeMismatch { expected: String, actual: String },
    /// An object was indexed with a non-string key.
    InvalidKey(String),
    /// An array or string was indexed with a non-integer.
    InvalidIndex(String),
    /// An object lookup named a field that does not exist.
    NoSuchKey(String),
    IndexOutOfBounds(i64),
    DivByZero,
    VarNotFound(String),
    /// An `assert` or `std.assertEqual` failed.
    AssertionFailed(String),
    /// A standard-library or native function rejected its input.
    StdError(String),
    /// `error` expressions, infinite recursion, stack exhaustion.
    RuntimeError(String),
    /// A required function parameter had neither argument nor default.
    ParamNotBound(String),
    /// A named argument matched no parameter, or bound one twice.
    BadParam(String),
    /// Manifestation reached a function value.
    ManifestError(String),
    TooManyArgs(usize),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeMismatch { expected, actual } => {
                write!(f, "type mismatch: expected {expected}, got {actual}")
            }
            Self::InvalidKey(kind) => write!(f, "invalid key: {kind}"),
            Self::InvalidIndex(index) => write!(f, "invalid index: {index}"),
            Self::NoSuchKey(key) => write!(f, "no such key: {key}"),
            Self::IndexOutOfBounds(index) => write!(f, "index {index} out of bounds"),
            Self::DivByZero => write!(f, "division by zero"),
            Self::VarNotFound(name) => write!(f, "unknown variable: {name}"),
            Self::AssertionFailed(msg) => write!(f, "assertion failed: {msg}"),
            Self::StdError(msg) | Self::RuntimeError(msg) | Self::ManifestError(msg) => {
                write!(f, "{msg}")
            }
            Self::ParamNotBound(name) => {
                write!(f, "function parameter {name} is not bound in call")
            }
            Self::BadParam(name) => write!(f, "function has no parameter {name}"),
            Self::TooManyArgs(count) => {
                write!(f, "too many arguments: function takes {count}")
            }
        }
    }
}

/// One frame of the evaluation backtrace.
///
/// Frames are pushed on every span annotation and on function application;
/// only application frames carry a name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackFrame {
    pub name: Option<String>,
    pub span: CodeRange,
}

impl StackFrame {
    pub(crate) fn anonymous(span: CodeRange) -> Self {
        Self { name: None, span }
    }

    pub(crate) fn named(name: &str, span: CodeRange) -> Self {
        Self {
            name: Some(name.to_owned()),
            span,
        }
    }

    fn render(&self, file: &str) -> String {
        match &self.name {
            Some(name) => format!("{} function {name}", self.span.render(file)),
            None => self.span.render(file),
        }
    }
}

/// A runtime error with its backtrace, innermost frame first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exception {
    pub error: EvalError,
    pub frames: Vec<StackFrame>,
}

/// The static check error kinds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CheckErrorKind {
    DuplicateParam(String),
    DuplicateBinding(String),
    PosAfterNamedParam,
}

impl fmt::Display for CheckErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateParam(name) => write!(f, "duplicate parameter '{name}'"),
            Self::DuplicateBinding(name) => write!(f, "duplicate local var '{name}'"),
            Self::PosAfterNamedParam => write!(f, "positional after named argument"),
        }
    }
}

/// A static check failure with the span of the offending node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckError {
    pub kind: CheckErrorKind,
    pub span: CodeRange,
}

/// Any error produced by the pipeline, tagged with the source file name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Error {
    file: String,
    kind: ErrorKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ErrorKind {
    /// Produced upstream by the parser; carried here so drivers have a
    /// single error type to render.
    Parse {
        description: String,
        span: CodeRange,
    },
    Check(CheckError),
    Eval(Exception),
}

impl Error {
    /// Wraps a parser failure reported by the external driver.
    #[must_use]
    pub fn parse(file: &str, description: impl Into<String>, span: CodeRange) -> Self {
        Self {
            file: file.to_owned(),
            kind: ErrorKind::Parse {
                description: description.into(),
                span,
            },
        }
    }

    pub(crate) fn check(file: &str, error: CheckError) -> Self {
        Self {
            file: file.to_owned(),
            kind: ErrorKind::Check(error),
        }
    }

    pub(crate) fn eval(file: &str, exception: Exception) -> Self {
        Self {
            file: file.to_owned(),
            kind: ErrorKind::Eval(exception),
        }
    }

    #[must_use]
    pub fn file(&self) -> &str {
        &self.file
    }

    #[must_use]
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::Parse { description, span } => {
                write!(
                    f,
                    "Parse error: {} ({description})\n  {}",
                    self.file,
                    span.render(&self.file)
                )
            }
            ErrorKind::Check(error) => {
                write!(
                    f,
                    "Static error: {}\n  {}",
                    error.kind,
                    error.span.render(&self.file)
                )
            }
            ErrorKind::Eval(exception) => {
                write!(f, "Runtime error: {}", exception.error)?;
                for frame in &exception.frames {
                    write!(f, "\n  {}", frame.render(&self.file))?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for Error {}
