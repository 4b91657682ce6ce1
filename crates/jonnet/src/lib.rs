#![doc = include_str!("../../../README.md")]

pub mod ast;
mod check;
mod desugar;
mod env;
pub mod error;
mod eval;
mod ir;
mod manifest;
pub mod number;
mod run;
pub mod span;
mod stdlib;
pub mod trace;
mod value;

pub use crate::{
    error::{CheckError, CheckErrorKind, Error, ErrorKind, EvalError, Exception, StackFrame},
    number::Scientific,
    run::{DEFAULT_MAX_STACK, EvalLimits, Runner, evaluate},
    stdlib::std_object,
    trace::{CollectTrace, NoTrace, StdTrace, TraceWriter},
    value::{FuncVal, ObjValue, Thunk, Value},
};
