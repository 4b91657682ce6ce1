//! Public interface for evaluating Jsonnet programs.

use std::rc::Rc;

use crate::{
    ast::Expr,
    check,
    desugar,
    env::Env,
    error::Error,
    eval::Evaluator,
    manifest, stdlib,
    trace::{StdTrace, TraceWriter},
    value::{Thunk, Value},
};

/// Default bound on the evaluation backtrace depth.
///
/// Non-tail recursion deeper than this raises a runtime error instead of
/// exhausting the host stack.
pub const DEFAULT_MAX_STACK: usize = 500;

/// Tunable evaluation limits.
#[derive(Debug, Clone, Copy)]
pub struct EvalLimits {
    /// Maximum number of backtrace frames (spans plus function calls).
    pub max_stack: usize,
}

impl Default for EvalLimits {
    fn default() -> Self {
        Self {
            max_stack: DEFAULT_MAX_STACK,
        }
    }
}

/// Primary interface for evaluating Jsonnet programs.
///
/// A `Runner` owns the source file name (used in rendered errors) and the
/// evaluation limits. The program itself is the surface AST produced by the
/// external parser; the pipeline is desugar, check, evaluate, manifest.
///
/// # Example
/// ```
/// use jonnet::{Runner, ast::{Expr, ExprKind, Literal}, span::CodeRange};
///
/// let program = Expr::new(ExprKind::Lit(Literal::Bool(true)), CodeRange::default());
/// let json = Runner::new("example.jsonnet").run(&program).unwrap();
/// assert_eq!(json, serde_json::Value::Bool(true));
/// ```
#[derive(Debug, Clone)]
pub struct Runner {
    file: Rc<str>,
    limits: EvalLimits,
}

impl Runner {
    #[must_use]
    pub fn new(file: &str) -> Self {
        Self {
            file: file.into(),
            limits: EvalLimits::default(),
        }
    }

    #[must_use]
    pub fn with_limits(mut self, limits: EvalLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Evaluates a program with the default standard library, tracing to
    /// stderr.
    pub fn run(&self, program: &Expr) -> Result<serde_json::Value, Error> {
        self.run_with(program, stdlib::std_object(), &mut StdTrace)
    }

    /// Evaluates a program with a caller-supplied `std` object and trace
    /// writer.
    ///
    /// The initial environment binds `std` and nothing else. Extending the
    /// default object (see [`crate::std_object`] and
    /// [`crate::ObjValue::with_field`]) is how embedders expose native
    /// functions to programs.
    pub fn run_with(
        &self,
        program: &Expr,
        std: Value,
        trace: &mut dyn TraceWriter,
    ) -> Result<serde_json::Value, Error> {
        let core = desugar::desugar(program);
        check::check(&core).map_err(|error| Error::check(&self.file, error))?;

        let env = Env::root();
        env.bind("std".into(), Thunk::forced(std));

        let mut evaluator = Evaluator::new(self.file.clone(), self.limits.max_stack, trace);
        let value = evaluator
            .eval(&env, &core)
            .map_err(|error| Error::eval(&self.file, *error))?;
        manifest::manifest(&mut evaluator, &value).map_err(|error| Error::eval(&self.file, *error))
    }
}

/// The one-call form of the pipeline: evaluate `program` against `std`.
pub fn evaluate(program: &Expr, std: Value, file: &str) -> Result<serde_json::Value, Error> {
    Runner::new(file).run_with(program, std, &mut StdTrace)
}
