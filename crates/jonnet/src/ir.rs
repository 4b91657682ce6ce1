//! The core calculus: the compact call-by-need language the evaluator runs.
//!
//! The desugarer lowers the surface AST into this representation. Nodes are
//! reference-counted so closures, thunks and object field bindings can share
//! subtrees without cloning them.

use std::rc::Rc;

use smallvec::SmallVec;

use crate::{
    ast::{BinOp, Literal, UnyOp, Visibility},
    span::CodeRange,
};

/// Parameter list of a core function: `(name, optional default)` pairs.
///
/// All parameters are in scope in every default expression.
pub type Params = Rc<[(Rc<str>, Option<Rc<Core>>)]>;

/// A core expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Core {
    Lit(Literal),
    Var(Rc<str>),
    Fun {
        params: Params,
        body: Rc<Core>,
    },
    App {
        target: Rc<Core>,
        args: Args,
    },
    /// Recursive let: every binding sees every other binding and itself.
    Let {
        binds: Vec<(Rc<str>, Rc<Core>)>,
        body: Rc<Core>,
    },
    BinOp {
        op: BinOp,
        left: Rc<Core>,
        right: Rc<Core>,
    },
    UnyOp {
        op: UnyOp,
        operand: Rc<Core>,
    },
    IfElse {
        cond: Rc<Core>,
        then_branch: Rc<Core>,
        else_branch: Rc<Core>,
    },
    Arr(Vec<Rc<Core>>),
    /// An object literal. Field keys are evaluated when the object is
    /// constructed; values stay lazy. Asserts are checked once, on the first
    /// observation of any field.
    Obj {
        fields: Vec<Field>,
        asserts: Vec<Rc<Core>>,
    },
    /// Polymorphic indexing over objects (string key), arrays and strings
    /// (integer key).
    Lookup {
        target: Rc<Core>,
        key: Rc<Core>,
    },
    Err(Rc<Core>),
    /// A comprehension over `source`, which must evaluate to an array.
    Comp {
        kind: CompKind,
        source: Rc<Core>,
    },
    /// Span annotation; pushes a backtrace frame around `inner`.
    Loc {
        span: CodeRange,
        inner: Rc<Core>,
    },
}

/// A field of a core object literal.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub key: Rc<Core>,
    pub value: Rc<Core>,
    pub visibility: Visibility,
}

/// A call argument.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreArg {
    Pos(Rc<Core>),
    Named(Rc<str>, Rc<Core>),
}

/// Whether call arguments are forced at the call site or passed as thunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strictness {
    Strict,
    #[default]
    Lazy,
}

/// A call-site argument list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Args {
    pub list: SmallVec<[CoreArg; 4]>,
    pub strictness: Strictness,
}

/// The two comprehension shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum CompKind {
    /// Array comprehension: per source element, bind `var`, filter on
    /// `cond`, and splice the array produced by `body`.
    Arr {
        var: Rc<str>,
        body: Rc<Core>,
        cond: Option<Rc<Core>>,
    },
    /// Object comprehension: per source element (a tuple of the iteration
    /// variables), bind `var` and emit one field.
    Obj { var: Rc<str>, field: Field },
}

impl Core {
    /// Strips span annotations off the head of an expression.
    #[must_use]
    pub fn unwrap_loc(&self) -> &Self {
        let mut expr = self;
        while let Self::Loc { inner, .. } = expr {
            expr = inner;
        }
        expr
    }
}
