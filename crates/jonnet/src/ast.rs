//! The surface AST and the vocabulary shared by every pipeline stage.
//!
//! The parser is an external collaborator: it produces this tree, with every
//! node annotated with a [`CodeRange`]. The desugarer lowers it into the core
//! calculus in [`crate::ir`]. Literals, operators and visibility tags are
//! defined here because all later stages reuse them.

use std::rc::Rc;

use strum::Display;

use crate::{number::Scientific, span::CodeRange};

/// A literal constant, shared between the surface AST and the core calculus.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    String(Rc<str>),
    Number(Scientific),
}

/// Binary operators.
///
/// `And`/`Or`/`Xor` and the shifts are bitwise and require whole-number
/// operands; `LAnd`/`LOr` are the short-circuiting logical forms. `In` tests
/// object key membership and `Lookup` is generalized indexing, equivalent to
/// an index expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum BinOp {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Sub,
    #[strum(serialize = "*")]
    Mul,
    #[strum(serialize = "/")]
    Div,
    #[strum(serialize = "%")]
    Mod,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    Ge,
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "!=")]
    Ne,
    #[strum(serialize = "&")]
    And,
    #[strum(serialize = "|")]
    Or,
    #[strum(serialize = "^")]
    Xor,
    #[strum(serialize = "<<")]
    ShiftL,
    #[strum(serialize = ">>")]
    ShiftR,
    #[strum(serialize = "&&")]
    LAnd,
    #[strum(serialize = "||")]
    LOr,
    #[strum(serialize = "in")]
    In,
    #[strum(serialize = "[]")]
    Lookup,
}

/// Unary operators. `Err` raises its operand as an error; the desugarer
/// never emits it (it lowers `error e` directly) but the evaluator accepts
/// it as a first-class operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum UnyOp {
    #[strum(serialize = "~")]
    Compl,
    #[strum(serialize = "!")]
    LNot,
    #[strum(serialize = "+")]
    Plus,
    #[strum(serialize = "-")]
    Minus,
    #[strum(serialize = "error")]
    Err,
}

/// Field visibility, written `:`, `::` and `:::` in Jsonnet source.
///
/// Hidden fields are evaluated normally but dropped from manifested JSON.
/// Forced fields survive manifestation even when they override a hidden
/// field of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
    Forced,
}

/// A function parameter, optionally with a default expression.
///
/// Defaults may reference the other parameters of the same function.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Rc<str>,
    pub default: Option<Expr>,
}

/// A call-site argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Pos(Expr),
    Named(Rc<str>, Expr),
}

/// A `local` binding (also used for object-level locals).
#[derive(Debug, Clone, PartialEq)]
pub struct Bind {
    pub name: Rc<str>,
    pub value: Expr,
}

/// One `for`/`if` clause of a comprehension.
///
/// Multiple specs nest: the first spec is the outermost loop.
#[derive(Debug, Clone, PartialEq)]
pub struct CompSpec {
    pub var: Rc<str>,
    pub iter: Expr,
    pub cond: Option<Expr>,
}

/// An assertion record: `assert cond [: message]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Assert {
    pub cond: Expr,
    pub msg: Option<Expr>,
}

/// An object field name: either fixed in the source or computed at runtime.
///
/// A computed key that evaluates to `null` drops the field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKey {
    Fixed(Rc<str>),
    Computed(Expr),
}

/// One field definition in an object literal or object comprehension.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjField {
    pub key: FieldKey,
    pub value: Expr,
    pub visibility: Visibility,
}

/// An expression annotated with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub span: CodeRange,
    pub kind: ExprKind,
}

impl Expr {
    #[must_use]
    pub fn new(kind: ExprKind, span: CodeRange) -> Self {
        Self { span, kind }
    }
}

/// The surface expression forms produced by the parser.
///
/// `self`, `super` and `$` are ordinary identifiers at this level; the
/// desugarer introduces the bindings that give them meaning.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Lit(Literal),
    Ident(Rc<str>),
    /// A function literal. All parameters are mutually recursive: a default
    /// may reference any parameter, including itself.
    Fun {
        params: Vec<Param>,
        body: Box<Expr>,
    },
    Apply {
        target: Box<Expr>,
        args: Vec<Arg>,
    },
    /// `local a = ..., b = ...; body` with mutually recursive bindings.
    Local {
        binds: Vec<Bind>,
        body: Box<Expr>,
    },
    BinOp {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    UnyOp {
        op: UnyOp,
        operand: Box<Expr>,
    },
    IfElse {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    /// `if c then t` without an else; evaluates to `null` when the condition
    /// is false.
    If {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
    },
    Arr(Vec<Expr>),
    /// An object literal: field definitions, object-level locals visible to
    /// every field, and assertions checked when the object is first observed.
    Obj {
        fields: Vec<ObjField>,
        locals: Vec<Bind>,
        asserts: Vec<Assert>,
    },
    /// Field access: `target.field`.
    Lookup {
        target: Box<Expr>,
        field: Rc<str>,
    },
    /// Index access: `target[index]`.
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    Err(Box<Expr>),
    /// `assert cond [: msg]; rest`
    Assert {
        assert: Box<Assert>,
        rest: Box<Expr>,
    },
    /// `target[start:end:step]`; absent components take their defaults.
    Slice {
        target: Box<Expr>,
        start: Option<Box<Expr>>,
        end: Option<Box<Expr>>,
        step: Option<Box<Expr>>,
    },
    /// `[body for x in xs if cond ...]`
    ArrComp {
        body: Box<Expr>,
        comp: Vec<CompSpec>,
    },
    /// `{ [key]: value for x in xs ... }` with optional leading locals.
    ObjComp {
        field: Box<ObjField>,
        comp: Vec<CompSpec>,
        locals: Vec<Bind>,
    },
}
