//! Runtime values: the lazy graph of thunks, arrays, objects and functions.

use std::{cell::RefCell, fmt, rc::Rc};

use indexmap::IndexMap;

use crate::{
    ast::{Literal, Visibility},
    env::Env,
    error::Exception,
    ir::{Core, Params},
    number::Scientific,
    stdlib::StdFn,
};

/// A fully or partially evaluated Jsonnet value.
///
/// Arrays and objects hold thunks, not values: their elements and fields are
/// evaluated on demand and memoized in place.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Num(Scientific),
    Str(Rc<str>),
    Arr(Rc<Vec<Thunk>>),
    Obj(ObjValue),
    Func(Rc<FuncVal>),
}

impl Value {
    /// The kind name used in error messages and by `std.type`.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Num(_) => "number",
            Self::Str(_) => "string",
            Self::Arr(_) => "array",
            Self::Obj(_) => "object",
            Self::Func(_) => "function",
        }
    }

    pub(crate) fn from_literal(literal: &Literal) -> Self {
        match literal {
            Literal::Null => Self::Null,
            Literal::Bool(b) => Self::Bool(*b),
            Literal::String(s) => Self::Str(s.clone()),
            Literal::Number(n) => Self::Num(n.clone()),
        }
    }

    /// Wraps a host closure as a Jsonnet function value.
    ///
    /// The closure receives its arguments fully forced, in parameter order.
    /// Returning `Err` surfaces as a runtime error with the given message.
    #[must_use]
    pub fn native(
        name: &str,
        params: &[&str],
        call: impl Fn(&[Value]) -> Result<Value, String> + 'static,
    ) -> Self {
        Self::Func(Rc::new(FuncVal(FuncImpl::Native(NativeFunc {
            name: name.into(),
            params: params.iter().map(|p| Rc::from(*p)).collect(),
            call: Rc::new(call),
        }))))
    }
}

/// A callable value. Opaque to embedders; constructed by the evaluator, by
/// [`crate::std_object`] and by [`Value::native`].
pub struct FuncVal(pub(crate) FuncImpl);

pub(crate) enum FuncImpl {
    /// A Jsonnet function closed over its defining environment. The name is
    /// the binding or field it was defined under, for backtraces.
    Closure {
        name: Option<Rc<str>>,
        env: Env,
        params: Params,
        body: Rc<Core>,
    },
    /// A standard-library builtin.
    Builtin(StdFn),
    /// A host-registered native function.
    Native(NativeFunc),
}

impl FuncVal {
    /// The name shown in backtrace frames.
    pub(crate) fn trace_name(&self) -> String {
        match &self.0 {
            FuncImpl::Closure { name, .. } => match name {
                Some(name) => name.to_string(),
                None => "anonymous".to_owned(),
            },
            FuncImpl::Builtin(builtin) => format!("std.{builtin}"),
            FuncImpl::Native(native) => native.name.to_string(),
        }
    }
}

impl fmt::Debug for FuncVal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            FuncImpl::Closure { name, params, .. } => f
                .debug_struct("Closure")
                .field("name", name)
                .field("params", &params.len())
                .finish_non_exhaustive(),
            FuncImpl::Builtin(builtin) => write!(f, "Builtin({builtin})"),
            FuncImpl::Native(native) => write!(f, "Native({})", native.name),
        }
    }
}

pub(crate) struct NativeFunc {
    pub(crate) name: Rc<str>,
    pub(crate) params: Rc<[Rc<str>]>,
    pub(crate) call: Rc<dyn Fn(&[Value]) -> Result<Value, String>>,
}

/// A memoized deferred computation.
///
/// The cell is written at most once: a successful force caches the value,
/// a failed force caches the error, and observing a cell mid-force is the
/// infinite-recursion signal.
#[derive(Clone)]
pub struct Thunk(Rc<RefCell<ThunkState>>);

pub(crate) enum ThunkState {
    Pending {
        env: Env,
        expr: Rc<Core>,
        /// Binding or field name, attached to closures produced by this
        /// thunk so backtraces can name them.
        name: Option<Rc<str>>,
    },
    InProgress,
    Forced(Value),
    Failed(Box<Exception>),
}

/// What a caller should do after opening a thunk cell.
pub(crate) enum ThunkForce {
    Cached(Value),
    CachedErr(Box<Exception>),
    /// The cell was already mid-force: infinite recursion.
    Cycle,
    /// The cell is now `InProgress`; evaluate and call [`Thunk::finish`].
    Run {
        env: Env,
        expr: Rc<Core>,
        name: Option<Rc<str>>,
    },
}

impl Thunk {
    pub(crate) fn pending(env: Env, expr: Rc<Core>) -> Self {
        Self::pending_named(env, expr, None)
    }

    pub(crate) fn pending_named(env: Env, expr: Rc<Core>, name: Option<Rc<str>>) -> Self {
        Self(Rc::new(RefCell::new(ThunkState::Pending { env, expr, name })))
    }

    pub(crate) fn forced(value: Value) -> Self {
        Self(Rc::new(RefCell::new(ThunkState::Forced(value))))
    }

    /// Opens the cell for forcing, transitioning `Pending` to `InProgress`.
    pub(crate) fn begin_force(&self) -> ThunkForce {
        let mut state = self.0.borrow_mut();
        match &*state {
            ThunkState::Forced(value) => ThunkForce::Cached(value.clone()),
            ThunkState::Failed(error) => ThunkForce::CachedErr(error.clone()),
            ThunkState::InProgress => ThunkForce::Cycle,
            ThunkState::Pending { .. } => {
                let ThunkState::Pending { env, expr, name } =
                    std::mem::replace(&mut *state, ThunkState::InProgress)
                else {
                    unreachable!("matched Pending above");
                };
                ThunkForce::Run { env, expr, name }
            }
        }
    }

    /// Writes the outcome of a force back into the cell.
    pub(crate) fn finish(&self, result: &Result<Value, Box<Exception>>) {
        let mut state = self.0.borrow_mut();
        *state = match result {
            Ok(value) => ThunkState::Forced(value.clone()),
            Err(error) => ThunkState::Failed(error.clone()),
        };
    }

    /// The cached value, if this thunk has already been forced.
    #[must_use]
    pub fn peek(&self) -> Option<Value> {
        match &*self.0.borrow() {
            ThunkState::Forced(value) => Some(value.clone()),
            _ => None,
        }
    }
}

/// State tag only: printing the captured environment would recurse through
/// the value graph, which may be cyclic.
impl fmt::Debug for Thunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match &*self.0.borrow() {
            ThunkState::Pending { .. } => "pending",
            ThunkState::InProgress => "in-progress",
            ThunkState::Forced(_) => "forced",
            ThunkState::Failed(_) => "failed",
        };
        write!(f, "Thunk({tag})")
    }
}

/// The open `(environment, expression)` pair of an object field or assert.
///
/// Retained on the object even after the field's thunk is forced so that
/// composition can re-close the field over a new `self`/`super`.
#[derive(Debug, Clone)]
pub(crate) struct OpenBind {
    pub env: Env,
    pub expr: Rc<Core>,
}

/// One field of an object value.
#[derive(Debug, Clone)]
pub(crate) struct ObjField {
    pub visibility: Visibility,
    /// `None` for host-provided fields, which hold plain values and never
    /// reference `self`.
    pub bind: Option<OpenBind>,
    pub thunk: Thunk,
}

impl ObjField {
    pub(crate) fn is_visible(&self) -> bool {
        matches!(self.visibility, Visibility::Visible | Visibility::Forced)
    }
}

enum AssertState {
    NotRun,
    Running,
    Done,
    Failed(Box<Exception>),
}

/// An object value: fields in insertion order of first appearance, plus the
/// object's assertions and their run-once state.
///
/// The field map sits behind a `RefCell` because an object's fields close
/// over the object itself (`self`): construction fills the map after the
/// handle exists. The map is never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ObjValue(Rc<ObjData>);

#[derive(Debug)]
struct ObjData {
    fields: RefCell<IndexMap<Rc<str>, ObjField>>,
    asserts: RefCell<Vec<OpenBind>>,
    assert_state: RefCell<AssertState>,
}

impl fmt::Debug for AssertState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::NotRun => "not-run",
            Self::Running => "running",
            Self::Done => "done",
            Self::Failed(_) => "failed",
        };
        f.write_str(tag)
    }
}

/// What a caller should do about an object's assertions.
pub(crate) enum AssertsForce {
    /// Asserts have not run yet; evaluate these binds and report back
    /// through [`ObjValue::finish_asserts`].
    Run(Vec<OpenBind>),
    /// Already checked (or mid-check higher up the stack): nothing to do.
    Settled,
    CachedErr(Box<Exception>),
}

impl ObjValue {
    /// Creates an object with no fields filled in yet. `fill` completes it.
    pub(crate) fn empty() -> Self {
        Self(Rc::new(ObjData {
            fields: RefCell::new(IndexMap::new()),
            asserts: RefCell::new(Vec::new()),
            assert_state: RefCell::new(AssertState::NotRun),
        }))
    }

    pub(crate) fn fill(&self, fields: IndexMap<Rc<str>, ObjField>, asserts: Vec<OpenBind>) {
        *self.0.fields.borrow_mut() = fields;
        *self.0.asserts.borrow_mut() = asserts;
    }

    pub(crate) fn new(fields: IndexMap<Rc<str>, ObjField>, asserts: Vec<OpenBind>) -> Self {
        let obj = Self::empty();
        obj.fill(fields, asserts);
        obj
    }

    pub(crate) fn get(&self, name: &str) -> Option<ObjField> {
        self.0.fields.borrow().get(name).cloned()
    }

    /// Fields in insertion order of first appearance.
    pub(crate) fn entries(&self) -> Vec<(Rc<str>, ObjField)> {
        self.0
            .fields
            .borrow()
            .iter()
            .map(|(name, field)| (name.clone(), field.clone()))
            .collect()
    }

    /// Field names, lexicographically sorted.
    #[must_use]
    pub fn field_names(&self, include_hidden: bool) -> Vec<Rc<str>> {
        let mut names: Vec<Rc<str>> = self
            .0
            .fields
            .borrow()
            .iter()
            .filter(|(_, field)| include_hidden || field.is_visible())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn has(&self, name: &str, include_hidden: bool) -> bool {
        self.0
            .fields
            .borrow()
            .get(name)
            .is_some_and(|field| include_hidden || field.is_visible())
    }

    pub(crate) fn visible_count(&self) -> usize {
        self.0
            .fields
            .borrow()
            .values()
            .filter(|field| field.is_visible())
            .count()
    }

    /// Opens the assert group for checking, marking it in progress.
    ///
    /// Re-entrant observation (an assert reading a field of `self`) reports
    /// `Settled` so the check neither recurses nor loops.
    pub(crate) fn begin_asserts(&self) -> AssertsForce {
        let mut state = self.0.assert_state.borrow_mut();
        match &*state {
            AssertState::Done | AssertState::Running => AssertsForce::Settled,
            AssertState::Failed(error) => AssertsForce::CachedErr(error.clone()),
            AssertState::NotRun => {
                *state = AssertState::Running;
                AssertsForce::Run(self.0.asserts.borrow().clone())
            }
        }
    }

    pub(crate) fn finish_asserts(&self, result: &Result<(), Box<Exception>>) {
        let mut state = self.0.assert_state.borrow_mut();
        *state = match result {
            Ok(()) => AssertState::Done,
            Err(error) => AssertState::Failed(error.clone()),
        };
    }

    pub(crate) fn asserts(&self) -> Vec<OpenBind> {
        self.0.asserts.borrow().clone()
    }

    /// Returns a copy of this object with one extra field holding a plain
    /// value. This is the embedder hook for extending `std` with native
    /// functions or constants.
    #[must_use]
    pub fn with_field(&self, name: &str, value: Value, visibility: Visibility) -> Self {
        let mut fields = self.0.fields.borrow().clone();
        fields.insert(
            name.into(),
            ObjField {
                visibility,
                bind: None,
                thunk: Thunk::forced(value),
            },
        );
        Self::new(fields, self.asserts())
    }
}
