//! The environment-passing, call-by-need evaluator.
//!
//! Evaluation produces a lazy value graph: arrays and objects hold thunks,
//! and every thunk is forced at most once, caching either its value or its
//! error. The evaluator owns the explicit backtrace stack; frames are pushed
//! on span annotations and function application, and a snapshot is attached
//! to every error at the point it is raised.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::{
    ast::{BinOp, UnyOp, Visibility},
    env::Env,
    error::{EvalError, EvalResult, Exception, StackFrame},
    ir::{Args, CompKind, Core, CoreArg, Field, Strictness},
    manifest,
    number::Scientific,
    span::CodeRange,
    trace::TraceWriter,
    value::{
        AssertsForce, FuncImpl, FuncVal, ObjField, ObjValue, OpenBind, Thunk, ThunkForce, Value,
    },
};

/// The binder every object literal introduces; composition shadows it.
const SELF: &str = "self";
/// Bound on overriding fields to the overridden object.
const SUPER: &str = "super";

pub(crate) struct Evaluator<'a> {
    file: Rc<str>,
    stack: Vec<StackFrame>,
    max_stack: usize,
    trace: &'a mut dyn TraceWriter,
}

impl<'a> Evaluator<'a> {
    pub fn new(file: Rc<str>, max_stack: usize, trace: &'a mut dyn TraceWriter) -> Self {
        Self {
            file,
            stack: Vec::new(),
            max_stack,
            trace,
        }
    }

    /// Attaches the current backtrace (innermost frame first) to an error.
    pub(crate) fn fail(&self, error: EvalError) -> Box<Exception> {
        Box::new(Exception {
            error,
            frames: self.stack.iter().rev().cloned().collect(),
        })
    }

    fn push_frame(&mut self, frame: StackFrame) -> EvalResult<()> {
        if self.stack.len() >= self.max_stack {
            return Err(self.fail(EvalError::RuntimeError(
                "max stack frames exceeded".to_owned(),
            )));
        }
        self.stack.push(frame);
        Ok(())
    }

    /// The span of the innermost annotation, for frames without one of
    /// their own.
    fn current_span(&self) -> CodeRange {
        self.stack.last().map(|f| f.span).unwrap_or_default()
    }

    pub(crate) fn eval(&mut self, env: &Env, expr: &Core) -> EvalResult<Value> {
        match expr {
            Core::Loc { span, inner } => {
                self.push_frame(StackFrame::anonymous(*span))?;
                let result = self.eval(env, inner);
                self.stack.pop();
                result
            }
            Core::Lit(literal) => Ok(Value::from_literal(literal)),
            Core::Var(name) => {
                let thunk = env
                    .lookup(name)
                    .ok_or_else(|| self.fail(EvalError::VarNotFound(name.to_string())))?;
                self.force(&thunk)
            }
            Core::Fun { params, body } => Ok(Value::Func(Rc::new(FuncVal(FuncImpl::Closure {
                name: None,
                env: env.clone(),
                params: params.clone(),
                body: body.clone(),
            })))),
            Core::App { target, args } => {
                let func = self.eval(env, target)?;
                self.apply(env, &func, args)
            }
            Core::Let { binds, body } => {
                let scope = env.child();
                for (name, value) in binds {
                    scope.bind(
                        name.clone(),
                        Thunk::pending_named(scope.clone(), value.clone(), Some(name.clone())),
                    );
                }
                self.eval(&scope, body)
            }
            Core::BinOp { op, left, right } => self.eval_binop(env, *op, left, right),
            Core::UnyOp { op, operand } => self.eval_unyop(env, *op, operand),
            Core::IfElse {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond = self.eval(env, cond)?;
                if self.want_bool(&cond)? {
                    self.eval(env, then_branch)
                } else {
                    self.eval(env, else_branch)
                }
            }
            Core::Arr(items) => Ok(Value::Arr(Rc::new(
                items
                    .iter()
                    .map(|item| Thunk::pending(env.clone(), item.clone()))
                    .collect(),
            ))),
            Core::Obj { fields, asserts } => self.build_object(env, fields, asserts),
            Core::Lookup { target, key } => {
                let target = self.eval(env, target)?;
                let key = self.eval(env, key)?;
                self.lookup_value(&target, &key)
            }
            Core::Err(message) => {
                let message = self.eval(env, message)?;
                let rendered = self.to_display_string(&message)?;
                Err(self.fail(EvalError::RuntimeError(rendered)))
            }
            Core::Comp { kind, source } => match kind {
                CompKind::Arr { var, body, cond } => {
                    self.eval_arr_comp(env, var, body, cond.as_deref(), source)
                }
                CompKind::Obj { var, field } => self.eval_obj_comp(env, var, field, source),
            },
        }
    }

    /// Forces a thunk, caching the outcome in its cell.
    pub(crate) fn force(&mut self, thunk: &Thunk) -> EvalResult<Value> {
        match thunk.begin_force() {
            ThunkForce::Cached(value) => Ok(value),
            ThunkForce::CachedErr(error) => Err(error),
            ThunkForce::Cycle => {
                Err(self.fail(EvalError::RuntimeError("infinite recursion".to_owned())))
            }
            ThunkForce::Run { env, expr, name } => {
                let result = match name {
                    Some(name) => self.eval_named(&env, &expr, name),
                    None => self.eval(&env, &expr),
                };
                thunk.finish(&result);
                result
            }
        }
    }

    /// Like `eval`, but a function literal takes `name` for its backtrace
    /// frames. Used for `let` bindings and object fields.
    fn eval_named(&mut self, env: &Env, expr: &Rc<Core>, name: Rc<str>) -> EvalResult<Value> {
        match expr.unwrap_loc() {
            Core::Fun { params, body } => Ok(Value::Func(Rc::new(FuncVal(FuncImpl::Closure {
                name: Some(name),
                env: env.clone(),
                params: params.clone(),
                body: body.clone(),
            })))),
            _ => self.eval(env, expr),
        }
    }

    fn eval_binop(&mut self, env: &Env, op: BinOp, left: &Core, right: &Core) -> EvalResult<Value> {
        match op {
            BinOp::LAnd => {
                let left = self.eval(env, left)?;
                if !self.want_bool(&left)? {
                    return Ok(Value::Bool(false));
                }
                let right = self.eval(env, right)?;
                Ok(Value::Bool(self.want_bool(&right)?))
            }
            BinOp::LOr => {
                let left = self.eval(env, left)?;
                if self.want_bool(&left)? {
                    return Ok(Value::Bool(true));
                }
                let right = self.eval(env, right)?;
                Ok(Value::Bool(self.want_bool(&right)?))
            }
            BinOp::Lookup => {
                let target = self.eval(env, left)?;
                let key = self.eval(env, right)?;
                self.lookup_value(&target, &key)
            }
            BinOp::In => {
                let key = self.eval(env, left)?;
                let key = self.want_str(&key)?.clone();
                let target = self.eval(env, right)?;
                let obj = self.want_obj(&target)?;
                Ok(Value::Bool(obj.has(&key, true)))
            }
            _ => {
                let left = self.eval(env, left)?;
                let right = self.eval(env, right)?;
                self.binop_values(op, &left, &right)
            }
        }
    }

    fn binop_values(&mut self, op: BinOp, left: &Value, right: &Value) -> EvalResult<Value> {
        match op {
            BinOp::Add => self.add_values(left, right),
            BinOp::Sub => {
                let (a, b) = (self.want_num(left)?, self.want_num(right)?);
                Ok(Value::Num(a.sub(b)))
            }
            BinOp::Mul => {
                let (a, b) = (self.want_num(left)?, self.want_num(right)?);
                Ok(Value::Num(a.mul(b)))
            }
            BinOp::Div => {
                let (a, b) = (self.want_num(left)?, self.want_num(right)?);
                if b.is_zero() {
                    return Err(self.fail(EvalError::DivByZero));
                }
                let quotient = a
                    .div(b)
                    .ok_or_else(|| self.fail(EvalError::RuntimeError("numeric overflow".to_owned())))?;
                Ok(Value::Num(quotient))
            }
            BinOp::Mod => {
                let (a, b) = (self.want_num(left)?, self.want_num(right)?);
                if b.is_zero() {
                    return Err(self.fail(EvalError::DivByZero));
                }
                let remainder = a
                    .rem(b)
                    .ok_or_else(|| self.fail(EvalError::RuntimeError("numeric overflow".to_owned())))?;
                Ok(Value::Num(remainder))
            }
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => self.compare_values(op, left, right),
            BinOp::Eq => {
                let equal = self.equals(left, right)?;
                Ok(Value::Bool(equal))
            }
            BinOp::Ne => {
                let equal = self.equals(left, right)?;
                Ok(Value::Bool(!equal))
            }
            BinOp::And | BinOp::Or | BinOp::Xor => {
                let (a, b) = (self.want_int(left)?, self.want_int(right)?);
                let out = match op {
                    BinOp::And => a & b,
                    BinOp::Or => a | b,
                    _ => a ^ b,
                };
                Ok(Value::Num(Scientific::from_i64(out)))
            }
            BinOp::ShiftL | BinOp::ShiftR => {
                let (a, b) = (self.want_int(left)?, self.want_int(right)?);
                if b < 0 {
                    return Err(self.fail(EvalError::RuntimeError(
                        "shift by negative amount".to_owned(),
                    )));
                }
                let amount = (b as u64 & 63) as u32;
                let out = match op {
                    BinOp::ShiftL => a.wrapping_shl(amount),
                    _ => a.wrapping_shr(amount),
                };
                Ok(Value::Num(Scientific::from_i64(out)))
            }
            BinOp::LAnd | BinOp::LOr | BinOp::In | BinOp::Lookup => {
                unreachable!("dispatched before operands are forced")
            }
        }
    }

    fn add_values(&mut self, left: &Value, right: &Value) -> EvalResult<Value> {
        match (left, right) {
            (Value::Num(a), Value::Num(b)) => Ok(Value::Num(a.add(b))),
            (Value::Str(a), Value::Str(b)) => {
                let mut out = String::with_capacity(a.len() + b.len());
                out.push_str(a);
                out.push_str(b);
                Ok(Value::Str(out.into()))
            }
            // A string on either side coerces the other operand.
            (Value::Str(a), b) => {
                let rendered = self.to_display_string(b)?;
                Ok(Value::Str(format!("{a}{rendered}").into()))
            }
            (a, Value::Str(b)) => {
                let rendered = self.to_display_string(a)?;
                Ok(Value::Str(format!("{rendered}{b}").into()))
            }
            (Value::Arr(a), Value::Arr(b)) => {
                let mut out = Vec::with_capacity(a.len() + b.len());
                out.extend(a.iter().cloned());
                out.extend(b.iter().cloned());
                Ok(Value::Arr(Rc::new(out)))
            }
            (Value::Obj(a), Value::Obj(b)) => Ok(self.compose(a, b)),
            (a, b) => Err(self.fail(EvalError::TypeMismatch {
                expected: "operands supporting '+'".to_owned(),
                actual: format!("{} and {}", described(a), described(b)),
            })),
        }
    }

    fn compare_values(&mut self, op: BinOp, left: &Value, right: &Value) -> EvalResult<Value> {
        let ordering = match (left, right) {
            (Value::Num(a), Value::Num(b)) => a.cmp(b),
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (a, b) => {
                return Err(self.fail(EvalError::TypeMismatch {
                    expected: "two numbers or two strings".to_owned(),
                    actual: format!("{} and {}", described(a), described(b)),
                }));
            }
        };
        let keep = match op {
            BinOp::Lt => ordering.is_lt(),
            BinOp::Le => ordering.is_le(),
            BinOp::Gt => ordering.is_gt(),
            _ => ordering.is_ge(),
        };
        Ok(Value::Bool(keep))
    }

    fn eval_unyop(&mut self, env: &Env, op: UnyOp, operand: &Core) -> EvalResult<Value> {
        let value = self.eval(env, operand)?;
        match op {
            UnyOp::Compl => {
                let n = self.want_int(&value)?;
                Ok(Value::Num(Scientific::from_i64(!n)))
            }
            UnyOp::LNot => {
                let b = self.want_bool(&value)?;
                Ok(Value::Bool(!b))
            }
            UnyOp::Plus => {
                self.want_num(&value)?;
                Ok(value)
            }
            UnyOp::Minus => {
                let n = self.want_num(&value)?;
                Ok(Value::Num(-n.clone()))
            }
            UnyOp::Err => {
                let rendered = self.to_display_string(&value)?;
                Err(self.fail(EvalError::RuntimeError(rendered)))
            }
        }
    }

    fn build_object(
        &mut self,
        env: &Env,
        fields: &[Field],
        asserts: &[Rc<Core>],
    ) -> EvalResult<Value> {
        let mut map: IndexMap<Rc<str>, ObjField> = IndexMap::with_capacity(fields.len());
        for field in fields {
            let key = self.eval(env, &field.key)?;
            let name: Rc<str> = match key {
                Value::Str(name) => name,
                Value::Null => continue,
                other => return Err(self.fail(EvalError::InvalidKey(described(&other)))),
            };
            if map.contains_key(&name) {
                return Err(self.fail(EvalError::RuntimeError(format!(
                    "duplicate field name: '{name}'"
                ))));
            }
            map.insert(
                name.clone(),
                ObjField {
                    visibility: field.visibility,
                    bind: Some(OpenBind {
                        env: env.clone(),
                        expr: field.value.clone(),
                    }),
                    thunk: Thunk::pending_named(env.clone(), field.value.clone(), Some(name)),
                },
            );
        }
        let asserts = asserts
            .iter()
            .map(|assert| OpenBind {
                env: env.clone(),
                expr: assert.clone(),
            })
            .collect();
        Ok(Value::Obj(ObjValue::new(map, asserts)))
    }

    /// Runs an object's assertions once; results (including failures) are
    /// cached on the object.
    pub(crate) fn run_asserts(&mut self, obj: &ObjValue) -> EvalResult<()> {
        match obj.begin_asserts() {
            AssertsForce::Settled => Ok(()),
            AssertsForce::CachedErr(error) => Err(error),
            AssertsForce::Run(binds) => {
                let mut result = Ok(());
                for bind in binds {
                    if let Err(error) = self.eval(&bind.env, &bind.expr) {
                        result = Err(error);
                        break;
                    }
                }
                obj.finish_asserts(&result);
                result
            }
        }
    }

    /// Polymorphic indexing over objects, arrays and strings.
    pub(crate) fn lookup_value(&mut self, target: &Value, key: &Value) -> EvalResult<Value> {
        match (target, key) {
            (Value::Obj(obj), Value::Str(name)) => {
                self.run_asserts(obj)?;
                match obj.get(name) {
                    Some(field) => self.force(&field.thunk),
                    None => Err(self.fail(EvalError::NoSuchKey(name.to_string()))),
                }
            }
            (Value::Obj(_), other) => Err(self.fail(EvalError::InvalidKey(described(other)))),
            (Value::Arr(items), Value::Num(n)) => {
                let index = n
                    .to_i64()
                    .ok_or_else(|| self.fail(EvalError::InvalidIndex(n.render())))?;
                let slot = usize::try_from(index)
                    .ok()
                    .and_then(|i| items.get(i))
                    .ok_or_else(|| self.fail(EvalError::IndexOutOfBounds(index)))?;
                self.force(slot)
            }
            (Value::Arr(_), other) => Err(self.fail(EvalError::InvalidIndex(described(other)))),
            (Value::Str(s), Value::Num(n)) => {
                let index = n
                    .to_i64()
                    .ok_or_else(|| self.fail(EvalError::InvalidIndex(n.render())))?;
                let c = usize::try_from(index)
                    .ok()
                    .and_then(|i| s.chars().nth(i))
                    .ok_or_else(|| self.fail(EvalError::IndexOutOfBounds(index)))?;
                Ok(Value::Str(c.to_string().into()))
            }
            (Value::Str(_), other) => Err(self.fail(EvalError::InvalidIndex(described(other)))),
            (other, _) => Err(self.fail(EvalError::TypeMismatch {
                expected: "an array, an object or a string".to_owned(),
                actual: described(other),
            })),
        }
    }

    /// Applies a function to call-site arguments.
    fn apply(&mut self, call_env: &Env, func: &Value, args: &Args) -> EvalResult<Value> {
        let Value::Func(func) = func else {
            return Err(self.fail(EvalError::TypeMismatch {
                expected: "a function".to_owned(),
                actual: described(func),
            }));
        };
        match &func.0 {
            FuncImpl::Closure {
                env, params, body, ..
            } => {
                let names: Vec<Rc<str>> = params.iter().map(|(name, _)| name.clone()).collect();
                let slots = self.bind_args(call_env, &names, args)?;
                let scope = env.child();
                let mut thunks = Vec::with_capacity(params.len());
                for ((name, default), slot) in params.iter().zip(slots) {
                    let thunk = match slot {
                        Some(thunk) => thunk,
                        // Defaults evaluate in the closure's environment
                        // extended with every parameter, so they may
                        // reference each other.
                        None => match default {
                            Some(default) => Thunk::pending(scope.clone(), default.clone()),
                            None => {
                                return Err(
                                    self.fail(EvalError::ParamNotBound(name.to_string()))
                                );
                            }
                        },
                    };
                    scope.bind(name.clone(), thunk.clone());
                    thunks.push(thunk);
                }
                if args.strictness == Strictness::Strict {
                    for thunk in &thunks {
                        self.force(thunk)?;
                    }
                }
                let frame = StackFrame::named(&func.trace_name(), self.current_span());
                self.push_frame(frame)?;
                let result = self.eval(&scope, body);
                self.stack.pop();
                result
            }
            FuncImpl::Builtin(builtin) => {
                let values = self.bind_forced(call_env, builtin.param_names(), args)?;
                let frame = StackFrame::named(&func.trace_name(), self.current_span());
                self.push_frame(frame)?;
                let result = crate::stdlib::call(self, *builtin, &values);
                self.stack.pop();
                result
            }
            FuncImpl::Native(native) => {
                let names: Vec<Rc<str>> = native.params.to_vec();
                let values = self.bind_forced(call_env, &names, args)?;
                let frame = StackFrame::named(&func.trace_name(), self.current_span());
                self.push_frame(frame)?;
                let result = (native.call)(&values)
                    .map_err(|message| self.fail(EvalError::StdError(message)));
                self.stack.pop();
                result
            }
        }
    }

    /// Matches call-site arguments against parameter names.
    ///
    /// Named arguments bind their parameter directly; positional arguments
    /// then fill the unfilled parameters left to right, skipping positions
    /// already taken by name.
    fn bind_args<N: AsRef<str>>(
        &mut self,
        call_env: &Env,
        param_names: &[N],
        args: &Args,
    ) -> EvalResult<Vec<Option<Thunk>>> {
        let mut slots: Vec<Option<Thunk>> = vec![None; param_names.len()];
        for arg in &args.list {
            if let CoreArg::Named(name, expr) = arg {
                let index = param_names
                    .iter()
                    .position(|p| p.as_ref() == name.as_ref())
                    .ok_or_else(|| self.fail(EvalError::BadParam(name.to_string())))?;
                if slots[index].is_some() {
                    return Err(self.fail(EvalError::BadParam(name.to_string())));
                }
                slots[index] = Some(Thunk::pending(call_env.clone(), expr.clone()));
            }
        }
        let mut cursor = 0;
        for arg in &args.list {
            if let CoreArg::Pos(expr) = arg {
                while cursor < slots.len() && slots[cursor].is_some() {
                    cursor += 1;
                }
                if cursor == slots.len() {
                    return Err(self.fail(EvalError::TooManyArgs(param_names.len())));
                }
                slots[cursor] = Some(Thunk::pending(call_env.clone(), expr.clone()));
                cursor += 1;
            }
        }
        Ok(slots)
    }

    /// Binds and forces every argument; used for builtins and natives,
    /// which have no defaults and expect weak head-normal values.
    fn bind_forced<N: AsRef<str>>(
        &mut self,
        call_env: &Env,
        param_names: &[N],
        args: &Args,
    ) -> EvalResult<Vec<Value>> {
        let slots = self.bind_args(call_env, param_names, args)?;
        let mut values = Vec::with_capacity(slots.len());
        for (slot, name) in slots.into_iter().zip(param_names) {
            match slot {
                Some(thunk) => values.push(self.force(&thunk)?),
                None => {
                    return Err(self.fail(EvalError::ParamNotBound(name.as_ref().to_owned())));
                }
            }
        }
        Ok(values)
    }

    /// Calls a function with already-evaluated arguments, positionally.
    /// This is how the standard library's higher-order functions call back.
    pub(crate) fn call_value(&mut self, func: &Value, args: &[Value]) -> EvalResult<Value> {
        let Value::Func(func) = func else {
            return Err(self.fail(EvalError::TypeMismatch {
                expected: "a function".to_owned(),
                actual: described(func),
            }));
        };
        match &func.0 {
            FuncImpl::Closure {
                env, params, body, ..
            } => {
                if args.len() > params.len() {
                    return Err(self.fail(EvalError::TooManyArgs(params.len())));
                }
                let scope = env.child();
                for (index, (name, default)) in params.iter().enumerate() {
                    let thunk = match args.get(index) {
                        Some(value) => Thunk::forced(value.clone()),
                        None => match default {
                            Some(default) => Thunk::pending(scope.clone(), default.clone()),
                            None => {
                                return Err(
                                    self.fail(EvalError::ParamNotBound(name.to_string()))
                                );
                            }
                        },
                    };
                    scope.bind(name.clone(), thunk);
                }
                let frame = StackFrame::named(&func.trace_name(), self.current_span());
                self.push_frame(frame)?;
                let result = self.eval(&scope, body);
                self.stack.pop();
                result
            }
            FuncImpl::Builtin(builtin) => {
                let names = builtin.param_names();
                if args.len() > names.len() {
                    return Err(self.fail(EvalError::TooManyArgs(names.len())));
                }
                if args.len() < names.len() {
                    return Err(
                        self.fail(EvalError::ParamNotBound(names[args.len()].to_string()))
                    );
                }
                crate::stdlib::call(self, *builtin, args)
            }
            FuncImpl::Native(native) => (native.call)(args)
                .map_err(|message| self.fail(EvalError::StdError(message))),
        }
    }

    /// `o1 + o2`: right override, late-bound `self`, `super` on overriding
    /// fields. Every field's open binding is re-closed over the composite,
    /// allocating fresh memo cells; field order is first appearance (left
    /// object first), overrides staying in the left position.
    fn compose(&mut self, left: &ObjValue, right: &ObjValue) -> Value {
        let composite = ObjValue::empty();
        let self_thunk = Thunk::forced(Value::Obj(composite.clone()));
        let super_thunk = Thunk::forced(Value::Obj(left.clone()));

        let mut fields: IndexMap<Rc<str>, ObjField> = IndexMap::new();
        for (name, left_field) in left.entries() {
            match right.get(&name) {
                Some(right_field) => {
                    let visibility =
                        compose_visibility(left_field.visibility, right_field.visibility);
                    fields.insert(
                        name.clone(),
                        reclose_field(&right_field, visibility, &name, &self_thunk, Some(&super_thunk)),
                    );
                }
                None => {
                    fields.insert(
                        name.clone(),
                        reclose_field(&left_field, left_field.visibility, &name, &self_thunk, None),
                    );
                }
            }
        }
        for (name, right_field) in right.entries() {
            if !fields.contains_key(&name) {
                fields.insert(
                    name.clone(),
                    reclose_field(&right_field, right_field.visibility, &name, &self_thunk, None),
                );
            }
        }

        let mut asserts = Vec::new();
        for bind in left.asserts() {
            asserts.push(reclose_bind(&bind, &self_thunk, None));
        }
        for bind in right.asserts() {
            asserts.push(reclose_bind(&bind, &self_thunk, Some(&super_thunk)));
        }

        composite.fill(fields, asserts);
        Value::Obj(composite)
    }

    fn eval_arr_comp(
        &mut self,
        env: &Env,
        var: &Rc<str>,
        body: &Core,
        cond: Option<&Core>,
        source: &Core,
    ) -> EvalResult<Value> {
        let source = self.eval(env, source)?;
        let items = self.want_arr(&source)?.clone();
        let mut out: Vec<Thunk> = Vec::new();
        for item in items.iter() {
            let scope = env.extend_one(var.clone(), item.clone());
            if let Some(cond) = cond {
                let keep = self.eval(&scope, cond)?;
                if !self.want_bool(&keep)? {
                    continue;
                }
            }
            let chunk = self.eval(&scope, body)?;
            out.extend(self.want_arr(&chunk)?.iter().cloned());
        }
        Ok(Value::Arr(Rc::new(out)))
    }

    /// Builds an object from the lowered tuple array. Each emitted field's
    /// value closes over `self` bound to the object under construction.
    fn eval_obj_comp(
        &mut self,
        env: &Env,
        var: &Rc<str>,
        field: &Field,
        source: &Core,
    ) -> EvalResult<Value> {
        let source = self.eval(env, source)?;
        let tuples = self.want_arr(&source)?.clone();
        let composite = ObjValue::empty();
        let self_thunk = Thunk::forced(Value::Obj(composite.clone()));
        let mut fields: IndexMap<Rc<str>, ObjField> = IndexMap::new();
        for tuple in tuples.iter() {
            let scope = env.extend_one(var.clone(), tuple.clone());
            let key = self.eval(&scope, &field.key)?;
            let name: Rc<str> = match key {
                Value::Str(name) => name,
                Value::Null => continue,
                other => return Err(self.fail(EvalError::InvalidKey(described(&other)))),
            };
            if fields.contains_key(&name) {
                return Err(self.fail(EvalError::RuntimeError(format!(
                    "duplicate field name: '{name}'"
                ))));
            }
            let value_env = scope.extend_one(SELF.into(), self_thunk.clone());
            fields.insert(
                name.clone(),
                ObjField {
                    visibility: field.visibility,
                    bind: Some(OpenBind {
                        env: value_env.clone(),
                        expr: field.value.clone(),
                    }),
                    thunk: Thunk::pending_named(value_env, field.value.clone(), Some(name)),
                },
            );
        }
        composite.fill(fields, Vec::new());
        Ok(Value::Obj(composite))
    }

    /// Deep structural equality, by manifesting both operands and comparing
    /// the JSON. Hidden fields do not participate; mismatched kinds compare
    /// unequal; functions fail to manifest and so fail to compare.
    pub(crate) fn equals(&mut self, left: &Value, right: &Value) -> EvalResult<bool> {
        let left = manifest::manifest(self, left)?;
        let right = manifest::manifest(self, right)?;
        Ok(left == right)
    }

    /// `toString` semantics: strings pass through unquoted, everything else
    /// manifests to compact JSON.
    pub(crate) fn to_display_string(&mut self, value: &Value) -> EvalResult<String> {
        match value {
            Value::Str(s) => Ok(s.to_string()),
            other => {
                let json = manifest::manifest(self, other)?;
                Ok(manifest::render_compact(&json))
            }
        }
    }

    /// Emits a `std.trace` line through the configured writer.
    pub(crate) fn emit_trace(&mut self, message: &str) {
        let span = self.current_span();
        let line = format!("TRACE: {}:{} {message}", self.file, span.start().line);
        self.trace.trace(&line);
    }

    pub(crate) fn want_bool(&self, value: &Value) -> EvalResult<bool> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => Err(self.type_mismatch("a boolean", other)),
        }
    }

    pub(crate) fn want_num<'v>(&self, value: &'v Value) -> EvalResult<&'v Scientific> {
        match value {
            Value::Num(n) => Ok(n),
            other => Err(self.type_mismatch("a number", other)),
        }
    }

    pub(crate) fn want_str<'v>(&self, value: &'v Value) -> EvalResult<&'v Rc<str>> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(self.type_mismatch("a string", other)),
        }
    }

    pub(crate) fn want_arr<'v>(&self, value: &'v Value) -> EvalResult<&'v Rc<Vec<Thunk>>> {
        match value {
            Value::Arr(items) => Ok(items),
            other => Err(self.type_mismatch("an array", other)),
        }
    }

    pub(crate) fn want_obj<'v>(&self, value: &'v Value) -> EvalResult<&'v ObjValue> {
        match value {
            Value::Obj(obj) => Ok(obj),
            other => Err(self.type_mismatch("an object", other)),
        }
    }

    pub(crate) fn want_int(&self, value: &Value) -> EvalResult<i64> {
        match value {
            Value::Num(n) => n
                .to_i64()
                .ok_or_else(|| self.type_mismatch("a whole number", value)),
            other => Err(self.type_mismatch("a whole number", other)),
        }
    }

    pub(crate) fn type_mismatch(&self, expected: &str, actual: &Value) -> Box<Exception> {
        self.fail(EvalError::TypeMismatch {
            expected: expected.to_owned(),
            actual: described(actual),
        })
    }
}

/// The value's kind with an article, for error messages.
pub(crate) fn described(value: &Value) -> String {
    let kind = value.kind_name();
    let article = match kind {
        "array" | "object" => "an",
        _ => "a",
    };
    format!("{article} {kind}")
}

/// The override's visibility wins when explicit; the default (`Visible`)
/// inherits the base field's visibility, so overriding a hidden field with
/// `:` keeps it hidden.
fn compose_visibility(base: Visibility, override_: Visibility) -> Visibility {
    match override_ {
        Visibility::Visible => base,
        explicit => explicit,
    }
}

/// Re-closes a field's open binding over a new `self` (and `super`, for
/// overriding fields). Host fields have no binding and keep their thunk.
fn reclose_field(
    field: &ObjField,
    visibility: Visibility,
    name: &Rc<str>,
    self_thunk: &Thunk,
    super_thunk: Option<&Thunk>,
) -> ObjField {
    match &field.bind {
        Some(bind) => {
            let bind = reclose_bind(bind, self_thunk, super_thunk);
            ObjField {
                visibility,
                thunk: Thunk::pending_named(
                    bind.env.clone(),
                    bind.expr.clone(),
                    Some(name.clone()),
                ),
                bind: Some(bind),
            }
        }
        None => ObjField {
            visibility,
            bind: None,
            thunk: field.thunk.clone(),
        },
    }
}

fn reclose_bind(bind: &OpenBind, self_thunk: &Thunk, super_thunk: Option<&Thunk>) -> OpenBind {
    let env = bind.env.child();
    env.bind(SELF.into(), self_thunk.clone());
    if let Some(super_thunk) = super_thunk {
        env.bind(SUPER.into(), super_thunk.clone());
    }
    OpenBind {
        env,
        expr: bind.expr.clone(),
    }
}
