//! Tree-walking evaluator.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use vx_types::console::LogKind;

use super::ast::{BinOp, Expr, FunctionDef, LogicalOp, Stmt, UnaryOp};
use super::error::{ErrorKind, ScriptError};
use super::value::{
    Builtin, Closure, JsonError, List, MAX_VALUE_DEPTH, Object, Value, error_parts,
    number_to_string, release,
};
use super::{Limits, OutputSink};

/// Longest string a script may build.
const MAX_STRING_LEN: usize = 1 << 24;
/// Largest gap an array write may open past the current end.
const MAX_ARRAY_GROWTH: usize = 1 << 20;
/// Steps between cancellation checks.
const CANCEL_CHECK_INTERVAL: u64 = 1024;

struct Binding {
    value: Value,
    constant: bool,
}

/// Lexical scope. Lookups walk the parent chain.
#[derive(Default)]
pub struct Scope {
    vars: RefCell<HashMap<String, Binding>>,
    parent: Option<Rc<Scope>>,
}

impl Scope {
    fn child(parent: &Rc<Scope>) -> Rc<Scope> {
        Rc::new(Scope {
            vars: RefCell::default(),
            parent: Some(Rc::clone(parent)),
        })
    }

    fn declare(&self, name: &str, value: Value, constant: bool) {
        self.vars
            .borrow_mut()
            .insert(name.to_string(), Binding { value, constant });
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(binding) = self.vars.borrow().get(name) {
            return Some(binding.value.clone());
        }
        self.parent.as_ref()?.lookup(name)
    }

    fn assign(&self, name: &str, value: Value) -> Result<(), AssignError> {
        if let Some(binding) = self.vars.borrow_mut().get_mut(name) {
            if binding.constant {
                return Err(AssignError::Constant);
            }
            binding.value = value;
            return Ok(());
        }
        match &self.parent {
            Some(parent) => parent.assign(name, value),
            None => Err(AssignError::Undeclared),
        }
    }

    pub(super) fn take_values(&mut self) -> Vec<Value> {
        self.vars.get_mut().drain().map(|(_, b)| b.value).collect()
    }

    pub(super) fn take_parent(&mut self) -> Option<Rc<Scope>> {
        self.parent.take()
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        let values = self.take_values();
        release(values, self.take_parent().into_iter().collect());
    }
}

enum AssignError {
    Constant,
    Undeclared,
}

/// Statement completion.
enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

/// Abrupt termination. `Throw` is catchable by `try`; `Fatal` is not.
enum Unwind {
    Throw(Value),
    Fatal(ScriptError),
}

type Exec<T> = Result<T, Unwind>;

fn throw<T>(name: &str, message: impl Into<String>) -> Exec<T> {
    Err(Unwind::Throw(Value::error(name, &message.into())))
}

/// Refuse to store `value` inside a container if that would nest deeper
/// than [`MAX_VALUE_DEPTH`].
fn check_depth(value: &Value) -> Exec<()> {
    if value.nesting_exceeds(MAX_VALUE_DEPTH - 1) {
        return throw(
            "RangeError",
            format!("Maximum value nesting depth of {MAX_VALUE_DEPTH} exceeded"),
        );
    }
    Ok(())
}

/// Run a parsed program to completion.
pub fn run(program: &[Stmt], limits: &Limits, sink: &mut dyn OutputSink) -> Result<(), ScriptError> {
    let mut interp = Interpreter {
        limits,
        sink,
        steps: 0,
        depth: 0,
        globals: Rc::new(Scope::default()),
        closure_scopes: Vec::new(),
    };
    interp.install_globals();
    let globals = Rc::clone(&interp.globals);
    let result = interp.exec_block(program, &globals);
    interp.teardown();
    match result {
        Ok(_) => Ok(()),
        Err(Unwind::Fatal(err)) => Err(err),
        Err(Unwind::Throw(value)) => Err(uncaught(&value)),
    }
}

fn uncaught(value: &Value) -> ScriptError {
    let message = match value {
        Value::Object(obj) => match error_parts(&obj.borrow()) {
            Some((name, message)) if message.is_empty() => name,
            Some((name, message)) => format!("{name}: {message}"),
            None => format!("Uncaught {}", value.console_text()),
        },
        other => format!("Uncaught {}", other.console_text()),
    };
    ScriptError::new(ErrorKind::Thrown, message)
}

struct Interpreter<'a> {
    limits: &'a Limits,
    sink: &'a mut dyn OutputSink,
    steps: u64,
    depth: usize,
    globals: Rc<Scope>,
    /// Scopes captured by closures, cleared on teardown to break the
    /// scope -> closure -> scope cycles.
    closure_scopes: Vec<Weak<Scope>>,
}

impl Interpreter<'_> {
    fn install_globals(&mut self) {
        let mut console = Object::default();
        for name in ["log", "info", "warn", "debug"] {
            console.set(name, Value::native(Builtin::ConsoleLog, Value::Undefined));
        }
        console.set("error", Value::native(Builtin::ConsoleError, Value::Undefined));

        let mut json = Object::default();
        json.set("stringify", Value::native(Builtin::JsonStringify, Value::Undefined));
        json.set("parse", Value::native(Builtin::JsonParse, Value::Undefined));

        let mut math = Object::default();
        for builtin in [
            Builtin::MathFloor,
            Builtin::MathCeil,
            Builtin::MathRound,
            Builtin::MathAbs,
            Builtin::MathMin,
            Builtin::MathMax,
            Builtin::MathSqrt,
            Builtin::MathPow,
        ] {
            math.set(builtin.name(), Value::native(builtin, Value::Undefined));
        }
        math.set("PI", Value::Number(std::f64::consts::PI));
        math.set("E", Value::Number(std::f64::consts::E));

        let g = &self.globals;
        g.declare("console", Value::object(console), true);
        g.declare("JSON", Value::object(json), true);
        g.declare("Math", Value::object(math), true);
        g.declare("String", Value::native(Builtin::StringCtor, Value::Undefined), true);
        g.declare("Number", Value::native(Builtin::NumberCtor, Value::Undefined), true);
        for name in ["Error", "TypeError", "RangeError", "SyntaxError", "ReferenceError"] {
            g.declare(
                name,
                Value::native(Builtin::ErrorCtor(name), Value::Undefined),
                true,
            );
        }
        g.declare("NaN", Value::Number(f64::NAN), true);
        g.declare("Infinity", Value::Number(f64::INFINITY), true);
    }

    fn teardown(&mut self) {
        for weak in self.closure_scopes.drain(..) {
            if let Some(scope) = weak.upgrade() {
                scope.vars.borrow_mut().clear();
            }
        }
        self.globals.vars.borrow_mut().clear();
    }

    fn tick(&mut self) -> Exec<()> {
        self.steps += 1;
        if self.steps > self.limits.max_steps {
            return Err(Unwind::Fatal(ScriptError::new(
                ErrorKind::Range,
                format!("Execution step limit of {} exceeded", self.limits.max_steps),
            )));
        }
        if self.steps % CANCEL_CHECK_INTERVAL == 0 && self.sink.cancelled() {
            return Err(cancelled());
        }
        Ok(())
    }

    fn make_closure(&mut self, def: &Rc<FunctionDef>, env: &Rc<Scope>) -> Value {
        let already = self
            .closure_scopes
            .last()
            .is_some_and(|w| std::ptr::eq(w.as_ptr(), Rc::as_ptr(env)));
        if !already {
            self.closure_scopes.push(Rc::downgrade(env));
        }
        Value::Function(Rc::new(Closure {
            def: Rc::clone(def),
            env: Rc::clone(env),
        }))
    }

    // ---------------------------------------------------------------------
    // Statements
    // ---------------------------------------------------------------------

    fn exec_block(&mut self, stmts: &[Stmt], scope: &Rc<Scope>) -> Exec<Flow> {
        for stmt in stmts {
            if let Stmt::Function(def) = stmt
                && let Some(name) = &def.name
            {
                let closure = self.make_closure(def, scope);
                scope.declare(name, closure, false);
            }
        }
        for stmt in stmts {
            match self.exec_stmt(stmt, scope)? {
                Flow::Normal => {},
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt, scope: &Rc<Scope>) -> Exec<Flow> {
        self.tick()?;
        match stmt {
            Stmt::Let { bindings, constant } => {
                for (name, init) in bindings {
                    let value = match init {
                        Some(expr) => self.eval(expr, scope)?,
                        None => Value::Undefined,
                    };
                    scope.declare(name, value, *constant);
                }
                Ok(Flow::Normal)
            },
            Stmt::Function(_) | Stmt::Empty => Ok(Flow::Normal),
            Stmt::Expr(expr) => {
                self.eval(expr, scope)?;
                Ok(Flow::Normal)
            },
            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                if self.eval(cond, scope)?.truthy() {
                    self.exec_stmt(then, scope)
                } else if let Some(otherwise) = otherwise {
                    self.exec_stmt(otherwise, scope)
                } else {
                    Ok(Flow::Normal)
                }
            },
            Stmt::While { cond, body } => {
                while self.eval(cond, scope)?.truthy() {
                    self.tick()?;
                    match self.exec_stmt(body, scope)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Normal | Flow::Continue => {},
                    }
                }
                Ok(Flow::Normal)
            },
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => {
                let loop_scope = Scope::child(scope);
                if let Some(init) = init {
                    self.exec_stmt(init, &loop_scope)?;
                }
                loop {
                    if let Some(cond) = cond
                        && !self.eval(cond, &loop_scope)?.truthy()
                    {
                        break;
                    }
                    self.tick()?;
                    match self.exec_stmt(body, &loop_scope)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Normal | Flow::Continue => {},
                    }
                    if let Some(update) = update {
                        self.eval(update, &loop_scope)?;
                    }
                }
                Ok(Flow::Normal)
            },
            Stmt::Block(stmts) => {
                let inner = Scope::child(scope);
                self.exec_block(stmts, &inner)
            },
            Stmt::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.eval(expr, scope)?,
                    None => Value::Undefined,
                };
                Ok(Flow::Return(value))
            },
            Stmt::Throw(expr) => {
                let value = self.eval(expr, scope)?;
                Err(Unwind::Throw(value))
            },
            Stmt::Try {
                body,
                param,
                handler,
                finalizer,
            } => {
                let result = match (self.exec_block(body, &Scope::child(scope)), handler) {
                    (Err(Unwind::Throw(thrown)), Some(handler)) => {
                        let catch_scope = Scope::child(scope);
                        if let Some(param) = param {
                            catch_scope.declare(param, thrown, false);
                        }
                        self.exec_block(handler, &catch_scope)
                    },
                    (result, _) => result,
                };
                if let Err(Unwind::Fatal(_)) = result {
                    return result;
                }
                if let Some(finalizer) = finalizer {
                    match self.exec_block(finalizer, &Scope::child(scope))? {
                        Flow::Normal => {},
                        flow => return Ok(flow),
                    }
                }
                result
            },
            Stmt::Break => Ok(Flow::Break),
            Stmt::Continue => Ok(Flow::Continue),
        }
    }

    // ---------------------------------------------------------------------
    // Expressions
    // ---------------------------------------------------------------------

    fn eval(&mut self, expr: &Expr, scope: &Rc<Scope>) -> Exec<Value> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::Str(Rc::clone(s))),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Null => Ok(Value::Null),
            Expr::Undefined => Ok(Value::Undefined),
            Expr::Ident(name) => match scope.lookup(name) {
                Some(value) => Ok(value),
                None => throw("ReferenceError", format!("{name} is not defined")),
            },
            Expr::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    let value = self.eval(item, scope)?;
                    check_depth(&value)?;
                    values.push(value);
                }
                Ok(Value::array(values))
            },
            Expr::Object(entries) => {
                let mut obj = Object::default();
                for (key, value) in entries {
                    let value = self.eval(value, scope)?;
                    check_depth(&value)?;
                    obj.set(key, value);
                }
                Ok(Value::object(obj))
            },
            Expr::Function(def) => Ok(self.make_closure(def, scope)),
            Expr::Unary { op, expr } => self.eval_unary(*op, expr, scope),
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs, scope)?;
                let rhs = self.eval(rhs, scope)?;
                self.binary(*op, &lhs, &rhs)
            },
            Expr::Logical { op, lhs, rhs } => {
                let lhs = self.eval(lhs, scope)?;
                let short = match op {
                    LogicalOp::And => !lhs.truthy(),
                    LogicalOp::Or => lhs.truthy(),
                };
                if short {
                    Ok(lhs)
                } else {
                    self.eval(rhs, scope)
                }
            },
            Expr::Conditional {
                cond,
                then,
                otherwise,
            } => {
                if self.eval(cond, scope)?.truthy() {
                    self.eval(then, scope)
                } else {
                    self.eval(otherwise, scope)
                }
            },
            Expr::Assign { target, op, value } => self.eval_assign(target, *op, value, scope),
            Expr::Update {
                target,
                delta,
                prefix,
            } => {
                let old = self.eval(target, scope)?.to_number();
                let new = old + delta;
                self.store(target, Value::Number(new), scope)?;
                Ok(Value::Number(if *prefix { new } else { old }))
            },
            Expr::Member { object, property } => {
                let object = self.eval(object, scope)?;
                self.get_property(&object, property)
            },
            Expr::Index { object, index } => {
                let object = self.eval(object, scope)?;
                let key = property_key(&self.eval(index, scope)?);
                self.get_property(&object, &key)
            },
            Expr::Call { callee, args } => {
                let (func, this) = match &**callee {
                    Expr::Member { object, property } => {
                        let this = self.eval(object, scope)?;
                        (self.get_property(&this, property)?, this)
                    },
                    Expr::Index { object, index } => {
                        let this = self.eval(object, scope)?;
                        let key = property_key(&self.eval(index, scope)?);
                        (self.get_property(&this, &key)?, this)
                    },
                    other => (self.eval(other, scope)?, Value::Undefined),
                };
                let args = self.eval_args(args, scope)?;
                self.call(&func, this, args, callee)
            },
            Expr::New { callee, args } => {
                let func = self.eval(callee, scope)?;
                let args = self.eval_args(args, scope)?;
                match &func {
                    Value::Native(native) if native.builtin.is_constructor() => {
                        self.call_builtin(native.builtin, &native.this, args)
                    },
                    _ => throw(
                        "TypeError",
                        format!("{} is not a constructor", describe(callee)),
                    ),
                }
            },
        }
    }

    fn eval_args(&mut self, args: &[Expr], scope: &Rc<Scope>) -> Exec<Vec<Value>> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(arg, scope)?);
        }
        Ok(values)
    }

    fn eval_unary(&mut self, op: UnaryOp, expr: &Expr, scope: &Rc<Scope>) -> Exec<Value> {
        if op == UnaryOp::TypeOf
            && let Expr::Ident(name) = expr
        {
            let ty = scope.lookup(name).map_or("undefined", |v| v.type_of());
            return Ok(Value::str(ty));
        }
        let value = self.eval(expr, scope)?;
        Ok(match op {
            UnaryOp::Neg => Value::Number(-value.to_number()),
            UnaryOp::Plus => Value::Number(value.to_number()),
            UnaryOp::Not => Value::Bool(!value.truthy()),
            UnaryOp::TypeOf => Value::str(value.type_of()),
        })
    }

    fn eval_assign(
        &mut self,
        target: &Expr,
        op: Option<BinOp>,
        value: &Expr,
        scope: &Rc<Scope>,
    ) -> Exec<Value> {
        let value = match op {
            None => self.eval(value, scope)?,
            Some(op) => {
                let current = self.eval(target, scope)?;
                let rhs = self.eval(value, scope)?;
                self.binary(op, &current, &rhs)?
            },
        };
        self.store(target, value.clone(), scope)?;
        Ok(value)
    }

    fn store(&mut self, target: &Expr, value: Value, scope: &Rc<Scope>) -> Exec<()> {
        match target {
            Expr::Ident(name) => match scope.assign(name, value) {
                Ok(()) => Ok(()),
                Err(AssignError::Constant) => {
                    throw("TypeError", "Assignment to constant variable.")
                },
                Err(AssignError::Undeclared) => {
                    throw("ReferenceError", format!("{name} is not defined"))
                },
            },
            Expr::Member { object, property } => {
                let object = self.eval(object, scope)?;
                self.set_property(&object, property, value)
            },
            Expr::Index { object, index } => {
                let object = self.eval(object, scope)?;
                let key = property_key(&self.eval(index, scope)?);
                self.set_property(&object, &key, value)
            },
            _ => throw("SyntaxError", "Invalid left-hand side in assignment"),
        }
    }

    fn binary(&mut self, op: BinOp, lhs: &Value, rhs: &Value) -> Exec<Value> {
        let num = |f: fn(f64, f64) -> f64| Value::Number(f(lhs.to_number(), rhs.to_number()));
        Ok(match op {
            BinOp::Add if lhs.is_stringish() || rhs.is_stringish() => {
                let mut text = lhs.display();
                text.push_str(&rhs.display());
                if text.len() > MAX_STRING_LEN {
                    return Err(Unwind::Fatal(ScriptError::new(
                        ErrorKind::Range,
                        "Invalid string length",
                    )));
                }
                Value::Str(text.into())
            },
            BinOp::Add => num(|a, b| a + b),
            BinOp::Sub => num(|a, b| a - b),
            BinOp::Mul => num(|a, b| a * b),
            BinOp::Div => num(|a, b| a / b),
            BinOp::Rem => num(|a, b| a % b),
            BinOp::Lt => Value::Bool(compare(lhs, rhs, |o| o.is_lt())),
            BinOp::Le => Value::Bool(compare(lhs, rhs, |o| o.is_le())),
            BinOp::Gt => Value::Bool(compare(lhs, rhs, |o| o.is_gt())),
            BinOp::Ge => Value::Bool(compare(lhs, rhs, |o| o.is_ge())),
            BinOp::Eq => Value::Bool(lhs.loose_equals(rhs)),
            BinOp::Ne => Value::Bool(!lhs.loose_equals(rhs)),
            BinOp::StrictEq => Value::Bool(lhs.strict_equals(rhs)),
            BinOp::StrictNe => Value::Bool(!lhs.strict_equals(rhs)),
        })
    }

    // ---------------------------------------------------------------------
    // Properties
    // ---------------------------------------------------------------------

    fn get_property(&mut self, object: &Value, key: &str) -> Exec<Value> {
        Ok(match object {
            Value::Undefined | Value::Null => {
                return throw(
                    "TypeError",
                    format!(
                        "Cannot read properties of {} (reading '{key}')",
                        object.display()
                    ),
                );
            },
            Value::Str(s) => {
                if key == "length" {
                    Value::Number(s.encode_utf16().count() as f64)
                } else if let Some(method) = Builtin::string_method(key) {
                    Value::native(method, object.clone())
                } else if let Some(idx) = array_index(key) {
                    s.chars()
                        .nth(idx)
                        .map_or(Value::Undefined, |c| Value::str(c.encode_utf8(&mut [0; 4])))
                } else {
                    Value::Undefined
                }
            },
            Value::Array(items) => {
                if key == "length" {
                    Value::Number(items.borrow().len() as f64)
                } else if let Some(method) = Builtin::array_method(key) {
                    Value::native(method, object.clone())
                } else if let Some(idx) = array_index(key) {
                    items.borrow().get(idx).cloned().unwrap_or_default()
                } else {
                    Value::Undefined
                }
            },
            Value::Object(obj) => {
                let obj = obj.borrow();
                match obj.get(key) {
                    Some(value) => value.clone(),
                    None => match (&obj.error, key) {
                        (Some(data), "name") => Value::Str(Rc::clone(&data.name)),
                        (Some(data), "message") => Value::Str(Rc::clone(&data.message)),
                        _ => Value::Undefined,
                    },
                }
            },
            Value::Function(closure) if key == "name" => {
                Value::str(closure.def.name.as_deref().unwrap_or(""))
            },
            Value::Native(native) if key == "name" => Value::str(native.builtin.name()),
            _ => Value::Undefined,
        })
    }

    fn set_property(&mut self, object: &Value, key: &str, value: Value) -> Exec<()> {
        if matches!(object, Value::Array(_) | Value::Object(_)) {
            check_depth(&value)?;
        }
        match object {
            Value::Undefined | Value::Null => throw(
                "TypeError",
                format!(
                    "Cannot set properties of {} (setting '{key}')",
                    object.display()
                ),
            ),
            Value::Array(items) => {
                let mut items = items.borrow_mut();
                if key == "length" {
                    let n = value.to_number();
                    if n < 0.0
                        || n.fract() != 0.0
                        || !n.is_finite()
                        || n as usize > items.len() + MAX_ARRAY_GROWTH
                    {
                        return throw("RangeError", "Invalid array length");
                    }
                    items.resize(n as usize, Value::Undefined);
                } else if let Some(idx) = array_index(key) {
                    if idx >= items.len() + MAX_ARRAY_GROWTH {
                        return throw("RangeError", "Invalid array length");
                    }
                    if idx >= items.len() {
                        items.resize(idx + 1, Value::Undefined);
                    }
                    items[idx] = value;
                }
                Ok(())
            },
            Value::Object(obj) => {
                obj.borrow_mut().set(key, value);
                Ok(())
            },
            _ => Ok(()),
        }
    }

    // ---------------------------------------------------------------------
    // Calls
    // ---------------------------------------------------------------------

    fn call(&mut self, func: &Value, this: Value, args: Vec<Value>, callee: &Expr) -> Exec<Value> {
        match func {
            Value::Function(closure) => self.call_closure(closure, args),
            Value::Native(native) => {
                let this = match native.this {
                    Value::Undefined => this,
                    ref bound => bound.clone(),
                };
                self.call_builtin(native.builtin, &this, args)
            },
            _ => throw(
                "TypeError",
                format!("{} is not a function", describe(callee)),
            ),
        }
    }

    fn call_closure(&mut self, closure: &Rc<Closure>, args: Vec<Value>) -> Exec<Value> {
        if self.depth >= self.limits.max_call_depth {
            return throw("RangeError", "Maximum call stack size exceeded");
        }
        self.tick()?;
        let frame = Scope::child(&closure.env);
        if let Some(name) = &closure.def.name {
            frame.declare(name, Value::Function(Rc::clone(closure)), false);
        }
        let mut args = args.into_iter();
        for param in &closure.def.params {
            frame.declare(param, args.next().unwrap_or_default(), false);
        }
        self.depth += 1;
        let result = self.exec_block(&closure.def.body, &frame);
        self.depth -= 1;
        match result? {
            Flow::Return(value) => Ok(value),
            _ => Ok(Value::Undefined),
        }
    }

    fn call_builtin(&mut self, builtin: Builtin, this: &Value, args: Vec<Value>) -> Exec<Value> {
        let arg = |i: usize| args.get(i).cloned().unwrap_or_default();
        let num_arg = |i: usize| args.get(i).map_or(f64::NAN, Value::to_number);
        Ok(match builtin {
            Builtin::ConsoleLog | Builtin::ConsoleError => {
                if self.sink.cancelled() {
                    return Err(cancelled());
                }
                let text = args
                    .iter()
                    .map(Value::console_text)
                    .collect::<Vec<_>>()
                    .join(" ");
                let kind = if builtin == Builtin::ConsoleError {
                    LogKind::Error
                } else {
                    LogKind::Log
                };
                self.sink.emit(kind, text);
                Value::Undefined
            },
            Builtin::JsonStringify => return json_stringify(&arg(0), args.get(2)),
            Builtin::JsonParse => {
                let text = arg(0).display();
                match serde_json::from_str::<serde_json::Value>(&text) {
                    Ok(json) => Value::from_json(&json),
                    Err(e) => return throw("SyntaxError", format!("Unexpected token in JSON: {e}")),
                }
            },
            Builtin::MathFloor => Value::Number(num_arg(0).floor()),
            Builtin::MathCeil => Value::Number(num_arg(0).ceil()),
            Builtin::MathRound => Value::Number((num_arg(0) + 0.5).floor()),
            Builtin::MathAbs => Value::Number(num_arg(0).abs()),
            Builtin::MathSqrt => Value::Number(num_arg(0).sqrt()),
            Builtin::MathPow => Value::Number(num_arg(0).powf(num_arg(1))),
            Builtin::MathMin => Value::Number(fold_numbers(&args, f64::INFINITY, f64::min)),
            Builtin::MathMax => Value::Number(fold_numbers(&args, f64::NEG_INFINITY, f64::max)),
            Builtin::StringCtor => match args.first() {
                Some(v) => Value::str(&v.display()),
                None => Value::str(""),
            },
            Builtin::NumberCtor => Value::Number(args.first().map_or(0.0, Value::to_number)),
            Builtin::ErrorCtor(name) => {
                let message = match args.first() {
                    None | Some(Value::Undefined) => String::new(),
                    Some(v) => v.display(),
                };
                Value::error(name, &message)
            },
            Builtin::ArrayPush | Builtin::ArrayPop | Builtin::ArrayJoin
            | Builtin::ArrayIncludes | Builtin::ArrayIndexOf => {
                let Value::Array(items) = this else {
                    return throw("TypeError", format!("{} called on non-array", builtin.name()));
                };
                array_method(builtin, items, args)?
            },
            Builtin::StrToUpperCase | Builtin::StrToLowerCase | Builtin::StrIncludes
            | Builtin::StrTrim | Builtin::StrSplit => {
                let Value::Str(s) = this else {
                    return throw("TypeError", format!("{} called on non-string", builtin.name()));
                };
                string_method(builtin, s, &args)
            },
        })
    }
}

fn cancelled() -> Unwind {
    Unwind::Fatal(ScriptError::new(ErrorKind::Cancelled, "execution cancelled"))
}

fn array_method(builtin: Builtin, items: &Rc<RefCell<List>>, args: Vec<Value>) -> Exec<Value> {
    if builtin == Builtin::ArrayPush {
        for arg in &args {
            check_depth(arg)?;
        }
    }
    let mut items = items.borrow_mut();
    Ok(match builtin {
        Builtin::ArrayPush => {
            items.extend(args);
            Value::Number(items.len() as f64)
        },
        Builtin::ArrayPop => items.pop().unwrap_or_default(),
        Builtin::ArrayJoin => {
            let sep = match args.first() {
                None | Some(Value::Undefined) => ",".to_string(),
                Some(v) => v.display(),
            };
            let text = items
                .iter()
                .map(|v| match v {
                    Value::Undefined | Value::Null => String::new(),
                    v => v.display(),
                })
                .collect::<Vec<_>>()
                .join(&sep);
            Value::Str(text.into())
        },
        Builtin::ArrayIncludes => {
            let needle = args.first().cloned().unwrap_or_default();
            let nan = matches!(needle, Value::Number(n) if n.is_nan());
            Value::Bool(items.iter().any(|v| {
                v.strict_equals(&needle) || (nan && matches!(v, Value::Number(n) if n.is_nan()))
            }))
        },
        Builtin::ArrayIndexOf => {
            let needle = args.first().cloned().unwrap_or_default();
            let idx = items.iter().position(|v| v.strict_equals(&needle));
            Value::Number(idx.map_or(-1.0, |i| i as f64))
        },
        _ => Value::Undefined,
    })
}

fn string_method(builtin: Builtin, s: &str, args: &[Value]) -> Value {
    match builtin {
        Builtin::StrToUpperCase => Value::str(&s.to_uppercase()),
        Builtin::StrToLowerCase => Value::str(&s.to_lowercase()),
        Builtin::StrTrim => Value::str(s.trim()),
        Builtin::StrIncludes => {
            let needle = args.first().map(Value::display).unwrap_or_else(|| "undefined".into());
            Value::Bool(s.contains(needle.as_str()))
        },
        Builtin::StrSplit => match args.first() {
            None | Some(Value::Undefined) => Value::array(vec![Value::str(s)]),
            Some(sep) => {
                let sep = sep.display();
                let parts: Vec<Value> = if sep.is_empty() {
                    s.chars().map(|c| Value::str(c.encode_utf8(&mut [0; 4]))).collect()
                } else {
                    s.split(sep.as_str()).map(Value::str).collect()
                };
                Value::array(parts)
            },
        },
        _ => Value::Undefined,
    }
}

fn json_stringify(value: &Value, indent: Option<&Value>) -> Exec<Value> {
    let json = match value.to_json() {
        Ok(Some(json)) => json,
        Ok(None) => return Ok(Value::Undefined),
        Err(JsonError::Circular) => {
            return throw("TypeError", "Converting circular structure to JSON");
        },
        Err(JsonError::TooDeep) => {
            return throw(
                "RangeError",
                format!("Maximum value nesting depth of {MAX_VALUE_DEPTH} exceeded"),
            );
        },
    };
    let indent = match indent {
        Some(Value::Number(n)) if *n >= 1.0 => " ".repeat((*n as usize).min(10)),
        Some(Value::Str(s)) => s.chars().take(10).collect(),
        _ => String::new(),
    };
    let text = if indent.is_empty() {
        json.to_string()
    } else {
        use serde::Serialize;
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        if let Err(e) = json.serialize(&mut ser) {
            return throw("TypeError", e.to_string());
        }
        String::from_utf8_lossy(&buf).into_owned()
    };
    Ok(Value::Str(text.into()))
}

fn fold_numbers(args: &[Value], init: f64, f: fn(f64, f64) -> f64) -> f64 {
    let mut acc = init;
    for arg in args {
        let n = arg.to_number();
        if n.is_nan() {
            return f64::NAN;
        }
        acc = f(acc, n);
    }
    acc
}

fn compare(lhs: &Value, rhs: &Value, test: fn(std::cmp::Ordering) -> bool) -> bool {
    if let (Value::Str(a), Value::Str(b)) = (lhs, rhs) {
        return test(a.cmp(b));
    }
    lhs.to_number()
        .partial_cmp(&rhs.to_number())
        .is_some_and(test)
}

fn property_key(value: &Value) -> String {
    match value {
        Value::Number(n) => number_to_string(*n),
        other => other.display(),
    }
}

fn array_index(key: &str) -> Option<usize> {
    if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    if !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse().ok()
}

/// Source-ish name of a callee for error messages.
fn describe(expr: &Expr) -> String {
    match expr {
        Expr::Ident(name) => name.clone(),
        Expr::Member { object, property } => format!("{}.{property}", describe(object)),
        Expr::Index { object, .. } => format!("{}[...]", describe(object)),
        Expr::Call { callee, .. } => format!("{}(...)", describe(callee)),
        _ => "expression".to_string(),
    }
}
