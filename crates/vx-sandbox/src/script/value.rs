//! Runtime values and their conversions.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use super::ast::FunctionDef;
use super::interp::Scope;

/// Deepest container nesting a script may build, print, or serialize.
pub const MAX_VALUE_DEPTH: usize = 1_000;

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Array(Rc<RefCell<List>>),
    Object(Rc<RefCell<Object>>),
    Function(Rc<Closure>),
    Native(Rc<NativeFn>),
}

/// Array storage.
#[derive(Debug, Default)]
pub struct List(pub Vec<Value>);

impl Deref for List {
    type Target = Vec<Value>;

    fn deref(&self) -> &Vec<Value> {
        &self.0
    }
}

impl DerefMut for List {
    fn deref_mut(&mut self) -> &mut Vec<Value> {
        &mut self.0
    }
}

impl Drop for List {
    fn drop(&mut self) {
        release(std::mem::take(&mut self.0), Vec::new());
    }
}

/// Plain object: ordered entries plus optional error identity.
#[derive(Debug, Default)]
pub struct Object {
    pub entries: Vec<(String, Value)>,
    /// Set for objects built by `Error` and friends.
    pub error: Option<ErrorData>,
}

#[derive(Debug, Clone)]
pub struct ErrorData {
    pub name: Rc<str>,
    pub message: Rc<str>,
}

impl Drop for Object {
    fn drop(&mut self) {
        release(self.entries.drain(..).map(|(_, v)| v).collect(), Vec::new());
    }
}

/// Tear down values and scopes with an explicit work list, so a chain of
/// nested containers or closures never recurses on the native stack.
pub(super) fn release(mut values: Vec<Value>, mut scopes: Vec<Rc<Scope>>) {
    loop {
        if let Some(value) = values.pop() {
            match value {
                Value::Array(rc) => {
                    if let Ok(cell) = Rc::try_unwrap(rc) {
                        values.append(&mut cell.into_inner());
                    }
                },
                Value::Object(rc) => {
                    if let Ok(cell) = Rc::try_unwrap(rc) {
                        let mut obj = cell.into_inner();
                        values.extend(obj.entries.drain(..).map(|(_, v)| v));
                    }
                },
                Value::Function(rc) => {
                    if let Ok(closure) = Rc::try_unwrap(rc) {
                        scopes.push(closure.env);
                    }
                },
                Value::Native(rc) => {
                    if let Ok(native) = Rc::try_unwrap(rc) {
                        values.push(native.this);
                    }
                },
                _ => {},
            }
        } else if let Some(scope) = scopes.pop() {
            if let Ok(mut scope) = Rc::try_unwrap(scope) {
                values.extend(scope.take_values());
                scopes.extend(scope.take_parent());
            }
        } else {
            break;
        }
    }
}

impl Object {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn set(&mut self, key: &str, value: Value) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }
}

/// A script-defined function with its captured scope.
pub struct Closure {
    pub def: Rc<FunctionDef>,
    pub env: Rc<Scope>,
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("name", &self.def.name)
            .finish_non_exhaustive()
    }
}

/// Host-provided function, optionally bound to a receiver.
#[derive(Debug)]
pub struct NativeFn {
    pub builtin: Builtin,
    pub this: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    ConsoleLog,
    ConsoleError,
    JsonStringify,
    JsonParse,
    MathFloor,
    MathCeil,
    MathRound,
    MathAbs,
    MathMin,
    MathMax,
    MathSqrt,
    MathPow,
    StringCtor,
    NumberCtor,
    ErrorCtor(&'static str),
    ArrayPush,
    ArrayPop,
    ArrayJoin,
    ArrayIncludes,
    ArrayIndexOf,
    StrToUpperCase,
    StrToLowerCase,
    StrIncludes,
    StrTrim,
    StrSplit,
}

impl Builtin {
    pub fn name(self) -> &'static str {
        match self {
            Builtin::ConsoleLog => "log",
            Builtin::ConsoleError => "error",
            Builtin::JsonStringify => "stringify",
            Builtin::JsonParse => "parse",
            Builtin::MathFloor => "floor",
            Builtin::MathCeil => "ceil",
            Builtin::MathRound => "round",
            Builtin::MathAbs => "abs",
            Builtin::MathMin => "min",
            Builtin::MathMax => "max",
            Builtin::MathSqrt => "sqrt",
            Builtin::MathPow => "pow",
            Builtin::StringCtor => "String",
            Builtin::NumberCtor => "Number",
            Builtin::ErrorCtor(name) => name,
            Builtin::ArrayPush => "push",
            Builtin::ArrayPop => "pop",
            Builtin::ArrayJoin => "join",
            Builtin::ArrayIncludes | Builtin::StrIncludes => "includes",
            Builtin::ArrayIndexOf => "indexOf",
            Builtin::StrToUpperCase => "toUpperCase",
            Builtin::StrToLowerCase => "toLowerCase",
            Builtin::StrTrim => "trim",
            Builtin::StrSplit => "split",
        }
    }

    /// Whether `new` may be applied.
    pub fn is_constructor(self) -> bool {
        matches!(
            self,
            Builtin::StringCtor | Builtin::NumberCtor | Builtin::ErrorCtor(_)
        )
    }

    pub fn array_method(name: &str) -> Option<Self> {
        Some(match name {
            "push" => Builtin::ArrayPush,
            "pop" => Builtin::ArrayPop,
            "join" => Builtin::ArrayJoin,
            "includes" => Builtin::ArrayIncludes,
            "indexOf" => Builtin::ArrayIndexOf,
            _ => return None,
        })
    }

    pub fn string_method(name: &str) -> Option<Self> {
        Some(match name {
            "toUpperCase" => Builtin::StrToUpperCase,
            "toLowerCase" => Builtin::StrToLowerCase,
            "includes" => Builtin::StrIncludes,
            "trim" => Builtin::StrTrim,
            "split" => Builtin::StrSplit,
            _ => return None,
        })
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{s:?}"),
            other => f.write_str(&other.display()),
        }
    }
}

/// Why a value has no JSON form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonError {
    Circular,
    TooDeep,
}

impl Value {
    pub fn str(s: &str) -> Self {
        Value::Str(s.into())
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(List(items))))
    }

    pub fn object(obj: Object) -> Self {
        Value::Object(Rc::new(RefCell::new(obj)))
    }

    pub fn native(builtin: Builtin, this: Value) -> Self {
        Value::Native(Rc::new(NativeFn { builtin, this }))
    }

    pub fn error(name: &str, message: &str) -> Self {
        Value::object(Object {
            entries: Vec::new(),
            error: Some(ErrorData {
                name: name.into(),
                message: message.into(),
            }),
        })
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null | Value::Array(_) | Value::Object(_) => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Function(_) | Value::Native(_) => "function",
        }
    }

    /// Numeric conversion (`Number(v)`).
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::Str(s) => string_to_number(s),
            Value::Array(_) => string_to_number(&self.display()),
            _ => f64::NAN,
        }
    }

    /// String conversion (`String(v)`).
    pub fn display(&self) -> String {
        let mut seen = Vec::new();
        self.display_inner(&mut seen)
    }

    fn display_inner(&self, seen: &mut Vec<*const ()>) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::Str(s) => s.to_string(),
            Value::Array(items) => {
                let ptr = Rc::as_ptr(items).cast::<()>();
                if seen.contains(&ptr) {
                    return String::new();
                }
                if seen.len() >= MAX_VALUE_DEPTH {
                    return "...".to_string();
                }
                seen.push(ptr);
                let text = items
                    .borrow()
                    .iter()
                    .map(|v| match v {
                        Value::Undefined | Value::Null => String::new(),
                        v => v.display_inner(seen),
                    })
                    .collect::<Vec<_>>()
                    .join(",");
                seen.pop();
                text
            },
            Value::Object(obj) => match error_parts(&obj.borrow()) {
                Some((name, message)) if message.is_empty() => name,
                Some((name, message)) => format!("{name}: {message}"),
                None => "[object Object]".to_string(),
            },
            Value::Function(closure) => format!(
                "function {}() {{ [code] }}",
                closure.def.name.as_deref().unwrap_or("")
            ),
            Value::Native(native) => {
                format!("function {}() {{ [native code] }}", native.builtin.name())
            },
        }
    }

    /// Text written to the console for one argument: strings raw,
    /// containers as pretty JSON.
    pub fn console_text(&self) -> String {
        match self {
            Value::Object(obj) if obj.borrow().error.is_some() => self.display(),
            Value::Array(_) | Value::Object(_) => match self.to_json() {
                Ok(Some(json)) => {
                    serde_json::to_string_pretty(&json).unwrap_or_else(|_| self.display())
                },
                Ok(None) | Err(_) => self.display(),
            },
            other => other.display(),
        }
    }

    /// JSON form of the value. `None` for values JSON omits (undefined,
    /// functions).
    pub fn to_json(&self) -> Result<Option<serde_json::Value>, JsonError> {
        let mut seen = Vec::new();
        self.to_json_inner(&mut seen)
    }

    fn to_json_inner(
        &self,
        seen: &mut Vec<*const ()>,
    ) -> Result<Option<serde_json::Value>, JsonError> {
        use serde_json::Value as J;
        Ok(Some(match self {
            Value::Undefined | Value::Function(_) | Value::Native(_) => return Ok(None),
            Value::Null => J::Null,
            Value::Bool(b) => J::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::Str(s) => J::String(s.to_string()),
            Value::Array(items) => {
                let ptr = Rc::as_ptr(items).cast::<()>();
                if seen.contains(&ptr) {
                    return Err(JsonError::Circular);
                }
                if seen.len() >= MAX_VALUE_DEPTH {
                    return Err(JsonError::TooDeep);
                }
                seen.push(ptr);
                let mut out = Vec::new();
                for item in items.borrow().iter() {
                    out.push(item.to_json_inner(seen)?.unwrap_or(J::Null));
                }
                seen.pop();
                J::Array(out)
            },
            Value::Object(obj) => {
                let ptr = Rc::as_ptr(obj).cast::<()>();
                if seen.contains(&ptr) {
                    return Err(JsonError::Circular);
                }
                if seen.len() >= MAX_VALUE_DEPTH {
                    return Err(JsonError::TooDeep);
                }
                seen.push(ptr);
                let mut map = serde_json::Map::new();
                for (key, value) in obj.borrow().entries.iter() {
                    if let Some(json) = value.to_json_inner(seen)? {
                        map.insert(key.clone(), json);
                    }
                }
                seen.pop();
                J::Object(map)
            },
        }))
    }

    pub fn from_json(json: &serde_json::Value) -> Self {
        use serde_json::Value as J;
        match json {
            J::Null => Value::Null,
            J::Bool(b) => Value::Bool(*b),
            J::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            J::String(s) => Value::str(s),
            J::Array(items) => Value::array(items.iter().map(Value::from_json).collect()),
            J::Object(map) => Value::object(Object {
                entries: map
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
                error: None,
            }),
        }
    }

    /// Whether containers nest more than `limit` levels deep, counting
    /// `[]` as one level. Each container is visited once.
    pub fn nesting_exceeds(&self, limit: usize) -> bool {
        if !self.is_container() {
            return false;
        }
        let mut seen = HashSet::new();
        let mut stack = vec![(self.clone(), 0usize)];
        while let Some((value, depth)) = stack.pop() {
            let children: Vec<Value> = match &value {
                Value::Array(items) => {
                    if !seen.insert(Rc::as_ptr(items).cast::<()>()) {
                        continue;
                    }
                    items.borrow().iter().filter(|v| v.is_container()).cloned().collect()
                },
                Value::Object(obj) => {
                    if !seen.insert(Rc::as_ptr(obj).cast::<()>()) {
                        continue;
                    }
                    obj.borrow()
                        .entries
                        .iter()
                        .map(|(_, v)| v)
                        .filter(|v| v.is_container())
                        .cloned()
                        .collect()
                },
                _ => continue,
            };
            if depth + 1 > limit {
                return true;
            }
            stack.extend(children.into_iter().map(|child| (child, depth + 1)));
        }
        false
    }

    fn is_container(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Object(_))
    }

    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// `==` with the usual primitive coercions.
    pub fn loose_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
            (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => false,
            (Value::Number(_), Value::Str(_) | Value::Bool(_))
            | (Value::Str(_) | Value::Bool(_), Value::Number(_))
            | (Value::Bool(_), Value::Str(_))
            | (Value::Str(_), Value::Bool(_)) => self.to_number() == other.to_number(),
            _ => self.strict_equals(other),
        }
    }

    /// Whether `+` concatenates rather than adds.
    pub fn is_stringish(&self) -> bool {
        matches!(
            self,
            Value::Str(_)
                | Value::Array(_)
                | Value::Object(_)
                | Value::Function(_)
                | Value::Native(_)
        )
    }
}

/// `(name, message)` for error objects, honouring reassigned fields.
pub fn error_parts(obj: &Object) -> Option<(String, String)> {
    let data = obj.error.as_ref()?;
    let name = obj
        .get("name")
        .map(Value::display)
        .unwrap_or_else(|| data.name.to_string());
    let message = obj
        .get("message")
        .map(Value::display)
        .unwrap_or_else(|| data.message.to_string());
    Some((name, message))
}

fn number_to_json(n: f64) -> serde_json::Value {
    if !n.is_finite() {
        return serde_json::Value::Null;
    }
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return serde_json::Value::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

/// Shortest round-trip rendering in the JS style.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    let abs = n.abs();
    if abs >= 1e21 || abs < 1e-6 {
        let text = format!("{n:e}");
        return match text.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
            _ => text,
        };
    }
    if n.fract() == 0.0 && abs < 9_007_199_254_740_992.0 {
        return format!("{}", n as i64);
    }
    format!("{n}")
}

fn string_to_number(s: &str) -> f64 {
    let t = s.trim();
    if t.is_empty() {
        return 0.0;
    }
    match t {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {},
    }
    if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).map_or(f64::NAN, |n| n as f64);
    }
    // Rust accepts spellings like "inf" and "nan" that JS does not.
    if t.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return f64::NAN;
    }
    t.parse().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_formatting() {
        assert_eq!(number_to_string(1.0), "1");
        assert_eq!(number_to_string(0.5), "0.5");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(f64::NAN), "NaN");
        assert_eq!(number_to_string(f64::INFINITY), "Infinity");
        assert_eq!(number_to_string(1e21), "1e+21");
        assert_eq!(number_to_string(1e-7), "1e-7");
        assert_eq!(number_to_string(0.1 + 0.2), "0.30000000000000004");
    }

    #[test]
    fn string_coercion() {
        assert_eq!(Value::str(" 42 ").to_number(), 42.0);
        assert_eq!(Value::str("").to_number(), 0.0);
        assert!(Value::str("inf").to_number().is_nan());
        assert_eq!(Value::str("0x10").to_number(), 16.0);
        assert_eq!(Value::Null.to_number(), 0.0);
        assert!(Value::Undefined.to_number().is_nan());
    }

    #[test]
    fn truthiness() {
        assert!(!Value::str("").truthy());
        assert!(Value::str("0").truthy());
        assert!(!Value::Number(f64::NAN).truthy());
        assert!(Value::array(Vec::new()).truthy());
    }

    #[test]
    fn array_display_joins() {
        let arr = Value::array(vec![Value::Number(1.0), Value::Null, Value::str("x")]);
        assert_eq!(arr.display(), "1,,x");
    }

    #[test]
    fn cyclic_array_display_terminates() {
        let arr = Value::array(vec![Value::Number(1.0)]);
        if let Value::Array(items) = &arr {
            items.borrow_mut().push(arr.clone());
        }
        assert_eq!(arr.display(), "1,");
        assert_eq!(arr.to_json(), Err(JsonError::Circular));
    }

    fn chain(levels: usize) -> Value {
        let mut value = Value::array(Vec::new());
        for _ in 1..levels {
            value = Value::array(vec![value]);
        }
        value
    }

    #[test]
    fn nesting_depth_counts_levels() {
        assert!(!Value::Number(1.0).nesting_exceeds(0));
        assert!(!chain(3).nesting_exceeds(3));
        assert!(chain(4).nesting_exceeds(3));

        let mut obj = Object::default();
        obj.set("inner", chain(2));
        assert!(Value::object(obj).nesting_exceeds(2));
    }

    #[test]
    fn over_deep_values_have_no_json() {
        // Printing recurses once per level, so give it the worker's stack.
        std::thread::Builder::new()
            .stack_size(16 << 20)
            .spawn(|| {
                let deep = chain(MAX_VALUE_DEPTH + 1);
                assert_eq!(deep.to_json(), Err(JsonError::TooDeep));
                assert_eq!(deep.display(), "...");
                assert_eq!(deep.console_text(), "...");
                assert!(chain(MAX_VALUE_DEPTH).to_json().is_ok());
            })
            .unwrap()
            .join()
            .unwrap();
    }

    #[test]
    fn long_chains_drop_without_recursion() {
        let mut obj = Value::object(Object::default());
        for _ in 0..200_000 {
            let mut next = Object::default();
            next.set("next", obj);
            obj = Value::object(next);
        }
        drop(obj);
        drop(chain(200_000));
    }

    #[test]
    fn console_text_pretty_prints_objects() {
        let mut obj = Object::default();
        obj.set("b", Value::Number(1.0));
        obj.set("a", Value::array(vec![Value::Bool(true)]));
        let text = Value::object(obj).console_text();
        assert_eq!(text, "{\n  \"b\": 1,\n  \"a\": [\n    true\n  ]\n}");
    }

    #[test]
    fn circular_object_falls_back() {
        let obj = Value::object(Object::default());
        if let Value::Object(inner) = &obj {
            inner.borrow_mut().set("self", obj.clone());
        }
        assert_eq!(obj.console_text(), "[object Object]");
    }

    #[test]
    fn error_display() {
        assert_eq!(Value::error("TypeError", "bad").display(), "TypeError: bad");
        assert_eq!(Value::error("Error", "").display(), "Error");
    }

    #[test]
    fn json_numbers_and_omissions() {
        let mut obj = Object::default();
        obj.set("n", Value::Number(2.5));
        obj.set("i", Value::Number(3.0));
        obj.set("u", Value::Undefined);
        obj.set("nan", Value::Number(f64::NAN));
        let json = Value::object(obj).to_json().unwrap().unwrap();
        assert_eq!(json.to_string(), r#"{"n":2.5,"i":3,"nan":null}"#);
    }

    #[test]
    fn equality_rules() {
        assert!(Value::Null.loose_equals(&Value::Undefined));
        assert!(!Value::Null.strict_equals(&Value::Undefined));
        assert!(Value::str("1").loose_equals(&Value::Number(1.0)));
        assert!(!Value::Number(f64::NAN).strict_equals(&Value::Number(f64::NAN)));
        let a = Value::array(Vec::new());
        assert!(a.strict_equals(&a.clone()));
        assert!(!a.strict_equals(&Value::array(Vec::new())));
    }

    #[test]
    fn from_json_keeps_key_order() {
        let json: serde_json::Value = serde_json::from_str(r#"{"z":1,"a":[null,"s"]}"#).unwrap();
        let value = Value::from_json(&json);
        let Value::Object(obj) = &value else {
            panic!("expected object");
        };
        let keys: Vec<_> = obj.borrow().entries.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(keys, ["z", "a"]);
    }
}
