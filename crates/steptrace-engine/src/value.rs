//! Runtime value representation for the tracing interpreter.
//!
//! [`Value`] is the dynamic counterpart of the language's literal forms.
//! Lists use `Rc<RefCell<...>>` so aliased mutation behaves the way the
//! traced language promises (appending through one name is visible through
//! another); snapshots taken for the trace are textual, so an already
//! recorded step never changes when the underlying list does.

use std::cell::RefCell;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use steptrace_lang::ast::Stmt;

/// A runtime value produced or consumed during evaluation.
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    None,
    List(Rc<RefCell<Vec<Value>>>),
    /// Lazy integer range, as produced by `range(...)`.
    Range { start: i64, stop: i64, step: i64 },
    /// A user-defined function created by `def`.
    Function(Rc<FunctionObj>),
    Builtin(Builtin),
}

/// A `def`-created function: its body plus the canonical path of the unit
/// that defined it. The origin path is what the event filter matches against
/// the traced script, so functions preloaded from library units are
/// recognizably foreign.
#[derive(Debug)]
pub struct FunctionObj {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    pub origin: Rc<PathBuf>,
}

/// Native functions. These have no originating file, so the event filter
/// never accepts them and their execution contributes no steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Print,
    Input,
    Range,
    Len,
    Str,
    Int,
    Float,
    Abs,
    Random,
    RandInt,
}

impl Builtin {
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::Input => "input",
            Builtin::Range => "range",
            Builtin::Len => "len",
            Builtin::Str => "str",
            Builtin::Int => "int",
            Builtin::Float => "float",
            Builtin::Abs => "abs",
            Builtin::Random => "random",
            Builtin::RandInt => "randint",
        }
    }

    /// Resolves a name to a builtin, the last stop in name lookup.
    pub fn lookup(name: &str) -> Option<Builtin> {
        Some(match name {
            "print" => Builtin::Print,
            "input" => Builtin::Input,
            "range" => Builtin::Range,
            "len" => Builtin::Len,
            "str" => Builtin::Str,
            "int" => Builtin::Int,
            "float" => Builtin::Float,
            "abs" => Builtin::Abs,
            "random" => Builtin::Random,
            "randint" => Builtin::RandInt,
            _ => return None,
        })
    }
}

/// The closed set of value categories the serializer dispatches on.
///
/// Keeping this a tagged set (rather than open-ended type inspection) makes
/// the serializer's skip rules exhaustively testable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueCategory {
    /// Scalar data: numbers, strings, booleans, `None`.
    Primitive,
    /// Structured data: lists and ranges.
    Container,
    /// Functions and builtins — carry no state worth showing line by line.
    Callable,
}

/// Recursion budget for [`Value::repr`]; a self-referential list exceeds it
/// and degrades to a placeholder instead of overflowing the stack.
const REPR_DEPTH_LIMIT: usize = 16;

/// Raised when a value cannot be rendered as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReprError;

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Bool(_) => "bool",
            Value::None => "NoneType",
            Value::List(_) => "list",
            Value::Range { .. } => "range",
            Value::Function(_) => "function",
            Value::Builtin(_) => "builtin",
        }
    }

    pub fn category(&self) -> ValueCategory {
        match self {
            Value::Int(_) | Value::Float(_) | Value::Str(_) | Value::Bool(_) | Value::None => {
                ValueCategory::Primitive
            }
            Value::List(_) | Value::Range { .. } => ValueCategory::Container,
            Value::Function(_) | Value::Builtin(_) => ValueCategory::Callable,
        }
    }

    /// Python-style truthiness.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(v) => *v != 0,
            Value::Float(v) => *v != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::None => false,
            Value::List(items) => !items.borrow().is_empty(),
            Value::Range { start, stop, step } => range_len(*start, *stop, *step) > 0,
            Value::Function(_) | Value::Builtin(_) => true,
        }
    }

    /// The `repr`-style rendering used for variable snapshots: strings keep
    /// their quotes, containers render their elements recursively.
    pub fn repr(&self) -> Result<String, ReprError> {
        let mut out = String::new();
        self.repr_into(&mut out, 0)?;
        Ok(out)
    }

    fn repr_into(&self, out: &mut String, depth: usize) -> Result<(), ReprError> {
        if depth > REPR_DEPTH_LIMIT {
            return Err(ReprError);
        }
        match self {
            Value::Int(v) => out.push_str(&v.to_string()),
            Value::Float(v) => out.push_str(&format_float(*v)),
            Value::Str(s) => {
                out.push('\'');
                for c in s.chars() {
                    match c {
                        '\'' => out.push_str("\\'"),
                        '\\' => out.push_str("\\\\"),
                        '\n' => out.push_str("\\n"),
                        '\t' => out.push_str("\\t"),
                        other => out.push(other),
                    }
                }
                out.push('\'');
            }
            Value::Bool(true) => out.push_str("True"),
            Value::Bool(false) => out.push_str("False"),
            Value::None => out.push_str("None"),
            Value::List(items) => {
                out.push('[');
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.repr_into(out, depth + 1)?;
                }
                out.push(']');
            }
            Value::Range { start, stop, step } => {
                if *step == 1 {
                    out.push_str(&format!("range({start}, {stop})"));
                } else {
                    out.push_str(&format!("range({start}, {stop}, {step})"));
                }
            }
            Value::Function(f) => out.push_str(&format!("<function {}>", f.name)),
            Value::Builtin(b) => out.push_str(&format!("<built-in function {}>", b.name())),
        }
        Ok(())
    }

    /// The `str`-style rendering used by `print` and `str()`: strings are
    /// raw, everything else matches [`Value::repr`].
    pub fn display(&self) -> Result<String, ReprError> {
        match self {
            Value::Str(s) => Ok(s.clone()),
            other => other.repr(),
        }
    }

    /// Structural equality with Python's numeric cross-type rules. Bools
    /// promote to their integer values, so `True == 1`.
    pub fn eq_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::None, Value::None) => true,
            (Value::List(a), Value::List(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.eq_value(y))
            }
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Float(f), v) | (v, Value::Float(f)) => {
                int_operand(v).map_or(false, |i| i as f64 == *f)
            }
            _ => match (int_operand(self), int_operand(other)) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.repr() {
            Ok(text) => f.write_str(&text),
            Err(ReprError) => write!(f, "<{}>", self.type_name()),
        }
    }
}

/// Integer reading of a value for equality, promoting bools.
fn int_operand(v: &Value) -> Option<i64> {
    match v {
        Value::Int(i) => Some(*i),
        Value::Bool(b) => Some(*b as i64),
        _ => None,
    }
}

/// Number of elements a `range(start, stop, step)` yields.
pub fn range_len(start: i64, stop: i64, step: i64) -> i64 {
    if step > 0 && stop > start {
        (stop - start + step - 1) / step
    } else if step < 0 && stop < start {
        (start - stop + (-step) - 1) / (-step)
    } else {
        0
    }
}

/// Floats print with at least one fractional digit, like Python's repr
/// (`2.0`, not `2`).
fn format_float(v: f64) -> String {
    if v.is_finite() && v == v.trunc() && v.abs() < 1e16 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(items)))
    }

    #[test]
    fn repr_of_primitives() {
        assert_eq!(Value::Int(3).repr().unwrap(), "3");
        assert_eq!(Value::Float(2.0).repr().unwrap(), "2.0");
        assert_eq!(Value::Float(2.5).repr().unwrap(), "2.5");
        assert_eq!(Value::Bool(true).repr().unwrap(), "True");
        assert_eq!(Value::None.repr().unwrap(), "None");
        assert_eq!(Value::Str("hi".into()).repr().unwrap(), "'hi'");
        assert_eq!(Value::Str("a\nb".into()).repr().unwrap(), "'a\\nb'");
    }

    #[test]
    fn repr_of_containers() {
        let v = list(vec![Value::Int(1), Value::Str("x".into())]);
        assert_eq!(v.repr().unwrap(), "[1, 'x']");
        let r = Value::Range { start: 0, stop: 3, step: 1 };
        assert_eq!(r.repr().unwrap(), "range(0, 3)");
    }

    #[test]
    fn display_strips_string_quotes() {
        assert_eq!(Value::Str("hi".into()).display().unwrap(), "hi");
        assert_eq!(Value::Int(7).display().unwrap(), "7");
    }

    #[test]
    fn self_referential_list_fails_repr() {
        let inner = Rc::new(RefCell::new(vec![Value::Int(1)]));
        let cyclic = Value::List(inner.clone());
        inner.borrow_mut().push(cyclic.clone());
        assert_eq!(cyclic.repr(), Err(ReprError));
    }

    #[test]
    fn truthiness() {
        assert!(Value::Int(1).truthy());
        assert!(!Value::Int(0).truthy());
        assert!(!Value::Str(String::new()).truthy());
        assert!(!Value::None.truthy());
        assert!(!list(vec![]).truthy());
        assert!(list(vec![Value::None]).truthy());
        assert!(!Value::Range { start: 0, stop: 0, step: 1 }.truthy());
    }

    #[test]
    fn categories_are_a_closed_set() {
        assert_eq!(Value::Int(1).category(), ValueCategory::Primitive);
        assert_eq!(list(vec![]).category(), ValueCategory::Container);
        assert_eq!(Value::Builtin(Builtin::Print).category(), ValueCategory::Callable);
    }

    #[test]
    fn cross_type_numeric_equality() {
        assert!(Value::Int(2).eq_value(&Value::Float(2.0)));
        assert!(!Value::Int(2).eq_value(&Value::Str("2".into())));
    }

    #[test]
    fn bools_equal_their_int_values() {
        assert!(Value::Bool(true).eq_value(&Value::Int(1)));
        assert!(Value::Int(0).eq_value(&Value::Bool(false)));
        assert!(Value::Bool(true).eq_value(&Value::Float(1.0)));
        assert!(!Value::Bool(true).eq_value(&Value::Int(2)));
        assert!(!Value::Bool(false).eq_value(&Value::None));
    }

    #[test]
    fn range_len_cases() {
        assert_eq!(range_len(0, 5, 1), 5);
        assert_eq!(range_len(0, 5, 2), 3);
        assert_eq!(range_len(5, 0, -1), 5);
        assert_eq!(range_len(0, 0, 1), 0);
        assert_eq!(range_len(5, 0, 1), 0);
    }
}
