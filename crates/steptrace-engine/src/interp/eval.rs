//! Expression evaluation: operators with Python numeric semantics, indexing,
//! iteration, and the builtin function table.

use std::cell::RefCell;
use std::rc::Rc;

use rand::Rng;

use steptrace_lang::ast::{BinOp, BoolOp, CmpOp, Expr, ExprKind, UnaryOp};

use crate::error::RuntimeError;
use crate::value::{range_len, Builtin, Value};

use super::{Frame, Interpreter};

/// Numeric operands after bool promotion, for arithmetic dispatch.
enum Num {
    Int(i64),
    Float(f64),
}

fn as_num(value: &Value) -> Option<Num> {
    match value {
        Value::Int(v) => Some(Num::Int(*v)),
        Value::Float(v) => Some(Num::Float(*v)),
        Value::Bool(b) => Some(Num::Int(*b as i64)),
        _ => None,
    }
}

/// Lazy iteration source for `for` loops. Ranges are never materialized, so
/// a huge range costs nothing until the governor stops the loop.
pub(crate) enum IterSource {
    Range { next: i64, stop: i64, step: i64 },
    Items(std::vec::IntoIter<Value>),
}

impl Iterator for IterSource {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        match self {
            IterSource::Range { next, stop, step } => {
                let done = if *step > 0 { *next >= *stop } else { *next <= *stop };
                if done {
                    return None;
                }
                let value = *next;
                *next += *step;
                Some(Value::Int(value))
            }
            IterSource::Items(items) => items.next(),
        }
    }
}

impl Interpreter {
    pub(crate) fn eval(&mut self, expr: &Expr, frame: &mut Frame) -> Result<Value, RuntimeError> {
        let line = expr.line;
        match &expr.kind {
            ExprKind::Int(v) => Ok(Value::Int(*v)),
            ExprKind::Float(v) => Ok(Value::Float(*v)),
            ExprKind::Str(s) => Ok(Value::Str(s.clone())),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::NoneLit => Ok(Value::None),
            ExprKind::Name(name) => self.load_name(frame, name, line),
            ExprKind::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item, frame)?);
                }
                Ok(Value::List(Rc::new(RefCell::new(values))))
            }
            ExprKind::Unary { op, operand } => {
                let value = self.eval(operand, frame)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!value.truthy())),
                    UnaryOp::Neg => match as_num(&value) {
                        Some(Num::Int(v)) => v
                            .checked_neg()
                            .map(Value::Int)
                            .ok_or(RuntimeError::Overflow { line }),
                        Some(Num::Float(v)) => Ok(Value::Float(-v)),
                        None => Err(RuntimeError::TypeError {
                            message: format!("bad operand type for unary -: '{}'", value.type_name()),
                            line,
                        }),
                    },
                }
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs, frame)?;
                let rhs = self.eval(rhs, frame)?;
                self.binary_op(*op, lhs, rhs, line)
            }
            ExprKind::Compare { op, lhs, rhs } => {
                let lhs = self.eval(lhs, frame)?;
                let rhs = self.eval(rhs, frame)?;
                self.compare(*op, &lhs, &rhs, line)
            }
            ExprKind::BoolOp { op, lhs, rhs } => {
                // Short-circuits and yields the deciding operand, not a bool.
                let lhs = self.eval(lhs, frame)?;
                match op {
                    BoolOp::And if !lhs.truthy() => Ok(lhs),
                    BoolOp::Or if lhs.truthy() => Ok(lhs),
                    _ => self.eval(rhs, frame),
                }
            }
            ExprKind::Call { func, args } => {
                let callee = self.eval(func, frame)?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg, frame)?);
                }
                match callee {
                    Value::Function(f) => self.call_function(f, values, line, frame.accepted),
                    Value::Builtin(b) => self.call_builtin(b, values, line),
                    other => Err(RuntimeError::NotCallable {
                        type_name: other.type_name().to_string(),
                        line,
                    }),
                }
            }
            ExprKind::MethodCall { recv, name, args } => {
                let recv = self.eval(recv, frame)?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg, frame)?);
                }
                self.call_method(&recv, name, values, line)
            }
            ExprKind::Index { base, index } => {
                let base = self.eval(base, frame)?;
                let index = self.eval(index, frame)?;
                self.index_get(&base, &index, line)
            }
        }
    }

    // ---- operators ----------------------------------------------------

    pub(crate) fn binary_op(
        &mut self,
        op: BinOp,
        lhs: Value,
        rhs: Value,
        line: u32,
    ) -> Result<Value, RuntimeError> {
        match (op, &lhs, &rhs) {
            (BinOp::Add, Value::Str(a), Value::Str(b)) => {
                let mut out = a.clone();
                out.push_str(b);
                Ok(Value::Str(out))
            }
            (BinOp::Add, Value::List(a), Value::List(b)) => {
                let mut items = a.borrow().clone();
                items.extend(b.borrow().iter().cloned());
                Ok(Value::List(Rc::new(RefCell::new(items))))
            }
            (BinOp::Mul, Value::Str(s), n) | (BinOp::Mul, n, Value::Str(s)) => {
                let count = as_count(n, &lhs, &rhs, op, line)?;
                repeat_len(s.len(), count, line)?;
                Ok(Value::Str(s.repeat(count)))
            }
            (BinOp::Mul, Value::List(items), n) | (BinOp::Mul, n, Value::List(items)) => {
                let count = as_count(n, &lhs, &rhs, op, line)?;
                let items = items.borrow();
                let total = repeat_len(items.len(), count, line)?;
                let mut out = Vec::with_capacity(total);
                while out.len() < total {
                    out.extend(items.iter().cloned());
                }
                Ok(Value::List(Rc::new(RefCell::new(out))))
            }
            _ => match (as_num(&lhs), as_num(&rhs)) {
                (Some(a), Some(b)) => numeric_op(op, a, b, line),
                _ => Err(binop_type_error(op, &lhs, &rhs, line)),
            },
        }
    }

    pub(crate) fn compare(
        &mut self,
        op: CmpOp,
        lhs: &Value,
        rhs: &Value,
        line: u32,
    ) -> Result<Value, RuntimeError> {
        let result = match op {
            CmpOp::Eq => lhs.eq_value(rhs),
            CmpOp::Ne => !lhs.eq_value(rhs),
            CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge => {
                let ordering = order(lhs, rhs).ok_or_else(|| RuntimeError::TypeError {
                    message: format!(
                        "'{}' not supported between instances of '{}' and '{}'",
                        cmp_symbol(op),
                        lhs.type_name(),
                        rhs.type_name()
                    ),
                    line,
                })?;
                match op {
                    CmpOp::Lt => ordering.is_lt(),
                    CmpOp::Le => ordering.is_le(),
                    CmpOp::Gt => ordering.is_gt(),
                    _ => ordering.is_ge(),
                }
            }
            CmpOp::In | CmpOp::NotIn => {
                let found = self.contains(rhs, lhs, line)?;
                if op == CmpOp::In {
                    found
                } else {
                    !found
                }
            }
        };
        Ok(Value::Bool(result))
    }

    fn contains(
        &mut self,
        container: &Value,
        needle: &Value,
        line: u32,
    ) -> Result<bool, RuntimeError> {
        match container {
            Value::List(items) => Ok(items.borrow().iter().any(|item| item.eq_value(needle))),
            Value::Str(haystack) => match needle {
                Value::Str(sub) => Ok(haystack.contains(sub.as_str())),
                other => Err(RuntimeError::TypeError {
                    message: format!(
                        "'in <string>' requires string as left operand, not {}",
                        other.type_name()
                    ),
                    line,
                }),
            },
            Value::Range { start, stop, step } => match needle {
                Value::Int(v) => {
                    let hit = if *step > 0 {
                        *v >= *start && *v < *stop && (*v - *start) % *step == 0
                    } else if *step < 0 {
                        *v <= *start && *v > *stop && (*start - *v) % (-*step) == 0
                    } else {
                        false
                    };
                    Ok(hit)
                }
                _ => Ok(false),
            },
            other => Err(RuntimeError::TypeError {
                message: format!("argument of type '{}' is not iterable", other.type_name()),
                line,
            }),
        }
    }

    // ---- indexing and iteration ---------------------------------------

    pub(crate) fn index_get(
        &mut self,
        base: &Value,
        index: &Value,
        line: u32,
    ) -> Result<Value, RuntimeError> {
        match base {
            Value::List(items) => {
                let items = items.borrow();
                let i = resolve_index(index, items.len(), line)?;
                Ok(items[i].clone())
            }
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                let i = resolve_index(index, chars.len(), line)?;
                Ok(Value::Str(chars[i].to_string()))
            }
            other => Err(RuntimeError::TypeError {
                message: format!("'{}' object is not subscriptable", other.type_name()),
                line,
            }),
        }
    }

    pub(crate) fn index_set(
        &mut self,
        base: &Value,
        index: &Value,
        value: Value,
        line: u32,
    ) -> Result<(), RuntimeError> {
        match base {
            Value::List(items) => {
                let mut items = items.borrow_mut();
                let i = resolve_index(index, items.len(), line)?;
                items[i] = value;
                Ok(())
            }
            other => Err(RuntimeError::TypeError {
                message: format!(
                    "'{}' object does not support item assignment",
                    other.type_name()
                ),
                line,
            }),
        }
    }

    /// Resolves a `for` loop's iterable into an iteration source. Lists are
    /// iterated over a snapshot of their current elements, so mutating the
    /// list inside the loop does not change the iteration.
    pub(crate) fn iterate(
        &mut self,
        iter: &Expr,
        frame: &mut Frame,
    ) -> Result<IterSource, RuntimeError> {
        let value = self.eval(iter, frame)?;
        match value {
            Value::Range { start, stop, step } => Ok(IterSource::Range {
                next: start,
                stop,
                step,
            }),
            Value::List(items) => Ok(IterSource::Items(items.borrow().clone().into_iter())),
            Value::Str(s) => Ok(IterSource::Items(
                s.chars()
                    .map(|c| Value::Str(c.to_string()))
                    .collect::<Vec<_>>()
                    .into_iter(),
            )),
            other => Err(RuntimeError::TypeError {
                message: format!("'{}' object is not iterable", other.type_name()),
                line: iter.line,
            }),
        }
    }

    // ---- builtins -----------------------------------------------------

    fn call_method(
        &mut self,
        recv: &Value,
        name: &str,
        args: Vec<Value>,
        line: u32,
    ) -> Result<Value, RuntimeError> {
        let Value::List(items) = recv else {
            return Err(RuntimeError::TypeError {
                message: format!("'{}' object has no attribute '{name}'", recv.type_name()),
                line,
            });
        };
        match name {
            "append" => {
                let [value] = take_args::<1>(name, args, line)?;
                items.borrow_mut().push(value);
                Ok(Value::None)
            }
            "pop" => {
                if !args.is_empty() {
                    let [index] = take_args::<1>(name, args, line)?;
                    let mut items = items.borrow_mut();
                    let i = resolve_index(&index, items.len(), line)?;
                    Ok(items.remove(i))
                } else {
                    items.borrow_mut().pop().ok_or(RuntimeError::IndexError {
                        index: -1,
                        len: 0,
                        line,
                    })
                }
            }
            _ => Err(RuntimeError::TypeError {
                message: format!("'list' object has no attribute '{name}'"),
                line,
            }),
        }
    }

    fn call_builtin(
        &mut self,
        builtin: Builtin,
        args: Vec<Value>,
        line: u32,
    ) -> Result<Value, RuntimeError> {
        match builtin {
            Builtin::Print => {
                let mut text = String::new();
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        text.push(' ');
                    }
                    // Display falls back to a type placeholder for values
                    // the repr printer cannot render.
                    match arg {
                        Value::Str(s) => text.push_str(s),
                        other => text.push_str(&other.to_string()),
                    }
                }
                text.push('\n');
                self.ctx.out.write(&text);
                Ok(Value::None)
            }
            Builtin::Input => {
                if args.len() > 1 {
                    return Err(arity(builtin, 1, args.len(), line));
                }
                if let Some(prompt) = args.first() {
                    let text = match prompt {
                        Value::Str(s) => s.clone(),
                        other => other.to_string(),
                    };
                    self.ctx.out.write(&text);
                }
                let super::ExecutionContext { input, out, .. } = &mut self.ctx;
                let mut line_text = input.read_line(out);
                if line_text.ends_with('\n') {
                    line_text.pop();
                }
                Ok(Value::Str(line_text))
            }
            Builtin::Range => {
                if args.is_empty() || args.len() > 3 {
                    return Err(arity(builtin, 3, args.len(), line));
                }
                let mut bounds = Vec::with_capacity(args.len());
                for arg in &args {
                    bounds.push(expect_int(arg, builtin.name(), line)?);
                }
                let (start, stop, step) = match bounds.as_slice() {
                    [stop] => (0, *stop, 1),
                    [start, stop] => (*start, *stop, 1),
                    [start, stop, step] => (*start, *stop, *step),
                    _ => unreachable!(),
                };
                if step == 0 {
                    return Err(RuntimeError::ValueError {
                        message: "range() arg 3 must not be zero".to_string(),
                        line,
                    });
                }
                Ok(Value::Range { start, stop, step })
            }
            Builtin::Len => {
                let [value] = take_args::<1>(builtin.name(), args, line)?;
                match &value {
                    Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
                    Value::List(items) => Ok(Value::Int(items.borrow().len() as i64)),
                    Value::Range { start, stop, step } => {
                        Ok(Value::Int(range_len(*start, *stop, *step)))
                    }
                    other => Err(RuntimeError::TypeError {
                        message: format!("object of type '{}' has no len()", other.type_name()),
                        line,
                    }),
                }
            }
            Builtin::Str => {
                let [value] = take_args::<1>(builtin.name(), args, line)?;
                let text = match &value {
                    Value::Str(s) => s.clone(),
                    other => other.to_string(),
                };
                Ok(Value::Str(text))
            }
            Builtin::Int => {
                let [value] = take_args::<1>(builtin.name(), args, line)?;
                match &value {
                    Value::Int(v) => Ok(Value::Int(*v)),
                    Value::Bool(b) => Ok(Value::Int(*b as i64)),
                    Value::Float(v) => {
                        let t = v.trunc();
                        if t >= i64::MIN as f64 && t <= i64::MAX as f64 {
                            Ok(Value::Int(t as i64))
                        } else {
                            Err(RuntimeError::Overflow { line })
                        }
                    }
                    Value::Str(s) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
                        RuntimeError::ValueError {
                            message: format!("invalid literal for int(): '{s}'"),
                            line,
                        }
                    }),
                    other => Err(RuntimeError::TypeError {
                        message: format!("int() argument must not be '{}'", other.type_name()),
                        line,
                    }),
                }
            }
            Builtin::Float => {
                let [value] = take_args::<1>(builtin.name(), args, line)?;
                match &value {
                    Value::Float(v) => Ok(Value::Float(*v)),
                    Value::Int(v) => Ok(Value::Float(*v as f64)),
                    Value::Bool(b) => Ok(Value::Float(*b as i64 as f64)),
                    Value::Str(s) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
                        RuntimeError::ValueError {
                            message: format!("could not convert string to float: '{s}'"),
                            line,
                        }
                    }),
                    other => Err(RuntimeError::TypeError {
                        message: format!("float() argument must not be '{}'", other.type_name()),
                        line,
                    }),
                }
            }
            Builtin::Abs => {
                let [value] = take_args::<1>(builtin.name(), args, line)?;
                match as_num(&value) {
                    Some(Num::Int(v)) => v
                        .checked_abs()
                        .map(Value::Int)
                        .ok_or(RuntimeError::Overflow { line }),
                    Some(Num::Float(v)) => Ok(Value::Float(v.abs())),
                    None => Err(RuntimeError::TypeError {
                        message: format!("bad operand type for abs(): '{}'", value.type_name()),
                        line,
                    }),
                }
            }
            Builtin::Random => {
                if !args.is_empty() {
                    return Err(arity(builtin, 0, args.len(), line));
                }
                Ok(Value::Float(self.ctx.rng.gen::<f64>()))
            }
            Builtin::RandInt => {
                let [lo, hi] = take_args::<2>(builtin.name(), args, line)?;
                let lo = expect_int(&lo, builtin.name(), line)?;
                let hi = expect_int(&hi, builtin.name(), line)?;
                if lo > hi {
                    return Err(RuntimeError::ValueError {
                        message: format!("empty range for randint({lo}, {hi})"),
                        line,
                    });
                }
                Ok(Value::Int(self.ctx.rng.gen_range(lo..=hi)))
            }
        }
    }
}

fn numeric_op(op: BinOp, lhs: Num, rhs: Num, line: u32) -> Result<Value, RuntimeError> {
    match (lhs, rhs) {
        (Num::Int(a), Num::Int(b)) => match op {
            BinOp::Add => a.checked_add(b).map(Value::Int).ok_or(RuntimeError::Overflow { line }),
            BinOp::Sub => a.checked_sub(b).map(Value::Int).ok_or(RuntimeError::Overflow { line }),
            BinOp::Mul => a.checked_mul(b).map(Value::Int).ok_or(RuntimeError::Overflow { line }),
            BinOp::Div => {
                if b == 0 {
                    Err(RuntimeError::ZeroDivision { line })
                } else {
                    Ok(Value::Float(a as f64 / b as f64))
                }
            }
            BinOp::FloorDiv => {
                if b == 0 {
                    return Err(RuntimeError::ZeroDivision { line });
                }
                // Rounds toward negative infinity, like Python.
                let q = a.checked_div(b).ok_or(RuntimeError::Overflow { line })?;
                let r = a % b;
                Ok(Value::Int(if r != 0 && (r < 0) != (b < 0) { q - 1 } else { q }))
            }
            BinOp::Mod => {
                if b == 0 {
                    return Err(RuntimeError::ZeroDivision { line });
                }
                // Result takes the sign of the divisor, like Python.
                let r = a % b;
                Ok(Value::Int(if r != 0 && (r < 0) != (b < 0) { r + b } else { r }))
            }
        },
        (a, b) => {
            let a = match a {
                Num::Int(v) => v as f64,
                Num::Float(v) => v,
            };
            let b = match b {
                Num::Int(v) => v as f64,
                Num::Float(v) => v,
            };
            match op {
                BinOp::Add => Ok(Value::Float(a + b)),
                BinOp::Sub => Ok(Value::Float(a - b)),
                BinOp::Mul => Ok(Value::Float(a * b)),
                BinOp::Div => {
                    if b == 0.0 {
                        Err(RuntimeError::ZeroDivision { line })
                    } else {
                        Ok(Value::Float(a / b))
                    }
                }
                BinOp::FloorDiv => {
                    if b == 0.0 {
                        Err(RuntimeError::ZeroDivision { line })
                    } else {
                        Ok(Value::Float((a / b).floor()))
                    }
                }
                BinOp::Mod => {
                    if b == 0.0 {
                        Err(RuntimeError::ZeroDivision { line })
                    } else {
                        Ok(Value::Float(a - b * (a / b).floor()))
                    }
                }
            }
        }
    }
}

fn order(lhs: &Value, rhs: &Value) -> Option<std::cmp::Ordering> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => {
            let a = match as_num(lhs)? {
                Num::Int(v) => v as f64,
                Num::Float(v) => v,
            };
            let b = match as_num(rhs)? {
                Num::Int(v) => v as f64,
                Num::Float(v) => v,
            };
            a.partial_cmp(&b)
        }
    }
}

/// Normalizes a sequence index: bool promotion, negative indexing from the
/// end, bounds check.
fn resolve_index(index: &Value, len: usize, line: u32) -> Result<usize, RuntimeError> {
    let raw = match index {
        Value::Int(v) => *v,
        Value::Bool(b) => *b as i64,
        other => {
            return Err(RuntimeError::TypeError {
                message: format!(
                    "indices must be integers, not {}",
                    other.type_name()
                ),
                line,
            })
        }
    };
    let adjusted = if raw < 0 { raw + len as i64 } else { raw };
    if adjusted < 0 || adjusted >= len as i64 {
        return Err(RuntimeError::IndexError {
            index: raw,
            len,
            line,
        });
    }
    Ok(adjusted as usize)
}

/// Upper bound on the length of a sequence built by `*` repetition, so a
/// single expression cannot exhaust memory before the governor runs again.
const MAX_REPEAT_LEN: usize = 1 << 20;

/// Length of `unit`-sized elements repeated `count` times, trapped when the
/// product overflows or exceeds the repetition cap.
fn repeat_len(unit: usize, count: usize, line: u32) -> Result<usize, RuntimeError> {
    match unit.checked_mul(count) {
        Some(total) if total <= MAX_REPEAT_LEN => Ok(total),
        _ => Err(RuntimeError::Overflow { line }),
    }
}

fn as_count(
    n: &Value,
    lhs: &Value,
    rhs: &Value,
    op: BinOp,
    line: u32,
) -> Result<usize, RuntimeError> {
    match n {
        Value::Int(v) => Ok((*v).max(0) as usize),
        Value::Bool(b) => Ok(*b as usize),
        _ => Err(binop_type_error(op, lhs, rhs, line)),
    }
}

fn expect_int(value: &Value, func: &str, line: u32) -> Result<i64, RuntimeError> {
    match value {
        Value::Int(v) => Ok(*v),
        Value::Bool(b) => Ok(*b as i64),
        other => Err(RuntimeError::TypeError {
            message: format!("{func}() expected an int, got '{}'", other.type_name()),
            line,
        }),
    }
}

fn take_args<const N: usize>(
    name: &str,
    args: Vec<Value>,
    line: u32,
) -> Result<[Value; N], RuntimeError> {
    let got = args.len();
    args.try_into().map_err(|_| RuntimeError::ArityMismatch {
        name: name.to_string(),
        expected: N,
        got,
        line,
    })
}

fn arity(builtin: Builtin, expected: usize, got: usize, line: u32) -> RuntimeError {
    RuntimeError::ArityMismatch {
        name: builtin.name().to_string(),
        expected,
        got,
        line,
    }
}

fn binop_type_error(op: BinOp, lhs: &Value, rhs: &Value, line: u32) -> RuntimeError {
    let symbol = match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::FloorDiv => "//",
        BinOp::Mod => "%",
    };
    RuntimeError::TypeError {
        message: format!(
            "unsupported operand type(s) for {symbol}: '{}' and '{}'",
            lhs.type_name(),
            rhs.type_name()
        ),
        line,
    }
}

fn cmp_symbol(op: CmpOp) -> &'static str {
    match op {
        CmpOp::Lt => "<",
        CmpOp::Le => "<=",
        CmpOp::Gt => ">",
        CmpOp::Ge => ">=",
        _ => "==",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::governor::Limits;
    use crate::interp::ExecutionContext;
    use std::path::PathBuf;

    fn interp() -> Interpreter {
        Interpreter::new(ExecutionContext::new(
            PathBuf::from("main.py"),
            None,
            Limits::default(),
            0,
        ))
    }

    #[test]
    fn int_division_always_produces_float() {
        let mut it = interp();
        let v = it.binary_op(BinOp::Div, Value::Int(7), Value::Int(2), 1).unwrap();
        assert!(matches!(v, Value::Float(f) if f == 3.5));
        let v = it.binary_op(BinOp::Div, Value::Int(6), Value::Int(3), 1).unwrap();
        assert!(matches!(v, Value::Float(f) if f == 2.0));
    }

    #[test]
    fn floor_division_rounds_toward_negative_infinity() {
        let mut it = interp();
        let v = it.binary_op(BinOp::FloorDiv, Value::Int(-7), Value::Int(2), 1).unwrap();
        assert!(matches!(v, Value::Int(-4)));
        let v = it.binary_op(BinOp::FloorDiv, Value::Int(7), Value::Int(2), 1).unwrap();
        assert!(matches!(v, Value::Int(3)));
    }

    #[test]
    fn modulo_takes_sign_of_divisor() {
        let mut it = interp();
        let v = it.binary_op(BinOp::Mod, Value::Int(-7), Value::Int(3), 1).unwrap();
        assert!(matches!(v, Value::Int(2)));
        let v = it.binary_op(BinOp::Mod, Value::Int(7), Value::Int(-3), 1).unwrap();
        assert!(matches!(v, Value::Int(-2)));
    }

    #[test]
    fn division_by_zero_is_reported() {
        let mut it = interp();
        let err = it.binary_op(BinOp::Div, Value::Int(1), Value::Int(0), 9).unwrap_err();
        assert!(matches!(err, RuntimeError::ZeroDivision { line: 9 }));
    }

    #[test]
    fn integer_overflow_is_trapped() {
        let mut it = interp();
        let err = it
            .binary_op(BinOp::Add, Value::Int(i64::MAX), Value::Int(1), 3)
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Overflow { line: 3 }));
    }

    #[test]
    fn string_concat_and_repeat() {
        let mut it = interp();
        let v = it
            .binary_op(BinOp::Add, Value::Str("ab".into()), Value::Str("c".into()), 1)
            .unwrap();
        assert!(matches!(v, Value::Str(s) if s == "abc"));
        let v = it
            .binary_op(BinOp::Mul, Value::Str("ab".into()), Value::Int(3), 1)
            .unwrap();
        assert!(matches!(v, Value::Str(s) if s == "ababab"));
    }

    #[test]
    fn oversized_repetition_is_trapped_not_allocated() {
        let mut it = interp();
        let err = it
            .binary_op(BinOp::Mul, Value::Str("abc".into()), Value::Int(i64::MAX), 2)
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Overflow { line: 2 }));

        let items = Rc::new(RefCell::new(vec![Value::Int(1)]));
        let err = it
            .binary_op(BinOp::Mul, Value::List(items), Value::Int(i64::MAX), 3)
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Overflow { line: 3 }));

        // Repeating an empty sequence is cheap whatever the count.
        let v = it
            .binary_op(BinOp::Mul, Value::Str(String::new()), Value::Int(i64::MAX), 4)
            .unwrap();
        assert!(matches!(v, Value::Str(s) if s.is_empty()));
        let empty = Rc::new(RefCell::new(vec![]));
        let v = it
            .binary_op(BinOp::Mul, Value::List(empty), Value::Int(i64::MAX), 5)
            .unwrap();
        assert!(matches!(v, Value::List(items) if items.borrow().is_empty()));
    }

    #[test]
    fn mixed_type_ordering_is_a_type_error() {
        let mut it = interp();
        let err = it
            .compare(CmpOp::Lt, &Value::Int(1), &Value::Str("x".into()), 4)
            .unwrap_err();
        assert!(matches!(err, RuntimeError::TypeError { line: 4, .. }));
    }

    #[test]
    fn bools_promote_to_ints_in_arithmetic() {
        let mut it = interp();
        let v = it.binary_op(BinOp::Add, Value::Bool(true), Value::Int(2), 1).unwrap();
        assert!(matches!(v, Value::Int(3)));
    }

    #[test]
    fn negative_indices_count_from_the_end() {
        assert_eq!(resolve_index(&Value::Int(-1), 3, 1).unwrap(), 2);
        assert_eq!(resolve_index(&Value::Int(0), 3, 1).unwrap(), 0);
        let err = resolve_index(&Value::Int(3), 3, 1).unwrap_err();
        assert!(matches!(err, RuntimeError::IndexError { index: 3, len: 3, .. }));
    }

    #[test]
    fn range_iteration_is_lazy_and_bounded() {
        let items: Vec<Value> = IterSource::Range { next: 0, stop: 3, step: 1 }.collect();
        assert_eq!(items.len(), 3);
        let empty: Vec<Value> = IterSource::Range { next: 5, stop: 0, step: 1 }.collect();
        assert!(empty.is_empty());
        let down: Vec<Value> = IterSource::Range { next: 3, stop: 0, step: -1 }.collect();
        assert_eq!(down.len(), 3);
    }

    #[test]
    fn range_membership() {
        let mut it = interp();
        let range = Value::Range { start: 0, stop: 10, step: 2 };
        let hit = it.compare(CmpOp::In, &Value::Int(4), &range, 1).unwrap();
        assert!(matches!(hit, Value::Bool(true)));
        let miss = it.compare(CmpOp::In, &Value::Int(5), &range, 1).unwrap();
        assert!(matches!(miss, Value::Bool(false)));
    }
}
