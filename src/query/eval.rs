//! Tree-walking evaluator for query expressions.
//!
//! Every expression evaluates to a sequence of zero or more values. The
//! [`Context`] carries the current matching values and the variable scope;
//! it is cloned (cheaply, values are trees) whenever a sub-expression runs
//! against an adjusted current value or an extended scope, so sibling
//! evaluations never observe each other's state.
//!
//! Binary operators combine their operands as a Cartesian product in AST
//! order, left operand outermost. An empty operand therefore produces an
//! empty result.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;

use super::expr::{AssignOp, BinOp, Expr, InterpPart, Literal, ObjectKey, UnaryOp};
use super::functions;
use super::path;
use super::value::Value;

/// What went wrong during evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unbound variables, bad field/index access, iteration over scalars
    Lookup,
    /// Division by zero, operators applied to incompatible types
    Arithmetic,
    /// Assignment through a non-path, malformed path values
    Path,
    /// Regex patterns that do not compile
    Regex,
    /// Failures raised by `error(msg)`
    User,
}

/// A failure raised during evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalError {
    pub kind: ErrorKind,
    pub message: String,
}

impl EvalError {
    pub(crate) fn lookup(message: impl Into<String>) -> Self {
        EvalError {
            kind: ErrorKind::Lookup,
            message: message.into(),
        }
    }

    pub(crate) fn arithmetic(message: impl Into<String>) -> Self {
        EvalError {
            kind: ErrorKind::Arithmetic,
            message: message.into(),
        }
    }

    pub(crate) fn path(message: impl Into<String>) -> Self {
        EvalError {
            kind: ErrorKind::Path,
            message: message.into(),
        }
    }

    pub(crate) fn regex(message: impl Into<String>) -> Self {
        EvalError {
            kind: ErrorKind::Regex,
            message: message.into(),
        }
    }

    pub(crate) fn user(message: impl Into<String>) -> Self {
        EvalError {
            kind: ErrorKind::User,
            message: message.into(),
        }
    }

    pub(crate) fn cannot_index(value: &Value, key: &str) -> Self {
        EvalError::lookup(format!("cannot index {} with {}", value.type_name(), key))
    }

    pub(crate) fn cannot_iterate(value: &Value) -> Self {
        EvalError::lookup(format!("cannot iterate over {}", value.type_name()))
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EvalError {}

/// Evaluation state: the current matching values and the variable scope.
#[derive(Debug, Clone)]
pub struct Context {
    /// The values the next operation applies to.
    pub values: Vec<Value>,
    vars: HashMap<String, Value>,
}

impl Context {
    /// A fresh context for one input document.
    pub fn new(input: Value) -> Self {
        Context {
            values: vec![input],
            vars: HashMap::new(),
        }
    }

    /// The same scope with a replaced set of current values.
    pub(crate) fn with_values(&self, values: Vec<Value>) -> Self {
        Context {
            values,
            vars: self.vars.clone(),
        }
    }

    /// The same scope focused on a single current value.
    pub(crate) fn with_value(&self, value: Value) -> Self {
        self.with_values(vec![value])
    }

    /// A child scope with one extra binding layered on top.
    pub(crate) fn with_variable(&self, name: &str, value: Value) -> Self {
        let mut vars = self.vars.clone();
        vars.insert(name.to_string(), value);
        Context {
            values: self.values.clone(),
            vars,
        }
    }

    pub(crate) fn variable(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }
}

/// Evaluate an expression against a context, producing its output sequence.
pub fn eval(expr: &Expr, ctx: &Context) -> Result<Vec<Value>, EvalError> {
    match expr {
        Expr::Identity => Ok(ctx.values.clone()),

        Expr::Literal(lit) => Ok(vec![literal_value(lit)]),

        Expr::Field { name, from } => {
            let sources = eval_from(from, ctx)?;
            sources.iter().map(|v| field_of(v, name)).collect()
        }

        Expr::Index { index, from } => {
            let sources = eval_from(from, ctx)?;
            sources.iter().map(|v| index_of(v, *index)).collect()
        }

        Expr::Slice { start, end, from } => {
            let sources = eval_from(from, ctx)?;
            sources.iter().map(|v| slice_of(v, *start, *end)).collect()
        }

        Expr::Iterate { from } => {
            let sources = eval_from(from, ctx)?;
            let mut out = Vec::new();
            for v in &sources {
                out.extend(iterate_value(v)?);
            }
            Ok(out)
        }

        Expr::DynamicIndex { key, from } => {
            let sources = eval_from(from, ctx)?;
            let mut out = Vec::new();
            for v in sources {
                let keys = eval(key, &ctx.with_value(v.clone()))?;
                for k in &keys {
                    out.push(dynamic_index(&v, k)?);
                }
            }
            Ok(out)
        }

        Expr::RecursiveDescent { from } => {
            let sources = eval_from(from, ctx)?;
            let mut out = Vec::new();
            for v in &sources {
                out.push(v.clone());
                collect_descendants(v, &mut out);
            }
            Ok(out)
        }

        Expr::Optional(inner) => match eval(inner, ctx) {
            Ok(values) => Ok(values.into_iter().filter(|v| !v.is_null()).collect()),
            Err(_) => Ok(Vec::new()),
        },

        Expr::Pipe { left, right } => {
            let mut out = Vec::new();
            for v in eval(left, ctx)? {
                out.extend(eval(right, &ctx.with_value(v))?);
            }
            Ok(out)
        }

        Expr::Comma(exprs) => {
            let mut out = Vec::new();
            for e in exprs {
                out.extend(eval(e, ctx)?);
            }
            Ok(out)
        }

        Expr::Binary { op, left, right } => eval_binary(*op, left, right, ctx),

        Expr::Unary { op, expr } => eval_unary(*op, expr, ctx),

        Expr::Alternative { left, right } => match eval(left, ctx) {
            Ok(values) => {
                let truthy: Vec<Value> =
                    values.into_iter().filter(|v| v.is_truthy()).collect();
                if truthy.is_empty() {
                    eval(right, ctx)
                } else {
                    Ok(truthy)
                }
            }
            Err(_) => eval(right, ctx),
        },

        Expr::Assign { path, op, value } => eval_assign(path, *op, value, ctx),

        Expr::Call { name, args } => functions::call(name, args, ctx),

        Expr::Object(fields) => {
            let mut out = Vec::new();
            for v in &ctx.values {
                let vctx = ctx.with_value(v.clone());
                let mut obj = IndexMap::new();
                for field in fields {
                    let key = match &field.key {
                        ObjectKey::Literal(s) => s.clone(),
                        ObjectKey::Expr(e) => {
                            let keys = eval(e, &vctx)?;
                            match keys.into_iter().next() {
                                Some(Value::String(s)) => s,
                                Some(other) => {
                                    return Err(EvalError::lookup(format!(
                                        "object key must be a string, got {}",
                                        other.type_name()
                                    )));
                                }
                                None => continue,
                            }
                        }
                    };
                    let values = eval(&field.value, &vctx)?;
                    obj.insert(key, values.into_iter().next().unwrap_or(Value::Null));
                }
                out.push(Value::Object(obj));
            }
            Ok(out)
        }

        Expr::Array(inner) => {
            let Some(inner) = inner else {
                return Ok(vec![Value::Array(Vec::new()); ctx.values.len().max(1)]);
            };
            let mut out = Vec::new();
            for v in &ctx.values {
                let elements = eval(inner, &ctx.with_value(v.clone()))?;
                out.push(Value::Array(elements));
            }
            Ok(out)
        }

        Expr::Var(name) => match ctx.variable(name) {
            Some(v) => Ok(vec![v.clone()]),
            None => Err(EvalError::lookup(format!("undefined variable: ${}", name))),
        },

        Expr::Bind { expr, var, body } => {
            let mut out = Vec::new();
            for v in &ctx.values {
                let vctx = ctx.with_value(v.clone());
                for bound in eval(expr, &vctx)? {
                    let bctx = vctx.with_variable(var, bound);
                    out.extend(eval(body, &bctx)?);
                }
            }
            Ok(out)
        }

        Expr::BindPattern {
            expr,
            pattern,
            body,
        } => {
            let mut out = Vec::new();
            for v in &ctx.values {
                let vctx = ctx.with_value(v.clone());
                for bound in eval(expr, &vctx)? {
                    let obj = match &bound {
                        Value::Object(obj) => obj,
                        other => {
                            return Err(EvalError::lookup(format!(
                                "cannot destructure {}",
                                other.type_name()
                            )));
                        }
                    };
                    let mut bctx = vctx.clone();
                    for entry in &pattern.entries {
                        let value = obj.get(&entry.key).cloned().unwrap_or(Value::Null);
                        bctx = bctx.with_variable(&entry.var, value);
                    }
                    out.extend(eval(body, &bctx)?);
                }
            }
            Ok(out)
        }

        Expr::If {
            cond,
            then,
            otherwise,
        } => {
            let mut out = Vec::new();
            for v in &ctx.values {
                let vctx = ctx.with_value(v.clone());
                let conds = eval(cond, &vctx)?;
                let branch = if conds.first().is_some_and(Value::is_truthy) {
                    then
                } else {
                    otherwise
                };
                out.extend(eval(branch, &vctx)?);
            }
            Ok(out)
        }

        Expr::TryCatch { body, handler } => match eval(body, ctx) {
            Ok(values) => Ok(values),
            Err(err) => match handler {
                // The handler sees the failure message as its input.
                Some(h) => eval(h, &ctx.with_value(Value::String(err.message))),
                None => Ok(Vec::new()),
            },
        },

        Expr::Interp(parts) => {
            let mut out = Vec::new();
            for v in &ctx.values {
                let vctx = ctx.with_value(v.clone());
                let mut s = String::new();
                for part in parts {
                    match part {
                        InterpPart::Literal(text) => s.push_str(text),
                        InterpPart::Expr(e) => {
                            let values = eval(e, &vctx)?;
                            if let Some(first) = values.first() {
                                s.push_str(&first.to_display_string());
                            }
                        }
                    }
                }
                out.push(Value::String(s));
            }
            Ok(out)
        }

        Expr::Reduce {
            input,
            var,
            init,
            update,
        } => {
            let mut out = Vec::new();
            for v in &ctx.values {
                let vctx = ctx.with_value(v.clone());
                let Some(mut acc) = eval(init, &vctx)?.into_iter().next() else {
                    continue;
                };
                for item in eval(input, &vctx)? {
                    let uctx = vctx.with_value(acc.clone()).with_variable(var, item);
                    if let Some(next) = eval(update, &uctx)?.into_iter().next() {
                        acc = next;
                    }
                }
                out.push(acc);
            }
            Ok(out)
        }
    }
}

/// Evaluate the parent of a navigation node, or take the current values.
fn eval_from(from: &Option<Box<Expr>>, ctx: &Context) -> Result<Vec<Value>, EvalError> {
    match from {
        Some(expr) => eval(expr, ctx),
        None => Ok(ctx.values.clone()),
    }
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(n) => Value::Int(*n),
        Literal::Float(f) => Value::Float(*f),
        Literal::String(s) => Value::String(s.clone()),
    }
}

/// Field access: missing fields and null inputs yield null.
pub(crate) fn field_of(value: &Value, name: &str) -> Result<Value, EvalError> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Object(obj) => Ok(obj.get(name).cloned().unwrap_or(Value::Null)),
        other => Err(EvalError::cannot_index(other, &format!("\"{}\"", name))),
    }
}

/// Index access: out-of-range and null inputs yield null.
pub(crate) fn index_of(value: &Value, index: i64) -> Result<Value, EvalError> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Array(arr) => {
            let idx = if index < 0 {
                arr.len() as i64 + index
            } else {
                index
            };
            if idx < 0 || idx as usize >= arr.len() {
                Ok(Value::Null)
            } else {
                Ok(arr[idx as usize].clone())
            }
        }
        other => Err(EvalError::cannot_index(other, "number")),
    }
}

/// Resolve optional slice bounds against a length: negatives count from the
/// end, and the result satisfies `0 <= start <= end <= len`.
fn resolve_slice_bounds(start: Option<i64>, end: Option<i64>, len: usize) -> (usize, usize) {
    let resolve = |bound: i64| -> usize {
        let b = if bound < 0 { len as i64 + bound } else { bound };
        b.clamp(0, len as i64) as usize
    };
    let s = start.map(resolve).unwrap_or(0);
    let e = end.map(resolve).unwrap_or(len);
    (s, e.max(s))
}

fn floor_char_boundary(s: &str, mut i: usize) -> usize {
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn slice_of(value: &Value, start: Option<i64>, end: Option<i64>) -> Result<Value, EvalError> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Array(arr) => {
            let (s, e) = resolve_slice_bounds(start, end, arr.len());
            Ok(Value::Array(arr[s..e].to_vec()))
        }
        Value::String(text) => {
            // Byte-oriented bounds, nudged onto character boundaries.
            let (s, e) = resolve_slice_bounds(start, end, text.len());
            let s = floor_char_boundary(text, s);
            let e = floor_char_boundary(text, e).max(s);
            Ok(Value::String(text[s..e].to_string()))
        }
        other => Err(EvalError::lookup(format!(
            "cannot slice {}",
            other.type_name()
        ))),
    }
}

/// Iterate a container: list elements in order, mapping values in insertion
/// order. Null fails like any other non-iterable.
pub(crate) fn iterate_value(value: &Value) -> Result<Vec<Value>, EvalError> {
    match value {
        Value::Array(arr) => Ok(arr.clone()),
        Value::Object(obj) => Ok(obj.values().cloned().collect()),
        other => Err(EvalError::cannot_iterate(other)),
    }
}

fn dynamic_index(value: &Value, key: &Value) -> Result<Value, EvalError> {
    match key {
        Value::String(name) => field_of(value, name),
        Value::Int(_) | Value::Float(_) => index_of(value, key.as_i64().unwrap_or(0)),
        other => Err(EvalError::cannot_index(value, other.type_name())),
    }
}

/// Depth-first descendants: lists element-wise, mappings value-wise.
pub(crate) fn collect_descendants(value: &Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(arr) => {
            for elem in arr {
                out.push(elem.clone());
                collect_descendants(elem, out);
            }
        }
        Value::Object(obj) => {
            for elem in obj.values() {
                out.push(elem.clone());
                collect_descendants(elem, out);
            }
        }
        _ => {}
    }
}

fn eval_binary(
    op: BinOp,
    left: &Expr,
    right: &Expr,
    ctx: &Context,
) -> Result<Vec<Value>, EvalError> {
    // `and`/`or` short-circuit per left value and always return a boolean.
    if matches!(op, BinOp::And | BinOp::Or) {
        let lhs = eval(left, ctx)?;
        let mut rhs_cache: Option<Vec<Value>> = None;
        let mut out = Vec::new();
        for l in &lhs {
            let lt = l.is_truthy();
            if op == BinOp::And && !lt {
                out.push(Value::Bool(false));
                continue;
            }
            if op == BinOp::Or && lt {
                out.push(Value::Bool(true));
                continue;
            }
            if rhs_cache.is_none() {
                rhs_cache = Some(eval(right, ctx)?);
            }
            let Some(rhs) = rhs_cache.as_ref() else {
                continue;
            };
            for r in rhs {
                out.push(Value::Bool(r.is_truthy()));
            }
        }
        return Ok(out);
    }

    let lhs = eval(left, ctx)?;
    let rhs = eval(right, ctx)?;
    let mut out = Vec::with_capacity(lhs.len() * rhs.len());
    for l in &lhs {
        for r in &rhs {
            out.push(apply_binop(op, l, r)?);
        }
    }
    Ok(out)
}

fn apply_binop(op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match op {
        BinOp::Add => add_values(left, right),
        BinOp::Sub => sub_values(left, right),
        BinOp::Mul => mul_values(left, right),
        BinOp::Div => div_values(left, right),
        BinOp::Mod => mod_values(left, right),
        BinOp::Eq => Ok(Value::Bool(left == right)),
        BinOp::Ne => Ok(Value::Bool(left != right)),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            use core::cmp::Ordering;
            let ord = match (left, right) {
                (Value::String(a), Value::String(b)) => a.as_bytes().cmp(b.as_bytes()),
                _ => match (left.as_f64(), right.as_f64()) {
                    (Some(a), Some(b)) => {
                        a.partial_cmp(&b).unwrap_or(Ordering::Equal)
                    }
                    _ => {
                        return Err(EvalError::arithmetic(format!(
                            "cannot compare {} and {}",
                            left.type_name(),
                            right.type_name()
                        )));
                    }
                },
            };
            Ok(Value::Bool(match op {
                BinOp::Lt => ord == Ordering::Less,
                BinOp::Le => ord != Ordering::Greater,
                BinOp::Gt => ord == Ordering::Greater,
                _ => ord != Ordering::Less,
            }))
        }
        BinOp::And | BinOp::Or => unreachable!("handled in eval_binary"),
    }
}

/// `+`: numeric add, string concat, array concat, object union with the
/// right side overriding. Null is the additive identity on either side.
pub(crate) fn add_values(left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Null, x) => Ok(x.clone()),
        (x, Value::Null) => Ok(x.clone()),
        (Value::Int(a), Value::Int(b)) => Ok(a
            .checked_add(*b)
            .map(Value::Int)
            .unwrap_or(Value::Float(*a as f64 + *b as f64))),
        (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
        (Value::Array(a), Value::Array(b)) => {
            let mut out = a.clone();
            out.extend(b.iter().cloned());
            Ok(Value::Array(out))
        }
        (Value::Object(a), Value::Object(b)) => {
            let mut out = a.clone();
            for (k, v) in b {
                out.insert(k.clone(), v.clone());
            }
            Ok(Value::Object(out))
        }
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => Ok(Value::Float(a + b)),
            _ => Err(EvalError::arithmetic(format!(
                "cannot add {} and {}",
                left.type_name(),
                right.type_name()
            ))),
        },
    }
}

/// `-`: numeric subtract, or array difference (remove every element of the
/// right side from the left, keeping left order).
pub(crate) fn sub_values(left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(a
            .checked_sub(*b)
            .map(Value::Int)
            .unwrap_or(Value::Float(*a as f64 - *b as f64))),
        (Value::Array(a), Value::Array(b)) => Ok(Value::Array(
            a.iter()
                .filter(|x| !b.iter().any(|y| y == *x))
                .cloned()
                .collect(),
        )),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => Ok(Value::Float(a - b)),
            _ => Err(EvalError::arithmetic(format!(
                "cannot subtract {} from {}",
                right.type_name(),
                left.type_name()
            ))),
        },
    }
}

/// `*`: numeric multiply, string repetition, or recursive object merge.
pub(crate) fn mul_values(left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(a
            .checked_mul(*b)
            .map(Value::Int)
            .unwrap_or(Value::Float(*a as f64 * *b as f64))),
        (Value::String(s), n @ (Value::Int(_) | Value::Float(_))) => {
            let count = n.as_i64().unwrap_or(0);
            if count <= 0 {
                Ok(Value::String(String::new()))
            } else {
                Ok(Value::String(s.repeat(count as usize)))
            }
        }
        (Value::Object(a), Value::Object(b)) => Ok(Value::Object(deep_merge(a, b))),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => Ok(Value::Float(a * b)),
            _ => Err(EvalError::arithmetic(format!(
                "cannot multiply {} and {}",
                left.type_name(),
                right.type_name()
            ))),
        },
    }
}

/// Recursive object merge: sub-mappings merge, anything else on the right
/// overrides.
fn deep_merge(
    base: &IndexMap<String, Value>,
    overlay: &IndexMap<String, Value>,
) -> IndexMap<String, Value> {
    let mut out = base.clone();
    for (k, v) in overlay {
        match (out.get(k), v) {
            (Some(Value::Object(a)), Value::Object(b)) => {
                let merged = deep_merge(a, b);
                out.insert(k.clone(), Value::Object(merged));
            }
            _ => {
                out.insert(k.clone(), v.clone());
            }
        }
    }
    out
}

/// `/`: numeric divide. Division by zero fails. Integer division that comes
/// out even stays integral.
pub(crate) fn div_values(left: &Value, right: &Value) -> Result<Value, EvalError> {
    let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
        return Err(EvalError::arithmetic(format!(
            "cannot divide {} by {}",
            left.type_name(),
            right.type_name()
        )));
    };
    if b == 0.0 {
        return Err(EvalError::arithmetic("division by zero"));
    }
    if let (Value::Int(x), Value::Int(y)) = (left, right) {
        if x.checked_rem(*y) == Some(0) {
            if let Some(q) = x.checked_div(*y) {
                return Ok(Value::Int(q));
            }
        }
    }
    Ok(Value::Float(a / b))
}

/// `%`: integer remainder of the operands truncated to 64-bit integers.
pub(crate) fn mod_values(left: &Value, right: &Value) -> Result<Value, EvalError> {
    let (Some(a), Some(b)) = (left.as_i64(), right.as_i64()) else {
        return Err(EvalError::arithmetic(format!(
            "cannot compute {} % {}",
            left.type_name(),
            right.type_name()
        )));
    };
    if b == 0 {
        return Err(EvalError::arithmetic("modulo by zero"));
    }
    Ok(Value::Int(a.checked_rem(b).unwrap_or(0)))
}

fn eval_unary(op: UnaryOp, expr: &Expr, ctx: &Context) -> Result<Vec<Value>, EvalError> {
    let values = eval(expr, ctx)?;
    values
        .into_iter()
        .map(|v| match op {
            UnaryOp::Not => Ok(Value::Bool(!v.is_truthy())),
            UnaryOp::Neg => match v {
                Value::Int(n) => Ok(n
                    .checked_neg()
                    .map(Value::Int)
                    .unwrap_or(Value::Float(-(n as f64)))),
                Value::Float(f) => Ok(Value::Float(-f)),
                other => Err(EvalError::arithmetic(format!(
                    "cannot negate {}",
                    other.type_name()
                ))),
            },
        })
        .collect()
}

/// The assignment family. The left side is resolved to the concrete paths it
/// denotes in each current value; writes go path by path and produce a fresh
/// root, never touching the original.
fn eval_assign(
    path_expr: &Expr,
    op: AssignOp,
    value_expr: &Expr,
    ctx: &Context,
) -> Result<Vec<Value>, EvalError> {
    let mut out = Vec::new();

    for v in &ctx.values {
        let vctx = ctx.with_value(v.clone());
        let paths = path::resolve_paths(path_expr, &vctx, v)?;
        let mut modified = v.clone();

        match op {
            AssignOp::Set => {
                let Some(rhs) = eval(value_expr, &vctx)?.into_iter().next() else {
                    continue;
                };
                for p in &paths {
                    modified = path::set_path(&modified, p, rhs.clone())?;
                }
            }
            AssignOp::Update => {
                for p in &paths {
                    let current = path::get_path(&modified, p);
                    let result = eval(value_expr, &vctx.with_value(current))?;
                    if let Some(next) = result.into_iter().next() {
                        modified = path::set_path(&modified, p, next)?;
                    }
                }
            }
            AssignOp::Add | AssignOp::Sub | AssignOp::Mul | AssignOp::Alternative => {
                let Some(rhs) = eval(value_expr, &vctx)?.into_iter().next() else {
                    continue;
                };
                for p in &paths {
                    let current = path::get_path(&modified, p);
                    let next = match op {
                        AssignOp::Add => add_values(&current, &rhs)?,
                        AssignOp::Sub => sub_values(&current, &rhs)?,
                        AssignOp::Mul => mul_values(&current, &rhs)?,
                        AssignOp::Alternative => {
                            if current.is_truthy() {
                                current.clone()
                            } else {
                                rhs.clone()
                            }
                        }
                        _ => unreachable!(),
                    };
                    modified = path::set_path(&modified, p, next)?;
                }
            }
        }

        out.push(modified);
    }

    Ok(out)
}
