//! Paths and structural update.
//!
//! A path is an ordered list of field names and list indices identifying a
//! position inside a value; the empty path is the root. Paths travel as
//! ordinary values (a list of strings and integers), so `path`, `getpath`,
//! `setpath` and `delpaths` round-trip through the data model.
//!
//! Everything here builds fresh values: a write copies the spine from the
//! root down to the updated slot and leaves the original untouched.

use super::eval::{self, Context, EvalError};
use super::expr::Expr;
use super::value::Value;

/// One step of a path: a mapping field or a list index.
#[derive(Debug, Clone, PartialEq)]
pub enum PathElem {
    Key(String),
    Index(i64),
}

/// Render a path as the Value it is exchanged as: a list of strings and
/// integers.
pub fn path_to_value(path: &[PathElem]) -> Value {
    Value::Array(
        path.iter()
            .map(|elem| match elem {
                PathElem::Key(k) => Value::String(k.clone()),
                PathElem::Index(i) => Value::Int(*i),
            })
            .collect(),
    )
}

/// Read a path back out of a Value. Only string and integer entries are
/// legal path elements.
pub fn value_to_path(value: &Value) -> Result<Vec<PathElem>, EvalError> {
    let Value::Array(entries) = value else {
        return Err(EvalError::path(format!(
            "path must be an array, got {}",
            value.type_name()
        )));
    };
    entries
        .iter()
        .map(|entry| match entry {
            Value::String(s) => Ok(PathElem::Key(s.clone())),
            Value::Int(n) => Ok(PathElem::Index(*n)),
            Value::Float(f) if *f == f.trunc() => Ok(PathElem::Index(*f as i64)),
            other => Err(EvalError::path(format!(
                "invalid path element: {}",
                other.type_name()
            ))),
        })
        .collect()
}

/// Resolve a navigation expression to the concrete paths it denotes inside
/// `root`. Iterator segments fan out to every element of the container they
/// cross; optional segments swallow resolution failures. Anything that is
/// not a pure navigation is a path error.
pub fn resolve_paths(
    expr: &Expr,
    ctx: &Context,
    root: &Value,
) -> Result<Vec<Vec<PathElem>>, EvalError> {
    match expr {
        Expr::Identity => Ok(vec![Vec::new()]),

        Expr::Field { name, from } => {
            let mut paths = resolve_from(from, ctx, root)?;
            for p in &mut paths {
                p.push(PathElem::Key(name.clone()));
            }
            Ok(paths)
        }

        Expr::Index { index, from } => {
            let mut paths = resolve_from(from, ctx, root)?;
            for p in &mut paths {
                p.push(PathElem::Index(*index));
            }
            Ok(paths)
        }

        Expr::DynamicIndex { key, from } => {
            let bases = resolve_from(from, ctx, root)?;
            let mut out = Vec::new();
            for base in bases {
                let current = get_path(root, &base);
                let keys = eval::eval(key, &ctx.with_value(current))?;
                for k in keys {
                    let elem = match k {
                        Value::String(s) => PathElem::Key(s),
                        Value::Int(n) => PathElem::Index(n),
                        Value::Float(f) if f == f.trunc() => PathElem::Index(f as i64),
                        other => {
                            return Err(EvalError::path(format!(
                                "invalid path key: {}",
                                other.type_name()
                            )));
                        }
                    };
                    let mut p = base.clone();
                    p.push(elem);
                    out.push(p);
                }
            }
            Ok(out)
        }

        Expr::Iterate { from } => {
            let bases = resolve_from(from, ctx, root)?;
            let mut out = Vec::new();
            for base in bases {
                match get_path(root, &base) {
                    Value::Array(arr) => {
                        for i in 0..arr.len() {
                            let mut p = base.clone();
                            p.push(PathElem::Index(i as i64));
                            out.push(p);
                        }
                    }
                    Value::Object(obj) => {
                        for k in obj.keys() {
                            let mut p = base.clone();
                            p.push(PathElem::Key(k.clone()));
                            out.push(p);
                        }
                    }
                    // A missing container fans out to nothing.
                    _ => {}
                }
            }
            Ok(out)
        }

        Expr::Optional(inner) => match resolve_paths(inner, ctx, root) {
            Ok(paths) => Ok(paths),
            Err(_) => Ok(Vec::new()),
        },

        Expr::RecursiveDescent { .. } | Expr::Slice { .. } => Err(EvalError::path(format!(
            "unsupported path expression: {} is not a field or index navigation",
            expr_kind(expr)
        ))),

        _ => Err(EvalError::path(format!(
            "invalid path expression: {} is not a navigation",
            expr_kind(expr)
        ))),
    }
}

fn resolve_from(
    from: &Option<Box<Expr>>,
    ctx: &Context,
    root: &Value,
) -> Result<Vec<Vec<PathElem>>, EvalError> {
    match from {
        Some(expr) => resolve_paths(expr, ctx, root),
        None => Ok(vec![Vec::new()]),
    }
}

fn expr_kind(expr: &Expr) -> &'static str {
    match expr {
        Expr::Identity => "identity",
        Expr::Literal(_) => "literal",
        Expr::Field { .. } => "field access",
        Expr::Index { .. } => "index access",
        Expr::Slice { .. } => "slice",
        Expr::Iterate { .. } => "iteration",
        Expr::DynamicIndex { .. } => "index access",
        Expr::RecursiveDescent { .. } => "recursive descent",
        Expr::Optional(_) => "optional",
        Expr::Pipe { .. } => "pipe",
        Expr::Comma(_) => "comma",
        Expr::Binary { .. } => "operator",
        Expr::Unary { .. } => "operator",
        Expr::Alternative { .. } => "alternative",
        Expr::Assign { .. } => "assignment",
        Expr::Call { .. } => "function call",
        Expr::Object(_) => "object construction",
        Expr::Array(_) => "array construction",
        Expr::Var(_) => "variable",
        Expr::Bind { .. } | Expr::BindPattern { .. } => "binding",
        Expr::If { .. } => "conditional",
        Expr::TryCatch { .. } => "try",
        Expr::Interp(_) => "string interpolation",
        Expr::Reduce { .. } => "reduce",
    }
}

/// Read the value at a path. Missing links and type mismatches yield null.
pub fn get_path(root: &Value, path: &[PathElem]) -> Value {
    let mut current = root;
    for elem in path {
        match (elem, current) {
            (PathElem::Key(k), Value::Object(obj)) => match obj.get(k.as_str()) {
                Some(v) => current = v,
                None => return Value::Null,
            },
            (PathElem::Index(i), Value::Array(arr)) => {
                let idx = if *i < 0 { arr.len() as i64 + i } else { *i };
                if idx < 0 || idx as usize >= arr.len() {
                    return Value::Null;
                }
                current = &arr[idx as usize];
            }
            _ => return Value::Null,
        }
    }
    current.clone()
}

/// Write a value at a path, producing a fresh root. Missing mappings are
/// created along the way; missing list slots are padded with null. A scalar
/// standing where a container is needed is replaced by a fresh container.
pub fn set_path(root: &Value, path: &[PathElem], new_value: Value) -> Result<Value, EvalError> {
    let Some((elem, rest)) = path.split_first() else {
        return Ok(new_value);
    };

    match elem {
        PathElem::Key(k) => {
            let mut obj = match root {
                Value::Object(obj) => obj.clone(),
                _ => indexmap::IndexMap::new(),
            };
            let child = obj.get(k.as_str()).cloned().unwrap_or(Value::Null);
            let updated = set_path(&child, rest, new_value)?;
            obj.insert(k.clone(), updated);
            Ok(Value::Object(obj))
        }
        PathElem::Index(i) => {
            let mut arr = match root {
                Value::Array(arr) => arr.clone(),
                _ => Vec::new(),
            };
            let idx = if *i < 0 { arr.len() as i64 + i } else { *i };
            if idx < 0 {
                return Err(EvalError::path(format!(
                    "index {} out of range for assignment",
                    i
                )));
            }
            let idx = idx as usize;
            while arr.len() <= idx {
                arr.push(Value::Null);
            }
            let updated = set_path(&arr[idx], rest, new_value)?;
            arr[idx] = updated;
            Ok(Value::Array(arr))
        }
    }
}

/// Erase the entry at a path, producing a fresh root. Non-existent paths are
/// no-ops. Deleting a list index shifts later elements left.
pub fn delete_path(root: &Value, path: &[PathElem]) -> Value {
    let Some((elem, rest)) = path.split_first() else {
        return Value::Null;
    };

    if rest.is_empty() {
        return match (elem, root) {
            (PathElem::Key(k), Value::Object(obj)) => {
                let mut out = obj.clone();
                out.shift_remove(k.as_str());
                Value::Object(out)
            }
            (PathElem::Index(i), Value::Array(arr)) => {
                let idx = if *i < 0 { arr.len() as i64 + i } else { *i };
                if idx < 0 || idx as usize >= arr.len() {
                    return root.clone();
                }
                let mut out = arr.clone();
                out.remove(idx as usize);
                Value::Array(out)
            }
            _ => root.clone(),
        };
    }

    match (elem, root) {
        (PathElem::Key(k), Value::Object(obj)) => match obj.get(k.as_str()) {
            Some(child) => {
                let mut out = obj.clone();
                let updated = delete_path(child, rest);
                out.insert(k.clone(), updated);
                Value::Object(out)
            }
            None => root.clone(),
        },
        (PathElem::Index(i), Value::Array(arr)) => {
            let idx = if *i < 0 { arr.len() as i64 + i } else { *i };
            if idx < 0 || idx as usize >= arr.len() {
                return root.clone();
            }
            let mut out = arr.clone();
            out[idx as usize] = delete_path(&arr[idx as usize], rest);
            Value::Array(out)
        }
        _ => root.clone(),
    }
}

/// Every non-root path in a value, depth-first: each position is listed
/// before its descendants, lists by ascending index, mappings in insertion
/// order.
pub fn collect_paths(value: &Value) -> Vec<Vec<PathElem>> {
    let mut out = Vec::new();
    collect_paths_into(value, &mut Vec::new(), &mut out);
    out
}

fn collect_paths_into(
    value: &Value,
    prefix: &mut Vec<PathElem>,
    out: &mut Vec<Vec<PathElem>>,
) {
    match value {
        Value::Array(arr) => {
            for (i, elem) in arr.iter().enumerate() {
                prefix.push(PathElem::Index(i as i64));
                out.push(prefix.clone());
                collect_paths_into(elem, prefix, out);
                prefix.pop();
            }
        }
        Value::Object(obj) => {
            for (k, elem) in obj {
                prefix.push(PathElem::Key(k.clone()));
                out.push(prefix.clone());
                collect_paths_into(elem, prefix, out);
                prefix.pop();
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(pairs: Vec<(&str, Value)>) -> Value {
        Value::object(pairs.into_iter().map(|(k, v)| (k.to_string(), v)))
    }

    #[test]
    fn test_get_path() {
        let root = obj(vec![(
            "a",
            Value::from(vec![Value::Int(1), Value::Int(2)]),
        )]);
        let path = vec![PathElem::Key("a".into()), PathElem::Index(1)];
        assert_eq!(get_path(&root, &path), Value::Int(2));
        assert_eq!(
            get_path(&root, &[PathElem::Key("missing".into())]),
            Value::Null
        );
        assert_eq!(
            get_path(&root, &[PathElem::Key("a".into()), PathElem::Index(-1)]),
            Value::Int(2)
        );
    }

    #[test]
    fn test_set_path_creates_intermediates() {
        let root = Value::Null;
        let path = vec![PathElem::Key("a".into()), PathElem::Key("b".into())];
        let out = set_path(&root, &path, Value::Int(1)).unwrap();
        assert_eq!(out, obj(vec![("a", obj(vec![("b", Value::Int(1))]))]));
    }

    #[test]
    fn test_set_path_extends_array_with_nulls() {
        let root = Value::Array(vec![]);
        let out = set_path(&root, &[PathElem::Index(2)], Value::Int(9)).unwrap();
        assert_eq!(
            out,
            Value::from(vec![Value::Null, Value::Null, Value::Int(9)])
        );
    }

    #[test]
    fn test_set_path_does_not_touch_original() {
        let root = obj(vec![("a", Value::Int(1))]);
        let snapshot = root.clone();
        let _ = set_path(&root, &[PathElem::Key("a".into())], Value::Int(2)).unwrap();
        assert_eq!(root, snapshot);
    }

    #[test]
    fn test_delete_path_shifts_array() {
        let root = Value::from(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        let out = delete_path(&root, &[PathElem::Index(1)]);
        assert_eq!(out, Value::from(vec![Value::Int(1), Value::Int(3)]));
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let root = obj(vec![("a", Value::Int(1))]);
        let out = delete_path(&root, &[PathElem::Key("zzz".into())]);
        assert_eq!(out, root);
    }

    #[test]
    fn test_collect_paths_order() {
        let root = obj(vec![
            ("a", Value::from(vec![Value::Int(1)])),
            ("b", Value::Int(2)),
        ]);
        let paths = collect_paths(&root);
        assert_eq!(
            paths,
            vec![
                vec![PathElem::Key("a".into())],
                vec![PathElem::Key("a".into()), PathElem::Index(0)],
                vec![PathElem::Key("b".into())],
            ]
        );
    }

    #[test]
    fn test_value_round_trip() {
        let path = vec![PathElem::Key("user".into()), PathElem::Index(0)];
        let as_value = path_to_value(&path);
        assert_eq!(value_to_path(&as_value).unwrap(), path);
        assert!(value_to_path(&Value::Int(1)).is_err());
        assert!(value_to_path(&Value::from(vec![Value::Bool(true)])).is_err());
    }
}
