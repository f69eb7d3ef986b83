//! The built-in function library.
//!
//! Each builtin operates on every current value of the context in turn, the
//! way the pipe operator hands values along. Scalar arguments (patterns,
//! delimiters, counts) are evaluated once against the calling context and
//! take their first value; filter arguments (`select`, `map`, `sort_by`,
//! ...) are re-evaluated per element.

use indexmap::IndexMap;
use regex::Regex;

use super::eval::{add_values, eval as eval_expr, Context, EvalError};
use super::expr::Expr;
use super::path::{self, PathElem};
use super::value::Value;

/// Dispatch a function call by name.
pub(crate) fn call(name: &str, args: &[Expr], ctx: &Context) -> Result<Vec<Value>, EvalError> {
    match name {
        "empty" => Ok(Vec::new()),
        "not" => {
            expect_args(name, args, 0)?;
            Ok(ctx
                .values
                .iter()
                .map(|v| Value::Bool(!v.is_truthy()))
                .collect())
        }
        "error" => eval_error(args, ctx),

        "length" => {
            expect_args(name, args, 0)?;
            ctx.values.iter().map(length_of).collect()
        }
        "type" => {
            expect_args(name, args, 0)?;
            Ok(ctx
                .values
                .iter()
                .map(|v| Value::String(v.type_name().into()))
                .collect())
        }
        "keys" => {
            expect_args(name, args, 0)?;
            ctx.values.iter().map(|v| keys_of(v, true)).collect()
        }
        "keys_unsorted" => {
            expect_args(name, args, 0)?;
            ctx.values.iter().map(|v| keys_of(v, false)).collect()
        }
        "values" => {
            expect_args(name, args, 0)?;
            ctx.values
                .iter()
                .map(|v| match v {
                    Value::Object(obj) => Ok(Value::Array(obj.values().cloned().collect())),
                    Value::Array(arr) => Ok(Value::Array(arr.clone())),
                    other => Err(EvalError::lookup(format!(
                        "{} has no values",
                        other.type_name()
                    ))),
                })
                .collect()
        }
        "has" => {
            expect_args(name, args, 1)?;
            let key = arg_value(&args[0], ctx)?;
            ctx.values.iter().map(|v| has_key(v, &key)).collect()
        }
        "contains" => {
            expect_args(name, args, 1)?;
            let needle = arg_value(&args[0], ctx)?;
            Ok(ctx
                .values
                .iter()
                .map(|v| Value::Bool(deep_contains(v, &needle)))
                .collect())
        }
        "inside" => {
            expect_args(name, args, 1)?;
            let container = arg_value(&args[0], ctx)?;
            Ok(ctx
                .values
                .iter()
                .map(|v| Value::Bool(deep_contains(&container, v)))
                .collect())
        }

        "select" => {
            expect_args(name, args, 1)?;
            let mut out = Vec::new();
            for v in &ctx.values {
                let cond = eval_expr(&args[0], &ctx.with_value(v.clone()))?;
                if cond.first().is_some_and(Value::is_truthy) {
                    out.push(v.clone());
                }
            }
            Ok(out)
        }
        "map" => {
            expect_args(name, args, 1)?;
            let mut out = Vec::new();
            for v in &ctx.values {
                let arr = expect_array(name, v)?;
                let mut mapped = Vec::with_capacity(arr.len());
                for elem in arr {
                    mapped.extend(eval_expr(&args[0], &ctx.with_value(elem.clone()))?);
                }
                out.push(Value::Array(mapped));
            }
            Ok(out)
        }
        "map_values" => {
            expect_args(name, args, 1)?;
            let mut out = Vec::new();
            for v in &ctx.values {
                let Value::Object(obj) = v else {
                    return Err(EvalError::lookup(format!(
                        "map_values requires object input, got {}",
                        v.type_name()
                    )));
                };
                let mut mapped = IndexMap::new();
                for (k, elem) in obj {
                    let results = eval_expr(&args[0], &ctx.with_value(elem.clone()))?;
                    if let Some(first) = results.into_iter().next() {
                        mapped.insert(k.clone(), first);
                    }
                }
                out.push(Value::Object(mapped));
            }
            Ok(out)
        }

        "add" => {
            expect_args(name, args, 0)?;
            let mut out = Vec::new();
            for v in &ctx.values {
                let arr = expect_array(name, v)?;
                let mut acc = Value::Null;
                for elem in arr {
                    acc = add_values(&acc, elem)?;
                }
                out.push(acc);
            }
            Ok(out)
        }
        "first" => eval_first_last(name, args, ctx, true),
        "last" => eval_first_last(name, args, ctx, false),
        "reverse" => {
            expect_args(name, args, 0)?;
            ctx.values
                .iter()
                .map(|v| {
                    let arr = expect_array(name, v)?;
                    Ok(Value::Array(arr.iter().rev().cloned().collect()))
                })
                .collect()
        }
        "sort" => {
            expect_args(name, args, 0)?;
            ctx.values
                .iter()
                .map(|v| {
                    let mut arr = expect_array(name, v)?.clone();
                    arr.sort_by(|a, b| a.cmp_order(b));
                    Ok(Value::Array(arr))
                })
                .collect()
        }
        "sort_by" => {
            expect_args(name, args, 1)?;
            let mut out = Vec::new();
            for v in &ctx.values {
                let arr = expect_array(name, v)?;
                let mut keyed = Vec::with_capacity(arr.len());
                for elem in arr {
                    keyed.push((key_for(&args[0], elem, ctx)?, elem.clone()));
                }
                keyed.sort_by(|a, b| a.0.cmp_order(&b.0));
                out.push(Value::Array(keyed.into_iter().map(|(_, e)| e).collect()));
            }
            Ok(out)
        }
        "unique" => {
            expect_args(name, args, 0)?;
            ctx.values
                .iter()
                .map(|v| {
                    let arr = expect_array(name, v)?;
                    let mut seen: Vec<Value> = Vec::new();
                    for elem in arr {
                        if !seen.contains(elem) {
                            seen.push(elem.clone());
                        }
                    }
                    Ok(Value::Array(seen))
                })
                .collect()
        }
        "unique_by" => {
            expect_args(name, args, 1)?;
            let mut out = Vec::new();
            for v in &ctx.values {
                let arr = expect_array(name, v)?;
                let mut seen_keys: Vec<Value> = Vec::new();
                let mut kept = Vec::new();
                for elem in arr {
                    let key = key_for(&args[0], elem, ctx)?;
                    if !seen_keys.contains(&key) {
                        seen_keys.push(key);
                        kept.push(elem.clone());
                    }
                }
                out.push(Value::Array(kept));
            }
            Ok(out)
        }
        "group_by" => {
            expect_args(name, args, 1)?;
            let mut out = Vec::new();
            for v in &ctx.values {
                let arr = expect_array(name, v)?;
                // Groups keep the order their key was first seen in, and
                // members keep input order.
                let mut groups: Vec<(Value, Vec<Value>)> = Vec::new();
                for elem in arr {
                    let key = key_for(&args[0], elem, ctx)?;
                    match groups.iter_mut().find(|(k, _)| *k == key) {
                        Some((_, members)) => members.push(elem.clone()),
                        None => groups.push((key, vec![elem.clone()])),
                    }
                }
                out.push(Value::Array(
                    groups.into_iter().map(|(_, g)| Value::Array(g)).collect(),
                ));
            }
            Ok(out)
        }
        "flatten" => {
            if args.len() > 1 {
                return Err(EvalError::lookup("flatten expects at most 1 argument"));
            }
            let depth = match args.first() {
                Some(arg) => arg_value(arg, ctx)?.as_i64().unwrap_or(1).max(0),
                None => 1,
            };
            ctx.values
                .iter()
                .map(|v| {
                    let arr = expect_array(name, v)?;
                    Ok(Value::Array(flatten_array(arr, depth)))
                })
                .collect()
        }
        "min" => eval_min_max(name, args, ctx, true),
        "max" => eval_min_max(name, args, ctx, false),
        "min_by" => eval_min_max_by(name, args, ctx, true),
        "max_by" => eval_min_max_by(name, args, ctx, false),

        "to_entries" => {
            expect_args(name, args, 0)?;
            ctx.values.iter().map(to_entries).collect()
        }
        "from_entries" => {
            expect_args(name, args, 0)?;
            ctx.values.iter().map(from_entries).collect()
        }
        "with_entries" => {
            expect_args(name, args, 1)?;
            let mut out = Vec::new();
            for v in &ctx.values {
                let entries = to_entries(v)?;
                let Value::Array(entries) = entries else {
                    unreachable!()
                };
                let mut transformed = Vec::with_capacity(entries.len());
                for entry in entries {
                    transformed.extend(eval_expr(&args[0], &ctx.with_value(entry))?);
                }
                out.push(from_entries(&Value::Array(transformed))?);
            }
            Ok(out)
        }

        "split" => {
            expect_args(name, args, 1)?;
            let sep = arg_string(name, &args[0], ctx)?;
            ctx.values
                .iter()
                .map(|v| {
                    let s = expect_string(name, v)?;
                    let parts: Vec<Value> = if sep.is_empty() {
                        s.chars().map(|c| Value::String(c.to_string())).collect()
                    } else {
                        s.split(&sep).map(Value::string).collect()
                    };
                    Ok(Value::Array(parts))
                })
                .collect()
        }
        "join" => {
            expect_args(name, args, 1)?;
            let sep = arg_string(name, &args[0], ctx)?;
            ctx.values
                .iter()
                .map(|v| {
                    let arr = expect_array(name, v)?;
                    let parts: Vec<String> = arr
                        .iter()
                        .map(|elem| match elem {
                            Value::Null => String::new(),
                            other => other.to_display_string(),
                        })
                        .collect();
                    Ok(Value::String(parts.join(&sep)))
                })
                .collect()
        }
        "ascii_downcase" => {
            expect_args(name, args, 0)?;
            ctx.values
                .iter()
                .map(|v| Ok(Value::String(expect_string(name, v)?.to_ascii_lowercase())))
                .collect()
        }
        "ascii_upcase" => {
            expect_args(name, args, 0)?;
            ctx.values
                .iter()
                .map(|v| Ok(Value::String(expect_string(name, v)?.to_ascii_uppercase())))
                .collect()
        }
        "startswith" => {
            expect_args(name, args, 1)?;
            let prefix = arg_string(name, &args[0], ctx)?;
            ctx.values
                .iter()
                .map(|v| Ok(Value::Bool(expect_string(name, v)?.starts_with(&prefix))))
                .collect()
        }
        "endswith" => {
            expect_args(name, args, 1)?;
            let suffix = arg_string(name, &args[0], ctx)?;
            ctx.values
                .iter()
                .map(|v| Ok(Value::Bool(expect_string(name, v)?.ends_with(&suffix))))
                .collect()
        }
        "ltrimstr" => {
            expect_args(name, args, 1)?;
            let prefix = arg_string(name, &args[0], ctx)?;
            ctx.values
                .iter()
                .map(|v| {
                    let s = expect_string(name, v)?;
                    Ok(Value::string(s.strip_prefix(&prefix).unwrap_or(s)))
                })
                .collect()
        }
        "rtrimstr" => {
            expect_args(name, args, 1)?;
            let suffix = arg_string(name, &args[0], ctx)?;
            ctx.values
                .iter()
                .map(|v| {
                    let s = expect_string(name, v)?;
                    Ok(Value::string(s.strip_suffix(&suffix).unwrap_or(s)))
                })
                .collect()
        }
        "trim" => {
            expect_args(name, args, 0)?;
            ctx.values
                .iter()
                .map(|v| Ok(Value::string(expect_string(name, v)?.trim())))
                .collect()
        }
        "tostring" => {
            expect_args(name, args, 0)?;
            Ok(ctx
                .values
                .iter()
                .map(|v| Value::String(v.to_display_string()))
                .collect())
        }
        "tonumber" => {
            expect_args(name, args, 0)?;
            ctx.values
                .iter()
                .map(|v| match v {
                    Value::Int(_) | Value::Float(_) => Ok(v.clone()),
                    Value::String(s) => {
                        let text = s.trim();
                        if let Ok(n) = text.parse::<i64>() {
                            Ok(Value::Int(n))
                        } else {
                            text.parse::<f64>().map(Value::Float).map_err(|_| {
                                EvalError::arithmetic(format!(
                                    "cannot convert \"{}\" to number",
                                    s
                                ))
                            })
                        }
                    }
                    other => Err(EvalError::arithmetic(format!(
                        "cannot convert {} to number",
                        other.type_name()
                    ))),
                })
                .collect()
        }

        "test" => {
            expect_args(name, args, 1)?;
            let re = arg_regex(name, &args[0], ctx)?;
            ctx.values
                .iter()
                .map(|v| Ok(Value::Bool(re.is_match(expect_string(name, v)?))))
                .collect()
        }
        "match" => eval_match(args, ctx),
        "capture" => eval_capture(args, ctx),
        "sub" => eval_sub(name, args, ctx, false),
        "gsub" => eval_sub(name, args, ctx, true),

        "nulls" => type_filter(args, ctx, |v| v.is_null()),
        "booleans" => type_filter(args, ctx, |v| matches!(v, Value::Bool(_))),
        "numbers" => type_filter(args, ctx, |v| {
            matches!(v, Value::Int(_) | Value::Float(_))
        }),
        "strings" => type_filter(args, ctx, |v| matches!(v, Value::String(_))),
        "arrays" => type_filter(args, ctx, |v| matches!(v, Value::Array(_))),
        "objects" => type_filter(args, ctx, |v| matches!(v, Value::Object(_))),
        "scalars" => type_filter(args, ctx, |v| {
            !matches!(v, Value::Array(_) | Value::Object(_))
        }),
        "iterables" => type_filter(args, ctx, |v| {
            matches!(v, Value::Array(_) | Value::Object(_))
        }),

        "del" => eval_del(args, ctx),
        "path" => {
            expect_args(name, args, 1)?;
            let mut out = Vec::new();
            for v in &ctx.values {
                let paths = path::resolve_paths(&args[0], &ctx.with_value(v.clone()), v)?;
                out.extend(paths.iter().map(|p| path::path_to_value(p)));
            }
            Ok(out)
        }
        "paths" => eval_paths(args, ctx),
        "getpath" => {
            expect_args(name, args, 1)?;
            let mut out = Vec::new();
            for v in &ctx.values {
                let p = arg_value(&args[0], &ctx.with_value(v.clone()))?;
                let p = path::value_to_path(&p)?;
                out.push(path::get_path(v, &p));
            }
            Ok(out)
        }
        "setpath" => {
            expect_args(name, args, 2)?;
            let mut out = Vec::new();
            for v in &ctx.values {
                let vctx = ctx.with_value(v.clone());
                let p = path::value_to_path(&arg_value(&args[0], &vctx)?)?;
                let new_value = arg_value(&args[1], &vctx)?;
                out.push(path::set_path(v, &p, new_value)?);
            }
            Ok(out)
        }
        "delpaths" => {
            expect_args(name, args, 1)?;
            let mut out = Vec::new();
            for v in &ctx.values {
                let list = arg_value(&args[0], &ctx.with_value(v.clone()))?;
                let Value::Array(entries) = list else {
                    return Err(EvalError::path(format!(
                        "delpaths expects an array of paths, got {}",
                        list.type_name()
                    )));
                };
                let mut paths: Vec<Vec<PathElem>> = entries
                    .iter()
                    .map(path::value_to_path)
                    .collect::<Result<_, _>>()?;
                // Deepest-and-rightmost first, so removing a list entry
                // never shifts an index a later deletion still needs.
                paths.sort_by(|a, b| path::path_to_value(a).cmp_order(&path::path_to_value(b)));
                let mut modified = v.clone();
                for p in paths.iter().rev() {
                    modified = path::delete_path(&modified, p);
                }
                out.push(modified);
            }
            Ok(out)
        }

        _ => Err(EvalError::lookup(format!("unknown function: {}", name))),
    }
}

fn expect_args(name: &str, args: &[Expr], count: usize) -> Result<(), EvalError> {
    if args.len() != count {
        let plural = if count == 1 { "" } else { "s" };
        return Err(EvalError::lookup(format!(
            "{} expects {} argument{}",
            name, count, plural
        )));
    }
    Ok(())
}

/// Evaluate an argument expression and take its first value.
fn arg_value(arg: &Expr, ctx: &Context) -> Result<Value, EvalError> {
    eval_expr(arg, ctx)?
        .into_iter()
        .next()
        .ok_or_else(|| EvalError::lookup("argument produced no value"))
}

fn arg_string(name: &str, arg: &Expr, ctx: &Context) -> Result<String, EvalError> {
    match arg_value(arg, ctx)? {
        Value::String(s) => Ok(s),
        other => Err(EvalError::lookup(format!(
            "{}: argument must be a string, got {}",
            name,
            other.type_name()
        ))),
    }
}

fn arg_regex(name: &str, arg: &Expr, ctx: &Context) -> Result<Regex, EvalError> {
    let pattern = arg_string(name, arg, ctx)?;
    Regex::new(&pattern)
        .map_err(|e| EvalError::regex(format!("{}: invalid regex: {}", name, e)))
}

fn expect_array<'a>(name: &str, value: &'a Value) -> Result<&'a Vec<Value>, EvalError> {
    value.as_array().ok_or_else(|| {
        EvalError::lookup(format!(
            "{} requires array input, got {}",
            name,
            value.type_name()
        ))
    })
}

fn expect_string<'a>(name: &str, value: &'a Value) -> Result<&'a str, EvalError> {
    value.as_str().ok_or_else(|| {
        EvalError::lookup(format!(
            "{}: input must be a string, got {}",
            name,
            value.type_name()
        ))
    })
}

/// Evaluate a filter argument against one element, taking the first value.
fn key_for(filter: &Expr, elem: &Value, ctx: &Context) -> Result<Value, EvalError> {
    Ok(eval_expr(filter, &ctx.with_value(elem.clone()))?
        .into_iter()
        .next()
        .unwrap_or(Value::Null))
}

fn eval_error(args: &[Expr], ctx: &Context) -> Result<Vec<Value>, EvalError> {
    let message = match args {
        [] => match ctx.values.first() {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_json(),
            None => "error".to_string(),
        },
        [arg] => match arg_value(arg, ctx)? {
            Value::String(s) => s,
            other => other.to_json(),
        },
        _ => return Err(EvalError::lookup("error expects 0 or 1 argument")),
    };
    Err(EvalError::user(message))
}

/// `length`: container and string lengths, `null` stays null, numbers give
/// their absolute value. String length is measured in bytes.
fn length_of(value: &Value) -> Result<Value, EvalError> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Int(n) => Ok(Value::Int(n.abs())),
        Value::Float(f) => Ok(Value::Float(f.abs())),
        Value::String(s) => Ok(Value::Int(s.len() as i64)),
        Value::Array(arr) => Ok(Value::Int(arr.len() as i64)),
        Value::Object(obj) => Ok(Value::Int(obj.len() as i64)),
        Value::Bool(_) => Err(EvalError::lookup("boolean has no length")),
    }
}

fn keys_of(value: &Value, sorted: bool) -> Result<Value, EvalError> {
    match value {
        Value::Object(obj) => {
            let mut keys: Vec<String> = obj.keys().cloned().collect();
            if sorted {
                keys.sort();
            }
            Ok(Value::Array(keys.into_iter().map(Value::String).collect()))
        }
        Value::Array(arr) => Ok(Value::Array(
            (0..arr.len() as i64).map(Value::Int).collect(),
        )),
        other => Err(EvalError::lookup(format!(
            "{} has no keys",
            other.type_name()
        ))),
    }
}

fn has_key(value: &Value, key: &Value) -> Result<Value, EvalError> {
    match (value, key) {
        (Value::Object(obj), Value::String(k)) => Ok(Value::Bool(obj.contains_key(k.as_str()))),
        (Value::Array(arr), Value::Int(_) | Value::Float(_)) => {
            let idx = key.as_i64().unwrap_or(-1);
            Ok(Value::Bool(idx >= 0 && (idx as usize) < arr.len()))
        }
        _ => Err(EvalError::lookup(format!(
            "cannot check whether {} has a {} key",
            value.type_name(),
            key.type_name()
        ))),
    }
}

/// Deep containment: strings by substring, lists where every element of the
/// needle is contained in some element of the haystack, mappings pointwise,
/// scalars by equality.
fn deep_contains(haystack: &Value, needle: &Value) -> bool {
    match (haystack, needle) {
        (Value::String(h), Value::String(n)) => h.contains(n.as_str()),
        (Value::Array(h), Value::Array(n)) => n
            .iter()
            .all(|ne| h.iter().any(|he| deep_contains(he, ne))),
        (Value::Object(h), Value::Object(n)) => n.iter().all(|(k, nv)| {
            h.get(k.as_str())
                .is_some_and(|hv| deep_contains(hv, nv))
        }),
        _ => haystack == needle,
    }
}

fn eval_first_last(
    name: &str,
    args: &[Expr],
    ctx: &Context,
    first: bool,
) -> Result<Vec<Value>, EvalError> {
    match args {
        [] => ctx
            .values
            .iter()
            .map(|v| {
                let arr = expect_array(name, v)?;
                let picked = if first { arr.first() } else { arr.last() };
                picked.cloned().ok_or_else(|| {
                    EvalError::lookup(format!(
                        "cannot get {} element of empty array",
                        name
                    ))
                })
            })
            .collect(),
        [arg] => {
            let results = eval_expr(arg, ctx)?;
            let picked = if first {
                results.into_iter().next()
            } else {
                results.into_iter().next_back()
            };
            match picked {
                Some(v) => Ok(vec![v]),
                None => Err(EvalError::lookup(format!(
                    "cannot get {} value of empty sequence",
                    name
                ))),
            }
        }
        _ => Err(EvalError::lookup(format!(
            "{} expects at most 1 argument",
            name
        ))),
    }
}

fn eval_min_max(
    name: &str,
    args: &[Expr],
    ctx: &Context,
    min: bool,
) -> Result<Vec<Value>, EvalError> {
    expect_args(name, args, 0)?;
    ctx.values
        .iter()
        .map(|v| {
            let arr = expect_array(name, v)?;
            let mut best: Option<&Value> = None;
            for elem in arr {
                best = Some(match best {
                    None => elem,
                    Some(b) => {
                        let keep_new = if min {
                            elem.cmp_order(b) == core::cmp::Ordering::Less
                        } else {
                            elem.cmp_order(b) == core::cmp::Ordering::Greater
                        };
                        if keep_new {
                            elem
                        } else {
                            b
                        }
                    }
                });
            }
            Ok(best.cloned().unwrap_or(Value::Null))
        })
        .collect()
}

fn eval_min_max_by(
    name: &str,
    args: &[Expr],
    ctx: &Context,
    min: bool,
) -> Result<Vec<Value>, EvalError> {
    expect_args(name, args, 1)?;
    let mut out = Vec::new();
    for v in &ctx.values {
        let arr = expect_array(name, v)?;
        let mut best: Option<(Value, Value)> = None;
        for elem in arr {
            let key = key_for(&args[0], elem, ctx)?;
            best = Some(match best {
                None => (key, elem.clone()),
                Some((bk, be)) => {
                    let keep_new = if min {
                        key.cmp_order(&bk) == core::cmp::Ordering::Less
                    } else {
                        key.cmp_order(&bk) == core::cmp::Ordering::Greater
                    };
                    if keep_new {
                        (key, elem.clone())
                    } else {
                        (bk, be)
                    }
                }
            });
        }
        out.push(best.map(|(_, e)| e).unwrap_or(Value::Null));
    }
    Ok(out)
}

fn flatten_array(arr: &[Value], depth: i64) -> Vec<Value> {
    let mut out = Vec::new();
    for elem in arr {
        match elem {
            Value::Array(inner) if depth > 0 => {
                out.extend(flatten_array(inner, depth - 1));
            }
            other => out.push(other.clone()),
        }
    }
    out
}

fn to_entries(value: &Value) -> Result<Value, EvalError> {
    match value {
        Value::Object(obj) => Ok(Value::Array(
            obj.iter()
                .map(|(k, v)| {
                    Value::object(vec![
                        ("key".to_string(), Value::string(k.clone())),
                        ("value".to_string(), v.clone()),
                    ])
                })
                .collect(),
        )),
        Value::Array(arr) => Ok(Value::Array(
            arr.iter()
                .enumerate()
                .map(|(i, v)| {
                    Value::object(vec![
                        ("key".to_string(), Value::Int(i as i64)),
                        ("value".to_string(), v.clone()),
                    ])
                })
                .collect(),
        )),
        other => Err(EvalError::lookup(format!(
            "to_entries requires object or array input, got {}",
            other.type_name()
        ))),
    }
}

/// `from_entries` accepts `key`/`name`/`k` for the key and `value`/`v` for
/// the value; keys are string-coerced.
fn from_entries(value: &Value) -> Result<Value, EvalError> {
    let Value::Array(entries) = value else {
        return Err(EvalError::lookup(format!(
            "from_entries requires array input, got {}",
            value.type_name()
        )));
    };

    let mut obj = IndexMap::new();
    for entry in entries {
        let Value::Object(fields) = entry else {
            return Err(EvalError::lookup(
                "from_entries: every entry must be an object",
            ));
        };

        let key = ["key", "name", "k"]
            .iter()
            .find_map(|k| fields.get(*k))
            .ok_or_else(|| EvalError::lookup("from_entries: entry has no key"))?;
        let key = match key {
            Value::String(s) => s.clone(),
            Value::Int(_) | Value::Float(_) | Value::Bool(_) => key.to_display_string(),
            other => {
                return Err(EvalError::lookup(format!(
                    "from_entries: cannot use {} as a key",
                    other.type_name()
                )));
            }
        };
        let val = ["value", "v"]
            .iter()
            .find_map(|k| fields.get(*k))
            .cloned()
            .unwrap_or(Value::Null);

        obj.insert(key, val);
    }

    Ok(Value::Object(obj))
}

fn type_filter(
    args: &[Expr],
    ctx: &Context,
    pred: impl Fn(&Value) -> bool,
) -> Result<Vec<Value>, EvalError> {
    if !args.is_empty() {
        return Err(EvalError::lookup("type filters take no arguments"));
    }
    Ok(ctx.values.iter().filter(|v| pred(v)).cloned().collect())
}

fn eval_match(args: &[Expr], ctx: &Context) -> Result<Vec<Value>, EvalError> {
    expect_args("match", args, 1)?;
    let re = arg_regex("match", &args[0], ctx)?;
    let group_names: Vec<Option<String>> = re
        .capture_names()
        .map(|n| n.map(str::to_string))
        .collect();

    let mut out = Vec::new();
    for v in &ctx.values {
        let s = expect_string("match", v)?;
        let Some(caps) = re.captures(s) else {
            out.push(Value::Null);
            continue;
        };
        let Some(whole) = caps.get(0) else {
            out.push(Value::Null);
            continue;
        };

        let mut captures = Vec::new();
        for i in 1..caps.len() {
            let name = match group_names.get(i).and_then(|n| n.clone()) {
                Some(n) => Value::String(n),
                None => Value::Null,
            };
            let entry = match caps.get(i) {
                Some(m) => Value::object(vec![
                    ("offset".to_string(), Value::Int(m.start() as i64)),
                    ("length".to_string(), Value::Int((m.end() - m.start()) as i64)),
                    ("string".to_string(), Value::string(m.as_str())),
                    ("name".to_string(), name),
                ]),
                None => Value::object(vec![
                    ("offset".to_string(), Value::Int(-1)),
                    ("length".to_string(), Value::Int(0)),
                    ("string".to_string(), Value::Null),
                    ("name".to_string(), name),
                ]),
            };
            captures.push(entry);
        }

        out.push(Value::object(vec![
            ("offset".to_string(), Value::Int(whole.start() as i64)),
            (
                "length".to_string(),
                Value::Int((whole.end() - whole.start()) as i64),
            ),
            ("string".to_string(), Value::string(whole.as_str())),
            ("captures".to_string(), Value::Array(captures)),
        ]));
    }
    Ok(out)
}

fn eval_capture(args: &[Expr], ctx: &Context) -> Result<Vec<Value>, EvalError> {
    expect_args("capture", args, 1)?;
    let re = arg_regex("capture", &args[0], ctx)?;

    let mut out = Vec::new();
    for v in &ctx.values {
        let s = expect_string("capture", v)?;
        let Some(caps) = re.captures(s) else {
            out.push(Value::Null);
            continue;
        };
        let mut obj = IndexMap::new();
        for name in re.capture_names().flatten() {
            let value = caps
                .name(name)
                .map(|m| Value::string(m.as_str()))
                .unwrap_or(Value::Null);
            obj.insert(name.to_string(), value);
        }
        out.push(Value::Object(obj));
    }
    Ok(out)
}

/// `sub` replaces the first match, `gsub` every match. Replacement strings
/// use the regex engine's `$name` / `${n}` backreference syntax.
fn eval_sub(
    name: &str,
    args: &[Expr],
    ctx: &Context,
    global: bool,
) -> Result<Vec<Value>, EvalError> {
    expect_args(name, args, 2)?;
    let re = arg_regex(name, &args[0], ctx)?;
    let replacement = arg_string(name, &args[1], ctx)?;

    ctx.values
        .iter()
        .map(|v| {
            let s = expect_string(name, v)?;
            let replaced = if global {
                re.replace_all(s, replacement.as_str())
            } else {
                re.replace(s, replacement.as_str())
            };
            Ok(Value::String(replaced.into_owned()))
        })
        .collect()
}

fn eval_del(args: &[Expr], ctx: &Context) -> Result<Vec<Value>, EvalError> {
    if args.is_empty() {
        return Err(EvalError::lookup("del expects at least 1 argument"));
    }

    let mut out = Vec::new();
    for v in &ctx.values {
        let vctx = ctx.with_value(v.clone());
        let mut all_paths: Vec<Vec<PathElem>> = Vec::new();
        for arg in args {
            for target in flatten_commas(arg) {
                all_paths.extend(path::resolve_paths(target, &vctx, v)?);
            }
        }
        // Delete back to front so earlier list indices stay valid.
        all_paths.sort_by(|a, b| path::path_to_value(a).cmp_order(&path::path_to_value(b)));
        let mut modified = v.clone();
        for p in all_paths.iter().rev() {
            modified = path::delete_path(&modified, p);
        }
        out.push(modified);
    }
    Ok(out)
}

fn flatten_commas(expr: &Expr) -> Vec<&Expr> {
    match expr {
        Expr::Comma(exprs) => exprs.iter().flat_map(flatten_commas).collect(),
        other => vec![other],
    }
}

fn eval_paths(args: &[Expr], ctx: &Context) -> Result<Vec<Value>, EvalError> {
    if args.len() > 1 {
        return Err(EvalError::lookup("paths expects at most 1 argument"));
    }

    let mut out = Vec::new();
    for v in &ctx.values {
        for p in path::collect_paths(v) {
            if let Some(filter) = args.first() {
                let at = path::get_path(v, &p);
                let keep = match eval_expr(filter, &ctx.with_value(at)) {
                    Ok(results) => results.first().is_some_and(Value::is_truthy),
                    Err(_) => false,
                };
                if !keep {
                    continue;
                }
            }
            out.push(path::path_to_value(&p));
        }
    }
    Ok(out)
}
