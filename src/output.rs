//! Output rendering for query results.
//!
//! Values render as HUML (the default), JSON (pretty or compact), or
//! YAML. Exact integers render without a fractional part in every mode.

use crate::query::{escape_json_string, Value};
use crate::{huml, yaml};

/// Render a value as compact JSON.
pub fn to_json(value: &Value) -> String {
    value.to_json()
}

/// Render a value as pretty JSON with two-space indentation.
pub fn to_json_pretty(value: &Value) -> String {
    let mut out = String::new();
    write_json(value, 0, &mut out);
    out
}

fn write_json(value: &Value, indent: usize, out: &mut String) {
    match value {
        Value::Array(arr) if !arr.is_empty() => {
            out.push_str("[\n");
            for (i, elem) in arr.iter().enumerate() {
                out.push_str(&"  ".repeat(indent + 1));
                write_json(elem, indent + 1, out);
                if i + 1 < arr.len() {
                    out.push(',');
                }
                out.push('\n');
            }
            out.push_str(&"  ".repeat(indent));
            out.push(']');
        }
        Value::Object(obj) if !obj.is_empty() => {
            out.push_str("{\n");
            for (i, (k, v)) in obj.iter().enumerate() {
                out.push_str(&"  ".repeat(indent + 1));
                out.push_str(&format!("\"{}\": ", escape_json_string(k)));
                write_json(v, indent + 1, out);
                if i + 1 < obj.len() {
                    out.push(',');
                }
                out.push('\n');
            }
            out.push_str(&"  ".repeat(indent));
            out.push('}');
        }
        other => out.push_str(&other.to_json()),
    }
}

/// Render a value as block-style YAML.
pub fn to_yaml(value: &Value) -> String {
    yaml::to_string(value)
}

/// Render a value as a HUML document.
pub fn to_huml(value: &Value) -> String {
    huml::to_string(value)
}
