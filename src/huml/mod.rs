//! HUML document codec.
//!
//! HUML is a strict indented configuration format: `key: value` pairs, a
//! `::` marker introducing complex (list or mapping) children, inline
//! vectors (`key:: a, b, c` and `key:: k: v, k: v`), `[]`/`{}` empty-vector
//! markers, triple-quote multi-line strings, and `#` line comments.
//! Indentation is two spaces per level.
//!
//! The reader here is deliberately strict: anything it does not recognize
//! is an error with a line number, which lets the input auto-detection fall
//! through to JSON or YAML cleanly.

use std::fmt;

use indexmap::IndexMap;

use crate::query::Value;

/// Error raised while reading a HUML document.
#[derive(Debug, Clone, PartialEq)]
pub struct HumlError {
    pub message: String,
    pub line: usize,
}

impl HumlError {
    fn new(message: impl Into<String>, line: usize) -> Self {
        HumlError {
            message: message.into(),
            line,
        }
    }
}

impl fmt::Display for HumlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for HumlError {}

/// A significant line: indentation, content with comments stripped, and its
/// 1-based source line number.
#[derive(Debug)]
struct Line {
    indent: usize,
    text: String,
    number: usize,
}

/// Parse a HUML document into a value.
pub fn from_str(input: &str) -> Result<Value, HumlError> {
    let raw: Vec<&str> = input.lines().collect();
    let mut lines = Vec::new();
    let mut i = 0;

    while i < raw.len() {
        let number = i + 1;
        let line = raw[i];
        if line.contains('\t') {
            return Err(HumlError::new("tabs are not allowed in indentation", number));
        }

        let indent = line.len() - line.trim_start_matches(' ').len();
        let content = strip_comment(&line[indent..]);
        let content = content.trim_end();

        if content.is_empty() || content.starts_with('%') {
            i += 1;
            continue;
        }

        // A value ending in a triple-quote fence swallows raw lines up to
        // the closing fence.
        if let Some(fence) = fence_opener(content) {
            let mut body = Vec::new();
            let mut j = i + 1;
            loop {
                let Some(next) = raw.get(j) else {
                    return Err(HumlError::new("unterminated multi-line string", number));
                };
                if next.trim() == fence {
                    break;
                }
                body.push(strip_fence_indent(next, indent + 2));
                j += 1;
            }
            let joined = body.join("\n");
            let head = content[..content.len() - 3].trim_end();
            lines.push(Line {
                indent,
                text: format!("{} \"{}\"", head, escape_string(&joined)),
                number,
            });
            i = j + 1;
            continue;
        }

        lines.push(Line {
            indent,
            text: content.to_string(),
            number,
        });
        i += 1;
    }

    if lines.is_empty() {
        return Ok(Value::Null);
    }

    // A one-line document with no key or list marker is a bare scalar.
    let is_list_item = |text: &str| text == "-" || text.starts_with("- ");
    if lines.len() == 1 && !is_list_item(&lines[0].text) && key_split(&lines[0].text).is_none() {
        return parse_scalar(&lines[0].text, lines[0].number);
    }

    let mut pos = 0;
    let value = parse_block(&lines, &mut pos, lines[0].indent)?;
    if pos < lines.len() {
        return Err(HumlError::new(
            "unexpected content after document",
            lines[pos].number,
        ));
    }
    Ok(value)
}

/// `"""` or ``` ``` ``` at the end of a line opens a multi-line string.
fn fence_opener(content: &str) -> Option<&'static str> {
    if content.ends_with("\"\"\"") && !content.ends_with("\\\"\"\"") && content.len() > 3 {
        Some("\"\"\"")
    } else if content.ends_with("```") && content.len() > 3 {
        Some("```")
    } else {
        None
    }
}

fn strip_fence_indent(line: &str, indent: usize) -> String {
    let available = line.len() - line.trim_start_matches(' ').len();
    line[available.min(indent)..].to_string()
}

/// Drop a `#` comment, respecting double quotes.
fn strip_comment(text: &str) -> &str {
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        match c {
            '\\' if in_quotes => escaped = !escaped,
            '"' if !escaped => in_quotes = !in_quotes,
            '#' if !in_quotes => {
                // A comment starts at the line head or after whitespace.
                if i == 0 || text[..i].ends_with(' ') {
                    return &text[..i];
                }
                escaped = false;
            }
            _ => escaped = false,
        }
    }
    text
}

fn parse_block(lines: &[Line], pos: &mut usize, indent: usize) -> Result<Value, HumlError> {
    let Some(first) = lines.get(*pos) else {
        return Err(HumlError::new("expected an indented block", 0));
    };
    if first.indent != indent {
        return Err(HumlError::new(
            format!("expected indentation of {} spaces", indent),
            first.number,
        ));
    }

    if first.text == "-" || first.text.starts_with("- ") {
        parse_sequence(lines, pos, indent)
    } else {
        parse_mapping(lines, pos, indent)
    }
}

fn parse_sequence(lines: &[Line], pos: &mut usize, indent: usize) -> Result<Value, HumlError> {
    let mut items = Vec::new();

    while let Some(line) = lines.get(*pos) {
        if line.indent < indent {
            break;
        }
        if line.indent != indent {
            return Err(HumlError::new("bad indentation in list", line.number));
        }
        if line.text != "-" && !line.text.starts_with("- ") {
            break;
        }

        if line.text == "-" {
            *pos += 1;
            items.push(parse_block(lines, pos, indent + 2)?);
        } else {
            let rest = line.text[2..].trim();
            items.push(parse_scalar(rest, line.number)?);
            *pos += 1;
        }
    }

    Ok(Value::Array(items))
}

fn parse_mapping(lines: &[Line], pos: &mut usize, indent: usize) -> Result<Value, HumlError> {
    let mut obj = IndexMap::new();

    while let Some(line) = lines.get(*pos) {
        if line.indent < indent {
            break;
        }
        if line.indent != indent {
            return Err(HumlError::new("bad indentation in mapping", line.number));
        }

        let Some((key, marker, rest)) = key_split(&line.text) else {
            return Err(HumlError::new(
                format!("expected 'key: value', found {:?}", line.text),
                line.number,
            ));
        };
        let key = parse_key(&key, line.number)?;
        if obj.contains_key(&key) {
            return Err(HumlError::new(
                format!("duplicate key {:?}", key),
                line.number,
            ));
        }
        let number = line.number;
        let rest = rest.trim().to_string();
        *pos += 1;

        let value = match marker {
            Marker::Scalar => {
                if rest.is_empty() {
                    return Err(HumlError::new(
                        format!("missing value for key {:?} (use '::' for nested values)", key),
                        number,
                    ));
                }
                parse_scalar(&rest, number)?
            }
            Marker::Vector => {
                if rest.is_empty() {
                    match lines.get(*pos) {
                        Some(next) if next.indent == indent + 2 => {
                            parse_block(lines, pos, indent + 2)?
                        }
                        _ => {
                            return Err(HumlError::new(
                                format!("expected indented block after {:?}::", key),
                                number,
                            ));
                        }
                    }
                } else if rest == "[]" {
                    Value::Array(Vec::new())
                } else if rest == "{}" {
                    Value::Object(IndexMap::new())
                } else {
                    parse_inline_vector(&rest, number)?
                }
            }
        };

        obj.insert(key, value);
    }

    Ok(Value::Object(obj))
}

enum Marker {
    /// `key: scalar`
    Scalar,
    /// `key:: vector`
    Vector,
}

/// Split a mapping line at its key marker, respecting quoted keys.
/// Returns the raw key text, the marker kind, and the rest of the line.
fn key_split(text: &str) -> Option<(String, Marker, String)> {
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        match c {
            '\\' if in_quotes => escaped = !escaped,
            '"' if !escaped => in_quotes = !in_quotes,
            ':' if !in_quotes => {
                let key = text[..i].trim().to_string();
                if key.is_empty() {
                    return None;
                }
                return if text[i + 1..].starts_with(':') {
                    Some((key, Marker::Vector, text[i + 2..].to_string()))
                } else {
                    Some((key, Marker::Scalar, text[i + 1..].to_string()))
                };
            }
            _ => escaped = false,
        }
    }
    None
}

fn parse_key(raw: &str, number: usize) -> Result<String, HumlError> {
    if raw.starts_with('"') {
        match parse_scalar(raw, number)? {
            Value::String(s) => Ok(s),
            _ => Err(HumlError::new("invalid quoted key", number)),
        }
    } else if is_bare_key(raw) {
        Ok(raw.to_string())
    } else {
        Err(HumlError::new(format!("invalid key {:?}", raw), number))
    }
}

fn is_bare_key(raw: &str) -> bool {
    let mut chars = raw.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

/// Inline vectors after `::`: either `a, b, c` or `k: v, k: v`.
fn parse_inline_vector(rest: &str, number: usize) -> Result<Value, HumlError> {
    let parts = split_inline(rest);
    let is_mapping = parts
        .first()
        .is_some_and(|p| key_split(p).is_some());

    if is_mapping {
        let mut obj = IndexMap::new();
        for part in parts {
            let Some((key, Marker::Scalar, value)) = key_split(&part) else {
                return Err(HumlError::new(
                    format!("expected 'key: value' in inline mapping, found {:?}", part),
                    number,
                ));
            };
            let key = parse_key(&key, number)?;
            if obj.contains_key(&key) {
                return Err(HumlError::new(
                    format!("duplicate key {:?}", key),
                    number,
                ));
            }
            obj.insert(key, parse_scalar(value.trim(), number)?);
        }
        Ok(Value::Object(obj))
    } else {
        parts
            .into_iter()
            .map(|p| parse_scalar(p.trim(), number))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }
}

/// Split on commas outside quotes.
fn split_inline(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;
    for c in text.chars() {
        match c {
            '\\' if in_quotes => {
                escaped = !escaped;
                current.push(c);
            }
            '"' if !escaped => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ',' if !in_quotes => {
                parts.push(std::mem::take(&mut current));
            }
            _ => {
                escaped = false;
                current.push(c);
            }
        }
    }
    parts.push(current);
    parts
}

fn parse_scalar(text: &str, number: usize) -> Result<Value, HumlError> {
    let text = text.trim();
    match text {
        "null" => return Ok(Value::Null),
        "true" => return Ok(Value::Bool(true)),
        "false" => return Ok(Value::Bool(false)),
        "nan" => return Ok(Value::Float(f64::NAN)),
        "inf" | "+inf" => return Ok(Value::Float(f64::INFINITY)),
        "-inf" => return Ok(Value::Float(f64::NEG_INFINITY)),
        _ => {}
    }

    if text.starts_with('"') {
        return parse_quoted(text, number);
    }
    if text.starts_with('[') || text.starts_with('{') {
        return Err(HumlError::new(
            "inline brackets are only valid as empty-vector markers",
            number,
        ));
    }
    if let Ok(n) = text.parse::<i64>() {
        return Ok(Value::Int(n));
    }
    if text
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || c == '-' || c == '+')
    {
        if let Ok(f) = text.parse::<f64>() {
            return Ok(Value::Float(f));
        }
    }

    Ok(Value::String(text.to_string()))
}

fn parse_quoted(text: &str, number: usize) -> Result<Value, HumlError> {
    let inner = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .ok_or_else(|| HumlError::new("unterminated string", number))?;

    let mut out = String::new();
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => {
                return Err(HumlError::new(
                    format!("invalid escape sequence '\\{}'", other),
                    number,
                ));
            }
            None => return Err(HumlError::new("trailing backslash in string", number)),
        }
    }
    Ok(Value::String(out))
}

fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

/// Render a value as a HUML document.
pub fn to_string(value: &Value) -> String {
    let mut out = String::new();
    match value {
        Value::Object(_) => write_block(value, 0, &mut out),
        Value::Array(arr) if !arr.is_empty() => write_block(value, 0, &mut out),
        other => {
            out.push_str(&scalar_string(other));
            out.push('\n');
        }
    }
    out
}

fn write_block(value: &Value, indent: usize, out: &mut String) {
    let pad = " ".repeat(indent);
    match value {
        Value::Object(obj) => {
            for (k, v) in obj {
                let key = format_key(k);
                match v {
                    Value::Array(arr) if arr.is_empty() => {
                        out.push_str(&format!("{}{}:: []\n", pad, key));
                    }
                    Value::Object(inner) if inner.is_empty() => {
                        out.push_str(&format!("{}{}:: {{}}\n", pad, key));
                    }
                    Value::Array(_) | Value::Object(_) => {
                        out.push_str(&format!("{}{}::\n", pad, key));
                        write_block(v, indent + 2, out);
                    }
                    scalar => {
                        out.push_str(&format!("{}{}: {}\n", pad, key, scalar_string(scalar)));
                    }
                }
            }
        }
        Value::Array(arr) => {
            for elem in arr {
                match elem {
                    Value::Array(inner) if inner.is_empty() => {
                        out.push_str(&format!("{}- []\n", pad))
                    }
                    Value::Object(inner) if inner.is_empty() => {
                        out.push_str(&format!("{}- {{}}\n", pad))
                    }
                    Value::Array(_) | Value::Object(_) => {
                        out.push_str(&format!("{}-\n", pad));
                        write_block(elem, indent + 2, out);
                    }
                    scalar => out.push_str(&format!("{}- {}\n", pad, scalar_string(scalar))),
                }
            }
        }
        scalar => {
            out.push_str(&format!("{}{}\n", pad, scalar_string(scalar)));
        }
    }
}

fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", escape_string(s)),
        Value::Float(f) if f.is_nan() => "nan".to_string(),
        Value::Float(f) if f.is_infinite() => {
            if *f > 0.0 { "inf" } else { "-inf" }.to_string()
        }
        other => other.to_display_string(),
    }
}

fn format_key(key: &str) -> String {
    if is_bare_key(key) {
        key.to_string()
    } else {
        format!("\"{}\"", escape_string(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars() {
        let doc = "name: \"Alice\"\nage: 30\nscore: 2.5\nactive: true\nnote: null\n";
        let v = from_str(doc).unwrap();
        let Value::Object(obj) = &v else { panic!("expected object") };
        assert_eq!(obj["name"], Value::from("Alice"));
        assert_eq!(obj["age"], Value::Int(30));
        assert_eq!(obj["score"], Value::Float(2.5));
        assert_eq!(obj["active"], Value::Bool(true));
        assert_eq!(obj["note"], Value::Null);
    }

    #[test]
    fn test_bare_strings() {
        let v = from_str("city: Berlin\n").unwrap();
        let Value::Object(obj) = &v else { panic!() };
        assert_eq!(obj["city"], Value::from("Berlin"));
    }

    #[test]
    fn test_nested_blocks() {
        let doc = "\
user::
  name: \"Alice\"
  tags::
    - \"admin\"
    - \"ops\"
";
        let v = from_str(doc).unwrap();
        let Value::Object(obj) = &v else { panic!() };
        let Value::Object(user) = &obj["user"] else { panic!() };
        assert_eq!(user["name"], Value::from("Alice"));
        assert_eq!(
            user["tags"],
            Value::from(vec![Value::from("admin"), Value::from("ops")])
        );
    }

    #[test]
    fn test_inline_vectors() {
        let v = from_str("ports:: 80, 443, 8080\n").unwrap();
        let Value::Object(obj) = &v else { panic!() };
        assert_eq!(
            obj["ports"],
            Value::from(vec![Value::Int(80), Value::Int(443), Value::Int(8080)])
        );

        let v = from_str("limits:: cpu: 2, mem: 512\n").unwrap();
        let Value::Object(obj) = &v else { panic!() };
        let Value::Object(limits) = &obj["limits"] else { panic!() };
        assert_eq!(limits["cpu"], Value::Int(2));
        assert_eq!(limits["mem"], Value::Int(512));
    }

    #[test]
    fn test_empty_vectors() {
        let v = from_str("tags:: []\nmeta:: {}\n").unwrap();
        let Value::Object(obj) = &v else { panic!() };
        assert_eq!(obj["tags"], Value::Array(vec![]));
        assert_eq!(obj["meta"], Value::Object(IndexMap::new()));
    }

    #[test]
    fn test_comments_and_directives() {
        let doc = "%HUML v0.1.0\n# heading\nname: \"A\" # trailing\n";
        let v = from_str(doc).unwrap();
        let Value::Object(obj) = &v else { panic!() };
        assert_eq!(obj["name"], Value::from("A"));
    }

    #[test]
    fn test_multiline_string() {
        let doc = "text: \"\"\"\n  line one\n  line two\n\"\"\"\n";
        let v = from_str(doc).unwrap();
        let Value::Object(obj) = &v else { panic!() };
        assert_eq!(obj["text"], Value::from("line one\nline two"));
    }

    #[test]
    fn test_root_list_and_scalar() {
        assert_eq!(
            from_str("- 1\n- 2\n").unwrap(),
            Value::from(vec![Value::Int(1), Value::Int(2)])
        );
        assert_eq!(from_str("42\n").unwrap(), Value::Int(42));
        assert_eq!(from_str("").unwrap(), Value::Null);
    }

    #[test]
    fn test_rejects_json_documents() {
        assert!(from_str("{\"a\": 1}").is_err());
        assert!(from_str("[1, 2, 3]").is_err());
    }

    #[test]
    fn test_duplicate_key_rejected() {
        assert!(from_str("a: 1\na: 2\n").is_err());
    }

    #[test]
    fn test_round_trip() {
        let doc = "\
name: \"Alice\"
age: 30
tags::
  - \"a\"
  - \"b\"
server::
  host: \"localhost\"
  port: 8080
";
        let v = from_str(doc).unwrap();
        let rendered = to_string(&v);
        assert_eq!(from_str(&rendered).unwrap(), v);
    }
}
