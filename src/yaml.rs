//! Minimal YAML codec: block sequences and block mappings.
//!
//! This covers the YAML shape configuration files actually use — nested
//! `key: value` mappings, `- item` sequences, JSON-style scalars, comments
//! — with two-space indentation. Flow collections (beyond the empty `[]`
//! and `{}`), anchors, tags, and multi-document streams are out of scope.

use std::fmt;

use indexmap::IndexMap;

use crate::query::Value;

/// Error raised while reading a YAML document.
#[derive(Debug, Clone, PartialEq)]
pub struct YamlError {
    pub message: String,
    pub line: usize,
}

impl YamlError {
    fn new(message: impl Into<String>, line: usize) -> Self {
        YamlError {
            message: message.into(),
            line,
        }
    }
}

impl fmt::Display for YamlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for YamlError {}

#[derive(Debug)]
struct Line {
    indent: usize,
    text: String,
    number: usize,
}

/// Parse a YAML document into a value.
pub fn from_str(input: &str) -> Result<Value, YamlError> {
    let mut lines = Vec::new();
    for (i, raw) in input.lines().enumerate() {
        let number = i + 1;
        if raw.contains('\t') {
            return Err(YamlError::new("tabs are not allowed in indentation", number));
        }
        let indent = raw.len() - raw.trim_start_matches(' ').len();
        let content = strip_comment(&raw[indent..]);
        let content = content.trim_end();
        if content.is_empty() || content == "---" || content == "..." {
            continue;
        }
        lines.push(Line {
            indent,
            text: content.to_string(),
            number,
        });
    }

    if lines.is_empty() {
        return Ok(Value::Null);
    }

    if lines.len() == 1 && !is_item(&lines[0].text) && split_key(&lines[0].text).is_none() {
        return Ok(parse_scalar(&lines[0].text));
    }

    let mut pos = 0;
    let value = parse_block(&lines, &mut pos, lines[0].indent)?;
    if pos < lines.len() {
        return Err(YamlError::new(
            "unexpected content after document",
            lines[pos].number,
        ));
    }
    Ok(value)
}

fn is_item(text: &str) -> bool {
    text == "-" || text.starts_with("- ")
}

fn strip_comment(text: &str) -> &str {
    let mut in_single = false;
    let mut in_double = false;
    for (i, c) in text.char_indices() {
        match c {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '#' if !in_single && !in_double => {
                if i == 0 || text[..i].ends_with(' ') {
                    return &text[..i];
                }
            }
            _ => {}
        }
    }
    text
}

fn parse_block(lines: &[Line], pos: &mut usize, indent: usize) -> Result<Value, YamlError> {
    let Some(first) = lines.get(*pos) else {
        return Ok(Value::Null);
    };
    if first.indent != indent {
        return Err(YamlError::new("bad indentation", first.number));
    }

    if is_item(&first.text) {
        parse_sequence(lines, pos, indent)
    } else {
        parse_mapping(lines, pos, indent)
    }
}

fn parse_sequence(lines: &[Line], pos: &mut usize, indent: usize) -> Result<Value, YamlError> {
    let mut items = Vec::new();

    while let Some(line) = lines.get(*pos) {
        if line.indent != indent || !is_item(&line.text) {
            break;
        }

        if line.text == "-" {
            *pos += 1;
            items.push(parse_block(lines, pos, indent + 2)?);
            continue;
        }

        let rest = line.text[2..].trim().to_string();
        let number = line.number;

        // `- key: value` starts a mapping item whose remaining keys sit
        // two spaces deeper.
        if let Some((key, value_text)) = split_key(&rest) {
            *pos += 1;
            let mut obj = IndexMap::new();
            insert_entry(&mut obj, key, value_text, lines, pos, indent + 2, number)?;
            while let Some(next) = lines.get(*pos) {
                if next.indent != indent + 2 || is_item(&next.text) {
                    break;
                }
                let Some((k, v)) = split_key(&next.text) else {
                    return Err(YamlError::new("expected 'key: value'", next.number));
                };
                let n = next.number;
                *pos += 1;
                insert_entry(&mut obj, k, v, lines, pos, indent + 4, n)?;
            }
            items.push(Value::Object(obj));
        } else {
            *pos += 1;
            items.push(parse_scalar(&rest));
        }
    }

    Ok(Value::Array(items))
}

fn parse_mapping(lines: &[Line], pos: &mut usize, indent: usize) -> Result<Value, YamlError> {
    let mut obj = IndexMap::new();

    while let Some(line) = lines.get(*pos) {
        if line.indent != indent || is_item(&line.text) {
            break;
        }
        let Some((key, value_text)) = split_key(&line.text) else {
            return Err(YamlError::new(
                format!("expected 'key: value', found {:?}", line.text),
                line.number,
            ));
        };
        let number = line.number;
        *pos += 1;
        insert_entry(&mut obj, key, value_text, lines, pos, indent + 2, number)?;
    }

    Ok(Value::Object(obj))
}

/// Insert one mapping entry. An empty value means a nested block (or null
/// when nothing deeper follows).
fn insert_entry(
    obj: &mut IndexMap<String, Value>,
    key: String,
    value_text: String,
    lines: &[Line],
    pos: &mut usize,
    child_indent: usize,
    number: usize,
) -> Result<(), YamlError> {
    let value = if value_text.is_empty() {
        match lines.get(*pos) {
            Some(next) if next.indent >= child_indent => {
                parse_block(lines, pos, next.indent)?
            }
            // Sequences may sit at the same indent as their key.
            Some(next) if next.indent == child_indent.saturating_sub(2) && is_item(&next.text) => {
                parse_block(lines, pos, next.indent)?
            }
            _ => Value::Null,
        }
    } else {
        parse_scalar(&value_text)
    };

    if obj.contains_key(&key) {
        return Err(YamlError::new(format!("duplicate key {:?}", key), number));
    }
    obj.insert(key, value);
    Ok(())
}

/// Split `key: value` at the first unquoted colon followed by space or end.
fn split_key(text: &str) -> Option<(String, String)> {
    let mut in_single = false;
    let mut in_double = false;
    let bytes = text.as_bytes();
    for (i, c) in text.char_indices() {
        match c {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            ':' if !in_single && !in_double => {
                let at_end = i + 1 == bytes.len();
                if at_end || bytes[i + 1] == b' ' {
                    let key = unquote_key(text[..i].trim());
                    if key.is_empty() {
                        return None;
                    }
                    let rest = if at_end { "" } else { text[i + 1..].trim() };
                    return Some((key, rest.to_string()));
                }
            }
            _ => {}
        }
    }
    None
}

fn unquote_key(raw: &str) -> String {
    let raw = raw.trim();
    if (raw.starts_with('"') && raw.ends_with('"') && raw.len() >= 2)
        || (raw.starts_with('\'') && raw.ends_with('\'') && raw.len() >= 2)
    {
        raw[1..raw.len() - 1].to_string()
    } else {
        raw.to_string()
    }
}

fn parse_scalar(text: &str) -> Value {
    let text = text.trim();
    match text {
        "" | "~" | "null" | "Null" | "NULL" => return Value::Null,
        "true" | "True" | "TRUE" => return Value::Bool(true),
        "false" | "False" | "FALSE" => return Value::Bool(false),
        "[]" => return Value::Array(Vec::new()),
        "{}" => return Value::Object(IndexMap::new()),
        _ => {}
    }

    if (text.starts_with('"') && text.ends_with('"') && text.len() >= 2)
        || (text.starts_with('\'') && text.ends_with('\'') && text.len() >= 2)
    {
        let inner = &text[1..text.len() - 1];
        if text.starts_with('"') {
            return Value::String(unescape_double(inner));
        }
        return Value::String(inner.replace("''", "'"));
    }

    if let Ok(n) = text.parse::<i64>() {
        return Value::Int(n);
    }
    if text
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || c == '-' || c == '+' || c == '.')
    {
        if let Ok(f) = text.parse::<f64>() {
            return Value::Float(f);
        }
    }

    Value::String(text.to_string())
}

fn unescape_double(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Render a value as block-style YAML.
pub fn to_string(value: &Value) -> String {
    let mut out = String::new();
    match value {
        Value::Object(obj) if !obj.is_empty() => write_block(value, 0, &mut out),
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
                    Value::Object(inner) if !inner.is_empty() => {
                        out.push_str(&format!("{}{}:\n", pad, key));
                        write_block(v, indent + 2, out);
                    }
                    Value::Array(inner) if !inner.is_empty() => {
                        out.push_str(&format!("{}{}:\n", pad, key));
                        write_block(v, indent, out);
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
                    Value::Object(inner) if !inner.is_empty() => {
                        out.push_str(&format!("{}-\n", pad));
                        write_block(elem, indent + 2, out);
                    }
                    Value::Array(inner) if !inner.is_empty() => {
                        out.push_str(&format!("{}-\n", pad));
                        write_block(elem, indent + 2, out);
                    }
                    scalar => {
                        out.push_str(&format!("{}- {}\n", pad, scalar_string(scalar)));
                    }
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
        Value::Null => "null".to_string(),
        Value::String(s) => {
            if needs_quotes(s) {
                format!("\"{}\"", escape_double(s))
            } else {
                s.clone()
            }
        }
        Value::Array(_) => "[]".to_string(),
        Value::Object(_) => "{}".to_string(),
        other => other.to_display_string(),
    }
}

fn needs_quotes(s: &str) -> bool {
    if s.is_empty() || s.trim() != s {
        return true;
    }
    if matches!(
        s,
        "null" | "Null" | "NULL" | "~" | "true" | "True" | "false" | "False" | "[]" | "{}"
    ) {
        return true;
    }
    if s.parse::<f64>().is_ok() {
        return true;
    }
    s.contains(": ")
        || s.ends_with(':')
        || s.contains(" #")
        || s.contains('\n')
        || s.starts_with([
            '-', '?', '&', '*', '!', '|', '>', '%', '@', '`', '"', '\'', '[', ']', '{', '}', ',',
            '#',
        ])
}

fn escape_double(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

fn format_key(key: &str) -> String {
    if needs_quotes(key) || key.contains(':') {
        format!("\"{}\"", escape_double(key))
    } else {
        key.to_string()
    }
}
