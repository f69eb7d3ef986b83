//! JSON input codec.
//!
//! Decoding goes through serde_json (with its order-preserving map), then
//! converts into the query [`Value`] so integers survive as integers.

use crate::query::Value;

/// Parse a JSON document into a query value.
pub fn from_str(text: &str) -> Result<Value, serde_json::Error> {
    let parsed: serde_json::Value = serde_json::from_str(text)?;
    Ok(convert(parsed))
}

fn convert(value: serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => {
            Value::Array(arr.into_iter().map(convert).collect())
        }
        serde_json::Value::Object(map) => {
            Value::Object(map.into_iter().map(|(k, v)| (k, convert(v))).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars() {
        assert_eq!(from_str("null").unwrap(), Value::Null);
        assert_eq!(from_str("42").unwrap(), Value::Int(42));
        assert_eq!(from_str("2.5").unwrap(), Value::Float(2.5));
        assert_eq!(from_str("\"hi\"").unwrap(), Value::from("hi"));
    }

    #[test]
    fn test_object_order_is_preserved() {
        let v = from_str(r#"{"z": 1, "a": 2}"#).unwrap();
        let Value::Object(obj) = v else { panic!("expected object") };
        let keys: Vec<&String> = obj.keys().collect();
        assert_eq!(keys, ["z", "a"]);
    }

    #[test]
    fn test_invalid() {
        assert!(from_str("{oops").is_err());
    }
}
