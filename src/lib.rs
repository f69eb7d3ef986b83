//! hq: a lightweight HUML/JSON/YAML processor with jq-style expressions.
//!
//! The heart of the crate is [`query`]: an expression language modeled on
//! jq, with its own lexer, parser, and multi-value evaluator over a
//! recursive [`Value`] data model. The remaining modules are the embedding:
//! document codecs for HUML, JSON and YAML, and output rendering.
//!
//! ```
//! use hq::{evaluate, Value};
//!
//! let input = hq::json::from_str(r#"{"nums": [1, 2, 3]}"#).unwrap();
//! let results = evaluate(".nums | add", input).unwrap();
//! assert_eq!(results, vec![Value::Int(6)]);
//! ```

pub mod huml;
pub mod json;
pub mod output;
pub mod query;
pub mod yaml;

pub use query::{evaluate, Error, EvalError, ParseError, Value};
