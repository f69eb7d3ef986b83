//! The query expression language: lexer, parser, and evaluator.
//!
//! Expressions are modeled on jq. An expression is evaluated against one
//! input document and produces a sequence of zero or more output values.
//!
//! # Supported Syntax
//!
//! | Expression | Meaning |
//! |------------|---------|
//! | `.` | Identity (the whole document) |
//! | `.foo`, `.["foo"]` | Field access |
//! | `.[0]`, `.[-1]` | Array index (negative counts from the end) |
//! | `.[2:5]`, `.[:5]`, `.[2:]` | Slice |
//! | `.[]` | Iterate elements / mapping values |
//! | `.[expr]` | Dynamic key: string selects a field, number an index |
//! | `.foo?` | Optional: errors become empty, nulls are dropped |
//! | `..` | Recursive descent |
//! | `a \| b` | Pipe |
//! | `a, b` | Multiple outputs |
//! | `[expr]`, `{k: v}` | Array / object construction |
//! | `"Hi \(.name)"` | String interpolation |
//! | `+ - * / %` | Arithmetic (plus concat/merge on strings, arrays, objects) |
//! | `== != < <= > >=` | Comparison |
//! | `and`, `or`, `not` | Boolean logic (only `null` and `false` are falsy) |
//! | `a // b` | Alternative: `b` when `a` is falsy, empty, or fails |
//! | `if a then b elif c then d else e end` | Conditional |
//! | `try a catch b` | Error recovery; the handler sees the message |
//! | `expr as $x \| body` | Variable binding |
//! | `expr as {k: $x} \| body` | Destructuring binding |
//! | `reduce expr as $x (init; update)` | Fold |
//! | `.a = v`, `.a \|= f`, `+=`, `-=`, `*=`, `//=` | Path assignment |
//! | `length`, `keys`, `map(f)`, `select(f)`, ... | Built-in library |
//! | `path(p)`, `paths`, `getpath`, `setpath`, `delpaths`, `del` | Path primitives |
//! | `test`, `match`, `capture`, `sub`, `gsub` | Regular expressions |
//!
//! # Example
//!
//! ```
//! use hq::query::{evaluate, Value};
//!
//! let input = Value::object(vec![(
//!     "users".to_string(),
//!     Value::from(vec![
//!         Value::object(vec![("name".to_string(), Value::from("Alice"))]),
//!         Value::object(vec![("name".to_string(), Value::from("Bob"))]),
//!     ]),
//! )]);
//!
//! let results = evaluate(".users[].name", input).unwrap();
//! assert_eq!(results, vec![Value::from("Alice"), Value::from("Bob")]);
//! ```

mod eval;
mod expr;
mod functions;
mod lexer;
mod parser;
mod path;
mod value;

pub use eval::{eval, Context, ErrorKind, EvalError};
pub use expr::{
    AssignOp, BinOp, Expr, InterpPart, Literal, ObjectField, ObjectKey, Pattern, PatternEntry,
    UnaryOp,
};
pub use lexer::{Keyword, LexError, LexedToken, Lexer, Token};
pub use parser::{parse, ParseError};
pub use path::{collect_paths, delete_path, get_path, set_path, PathElem};
pub use value::Value;

pub(crate) use value::escape_json_string;

use std::fmt;

/// Failure of a whole evaluation: either the expression did not parse, or
/// evaluation raised an unrecovered error.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Parse(ParseError),
    Eval(EvalError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Parse(err) => write!(f, "{}", err),
            Error::Eval(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Error {}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::Parse(err)
    }
}

impl From<EvalError> for Error {
    fn from(err: EvalError) -> Self {
        Error::Eval(err)
    }
}

/// Parse and evaluate an expression against an input document.
///
/// This is the single entry point embeddings need: the returned vector is
/// the expression's full output sequence, in order.
pub fn evaluate(expression: &str, input: Value) -> Result<Vec<Value>, Error> {
    let ast = parse(expression)?;
    let ctx = Context::new(input);
    Ok(eval(&ast, &ctx)?)
}
