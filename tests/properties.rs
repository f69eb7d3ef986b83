//! Property-based tests for the query engine.
//!
//! These exercise the engine's algebraic guarantees over generated values.
//! A generated value is injected into an expression through its JSON
//! rendering, which the expression grammar accepts verbatim (literals plus
//! array and object construction).

use hq::{evaluate, Value};
use proptest::prelude::*;

/// Small recursive values with finite numbers and tame strings.
fn value_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-1_000_000i64..1_000_000).prop_map(Value::Int),
        (-1.0e6f64..1.0e6).prop_map(Value::Float),
        "[a-z0-9 ]{0,10}".prop_map(Value::from),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::vec(("[a-z]{1,6}", inner), 0..4)
                .prop_map(|pairs| Value::object(pairs)),
        ]
    })
}

proptest! {
    /// Piping through identity changes nothing.
    #[test]
    fn prop_identity_pipe(v in value_strategy()) {
        let results = evaluate(". | .", v.clone()).unwrap();
        prop_assert_eq!(results, vec![v]);
    }

    /// A value's JSON rendering, read back as an expression, rebuilds the
    /// value.
    #[test]
    fn prop_literal_round_trip(v in value_strategy()) {
        let results = evaluate(&v.to_json(), Value::Null).unwrap();
        prop_assert_eq!(results, vec![v]);
    }

    /// Null is the additive identity on both sides.
    #[test]
    fn prop_null_add_identity(v in value_strategy()) {
        let rendered = v.to_json();
        let left = evaluate(&format!("null + ({})", rendered), Value::Null).unwrap();
        let right = evaluate(&format!("({}) + null", rendered), Value::Null).unwrap();
        prop_assert_eq!(left, vec![v.clone()]);
        prop_assert_eq!(right, vec![v]);
    }

    /// `x // y` is `x` when `x` is truthy, `y` otherwise.
    #[test]
    fn prop_alternative(v in value_strategy()) {
        let results = evaluate(&format!("({}) // 42", v.to_json()), Value::Null).unwrap();
        if v.is_truthy() {
            prop_assert_eq!(results, vec![v]);
        } else {
            prop_assert_eq!(results, vec![Value::Int(42)]);
        }
    }

    /// Only null and false are falsy.
    #[test]
    fn prop_truthiness(v in value_strategy()) {
        let results = evaluate(&format!("({}) | not", v.to_json()), Value::Null).unwrap();
        let expected = matches!(v, Value::Null | Value::Bool(false));
        prop_assert_eq!(results, vec![Value::Bool(expected)]);
    }

    /// Evaluation leaves the input untouched, whatever the update does.
    #[test]
    fn prop_immutability(v in value_strategy()) {
        let snapshot = v.clone();
        let _ = evaluate(".a = 1", v.clone());
        let _ = evaluate("del(.a)", v.clone());
        prop_assert_eq!(v, snapshot);
    }

    /// Writing a path's own value back is the identity.
    #[test]
    fn prop_setpath_getpath_round_trip(v in value_strategy()) {
        let wrapped = Value::object(vec![("slot".to_string(), v)]);
        let results = evaluate(
            r#"setpath(["slot"]; getpath(["slot"]))"#,
            wrapped.clone(),
        )
        .unwrap();
        prop_assert_eq!(results, vec![wrapped]);
    }

    /// After deletion the entry is gone.
    #[test]
    fn prop_del_removes(v in value_strategy()) {
        let wrapped = Value::object(vec![("slot".to_string(), v)]);
        let results = evaluate(r#"del(.slot) | has("slot")"#, wrapped).unwrap();
        prop_assert_eq!(results, vec![Value::Bool(false)]);
    }

    /// Comma concatenates the sequences its operands produce.
    #[test]
    fn prop_comma_concatenates(a in value_strategy(), b in value_strategy()) {
        let expr = format!("({}), ({})", a.to_json(), b.to_json());
        let results = evaluate(&expr, Value::Null).unwrap();
        prop_assert_eq!(results, vec![a, b]);
    }

    /// Array length agrees with the generator.
    #[test]
    fn prop_array_length(vs in prop::collection::vec(value_strategy(), 0..6)) {
        let arr = Value::Array(vs.clone());
        let results = evaluate("length", arr).unwrap();
        prop_assert_eq!(results, vec![Value::Int(vs.len() as i64)]);
    }
}
