//! End-to-end tests for the query engine: expression in, values out.

use hq::{evaluate, Value};

fn json(text: &str) -> Value {
    hq::json::from_str(text).expect("bad test json")
}

/// Evaluate an expression against a JSON input and compare the full output
/// sequence against JSON expectations.
macro_rules! eval_eq {
    ($input:expr, $expr:expr, [$($expected:expr),* $(,)?]) => {{
        let results = evaluate($expr, json($input))
            .unwrap_or_else(|e| panic!("evaluation of {:?} failed: {}", $expr, e));
        let expected: Vec<Value> = vec![$(json($expected)),*];
        assert_eq!(results, expected, "for {:?}", $expr);
    }};
}

macro_rules! eval_fails {
    ($input:expr, $expr:expr) => {{
        assert!(
            evaluate($expr, json($input)).is_err(),
            "expected {:?} to fail",
            $expr
        );
    }};
}

// =============================================================================
// Identity, navigation, null propagation
// =============================================================================

#[test]
fn test_identity() {
    eval_eq!("42", ".", ["42"]);
    eval_eq!(r#"{"a": 1}"#, ". | .", [r#"{"a": 1}"#]);
}

#[test]
fn test_field_access() {
    eval_eq!(r#"{"name": "Alice"}"#, ".name", [r#""Alice""#]);
    eval_eq!(r#"{"a": {"b": 2}}"#, ".a.b", ["2"]);
    eval_eq!(r#"{"key with spaces": 1}"#, r#".["key with spaces"]"#, ["1"]);
    // Missing fields and null inputs yield null, never an error.
    eval_eq!(r#"{"a": 1}"#, ".missing", ["null"]);
    eval_eq!("null", ".anything", ["null"]);
    eval_eq!("null", ".a.b.c", ["null"]);
    eval_fails!("42", ".field");
}

#[test]
fn test_index_access() {
    eval_eq!("[10, 20, 30]", ".[0]", ["10"]);
    eval_eq!("[10, 20, 30]", ".[-1]", ["30"]);
    eval_eq!("[10, 20, 30]", ".[99]", ["null"]);
    eval_eq!("[10, 20, 30]", ".[-99]", ["null"]);
    eval_eq!("null", ".[0]", ["null"]);
    eval_fails!(r#""str""#, ".[0]");
}

#[test]
fn test_slices() {
    eval_eq!("[1, 2, 3, 4, 5]", ".[1:3]", ["[2, 3]"]);
    eval_eq!("[1, 2, 3, 4, 5]", ".[:2]", ["[1, 2]"]);
    eval_eq!("[1, 2, 3, 4, 5]", ".[3:]", ["[4, 5]"]);
    eval_eq!("[1, 2, 3, 4, 5]", ".[-2:]", ["[4, 5]"]);
    eval_eq!("[1, 2, 3]", ".[2:1]", ["[]"]);
    eval_eq!("[1, 2, 3]", ".[1:99]", ["[2, 3]"]);
    eval_eq!(r#""hello""#, ".[1:3]", [r#""el""#]);
    eval_eq!("null", ".[1:3]", ["null"]);
}

#[test]
fn test_iteration() {
    eval_eq!("[1, 2, 3]", ".[]", ["1", "2", "3"]);
    eval_eq!(r#"{"a": 1, "b": 2}"#, ".[]", ["1", "2"]);
    eval_eq!(r#"{"users": [{"n": 1}, {"n": 2}]}"#, ".users[].n", ["1", "2"]);
    eval_fails!("null", ".[]");
    eval_fails!("42", ".[]");
}

#[test]
fn test_dynamic_index() {
    eval_eq!(r#"{"k": "a", "a": 7}"#, ".[.k]", ["7"]);
    eval_eq!("[5, 6, 7]", ".[1 + 1]", ["7"]);
}

#[test]
fn test_optional() {
    eval_eq!("42", ".field?", []);
    eval_eq!(r#"{"a": null}"#, ".a?", []);
    eval_eq!(r#"{"a": 5}"#, ".a?", ["5"]);
}

#[test]
fn test_recursive_descent() {
    eval_eq!(
        r#"{"a": [1], "b": {"c": 2}}"#,
        "..",
        [r#"{"a": [1], "b": {"c": 2}}"#, "[1]", "1", r#"{"c": 2}"#, "2"]
    );
}

// =============================================================================
// Pipe, comma, sequencing
// =============================================================================

#[test]
fn test_pipe_and_comma() {
    eval_eq!(r#"{"a": 1, "b": 2}"#, ".a, .b", ["1", "2"]);
    eval_eq!("[[1, 2]]", ".[0] | .[]", ["1", "2"]);
    // Comma distributes over pipe.
    eval_eq!(r#"{"a": {"x": 1}, "b": {"x": 2}}"#, "(.a, .b) | .x", ["1", "2"]);
}

#[test]
fn test_pipe_associativity() {
    let input = r#"{"a": {"b": {"c": 5}}}"#;
    let left = evaluate("(.a | .b) | .c", json(input)).unwrap();
    let right = evaluate(".a | (.b | .c)", json(input)).unwrap();
    assert_eq!(left, right);
    assert_eq!(left, vec![json("5")]);
}

// =============================================================================
// Arithmetic and comparison
// =============================================================================

#[test]
fn test_arithmetic() {
    eval_eq!("null", "1 + 2 * 3 - 4", ["3"]);
    eval_eq!("null", "10 / 4", ["2.5"]);
    eval_eq!("null", "10 % 3", ["1"]);
    eval_eq!(r#"{"a": 2, "b": 3}"#, ".a * .b", ["6"]);
    eval_fails!("null", "1 / 0");
    eval_fails!("null", "1 % 0");
    eval_fails!("null", r#""a" - 1"#);
}

#[test]
fn test_add_shapes() {
    eval_eq!("null", r#""foo" + "bar""#, [r#""foobar""#]);
    eval_eq!("null", "[1] + [2]", ["[1, 2]"]);
    eval_eq!("null", r#"{"a": 1} + {"b": 2}"#, [r#"{"a": 1, "b": 2}"#]);
    // Right side wins at the top level.
    eval_eq!("null", r#"{"a": 1} + {"a": 2}"#, [r#"{"a": 2}"#]);
    // Null is the additive identity on both sides.
    eval_eq!("null", "null + 4", ["4"]);
    eval_eq!("null", "[1] + null", ["[1]"]);
}

#[test]
fn test_object_deep_merge() {
    eval_eq!(
        "null",
        r#"{"a": {"x": 1, "y": 2}} * {"a": {"y": 9}}"#,
        [r#"{"a": {"x": 1, "y": 9}}"#]
    );
}

#[test]
fn test_comparison() {
    eval_eq!("null", "1 < 2", ["true"]);
    eval_eq!("null", r#""abc" < "abd""#, ["true"]);
    eval_eq!("null", "2 <= 2", ["true"]);
    eval_eq!("null", "3 > 4", ["false"]);
    eval_fails!("null", r#"1 < "a""#);
}

#[test]
fn test_equality_is_numeric_across_int_and_float() {
    eval_eq!("null", "1 == 1.0", ["true"]);
    eval_eq!("null", "[1, 2] == [1.0, 2.0]", ["true"]);
    eval_eq!("null", r#"{"a": 1} == {"a": 1}"#, ["true"]);
    eval_eq!("null", r#"1 == "1""#, ["false"]);
    eval_eq!("null", "null == null", ["true"]);
    eval_eq!("null", "null == false", ["false"]);
}

#[test]
fn test_boolean_operators() {
    eval_eq!("null", "true and true", ["true"]);
    eval_eq!("null", "true and false", ["false"]);
    eval_eq!("null", "false or true", ["true"]);
    // Everything except null and false is truthy.
    eval_eq!("null", "0 and true", ["true"]);
    eval_eq!("null", r#""" and true"#, ["true"]);
    eval_eq!("null", "[] and {}", ["true"]);
    eval_eq!("null", "null and true", ["false"]);
}

#[test]
fn test_truthiness_table() {
    eval_eq!("null", "null | not", ["true"]);
    eval_eq!("null", "false | not", ["true"]);
    for expr in ["0 | not", r#""" | not"#, "[] | not", "{} | not", "true | not"] {
        let results = evaluate(expr, Value::Null).unwrap();
        assert_eq!(results, vec![Value::Bool(false)], "for {:?}", expr);
    }
}

// =============================================================================
// Alternative, conditionals, try/catch
// =============================================================================

#[test]
fn test_alternative() {
    eval_eq!("null", "null // 5", ["5"]);
    eval_eq!("null", "false // 5", ["5"]);
    eval_eq!("null", "0 // 5", ["0"]);
    eval_eq!("null", r#""" // 5"#, [r#""""#]);
    eval_eq!(r#"{"a": 1}"#, ".missing // 9", ["9"]);
    eval_eq!("null", "(1 / 0) // 9", ["9"]);
}

#[test]
fn test_conditionals() {
    eval_eq!("5", "if . > 3 then \"big\" else \"small\" end", [r#""big""#]);
    eval_eq!("1", "if . > 3 then \"big\" else \"small\" end", [r#""small""#]);
    eval_eq!(
        "2",
        "if . == 1 then \"one\" elif . == 2 then \"two\" else \"many\" end",
        [r#""two""#]
    );
    // Missing else passes the input through.
    eval_eq!("7", "if . > 100 then 0 end", ["7"]);
}

#[test]
fn test_try_catch() {
    eval_eq!(
        r#"{"a": 10, "b": 0}"#,
        r#"try (.a / .b) catch "division error""#,
        [r#""division error""#]
    );
    eval_eq!("null", "try (1 / 0)", []);
    // The handler runs with the failure message as its input.
    eval_eq!("null", "try (1 / 0) catch .", [r#""division by zero""#]);
    eval_eq!("null", r#"try error("boom") catch ."#, [r#""boom""#]);
}

// =============================================================================
// Construction and interpolation
// =============================================================================

#[test]
fn test_array_construction() {
    eval_eq!("null", "[]", ["[]"]);
    eval_eq!(r#"{"a": 1, "b": 2}"#, "[.a, .b]", ["[1, 2]"]);
    eval_eq!("[1, 2, 3]", "[.[] | . * 2]", ["[2, 4, 6]"]);
}

#[test]
fn test_object_construction() {
    eval_eq!(
        r#"{"name": "Alice", "age": 30}"#,
        "{name: .name}",
        [r#"{"name": "Alice"}"#]
    );
    // Shorthand.
    eval_eq!(r#"{"name": "A", "x": 1}"#, "{name}", [r#"{"name": "A"}"#]);
    // Computed keys must be strings.
    eval_eq!(r#"{"k": "id", "v": 7}"#, "{(.k): .v}", [r#"{"id": 7}"#]);
    eval_fails!(r#"{"k": 3}"#, "{(.k): 1}");
}

#[test]
fn test_string_interpolation() {
    eval_eq!(
        r#"{"name": "World"}"#,
        r#""Hello, \(.name)!""#,
        [r#""Hello, World!""#]
    );
    // Numbers render without a trailing fraction, containers as JSON.
    eval_eq!(r#"{"n": 3.0}"#, r#""n=\(.n)""#, [r#""n=3""#]);
    eval_eq!(r#"{"a": [1, 2]}"#, r#""a=\(.a)""#, [r#""a=[1,2]""#]);
    eval_eq!("null", r#""x\(1 + 2)z""#, [r#""x3z""#]);
}

// =============================================================================
// Variables, bindings, reduce
// =============================================================================

#[test]
fn test_variable_binding() {
    eval_eq!(
        r#"{"a": 5}"#,
        ".a as $x | {orig: .a, doubled: ($x * 2)}",
        [r#"{"orig": 5, "doubled": 10}"#]
    );
    // Each bound value runs the body once; outputs concatenate.
    eval_eq!("[1, 2]", ".[] as $x | $x * 10", ["10", "20"]);
    eval_fails!("null", "$undefined");
}

#[test]
fn test_destructuring_binding() {
    eval_eq!(
        r#"{"name": "Ann", "age": 30}"#,
        r#". as {name: $n, age: $a} | [$n, $a]"#,
        [r#"["Ann", 30]"#]
    );
    // Missing pattern fields bind null.
    eval_eq!(r#"{"name": "Ann"}"#, ". as {name: $n, nope: $x} | $x", ["null"]);
    eval_fails!("[1]", ". as {a: $x} | $x");
}

#[test]
fn test_reduce() {
    eval_eq!("[1, 2, 3, 4]", "reduce .[] as $x (0; . + $x)", ["10"]);
    eval_eq!(
        r#"[{"k": "a", "v": 1}, {"k": "b", "v": 2}]"#,
        "reduce .[] as $x ({}; .[$x.k] = $x.v)",
        [r#"{"a": 1, "b": 2}"#]
    );
    eval_eq!("[]", "reduce .[] as $x (100; . + $x)", ["100"]);
}

// =============================================================================
// Assignment family
// =============================================================================

#[test]
fn test_plain_assignment() {
    eval_eq!(r#"{"a": 1}"#, ".a = 5", [r#"{"a": 5}"#]);
    // The right side sees the root, not the path target.
    eval_eq!(r#"{"a": 1, "b": 2}"#, ".a = .b", [r#"{"a": 2, "b": 2}"#]);
    // Missing intermediate mappings are created.
    eval_eq!("{}", ".x.y = 1", [r#"{"x": {"y": 1}}"#]);
    // Missing list slots fill with null.
    eval_eq!("[]", ".[2] = 9", ["[null, null, 9]"]);
}

#[test]
fn test_update_assignment() {
    eval_eq!(r#"{"a": 1}"#, ".a |= . + 10", [r#"{"a": 11}"#]);
    eval_eq!("[1, 2, 3]", ".[] |= . * 2", ["[2, 4, 6]"]);
    eval_eq!(
        r#"{"users": [{"age": 1}, {"age": 2}]}"#,
        ".users[].age |= . + 1",
        [r#"{"users": [{"age": 2}, {"age": 3}]}"#]
    );
}

#[test]
fn test_compound_assignment() {
    eval_eq!(r#"{"n": 5}"#, ".n += 3", [r#"{"n": 8}"#]);
    eval_eq!(r#"{"n": 5}"#, ".n -= 3", [r#"{"n": 2}"#]);
    eval_eq!(r#"{"n": 5}"#, ".n *= 3", [r#"{"n": 15}"#]);
    eval_eq!(r#"{"n": null}"#, ".n //= 7", [r#"{"n": 7}"#]);
    eval_eq!(r#"{"n": 5}"#, ".n //= 7", [r#"{"n": 5}"#]);
}

#[test]
fn test_assignment_rejects_non_paths() {
    eval_fails!("null", "(1 + 2) = 5");
    eval_fails!("null", "length = 5");
}

// =============================================================================
// Path primitives and del
// =============================================================================

#[test]
fn test_path() {
    eval_eq!(r#"{"a": {"b": 1}}"#, "path(.a.b)", [r#"["a", "b"]"#]);
    eval_eq!("[[1], [2]]", "[path(.[].foo)]", [r#"[[0, "foo"], [1, "foo"]]"#]);
    eval_fails!("null", "path(1 + 2)");
}

#[test]
fn test_paths() {
    eval_eq!(
        r#"{"a": [1], "b": 2}"#,
        "[paths]",
        [r#"[["a"], ["a", 0], ["b"]]"#]
    );
    eval_eq!(
        r#"{"a": [1], "b": "s"}"#,
        "[paths(numbers)]",
        [r#"[["a", 0]]"#]
    );
}

#[test]
fn test_getpath_setpath_delpaths() {
    eval_eq!(r#"{"a": {"b": 1}}"#, r#"getpath(["a", "b"])"#, ["1"]);
    eval_eq!(r#"{"a": 1}"#, r#"getpath(["x", "y"])"#, ["null"]);
    eval_eq!("{}", r#"setpath(["a", "b"]; 5)"#, [r#"{"a": {"b": 5}}"#]);
    eval_eq!(
        r#"{"user": {"name": "Alice", "password": "secret", "email": "alice@example.com"}}"#,
        r#"delpaths([["user", "password"]])"#,
        [r#"{"user": {"name": "Alice", "email": "alice@example.com"}}"#]
    );
    // Round-trip: setpath(p; getpath(p)) is the identity on existing paths.
    eval_eq!(
        r#"{"a": {"b": [1, 2]}}"#,
        r#"setpath(["a", "b"]; getpath(["a", "b"]))"#,
        [r#"{"a": {"b": [1, 2]}}"#]
    );
}

#[test]
fn test_del() {
    eval_eq!(r#"{"a": 1, "b": 2}"#, "del(.a)", [r#"{"b": 2}"#]);
    eval_eq!("[1, 2, 3]", "del(.[1])", ["[1, 3]"]);
    eval_eq!("[1, 2, 3, 4]", "del(.[1], .[2])", ["[1, 4]"]);
    eval_eq!(r#"{"a": 1}"#, "del(.zzz)", [r#"{"a": 1}"#]);
    // After deletion the path reads back as null.
    eval_eq!(r#"{"a": {"b": 1}}"#, r#"del(.a.b) | getpath(["a", "b"])"#, ["null"]);
}

// =============================================================================
// Library: collections, arrays, strings
// =============================================================================

#[test]
fn test_length() {
    eval_eq!("[1, 2, 3]", "length", ["3"]);
    eval_eq!(r#"{"a": 1}"#, "length", ["1"]);
    eval_eq!(r#""hello""#, "length", ["5"]);
    eval_eq!("null", "length", ["null"]);
    eval_eq!("-7", "length", ["7"]);
}

#[test]
fn test_keys_and_values() {
    eval_eq!(r#"{"b": 1, "a": 2}"#, "keys", [r#"["a", "b"]"#]);
    eval_eq!(r#"{"b": 1, "a": 2}"#, "keys_unsorted", [r#"["b", "a"]"#]);
    eval_eq!("[9, 8]", "keys", ["[0, 1]"]);
    eval_eq!(r#"{"b": 1, "a": 2}"#, "values", ["[1, 2]"]);
}

#[test]
fn test_has_contains_inside() {
    eval_eq!(r#"{"a": 1}"#, r#"has("a")"#, ["true"]);
    eval_eq!(r#"{"a": 1}"#, r#"has("b")"#, ["false"]);
    eval_eq!("[1, 2]", "has(1)", ["true"]);
    eval_eq!("[1, 2]", "has(5)", ["false"]);
    eval_eq!(r#""foobar""#, r#"contains("oba")"#, ["true"]);
    eval_eq!(
        r#"{"a": {"b": "xyz"}}"#,
        r#"contains({"a": {"b": "y"}})"#,
        ["true"]
    );
    eval_eq!(r#"["a"]"#, r#"inside(["abc", "d"])"#, ["true"]);
}

#[test]
fn test_map_select() {
    eval_eq!("[1, 2, 3]", "map(. + 1)", ["[2, 3, 4]"]);
    eval_eq!(
        r#"{"a": 1, "b": 2}"#,
        "map_values(. * 10)",
        [r#"{"a": 10, "b": 20}"#]
    );
    eval_eq!("[1, 5, 2, 8]", "[.[] | select(. > 3)]", ["[5, 8]"]);
    eval_eq!(
        r#"{"users": [{"name": "Alice", "age": 30}, {"name": "Bob", "age": 25}]}"#,
        "[.users[] | select(.age > 26) | .name]",
        [r#"["Alice"]"#]
    );
}

#[test]
fn test_add_first_last_reverse() {
    eval_eq!("[1, 2, 3]", "add", ["6"]);
    eval_eq!(r#"["a", "b"]"#, "add", [r#""ab""#]);
    eval_eq!("[[1], [2]]", "add", ["[1, 2]"]);
    eval_eq!("[]", "add", ["null"]);
    eval_eq!("[1, 2, 3]", "first", ["1"]);
    eval_eq!("[1, 2, 3]", "last", ["3"]);
    eval_fails!("[]", "first");
    eval_eq!("[1, 2]", "first(.[] | . * 10)", ["10"]);
    eval_eq!("[1, 2]", "last(.[] | . * 10)", ["20"]);
    eval_eq!("[1, 2, 3]", "reverse", ["[3, 2, 1]"]);
}

#[test]
fn test_sort_family() {
    eval_eq!("[3, 1, 2]", "sort", ["[1, 2, 3]"]);
    eval_eq!(
        r#"[null, true, 2, "a", [1], {"x": 1}]"#,
        "sort",
        [r#"[null, true, 2, "a", [1], {"x": 1}]"#]
    );
    eval_eq!(
        r#"[{"n": 2}, {"n": 1}]"#,
        "sort_by(.n)",
        [r#"[{"n": 1}, {"n": 2}]"#]
    );
    eval_eq!("[1, 1.0, 2, 1]", "unique", ["[1, 2]"]);
    eval_eq!(
        r#"[{"k": 1, "id": "x"}, {"k": 1, "id": "y"}, {"k": 2, "id": "z"}]"#,
        "unique_by(.k) | map(.id)",
        [r#"["x", "z"]"#]
    );
    eval_eq!("[2, 9, 4]", "min", ["2"]);
    eval_eq!("[2, 9, 4]", "max", ["9"]);
    eval_eq!("[]", "min", ["null"]);
    eval_eq!(r#"[{"n": 2}, {"n": 9}]"#, "max_by(.n)", [r#"{"n": 9}"#]);
}

#[test]
fn test_group_by() {
    eval_eq!(
        r#"[{"k": "b", "v": 1}, {"k": "a", "v": 2}, {"k": "b", "v": 3}]"#,
        "group_by(.k) | map(map(.v))",
        ["[[1, 3], [2]]"]
    );
}

#[test]
fn test_flatten() {
    eval_eq!("[1, [2, [3]]]", "flatten", ["[1, 2, [3]]"]);
    eval_eq!("[1, [2, [3]]]", "flatten(2)", ["[1, 2, 3]"]);
}

#[test]
fn test_entries() {
    eval_eq!(
        r#"{"a": 1, "b": 2}"#,
        "to_entries",
        [r#"[{"key": "a", "value": 1}, {"key": "b", "value": 2}]"#]
    );
    eval_eq!(
        r#"[{"key": "a", "value": 1}, {"name": "b", "v": 2}, {"k": 3, "value": 4}]"#,
        "from_entries",
        [r#"{"a": 1, "b": 2, "3": 4}"#]
    );
    eval_eq!(
        r#"{"a": 1, "b": 2}"#,
        "with_entries(.value += 10)",
        [r#"{"a": 11, "b": 12}"#]
    );
}

#[test]
fn test_string_library() {
    eval_eq!(r#""a,b,c""#, r#"split(",")"#, [r#"["a", "b", "c"]"#]);
    eval_eq!(r#"["a", "b"]"#, r#"join("-")"#, [r#""a-b""#]);
    eval_eq!(r#""MiXeD""#, "ascii_downcase", [r#""mixed""#]);
    eval_eq!(r#""MiXeD""#, "ascii_upcase", [r#""MIXED""#]);
    eval_eq!(r#""foobar""#, r#"startswith("foo")"#, ["true"]);
    eval_eq!(r#""foobar""#, r#"endswith("bar")"#, ["true"]);
    eval_eq!(r#""foobar""#, r#"ltrimstr("foo")"#, [r#""bar""#]);
    eval_eq!(r#""foobar""#, r#"rtrimstr("bar")"#, [r#""foo""#]);
    eval_eq!(r#""  pad  ""#, "trim", [r#""pad""#]);
    eval_eq!("42", "tostring", [r#""42""#]);
    eval_eq!(r#""3.5""#, "tonumber", ["3.5"]);
    eval_eq!(r#""17""#, "tonumber", ["17"]);
    eval_fails!(r#""abc""#, "tonumber");
}

#[test]
fn test_type_and_filters() {
    eval_eq!("null", "type", [r#""null""#]);
    eval_eq!("true", "type", [r#""boolean""#]);
    eval_eq!("1.5", "type", [r#""number""#]);
    eval_eq!(r#""s""#, "type", [r#""string""#]);
    eval_eq!("[]", "type", [r#""array""#]);
    eval_eq!("{}", "type", [r#""object""#]);
    eval_eq!(
        r#"[1, "a", null, true, [2], {"x": 1}]"#,
        "[.[] | numbers]",
        ["[1]"]
    );
    eval_eq!(
        r#"[1, "a", null, true, [2], {"x": 1}]"#,
        "[.[] | scalars]",
        [r#"[1, "a", null, true]"#]
    );
    eval_eq!(
        r#"[1, "a", [2], {"x": 1}]"#,
        "[.[] | iterables]",
        [r#"[[2], {"x": 1}]"#]
    );
}

// =============================================================================
// Regex library
// =============================================================================

#[test]
fn test_regex_test_and_match() {
    eval_eq!(r#""hello123""#, r#"test("[0-9]+")"#, ["true"]);
    eval_eq!(r#""hello""#, r#"test("^[0-9]+$")"#, ["false"]);
    eval_eq!(r#""abc""#, r#"match("zzz")"#, ["null"]);
    eval_eq!(
        r#""say hello""#,
        r#"match("h(ell)o")"#,
        [r#"{
            "offset": 4,
            "length": 5,
            "string": "hello",
            "captures": [{"offset": 5, "length": 3, "string": "ell", "name": null}]
        }"#]
    );
}

#[test]
fn test_regex_capture() {
    eval_eq!(
        r#""2024-01-15""#,
        r#"capture("(?<year>\\d{4})-(?<month>\\d{2})-(?<day>\\d{2})")"#,
        [r#"{"year": "2024", "month": "01", "day": "15"}"#]
    );
    eval_eq!(r#""nope""#, r#"capture("(?<x>[0-9]+)")"#, ["null"]);
}

#[test]
fn test_regex_sub_gsub() {
    eval_eq!(r#""a-b-c""#, r#"sub("-"; "_")"#, [r#""a_b-c""#]);
    eval_eq!(r#""a-b-c""#, r#"gsub("-"; "_")"#, [r#""a_b_c""#]);
    // Backreferences use the engine's own dollar syntax.
    eval_eq!(
        r#""John Smith""#,
        r#"sub("(?<first>\\w+) (?<last>\\w+)"; "$last, $first")"#,
        [r#""Smith, John""#]
    );
    eval_fails!(r#""x""#, r#"sub("("; "y")"#);
}

// =============================================================================
// Errors, empty, unknown functions
// =============================================================================

#[test]
fn test_error_and_empty() {
    eval_eq!("null", "empty", []);
    eval_eq!("[1, 2]", "[.[] | empty]", ["[]"]);
    eval_fails!("null", r#"error("boom")"#);
    eval_fails!("null", "unknown_function_xyz");
}

#[test]
fn test_immutability() {
    // Evaluation never mutates the input it was handed.
    let input = json(r#"{"a": [1, 2], "b": {"c": 3}}"#);
    let snapshot = input.clone();
    let _ = evaluate(".a[0] = 99", input.clone()).unwrap();
    let _ = evaluate("del(.b)", input.clone()).unwrap();
    let _ = evaluate(".b.c |= . + 1", input.clone()).unwrap();
    assert_eq!(input, snapshot);
}
