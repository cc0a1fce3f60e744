//! End-to-end tests for the value model
//!
//! These exercise the public API the way the interpreter does: building
//! values, sharing them, mutating through the consuming operations, and
//! checking that sharing, ordering, and error-channel contracts hold.

use sift_core::{ITER_FINISHED, Kind, Value};

fn obj(entries: &[(&str, Value)]) -> Value {
    let mut o = Value::object();
    for (k, v) in entries {
        o = o.object_set(Value::string(k), v.clone());
    }
    o
}

fn arr(elems: &[Value]) -> Value {
    let mut a = Value::array();
    for v in elems {
        a = a.array_append(v.clone());
    }
    a
}

#[test]
fn test_object_insertion_order_and_length() {
    let o = Value::object()
        .object_set(Value::string("a"), Value::number(1.0))
        .object_set(Value::string("b"), Value::number(2.0));
    assert_eq!(o.object_length(), 2);
    let keys: Vec<String> = o
        .object_entries()
        .map(|(k, _)| k.string_value().to_owned())
        .collect();
    assert_eq!(keys, ["a", "b"]);
}

#[test]
fn test_rehash_keeps_all_entries_readable_in_order() {
    let names: Vec<String> = (0..9).map(|i| format!("k{i}")).collect();
    let mut o = Value::object();
    for (i, name) in names.iter().enumerate() {
        o = o.object_set(Value::string(name), Value::number(i as f64));
    }
    assert_eq!(o.object_length(), 9);
    for (i, name) in names.iter().enumerate() {
        assert_eq!(o.object_get(&Value::string(name)).number_value(), i as f64);
    }
    let keys: Vec<String> = o
        .object_entries()
        .map(|(k, _)| k.string_value().to_owned())
        .collect();
    assert_eq!(keys, names);
}

#[test]
fn test_sparse_array_set_fills_with_null() {
    let a = Value::array().array_set(3, Value::string("x"));
    assert_eq!(a.array_length(), 4);
    assert!(matches!(a.array_get(0), Value::Null));
    assert!(matches!(a.array_get(2), Value::Null));
    assert_eq!(a.array_get(3).string_value(), "x");
}

#[test]
fn test_split_with_trailing_separator() {
    let parts = Value::string("a,b,,c,").string_split(Value::string(","));
    let got: Vec<String> = parts
        .array_iter()
        .map(|v| v.string_value().to_owned())
        .collect();
    assert_eq!(got, ["a", "b", "", "c", ""]);
}

#[test]
fn test_string_repeat() {
    assert_eq!(
        Value::string("ab").string_repeat(3).string_value(),
        "ababab"
    );
    assert!(matches!(Value::string("x").string_repeat(-1), Value::Null));
}

#[cfg(feature = "decimal")]
#[test]
fn test_literal_precision_and_equality() {
    let n = Value::number_with_literal("1.10");
    assert_eq!(n.number_get_literal(), Some("1.10"));
    assert_eq!(n.number_value(), 1.1);
    let m = Value::number_with_literal("1.1");
    assert_eq!(n.number_cmp(&m), std::cmp::Ordering::Equal);
    assert!(n == m);
}

#[test]
fn test_containment_descends_structures() {
    let haystack = obj(&[(
        "a",
        obj(&[(
            "b",
            arr(&[Value::number(1.0), Value::number(2.0), Value::number(3.0)]),
        )]),
    )]);
    let hit = obj(&[("a", obj(&[("b", arr(&[Value::number(2.0)]))]))]);
    let miss = obj(&[("a", obj(&[("b", arr(&[Value::number(4.0)]))]))]);
    assert!(haystack.contains(&hit));
    assert!(!haystack.contains(&miss));
}

#[test]
fn test_shared_values_observe_original_contents() {
    let a = arr(&[Value::number(1.0), Value::number(2.0)]);
    let b = a.clone();
    let mutated = a.array_set(0, Value::number(99.0));
    assert_eq!(b.array_get(0).number_value(), 1.0);
    assert_eq!(mutated.array_get(0).number_value(), 99.0);

    let o = obj(&[("k", Value::number(1.0))]);
    let shared = o.clone();
    let mutated = shared.object_set(Value::string("k"), Value::number(2.0));
    assert_eq!(o.object_get(&Value::string("k")).number_value(), 1.0);
    assert_eq!(mutated.object_get(&Value::string("k")).number_value(), 2.0);
}

#[test]
fn test_refcounts_pair_up() {
    let v = Value::string("counted");
    assert_eq!(v.refcnt(), 1);
    {
        let s1 = v.clone();
        let s2 = v.clone();
        assert_eq!(v.refcnt(), 3);
        drop(s1);
        assert_eq!(v.refcnt(), 2);
        drop(s2);
    }
    assert_eq!(v.refcnt(), 1);
}

#[test]
fn test_child_outlives_released_parent() {
    let elem = Value::string("kept alive");
    let a = arr(&[elem.clone()]);
    assert_eq!(elem.refcnt(), 2);
    let fetched = a.array_get(0);
    drop(a);
    assert_eq!(fetched.string_value(), "kept alive");
    assert_eq!(elem.refcnt(), 2);
}

#[test]
fn test_slices_recompose_the_array() {
    let a = arr(&[
        Value::number(0.0),
        Value::number(1.0),
        Value::number(2.0),
        Value::number(3.0),
        Value::number(4.0),
    ]);
    let len = a.array_length() as i32;
    let fix = |mut i: i32| {
        if i < 0 {
            i += len;
        }
        i.clamp(0, len)
    };
    for (s, e) in [(0, 5), (1, 3), (2, 2), (-3, -1), (4, 100), (-100, 2), (3, 1)] {
        let (s1, e1) = (fix(s), fix(e).max(fix(s)));
        assert_eq!(
            a.clone().array_slice(s, e).array_length(),
            (e1 - s1) as usize,
            "slice length for ({s}, {e})"
        );
        let rebuilt = a
            .clone()
            .array_slice(0, s1)
            .array_concat(a.clone().array_slice(s1, e1))
            .array_concat(a.clone().array_slice(e1, len));
        assert!(rebuilt == a, "recomposition for ({s}, {e})");
    }
}

#[test]
fn test_absent_versus_error_invalids() {
    let absent = Value::array().array_get(0);
    assert_eq!(absent.kind(), Kind::Invalid);
    assert!(!absent.invalid_has_msg());

    let error = Value::array().array_set(-5, Value::Null);
    assert_eq!(error.kind(), Kind::Invalid);
    assert!(error.invalid_has_msg());
    assert_eq!(
        error.invalid_get_msg().string_value(),
        "Out of bounds negative array index"
    );
}

#[test]
fn test_iter_protocol_matches_entries() {
    let o = obj(&[
        ("x", Value::number(1.0)),
        ("y", Value::number(2.0)),
        ("z", Value::number(3.0)),
    ]);
    let mut via_protocol = Vec::new();
    let mut it = o.object_iter();
    while Value::object_iter_valid(it) {
        via_protocol.push(o.object_iter_key(it).string_value().to_owned());
        it = o.object_iter_next(it);
    }
    assert_eq!(it, ITER_FINISHED);
    let via_entries: Vec<String> = o
        .object_entries()
        .map(|(k, _)| k.string_value().to_owned())
        .collect();
    assert_eq!(via_protocol, via_entries);
}

#[test]
fn test_equality_is_structural_across_sharing() {
    let a = obj(&[("n", Value::number(1.0)), ("s", Value::string("t"))]);
    let b = a.clone();
    let c = obj(&[("s", Value::string("t")), ("n", Value::number(1.0))]);
    assert!(a == b);
    assert!(a == c);
    assert!(a.identical(&b));
    assert!(!a.identical(&c));
}

#[test]
fn test_explode_implode_identity() {
    for text in ["", "plain", "héllo 世界", "mix\u{FFFD}ed"] {
        let back = Value::string(text).string_explode().string_implode();
        assert_eq!(back.string_value(), text);
    }
}

#[test]
fn test_serialization_roundtrip() {
    let v = obj(&[
        ("list", arr(&[Value::number(1.0), Value::string("two")])),
        ("flag", Value::bool(true)),
    ]);
    let bytes = sift_core::to_bytes(&v).unwrap();
    let back = sift_core::from_bytes(&bytes).unwrap();
    assert!(v == back);
}
