//! End-to-end `decode(encode(v)) == v` coverage, including the concrete
//! scenario table documented for strategy selection and error handling.

use zon_format::{decode, encode, DecodeOptions, EncodeOptions, Value};

fn assert_roundtrip(v: &Value) {
    let zon = encode(v, EncodeOptions::default()).expect("encode failed");
    let back = decode(&zon, DecodeOptions::default()).expect("decode failed");
    assert_eq!(&back, v, "roundtrip mismatch\n  zon: {zon:?}");
}

// ============================================================================
// Primitives
// ============================================================================

#[test]
fn roundtrip_null() {
    assert_roundtrip(&Value::Map(vec![("v".into(), Value::Null)]));
}

#[test]
fn roundtrip_bool_true_and_false() {
    assert_roundtrip(&Value::Map(vec![
        ("a".into(), Value::Bool(true)),
        ("b".into(), Value::Bool(false)),
    ]));
}

#[test]
fn roundtrip_negative_integer() {
    assert_roundtrip(&Value::Map(vec![("v".into(), Value::Int(-7))]));
}

#[test]
fn roundtrip_float() {
    assert_roundtrip(&Value::Map(vec![("v".into(), Value::Float(3.14))]));
}

#[test]
fn roundtrip_empty_string() {
    assert_roundtrip(&Value::Map(vec![("v".into(), Value::String(String::new()))]));
}

#[test]
fn roundtrip_string_with_newline_tab_and_quote() {
    assert_roundtrip(&Value::Map(vec![(
        "v".into(),
        Value::String("line1\nline2\tcol\"q\"".into()),
    )]));
}

#[test]
fn roundtrip_string_with_backslash() {
    assert_roundtrip(&Value::Map(vec![(
        "v".into(),
        Value::String("C:\\path\\to\\file".into()),
    )]));
}

// ============================================================================
// Objects
// ============================================================================

#[test]
fn roundtrip_flat_object() {
    assert_roundtrip(&Value::Map(vec![
        ("name".into(), Value::String("Alice".into())),
        ("age".into(), Value::Int(30)),
        ("active".into(), Value::Bool(true)),
    ]));
}

#[test]
fn roundtrip_nested_object() {
    assert_roundtrip(&Value::Map(vec![(
        "server".into(),
        Value::Map(vec![
            ("host".into(), Value::String("localhost".into())),
            ("port".into(), Value::Int(8080)),
        ]),
    )]));
}

#[test]
fn roundtrip_object_with_empty_map_leaf() {
    assert_roundtrip(&Value::Map(vec![
        ("meta".into(), Value::Map(vec![])),
        ("id".into(), Value::Int(1)),
    ]));
}

#[test]
fn roundtrip_list_leaf_inside_object() {
    assert_roundtrip(&Value::Map(vec![(
        "tags".into(),
        Value::List(vec![Value::String("a".into()), Value::String("b".into())]),
    )]));
}

// ============================================================================
// Scenario table: strategy selection and error-handling walkthroughs
// ============================================================================

#[test]
fn scenario_1_range_rule_with_trailing_rle() {
    let items: Vec<Value> = (1..=20).map(|i| Value::Map(vec![("id".into(), Value::Int(i))])).collect();
    let v = Value::List(items);
    let zon = encode(&v, EncodeOptions::default()).unwrap();
    assert!(zon.contains("R(1,1)"));
    assert!(zon.contains("19x"));
    assert_eq!(decode(&zon, DecodeOptions::default()).unwrap(), v);
}

#[test]
fn scenario_2_value_or_liquid_rule_with_rle() {
    let items: Vec<Value> = (0..5)
        .map(|_| Value::Map(vec![("status".into(), Value::String("active".into()))]))
        .collect();
    let v = Value::List(items);
    let zon = encode(&v, EncodeOptions::default()).unwrap();
    assert!(zon.contains("V(active)") || zon.contains(":L"));
    assert!(zon.contains('x'));
    assert_eq!(decode(&zon, DecodeOptions::default()).unwrap(), v);
}

#[test]
fn scenario_3_pattern_rule_for_zero_padded_ids() {
    let items: Vec<Value> = (1..50)
        .map(|i| Value::Map(vec![("id".into(), Value::String(format!("ORD-{i:03}")))]))
        .collect();
    let v = Value::List(items);
    let zon = encode(&v, EncodeOptions::default()).unwrap();
    assert!(zon.contains("P(ORD-{:03d},1,1)"));
    assert_eq!(decode(&zon, DecodeOptions::default()).unwrap(), v);
}

#[test]
fn scenario_4_large_integer_has_no_scientific_notation() {
    let v = Value::Map(vec![("value".into(), Value::Int(1_000_000))]);
    let zon = encode(&v, EncodeOptions::default()).unwrap();
    assert!(zon.contains("1000000"));
    assert!(!zon.contains('e') && !zon.contains('E'));
}

#[test]
fn scenario_5_nan_and_infinity_become_null() {
    let v = Value::Map(vec![
        ("a".into(), Value::Float(f64::NAN)),
        ("b".into(), Value::Float(f64::INFINITY)),
    ]);
    let zon = encode(&v, EncodeOptions::default()).unwrap();
    assert_eq!(zon, "a:null,b:null");
    let back = decode(&zon, DecodeOptions::default()).unwrap();
    assert_eq!(back.get("a"), Some(&Value::Null));
    assert_eq!(back.get("b"), Some(&Value::Null));
}

#[test]
fn scenario_7_and_8_declared_row_count_mismatch() {
    let header = "@1.0.3:schema[3]{id:S}";
    let text = format!("{header}\n1\n2");

    let err = decode(&text, DecodeOptions { strict: true }).unwrap_err();
    assert_eq!(err.code, zon_format::ErrorCode::E001);

    let tolerant = decode(&text, DecodeOptions { strict: false }).unwrap();
    assert_eq!(tolerant.as_list().unwrap().len(), 2);
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn encode_is_deterministic_across_repeated_calls() {
    let items: Vec<Value> = (1..30)
        .map(|i| {
            Value::Map(vec![
                ("id".into(), Value::Int(i)),
                ("name".into(), Value::String(format!("user-{i}"))),
            ])
        })
        .collect();
    let v = Value::List(items);
    let first = encode(&v, EncodeOptions::default()).unwrap();
    let second = encode(&v, EncodeOptions::default()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn schema_columns_are_sorted_lexicographically() {
    let items: Vec<Value> = (0..3)
        .map(|i| {
            Value::Map(vec![
                ("zeta".into(), Value::Int(i)),
                ("alpha".into(), Value::Int(i)),
                ("mid".into(), Value::Int(i)),
            ])
        })
        .collect();
    let zon = encode(&Value::List(items), EncodeOptions::default()).unwrap();
    let header = zon.lines().next().unwrap();
    let alpha_pos = header.find("alpha").unwrap();
    let mid_pos = header.find("mid").unwrap();
    let zeta_pos = header.find("zeta").unwrap();
    assert!(alpha_pos < mid_pos && mid_pos < zeta_pos);
}
