//! Decoder-focused tests: header parsing, RLE/anchor resynchronisation,
//! dictionary references, and sparse row extensions.

use zon_format::{decode, encode, DecodeOptions, EncodeOptions, Value};

#[test]
fn header_parses_version_dictionary_schema_and_anchor_interval() {
    let header = r#"@1.0.3:#"completed","pending":schema[3]{id:R(1,1),status:E("completed","pending")}:@50"#;
    let text = format!("{header}\n1,0\n2,1\n3,0");
    let v = decode(&text, DecodeOptions::default()).unwrap();
    let list = v.as_list().unwrap();
    assert_eq!(list.len(), 3);
    assert_eq!(list[0].get("id"), Some(&Value::Int(1)));
    assert_eq!(list[0].get("status"), Some(&Value::String("completed".into())));
    assert_eq!(list[1].get("status"), Some(&Value::String("pending".into())));
}

#[test]
fn pure_list_short_form_header_treats_every_column_as_solid() {
    let text = "@2:id,name\nalice\n2,bob";
    let v = decode(text, DecodeOptions { strict: false }).unwrap();
    let list = v.as_list().unwrap();
    assert_eq!(list.len(), 2);
}

#[test]
fn run_length_marker_expands_to_predicted_rows() {
    let header = "@1.0.3:schema[4]{id:R(1,1)}";
    let text = format!("{header}\n4x");
    let v = decode(&text, DecodeOptions::default()).unwrap();
    let list = v.as_list().unwrap();
    assert_eq!(list.len(), 4);
    for (i, row) in list.iter().enumerate() {
        assert_eq!(row.get("id"), Some(&Value::Int(i as i64 + 1)));
    }
}

#[test]
fn anchor_row_prefix_is_stripped_before_cell_parsing() {
    let header = "@1.0.3:schema[2]{status:V(ok)}";
    let text = format!("{header}\n$1:ok\n$2:fail");
    let v = decode(&text, DecodeOptions { strict: false }).unwrap();
    let list = v.as_list().unwrap();
    assert_eq!(list[0].get("status"), Some(&Value::String("ok".into())));
    assert_eq!(list[1].get("status"), Some(&Value::String("fail".into())));
}

#[test]
fn dictionary_reference_out_of_range_is_an_error() {
    let header = r#"@1.0.3:#"completed":schema[1]{status:S}"#;
    let text = format!("{header}\n%5");
    assert!(decode(&text, DecodeOptions::default()).is_err());
}

#[test]
fn sparse_extension_cells_are_merged_into_the_row_non_strict() {
    let header = "@1.0.3:schema[1]{id:S,name:S}";
    let text = format!("{header}\nalice,bob,role:admin,score:98");
    let v = decode(&text, DecodeOptions { strict: false }).unwrap();
    let row = &v.as_list().unwrap()[0];
    assert_eq!(row.get("id"), Some(&Value::String("alice".into())));
    assert_eq!(row.get("name"), Some(&Value::String("bob".into())));
    assert_eq!(row.get("role"), Some(&Value::String("admin".into())));
    assert_eq!(row.get("score"), Some(&Value::Int(98)));
}

#[test]
fn sparse_extension_cells_are_accepted_even_in_strict_mode() {
    let header = "@1.0.3:schema[1]{id:S,name:S}";
    let text = format!("{header}\nalice,bob,role:admin");
    let v = decode(&text, DecodeOptions { strict: true }).unwrap();
    let row = &v.as_list().unwrap()[0];
    assert_eq!(row.get("role"), Some(&Value::String("admin".into())));
}

#[test]
fn crlf_line_endings_are_accepted() {
    let items: Vec<Value> = (1..10).map(|i| Value::Map(vec![("id".into(), Value::Int(i))])).collect();
    let v = Value::List(items);
    let zon = encode(&v, EncodeOptions::default()).unwrap();
    let crlf = zon.replace('\n', "\r\n");
    assert_eq!(decode(&crlf, DecodeOptions::default()).unwrap(), v);
}

#[test]
fn mult_column_divides_back_by_its_factor() {
    let header = "@1.0.3:schema[2]{price:M(100)}";
    let text = format!("{header}\n125\n\n");
    let v = decode(&text, DecodeOptions { strict: false }).unwrap();
    let row = &v.as_list().unwrap()[0];
    assert_eq!(row.get("price"), Some(&Value::Float(1.25)));
}

#[test]
fn delta_column_accumulates_from_its_base() {
    let header = "@1.0.3:schema[3]{ts:\u{394}(1000)}";
    let text = format!("{header}\n1000\n10\n10");
    let v = decode(&text, DecodeOptions::default()).unwrap();
    let list = v.as_list().unwrap();
    assert_eq!(list[0].get("ts"), Some(&Value::Int(1000)));
    assert_eq!(list[1].get("ts"), Some(&Value::Int(1010)));
    assert_eq!(list[2].get("ts"), Some(&Value::Int(1020)));
}
