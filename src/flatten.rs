//! Dotted-key flattening and unflattening (specification §4.1).

use crate::types::{FlatRow, Value};

/// Flatten a map into an ordered dotted-key row. Lists and empty maps are
/// leaves; non-empty maps recurse with `key.` prefixed onto their children.
pub fn flatten(m: &Value) -> FlatRow {
    if let Value::Map(fields) = m {
        if fields.is_empty() {
            return Vec::new();
        }
    }
    let mut row = Vec::new();
    flatten_into(m, "", &mut row);
    row
}

fn flatten_into(v: &Value, prefix: &str, out: &mut FlatRow) {
    match v {
        Value::Map(fields) if !fields.is_empty() => {
            for (k, child) in fields {
                let path = if prefix.is_empty() {
                    k.clone()
                } else {
                    format!("{prefix}.{k}")
                };
                flatten_into(child, &path, out);
            }
        }
        leaf => out.push((prefix.to_string(), leaf.clone())),
    }
}

/// Reverse `flatten`: split each key on `.`, walk/create intermediate maps,
/// and set the terminal leaf. A dotted path that would overwrite a
/// non-map intermediate value silently drops the conflicting leaf —
/// see specification §9, "Key-collision in unflatten".
pub fn unflatten(row: &FlatRow) -> Value {
    let mut root: Vec<(String, Value)> = Vec::new();
    for (path, value) in row {
        set_path(&mut root, path.split('.').collect::<Vec<_>>().as_slice(), value.clone());
    }
    Value::Map(root)
}

fn set_path(map: &mut Vec<(String, Value)>, segments: &[&str], value: Value) {
    let Some((&head, rest)) = segments.split_first() else {
        return;
    };
    if rest.is_empty() {
        if let Some(entry) = map.iter_mut().find(|(k, _)| k == head) {
            entry.1 = value;
        } else {
            map.push((head.to_string(), value));
        }
        return;
    }
    match map.iter_mut().find(|(k, _)| k == head) {
        Some((_, Value::Map(child))) => set_path(child, rest, value),
        Some(_) => { /* intermediate key exists as a non-map leaf: drop the conflicting path */ }
        None => {
            let mut child = Vec::new();
            set_path(&mut child, rest, value);
            map.push((head.to_string(), Value::Map(child)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_recurses_into_nested_maps() {
        let v = Value::Map(vec![(
            "a".into(),
            Value::Map(vec![(
                "b".into(),
                Value::Map(vec![("c".into(), Value::Int(1))]),
            )]),
        )]);
        assert_eq!(flatten(&v), vec![("a.b.c".to_string(), Value::Int(1))]);
    }

    #[test]
    fn flatten_keeps_lists_and_empty_maps_as_leaves() {
        let v = Value::Map(vec![
            ("xs".into(), Value::List(vec![Value::Int(1)])),
            ("empty".into(), Value::Map(vec![])),
        ]);
        let row = flatten(&v);
        assert_eq!(row[0], ("xs".to_string(), Value::List(vec![Value::Int(1)])));
        assert_eq!(row[1], ("empty".to_string(), Value::Map(vec![])));
    }

    #[test]
    fn unflatten_reverses_flatten() {
        let row: FlatRow = vec![
            ("a.b.c".to_string(), Value::Int(1)),
            ("a.b.d".to_string(), Value::Int(2)),
            ("e".to_string(), Value::Bool(true)),
        ];
        let rebuilt = unflatten(&row);
        assert_eq!(rebuilt.get("a").unwrap().get("b").unwrap().get("c"), Some(&Value::Int(1)));
        assert_eq!(rebuilt.get("a").unwrap().get("b").unwrap().get("d"), Some(&Value::Int(2)));
        assert_eq!(rebuilt.get("e"), Some(&Value::Bool(true)));
    }

    #[test]
    fn unflatten_drops_collision_instead_of_overwriting() {
        // "a" is set as a leaf first, then "a.b" tries to walk into it as a map.
        let row: FlatRow = vec![
            ("a".to_string(), Value::Int(1)),
            ("a.b".to_string(), Value::Int(2)),
        ];
        let rebuilt = unflatten(&row);
        assert_eq!(rebuilt.get("a"), Some(&Value::Int(1)));
    }

    #[test]
    fn flatten_of_empty_root_map_is_empty_row() {
        assert_eq!(flatten(&Value::Map(vec![])), Vec::new());
    }

    #[test]
    fn flatten_roundtrips_through_unflatten() {
        let v = Value::Map(vec![
            ("a".into(), Value::Map(vec![("b".into(), Value::Int(1))])),
            ("c".into(), Value::String("x".into())),
        ]);
        assert_eq!(unflatten(&flatten(&v)), v);
    }
}
