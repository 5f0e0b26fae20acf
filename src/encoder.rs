//! Encoder driver: inline/table dispatch, schema header emission, row
//! streaming with run-length folding and anchors (§§4.4).
//!
//! Grounded step-for-step in `ZonEncoder.encode` in
//! `examples/original_source/zon-format/src/zon/encoder.py`, with one
//! correction: the original's per-cell "does this match its predicted
//! value" check omits `PATTERN` columns (so a `PATTERN` cell is always
//! written literally even inside an otherwise-broken row), while its
//! row-level run-length check *does* treat `PATTERN` as predictable. That
//! asymmetry looks like an oversight rather than a deliberate choice, and
//! the format's documented behavior (§4.4 step 4) draws no such distinction, so
//! this implementation uses [`crate::schema::predict`] uniformly for both
//! checks.

use crate::canon::{self, pack};
use crate::dictionary::Dictionary;
use crate::error::{EncodeError, EncodeResult};
use crate::flatten;
use crate::schema::{self, ColumnRule};
use crate::error::DEFAULT_ANCHOR_INTERVAL;
use crate::types::{row_lookup, FlatRow, Value};
use crate::WIRE_VERSION;

/// Per-call encoder configuration (§§4.4 supplement): the
/// anchor interval `K`, with `Default` reproducing the documented
/// stated default of 100.
#[derive(Debug, Clone, Copy)]
pub struct EncodeOptions {
    pub anchor_interval: u32,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        EncodeOptions {
            anchor_interval: DEFAULT_ANCHOR_INTERVAL,
        }
    }
}

/// Encode a value to ZON text.
///
/// A bare list of more than one map is emitted in table mode (schema
/// header, dictionary, run-length/anchor row stream); a map is emitted as a
/// single inline `key:value` line; a non-tabular list (empty, single-element,
/// or mixing maps with other values) is wrapped under a synthetic `data` key
/// so the inline grammar (which only knows `key:packed` pairs) can carry it —
/// [`crate::decoder`] reverses the wrap on the way back out, and only for a
/// list-valued `data`, per §4.5 step 6. A scalar root carries no keys at all,
/// so it is emitted as a bare packed literal instead of being wrapped: wrapping
/// it under `data` would make a genuine `{"data": <scalar>}` map
/// indistinguishable from the wrapper on decode.
pub fn encode(value: &Value, opts: EncodeOptions) -> EncodeResult<String> {
    match value {
        Value::List(items) if items.is_empty() => Ok("[]".to_string()),
        Value::List(items) if items.len() > 1 && items.iter().all(|v| v.is_map()) => {
            encode_table(items, &opts)
        }
        Value::Map(_) => Ok(encode_inline_rows(&[flatten::flatten(value)])),
        Value::List(_) => {
            let wrapped = Value::Map(vec![("data".to_string(), value.clone())]);
            Ok(encode_inline_rows(&[flatten::flatten(&wrapped)]))
        }
        scalar => Ok(pack(scalar)),
    }
}

fn encode_inline_rows(rows: &[FlatRow]) -> String {
    rows.iter()
        .map(|row| {
            row.iter()
                .map(|(k, v)| format!("{k}:{}", pack(v)))
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn encode_table(items: &[Value], opts: &EncodeOptions) -> EncodeResult<String> {
    let rows: Vec<FlatRow> = items.iter().map(flatten::flatten).collect();

    let mut keys: Vec<String> = rows
        .iter()
        .flat_map(|r| r.iter().map(|(k, _)| k.clone()))
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect();
    keys.sort();

    let lookups: Vec<_> = rows.iter().map(row_lookup).collect();
    let columns: Vec<Vec<Value>> = keys
        .iter()
        .map(|k| {
            lookups
                .iter()
                .map(|row| (*row.get(k.as_str()).unwrap_or(&&Value::Null)).clone())
                .collect()
        })
        .collect();

    let dict = Dictionary::build(&rows);
    let rules: Vec<ColumnRule> = columns.iter().map(|vals| schema::analyze_column(vals)).collect();

    for (key, rule) in keys.iter().zip(rules.iter()) {
        tracing::debug!(column = %key, rule = %rule.to_wire(), "column analyser selected strategy");
    }

    let header = build_header(rows.len(), &keys, &rules, &dict, opts.anchor_interval);
    let mut output = vec![header];

    let mut prevs: Vec<Option<Value>> = vec![None; keys.len()];
    let mut pending_rle = 0u32;

    for i in 0..rows.len() {
        let is_anchor = i == 0 || (i as u32 + 1) % opts.anchor_interval == 0;
        let actual: Vec<&Value> = (0..keys.len()).map(|c| &columns[c][i]).collect();

        let is_predictable = !is_anchor
            && rules.iter().enumerate().all(|(c, rule)| {
                schema::predict(rule, i, prevs[c].as_ref()).as_ref() == Some(actual[c])
            });

        if is_predictable {
            pending_rle += 1;
            for c in 0..keys.len() {
                prevs[c] = Some(actual[c].clone());
            }
            continue;
        }

        if pending_rle > 0 {
            output.push(format!("{pending_rle}x"));
            pending_rle = 0;
        }

        let mut cells = Vec::with_capacity(keys.len());
        for c in 0..keys.len() {
            let predicted = schema::predict(&rules[c], i, prevs[c].as_ref());
            let cell = if !is_anchor && predicted.as_ref() == Some(actual[c]) {
                String::new()
            } else {
                encode_cell(&rules[c], i, actual[c], prevs[c].as_ref(), &dict)
            };
            cells.push(cell);
            prevs[c] = Some(actual[c].clone());
        }

        let joined = cells.join(",");
        output.push(if is_anchor {
            format!("${}:{joined}", i + 1)
        } else {
            joined
        });
    }

    if pending_rle > 0 {
        output.push(format!("{pending_rle}x"));
    }

    Ok(output.join("\n"))
}

fn build_header(
    row_count: usize,
    keys: &[String],
    rules: &[ColumnRule],
    dict: &Dictionary,
    anchor_interval: u32,
) -> String {
    let dict_segment = if dict.is_empty() {
        String::new()
    } else {
        let csv = dict
            .entries
            .iter()
            .map(|s| pack(&Value::String(s.clone())))
            .collect::<Vec<_>>()
            .join(",");
        format!(":#{csv}")
    };
    let cols = keys
        .iter()
        .zip(rules.iter())
        .map(|(k, r)| format!("{k}:{}", r.to_wire()))
        .collect::<Vec<_>>()
        .join(",");
    format!("@{WIRE_VERSION}{dict_segment}:schema[{row_count}]{{{cols}}}:@{anchor_interval}")
}

/// Encode one cell's literal form, applying the rule-specific transform
/// before falling back to a dictionary reference or a plain packed literal
/// — in that priority order, matching the original encoder.
fn encode_cell(rule: &ColumnRule, idx: usize, value: &Value, prev: Option<&Value>, dict: &Dictionary) -> String {
    match rule {
        ColumnRule::Mult { factor } if value.is_numeric() => {
            let scaled = (value.as_f64().unwrap() * factor).round() as i64;
            scaled.to_string()
        }
        ColumnRule::Enum { values } => match values.iter().position(|v| v == value) {
            Some(pos) => pos.to_string(),
            None => pack_or_dict_ref(value, dict),
        },
        ColumnRule::Delta { base, .. } if idx > 0 && value.is_numeric() => {
            let prev_num = prev.and_then(Value::as_f64).unwrap_or(*base);
            let diff = (value.as_f64().unwrap() - prev_num) as i64;
            diff.to_string()
        }
        _ => pack_or_dict_ref(value, dict),
    }
}

fn pack_or_dict_ref(value: &Value, dict: &Dictionary) -> String {
    if let Value::String(s) = value {
        if let Some(i) = dict.index_of(s) {
            return format!("%{i}");
        }
    }
    canon::pack(value)
}

/// Reserved for a future `Value` representation that admits sharing (e.g.
/// `Rc`-based graphs) — a plain owned [`Value`] cannot contain a cycle, so
/// this is unreachable today. See [`EncodeError::CircularReference`].
#[allow(dead_code)]
fn detect_cycle(_value: &Value) -> EncodeResult<()> {
    Ok(())
}
