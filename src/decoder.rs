//! Decoder parser: header parse, row reconstruction, RLE/anchor
//! resynchronisation, and the security/strict-mode validator
//! (§§4.5/§4.6).
//!
//! Grounded in `ZonDecoder.decode` in
//! `examples/original_source/zon-format/src/zon/decoder.py`, with the header
//! parsing rewritten: the original splits `lines[0]` naively on every `:`,
//! which shatters a multi-column schema's `name:rule` pairs across
//! fragments. This implementation splits only on *top-level* colons via
//! [`canon::split_top_level`], matching the grammar in §6.

use crate::canon;
use crate::dictionary::Dictionary;
use crate::error::{
    DecodeError, DecodeResult, ErrorCode, DEFAULT_ANCHOR_INTERVAL, MAX_ARRAY_LENGTH,
    MAX_DOCUMENT_SIZE, MAX_LINE_LENGTH, MAX_NESTING_DEPTH, MAX_OBJECT_KEYS,
};
use crate::flatten;
use crate::schema::{self, ColumnRule};
use crate::types::{FlatRow, Value};

/// Per-call decoder configuration (§§4.5 supplement): `strict`
/// defaults to `true`, matching the documented default.
#[derive(Debug, Clone, Copy)]
pub struct DecodeOptions {
    pub strict: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions { strict: true }
    }
}

struct Header {
    dict: Dictionary,
    row_count: usize,
    columns: Vec<(String, ColumnRule)>,
    #[allow(dead_code)]
    anchor_interval: u32,
}

/// Decode ZON text back into a [`Value`].
pub fn decode(text: &str, opts: DecodeOptions) -> DecodeResult<Value> {
    if text.len() > MAX_DOCUMENT_SIZE {
        return Err(DecodeError::new(ErrorCode::E301, "document exceeds the maximum size"));
    }

    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    if normalized.trim().is_empty() {
        return Ok(Value::Map(vec![]));
    }
    if normalized.trim() == "[]" {
        return Ok(Value::List(vec![]));
    }

    let lines: Vec<&str> = normalized.split('\n').collect();
    for (i, line) in lines.iter().enumerate() {
        if line.len() > MAX_LINE_LENGTH {
            return Err(DecodeError::new(ErrorCode::E302, "line exceeds the maximum length").at_line(i + 1));
        }
    }

    let Some(first) = lines.iter().position(|l| !l.trim().is_empty()) else {
        return Ok(Value::Map(vec![]));
    };

    if lines[first].trim_start().starts_with('@') {
        decode_table(&lines[first..], opts)
    } else {
        decode_inline(&lines[first..])
    }
}

fn decode_inline(lines: &[&str]) -> DecodeResult<Value> {
    let non_blank: Vec<&&str> = lines.iter().filter(|l| !l.trim().is_empty()).collect();
    if non_blank.len() > MAX_ARRAY_LENGTH {
        return Err(DecodeError::new(ErrorCode::E303, "inline document exceeds the maximum array length"));
    }

    // A single line with no top-level colon is a bare scalar literal (the
    // encoder's counterpart to this case emits it unwrapped, with no `data`
    // key), not a `key:value` record.
    if let [only] = non_blank.as_slice() {
        let trimmed = only.trim();
        if canon::find_top_level_colon(trimmed).is_none() {
            return canon::unpack_checked(trimmed, 0, MAX_NESTING_DEPTH, MAX_ARRAY_LENGTH, MAX_OBJECT_KEYS);
        }
    }

    let records = non_blank
        .into_iter()
        .map(|line| decode_kv_line(line))
        .collect::<DecodeResult<Vec<_>>>()?;

    let mut records = records.into_iter();
    let first = records.next().unwrap_or(Value::Map(vec![]));
    match records.next() {
        None => Ok(unwrap_data_key(first)),
        Some(second) => {
            let mut rest: Vec<Value> = vec![first, second];
            rest.extend(records);
            Ok(Value::List(rest))
        }
    }
}

fn decode_kv_line(line: &str) -> DecodeResult<Value> {
    let mut row: FlatRow = Vec::new();
    for part in canon::split_top_level(line, ',') {
        if part.trim().is_empty() {
            continue;
        }
        let colon = canon::find_top_level_colon(part).ok_or_else(|| {
            DecodeError::new(ErrorCode::E002, "malformed key:value pair in inline document")
                .with_context(part.to_string())
        })?;
        let key = part[..colon].trim().to_string();
        if is_unsafe_key(&key) {
            continue;
        }
        let value = canon::unpack_checked(
            part[colon + 1..].trim(),
            0,
            MAX_NESTING_DEPTH,
            MAX_ARRAY_LENGTH,
            MAX_OBJECT_KEYS,
        )?;
        row.push((key, value));
        if row.len() > MAX_OBJECT_KEYS {
            return Err(DecodeError::new(ErrorCode::E304, "object key count exceeds the maximum"));
        }
    }
    check_nesting(&row)?;
    Ok(flatten::unflatten(&row))
}

/// Unwraps a map with a single list-valued key `data` back to the bare list
/// it wraps (§4.5 step 6) — the counterpart to the encoder's non-tabular-list
/// wrap. Restricted to list values: the encoder never wraps a scalar this
/// way (see [`crate::encoder::encode`]), so a genuine `{"data": <scalar>}` or
/// `{"data": <map>}` map is left alone and round-trips as itself. A genuine
/// `{"data": [...]}` map is still indistinguishable from a wrapped list and
/// will be unwrapped — an accepted ambiguity inherited from the original's
/// own version of the same rule.
fn unwrap_data_key(v: Value) -> Value {
    if let Value::Map(fields) = &v {
        if fields.len() == 1 && fields[0].0 == "data" && matches!(fields[0].1, Value::List(_)) {
            return fields[0].1.clone();
        }
    }
    v
}

fn decode_table(lines: &[&str], opts: DecodeOptions) -> DecodeResult<Value> {
    let header = parse_header(lines[0])?;
    if header.row_count > MAX_ARRAY_LENGTH {
        tracing::warn!(declared = header.row_count, "declared row count exceeds security limit");
        return Err(DecodeError::new(ErrorCode::E303, "declared row count exceeds the maximum array length"));
    }

    let data_lines: Vec<(usize, &str)> = lines[1..]
        .iter()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, l)| (i + 2, *l))
        .collect();

    let mut rows: Vec<FlatRow> = Vec::new();
    let mut prevs: Vec<Option<Value>> = vec![None; header.columns.len()];
    let mut idx = 0usize;

    for (line_no, line) in data_lines {
        if let Some(count) = parse_rle_count(line) {
            if idx.saturating_add(count as usize) > MAX_ARRAY_LENGTH {
                tracing::warn!(line = line_no, "run-length expansion exceeds security limit");
                return Err(DecodeError::new(ErrorCode::E303, "run-length expansion exceeds the maximum array length").at_line(line_no));
            }
            for _ in 0..count {
                let row = predicted_row(&header, idx, &prevs);
                for (c, (_, v)) in row.iter().enumerate() {
                    prevs[c] = Some(v.clone());
                }
                rows.push(row);
                idx += 1;
            }
            continue;
        }

        if idx >= MAX_ARRAY_LENGTH {
            tracing::warn!(line = line_no, "row count exceeds security limit");
            return Err(DecodeError::new(ErrorCode::E303, "row count exceeds the maximum array length").at_line(line_no));
        }

        let cells_src = parse_anchor_rest(line).unwrap_or(line);
        let cells = canon::split_top_level(cells_src, ',');
        let row = decode_data_row(&header, idx, &cells, &prevs, opts, line_no)?;
        for (c, (_, v)) in row.iter().enumerate().take(header.columns.len()) {
            prevs[c] = Some(v.clone());
        }
        rows.push(row);
        idx += 1;
    }

    if opts.strict && rows.len() != header.row_count {
        return Err(DecodeError::new(
            ErrorCode::E001,
            format!(
                "declared row count {} does not match actual row count {}",
                header.row_count,
                rows.len()
            ),
        ));
    }

    let values = rows
        .iter()
        .map(|row| {
            check_nesting(row)?;
            let cleaned: FlatRow = row.iter().filter(|(k, _)| !is_unsafe_key(k)).cloned().collect();
            Ok(flatten::unflatten(&cleaned))
        })
        .collect::<DecodeResult<Vec<_>>>()?;

    Ok(Value::List(values))
}

fn parse_header(line: &str) -> DecodeResult<Header> {
    let line = line.trim();
    let body = line
        .strip_prefix('@')
        .ok_or_else(|| DecodeError::new(ErrorCode::E002, "table header must start with '@'"))?;
    let segments = canon::split_top_level(body, ':');
    if segments.is_empty() {
        return Err(DecodeError::new(ErrorCode::E002, "empty table header"));
    }

    // Pure-list short form (§§6): "@" int ":" col ("," col)*.
    // Every named column is treated as SOLID with no dictionary — this form
    // carries no rule information, only column names.
    if segments.len() >= 2 && segments[0].trim().parse::<usize>().is_ok() {
        let row_count: usize = segments[0].trim().parse().unwrap();
        let cols_csv = segments[1..].join(":");
        let columns = canon::split_top_level(&cols_csv, ',')
            .iter()
            .filter(|s| !s.trim().is_empty())
            .map(|name| (name.trim().to_string(), ColumnRule::Solid))
            .collect();
        return Ok(Header {
            dict: Dictionary::from_entries(vec![]),
            row_count,
            columns,
            anchor_interval: DEFAULT_ANCHOR_INTERVAL,
        });
    }

    let mut dict = Dictionary::from_entries(vec![]);
    let mut schema_seg: Option<&str> = None;
    let mut anchor_interval = DEFAULT_ANCHOR_INTERVAL;

    for seg in &segments[1..] {
        let seg = seg.trim();
        if let Some(rest) = seg.strip_prefix('#') {
            let entries = canon::split_top_level(rest, ',')
                .iter()
                .filter_map(|t| match canon::unpack(t.trim()) {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect();
            dict = Dictionary::from_entries(entries);
        } else if seg.starts_with("schema[") {
            schema_seg = Some(seg);
        } else if let Some(rest) = seg.strip_prefix('@') {
            anchor_interval = rest.trim().parse().unwrap_or(DEFAULT_ANCHOR_INTERVAL);
        }
    }

    let schema_seg =
        schema_seg.ok_or_else(|| DecodeError::new(ErrorCode::E002, "table header is missing a schema segment"))?;
    let (row_count, columns) = parse_schema_segment(schema_seg)?;

    Ok(Header {
        dict,
        row_count,
        columns,
        anchor_interval,
    })
}

fn parse_schema_segment(seg: &str) -> DecodeResult<(usize, Vec<(String, ColumnRule)>)> {
    let open = seg
        .find('[')
        .ok_or_else(|| DecodeError::new(ErrorCode::E002, "malformed schema segment").with_context(seg.to_string()))?;
    let close = seg
        .find(']')
        .ok_or_else(|| DecodeError::new(ErrorCode::E002, "malformed schema segment").with_context(seg.to_string()))?;
    let row_count: usize = seg[open + 1..close]
        .trim()
        .parse()
        .map_err(|_| DecodeError::new(ErrorCode::E002, "invalid declared row count").with_context(seg.to_string()))?;

    let brace_open = seg[close + 1..]
        .find('{')
        .map(|i| close + 1 + i)
        .ok_or_else(|| DecodeError::new(ErrorCode::E002, "malformed schema segment").with_context(seg.to_string()))?;
    let brace_close = seg
        .rfind('}')
        .ok_or_else(|| DecodeError::new(ErrorCode::E002, "malformed schema segment").with_context(seg.to_string()))?;
    let cols_csv = &seg[brace_open + 1..brace_close];

    let columns = canon::split_top_level(cols_csv, ',')
        .iter()
        .filter(|entry| !entry.trim().is_empty())
        .map(|entry| {
            let colon = canon::find_top_level_colon(entry).ok_or_else(|| {
                DecodeError::new(ErrorCode::E002, "column is missing a rule").with_context(entry.to_string())
            })?;
            let name = entry[..colon].trim().to_string();
            let rule = ColumnRule::from_wire(entry[colon + 1..].trim()).ok_or_else(|| {
                DecodeError::new(ErrorCode::E002, "unrecognised column rule").with_context(entry.to_string())
            })?;
            Ok((name, rule))
        })
        .collect::<DecodeResult<Vec<_>>>()?;

    if columns.len() > MAX_OBJECT_KEYS {
        return Err(DecodeError::new(
            ErrorCode::E304,
            "schema declares more columns than the maximum object key count",
        ));
    }

    Ok((row_count, columns))
}

fn parse_rle_count(line: &str) -> Option<u64> {
    let line = line.trim();
    let digits = line.strip_suffix('x')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn parse_anchor_rest(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix('$')?;
    let colon = rest.find(':')?;
    if rest[..colon].is_empty() || !rest[..colon].bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(&rest[colon + 1..])
}

fn predicted_row(header: &Header, idx: usize, prevs: &[Option<Value>]) -> FlatRow {
    header
        .columns
        .iter()
        .enumerate()
        .map(|(c, (name, rule))| {
            let value = schema::predict(rule, idx, prevs[c].as_ref())
                .unwrap_or_else(|| prevs[c].clone().unwrap_or(Value::Null));
            (name.clone(), value)
        })
        .collect()
}

/// Decode one non-RLE row. Missing trailing cells become `null`
/// (§§8 law 12); in strict mode a row with fewer cells than
/// the schema declares raises `E002` instead. Cells beyond the schema are
/// tolerated only in self-describing `name:value` form (§§9's
/// sparse-extension open question) and otherwise silently dropped.
fn decode_data_row(
    header: &Header,
    idx: usize,
    cells: &[&str],
    prevs: &[Option<Value>],
    opts: DecodeOptions,
    line_no: usize,
) -> DecodeResult<FlatRow> {
    if opts.strict && cells.len() < header.columns.len() {
        return Err(DecodeError::new(
            ErrorCode::E002,
            format!(
                "row has {} fields but schema declares {}",
                cells.len(),
                header.columns.len()
            ),
        )
        .at_line(line_no));
    }
    if cells.len() - header.columns.len().min(cells.len()) > MAX_OBJECT_KEYS {
        return Err(DecodeError::new(ErrorCode::E304, "row carries more sparse-extension fields than the maximum object key count").at_line(line_no));
    }

    let mut row = Vec::with_capacity(header.columns.len());
    for (c, (name, rule)) in header.columns.iter().enumerate() {
        let value = match cells.get(c) {
            None => Value::Null,
            Some(tok) if tok.trim().is_empty() => schema::predict(rule, idx, prevs[c].as_ref())
                .unwrap_or_else(|| prevs[c].clone().unwrap_or(Value::Null)),
            Some(tok) => resolve_cell(rule, idx, tok.trim(), prevs[c].as_ref(), &header.dict)?,
        };
        row.push((name.clone(), value));
    }

    for extra in cells.iter().skip(header.columns.len()) {
        if let Some(colon) = canon::find_top_level_colon(extra) {
            let key = extra[..colon].trim().to_string();
            if !is_unsafe_key(&key) {
                let value = canon::unpack_checked(
                    extra[colon + 1..].trim(),
                    0,
                    MAX_NESTING_DEPTH,
                    MAX_ARRAY_LENGTH,
                    MAX_OBJECT_KEYS,
                )?;
                row.push((key, value));
            }
        }
    }

    Ok(row)
}

/// Resolve one present, non-empty cell token: a dictionary reference first,
/// then the packed literal with rule-specific post-processing (specification
/// §4.5 step 4).
fn resolve_cell(
    rule: &ColumnRule,
    idx: usize,
    tok: &str,
    prev: Option<&Value>,
    dict: &Dictionary,
) -> DecodeResult<Value> {
    if let Some(rest) = tok.strip_prefix('%') {
        let i: usize = rest.parse().map_err(|_| {
            DecodeError::new(ErrorCode::E002, "malformed dictionary reference").with_context(tok.to_string())
        })?;
        return dict
            .get(i)
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(|| DecodeError::new(ErrorCode::E002, "dictionary reference out of range").with_context(tok.to_string()));
    }

    let literal = canon::unpack_checked(tok, 0, MAX_NESTING_DEPTH, MAX_ARRAY_LENGTH, MAX_OBJECT_KEYS)?;

    Ok(match rule {
        ColumnRule::Mult { factor } => match literal.as_f64() {
            Some(n) => Value::Float(n / factor),
            None => literal,
        },
        ColumnRule::Enum { values } => match &literal {
            Value::Int(i) if *i >= 0 => values.get(*i as usize).cloned().unwrap_or(literal),
            _ => literal,
        },
        ColumnRule::Delta { base, all_int } => {
            let n = literal.as_f64().unwrap_or(0.0);
            let resolved = if idx == 0 {
                n
            } else {
                prev.and_then(Value::as_f64).unwrap_or(*base) + n
            };
            if *all_int {
                Value::Int(resolved.round() as i64)
            } else {
                Value::Float(resolved)
            }
        }
        _ => literal,
    })
}

fn is_unsafe_key(path: &str) -> bool {
    path.split('.').any(|seg| seg == "__proto__") || path.contains("constructor.prototype")
}

fn check_nesting(row: &FlatRow) -> DecodeResult<()> {
    for (k, _) in row {
        if k.split('.').count() > MAX_NESTING_DEPTH {
            return Err(DecodeError::new(ErrorCode::E304, "nesting depth exceeds the maximum").with_context(k.clone()));
        }
    }
    Ok(())
}
