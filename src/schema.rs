//! Column rules and the entropy-tournament analyser (§§4.2).
//!
//! Eight strategies are tried in a fixed order — RANGE, PATTERN, MULT, ENUM,
//! VALUE, DELTA, LIQUID, SOLID — and the first to beat the running lowest
//! cost wins; ties keep whichever strategy was tried earlier. This mirrors
//! `_analyze_columns` in `examples/original_source/zon-format/src/zon/encoder.py`,
//! which tries the same eight strategies in the same order with a strict
//! `cost < best_cost` comparison.
//!
//! One deliberate departure from the original: its `ENUM` candidate order
//! comes from `list(set(hashable_vals))`, which is not guaranteed stable
//! across runs in Python. The documented determinism law (§8 law 3)
//! rules that out here — candidates are ordered by first appearance in the
//! column instead, which is both deterministic and cheap to compute.

use crate::canon::{self, pack};
use crate::types::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnRule {
    Solid,
    Liquid,
    Range {
        start: f64,
        step: f64,
        all_int: bool,
    },
    Pattern {
        prefix: String,
        suffix: String,
        width: usize,
        start: i64,
        step: i64,
    },
    Mult {
        factor: f64,
    },
    Enum {
        values: Vec<Value>,
    },
    Value {
        default: Value,
    },
    Delta {
        base: f64,
        all_int: bool,
    },
}

impl ColumnRule {
    /// Serialise to the grammar form used in a schema header
    /// (§§4.4 step 3 / §6 `rule`).
    pub fn to_wire(&self) -> String {
        match self {
            ColumnRule::Solid => "S".to_string(),
            ColumnRule::Liquid => "L".to_string(),
            ColumnRule::Range { start, step, .. } => {
                format!("R({},{})", canon::format_float(*start), canon::format_float(*step))
            }
            ColumnRule::Pattern {
                prefix,
                suffix,
                width,
                start,
                step,
            } => {
                let tmpl = format!("{prefix}{{:0{width}d}}{suffix}");
                format!("P({tmpl},{start},{step})")
            }
            ColumnRule::Mult { factor } => format!("M({})", canon::format_float(*factor)),
            ColumnRule::Enum { values } => {
                let inner: Vec<String> = values.iter().map(pack).collect();
                format!("E({})", inner.join(","))
            }
            ColumnRule::Value { default } => format!("V({})", pack(default)),
            ColumnRule::Delta { base, .. } => format!("Δ({})", canon::format_float(*base)),
        }
    }

    /// Parse the inverse of [`ColumnRule::to_wire`].
    pub fn from_wire(s: &str) -> Option<ColumnRule> {
        let s = s.trim();
        if s == "S" {
            return Some(ColumnRule::Solid);
        }
        if s == "L" {
            return Some(ColumnRule::Liquid);
        }
        if let Some(args) = strip_call(s, "R") {
            let parts = canon::split_top_level(args, ',');
            if parts.len() != 2 {
                return None;
            }
            let start: f64 = parts[0].trim().parse().ok()?;
            let step: f64 = parts[1].trim().parse().ok()?;
            return Some(ColumnRule::Range {
                start,
                step,
                all_int: start.fract() == 0.0 && step.fract() == 0.0,
            });
        }
        if let Some(args) = strip_call(s, "P") {
            let parts = canon::split_top_level(args, ',');
            if parts.len() != 3 {
                return None;
            }
            let tmpl = parts[0].trim();
            let start: i64 = parts[1].trim().parse().ok()?;
            let step: i64 = parts[2].trim().parse().ok()?;

            // tmpl is `{prefix}{:0{width}d}{suffix}` — a Python-style
            // zero-padded format spec, raw/unquoted (not a packed string
            // literal), matching the reference encoder.
            let open = tmpl.find("{:0")?;
            let after = &tmpl[open + 3..];
            let d_pos = after.find('d')?;
            let width: usize = after[..d_pos].parse().ok()?;
            if after.as_bytes().get(d_pos + 1) != Some(&b'}') {
                return None;
            }
            let prefix = tmpl[..open].to_string();
            let suffix = after[d_pos + 2..].to_string();
            return Some(ColumnRule::Pattern {
                prefix,
                suffix,
                width,
                start,
                step,
            });
        }
        if let Some(args) = strip_call(s, "M") {
            let factor: f64 = args.trim().parse().ok()?;
            return Some(ColumnRule::Mult { factor });
        }
        if let Some(args) = strip_call(s, "E") {
            let values = if args.trim().is_empty() {
                vec![]
            } else {
                canon::split_top_level(args, ',')
                    .iter()
                    .map(|t| canon::unpack(t.trim()))
                    .collect()
            };
            return Some(ColumnRule::Enum { values });
        }
        if let Some(args) = strip_call(s, "V") {
            return Some(ColumnRule::Value {
                default: canon::unpack(args.trim()),
            });
        }
        if let Some(args) = strip_call(s, "Δ") {
            let base: f64 = args.trim().parse().ok()?;
            return Some(ColumnRule::Delta {
                base,
                all_int: base.fract() == 0.0,
            });
        }
        None
    }
}

fn strip_call<'a>(s: &'a str, keyword: &str) -> Option<&'a str> {
    let prefix = format!("{keyword}(");
    if s.starts_with(&prefix) && s.ends_with(')') {
        Some(&s[prefix.len()..s.len() - 1])
    } else {
        None
    }
}

/// Synthesise the value a rule predicts at row `idx` given the previous row's
/// value, without looking at the actual row. `None` means the rule cannot
/// predict this cell on its own (SOLID, MULT, ENUM, DELTA) — callers fall
/// back to `prev` for those, per §4.5.
pub fn predict(rule: &ColumnRule, idx: usize, prev: Option<&Value>) -> Option<Value> {
    match rule {
        ColumnRule::Range { start, step, all_int } => {
            let v = start + (idx as f64) * step;
            Some(numeric_value(v, *all_int))
        }
        ColumnRule::Pattern {
            prefix,
            suffix,
            width,
            start,
            step,
        } => {
            let n = start + (idx as i64) * step;
            Some(Value::String(format!("{prefix}{n:0width$}{suffix}", width = *width)))
        }
        ColumnRule::Liquid => prev.cloned(),
        ColumnRule::Value { default } => Some(default.clone()),
        ColumnRule::Solid | ColumnRule::Mult { .. } | ColumnRule::Enum { .. } | ColumnRule::Delta { .. } => None,
    }
}

fn numeric_value(v: f64, all_int: bool) -> Value {
    if all_int {
        Value::Int(v.round() as i64)
    } else {
        Value::Float(v)
    }
}

/// Run the entropy tournament for one column's full value sequence (one
/// entry per row, `Value::Null` standing in for rows missing the key).
pub fn analyze_column(vals: &[Value]) -> ColumnRule {
    let mut best = ColumnRule::Solid;
    let mut best_cost = solid_cost(vals);

    if let Some((rule, cost)) = try_range(vals) {
        if cost < best_cost {
            best = rule;
            best_cost = cost;
        }
    }
    if let Some((rule, cost)) = try_pattern(vals) {
        if cost < best_cost {
            best = rule;
            best_cost = cost;
        }
    }
    if let Some((rule, cost)) = try_mult(vals) {
        if cost < best_cost {
            best = rule;
            best_cost = cost;
        }
    }
    if let Some((rule, cost)) = try_enum(vals) {
        if cost < best_cost {
            best = rule;
            best_cost = cost;
        }
    }
    if let Some((rule, cost)) = try_value(vals) {
        if cost < best_cost {
            best = rule;
            best_cost = cost;
        }
    }
    if let Some((rule, cost)) = try_delta(vals) {
        if cost < best_cost {
            best = rule;
            best_cost = cost;
        }
    }
    if let Some((rule, cost)) = try_liquid(vals) {
        if cost < best_cost {
            best = rule;
            best_cost = cost;
        }
    }

    best
}

fn solid_cost(vals: &[Value]) -> f64 {
    vals.iter().map(|v| pack(v).len() as f64).sum()
}

fn try_range(vals: &[Value]) -> Option<(ColumnRule, f64)> {
    if vals.len() < 2 || !vals.iter().all(Value::is_numeric) {
        return None;
    }
    let nums: Vec<f64> = vals.iter().map(|v| v.as_f64().unwrap()).collect();
    let step = nums[1] - nums[0];
    if step.abs() < 1e-9 {
        return None;
    }
    for i in 1..nums.len() {
        if ((nums[i] - nums[i - 1]) - step).abs() > 1e-9 {
            return None;
        }
    }
    let all_int = vals.iter().all(|v| matches!(v, Value::Int(_)));
    Some((
        ColumnRule::Range {
            start: nums[0],
            step,
            all_int,
        },
        0.0,
    ))
}

fn try_pattern(vals: &[Value]) -> Option<(ColumnRule, f64)> {
    if vals.len() < 2 {
        return None;
    }
    let strs: Vec<&str> = vals.iter().map(|v| v.as_str()).collect::<Option<Vec<_>>>()?;
    let (prefix, suffix, width, start, step) = detect_pattern(&strs)?;
    Some((
        ColumnRule::Pattern {
            prefix,
            suffix,
            width,
            start,
            step,
        },
        0.0,
    ))
}

fn digit_run(s: &str) -> Option<(usize, usize)> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            return Some((start, i - start));
        }
        i += 1;
    }
    None
}

fn detect_pattern(strs: &[&str]) -> Option<(String, String, usize, i64, i64)> {
    if strs[0].is_empty() || strs[1].is_empty() {
        return None;
    }
    let (pos, width) = digit_run(strs[0])?;
    let prefix = strs[0][..pos].to_string();
    let suffix = strs[0][pos + width..].to_string();
    let start: i64 = strs[0][pos..pos + width].parse().ok()?;
    let (pos2, width2) = digit_run(strs[1])?;
    if width2 != width {
        return None;
    }
    let second: i64 = strs[1][pos2..pos2 + width2].parse().ok()?;
    let step = second - start;

    for (i, s) in strs.iter().take(5).enumerate() {
        let n = start + (i as i64) * step;
        let expected = format!("{prefix}{n:0width$}{suffix}", width = width);
        if *s != expected {
            return None;
        }
    }
    Some((prefix, suffix, width, start, step))
}

fn try_mult(vals: &[Value]) -> Option<(ColumnRule, f64)> {
    if vals.is_empty() || !vals.iter().all(|v| matches!(v, Value::Float(_))) {
        return None;
    }
    const FACTOR: f64 = 100.0;
    for v in vals {
        let f = v.as_f64().unwrap();
        let scaled = f * FACTOR;
        if (scaled - scaled.round()).abs() > 1e-6 {
            return None;
        }
    }
    let cost: f64 = vals
        .iter()
        .map(|v| {
            let scaled = (v.as_f64().unwrap() * FACTOR).round() as i64;
            scaled.to_string().len() as f64
        })
        .sum();
    Some((ColumnRule::Mult { factor: FACTOR }, cost))
}

/// First-appearance-ordered distinct non-null, non-composite values, paired
/// with their packed-form cost. Used by both ENUM and VALUE.
fn distinct_scalar_values(vals: &[Value]) -> Vec<Value> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for v in vals {
        if matches!(v, Value::Null | Value::List(_) | Value::Map(_)) {
            continue;
        }
        let key = pack(v);
        if seen.insert(key) {
            out.push(v.clone());
        }
    }
    out
}

fn try_enum(vals: &[Value]) -> Option<(ColumnRule, f64)> {
    let distinct = distinct_scalar_values(vals);
    if distinct.len() < 2 || distinct.len() > 15 {
        return None;
    }
    let header_cost: f64 = distinct.iter().map(|v| pack(v).len() as f64).sum();
    let stream_cost = vals.len() as f64 * 1.5;
    let total = header_cost + stream_cost;
    let explicit: f64 = vals.iter().map(|v| pack(v).len() as f64).sum();
    if total < explicit {
        Some((ColumnRule::Enum { values: distinct }, total))
    } else {
        None
    }
}

fn try_value(vals: &[Value]) -> Option<(ColumnRule, f64)> {
    if vals.is_empty() {
        return None;
    }
    let mut counts: Vec<(Value, usize)> = Vec::new();
    for v in vals {
        if matches!(v, Value::Null | Value::List(_) | Value::Map(_)) {
            continue;
        }
        let key = pack(v);
        if let Some(entry) = counts.iter_mut().find(|(existing, _)| pack(existing) == key) {
            entry.1 += 1;
        } else {
            counts.push((v.clone(), 1));
        }
    }
    let (default, count) = counts.into_iter().max_by_key(|(_, c)| *c)?;
    if (count as f64) / (vals.len() as f64) <= 0.6 {
        return None;
    }
    let cost = (vals.len() - count) as f64 * pack(&default).len() as f64;
    Some((ColumnRule::Value { default }, cost))
}

fn try_delta(vals: &[Value]) -> Option<(ColumnRule, f64)> {
    if vals.len() < 2 || !vals.iter().all(Value::is_numeric) {
        return None;
    }
    let nums: Vec<f64> = vals.iter().map(|v| v.as_f64().unwrap()).collect();
    let diffs: Vec<i64> = (1..nums.len()).map(|i| (nums[i] - nums[i - 1]) as i64).collect();
    let avg_diff_len =
        diffs.iter().map(|d| d.to_string().len()).sum::<usize>() as f64 / diffs.len() as f64;
    let avg_val_len =
        nums.iter().map(|v| (*v as i64).to_string().len()).sum::<usize>() as f64 / nums.len() as f64;
    if avg_diff_len >= avg_val_len - 1.0 {
        return None;
    }
    let all_int = vals.iter().all(|v| matches!(v, Value::Int(_)));
    let cost = avg_diff_len * vals.len() as f64;
    Some((
        ColumnRule::Delta {
            base: nums[0],
            all_int,
        },
        cost,
    ))
}

fn try_liquid(vals: &[Value]) -> Option<(ColumnRule, f64)> {
    if vals.is_empty() {
        return None;
    }
    let distinct = vals.iter().map(pack).collect::<std::collections::HashSet<_>>().len();
    if (distinct as f64) / (vals.len() as f64) >= 0.5 {
        return None;
    }
    let repeats = (1..vals.len()).filter(|&i| vals[i] == vals[i - 1]).count();
    let cost = (vals.len() - repeats) as f64 * 5.0;
    Some((ColumnRule::Liquid, cost))
}
