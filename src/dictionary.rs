//! Global string dictionary construction (specification §4.3).
//!
//! Grounded in `_build_global_dict` in
//! `examples/original_source/zon-format/src/zon/encoder.py`: count every
//! string value across all flat rows, keep candidates whose inline-reference
//! saving (`f·(L−2)`) beats the dictionary-entry cost (`L+5`), sort by
//! frequency descending, and cap at 64 entries.
//!
//! One determinism fix versus the original: ties in frequency are broken by
//! first appearance across the rows, not by whatever order a Python `dict`
//! happens to iterate a `Counter` in — needed to satisfy the encoder's
//! determinism law (specification §8 law 3).

use crate::types::FlatRow;
use std::collections::HashMap;

pub const MIN_CANDIDATE_LEN: usize = 3;
pub const MAX_DICT_SIZE: usize = 64;

/// The global dictionary: an ordered list of strings, referenced on the wire
/// by position via `%i`.
pub struct Dictionary {
    pub entries: Vec<String>,
    index: HashMap<String, usize>,
}

impl Dictionary {
    pub fn build(rows: &[FlatRow]) -> Dictionary {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut first_seen: HashMap<&str, usize> = HashMap::new();
        let mut order = 0usize;
        for row in rows {
            for (_, v) in row {
                if let crate::types::Value::String(s) = v {
                    if s.chars().count() >= MIN_CANDIDATE_LEN {
                        *counts.entry(s.as_str()).or_insert(0) += 1;
                        first_seen.entry(s.as_str()).or_insert_with(|| {
                            order += 1;
                            order
                        });
                    }
                }
            }
        }

        let mut candidates: Vec<(&str, usize)> = counts
            .into_iter()
            .filter(|(s, freq)| {
                let len = s.chars().count() as i64;
                let freq = *freq as i64;
                (freq * (len - 2)) > (len + 5)
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.1.cmp(&a.1).then_with(|| first_seen[a.0].cmp(&first_seen[b.0]))
        });
        candidates.truncate(MAX_DICT_SIZE);

        let entries: Vec<String> = candidates.into_iter().map(|(s, _)| s.to_string()).collect();
        let index = entries.iter().enumerate().map(|(i, s)| (s.clone(), i)).collect();
        Dictionary { entries, index }
    }

    pub fn from_entries(entries: Vec<String>) -> Dictionary {
        let index = entries.iter().enumerate().map(|(i, s)| (s.clone(), i)).collect();
        Dictionary { entries, index }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index_of(&self, s: &str) -> Option<usize> {
        self.index.get(s).copied()
    }

    pub fn get(&self, i: usize) -> Option<&str> {
        self.entries.get(i).map(|s| s.as_str())
    }
}
