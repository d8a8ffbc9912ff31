use std::collections::BTreeMap;

use serde::Serialize;

pub const LINES_PROCESSED: &str = "linesProcessedForSpecies";
pub const DUPLICATE_WITHIN_RUN: &str = "duplicateWithinRun";
pub const MALFORMED_LINES: &str = "malformedLines";
pub const UNEXPECTED_TAG: &str = "unexpectedTag";
pub const INSERTED: &str = "inserted";
pub const DELETED: &str = "deleted";
pub const MATCHING: &str = "matching";

/// Named integer counters. Each species run owns one; the orchestrator merges
/// them once all species have finished.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CounterPool {
    counts: BTreeMap<String, u64>,
}

impl CounterPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, name: &str) {
        self.add(name, 1);
    }

    /// Zero deltas leave the pool unchanged.
    pub fn add(&mut self, name: &str, delta: u64) {
        if delta == 0 {
            return;
        }
        *self.counts.entry(name.to_string()).or_insert(0) += delta;
    }

    /// Missing counters read as zero.
    pub fn get(&self, name: &str) -> u64 {
        self.counts.get(name).copied().unwrap_or(0)
    }

    pub fn merge(&mut self, other: &CounterPool) {
        for (name, value) in &other.counts {
            self.add(name, *value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// `1234567` -> `1,234,567`.
pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
