use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::counters::{CounterPool, DUPLICATE_WITHIN_RUN};
use crate::domain::{CrossReferenceRecord, RecordKey, SubjectId};

/// Records resolved for one species run, unique by identity.
///
/// Pipeline name and external-db key are fixed for the whole run, so every
/// record in the set carries the same two values.
#[derive(Debug, Clone)]
pub struct IncomingSet {
    source_pipeline: String,
    xdb_key: i32,
    records: BTreeMap<RecordKey, CrossReferenceRecord>,
}

impl IncomingSet {
    pub fn new(source_pipeline: impl Into<String>, xdb_key: i32) -> Self {
        Self {
            source_pipeline: source_pipeline.into(),
            xdb_key,
            records: BTreeMap::new(),
        }
    }

    /// Adds a record linking `external_id` to `subject_id`. Returns `false`
    /// and bumps `duplicateWithinRun` when an earlier feed already produced
    /// the same identity.
    pub fn add(
        &mut self,
        external_id: &str,
        subject_id: SubjectId,
        now: DateTime<Utc>,
        counters: &mut CounterPool,
    ) -> bool {
        let record = CrossReferenceRecord::new(
            external_id,
            self.source_pipeline.as_str(),
            self.xdb_key,
            subject_id,
            now,
        );
        let key = record.key();
        if self.records.contains_key(&key) {
            counters.increment(DUPLICATE_WITHIN_RUN);
            return false;
        }
        self.records.insert(key, record);
        true
    }

    pub fn contains(&self, key: &RecordKey) -> bool {
        self.records.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &CrossReferenceRecord> {
        self.records.values()
    }

    pub fn source_pipeline(&self) -> &str {
        &self.source_pipeline
    }

    pub fn xdb_key(&self) -> i32 {
        self.xdb_key
    }
}
