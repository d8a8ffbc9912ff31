use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::domain::{CrossReferenceRecord, RecordKey};
use crate::error::XrefError;
use crate::incoming::IncomingSet;
use crate::store::SubjectStore;

/// Three-way split of incoming against resident records, by identity.
#[derive(Debug, Clone, Default)]
pub struct Diff {
    pub to_insert: Vec<CrossReferenceRecord>,
    pub to_delete: Vec<CrossReferenceRecord>,
    /// Resident copies of records that are also incoming.
    pub to_match: Vec<CrossReferenceRecord>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AppliedCounts {
    pub inserted: usize,
    pub deleted: usize,
    pub touched: usize,
}

impl Diff {
    pub fn compute(incoming: &IncomingSet, resident: Vec<CrossReferenceRecord>) -> Self {
        let mut resident_by_key: HashMap<RecordKey, CrossReferenceRecord> =
            HashMap::with_capacity(resident.len());
        for record in resident {
            resident_by_key.entry(record.key()).or_insert(record);
        }

        let mut diff = Diff::default();
        for record in incoming.records() {
            match resident_by_key.remove(&record.key()) {
                Some(existing) => diff.to_match.push(existing),
                None => diff.to_insert.push(record.clone()),
            }
        }
        diff.to_delete = resident_by_key.into_values().collect();
        diff.to_delete.sort_by_key(CrossReferenceRecord::key);
        diff
    }

    /// Net change in record count: matched plus inserted minus deleted.
    pub fn net_yield(&self) -> i64 {
        self.to_match.len() as i64 + self.to_insert.len() as i64 - self.to_delete.len() as i64
    }

    pub fn is_empty(&self) -> bool {
        self.to_insert.is_empty() && self.to_delete.is_empty() && self.to_match.is_empty()
    }

    /// Submits the non-empty batches to the store, inserts first, then
    /// deletes, then modification-date touches.
    pub fn apply<S: SubjectStore + ?Sized>(&self, store: &S) -> Result<AppliedCounts, XrefError> {
        let mut counts = AppliedCounts::default();

        if !self.to_insert.is_empty() {
            for record in &self.to_insert {
                debug!(target: "inserted", "{}", record.dump("|"));
            }
            counts.inserted = store.insert_records(&self.to_insert)?;
        }

        if !self.to_delete.is_empty() {
            for record in &self.to_delete {
                debug!(target: "deleted", "{}", record.dump("|"));
            }
            counts.deleted = store.delete_records(&self.to_delete)?;
        }

        if !self.to_match.is_empty() {
            let keys: Vec<RecordKey> = self.to_match.iter().map(CrossReferenceRecord::key).collect();
            counts.touched = store.touch_modification_date(&keys)?;
        }

        Ok(counts)
    }
}
