use std::collections::HashSet;
use std::fs;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tempfile::Builder;
use tracing::debug;

use crate::domain::{CrossReferenceRecord, Gene, RecordKey, Species, SubjectId, Transcript};
use crate::error::XrefError;

/// Read and write access to the local authoritative store.
pub trait SubjectStore: Send + Sync {
    /// One-line description of where the store lives, for the run header.
    fn describe(&self) -> String;

    fn transcripts_by_accession(&self, accession: &str) -> Result<Vec<Transcript>, XrefError>;

    fn active_genes_by_external_accession(
        &self,
        xdb_key: i32,
        accession: &str,
    ) -> Result<Vec<Gene>, XrefError>;

    fn subject_by_id(&self, id: SubjectId) -> Result<Option<Gene>, XrefError>;

    fn active_genes_by_external_gene_id(&self, accession: &str) -> Result<Vec<Gene>, XrefError>;

    fn cross_reference_records(
        &self,
        species: &Species,
        source_pipeline: &str,
        xdb_key: i32,
    ) -> Result<Vec<CrossReferenceRecord>, XrefError>;

    /// Records whose identity is already stored are skipped; returns the
    /// number actually inserted.
    fn insert_records(&self, records: &[CrossReferenceRecord]) -> Result<usize, XrefError>;

    fn delete_records(&self, records: &[CrossReferenceRecord]) -> Result<usize, XrefError>;

    fn touch_modification_date(&self, keys: &[RecordKey]) -> Result<usize, XrefError>;
}

/// External id attached to a gene, e.g. a GenBank nucleotide accession or an
/// Ensembl gene id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneXref {
    pub xdb_key: i32,
    pub accession: String,
    pub subject_id: SubjectId,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub genes: Vec<Gene>,
    #[serde(default)]
    pub transcripts: Vec<Transcript>,
    #[serde(default)]
    pub gene_xrefs: Vec<GeneXref>,
    #[serde(default)]
    pub records: Vec<CrossReferenceRecord>,
}

/// Store kept as a single JSON snapshot on disk. The snapshot is read once and
/// rewritten atomically after every write batch.
#[derive(Debug)]
pub struct SnapshotStore {
    path: Option<Utf8PathBuf>,
    ensembl_xdb_key: i32,
    state: RwLock<Snapshot>,
}

impl SnapshotStore {
    pub fn open(path: &Utf8Path, ensembl_xdb_key: i32) -> Result<Self, XrefError> {
        let snapshot = if path.as_std_path().exists() {
            let content = fs::read_to_string(path.as_std_path())
                .map_err(|err| XrefError::Store(format!("{path}: {err}")))?;
            serde_json::from_str(&content).map_err(|err| XrefError::StoreParse(err.to_string()))?
        } else {
            Snapshot::default()
        };
        Ok(Self {
            path: Some(path.to_path_buf()),
            ensembl_xdb_key,
            state: RwLock::new(snapshot),
        })
    }

    /// Store that lives only in memory; writes are never persisted.
    pub fn in_memory(snapshot: Snapshot, ensembl_xdb_key: i32) -> Self {
        Self {
            path: None,
            ensembl_xdb_key,
            state: RwLock::new(snapshot),
        }
    }

    pub fn snapshot(&self) -> Result<Snapshot, XrefError> {
        Ok(self.read()?.clone())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Snapshot>, XrefError> {
        self.state
            .read()
            .map_err(|_| XrefError::Store("snapshot lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Snapshot>, XrefError> {
        self.state
            .write()
            .map_err(|_| XrefError::Store("snapshot lock poisoned".to_string()))
    }

    fn persist(&self, snapshot: &Snapshot) -> Result<(), XrefError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let parent = path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .unwrap_or(Utf8Path::new("."));
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| XrefError::Filesystem(err.to_string()))?;
        let content = serde_json::to_vec_pretty(snapshot)
            .map_err(|err| XrefError::Store(err.to_string()))?;
        let temp = Builder::new()
            .prefix("rnac-xref-store")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| XrefError::Filesystem(err.to_string()))?;
        fs::write(temp.path(), &content).map_err(|err| XrefError::Filesystem(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| XrefError::Filesystem(err.to_string()))?;
        debug!(path = %path, records = snapshot.records.len(), "store snapshot written");
        Ok(())
    }

    /// Swaps `records` in only once the snapshot carrying them is on disk.
    fn commit(
        &self,
        state: &mut Snapshot,
        records: Vec<CrossReferenceRecord>,
    ) -> Result<(), XrefError> {
        let previous = std::mem::replace(&mut state.records, records);
        if let Err(err) = self.persist(state) {
            state.records = previous;
            return Err(err);
        }
        Ok(())
    }

    fn genes_by_xref(
        snapshot: &Snapshot,
        xdb_key: i32,
        matches: impl Fn(&str) -> bool,
    ) -> Vec<Gene> {
        let mut seen = HashSet::new();
        snapshot
            .gene_xrefs
            .iter()
            .filter(|xref| xref.xdb_key == xdb_key && matches(&xref.accession))
            .filter(|xref| seen.insert(xref.subject_id))
            .filter_map(|xref| {
                snapshot
                    .genes
                    .iter()
                    .find(|gene| gene.subject_id == xref.subject_id && gene.active)
                    .cloned()
            })
            .collect()
    }
}

impl SubjectStore for SnapshotStore {
    fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("snapshot store at {path}"),
            None => "in-memory snapshot store".to_string(),
        }
    }

    fn transcripts_by_accession(&self, accession: &str) -> Result<Vec<Transcript>, XrefError> {
        let state = self.read()?;
        Ok(state
            .transcripts
            .iter()
            .filter(|tr| tr.accession == accession)
            .cloned()
            .collect())
    }

    fn active_genes_by_external_accession(
        &self,
        xdb_key: i32,
        accession: &str,
    ) -> Result<Vec<Gene>, XrefError> {
        let state = self.read()?;
        Ok(Self::genes_by_xref(&state, xdb_key, |acc| acc == accession))
    }

    fn subject_by_id(&self, id: SubjectId) -> Result<Option<Gene>, XrefError> {
        let state = self.read()?;
        Ok(state.genes.iter().find(|gene| gene.subject_id == id).cloned())
    }

    fn active_genes_by_external_gene_id(&self, accession: &str) -> Result<Vec<Gene>, XrefError> {
        let state = self.read()?;
        // stored ids may or may not carry a version
        Ok(Self::genes_by_xref(&state, self.ensembl_xdb_key, |acc| {
            crate::domain::strip_version(acc) == accession
        }))
    }

    fn cross_reference_records(
        &self,
        species: &Species,
        source_pipeline: &str,
        xdb_key: i32,
    ) -> Result<Vec<CrossReferenceRecord>, XrefError> {
        let state = self.read()?;
        let subjects: HashSet<SubjectId> = state
            .genes
            .iter()
            .filter(|gene| gene.taxon_id == species.taxon_id)
            .map(|gene| gene.subject_id)
            .collect();
        Ok(state
            .records
            .iter()
            .filter(|rec| {
                rec.source_pipeline == source_pipeline
                    && rec.xdb_key == xdb_key
                    && subjects.contains(&rec.subject_id)
            })
            .cloned()
            .collect())
    }

    fn insert_records(&self, records: &[CrossReferenceRecord]) -> Result<usize, XrefError> {
        let mut state = self.write()?;
        let mut existing: HashSet<RecordKey> = state.records.iter().map(|rec| rec.key()).collect();
        let fresh: Vec<CrossReferenceRecord> = records
            .iter()
            .filter(|record| existing.insert(record.key()))
            .cloned()
            .collect();
        let inserted = fresh.len();
        if inserted > 0 {
            let mut next = state.records.clone();
            next.extend(fresh);
            self.commit(&mut state, next)?;
        }
        Ok(inserted)
    }

    fn delete_records(&self, records: &[CrossReferenceRecord]) -> Result<usize, XrefError> {
        let mut state = self.write()?;
        let doomed: HashSet<RecordKey> = records.iter().map(|rec| rec.key()).collect();
        let next: Vec<CrossReferenceRecord> = state
            .records
            .iter()
            .filter(|rec| !doomed.contains(&rec.key()))
            .cloned()
            .collect();
        let deleted = state.records.len() - next.len();
        if deleted > 0 {
            self.commit(&mut state, next)?;
        }
        Ok(deleted)
    }

    fn touch_modification_date(&self, keys: &[RecordKey]) -> Result<usize, XrefError> {
        let mut state = self.write()?;
        let wanted: HashSet<&RecordKey> = keys.iter().collect();
        let now = Utc::now();
        let mut next = state.records.clone();
        let mut touched = 0;
        for record in next.iter_mut() {
            if wanted.contains(&record.key()) {
                record.modified_at = now;
                touched += 1;
            }
        }
        if touched > 0 {
            self.commit(&mut state, next)?;
        }
        Ok(touched)
    }
}
