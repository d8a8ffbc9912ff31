#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{BufRead, Cursor};
use std::sync::Mutex;

use rnacentral_xref::config::{
    Config, ConfigLoader, FeedEntry, ResolvedConfig, SpeciesEntry, SpeciesEntryObject,
};
use rnacentral_xref::domain::{
    CrossReferenceRecord, Feed, Gene, RecordKey, Species, SubjectId, Transcript,
};
use rnacentral_xref::error::XrefError;
use rnacentral_xref::feed::FeedSource;
use rnacentral_xref::store::{Snapshot, SnapshotStore, SubjectStore};

pub const PIPELINE: &str = "RNACentral";
pub const XDB_KEY: i32 = 71;

/// Feeds served from in-memory text, keyed by location.
#[derive(Default)]
pub struct StringFeeds {
    files: HashMap<String, String>,
}

impl StringFeeds {
    pub fn with(mut self, location: &str, lines: &[&str]) -> Self {
        self.files.insert(location.to_string(), lines.join("\n"));
        self
    }
}

impl FeedSource for StringFeeds {
    fn open(&self, feed: Feed, location: &str) -> Result<Box<dyn BufRead + '_>, XrefError> {
        let content = self.files.get(location).ok_or_else(|| XrefError::FeedRead {
            feed: feed.to_string(),
            message: format!("no such feed: {location}"),
        })?;
        Ok(Box::new(Cursor::new(content.as_bytes())))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Insert(Vec<RecordKey>),
    Delete(Vec<RecordKey>),
    Touch(Vec<RecordKey>),
}

/// Snapshot store that records every write batch it receives and can be told
/// to fail transcript lookups for one accession.
pub struct RecordingStore {
    pub inner: SnapshotStore,
    pub calls: Mutex<Vec<StoreCall>>,
    pub fail_on_accession: Option<String>,
}

impl RecordingStore {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            inner: SnapshotStore::in_memory(snapshot, 20),
            calls: Mutex::new(Vec::new()),
            fail_on_accession: None,
        }
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn records(&self) -> Vec<CrossReferenceRecord> {
        self.inner.snapshot().unwrap().records
    }
}

impl SubjectStore for RecordingStore {
    fn describe(&self) -> String {
        "recording store".to_string()
    }

    fn transcripts_by_accession(&self, accession: &str) -> Result<Vec<Transcript>, XrefError> {
        if self.fail_on_accession.as_deref() == Some(accession) {
            return Err(XrefError::Store("connection reset".to_string()));
        }
        self.inner.transcripts_by_accession(accession)
    }

    fn active_genes_by_external_accession(
        &self,
        xdb_key: i32,
        accession: &str,
    ) -> Result<Vec<Gene>, XrefError> {
        self.inner.active_genes_by_external_accession(xdb_key, accession)
    }

    fn subject_by_id(&self, id: SubjectId) -> Result<Option<Gene>, XrefError> {
        self.inner.subject_by_id(id)
    }

    fn active_genes_by_external_gene_id(&self, accession: &str) -> Result<Vec<Gene>, XrefError> {
        self.inner.active_genes_by_external_gene_id(accession)
    }

    fn cross_reference_records(
        &self,
        species: &Species,
        source_pipeline: &str,
        xdb_key: i32,
    ) -> Result<Vec<CrossReferenceRecord>, XrefError> {
        self.inner
            .cross_reference_records(species, source_pipeline, xdb_key)
    }

    fn insert_records(&self, records: &[CrossReferenceRecord]) -> Result<usize, XrefError> {
        self.calls
            .lock()
            .unwrap()
            .push(StoreCall::Insert(records.iter().map(|r| r.key()).collect()));
        self.inner.insert_records(records)
    }

    fn delete_records(&self, records: &[CrossReferenceRecord]) -> Result<usize, XrefError> {
        self.calls
            .lock()
            .unwrap()
            .push(StoreCall::Delete(records.iter().map(|r| r.key()).collect()));
        self.inner.delete_records(records)
    }

    fn touch_modification_date(&self, keys: &[RecordKey]) -> Result<usize, XrefError> {
        self.calls
            .lock()
            .unwrap()
            .push(StoreCall::Touch(keys.to_vec()));
        self.inner.touch_modification_date(keys)
    }
}

pub fn gene(id: i64, symbol: &str, taxon_id: u32) -> Gene {
    Gene {
        subject_id: SubjectId(id),
        symbol: symbol.to_string(),
        taxon_id,
        active: true,
    }
}

pub fn transcript(id: i64, gene_id: i64, accession: &str) -> Transcript {
    Transcript {
        subject_id: SubjectId(id),
        gene_subject_id: SubjectId(gene_id),
        accession: accession.to_string(),
    }
}

pub fn record(external_id: &str, subject_id: i64) -> CrossReferenceRecord {
    CrossReferenceRecord::new(
        external_id,
        PIPELINE,
        XDB_KEY,
        SubjectId(subject_id),
        chrono::Utc::now(),
    )
}

pub fn key(external_id: &str, subject_id: i64) -> RecordKey {
    record(external_id, subject_id).key()
}

/// Config for the given `(name, taxon)` species and `(feed, location,
/// species restriction)` feeds.
pub fn config(species: &[(&str, u32)], feeds: &[(Feed, &str, Option<&str>)]) -> ResolvedConfig {
    ConfigLoader::resolve_config(Config {
        schema_version: Some(1),
        pipeline_name: Some(PIPELINE.to_string()),
        xdb_key: Some(XDB_KEY),
        refseq_fallback_xdb_key: Some(1),
        ensembl_xdb_key: Some(20),
        threads: Some(2),
        data_dir: None,
        store: Some("unused.json".to_string()),
        species: species
            .iter()
            .map(|(name, taxon_id)| {
                SpeciesEntry::Detailed(SpeciesEntryObject {
                    name: name.to_string(),
                    taxon_id: *taxon_id,
                    searchable: None,
                })
            })
            .collect(),
        feeds: feeds
            .iter()
            .map(|(feed, location, only)| FeedEntry {
                feed: *feed,
                location: location.to_string(),
                species: only.map(|name| vec![name.to_string()]),
            })
            .collect(),
    })
    .unwrap()
}
