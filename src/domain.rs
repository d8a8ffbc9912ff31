use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{LineError, XrefError};

/// Source feeds published by RNAcentral that this pipeline knows how to read.
///
/// The declaration order is the processing order within a species run: the
/// local-authority feed goes first, the catalog feeds after it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Feed {
    Rgd,
    #[value(name = "refseq")]
    RefSeq,
    Ensembl,
}

impl Feed {
    pub const ALL: [Feed; 3] = [Feed::Rgd, Feed::RefSeq, Feed::Ensembl];

    /// Value expected in the db tag column of every line of this feed.
    pub fn tag(self) -> &'static str {
        match self {
            Feed::Rgd => "RGD",
            Feed::RefSeq => "REFSEQ",
            Feed::Ensembl => "ENSEMBL",
        }
    }

    /// Suffix of the per-feed counter names (`matchBy<suffix>` and friends).
    pub fn counter_suffix(self) -> &'static str {
        match self {
            Feed::Rgd => "RgdId",
            Feed::RefSeq => "RefSeq",
            Feed::Ensembl => "Ensembl",
        }
    }

    /// Human label used in summaries.
    pub fn match_label(self) -> &'static str {
        match self {
            Feed::Rgd => "rgd id",
            Feed::RefSeq => "acc id",
            Feed::Ensembl => "gene id",
        }
    }

    pub fn strategy(self) -> Strategy {
        match self {
            Feed::Rgd => Strategy::DirectSubject,
            Feed::RefSeq => Strategy::TranscriptFirst,
            Feed::Ensembl => Strategy::ExternalGeneId,
        }
    }

    pub fn file_stem(self) -> String {
        format!("{self}_mapping")
    }
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feed::Rgd => write!(f, "rgd"),
            Feed::RefSeq => write!(f, "refseq"),
            Feed::Ensembl => write!(f, "ensembl"),
        }
    }
}

impl FromStr for Feed {
    type Err = XrefError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rgd" => Ok(Feed::Rgd),
            "refseq" => Ok(Feed::RefSeq),
            "ensembl" => Ok(Feed::Ensembl),
            _ => Err(XrefError::InvalidFeed(value.to_string())),
        }
    }
}

/// Lookup chain used to turn a feed accession into local subjects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Transcripts by accession, then active genes carrying the accession as
    /// an external id.
    TranscriptFirst,
    /// The accession is the local subject id.
    DirectSubject,
    /// Active genes by external gene id, version suffix removed.
    ExternalGeneId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(pub i64);

impl SubjectId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SubjectId {
    type Err = LineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value
            .trim()
            .parse::<i64>()
            .map(SubjectId)
            .map_err(|_| LineError::BadSubjectId(value.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Species {
    pub name: String,
    pub taxon_id: u32,
    pub searchable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gene {
    pub subject_id: SubjectId,
    pub symbol: String,
    pub taxon_id: u32,
    #[serde(default = "default_active")]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub subject_id: SubjectId,
    pub gene_subject_id: SubjectId,
    pub accession: String,
}

fn default_active() -> bool {
    true
}

/// The four fields that decide whether two cross-reference records are the same.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    pub external_id: String,
    pub source_pipeline: String,
    pub xdb_key: i32,
    pub subject_id: SubjectId,
}

/// A link between an RNAcentral id and a local subject. Timestamps are
/// carried along but never take part in comparisons; use [`key`](Self::key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossReferenceRecord {
    pub external_id: String,
    pub source_pipeline: String,
    pub xdb_key: i32,
    pub subject_id: SubjectId,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl CrossReferenceRecord {
    pub fn new(
        external_id: impl Into<String>,
        source_pipeline: impl Into<String>,
        xdb_key: i32,
        subject_id: SubjectId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            external_id: external_id.into(),
            source_pipeline: source_pipeline.into(),
            xdb_key,
            subject_id,
            created_at: now,
            modified_at: now,
        }
    }

    pub fn key(&self) -> RecordKey {
        RecordKey {
            external_id: self.external_id.clone(),
            source_pipeline: self.source_pipeline.clone(),
            xdb_key: self.xdb_key,
            subject_id: self.subject_id,
        }
    }

    pub fn dump(&self, sep: &str) -> String {
        [
            self.external_id.clone(),
            self.source_pipeline.clone(),
            self.xdb_key.to_string(),
            self.subject_id.to_string(),
            self.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            self.modified_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]
        .join(sep)
    }
}

/// One parsed feed line that belongs to the species being processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingCandidate {
    pub rna_central_id: String,
    pub raw_accession: String,
    pub taxon: u32,
    pub rna_type: String,
    pub gene_symbol: String,
    pub auxiliary_accession: Option<String>,
}

impl IncomingCandidate {
    /// Accession handed to the resolver. Feeds that carry an auxiliary gene
    /// accession resolve on it rather than on the transcript column.
    pub fn lookup_accession(&self) -> &str {
        self.auxiliary_accession
            .as_deref()
            .unwrap_or(&self.raw_accession)
    }
}

/// An entry of an ambiguous resolution, kept for the multimatch log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCandidate {
    pub label: String,
    pub subject_id: SubjectId,
}

impl fmt::Display for MatchCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (RGD:{})", self.label, self.subject_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    NoMatch,
    UniqueMatch(SubjectId),
    MultiMatch(Vec<MatchCandidate>),
}

impl ResolutionOutcome {
    pub fn subject_ids(&self) -> Vec<SubjectId> {
        match self {
            ResolutionOutcome::NoMatch => Vec::new(),
            ResolutionOutcome::UniqueMatch(id) => vec![*id],
            ResolutionOutcome::MultiMatch(candidates) => {
                candidates.iter().map(|c| c.subject_id).collect()
            }
        }
    }
}

/// Removes a trailing `.version` suffix, if any: `ENSG00000258428.5` becomes
/// `ENSG00000258428`.
pub fn strip_version(accession: &str) -> &str {
    match accession.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => accession,
    }
}
