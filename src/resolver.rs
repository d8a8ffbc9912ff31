use tracing::{debug, info, warn};

use crate::counters::CounterPool;
use crate::domain::{
    Feed, Gene, MatchCandidate, ResolutionOutcome, Strategy, SubjectId, strip_version,
};
use crate::error::XrefError;
use crate::store::SubjectStore;

/// Maps feed accessions to local subjects for one species run.
pub struct Resolver<'a, S: SubjectStore + ?Sized> {
    store: &'a S,
    fallback_xdb_key: i32,
    species: &'a str,
}

impl<'a, S: SubjectStore + ?Sized> Resolver<'a, S> {
    /// `fallback_xdb_key` is the external database searched when a RefSeq
    /// accession matches no transcript.
    pub fn new(store: &'a S, fallback_xdb_key: i32, species: &'a str) -> Self {
        Self {
            store,
            fallback_xdb_key,
            species,
        }
    }

    pub fn resolve(&self, feed: Feed, accession: &str) -> Result<ResolutionOutcome, XrefError> {
        match feed.strategy() {
            Strategy::TranscriptFirst => self.transcript_first(accession),
            Strategy::DirectSubject => self.direct_subject(accession),
            Strategy::ExternalGeneId => self.external_gene_id(accession),
        }
    }

    /// Resolves `accession` and bumps the per-feed outcome counter.
    pub fn resolve_counted(
        &self,
        feed: Feed,
        accession: &str,
        gene_symbol: &str,
        counters: &mut CounterPool,
    ) -> Result<ResolutionOutcome, XrefError> {
        let outcome = self.resolve(feed, accession)?;
        let suffix = feed.counter_suffix();
        match &outcome {
            ResolutionOutcome::NoMatch => {
                counters.increment(&format!("noMatchBy{suffix}"));
                debug!(
                    "-- no match for {accession} gene {gene_symbol}  species {}",
                    self.species
                );
            }
            ResolutionOutcome::UniqueMatch(_) => {
                counters.increment(&format!("matchBy{suffix}"));
            }
            ResolutionOutcome::MultiMatch(_) => {
                counters.increment(&format!("multimatchBy{suffix}"));
            }
        }
        Ok(outcome)
    }

    fn transcript_first(&self, accession: &str) -> Result<ResolutionOutcome, XrefError> {
        let transcripts = self.store.transcripts_by_accession(accession)?;
        match transcripts.as_slice() {
            [] => {
                let genes = self
                    .store
                    .active_genes_by_external_accession(self.fallback_xdb_key, accession)?;
                Ok(self.classify_genes(accession, genes))
            }
            [only] => Ok(ResolutionOutcome::UniqueMatch(only.gene_subject_id)),
            _ => {
                let mut candidates = Vec::with_capacity(transcripts.len());
                for tr in &transcripts {
                    let label = match self.store.subject_by_id(tr.gene_subject_id)? {
                        Some(gene) => gene.symbol,
                        None => tr.accession.clone(),
                    };
                    candidates.push(MatchCandidate {
                        label,
                        subject_id: tr.gene_subject_id,
                    });
                }
                Ok(self.multimatch(accession, "transcripts", candidates))
            }
        }
    }

    fn direct_subject(&self, accession: &str) -> Result<ResolutionOutcome, XrefError> {
        let Ok(id) = accession.parse::<SubjectId>() else {
            warn!("-- not a subject id: {accession:?}  species {}", self.species);
            return Ok(ResolutionOutcome::NoMatch);
        };
        match self.store.subject_by_id(id)? {
            Some(gene) if gene.active => Ok(ResolutionOutcome::UniqueMatch(gene.subject_id)),
            _ => Ok(ResolutionOutcome::NoMatch),
        }
    }

    fn external_gene_id(&self, accession: &str) -> Result<ResolutionOutcome, XrefError> {
        let stripped = strip_version(accession);
        let genes = self.store.active_genes_by_external_gene_id(stripped)?;
        Ok(self.classify_genes(stripped, genes))
    }

    fn classify_genes(&self, accession: &str, genes: Vec<Gene>) -> ResolutionOutcome {
        match genes.len() {
            0 => ResolutionOutcome::NoMatch,
            1 => ResolutionOutcome::UniqueMatch(genes[0].subject_id),
            _ => {
                let candidates = genes
                    .into_iter()
                    .map(|gene| MatchCandidate {
                        label: gene.symbol,
                        subject_id: gene.subject_id,
                    })
                    .collect();
                self.multimatch(accession, "genes", candidates)
            }
        }
    }

    fn multimatch(
        &self,
        accession: &str,
        what: &str,
        candidates: Vec<MatchCandidate>,
    ) -> ResolutionOutcome {
        let info = candidates
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("  , ");
        info!(
            target: "multimatch",
            "{}: {accession} matches multiple {what}: {info}",
            self.species
        );
        ResolutionOutcome::MultiMatch(candidates)
    }
}
