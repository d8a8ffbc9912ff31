use std::io::BufRead;
use std::sync::Mutex;
use std::time::Instant;

use chrono::{Local, Utc};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::{FeedSpec, ResolvedConfig};
use crate::counters::{
    CounterPool, DELETED, INSERTED, LINES_PROCESSED, MALFORMED_LINES, MATCHING, UNEXPECTED_TAG,
};
use crate::domain::{ResolutionOutcome, Species};
use crate::error::{LineError, XrefError};
use crate::feed::{FeedSource, parse_line};
use crate::incoming::IncomingSet;
use crate::output::{format_elapsed, species_summary_lines, yield_table_lines};
use crate::reconcile::{AppliedCounts, Diff};
use crate::resolver::Resolver;
use crate::store::SubjectStore;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Compute and report the diff without touching the store.
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpeciesSummary {
    pub species: String,
    pub taxon_id: u32,
    pub net_yield: i64,
    pub to_insert: usize,
    pub to_delete: usize,
    pub matching: usize,
    pub applied: Option<AppliedCounts>,
    pub counters: CounterPool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub pipeline_name: String,
    pub dry_run: bool,
    pub species: Vec<SpeciesSummary>,
    pub counters: CounterPool,
    pub elapsed_secs: f64,
}

impl RunSummary {
    pub fn species(&self, name: &str) -> Option<&SpeciesSummary> {
        self.species.iter().find(|summary| summary.species == name)
    }
}

pub struct App<S: SubjectStore, F: FeedSource> {
    store: S,
    feeds: F,
    config: ResolvedConfig,
    summary_lock: Mutex<()>,
}

impl<S: SubjectStore, F: FeedSource> App<S, F> {
    pub fn new(store: S, feeds: F, config: ResolvedConfig) -> Self {
        Self {
            store,
            feeds,
            config,
            summary_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// Runs every eligible species on a worker pool. The first species
    /// failure fails the run once in-flight species have finished; species
    /// already persisted stay persisted.
    pub fn run(&self, options: &RunOptions) -> Result<RunSummary, XrefError> {
        let start = Instant::now();
        info!("{} pipeline v{}", self.config.pipeline_name, env!("CARGO_PKG_VERSION"));
        info!("   {}", self.store.describe());
        info!("   started at {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
        if options.dry_run {
            info!("   dry run: the store will not be modified");
        }

        let species: Vec<&Species> = self.config.eligible_species().collect();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .build()
            .map_err(|err| XrefError::WorkerPool(err.to_string()))?;

        let summaries = pool.install(|| {
            species
                .par_iter()
                .map(|species| {
                    self.run_species(species, options)
                        .map_err(|err| XrefError::Species {
                            species: species.name.clone(),
                            source: Box::new(err),
                        })
                })
                .collect::<Result<Vec<_>, XrefError>>()
        })?;

        let mut counters = CounterPool::new();
        for summary in &summaries {
            counters.merge(&summary.counters);
        }

        let elapsed = start.elapsed();
        info!("");
        for line in yield_table_lines(&self.config.pipeline_name, &summaries) {
            info!("{line}");
        }
        info!("");
        info!("===    time elapsed: {}", format_elapsed(elapsed));
        info!("");

        Ok(RunSummary {
            pipeline_name: self.config.pipeline_name.clone(),
            dry_run: options.dry_run,
            species: summaries,
            counters,
            elapsed_secs: elapsed.as_secs_f64(),
        })
    }

    /// Parse, resolve, dedup, diff and persist for one species.
    pub fn run_species(
        &self,
        species: &Species,
        options: &RunOptions,
    ) -> Result<SpeciesSummary, XrefError> {
        debug!("START for {}", species.name);
        let mut counters = CounterPool::new();
        let mut incoming = IncomingSet::new(&self.config.pipeline_name, self.config.xdb_key);
        let resolver = Resolver::new(
            &self.store,
            self.config.refseq_fallback_xdb_key,
            &species.name,
        );

        for spec in self.config.feeds_for(species) {
            self.load_feed(spec, species, &resolver, &mut incoming, &mut counters)?;
        }

        debug!("QC: get {} ids in store for {}", self.config.pipeline_name, species.name);
        let resident = self.store.cross_reference_records(
            species,
            &self.config.pipeline_name,
            self.config.xdb_key,
        )?;

        debug!("QC: diff {} ids for {}", self.config.pipeline_name, species.name);
        let diff = Diff::compute(&incoming, resident);
        counters.add(INSERTED, diff.to_insert.len() as u64);
        counters.add(DELETED, diff.to_delete.len() as u64);
        counters.add(MATCHING, diff.to_match.len() as u64);

        let applied = if options.dry_run {
            None
        } else {
            Some(diff.apply(&self.store)?)
        };

        let summary = SpeciesSummary {
            species: species.name.clone(),
            taxon_id: species.taxon_id,
            net_yield: diff.net_yield(),
            to_insert: diff.to_insert.len(),
            to_delete: diff.to_delete.len(),
            matching: diff.to_match.len(),
            applied,
            counters,
        };

        let lines = species_summary_lines(&self.config.pipeline_name, &summary);
        let _guard = self.summary_lock.lock().unwrap_or_else(|poison| poison.into_inner());
        for line in lines {
            info!("{line}");
        }

        Ok(summary)
    }

    fn load_feed(
        &self,
        spec: &FeedSpec,
        species: &Species,
        resolver: &Resolver<'_, S>,
        incoming: &mut IncomingSet,
        counters: &mut CounterPool,
    ) -> Result<(), XrefError> {
        let reader = self.feeds.open(spec.feed, &spec.location)?;
        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(|err| XrefError::FeedRead {
                feed: spec.feed.to_string(),
                message: err.to_string(),
            })?;
            if line.is_empty() {
                continue;
            }

            let candidate = match parse_line(&line, spec.feed, species.taxon_id) {
                Ok(Some(candidate)) => candidate,
                Ok(None) => continue,
                Err(err @ LineError::UnexpectedTag { .. }) => {
                    counters.increment(UNEXPECTED_TAG);
                    warn!("*** {} line {}: {err}", spec.feed, index + 1);
                    continue;
                }
                Err(err) => {
                    counters.increment(MALFORMED_LINES);
                    error!("*** {} line {}: {err}", spec.feed, index + 1);
                    continue;
                }
            };
            counters.increment(LINES_PROCESSED);

            let outcome = resolver.resolve_counted(
                spec.feed,
                candidate.lookup_accession(),
                &candidate.gene_symbol,
                counters,
            )?;
            if let ResolutionOutcome::UniqueMatch(subject_id) = outcome {
                incoming.add(&candidate.rna_central_id, subject_id, Utc::now(), counters);
            }
        }
        Ok(())
    }
}
