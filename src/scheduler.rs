use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crossbeam::channel::{self, Receiver, Sender};
use serde::Serialize;
use tracing::{info, warn};

use crate::assembler::{Assembler, Assembly};
use crate::cache::EnrichmentCache;
use crate::checkpoint::Checkpointer;
use crate::domain::ProteinAccession;
use crate::ebi::DomainFeatureClient;
use crate::error::GlycoError;
use crate::glygen::{GlycanDetailClient, ProteinDetailClient};
use crate::go::GoAnnotationClient;
use crate::reducing_end::ReducingEndClient;
use crate::table::{OutputWriter, Row};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub rows: usize,
    pub cache_hits: usize,
    pub fetched_accessions: usize,
    pub passthrough_rows: usize,
    pub checkpoints: usize,
    pub cached_accessions: usize,
}

struct Job {
    accession: ProteinAccession,
    site: Option<u64>,
}

type JobResult = (ProteinAccession, Result<Assembly, GlycoError>);

/// Bounded-concurrency enrichment run.
///
/// The calling thread owns the cache and the writer; workers only receive
/// jobs and send assemblies back. Rows served from the cache are written in
/// input order, rows that needed a fetch are written when their accession's
/// assembly is drained, so the output order may differ from the input order.
pub struct Scheduler {
    workers: usize,
    checkpoint_every: usize,
}

impl Scheduler {
    pub fn new(workers: usize, checkpoint_every: usize) -> Self {
        Self {
            workers: workers.max(1),
            checkpoint_every,
        }
    }

    pub fn run<P, D, G, Y, R>(
        &self,
        rows: &[Row],
        assembler: &Assembler<P, D, G, Y, R>,
        cache: &mut EnrichmentCache,
        writer: &mut OutputWriter,
    ) -> Result<RunSummary, GlycoError>
    where
        P: ProteinDetailClient,
        D: DomainFeatureClient,
        G: GoAnnotationClient,
        Y: GlycanDetailClient,
        R: ReducingEndClient,
    {
        let (job_tx, job_rx) = channel::bounded::<Job>(self.workers);
        let (result_tx, result_rx) = channel::unbounded::<JobResult>();
        let aborted = AtomicBool::new(false);

        thread::scope(|scope| {
            for _ in 0..self.workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                let aborted = &aborted;
                scope.spawn(move || worker_loop(assembler, job_rx, result_tx, aborted));
            }
            drop(job_rx);
            drop(result_tx);

            let mut control = Control {
                cache,
                writer,
                checkpointer: Checkpointer::new(self.checkpoint_every),
                pending: HashMap::new(),
                outstanding: 0,
                jobs: job_tx,
                results: result_rx,
                summary: RunSummary::default(),
            };
            let outcome = control.drive(rows);
            if outcome.is_err() {
                aborted.store(true, Ordering::SeqCst);
            }
            drop(control);
            outcome
        })
    }
}

fn worker_loop<P, D, G, Y, R>(
    assembler: &Assembler<P, D, G, Y, R>,
    jobs: Receiver<Job>,
    results: Sender<JobResult>,
    aborted: &AtomicBool,
) where
    P: ProteinDetailClient,
    D: DomainFeatureClient,
    G: GoAnnotationClient,
    Y: GlycanDetailClient,
    R: ReducingEndClient,
{
    for job in jobs.iter() {
        let outcome = if aborted.load(Ordering::SeqCst) {
            Err(GlycoError::Worker("run aborted".to_string()))
        } else {
            assembler.assemble(&job.accession, job.site)
        };
        let failed = outcome.is_err();
        if results.send((job.accession, outcome)).is_err() {
            break;
        }
        if failed {
            aborted.store(true, Ordering::SeqCst);
        }
    }
}

struct Control<'a> {
    cache: &'a mut EnrichmentCache,
    writer: &'a mut OutputWriter,
    checkpointer: Checkpointer,
    pending: HashMap<ProteinAccession, Vec<Row>>,
    outstanding: usize,
    jobs: Sender<Job>,
    results: Receiver<JobResult>,
    summary: RunSummary,
}

impl Control<'_> {
    fn drive(&mut self, rows: &[Row]) -> Result<RunSummary, GlycoError> {
        for (index, row) in rows.iter().enumerate() {
            self.route(row)?;
            let processed = index + 1;
            if self.checkpointer.is_due(processed) {
                self.checkpoint(&rows[processed..], processed)?;
            }
        }
        self.checkpoint(&[], rows.len())?;

        self.summary.rows = rows.len();
        self.summary.checkpoints = self.checkpointer.taken();
        self.summary.cached_accessions = self.cache.len();
        info!(
            rows = self.summary.rows,
            cache_hits = self.summary.cache_hits,
            fetched = self.summary.fetched_accessions,
            "enrichment run complete"
        );
        Ok(self.summary.clone())
    }

    fn route(&mut self, row: &Row) -> Result<(), GlycoError> {
        let accession = match row.uniprotkb_canonical_ac.parse::<ProteinAccession>() {
            Ok(accession) => accession,
            Err(err) => {
                warn!(error = %err, site = row.site.as_str(), "row left unenriched");
                self.summary.passthrough_rows += 1;
                return self.writer.write(row);
            }
        };

        if let Some(record) = self.cache.get(&accession) {
            let mut enriched = row.clone();
            enriched.apply(record);
            self.summary.cache_hits += 1;
            return self.writer.write(&enriched);
        }

        if let Some(waiting) = self.pending.get_mut(&accession) {
            waiting.push(row.clone());
            return Ok(());
        }

        self.jobs
            .send(Job {
                accession: accession.clone(),
                site: row.site_position(),
            })
            .map_err(|_| GlycoError::Worker("worker pool stopped".to_string()))?;
        self.outstanding += 1;
        self.pending.insert(accession, vec![row.clone()]);
        Ok(())
    }

    /// Waits for every submitted job, then merges and writes in completion order.
    fn drain(&mut self) -> Result<(), GlycoError> {
        while self.outstanding > 0 {
            let (accession, outcome) = self
                .results
                .recv()
                .map_err(|_| GlycoError::Worker("result channel closed".to_string()))?;
            self.outstanding -= 1;
            let assembly = outcome?;

            for mut row in self.pending.remove(&accession).unwrap_or_default() {
                row.apply(&assembly.record);
                self.writer.write(&row)?;
            }
            self.cache.put(&accession, assembly.record);
            self.summary.fetched_accessions += 1;
        }
        Ok(())
    }

    fn checkpoint(&mut self, tail: &[Row], processed: usize) -> Result<(), GlycoError> {
        self.drain()?;
        self.checkpointer
            .commit(self.cache, self.writer, tail, processed)
    }
}
