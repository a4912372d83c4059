use tracing::info;

use crate::assembler::Assembler;
use crate::cache::EnrichmentCache;
use crate::config::ResolvedConfig;
use crate::ebi::DomainFeatureClient;
use crate::error::GlycoError;
use crate::glygen::{GlycanDetailClient, ProteinDetailClient};
use crate::go::GoAnnotationClient;
use crate::output::EnrichReport;
use crate::reducing_end::ReducingEndClient;
use crate::scheduler::Scheduler;
use crate::sites::unknown_site_rows;
use crate::table::{OutputWriter, append_rows, read_table};

#[derive(Debug, Clone, Copy)]
pub struct EnrichOptions {
    /// Reuse the cache file from earlier runs instead of re-fetching everything.
    pub use_cache: bool,
    pub unknown_sites: bool,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            unknown_sites: false,
        }
    }
}

pub struct App<P, D, G, Y, R>
where
    P: ProteinDetailClient,
    D: DomainFeatureClient,
    G: GoAnnotationClient,
    Y: GlycanDetailClient,
    R: ReducingEndClient,
{
    config: ResolvedConfig,
    assembler: Assembler<P, D, G, Y, R>,
}

impl<P, D, G, Y, R> App<P, D, G, Y, R>
where
    P: ProteinDetailClient,
    D: DomainFeatureClient,
    G: GoAnnotationClient,
    Y: GlycanDetailClient,
    R: ReducingEndClient,
{
    pub fn new(
        config: ResolvedConfig,
        proteins: P,
        features: D,
        go: G,
        glycans: Y,
        reducing_ends: R,
    ) -> Self {
        let assembler =
            Assembler::new(proteins, features, go, glycans, reducing_ends, config.retry);
        Self { config, assembler }
    }

    pub fn run(&self, options: EnrichOptions) -> Result<EnrichReport, GlycoError> {
        let config = &self.config;
        let rows = read_table(&config.input)?;
        let mut cache = EnrichmentCache::open(&config.cache, options.use_cache)?;
        info!(
            input = %config.input,
            rows = rows.len(),
            cached = cache.len(),
            workers = config.workers,
            "starting enrichment"
        );

        let mut writer = OutputWriter::create(&config.output)?;
        let summary = Scheduler::new(config.workers, config.checkpoint_every).run(
            &rows,
            &self.assembler,
            &mut cache,
            &mut writer,
        )?;
        drop(writer);

        let unknown_sites_added = if options.unknown_sites {
            let enriched = read_table(&config.output)?;
            let extra = unknown_site_rows(&enriched, &cache);
            append_rows(&config.output, &extra)?;
            info!(added = extra.len(), "appended unknown glycosites");
            Some(extra.len())
        } else {
            None
        };

        Ok(EnrichReport {
            input: config.input.to_string(),
            output: config.output.to_string(),
            cache: config.cache.to_string(),
            used_cache: options.use_cache,
            summary,
            unknown_sites_added,
        })
    }
}
