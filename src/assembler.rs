use std::time::Instant;

use tracing::{debug, warn};

use crate::domain::ProteinAccession;
use crate::ebi::{self, DomainFeatureClient, FEATURE_SERVICE};
use crate::error::GlycoError;
use crate::glygen::{GLYCAN_SERVICE, GlycanDetailClient, PROTEIN_SERVICE, ProteinDetailClient};
use crate::go::{GO_SERVICE, GoAnnotationClient};
use crate::ranges::{DomainRangeMap, SiteDomain};
use crate::record::{EnrichmentRecord, GoTerms};
use crate::reducing_end::{REDUCING_END_SERVICE, ReducingEndClient};
use crate::retry::RetryPolicy;

/// A freshly assembled record plus the domain annotation of the site that requested it.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub record: EnrichmentRecord,
    pub site_domain: SiteDomain,
}

/// Runs every remote lookup for one accession. Holds no mutable state, so
/// one instance is shared by all workers.
pub struct Assembler<P, D, G, Y, R>
where
    P: ProteinDetailClient,
    D: DomainFeatureClient,
    G: GoAnnotationClient,
    Y: GlycanDetailClient,
    R: ReducingEndClient,
{
    proteins: P,
    features: D,
    go: G,
    glycans: Y,
    reducing_ends: R,
    retry: RetryPolicy,
}

impl<P, D, G, Y, R> Assembler<P, D, G, Y, R>
where
    P: ProteinDetailClient,
    D: DomainFeatureClient,
    G: GoAnnotationClient,
    Y: GlycanDetailClient,
    R: ReducingEndClient,
{
    pub fn new(
        proteins: P,
        features: D,
        go: G,
        glycans: Y,
        reducing_ends: R,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            proteins,
            features,
            go,
            glycans,
            reducing_ends,
            retry,
        }
    }

    /// Protein-detail and GO failures are fatal for the accession; domain and
    /// glycan failures (detail or reducing end) only leave their fields empty.
    pub fn assemble(
        &self,
        accession: &ProteinAccession,
        site: Option<u64>,
    ) -> Result<Assembly, GlycoError> {
        let start = Instant::now();
        let target = accession.as_str();

        let detail = self
            .retry
            .run(PROTEIN_SERVICE, target, || self.proteins.fetch_protein(accession))?;
        let organism = detail.organism();
        let go_terms = self.go_terms(accession, &organism)?;
        let domains = self.domains(accession);
        let glytoucan_ac = detail.glytoucan_ac();
        let (core_fucosylated, source_tissue) = self.glycan_annotation(&glytoucan_ac);
        let reducing_end_monosaccharide = self.reducing_end(&glytoucan_ac);

        let record = EnrichmentRecord {
            gene_name: detail.gene_name(),
            organism,
            glytoucan_ac,
            molecular_function: go_terms.molecular_function,
            biological_process: go_terms.biological_process,
            cellular_component: go_terms.cellular_component,
            sequence: detail.sequence(),
            domains,
            core_fucosylated,
            source_tissue,
            reducing_end_monosaccharide,
            fetched_at: chrono::Utc::now().to_rfc3339(),
        };
        let site_domain = record.domains.resolve(site);
        debug!(
            accession = target,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "assembled enrichment record"
        );
        Ok(Assembly {
            record,
            site_domain,
        })
    }

    fn go_terms(&self, accession: &ProteinAccession, organism: &str) -> Result<GoTerms, GlycoError> {
        let table = self
            .retry
            .run(GO_SERVICE, organism, || self.go.fetch_table(organism))?;
        match table {
            Some(table) => Ok(table.terms(accession.as_str())),
            None => {
                warn!(
                    accession = accession.as_str(),
                    organism, "no GO annotation table for organism"
                );
                Ok(GoTerms::default())
            }
        }
    }

    fn domains(&self, accession: &ProteinAccession) -> DomainRangeMap {
        let base = accession.base();
        match self
            .retry
            .run(FEATURE_SERVICE, base, || self.features.fetch_features(base))
        {
            Ok(features) => ebi::domain_map(&features),
            Err(err) => {
                warn!(accession = accession.as_str(), error = %err, "domain lookup failed");
                DomainRangeMap::new()
            }
        }
    }

    fn glycan_annotation(&self, glytoucan_ac: &str) -> (String, String) {
        if glytoucan_ac.is_empty() {
            return (String::new(), String::new());
        }
        match self
            .retry
            .run(GLYCAN_SERVICE, glytoucan_ac, || self.glycans.fetch_glycan(glytoucan_ac))
        {
            Ok(glycan) => {
                let flag = if glycan.core_fucosylated() { "Y" } else { "N" };
                (flag.to_string(), glycan.source_tissue())
            }
            Err(err) => {
                warn!(glytoucan_ac, error = %err, "glycan lookup failed");
                (String::new(), String::new())
            }
        }
    }

    fn reducing_end(&self, glytoucan_ac: &str) -> String {
        if glytoucan_ac.is_empty() {
            return String::new();
        }
        match self.retry.run(REDUCING_END_SERVICE, glytoucan_ac, || {
            self.reducing_ends.fetch_table()
        }) {
            Ok(table) => table.monosaccharide(glytoucan_ac),
            Err(err) => {
                warn!(glytoucan_ac, error = %err, "reducing-end lookup failed");
                String::new()
            }
        }
    }
}
