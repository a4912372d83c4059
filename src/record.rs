use serde::{Deserialize, Serialize};

use crate::ranges::DomainRangeMap;

/// Everything learned about one protein accession, cached across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentRecord {
    #[serde(default)]
    pub gene_name: String,
    #[serde(default)]
    pub organism: String,
    #[serde(default)]
    pub glytoucan_ac: String,
    #[serde(default)]
    pub molecular_function: String,
    #[serde(default)]
    pub biological_process: String,
    #[serde(default)]
    pub cellular_component: String,
    #[serde(default)]
    pub sequence: String,
    #[serde(default)]
    pub domains: DomainRangeMap,
    #[serde(default)]
    pub core_fucosylated: String,
    #[serde(default)]
    pub source_tissue: String,
    #[serde(default)]
    pub reducing_end_monosaccharide: String,
    #[serde(default)]
    pub fetched_at: String,
}

/// GO terms of one protein, already rendered as `label (GO:id)` and `"; "`-joined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoTerms {
    pub molecular_function: String,
    pub biological_process: String,
    pub cellular_component: String,
}
