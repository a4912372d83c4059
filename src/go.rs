use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::info;

use crate::error::GlycoError;
use crate::http::{build_client, decode_err, send};
use crate::record::GoTerms;

pub const GO_SERVICE: &str = "glygen GO annotations";

const GO_TABLE_BASE: &str = "https://data.glygen.org/ln2data/releases/data/current/reviewed";

/// Organism name -> GO annotation table URL for every organism GlyGen publishes.
pub fn default_go_tables() -> BTreeMap<String, String> {
    [
        ("Homo sapiens", "human"),
        ("Mus musculus", "mouse"),
        ("Gallus gallus", "chicken"),
        ("Dictyostelium discoideum", "dicty"),
        ("Drosophila melanogaster", "fruitfly"),
        ("Hepacivirus C genotype 1a", "hcv1a"),
        ("Hepacivirus C genotype 1b", "hcv1b"),
        ("Sus scrofa", "pig"),
        ("Rattus norvegicus", "rat"),
        ("Severe acute respiratory syndrome coronavirus 1", "sarscov1"),
        ("Severe acute respiratory syndrome coronavirus 2", "sarscov2"),
        ("Saccharomyces cerevisiae S288C", "yeast"),
    ]
    .into_iter()
    .map(|(organism, prefix)| {
        (
            organism.to_string(),
            format!("{GO_TABLE_BASE}/{prefix}_protein_go_annotation.csv"),
        )
    })
    .collect()
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct GoRow {
    uniprotkb_canonical_ac: String,
    go_term_id: String,
    go_term_label: String,
    go_term_category: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoAnnotation {
    pub term_id: String,
    pub label: String,
    pub category: String,
}

/// One organism's GO annotation table, indexed by protein accession.
#[derive(Debug, Default)]
pub struct GoTable {
    by_accession: HashMap<String, Vec<GoAnnotation>>,
}

impl GoTable {
    pub fn parse(content: &[u8]) -> Result<Self, GlycoError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(content);
        let mut by_accession: HashMap<String, Vec<GoAnnotation>> = HashMap::new();
        for row in reader.deserialize::<GoRow>() {
            let row = row.map_err(|err| decode_err(GO_SERVICE, err))?;
            by_accession
                .entry(row.uniprotkb_canonical_ac)
                .or_default()
                .push(GoAnnotation {
                    term_id: row.go_term_id.replace('_', ":"),
                    label: row.go_term_label,
                    category: row.go_term_category,
                });
        }
        Ok(Self { by_accession })
    }

    pub fn annotations(&self, accession: &str) -> &[GoAnnotation] {
        self.by_accession
            .get(accession)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn terms(&self, accession: &str) -> GoTerms {
        let join = |category: &str| {
            self.annotations(accession)
                .iter()
                .filter(|annotation| annotation.category == category)
                .map(|annotation| format!("{} ({})", annotation.label, annotation.term_id))
                .collect::<Vec<_>>()
                .join("; ")
        };
        GoTerms {
            molecular_function: join("molecular_function"),
            biological_process: join("biological_process"),
            cellular_component: join("cellular_component"),
        }
    }
}

pub trait GoAnnotationClient: Send + Sync {
    /// `Ok(None)` when no table is published for the organism.
    fn fetch_table(&self, organism: &str) -> Result<Option<Arc<GoTable>>, GlycoError>;
}

type TableSlot = Arc<Mutex<Option<Arc<GoTable>>>>;

/// Downloads each organism's table at most once; concurrent callers for the
/// same organism wait on the first download.
pub struct GoHttpClient {
    client: Client,
    tables: BTreeMap<String, String>,
    loaded: Mutex<HashMap<String, TableSlot>>,
}

impl GoHttpClient {
    pub fn new(tables: BTreeMap<String, String>) -> Result<Self, GlycoError> {
        Ok(Self {
            client: build_client(GO_SERVICE, Duration::from_secs(300))?,
            tables,
            loaded: Mutex::new(HashMap::new()),
        })
    }

    fn slot(&self, organism: &str) -> Result<TableSlot, GlycoError> {
        let mut loaded = self
            .loaded
            .lock()
            .map_err(|_| GlycoError::Worker("GO table registry poisoned".to_string()))?;
        Ok(loaded.entry(organism.to_string()).or_default().clone())
    }

    fn download(&self, organism: &str, url: &str) -> Result<GoTable, GlycoError> {
        let bytes = send(GO_SERVICE, self.client.get(url))?
            .bytes()
            .map_err(|err| decode_err(GO_SERVICE, err))?;
        let table = GoTable::parse(&bytes)?;
        info!(organism, proteins = table.by_accession.len(), "loaded GO annotation table");
        Ok(table)
    }
}

impl GoAnnotationClient for GoHttpClient {
    fn fetch_table(&self, organism: &str) -> Result<Option<Arc<GoTable>>, GlycoError> {
        let Some(url) = self.tables.get(organism) else {
            return Ok(None);
        };
        let slot = self.slot(organism)?;
        let mut guard = slot
            .lock()
            .map_err(|_| GlycoError::Worker("GO table slot poisoned".to_string()))?;
        if let Some(table) = guard.as_ref() {
            return Ok(Some(Arc::clone(table)));
        }
        let table = Arc::new(self.download(organism, url)?);
        *guard = Some(Arc::clone(&table));
        Ok(Some(table))
    }
}
