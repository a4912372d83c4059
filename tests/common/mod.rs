#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use camino::{Utf8Path, Utf8PathBuf};
use serde_json::json;

use glyco_enrich::config::{Config, ConfigLoader, ResolvedConfig};
use glyco_enrich::domain::ProteinAccession;
use glyco_enrich::ebi::{DomainFeatureClient, FEATURE_SERVICE, Feature};
use glyco_enrich::error::GlycoError;
use glyco_enrich::glygen::{
    GLYCAN_SERVICE, GlycanDetail, GlycanDetailClient, PROTEIN_SERVICE, ProteinDetail,
    ProteinDetailClient,
};
use glyco_enrich::go::{GO_SERVICE, GoAnnotationClient, GoTable};
use glyco_enrich::reducing_end::{REDUCING_END_SERVICE, ReducingEndClient, ReducingEndTable};
use glyco_enrich::table::{COLUMNS, Row};

pub const ORGANISM: &str = "Homo sapiens";
pub const SEQUENCE: &str = "MNGSTAYK";
pub const GLYTOUCAN: &str = "G17689DH";

fn unavailable(service: &'static str) -> GlycoError {
    GlycoError::Status {
        service,
        status: 503,
        message: "service unavailable".to_string(),
    }
}

#[derive(Clone, Default)]
pub struct MockProteins {
    pub calls: Arc<Mutex<Vec<String>>>,
    pub failing: Arc<HashSet<String>>,
    pub without_glycan: Arc<HashSet<String>>,
    pub species: Option<&'static str>,
}

impl MockProteins {
    pub fn failing(accessions: &[&str]) -> Self {
        Self {
            failing: Arc::new(accessions.iter().map(|ac| ac.to_string()).collect()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, accession: &str) -> usize {
        self.calls().iter().filter(|ac| *ac == accession).count()
    }
}

impl ProteinDetailClient for MockProteins {
    fn fetch_protein(&self, accession: &ProteinAccession) -> Result<ProteinDetail, GlycoError> {
        self.calls.lock().unwrap().push(accession.to_string());
        if self.failing.contains(accession.as_str()) {
            return Err(unavailable(PROTEIN_SERVICE));
        }
        let glycosylation = if self.without_glycan.contains(accession.as_str()) {
            json!([])
        } else {
            json!([{ "glytoucan_ac": GLYTOUCAN }])
        };
        Ok(serde_json::from_value(json!({
            "gene_names": [
                { "resource": "UniProtKB", "type": "recommended", "name": format!("GENE-{accession}") }
            ],
            "glycosylation": glycosylation,
            "species": [{ "name": self.species.unwrap_or(ORGANISM) }],
            "sequence": { "sequence": SEQUENCE }
        }))
        .unwrap())
    }
}

#[derive(Clone, Default)]
pub struct MockFeatures {
    pub calls: Arc<Mutex<Vec<String>>>,
    pub fail: bool,
}

impl MockFeatures {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl DomainFeatureClient for MockFeatures {
    fn fetch_features(&self, accession: &str) -> Result<Vec<Feature>, GlycoError> {
        self.calls.lock().unwrap().push(accession.to_string());
        if self.fail {
            return Err(unavailable(FEATURE_SERVICE));
        }
        Ok(vec![
            Feature {
                kind: Some("DOMAIN".to_string()),
                begin: Some(json!("2")),
                end: Some(json!("6")),
                description: Some("Kinase".to_string()),
            },
            Feature {
                kind: Some("CHAIN".to_string()),
                begin: Some(json!(1)),
                end: Some(json!(8)),
                description: Some("Whole chain".to_string()),
            },
        ])
    }
}

#[derive(Clone)]
pub struct MockGo {
    pub calls: Arc<Mutex<usize>>,
    pub table: Arc<GoTable>,
    pub fail: bool,
}

impl Default for MockGo {
    fn default() -> Self {
        let table = GoTable::parse(
            b"uniprotkb_canonical_ac,go_term_id,go_term_label,go_term_category\n\
P1,GO_0005615,extracellular space,cellular_component\n\
P1,GO_0006953,acute-phase response,biological_process\n",
        )
        .unwrap();
        Self {
            calls: Arc::new(Mutex::new(0)),
            table: Arc::new(table),
            fail: false,
        }
    }
}

impl MockGo {
    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl GoAnnotationClient for MockGo {
    fn fetch_table(&self, organism: &str) -> Result<Option<Arc<GoTable>>, GlycoError> {
        *self.calls.lock().unwrap() += 1;
        if self.fail {
            return Err(unavailable(GO_SERVICE));
        }
        if organism != ORGANISM {
            return Ok(None);
        }
        Ok(Some(Arc::clone(&self.table)))
    }
}

#[derive(Clone, Default)]
pub struct MockGlycans {
    pub calls: Arc<Mutex<usize>>,
    pub fail: bool,
}

impl MockGlycans {
    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl GlycanDetailClient for MockGlycans {
    fn fetch_glycan(&self, _glytoucan_ac: &str) -> Result<GlycanDetail, GlycoError> {
        *self.calls.lock().unwrap() += 1;
        if self.fail {
            return Err(unavailable(GLYCAN_SERVICE));
        }
        Ok(serde_json::from_value(json!({
            "classification": [
                { "type": { "name": "N-linked" }, "subtype": { "name": "Complex" } },
                { "type": { "name": "N-linked" }, "subtype": { "name": "Core-fucosylated" } }
            ],
            "expression": [
                { "category": "tissue", "tissue": { "name": "blood plasma", "namespace": "UBERON", "id": "0001969" } },
                { "category": "cell_line", "cell_line": { "name": "HEK293" } }
            ]
        }))
        .unwrap())
    }
}

#[derive(Clone)]
pub struct MockReducingEnds {
    pub calls: Arc<Mutex<usize>>,
    pub table: Arc<ReducingEndTable>,
    pub fail: bool,
}

impl Default for MockReducingEnds {
    fn default() -> Self {
        let table = ReducingEndTable::parse(
            format!("accession\tmonosaccharide\n{GLYTOUCAN}\tGlcNAc\n").as_bytes(),
        )
        .unwrap();
        Self {
            calls: Arc::new(Mutex::new(0)),
            table: Arc::new(table),
            fail: false,
        }
    }
}

impl MockReducingEnds {
    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl ReducingEndClient for MockReducingEnds {
    fn fetch_table(&self) -> Result<Arc<ReducingEndTable>, GlycoError> {
        *self.calls.lock().unwrap() += 1;
        if self.fail {
            return Err(unavailable(REDUCING_END_SERVICE));
        }
        Ok(Arc::clone(&self.table))
    }
}

pub fn site_row(accession: &str, site: &str) -> Row {
    Row {
        uniprotkb_canonical_ac: accession.to_string(),
        protein_name: format!("protein {accession}"),
        site: site.to_string(),
        amino_acid: "Asn".to_string(),
        glycosylation_type: "N-linked".to_string(),
        taxonomy_id: "9606".to_string(),
        ..Row::default()
    }
}

pub fn write_table(path: &Utf8Path, rows: &[Row]) {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_path(path.as_std_path())
        .unwrap();
    writer.write_record(COLUMNS).unwrap();
    for row in rows {
        writer.serialize(row).unwrap();
    }
    writer.flush().unwrap();
}

pub fn utf8(path: std::path::PathBuf) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(path).unwrap()
}

/// Config for a run under `dir`; `output` of `None` rewrites the input in place.
pub fn test_config(
    dir: &Utf8Path,
    output: Option<&str>,
    workers: usize,
    checkpoint_every: usize,
) -> ResolvedConfig {
    ConfigLoader::resolve_config(Config {
        input: Some(dir.join("sites.tsv").to_string()),
        output: output.map(|name| dir.join(name).to_string()),
        cache: Some(dir.join("cache.json").to_string()),
        workers: Some(workers),
        checkpoint_every: Some(checkpoint_every),
        max_retries: Some(2),
        retry_unit_ms: Some(0),
        ..Config::default()
    })
    .unwrap()
}

pub fn sorted(mut rows: Vec<Row>) -> Vec<Row> {
    rows.sort_by(|a, b| {
        (&a.uniprotkb_canonical_ac, &a.site, &a.amino_acid).cmp(&(
            &b.uniprotkb_canonical_ac,
            &b.site,
            &b.amino_acid,
        ))
    });
    rows
}
