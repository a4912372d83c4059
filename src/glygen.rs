use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::domain::ProteinAccession;
use crate::error::GlycoError;
use crate::http::{build_client, decode_err, null_as_default, send};

pub const PROTEIN_SERVICE: &str = "glygen protein detail";
pub const GLYCAN_SERVICE: &str = "glygen glycan detail";
pub const DEFAULT_GLYGEN_URL: &str = "https://api.glygen.org";

/// Subset of the GlyGen protein detail response. Every field is optional and
/// defaults to empty.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProteinDetail {
    #[serde(deserialize_with = "null_as_default")]
    pub gene_names: Vec<GeneName>,
    #[serde(deserialize_with = "null_as_default")]
    pub glycosylation: Vec<GlycosylationEntry>,
    #[serde(deserialize_with = "null_as_default")]
    pub species: Vec<Species>,
    pub sequence: Option<SequenceBlock>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GeneName {
    pub resource: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GlycosylationEntry {
    pub glytoucan_ac: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Species {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SequenceBlock {
    pub sequence: Option<String>,
}

impl ProteinDetail {
    /// Recommended UniProtKB gene name, else the first UniProtKB one, else empty.
    pub fn gene_name(&self) -> String {
        let uniprot = |gene: &&GeneName| gene.resource.as_deref() == Some("UniProtKB");
        self.gene_names
            .iter()
            .filter(uniprot)
            .find(|gene| gene.kind.as_deref() == Some("recommended"))
            .or_else(|| self.gene_names.iter().find(uniprot))
            .and_then(|gene| gene.name.clone())
            .unwrap_or_default()
    }

    /// Last non-empty glycan accession listed under glycosylation.
    pub fn glytoucan_ac(&self) -> String {
        self.glycosylation
            .iter()
            .rev()
            .filter_map(|entry| entry.glytoucan_ac.as_deref())
            .find(|ac| !ac.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_default()
    }

    pub fn organism(&self) -> String {
        self.species
            .iter()
            .rev()
            .find_map(|species| species.name.clone())
            .unwrap_or_default()
    }

    pub fn sequence(&self) -> String {
        self.sequence
            .as_ref()
            .and_then(|block| block.sequence.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GlycanDetail {
    #[serde(deserialize_with = "null_as_default")]
    pub classification: Vec<Classification>,
    #[serde(deserialize_with = "null_as_default")]
    pub expression: Vec<Expression>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Classification {
    pub subtype: Option<NamedTerm>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NamedTerm {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Expression {
    pub category: Option<String>,
    pub tissue: Option<Tissue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Tissue {
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub id: Option<Value>,
}

impl GlycanDetail {
    pub fn core_fucosylated(&self) -> bool {
        self.classification.iter().any(|class| {
            class
                .subtype
                .as_ref()
                .and_then(|subtype| subtype.name.as_deref())
                == Some("Core-fucosylated")
        })
    }

    /// Tissue expression entries rendered `name (namespace : id)`, `;`-joined.
    pub fn source_tissue(&self) -> String {
        self.expression
            .iter()
            .filter(|entry| entry.category.as_deref() == Some("tissue"))
            .filter_map(|entry| entry.tissue.as_ref())
            .map(|tissue| {
                format!(
                    "{} ({} : {})",
                    tissue.name.as_deref().unwrap_or(""),
                    tissue.namespace.as_deref().unwrap_or(""),
                    tissue.id.as_ref().map(value_text).unwrap_or_default()
                )
            })
            .collect::<Vec<_>>()
            .join(";")
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub trait ProteinDetailClient: Send + Sync {
    fn fetch_protein(&self, accession: &ProteinAccession) -> Result<ProteinDetail, GlycoError>;
}

pub trait GlycanDetailClient: Send + Sync {
    fn fetch_glycan(&self, glytoucan_ac: &str) -> Result<GlycanDetail, GlycoError>;
}

/// Single-attempt GlyGen client; retries are applied by the caller.
#[derive(Clone)]
pub struct GlygenHttpClient {
    client: Client,
    base_url: String,
}

impl GlygenHttpClient {
    pub fn new(base_url: &str) -> Result<Self, GlycoError> {
        Ok(Self {
            client: build_client(PROTEIN_SERVICE, Duration::from_secs(60))?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn protein_url(&self, accession: &ProteinAccession) -> String {
        format!("{}/protein/detail/{}", self.base_url, accession.as_str())
    }

    fn glycan_url(&self, glytoucan_ac: &str) -> String {
        format!("{}/glycan/detail/{}", self.base_url, glytoucan_ac)
    }
}

impl ProteinDetailClient for GlygenHttpClient {
    fn fetch_protein(&self, accession: &ProteinAccession) -> Result<ProteinDetail, GlycoError> {
        let request = self
            .client
            .post(self.protein_url(accession))
            .json(&json!({ "uniprotkb_canonical_ac": accession.as_str() }));
        send(PROTEIN_SERVICE, request)?
            .json()
            .map_err(|err| decode_err(PROTEIN_SERVICE, err))
    }
}

impl GlycanDetailClient for GlygenHttpClient {
    fn fetch_glycan(&self, glytoucan_ac: &str) -> Result<GlycanDetail, GlycoError> {
        let request = self
            .client
            .post(self.glycan_url(glytoucan_ac))
            .json(&json!({ "glytoucan_ac": glytoucan_ac }));
        send(GLYCAN_SERVICE, request)?
            .json()
            .map_err(|err| decode_err(GLYCAN_SERVICE, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protein_detail_fields() {
        let detail: ProteinDetail = serde_json::from_value(json!({
            "gene_names": [
                { "resource": "NCBI", "type": "recommended", "name": "ncbi-name" },
                { "resource": "UniProtKB", "type": "synonym", "name": "ORM" },
                { "resource": "UniProtKB", "type": "recommended", "name": "ORM1" }
            ],
            "glycosylation": [
                { "glytoucan_ac": "G00001MO" },
                { "glytoucan_ac": "G17689DH" },
                { "residue": "N" }
            ],
            "species": [{ "name": "Homo sapiens", "taxid": 9606 }],
            "sequence": { "sequence": "MALSWVLTVLSLLPLLEA", "length": 18 }
        }))
        .unwrap();

        assert_eq!(detail.gene_name(), "ORM1");
        assert_eq!(detail.glytoucan_ac(), "G17689DH");
        assert_eq!(detail.organism(), "Homo sapiens");
        assert_eq!(detail.sequence(), "MALSWVLTVLSLLPLLEA");
    }

    #[test]
    fn gene_name_falls_back_to_first_uniprot_entry() {
        let detail: ProteinDetail = serde_json::from_value(json!({
            "gene_names": [
                { "resource": "UniProtKB", "type": "synonym", "name": "ALT" },
                { "resource": "UniProtKB", "type": "orf", "name": "ORF" }
            ]
        }))
        .unwrap();
        assert_eq!(detail.gene_name(), "ALT");
    }

    #[test]
    fn empty_protein_detail_defaults() {
        let detail: ProteinDetail = serde_json::from_value(json!({})).unwrap();
        assert_eq!(detail.gene_name(), "");
        assert_eq!(detail.glytoucan_ac(), "");
        assert_eq!(detail.organism(), "");
        assert_eq!(detail.sequence(), "");
    }

    #[test]
    fn glycan_detail_fields() {
        let detail: GlycanDetail = serde_json::from_value(json!({
            "classification": [
                { "type": { "name": "N-glycan" }, "subtype": { "name": "Core-fucosylated" } },
                { "type": { "name": "N-glycan" }, "subtype": { "name": "Complex" } }
            ],
            "expression": [
                { "category": "tissue", "tissue": { "name": "blood serum", "namespace": "UBERON", "id": "0001977" } },
                { "category": "cell_line", "tissue": { "name": "HeLa", "namespace": "CVCL", "id": "0030" } },
                { "category": "tissue", "tissue": { "name": "liver", "namespace": "UBERON", "id": 2107 } }
            ]
        }))
        .unwrap();
        assert!(detail.core_fucosylated());
        assert_eq!(
            detail.source_tissue(),
            "blood serum (UBERON : 0001977);liver (UBERON : 2107)"
        );
    }

    #[test]
    fn glycan_without_classification_is_not_core_fucosylated() {
        let detail: GlycanDetail = serde_json::from_value(json!({ "expression": [] })).unwrap();
        assert!(!detail.core_fucosylated());
        assert_eq!(detail.source_tissue(), "");
    }
}
