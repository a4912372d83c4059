use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde_json::Value;

use crate::error::GlycoError;
use crate::http::{build_client, decode_err, null_as_default, send};
use crate::ranges::DomainRangeMap;

pub const FEATURE_SERVICE: &str = "ebi protein features";
pub const DEFAULT_EBI_URL: &str = "https://www.ebi.ac.uk/proteins/api";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FeatureResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub features: Vec<Feature>,
}

/// One sequence feature. `begin`/`end` arrive as strings that may carry
/// `<`/`>` fuzzy-bound markers, or occasionally as numbers.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub begin: Option<Value>,
    pub end: Option<Value>,
    pub description: Option<String>,
}

impl Feature {
    pub fn is_domain(&self) -> bool {
        self.kind.as_deref() == Some("DOMAIN")
    }

    pub fn bounds(&self) -> Option<(u64, u64)> {
        let start = self.begin.as_ref().and_then(parse_bound)?;
        let end = self.end.as_ref().and_then(parse_bound)?;
        (start <= end).then_some((start, end))
    }
}

fn parse_bound(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text
            .trim()
            .trim_start_matches(['<', '>'])
            .parse()
            .ok(),
        _ => None,
    }
}

/// Builds the domain map from `DOMAIN` features, skipping entries without usable bounds.
pub fn domain_map(features: &[Feature]) -> DomainRangeMap {
    let mut map = DomainRangeMap::new();
    for feature in features.iter().filter(|feature| feature.is_domain()) {
        if let Some((start, end)) = feature.bounds() {
            map.insert(start, end, feature.description.clone().unwrap_or_default());
        }
    }
    map
}

pub trait DomainFeatureClient: Send + Sync {
    /// `accession` is the isoform-free base accession.
    fn fetch_features(&self, accession: &str) -> Result<Vec<Feature>, GlycoError>;
}

#[derive(Clone)]
pub struct EbiHttpClient {
    client: Client,
    base_url: String,
}

impl EbiHttpClient {
    pub fn new(base_url: &str) -> Result<Self, GlycoError> {
        Ok(Self {
            client: build_client(FEATURE_SERVICE, Duration::from_secs(30))?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn protein_url(&self, accession: &str) -> String {
        format!("{}/proteins/{}", self.base_url, accession)
    }
}

impl DomainFeatureClient for EbiHttpClient {
    fn fetch_features(&self, accession: &str) -> Result<Vec<Feature>, GlycoError> {
        let request = self
            .client
            .get(self.protein_url(accession))
            .header(ACCEPT, "application/json");
        let response: FeatureResponse = send(FEATURE_SERVICE, request)?
            .json()
            .map_err(|err| decode_err(FEATURE_SERVICE, err))?;
        Ok(response.features)
    }
}
