use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::info;

use crate::error::GlycoError;
use crate::http::{build_client, decode_err, send};

pub const REDUCING_END_SERVICE: &str = "pygly reducing-end table";
pub const DEFAULT_REDUCING_END_URL: &str =
    "https://github.com/glygen-glycan-data/PyGly/raw/master/smw/glycandata/export/redendmono.tsv";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReducingEndRow {
    accession: String,
    monosaccharide: String,
}

/// GlyTouCan accession -> reducing-end monosaccharides, in table order.
#[derive(Debug, Default)]
pub struct ReducingEndTable {
    by_accession: HashMap<String, Vec<String>>,
}

impl ReducingEndTable {
    pub fn parse(content: &[u8]) -> Result<Self, GlycoError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .from_reader(content);
        let mut by_accession: HashMap<String, Vec<String>> = HashMap::new();
        for row in reader.deserialize::<ReducingEndRow>() {
            let row = row.map_err(|err| decode_err(REDUCING_END_SERVICE, err))?;
            let monosaccharide = row.monosaccharide.trim();
            if row.accession.is_empty() || monosaccharide.is_empty() {
                continue;
            }
            let entry = by_accession.entry(row.accession).or_default();
            if !entry.iter().any(|known| known == monosaccharide) {
                entry.push(monosaccharide.to_string());
            }
        }
        Ok(Self { by_accession })
    }

    pub fn len(&self) -> usize {
        self.by_accession.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_accession.is_empty()
    }

    /// `"; "`-joined monosaccharides of `glytoucan_ac`, empty when unlisted.
    pub fn monosaccharide(&self, glytoucan_ac: &str) -> String {
        self.by_accession
            .get(glytoucan_ac)
            .map(|values| values.join("; "))
            .unwrap_or_default()
    }
}

pub trait ReducingEndClient: Send + Sync {
    fn fetch_table(&self) -> Result<Arc<ReducingEndTable>, GlycoError>;
}

/// Downloads the table once per client; later callers share it.
pub struct ReducingEndHttpClient {
    client: Client,
    url: String,
    loaded: Mutex<Option<Arc<ReducingEndTable>>>,
}

impl ReducingEndHttpClient {
    pub fn new(url: &str) -> Result<Self, GlycoError> {
        Ok(Self {
            client: build_client(REDUCING_END_SERVICE, Duration::from_secs(300))?,
            url: url.to_string(),
            loaded: Mutex::new(None),
        })
    }
}

impl ReducingEndClient for ReducingEndHttpClient {
    fn fetch_table(&self) -> Result<Arc<ReducingEndTable>, GlycoError> {
        let mut guard = self
            .loaded
            .lock()
            .map_err(|_| GlycoError::Worker("reducing-end table slot poisoned".to_string()))?;
        if let Some(table) = guard.as_ref() {
            return Ok(Arc::clone(table));
        }
        let bytes = send(REDUCING_END_SERVICE, self.client.get(&self.url))?
            .bytes()
            .map_err(|err| decode_err(REDUCING_END_SERVICE, err))?;
        let table = Arc::new(ReducingEndTable::parse(&bytes)?);
        info!(glycans = table.len(), "loaded reducing-end table");
        *guard = Some(Arc::clone(&table));
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
accession\tmonosaccharide\tanomer
G17689DH\tGlcNAc\tb
G17689DH\tGlcNAc\tb
G00001MO\tGlc\ta
G00001MO\tGal\tb
G00002MO\t\t
";

    #[test]
    fn monosaccharides_keyed_by_glytoucan() {
        let table = ReducingEndTable::parse(TABLE.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.monosaccharide("G17689DH"), "GlcNAc");
        assert_eq!(table.monosaccharide("G00001MO"), "Glc; Gal");
    }

    #[test]
    fn unlisted_glycan_is_empty() {
        let table = ReducingEndTable::parse(TABLE.as_bytes()).unwrap();
        assert_eq!(table.monosaccharide("G00002MO"), "");
        assert_eq!(table.monosaccharide("G99999ZZ"), "");
    }
}
