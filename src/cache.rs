use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::Builder;
use tracing::info;

use crate::domain::ProteinAccession;
use crate::error::GlycoError;
use crate::record::EnrichmentRecord;

/// Accession -> record map persisted as one JSON object.
///
/// Only the control thread of a run touches the cache; workers hand records
/// back and never see it.
#[derive(Debug)]
pub struct EnrichmentCache {
    path: Utf8PathBuf,
    entries: BTreeMap<String, EnrichmentRecord>,
    dirty: bool,
}

impl EnrichmentCache {
    pub fn empty(path: &Utf8Path) -> Self {
        Self {
            path: path.to_path_buf(),
            entries: BTreeMap::new(),
            dirty: false,
        }
    }

    pub fn load(path: &Utf8Path) -> Result<Self, GlycoError> {
        if !path.as_std_path().exists() {
            return Ok(Self::empty(path));
        }
        let content =
            fs::read(path.as_std_path()).map_err(|err| GlycoError::Filesystem(err.to_string()))?;
        let entries: BTreeMap<String, EnrichmentRecord> =
            serde_json::from_slice(&content).map_err(|err| GlycoError::CacheParse {
                path: path.to_string(),
                message: err.to_string(),
            })?;
        info!(path = %path, entries = entries.len(), "loaded enrichment cache");
        Ok(Self {
            path: path.to_path_buf(),
            entries,
            dirty: false,
        })
    }

    /// Loads the cache file when `use_cache` is set, otherwise starts empty.
    pub fn open(path: &Utf8Path, use_cache: bool) -> Result<Self, GlycoError> {
        if use_cache {
            Self::load(path)
        } else {
            Ok(Self::empty(path))
        }
    }

    pub fn get(&self, accession: &ProteinAccession) -> Option<&EnrichmentRecord> {
        self.entries.get(accession.as_str())
    }

    pub fn contains(&self, accession: &ProteinAccession) -> bool {
        self.entries.contains_key(accession.as_str())
    }

    pub fn put(&mut self, accession: &ProteinAccession, record: EnrichmentRecord) {
        self.entries.insert(accession.as_str().to_string(), record);
        self.dirty = true;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the whole map to a sibling temp file and renames it over the cache path.
    pub fn flush(&mut self) -> Result<(), GlycoError> {
        if !self.dirty && self.path.as_std_path().exists() {
            return Ok(());
        }
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent,
            _ => Utf8Path::new("."),
        };
        fs::create_dir_all(dir.as_std_path())
            .map_err(|err| GlycoError::Filesystem(err.to_string()))?;
        let temp = Builder::new()
            .prefix(".glyco-enrich-cache")
            .suffix(".json")
            .tempfile_in(dir.as_std_path())
            .map_err(|err| GlycoError::Filesystem(err.to_string()))?;
        {
            let mut out = BufWriter::new(temp.as_file());
            serde_json::to_writer(&mut out, &self.entries)
                .map_err(|err| GlycoError::Filesystem(err.to_string()))?;
            out.flush()
                .map_err(|err| GlycoError::Filesystem(err.to_string()))?;
        }
        temp.as_file()
            .sync_all()
            .map_err(|err| GlycoError::Filesystem(err.to_string()))?;
        temp.persist(self.path.as_std_path())
            .map_err(|err| GlycoError::Filesystem(err.error.to_string()))?;
        self.dirty = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn record(gene: &str) -> EnrichmentRecord {
        EnrichmentRecord {
            gene_name: gene.to_string(),
            sequence: "MKNST".to_string(),
            ..EnrichmentRecord::default()
        }
    }

    #[test]
    fn flush_then_load_restores_entries() {
        let temp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("out").join("cache.json")).unwrap();
        let acc: ProteinAccession = "P02763-1".parse().unwrap();

        let mut cache = EnrichmentCache::empty(&path);
        cache.put(&acc, record("ORM1"));
        cache.flush().unwrap();

        let loaded = EnrichmentCache::load(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains(&acc));
        assert_eq!(loaded.get(&acc).unwrap().gene_name, "ORM1");
    }

    #[test]
    fn put_replaces_whole_record() {
        let temp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("cache.json")).unwrap();
        let acc: ProteinAccession = "P1".parse().unwrap();
        let mut cache = EnrichmentCache::empty(&path);
        cache.put(&acc, record("A"));
        cache.put(&acc, record("B"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&acc).unwrap().gene_name, "B");
    }

    #[test]
    fn open_without_cache_ignores_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("cache.json")).unwrap();
        let acc: ProteinAccession = "P1".parse().unwrap();
        let mut cache = EnrichmentCache::empty(&path);
        cache.put(&acc, record("A"));
        cache.flush().unwrap();

        assert_eq!(EnrichmentCache::open(&path, true).unwrap().len(), 1);
        assert!(EnrichmentCache::open(&path, false).unwrap().is_empty());
    }

    #[test]
    fn missing_file_loads_empty() {
        let temp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("absent.json")).unwrap();
        assert!(EnrichmentCache::load(&path).unwrap().is_empty());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let temp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("cache.json")).unwrap();
        fs::write(path.as_std_path(), b"{\"P1\": ").unwrap();
        assert_matches!(
            EnrichmentCache::load(&path),
            Err(GlycoError::CacheParse { .. })
        );
    }

    #[test]
    fn flush_leaves_no_temp_files() {
        let temp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("cache.json")).unwrap();
        let mut cache = EnrichmentCache::empty(&path);
        cache.put(&"P1".parse::<ProteinAccession>().unwrap(), record("A"));
        cache.flush().unwrap();
        cache.put(&"P2".parse::<ProteinAccession>().unwrap(), record("B"));
        cache.flush().unwrap();
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
    }
}
