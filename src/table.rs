use std::fs::{self, File};
use std::io::{self, BufWriter, Write};

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tempfile::{Builder, NamedTempFile};

use crate::domain::parse_site;
use crate::error::GlycoError;
use crate::ranges::SiteDomain;
use crate::record::EnrichmentRecord;

pub const COLUMNS: [&str; 23] = [
    "uniprotkb_canonical_ac",
    "protein_name",
    "gene_name",
    "site",
    "amino_acid",
    "glycosylation_type",
    "glycosylation_subtype",
    "glytoucan_ac",
    "reducing_end_monosaccharide",
    "core_fucosylated",
    "source_tissue",
    "peptide_seq_five_before",
    "peptide_seq_five_after",
    "peptide_seq_ten_before",
    "peptide_seq_ten_after",
    "organism",
    "taxonomy_id",
    "molecular_function",
    "biological_process",
    "cellular_component",
    "domain",
    "range",
    "status",
];

/// One glycosylation site. Field order matches `COLUMNS`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Row {
    pub uniprotkb_canonical_ac: String,
    pub protein_name: String,
    pub gene_name: String,
    pub site: String,
    pub amino_acid: String,
    pub glycosylation_type: String,
    pub glycosylation_subtype: String,
    pub glytoucan_ac: String,
    pub reducing_end_monosaccharide: String,
    pub core_fucosylated: String,
    pub source_tissue: String,
    pub peptide_seq_five_before: String,
    pub peptide_seq_five_after: String,
    pub peptide_seq_ten_before: String,
    pub peptide_seq_ten_after: String,
    pub organism: String,
    pub taxonomy_id: String,
    pub molecular_function: String,
    pub biological_process: String,
    pub cellular_component: String,
    pub domain: String,
    pub range: String,
    pub status: String,
}

impl Row {
    pub fn site_position(&self) -> Option<u64> {
        parse_site(&self.site)
    }

    /// Copies the accession-level fields of `record` and the site-level domain into the row.
    pub fn apply(&mut self, record: &EnrichmentRecord) {
        let SiteDomain { domain, range } = record.domains.resolve(self.site_position());
        self.gene_name = record.gene_name.clone();
        self.glytoucan_ac = record.glytoucan_ac.clone();
        self.organism = record.organism.clone();
        self.molecular_function = record.molecular_function.clone();
        self.biological_process = record.biological_process.clone();
        self.cellular_component = record.cellular_component.clone();
        self.core_fucosylated = record.core_fucosylated.clone();
        self.source_tissue = record.source_tissue.clone();
        self.reducing_end_monosaccharide = record.reducing_end_monosaccharide.clone();
        self.domain = domain;
        self.range = range;
    }
}

pub fn read_table(path: &Utf8Path) -> Result<Vec<Row>, GlycoError> {
    let read_err = |message: String| GlycoError::TableRead {
        path: path.to_string(),
        message,
    };
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .from_path(path.as_std_path())
        .map_err(|err| read_err(err.to_string()))?;
    reader
        .deserialize::<Row>()
        .map(|row| row.map_err(|err| read_err(err.to_string())))
        .collect()
}

fn tsv_writer<W: Write>(inner: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(inner)
}

/// Accumulates rows in a replacement table and atomically swaps it over the
/// live table on `commit`. The live table is only ever replaced by rename.
pub struct OutputWriter {
    live_path: Utf8PathBuf,
    replacement: NamedTempFile,
    writer: csv::Writer<BufWriter<File>>,
    rows_written: usize,
}

impl OutputWriter {
    pub fn create(live_path: &Utf8Path) -> Result<Self, GlycoError> {
        let dir = parent_dir(live_path);
        fs::create_dir_all(dir.as_std_path())
            .map_err(|err| GlycoError::Filesystem(err.to_string()))?;
        let replacement = Builder::new()
            .prefix(".glyco-enrich-rows")
            .suffix(".tsv")
            .tempfile_in(dir.as_std_path())
            .map_err(|err| GlycoError::Filesystem(err.to_string()))?;
        let handle = replacement
            .reopen()
            .map_err(|err| GlycoError::Filesystem(err.to_string()))?;
        let mut writer = tsv_writer(BufWriter::new(handle));
        writer
            .write_record(COLUMNS)
            .map_err(|err| write_err(live_path, err))?;
        Ok(Self {
            live_path: live_path.to_path_buf(),
            replacement,
            writer,
            rows_written: 0,
        })
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn write(&mut self, row: &Row) -> Result<(), GlycoError> {
        self.writer
            .serialize(row)
            .map_err(|err| write_err(&self.live_path, err))?;
        self.rows_written += 1;
        Ok(())
    }

    /// Publishes every row written so far followed by `tail` as the new live table.
    pub fn commit(&mut self, tail: &[Row]) -> Result<(), GlycoError> {
        self.writer
            .flush()
            .map_err(|err| write_err(&self.live_path, err))?;

        let dir = parent_dir(&self.live_path);
        let staging = Builder::new()
            .prefix(".glyco-enrich-commit")
            .suffix(".tsv")
            .tempfile_in(dir.as_std_path())
            .map_err(|err| GlycoError::Filesystem(err.to_string()))?;
        {
            let mut written = File::open(self.replacement.path())
                .map_err(|err| write_err(&self.live_path, err))?;
            let mut out = BufWriter::new(staging.as_file());
            io::copy(&mut written, &mut out).map_err(|err| write_err(&self.live_path, err))?;
            let mut tail_writer = tsv_writer(out);
            for row in tail {
                tail_writer
                    .serialize(row)
                    .map_err(|err| write_err(&self.live_path, err))?;
            }
            tail_writer
                .flush()
                .map_err(|err| write_err(&self.live_path, err))?;
        }
        staging
            .as_file()
            .sync_all()
            .map_err(|err| write_err(&self.live_path, err))?;
        staging
            .persist(self.live_path.as_std_path())
            .map_err(|err| write_err(&self.live_path, err.error))?;
        Ok(())
    }
}

/// Rewrites `path` atomically with its current rows followed by `extra`.
pub fn append_rows(path: &Utf8Path, extra: &[Row]) -> Result<usize, GlycoError> {
    let existing = read_table(path)?;
    let mut writer = OutputWriter::create(path)?;
    for row in existing.iter().chain(extra) {
        writer.write(row)?;
    }
    writer.commit(&[])?;
    Ok(writer.rows_written())
}

fn parent_dir(path: &Utf8Path) -> &Utf8Path {
    match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    }
}

fn write_err(path: &Utf8Path, err: impl std::fmt::Display) -> GlycoError {
    GlycoError::TableWrite {
        path: path.to_string(),
        message: err.to_string(),
    }
}
