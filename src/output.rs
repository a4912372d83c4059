use std::io::{self, Write};

use serde::Serialize;

use crate::scheduler::RunSummary;

#[derive(Debug, Clone, Serialize)]
pub struct EnrichReport {
    pub input: String,
    pub output: String,
    pub cache: String,
    pub used_cache: bool,
    pub summary: RunSummary,
    pub unknown_sites_added: Option<usize>,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_report(report: &EnrichReport) -> io::Result<()> {
        Self::print_json(report)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

/// One-line human summary, printed when JSON output is not requested.
pub fn summary_line(report: &EnrichReport) -> String {
    let summary = &report.summary;
    let mut line = format!(
        "enriched {} rows into {} ({} cache hits, {} accessions fetched, {} checkpoints)",
        summary.rows,
        report.output,
        summary.cache_hits,
        summary.fetched_accessions,
        summary.checkpoints
    );
    if summary.passthrough_rows > 0 {
        line.push_str(&format!(", {} rows without a valid accession", summary.passthrough_rows));
    }
    if let Some(added) = report.unknown_sites_added {
        line.push_str(&format!(", {added} unknown sites added"));
    }
    line
}
