use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::bytes::Regex;
use tracing::warn;

use crate::cache::EnrichmentCache;
use crate::domain::ProteinAccession;
use crate::table::Row;

pub const UNKNOWN_STATUS: &str = "unknown_glycosite";

/// N-X-S/T-X sequon where neither X is proline. Matches single bytes, so
/// match offsets are residue offsets for ASCII sequences.
static SEQUON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u)N[^P][ST][^P]").expect("valid sequon pattern"));

const SEQUON_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteCandidate {
    /// 1-based residue position.
    pub position: u64,
    pub residue: &'static str,
    pub five_before: String,
    pub five_after: String,
    pub ten_before: String,
    pub ten_after: String,
}

/// Candidate sites of one sequence: every S/T/Y outside known sites and sequon
/// windows, then one candidate per sequon at its asparagine. Sequences with
/// non-ASCII characters are not residue strings and yield nothing.
pub fn scan(sequence: &str, known_sites: &HashSet<u64>) -> Vec<SiteCandidate> {
    if !sequence.is_ascii() {
        return Vec::new();
    }
    let bytes = sequence.as_bytes();
    let sequons: Vec<(usize, u8)> = SEQUON
        .find_iter(bytes)
        .map(|found| (found.start(), bytes[found.start() + 2]))
        .collect();
    let in_sequon = |idx: usize| {
        sequons
            .iter()
            .any(|(start, _)| (*start..*start + SEQUON_LEN).contains(&idx))
    };

    let mut candidates = Vec::new();
    for (letter, residue) in [(b'S', "Ser"), (b'T', "Thr"), (b'Y', "Tyr")] {
        for (idx, _) in bytes.iter().enumerate().filter(|(_, ch)| **ch == letter) {
            if known_sites.contains(&(idx as u64 + 1)) || in_sequon(idx) {
                continue;
            }
            candidates.push(candidate(bytes, idx, residue));
        }
    }
    for (start, acceptor) in sequons {
        let residue = if acceptor == b'S' { "Ser ARG" } else { "Thr ARG" };
        candidates.push(candidate(bytes, start, residue));
    }
    candidates
}

fn candidate(bytes: &[u8], idx: usize, residue: &'static str) -> SiteCandidate {
    let flank = |from: usize, to: usize| {
        let to = to.min(bytes.len());
        let from = from.min(to);
        String::from_utf8_lossy(&bytes[from..to]).into_owned()
    };
    SiteCandidate {
        position: idx as u64 + 1,
        residue,
        five_before: flank(idx.saturating_sub(5), idx),
        five_after: flank(idx + 1, idx + 6),
        ten_before: flank(idx.saturating_sub(10), idx),
        ten_after: flank(idx + 1, idx + 11),
    }
}

/// Builds `unknown_glycosite` rows for every accession of `rows` that has a
/// cached sequence. Sites already present in `rows` are never emitted twice.
pub fn unknown_site_rows(rows: &[Row], cache: &EnrichmentCache) -> Vec<Row> {
    let mut order: Vec<ProteinAccession> = Vec::new();
    let mut firsts: HashMap<ProteinAccession, &Row> = HashMap::new();
    let mut known: HashMap<ProteinAccession, HashSet<u64>> = HashMap::new();
    let mut existing: HashSet<(String, String, String)> = HashSet::new();

    for row in rows {
        existing.insert((
            row.uniprotkb_canonical_ac.clone(),
            row.site.trim().to_string(),
            row.amino_acid.clone(),
        ));
        let Ok(accession) = row.uniprotkb_canonical_ac.parse::<ProteinAccession>() else {
            continue;
        };
        if !firsts.contains_key(&accession) {
            order.push(accession.clone());
            firsts.insert(accession.clone(), row);
        }
        if row.status != UNKNOWN_STATUS {
            if let Some(site) = row.site_position() {
                known.entry(accession).or_default().insert(site);
            }
        }
    }

    let mut generated = Vec::new();
    for accession in order {
        let Some(record) = cache.get(&accession) else {
            warn!(accession = accession.as_str(), "no cached sequence, skipping site scan");
            continue;
        };
        if !record.sequence.is_ascii() {
            warn!(accession = accession.as_str(), "sequence is not ASCII, skipping site scan");
            continue;
        }
        let first = firsts[&accession];
        let known_sites = known.remove(&accession).unwrap_or_default();
        for site in scan(&record.sequence, &known_sites) {
            let key = (
                accession.as_str().to_string(),
                site.position.to_string(),
                site.residue.to_string(),
            );
            if existing.contains(&key) {
                continue;
            }
            let mut row = Row {
                uniprotkb_canonical_ac: accession.as_str().to_string(),
                protein_name: first.protein_name.clone(),
                site: site.position.to_string(),
                amino_acid: site.residue.to_string(),
                peptide_seq_five_before: site.five_before,
                peptide_seq_five_after: site.five_after,
                peptide_seq_ten_before: site.ten_before,
                peptide_seq_ten_after: site.ten_after,
                taxonomy_id: first.taxonomy_id.clone(),
                status: UNKNOWN_STATUS.to_string(),
                ..Row::default()
            };
            row.apply(record);
            row.glytoucan_ac.clear();
            row.core_fucosylated.clear();
            row.source_tissue.clear();
            row.reducing_end_monosaccharide.clear();
            generated.push(row);
        }
    }
    generated
}
