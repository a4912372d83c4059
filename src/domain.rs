use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GlycoError;

/// UniProtKB canonical accession as it appears in the site table, isoform suffix included.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProteinAccession(String);

impl ProteinAccession {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Accession without its isoform suffix (`P12345-1` -> `P12345`).
    pub fn base(&self) -> &str {
        match self.0.rsplit_once('-') {
            Some((head, tail))
                if !head.is_empty()
                    && !tail.is_empty()
                    && tail.chars().all(|ch| ch.is_ascii_digit()) =>
            {
                head
            }
            _ => &self.0,
        }
    }
}

impl fmt::Display for ProteinAccession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProteinAccession {
    type Err = GlycoError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        let is_valid = !normalized.is_empty()
            && normalized
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'));
        if !is_valid {
            return Err(GlycoError::InvalidAccession(value.to_string()));
        }
        Ok(Self(normalized.to_string()))
    }
}

/// Parses a 1-based residue position; anything else is treated as "no site".
pub fn parse_site(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok().filter(|site| *site > 0)
}
