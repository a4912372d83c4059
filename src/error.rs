use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum GlycoError {
    #[error("invalid protein accession: {0:?}")]
    InvalidAccession(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("{service} request failed: {message}")]
    Http {
        service: &'static str,
        message: String,
    },

    #[error("{service} returned status {status}: {message}")]
    Status {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("{service} returned an unreadable response: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },

    #[error("{service} lookup for {target} failed after {attempts} attempts: {last_error}")]
    #[diagnostic(help(
        "cache and output table were left at the last checkpoint; re-run with the cache enabled to resume"
    ))]
    FetchExhausted {
        service: &'static str,
        target: String,
        attempts: usize,
        last_error: String,
    },

    #[error("failed to read table {path}: {message}")]
    TableRead { path: String, message: String },

    #[error("failed to write table {path}: {message}")]
    TableWrite { path: String, message: String },

    #[error("failed to parse cache file {path}: {message}")]
    CacheParse { path: String, message: String },

    #[error("worker pool failed: {0}")]
    Worker(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl GlycoError {
    /// Network failures, non-2xx statuses and undecodable bodies are worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GlycoError::Http { .. } | GlycoError::Status { .. } | GlycoError::Decode { .. }
        )
    }
}
