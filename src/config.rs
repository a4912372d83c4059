use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::ebi::DEFAULT_EBI_URL;
use crate::error::GlycoError;
use crate::glygen::DEFAULT_GLYGEN_URL;
use crate::go::default_go_tables;
use crate::reducing_end::DEFAULT_REDUCING_END_URL;
use crate::retry::{DEFAULT_MAX_RETRIES, RetryPolicy};

pub const DEFAULT_CONFIG_FILE: &str = "glyco-enrich.json";
pub const DEFAULT_TABLE_PATH: &str = "output/supersearch_results.tsv";
pub const DEFAULT_CACHE_PATH: &str = "output/cache.json";
pub const DEFAULT_WORKERS: usize = 10;
pub const DEFAULT_CHECKPOINT_EVERY: usize = 100;
pub const DEFAULT_RETRY_UNIT_MS: u64 = 1000;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub cache: Option<String>,
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default)]
    pub checkpoint_every: Option<usize>,
    #[serde(default)]
    pub max_retries: Option<usize>,
    #[serde(default)]
    pub retry_unit_ms: Option<u64>,
    #[serde(default)]
    pub services: ServicesConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ServicesConfig {
    #[serde(default)]
    pub glygen_url: Option<String>,
    #[serde(default)]
    pub ebi_url: Option<String>,
    #[serde(default)]
    pub reducing_end_url: Option<String>,
    /// Extra or replacement organism -> GO table URL entries.
    #[serde(default)]
    pub go_tables: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct ServiceEndpoints {
    pub glygen_url: String,
    pub ebi_url: String,
    pub reducing_end_url: String,
    pub go_tables: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub input: Utf8PathBuf,
    pub output: Utf8PathBuf,
    pub cache: Utf8PathBuf,
    pub workers: usize,
    pub checkpoint_every: usize,
    pub retry: RetryPolicy,
    pub services: ServiceEndpoints,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads `path`, or `glyco-enrich.json` when present; no file means defaults.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, GlycoError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| GlycoError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| GlycoError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, GlycoError> {
        let input = Utf8PathBuf::from(config.input.unwrap_or_else(|| DEFAULT_TABLE_PATH.into()));
        let output = config
            .output
            .map(Utf8PathBuf::from)
            .unwrap_or_else(|| input.clone());
        let cache = Utf8PathBuf::from(config.cache.unwrap_or_else(|| DEFAULT_CACHE_PATH.into()));

        let workers = positive(config.workers, DEFAULT_WORKERS, "workers")?;
        let checkpoint_every = positive(
            config.checkpoint_every,
            DEFAULT_CHECKPOINT_EVERY,
            "checkpoint_every",
        )?;
        let max_retries = positive(config.max_retries, DEFAULT_MAX_RETRIES, "max_retries")?;
        let retry_unit = Duration::from_millis(config.retry_unit_ms.unwrap_or(DEFAULT_RETRY_UNIT_MS));

        let mut go_tables = default_go_tables();
        go_tables.extend(config.services.go_tables);

        Ok(ResolvedConfig {
            input,
            output,
            cache,
            workers,
            checkpoint_every,
            retry: RetryPolicy::new(max_retries, retry_unit),
            services: ServiceEndpoints {
                glygen_url: config
                    .services
                    .glygen_url
                    .unwrap_or_else(|| DEFAULT_GLYGEN_URL.to_string()),
                ebi_url: config
                    .services
                    .ebi_url
                    .unwrap_or_else(|| DEFAULT_EBI_URL.to_string()),
                reducing_end_url: config
                    .services
                    .reducing_end_url
                    .unwrap_or_else(|| DEFAULT_REDUCING_END_URL.to_string()),
                go_tables,
            },
        })
    }
}

fn positive(value: Option<usize>, default: usize, name: &str) -> Result<usize, GlycoError> {
    match value {
        Some(0) => Err(GlycoError::ConfigParse(format!("{name} must be at least 1"))),
        Some(value) => Ok(value),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn defaults_rewrite_table_in_place() {
        let resolved = ConfigLoader::resolve_config(Config::default()).unwrap();
        assert_eq!(resolved.input, DEFAULT_TABLE_PATH);
        assert_eq!(resolved.output, resolved.input);
        assert_eq!(resolved.workers, DEFAULT_WORKERS);
        assert_eq!(resolved.checkpoint_every, DEFAULT_CHECKPOINT_EVERY);
        assert_eq!(resolved.retry.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(resolved.retry.time_unit, Duration::from_secs(1));
        assert_eq!(resolved.services.go_tables.len(), 12);
        assert_eq!(resolved.services.reducing_end_url, DEFAULT_REDUCING_END_URL);
    }

    #[test]
    fn zero_workers_rejected() {
        let config = Config {
            workers: Some(0),
            ..Config::default()
        };
        assert_matches!(
            ConfigLoader::resolve_config(config),
            Err(GlycoError::ConfigParse(_))
        );
    }
}
