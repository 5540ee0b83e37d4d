use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::{FailurePolicy, Modality, ResolutionStrategy};
use crate::encode::{ClientOptions, ENCODE_BASE_URL};
use crate::error::MatchError;
use crate::fetch::{self, DEFAULT_CONCURRENCY, FetchOptions};

pub const DEFAULT_CONFIG_FILE: &str = "encode-match.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub max_retries: Option<usize>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub failure_policy: Option<FailurePolicy>,
    #[serde(default)]
    pub min_peaks: Option<u64>,
    #[serde(default)]
    pub output_dir: Option<String>,
    #[serde(default)]
    pub modalities: Option<Vec<ModalityEntry>>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ModalityEntry {
    Shorthand(String),
    Detailed(ModalityEntryObject),
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ModalityEntryObject {
    pub modality: String,
    #[serde(default)]
    pub strategy: Option<ResolutionStrategy>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModalityRequest {
    pub modality: Modality,
    pub strategy: ResolutionStrategy,
}

impl ModalityRequest {
    pub fn with_default_strategy(modality: Modality) -> Self {
        Self {
            modality,
            strategy: modality.default_strategy(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub client: ClientOptions,
    pub fetch: FetchOptions,
    pub output_dir: Utf8PathBuf,
    pub modalities: Vec<ModalityRequest>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            client: ClientOptions::default(),
            fetch: FetchOptions::default(),
            output_dir: Utf8PathBuf::from("encode-match-out"),
            modalities: default_modalities(),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `encode-match.json` from the working directory.
    /// Without an explicit path a missing default file yields the defaults.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, MatchError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| MatchError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| MatchError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, MatchError> {
        let defaults = ResolvedConfig::default();

        let modalities = match config.modalities {
            None => defaults.modalities,
            Some(entries) => entries
                .into_iter()
                .map(|entry| match entry {
                    ModalityEntry::Shorthand(value) => {
                        Ok(ModalityRequest::with_default_strategy(parse_auxiliary(&value)?))
                    }
                    ModalityEntry::Detailed(obj) => {
                        let modality = parse_auxiliary(&obj.modality)?;
                        Ok(ModalityRequest {
                            modality,
                            strategy: obj.strategy.unwrap_or(modality.default_strategy()),
                        })
                    }
                })
                .collect::<Result<Vec<_>, MatchError>>()?,
        };

        Ok(ResolvedConfig {
            client: ClientOptions {
                base_url: config
                    .base_url
                    .unwrap_or_else(|| ENCODE_BASE_URL.to_string()),
                max_retries: config.max_retries.unwrap_or(defaults.client.max_retries),
                timeout: config
                    .timeout_secs
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.client.timeout),
            },
            fetch: FetchOptions {
                concurrency: fetch::bounded_concurrency(
                    config.concurrency.unwrap_or(DEFAULT_CONCURRENCY),
                ),
                failure_policy: config.failure_policy.unwrap_or_default(),
                min_peaks: config.min_peaks,
            },
            output_dir: config
                .output_dir
                .map(Utf8PathBuf::from)
                .unwrap_or(defaults.output_dir),
            modalities,
        })
    }
}

/// Auxiliary modalities only: the primary modality is always chip-seq.
fn parse_auxiliary(value: &str) -> Result<Modality, MatchError> {
    let modality: Modality = value.parse()?;
    if modality.is_primary() {
        return Err(MatchError::InvalidModality(value.to_string()));
    }
    Ok(modality)
}

pub fn default_modalities() -> Vec<ModalityRequest> {
    Modality::AUXILIARY
        .into_iter()
        .map(ModalityRequest::with_default_strategy)
        .collect()
}
