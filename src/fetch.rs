//! Catalog fetch: search the portal for one modality, then fetch every
//! experiment on a bounded worker pool and keep the files that modality uses.

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::{ExperimentAccession, FailurePolicy, Modality};
use crate::encode::{EncodeClient, SearchQuery};
use crate::error::MatchError;
use crate::filter::{self, FilePredicate};
use crate::model::{FileRecord, FileWithExperiment};

pub const DEFAULT_CONCURRENCY: usize = 50;
/// Upper bound on simultaneous experiment-detail requests.
pub const MAX_CONCURRENCY: usize = 50;

pub fn bounded_concurrency(requested: usize) -> usize {
    requested.clamp(1, MAX_CONCURRENCY)
}

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub concurrency: usize,
    pub failure_policy: FailurePolicy,
    /// Minimum number of peaks a primary peak file must contain.
    pub min_peaks: Option<u64>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            failure_policy: FailurePolicy::Abort,
            min_peaks: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchFailure {
    pub accession: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct CatalogFetch {
    pub modality: Modality,
    pub experiments: usize,
    pub pairs: Vec<FileWithExperiment>,
    pub failures: Vec<FetchFailure>,
}

/// Files of a modality's experiments that enter matching.
pub fn catalog_filter(modality: Modality) -> FilePredicate {
    match modality {
        Modality::ChipSeq => |file: &FileRecord| {
            filter::is_released(file)
                && filter::is_replicated_peaks(file)
                && filter::is_usable_peak_record(file)
                && filter::is_public_download(file)
        },
        Modality::Methylation => |file: &FileRecord| {
            filter::is_released(file)
                && filter::is_bed_methyl(file)
                && filter::is_public_download(file)
        },
        Modality::Atac | Modality::Dnase => |file: &FileRecord| {
            filter::is_released(file)
                && filter::is_alignment(file)
                && filter::is_bam(file)
                && filter::is_public_download(file)
        },
        Modality::Histone => |file: &FileRecord| {
            filter::is_released(file)
                && filter::is_fold_change_signal(file)
                && filter::is_public_download(file)
        },
    }
}

/// Files whose QC decides between competing experiments of a modality.
pub fn scorer_predicate(modality: Modality) -> FilePredicate {
    match modality {
        Modality::Atac | Modality::Dnase => filter::is_bam,
        Modality::ChipSeq | Modality::Methylation | Modality::Histone => filter::is_alignment,
    }
}

pub fn fetch_catalog<C>(
    client: &C,
    modality: Modality,
    options: &FetchOptions,
) -> Result<CatalogFetch, MatchError>
where
    C: EncodeClient + ?Sized,
{
    let accessions = valid_accessions(client.search(&SearchQuery::for_modality(modality))?);
    info!(%modality, experiments = accessions.len(), "search finished");

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(bounded_concurrency(options.concurrency))
        .build()
        .map_err(|err| MatchError::ThreadPool(err.to_string()))?;

    let lookup = |accession: &ExperimentAccession| {
        fetch_experiment_pairs(client, modality, accession, options).map_err(|err| {
            MatchError::ExperimentFetch {
                accession: accession.to_string(),
                source: Box::new(err),
            }
        })
    };

    let (pairs, failures) = match options.failure_policy {
        FailurePolicy::Abort => {
            let fetched: Vec<Vec<FileWithExperiment>> = pool.install(|| {
                accessions
                    .par_iter()
                    .map(lookup)
                    .collect::<Result<Vec<_>, MatchError>>()
            })?;
            (fetched.into_iter().flatten().collect(), Vec::new())
        }
        FailurePolicy::Isolate => {
            let outcomes: Vec<_> =
                pool.install(|| accessions.par_iter().map(lookup).collect());
            let mut pairs = Vec::new();
            let mut failures = Vec::new();
            for (accession, outcome) in accessions.iter().zip(outcomes) {
                match outcome {
                    Ok(fetched) => pairs.extend(fetched),
                    Err(err) => {
                        let message = match &err {
                            MatchError::ExperimentFetch { source, .. } => source.to_string(),
                            other => other.to_string(),
                        };
                        warn!(%accession, %message, "experiment skipped");
                        failures.push(FetchFailure {
                            accession: accession.to_string(),
                            message,
                        });
                    }
                }
            }
            (pairs, failures)
        }
    };

    info!(
        %modality,
        files = pairs.len(),
        failures = failures.len(),
        "catalog fetched"
    );
    Ok(CatalogFetch {
        modality,
        experiments: accessions.len(),
        pairs,
        failures,
    })
}

/// Search hits that are not experiment accessions are dropped, not fetched.
fn valid_accessions(hits: Vec<String>) -> Vec<ExperimentAccession> {
    hits.into_iter()
        .filter_map(|hit| match hit.parse() {
            Ok(accession) => Some(accession),
            Err(_) => {
                debug!(%hit, "search hit is not an experiment accession");
                None
            }
        })
        .collect()
}

fn fetch_experiment_pairs<C>(
    client: &C,
    modality: Modality,
    accession: &ExperimentAccession,
    options: &FetchOptions,
) -> Result<Vec<FileWithExperiment>, MatchError>
where
    C: EncodeClient + ?Sized,
{
    let experiment = client.experiment(accession)?;
    let pairs = FileWithExperiment::from_experiment(experiment, catalog_filter(modality));

    let Some(min_peaks) = options.min_peaks.filter(|_| modality.is_primary()) else {
        return Ok(pairs);
    };
    let mut kept = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let Some(url) = pair.file.url() else {
            continue;
        };
        let peaks = client.count_peaks(url)?;
        if peaks >= min_peaks {
            kept.push(pair);
        } else {
            debug!(file = pair.file_accession(), peaks, "too few peaks");
        }
    }
    Ok(kept)
}
