use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

use crate::config::{ModalityRequest, ResolvedConfig};
use crate::domain::{ExperimentAccession, Modality, ResolutionStrategy};
use crate::encode::EncodeClient;
use crate::error::MatchError;
use crate::fetch::{self, CatalogFetch, FetchFailure};
use crate::matching::{self, BiologicalIdentityKey};
use crate::model::FileWithExperiment;
use crate::output;
use crate::resolve::{MatchResult, Resolver};

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub generated_at: String,
    pub primary: CatalogSummary,
    pub peaks_path: String,
    pub modalities: Vec<ModalitySummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogSummary {
    pub modality: Modality,
    pub experiments: usize,
    pub files: usize,
    pub failures: Vec<FetchFailure>,
}

impl From<&CatalogFetch> for CatalogSummary {
    fn from(fetch: &CatalogFetch) -> Self {
        Self {
            modality: fetch.modality,
            experiments: fetch.experiments,
            files: fetch.pairs.len(),
            failures: fetch.failures.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModalitySummary {
    pub strategy: ResolutionStrategy,
    pub catalog: CatalogSummary,
    pub keys: usize,
    pub matches: usize,
    pub metadata_path: String,
    pub inputs_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InspectResult {
    pub experiment: String,
    pub files: Vec<InspectedFile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InspectedFile {
    pub accession: Option<String>,
    pub file_type: String,
    pub output_type: String,
    pub key: Option<BiologicalIdentityKey>,
}

/// Outcome of matching the primary catalog against one auxiliary modality.
#[derive(Debug, Clone)]
pub struct ModalityMatches {
    pub request: ModalityRequest,
    pub catalog: CatalogFetch,
    pub keys: usize,
    pub results: Vec<MatchResult>,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct App<E: EncodeClient> {
    client: E,
    config: ResolvedConfig,
}

impl<E: EncodeClient> App<E> {
    pub fn new(client: E, config: ResolvedConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// Fetches the primary catalog, matches it against every configured
    /// modality and writes the metadata and task-input files.
    pub fn run(&self, sink: &dyn ProgressSink) -> Result<RunSummary, MatchError> {
        let start = Instant::now();
        sink.event(ProgressEvent {
            message: "phase=Fetch; chip-seq peak catalog".to_string(),
            elapsed: None,
        });
        let primary = self.fetch_catalog(Modality::ChipSeq)?;
        sink.event(ProgressEvent {
            message: format!(
                "phase=Fetch; {} peak files from {} experiments",
                primary.pairs.len(),
                primary.experiments
            ),
            elapsed: Some(start.elapsed()),
        });

        let output_dir = &self.config.output_dir;
        let peaks_path = output_dir.join("peaks.tsv");
        output::write_atomic(&peaks_path, |file| {
            output::write_peaks_tsv(file, &primary.pairs)
        })?;

        let mut modalities = Vec::new();
        for request in &self.config.modalities {
            let matches = self.match_modality(&primary.pairs, *request, sink)?;
            let modality = request.modality;

            let metadata_path = output_dir.join(format!("{}-matches.tsv", modality.prefix()));
            output::write_atomic(&metadata_path, |file| {
                output::write_match_tsv(file, modality, &matches.results)
            })?;
            let inputs_path = output_dir.join(format!("{}-inputs.json", modality.prefix()));
            output::write_json_atomic(&inputs_path, &output::task_inputs(&matches.results))?;

            sink.event(ProgressEvent {
                message: format!(
                    "phase=Write; {} matches written to {metadata_path}",
                    matches.results.len()
                ),
                elapsed: Some(start.elapsed()),
            });
            modalities.push(ModalitySummary {
                strategy: request.strategy,
                catalog: CatalogSummary::from(&matches.catalog),
                keys: matches.keys,
                matches: matches.results.len(),
                metadata_path: metadata_path.to_string(),
                inputs_path: inputs_path.to_string(),
            });
        }

        info!(elapsed_ms = start.elapsed().as_millis() as u64, "run finished");
        Ok(RunSummary {
            generated_at: chrono::Utc::now().to_rfc3339(),
            primary: CatalogSummary::from(&primary),
            peaks_path: peaks_path.to_string(),
            modalities,
        })
    }

    pub fn fetch_catalog(&self, modality: Modality) -> Result<CatalogFetch, MatchError> {
        fetch::fetch_catalog(&self.client, modality, &self.config.fetch)
    }

    /// Fetches one auxiliary catalog and resolves `primaries` against it.
    pub fn match_modality(
        &self,
        primaries: &[FileWithExperiment],
        request: ModalityRequest,
        sink: &dyn ProgressSink,
    ) -> Result<ModalityMatches, MatchError> {
        sink.event(ProgressEvent {
            message: format!("phase=Fetch; {} catalog", request.modality),
            elapsed: None,
        });
        let catalog = self.fetch_catalog(request.modality)?;

        let groups = matching::group_by_key(&catalog.pairs);
        let resolver = Resolver::new(
            request.strategy,
            fetch::scorer_predicate(request.modality),
        );
        sink.event(ProgressEvent {
            message: format!(
                "phase=Resolve; {} candidates under {} keys, strategy {}",
                catalog.pairs.len(),
                groups.len(),
                resolver.strategy()
            ),
            elapsed: None,
        });
        let results = resolver.resolve(primaries, &groups)?;

        Ok(ModalityMatches {
            request,
            keys: groups.len(),
            catalog,
            results,
        })
    }

    /// Shows the identity key each file of an experiment would match under.
    pub fn inspect(&self, accession: &ExperimentAccession) -> Result<InspectResult, MatchError> {
        let experiment = self.client.experiment(accession)?;
        let experiment_accession = experiment.accession.clone();
        let files = FileWithExperiment::from_experiment(experiment, |_| true)
            .into_iter()
            .map(|pair| InspectedFile {
                key: matching::match_key(&pair),
                accession: pair.file.accession.clone(),
                file_type: pair.file.file_type.clone(),
                output_type: pair.file.output_type.clone(),
            })
            .collect();
        Ok(InspectResult {
            experiment: experiment_accession,
            files,
        })
    }
}
