//! Resolution of primary candidates against co-keyed auxiliary candidates.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexSet;
use tracing::{debug, info};

use crate::domain::ResolutionStrategy;
use crate::error::MatchError;
use crate::filter::FilePredicate;
use crate::matching::{BiologicalIdentityKey, CandidateGroups, match_key};
use crate::model::{ExperimentRecord, FileRecord, FileWithExperiment};
use crate::score::QualityScorer;

/// A primary candidate paired with files of exactly one auxiliary experiment.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub primary: FileWithExperiment,
    pub experiment: Arc<ExperimentRecord>,
    pub files: Vec<Arc<FileRecord>>,
    pub key: BiologicalIdentityKey,
}

impl MatchResult {
    pub fn file_accessions(&self) -> Vec<&str> {
        self.files
            .iter()
            .map(|file| file.accession.as_deref().unwrap_or_default())
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Resolver {
    strategy: ResolutionStrategy,
    predicate: FilePredicate,
}

impl Resolver {
    pub fn new(strategy: ResolutionStrategy, predicate: FilePredicate) -> Self {
        Self {
            strategy,
            predicate,
        }
    }

    pub fn strategy(&self) -> ResolutionStrategy {
        self.strategy
    }

    /// Resolves with a fresh score cache scoped to this call.
    pub fn resolve(
        &self,
        primaries: &[FileWithExperiment],
        auxiliary: &CandidateGroups,
    ) -> Result<Vec<MatchResult>, MatchError> {
        let mut scorer = QualityScorer::new(self.predicate);
        self.resolve_with(primaries, auxiliary, &mut scorer)
    }

    pub fn resolve_with(
        &self,
        primaries: &[FileWithExperiment],
        auxiliary: &CandidateGroups,
        scorer: &mut QualityScorer,
    ) -> Result<Vec<MatchResult>, MatchError> {
        let results = match self.strategy {
            ResolutionStrategy::WholeExperiment => {
                resolve_whole_experiment(primaries, auxiliary, scorer)?
            }
            ResolutionStrategy::PerFile => resolve_per_file(primaries, auxiliary),
        };
        info!(
            strategy = %self.strategy,
            primaries = primaries.len(),
            keys = auxiliary.len(),
            matches = results.len(),
            "resolution finished"
        );
        Ok(results)
    }
}

fn resolve_whole_experiment(
    primaries: &[FileWithExperiment],
    auxiliary: &CandidateGroups,
    scorer: &mut QualityScorer,
) -> Result<Vec<MatchResult>, MatchError> {
    let mut results = Vec::new();
    let mut seen = HashSet::new();
    for primary in primaries {
        if !seen.insert(primary) {
            continue;
        }
        let Some((key, candidates)) = co_keyed(primary, auxiliary) else {
            continue;
        };
        let Some(winner) = choose_experiment(candidates, scorer)? else {
            debug!(
                file = primary.file_accession(),
                "no scoreable auxiliary experiment"
            );
            continue;
        };
        let files = candidates
            .iter()
            .filter(|candidate| candidate.experiment.accession == winner.accession)
            .map(|candidate| Arc::clone(&candidate.file))
            .collect();
        results.push(MatchResult {
            primary: primary.clone(),
            experiment: winner,
            files,
            key,
        });
    }
    Ok(results)
}

fn resolve_per_file(
    primaries: &[FileWithExperiment],
    auxiliary: &CandidateGroups,
) -> Vec<MatchResult> {
    let mut results = Vec::new();
    let mut emitted = HashSet::new();
    for primary in primaries {
        let Some((key, candidates)) = co_keyed(primary, auxiliary) else {
            continue;
        };
        for candidate in candidates {
            if !emitted.insert((primary, candidate)) {
                continue;
            }
            results.push(MatchResult {
                primary: primary.clone(),
                experiment: Arc::clone(&candidate.experiment),
                files: vec![Arc::clone(&candidate.file)],
                key: key.clone(),
            });
        }
    }
    results
}

fn co_keyed<'a>(
    primary: &FileWithExperiment,
    auxiliary: &'a CandidateGroups,
) -> Option<(BiologicalIdentityKey, &'a IndexSet<FileWithExperiment>)> {
    let key = match_key(primary)?;
    let candidates = auxiliary.get(&key).filter(|set| !set.is_empty())?;
    Some((key, candidates))
}

/// Distinct experiments by accession, in candidate order.
fn distinct_experiments<'a, I>(candidates: I) -> Vec<&'a Arc<ExperimentRecord>>
where
    I: IntoIterator<Item = &'a FileWithExperiment>,
{
    let mut accessions = HashSet::new();
    let mut experiments = Vec::new();
    for candidate in candidates {
        let experiment = &candidate.experiment;
        if accessions.insert(experiment.accession.as_str()) {
            experiments.push(experiment);
        }
    }
    experiments
}

/// Picks the experiment with the strictly greatest score; the first one
/// enumerated wins a tie. Unscoreable experiments are never picked when more
/// than one experiment competes.
fn choose_experiment<'a, I>(
    candidates: I,
    scorer: &mut QualityScorer,
) -> Result<Option<Arc<ExperimentRecord>>, MatchError>
where
    I: IntoIterator<Item = &'a FileWithExperiment>,
{
    let experiments = distinct_experiments(candidates);
    if let [only] = experiments.as_slice() {
        return Ok(Some(Arc::clone(only)));
    }

    let mut best: Option<(&Arc<ExperimentRecord>, f64)> = None;
    for experiment in experiments {
        let Some(score) = scorer.score(experiment)? else {
            continue;
        };
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((experiment, score)),
        }
    }
    Ok(best.map(|(experiment, _)| Arc::clone(experiment)))
}
