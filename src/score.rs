//! Quality scoring of competing experiments from their alignment QC.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::error::MatchError;
use crate::filter::FilePredicate;
use crate::model::ExperimentRecord;

/// Parses a `"<number>%"` mapped percentage. Only the text before the first
/// `%` is considered; anything that is not a finite number is malformed.
pub fn parse_mapped_percentage(value: &str) -> Result<f64, MatchError> {
    let number = value.split('%').next().unwrap_or_default().trim();
    match number.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() => Ok(parsed),
        _ => Err(MatchError::MalformedPercentage(value.to_string())),
    }
}

/// Mean over biological replicates of the summed mapped percentages of the
/// experiment's files accepted by `predicate`.
///
/// Files attributed to more than one biological replicate are ignored. A file
/// without a mapped percentage still places its replicate in the mean but adds
/// nothing to its sum. Returns `Ok(None)` when no replicate qualifies.
pub fn score_experiment(
    experiment: &ExperimentRecord,
    predicate: FilePredicate,
) -> Result<Option<f64>, MatchError> {
    let mut replicate_sums = BTreeMap::<u32, f64>::new();
    for file in experiment.files.iter().filter(|file| predicate(file)) {
        let [replicate] = file.biological_replicates.as_slice() else {
            continue;
        };
        let sum = replicate_sums.entry(*replicate).or_insert(0.0);
        if let Some(mapped) = file.mapped_pct() {
            *sum += parse_mapped_percentage(mapped)?;
        }
    }

    if replicate_sums.is_empty() {
        return Ok(None);
    }
    let total: f64 = replicate_sums.values().sum();
    Ok(Some(total / replicate_sums.len() as f64))
}

/// Memoizing scorer owned by a single resolution run.
pub struct QualityScorer {
    predicate: FilePredicate,
    cache: HashMap<String, Option<f64>>,
    evaluations: usize,
}

impl QualityScorer {
    pub fn new(predicate: FilePredicate) -> Self {
        Self {
            predicate,
            cache: HashMap::new(),
            evaluations: 0,
        }
    }

    pub fn score(&mut self, experiment: &ExperimentRecord) -> Result<Option<f64>, MatchError> {
        if let Some(score) = self.cache.get(&experiment.accession) {
            return Ok(*score);
        }
        let score = score_experiment(experiment, self.predicate)?;
        self.evaluations += 1;
        debug!(experiment = %experiment.accession, ?score, "scored experiment");
        self.cache.insert(experiment.accession.clone(), score);
        Ok(score)
    }

    /// Number of experiments actually scored, cache hits excluded.
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }
}
