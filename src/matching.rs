//! Biological identity keys and grouping of candidates by key.

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use tracing::debug;

use crate::model::{BiosampleRecord, FileWithExperiment};

/// Fields two records must share, exactly, to describe the same biology:
/// same sample type, same donor at the same age and life stage, same assembly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BiologicalIdentityKey {
    biosample_ontology_id: String,
    assembly: String,
    donor_id: String,
    age: String,
    age_units: Option<String>,
    life_stage: String,
}

impl BiologicalIdentityKey {
    pub fn new(
        biosample_ontology_id: impl Into<String>,
        assembly: impl Into<String>,
        donor_id: impl Into<String>,
        age: impl Into<String>,
        age_units: Option<String>,
        life_stage: impl Into<String>,
    ) -> Self {
        Self {
            biosample_ontology_id: biosample_ontology_id.into(),
            assembly: assembly.into(),
            donor_id: donor_id.into(),
            age: age.into(),
            age_units,
            life_stage: life_stage.into(),
        }
    }

    fn from_biosample(
        biosample_ontology_id: &str,
        assembly: &str,
        biosample: &BiosampleRecord,
    ) -> Option<Self> {
        Some(Self::new(
            biosample_ontology_id,
            assembly,
            biosample.donor.as_ref()?.id.as_str(),
            biosample.age.as_deref()?,
            biosample.age_units.clone(),
            biosample.life_stage.as_deref()?,
        ))
    }

    pub fn biosample_ontology_id(&self) -> &str {
        &self.biosample_ontology_id
    }

    pub fn assembly(&self) -> &str {
        &self.assembly
    }

    pub fn donor_id(&self) -> &str {
        &self.donor_id
    }

    pub fn age(&self) -> &str {
        &self.age
    }

    pub fn age_units(&self) -> Option<&str> {
        self.age_units.as_deref()
    }

    pub fn life_stage(&self) -> &str {
        &self.life_stage
    }
}

/// Derives the identity key of a pair, or `None` when the pair is unkeyable.
///
/// Only the first replicate exposing a library is consulted; later replicates
/// are never used as a fallback even if the first one's biosample is
/// incomplete.
pub fn match_key(pair: &FileWithExperiment) -> Option<BiologicalIdentityKey> {
    let assembly = pair.file.assembly.as_deref()?;
    let ontology_id = pair.experiment.biosample_ontology_id()?;
    let library = pair
        .experiment
        .replicates
        .iter()
        .find_map(|replicate| replicate.first_library())?;
    let biosample = library.biosample.as_ref()?;
    BiologicalIdentityKey::from_biosample(ontology_id, assembly, biosample)
}

/// Candidates keyed by biological identity, in first-seen order.
pub type CandidateGroups = IndexMap<BiologicalIdentityKey, IndexSet<FileWithExperiment>>;

pub fn group_by_key<'a, I>(pairs: I) -> CandidateGroups
where
    I: IntoIterator<Item = &'a FileWithExperiment>,
{
    let mut groups = CandidateGroups::new();
    for pair in pairs {
        match match_key(pair) {
            Some(key) => {
                groups.entry(key).or_default().insert(pair.clone());
            }
            None => debug!(
                file = pair.file_accession(),
                experiment = pair.experiment_accession(),
                "unkeyable candidate skipped"
            ),
        }
    }
    groups
}
