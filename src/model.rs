//! Records returned by the ENCODE search and experiment endpoints.
//!
//! Only the fields the matcher reads are modelled; everything else in the
//! portal's JSON is ignored during deserialization. Optional fields stay
//! optional here so that incomplete records can be excluded downstream
//! instead of failing the whole fetch.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SearchResult {
    #[serde(rename = "@graph", default)]
    pub graph: Vec<SearchGraphEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchGraphEntry {
    pub accession: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct ExperimentRecord {
    pub accession: String,
    #[serde(default)]
    pub assay_title: Option<String>,
    #[serde(default)]
    pub biosample_ontology: Option<BiosampleOntology>,
    #[serde(default)]
    pub target: Option<TargetRecord>,
    #[serde(default)]
    pub files: Vec<FileRecord>,
    #[serde(default)]
    pub replicates: Vec<ReplicateRecord>,
}

impl ExperimentRecord {
    pub fn biosample_ontology_id(&self) -> Option<&str> {
        self.biosample_ontology.as_ref().map(|ontology| ontology.id.as_str())
    }

    pub fn target_label(&self) -> Option<&str> {
        self.target.as_ref().map(|target| target.label.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct BiosampleOntology {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(default)]
    pub term_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct TargetRecord {
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct FileRecord {
    #[serde(default)]
    pub accession: Option<String>,
    #[serde(default)]
    pub assembly: Option<String>,
    pub status: String,
    pub file_type: String,
    pub output_type: String,
    #[serde(default)]
    pub technical_replicates: Vec<String>,
    #[serde(default)]
    pub biological_replicates: Vec<u32>,
    #[serde(default)]
    pub quality_metrics: Option<Vec<QualityMetric>>,
    #[serde(default)]
    pub date_created: Option<String>,
    #[serde(default)]
    pub cloud_metadata: Option<CloudMetadata>,
}

impl FileRecord {
    pub fn url(&self) -> Option<&str> {
        self.cloud_metadata.as_ref().map(|meta| meta.url.as_str())
    }

    /// Mapped percentage of the first quality metric that reports one.
    pub fn mapped_pct(&self) -> Option<&str> {
        self.quality_metrics
            .as_deref()?
            .iter()
            .find_map(|metric| metric.mapped_pct.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct QualityMetric {
    #[serde(rename = "@type", default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub mapped_pct: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct CloudMetadata {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct ReplicateRecord {
    #[serde(default)]
    pub biological_replicate_number: Option<u32>,
    #[serde(default)]
    pub technical_replicate_number: Option<u32>,
    #[serde(default)]
    pub library: Option<LibraryRecord>,
    #[serde(default)]
    pub libraries: Option<Vec<LibraryRecord>>,
}

impl ReplicateRecord {
    /// The library this replicate exposes, if any: the single `library`
    /// reference first, otherwise the head of a non-empty `libraries` list.
    pub fn first_library(&self) -> Option<&LibraryRecord> {
        self.library
            .as_ref()
            .or_else(|| self.libraries.as_deref().and_then(|libs| libs.first()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct LibraryRecord {
    #[serde(default)]
    pub biosample: Option<BiosampleRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct BiosampleRecord {
    #[serde(default)]
    pub donor: Option<DonorRecord>,
    #[serde(default)]
    pub age: Option<String>,
    #[serde(default)]
    pub age_units: Option<String>,
    #[serde(default)]
    pub life_stage: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct DonorRecord {
    #[serde(rename = "@id")]
    pub id: String,
}

/// A file together with the experiment that owns it.
///
/// Equality and hashing are structural over both records, so two pairs built
/// from the same fetched data compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileWithExperiment {
    pub file: Arc<FileRecord>,
    pub experiment: Arc<ExperimentRecord>,
}

impl FileWithExperiment {
    pub fn new(file: Arc<FileRecord>, experiment: Arc<ExperimentRecord>) -> Self {
        Self { file, experiment }
    }

    /// Pairs every file of `experiment` accepted by `keep` with the experiment.
    pub fn from_experiment<F>(experiment: ExperimentRecord, keep: F) -> Vec<Self>
    where
        F: Fn(&FileRecord) -> bool,
    {
        let experiment = Arc::new(experiment);
        experiment
            .files
            .iter()
            .filter(|file| keep(file))
            .map(|file| Self::new(Arc::new(file.clone()), Arc::clone(&experiment)))
            .collect()
    }

    pub fn file_accession(&self) -> &str {
        self.file.accession.as_deref().unwrap_or_default()
    }

    pub fn experiment_accession(&self) -> &str {
        &self.experiment.accession
    }
}
