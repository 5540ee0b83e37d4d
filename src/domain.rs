use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::MatchError;

static EXPERIMENT_ACCESSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(ENC|TST)SR\d{3}[A-Z]{3}$").expect("static regex"));

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExperimentAccession(String);

impl ExperimentAccession {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExperimentAccession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ExperimentAccession {
    type Err = MatchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().trim_matches('/').to_uppercase();
        let normalized = normalized
            .strip_prefix("EXPERIMENTS/")
            .unwrap_or(&normalized)
            .to_string();
        if !EXPERIMENT_ACCESSION.is_match(&normalized) {
            return Err(MatchError::InvalidAccession(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

/// Assay modalities the pipeline knows how to fetch and pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Modality {
    ChipSeq,
    #[value(alias = "methyl")]
    #[serde(alias = "methyl")]
    Methylation,
    Atac,
    Dnase,
    Histone,
}

impl Modality {
    pub const AUXILIARY: [Modality; 4] = [
        Modality::Methylation,
        Modality::Atac,
        Modality::Dnase,
        Modality::Histone,
    ];

    pub fn is_primary(self) -> bool {
        matches!(self, Modality::ChipSeq)
    }

    pub fn default_strategy(self) -> ResolutionStrategy {
        match self {
            Modality::Dnase => ResolutionStrategy::PerFile,
            _ => ResolutionStrategy::WholeExperiment,
        }
    }

    /// Column prefix used in metadata headers and output file names.
    pub fn prefix(self) -> &'static str {
        match self {
            Modality::ChipSeq => "peaks",
            Modality::Methylation => "methyl",
            Modality::Atac => "atac",
            Modality::Dnase => "dnase",
            Modality::Histone => "histone",
        }
    }

    pub fn file_label(self) -> &'static str {
        match self {
            Modality::ChipSeq => "peaks",
            Modality::Methylation => "methyl_bed",
            Modality::Atac => "atac_bam",
            Modality::Dnase => "dnase_bam",
            Modality::Histone => "histone_bigwig",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modality::ChipSeq => write!(f, "chip-seq"),
            Modality::Methylation => write!(f, "methylation"),
            Modality::Atac => write!(f, "atac"),
            Modality::Dnase => write!(f, "dnase"),
            Modality::Histone => write!(f, "histone"),
        }
    }
}

impl FromStr for Modality {
    type Err = MatchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "chip-seq" | "chipseq" => Ok(Modality::ChipSeq),
            "methylation" | "methyl" | "wgbs" => Ok(Modality::Methylation),
            "atac" | "atac-seq" => Ok(Modality::Atac),
            "dnase" | "dnase-seq" => Ok(Modality::Dnase),
            "histone" => Ok(Modality::Histone),
            _ => Err(MatchError::InvalidModality(value.to_string())),
        }
    }
}

/// How competing auxiliary candidates sharing one key are turned into results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionStrategy {
    /// The best-scoring experiment wins and contributes its whole file set.
    WholeExperiment,
    /// Every auxiliary file is paired 1:1 with the primary, without repeats.
    PerFile,
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionStrategy::WholeExperiment => write!(f, "whole-experiment"),
            ResolutionStrategy::PerFile => write!(f, "per-file"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// The first experiment that exhausts its retries aborts the whole fetch.
    #[default]
    Abort,
    /// Failed experiments are logged, reported and skipped.
    Isolate,
}

const UCSC_GOLDEN_PATH: &str = "https://hgdownload-test.gi.ucsc.edu/goldenPath";

pub fn ucsc_assembly_name(assembly: &str) -> &str {
    match assembly {
        "GRCh38" => "hg38",
        other => other,
    }
}

pub fn twobit_url(assembly: &str) -> String {
    let name = ucsc_assembly_name(assembly);
    format!("{UCSC_GOLDEN_PATH}/{name}/bigZips/{name}.2bit")
}

pub fn chrom_sizes_url(assembly: &str) -> String {
    let name = ucsc_assembly_name(assembly);
    format!("{UCSC_GOLDEN_PATH}/{name}/bigZips/{name}.chrom.sizes")
}

pub fn chrom_sizes_name(assembly: &str) -> String {
    format!("{}.chrom.sizes", ucsc_assembly_name(assembly))
}
