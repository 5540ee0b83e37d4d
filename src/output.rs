use std::fs;
use std::io::{self, Write};

use camino::Utf8Path;
use csv::WriterBuilder;
use serde::Serialize;

use crate::app::{InspectResult, RunSummary};
use crate::domain::{self, Modality};
use crate::error::MatchError;
use crate::model::FileWithExperiment;
use crate::resolve::MatchResult;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_summary(result: &RunSummary) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_inspect(result: &InspectResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl crate::app::ProgressSink for JsonOutput {
    fn event(&self, _event: crate::app::ProgressEvent) {}
}

/// Header of the per-modality match metadata file.
pub fn match_header(modality: Modality) -> Vec<String> {
    let mut header = vec![
        "#peaks_accession".to_string(),
        "dataset_accession".to_string(),
        format!("{}_dataset_accession", modality.prefix()),
        format!("{}_accessions", modality.file_label()),
        "assembly".to_string(),
        "biosample_ontology_id".to_string(),
        "donor".to_string(),
        "life_stage".to_string(),
        "age".to_string(),
        "age_units".to_string(),
    ];
    if modality == Modality::Histone {
        header.push("histone_mark".to_string());
    }
    header
}

pub fn match_row(modality: Modality, result: &MatchResult) -> Vec<String> {
    let key = &result.key;
    let mut row = vec![
        result.primary.file_accession().to_string(),
        result.primary.experiment_accession().to_string(),
        result.experiment.accession.clone(),
        result.file_accessions().join(","),
        key.assembly().to_string(),
        key.biosample_ontology_id().to_string(),
        key.donor_id().to_string(),
        key.life_stage().to_string(),
        key.age().to_string(),
        key.age_units().unwrap_or_default().to_string(),
    ];
    if modality == Modality::Histone {
        row.push(
            result
                .experiment
                .target_label()
                .unwrap_or_default()
                .to_string(),
        );
    }
    row
}

pub fn write_match_tsv<W: Write>(
    writer: W,
    modality: Modality,
    results: &[MatchResult],
) -> Result<(), MatchError> {
    let mut writer = tsv_writer(writer);
    writer
        .write_record(match_header(modality))
        .map_err(|err| MatchError::Output(err.to_string()))?;
    for result in results {
        writer
            .write_record(match_row(modality, result))
            .map_err(|err| MatchError::Output(err.to_string()))?;
    }
    writer
        .flush()
        .map_err(|err| MatchError::Output(err.to_string()))
}

/// Metadata of the primary peak files that entered matching.
pub fn write_peaks_tsv<W: Write>(
    writer: W,
    pairs: &[FileWithExperiment],
) -> Result<(), MatchError> {
    let mut writer = tsv_writer(writer);
    writer
        .write_record(["#peaks_accession", "dataset_accession", "assembly"])
        .map_err(|err| MatchError::Output(err.to_string()))?;
    for pair in pairs {
        writer
            .write_record([
                pair.file_accession(),
                pair.experiment_accession(),
                pair.file.assembly.as_deref().unwrap_or_default(),
            ])
            .map_err(|err| MatchError::Output(err.to_string()))?;
    }
    writer
        .flush()
        .map_err(|err| MatchError::Output(err.to_string()))
}

fn tsv_writer<W: Write>(writer: W) -> csv::Writer<W> {
    WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(writer)
}

/// Inputs one matched peak file hands to the external motif workflow.
#[derive(Debug, Clone, Serialize)]
pub struct TaskInput {
    pub peaks_accession: String,
    pub peaks_url: Option<String>,
    pub assembly: String,
    pub twobit_url: String,
    pub chrom_sizes_url: String,
    pub chrom_sizes_name: String,
    pub auxiliary_experiment: String,
    pub auxiliary_urls: Vec<String>,
}

pub fn task_inputs(results: &[MatchResult]) -> Vec<TaskInput> {
    results
        .iter()
        .map(|result| {
            let assembly = result.key.assembly();
            TaskInput {
                peaks_accession: result.primary.file_accession().to_string(),
                peaks_url: result.primary.file.url().map(str::to_string),
                assembly: assembly.to_string(),
                twobit_url: domain::twobit_url(assembly),
                chrom_sizes_url: domain::chrom_sizes_url(assembly),
                chrom_sizes_name: domain::chrom_sizes_name(assembly),
                auxiliary_experiment: result.experiment.accession.clone(),
                auxiliary_urls: result
                    .files
                    .iter()
                    .filter_map(|file| file.url().map(str::to_string))
                    .collect(),
            }
        })
        .collect()
}

/// Writes through a temporary file in the destination directory and
/// renames it into place once complete.
pub fn write_atomic<F>(path: &Utf8Path, write: F) -> Result<(), MatchError>
where
    F: FnOnce(&mut fs::File) -> Result<(), MatchError>,
{
    let parent = path
        .parent()
        .ok_or_else(|| MatchError::Filesystem(format!("invalid output path {path}")))?;
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| MatchError::Filesystem(err.to_string()))?;
    let mut temp = tempfile::Builder::new()
        .prefix("encode-match")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| MatchError::Filesystem(err.to_string()))?;
    write(temp.as_file_mut())?;
    temp.persist(path.as_std_path())
        .map_err(|err| MatchError::Filesystem(err.to_string()))?;
    Ok(())
}

pub fn write_json_atomic<T: Serialize>(path: &Utf8Path, value: &T) -> Result<(), MatchError> {
    write_atomic(path, |file| {
        serde_json::to_writer_pretty(&mut *file, value)
            .map_err(|err| MatchError::Output(err.to_string()))?;
        file.write_all(b"\n")
            .map_err(|err| MatchError::Filesystem(err.to_string()))
    })
}
