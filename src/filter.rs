//! Predicates classifying ENCODE file records.

use crate::model::FileRecord;

pub type FilePredicate = fn(&FileRecord) -> bool;

const REPLICATED_PEAK_OUTPUTS: [&str; 5] = [
    "replicated peaks",
    "optimal IDR thresholded peaks",
    "conservative IDR thresholded peaks",
    "pseudoreplicated peaks",
    "IDR thresholded peaks",
];

const PRIVATE_BUCKET: &str = "encode-private";

pub fn is_released(file: &FileRecord) -> bool {
    file.status.eq_ignore_ascii_case("released")
}

pub fn is_replicated_peaks(file: &FileRecord) -> bool {
    file.file_type == "bed narrowPeak"
        && REPLICATED_PEAK_OUTPUTS
            .iter()
            .any(|output| file.output_type.eq_ignore_ascii_case(output))
}

pub fn is_bed_methyl(file: &FileRecord) -> bool {
    file.file_type == "bed bedMethyl" && file.output_type == "methylation state at CpG"
}

pub fn is_alignment(file: &FileRecord) -> bool {
    file.output_type == "alignments"
}

pub fn is_bam(file: &FileRecord) -> bool {
    file.file_type == "bam"
}

pub fn is_fold_change_signal(file: &FileRecord) -> bool {
    file.file_type == "bigWig" && file.output_type == "fold change over control"
}

/// Signal tracks and big* conversions are derived from the primary calls.
fn is_derived_track(file: &FileRecord) -> bool {
    file.file_type.starts_with("big")
}

fn signals_replication(file: &FileRecord) -> bool {
    let output = file.output_type.to_lowercase();
    output.contains("replicated") || output.contains("idr thresholded")
}

pub fn is_usable_peak_record(file: &FileRecord) -> bool {
    file.assembly.is_some()
        && signals_replication(file)
        && !file.technical_replicates.is_empty()
        && !is_derived_track(file)
}

/// Files without a cloud URL, or stored in the access-controlled bucket,
/// cannot be handed to downstream tools.
pub fn is_public_download(file: &FileRecord) -> bool {
    file.url()
        .map(|url| !url.contains(PRIVATE_BUCKET))
        .unwrap_or(false)
}
