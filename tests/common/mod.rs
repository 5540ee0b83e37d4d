#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use encode_matcher::model::{
    BiosampleOntology, BiosampleRecord, CloudMetadata, DonorRecord, ExperimentRecord, FileRecord,
    LibraryRecord, QualityMetric, ReplicateRecord,
};

pub const ONTOLOGY: &str = "/biosample-types/cell_line_EFO_0002067/";

pub fn fixture(name: &str) -> ExperimentRecord {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    let content = fs::read_to_string(&path).unwrap();
    serde_json::from_str(&content).unwrap()
}

pub fn biosample(donor: &str) -> BiosampleRecord {
    BiosampleRecord {
        donor: Some(DonorRecord {
            id: format!("/human-donors/{donor}/"),
        }),
        age: Some("32".to_string()),
        age_units: Some("year".to_string()),
        life_stage: Some("adult".to_string()),
    }
}

pub fn replicate(number: u32, biosample: BiosampleRecord) -> ReplicateRecord {
    ReplicateRecord {
        biological_replicate_number: Some(number),
        technical_replicate_number: Some(1),
        library: Some(LibraryRecord {
            biosample: Some(biosample),
        }),
        libraries: None,
    }
}

fn file(accession: &str, file_type: &str, output_type: &str, replicates: &[u32]) -> FileRecord {
    FileRecord {
        accession: Some(accession.to_string()),
        assembly: Some("GRCh38".to_string()),
        status: "released".to_string(),
        file_type: file_type.to_string(),
        output_type: output_type.to_string(),
        technical_replicates: replicates.iter().map(|rep| format!("{rep}_1")).collect(),
        biological_replicates: replicates.to_vec(),
        quality_metrics: None,
        date_created: None,
        cloud_metadata: Some(CloudMetadata {
            url: format!("https://encode-public.s3.amazonaws.com/{accession}"),
        }),
    }
}

pub fn peaks(accession: &str) -> FileRecord {
    file(accession, "bed narrowPeak", "replicated peaks", &[1, 2])
}

pub fn bed_methyl(accession: &str, replicate: u32) -> FileRecord {
    file(
        accession,
        "bed bedMethyl",
        "methylation state at CpG",
        &[replicate],
    )
}

pub fn alignment(accession: &str, replicates: &[u32], mapped_pct: Option<&str>) -> FileRecord {
    let mut record = file(accession, "bam", "alignments", replicates);
    record.quality_metrics = Some(vec![QualityMetric {
        types: vec!["SamtoolsFlagstatsQualityMetric".to_string()],
        mapped_pct: mapped_pct.map(str::to_string),
    }]);
    record
}

pub fn experiment(accession: &str, donor: &str, files: Vec<FileRecord>) -> ExperimentRecord {
    ExperimentRecord {
        accession: accession.to_string(),
        assay_title: None,
        biosample_ontology: Some(BiosampleOntology {
            id: ONTOLOGY.to_string(),
            term_name: Some("K562".to_string()),
        }),
        target: None,
        files,
        replicates: vec![replicate(1, biosample(donor))],
    }
}
