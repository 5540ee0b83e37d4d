use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum MatchError {
    #[error("invalid ENCODE accession: {0}")]
    InvalidAccession(String),

    #[error("invalid modality: {0}")]
    InvalidModality(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("ENCODE request failed: {0}")]
    EncodeHttp(String),

    #[error("ENCODE returned status {status}: {message}")]
    EncodeStatus { status: u16, message: String },

    #[error("failed to decode ENCODE response: {0}")]
    EncodeDecode(String),

    #[error("experiment {accession} could not be fetched")]
    #[diagnostic(help("rerun with failure_policy \"isolate\" to skip unreachable experiments"))]
    ExperimentFetch {
        accession: String,
        #[source]
        source: Box<MatchError>,
    },

    #[error("malformed mapped percentage: {0:?}")]
    MalformedPercentage(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to write output: {0}")]
    Output(String),

    #[error("failed to start worker pool: {0}")]
    ThreadPool(String),
}

impl MatchError {
    /// True for failures that originate at the remote repository.
    pub fn is_remote(&self) -> bool {
        match self {
            MatchError::EncodeHttp(_)
            | MatchError::EncodeStatus { .. }
            | MatchError::EncodeDecode(_) => true,
            MatchError::ExperimentFetch { source, .. } => source.is_remote(),
            _ => false,
        }
    }
}
