use std::io::{BufRead, BufReader};
use std::thread;
use std::time::Duration;

use flate2::read::GzDecoder;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::domain::{ExperimentAccession, Modality};
use crate::error::MatchError;
use crate::model::{ExperimentRecord, SearchResult};

pub const ENCODE_BASE_URL: &str = "https://www.encodeproject.org";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchTerm {
    FreeText(String),
    AssayTitle(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub term: SearchTerm,
    pub released_only: bool,
    pub file_type: Option<String>,
    pub output_type: Option<String>,
}

impl SearchQuery {
    pub fn for_modality(modality: Modality) -> Self {
        let free_text = |term: &str| SearchTerm::FreeText(term.to_string());
        let assay = |title: &str| SearchTerm::AssayTitle(title.to_string());
        match modality {
            Modality::ChipSeq => Self {
                term: free_text("ChIP-seq"),
                released_only: false,
                file_type: None,
                output_type: None,
            },
            Modality::Methylation => Self {
                term: free_text("WGBS"),
                released_only: true,
                file_type: Some("bed bedMethyl".to_string()),
                output_type: None,
            },
            Modality::Atac => Self {
                term: assay("ATAC-seq"),
                released_only: true,
                file_type: None,
                output_type: Some("alignments".to_string()),
            },
            Modality::Dnase => Self {
                term: assay("DNase-seq"),
                released_only: true,
                file_type: None,
                output_type: Some("alignments".to_string()),
            },
            Modality::Histone => Self {
                term: assay("Histone ChIP-seq"),
                released_only: true,
                file_type: Some("bigWig".to_string()),
                output_type: Some("fold change over control".to_string()),
            },
        }
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        match &self.term {
            SearchTerm::FreeText(term) => pairs.push(("searchTerm", term.clone())),
            SearchTerm::AssayTitle(title) => pairs.push(("assay_title", title.clone())),
        }
        pairs.push(("type", "Experiment".to_string()));
        if self.released_only {
            pairs.push(("status", "released".to_string()));
        }
        if let Some(file_type) = &self.file_type {
            pairs.push(("files.file_type", file_type.clone()));
        }
        if let Some(output_type) = &self.output_type {
            pairs.push(("files.output_type", output_type.clone()));
        }
        pairs.push(("format", "json".to_string()));
        pairs.push(("limit", "all".to_string()));
        pairs
    }
}

/// Read-only access to the ENCODE portal.
pub trait EncodeClient: Send + Sync {
    /// Accessions of all experiments matching `query`.
    fn search(&self, query: &SearchQuery) -> Result<Vec<String>, MatchError>;
    fn experiment(&self, accession: &ExperimentAccession) -> Result<ExperimentRecord, MatchError>;
    /// Number of lines in a gzip-compressed BED file.
    fn count_peaks(&self, url: &str) -> Result<u64, MatchError>;
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub base_url: String,
    pub max_retries: usize,
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: ENCODE_BASE_URL.to_string(),
            max_retries: 3,
            timeout: Duration::from_secs(20),
        }
    }
}

#[derive(Clone)]
pub struct EncodeHttpClient {
    client: Client,
    base_url: String,
    max_retries: usize,
}

impl EncodeHttpClient {
    pub fn new(options: &ClientOptions) -> Result<Self, MatchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("encode-match/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| MatchError::EncodeHttp(err.to_string()))?,
        );
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(options.timeout)
            .timeout(options.timeout)
            .build()
            .map_err(|err| MatchError::EncodeHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: options.base_url.trim_end_matches('/').to_string(),
            max_retries: options.max_retries,
        })
    }

    fn send_with_retries<F>(
        &self,
        mut make_req: F,
    ) -> Result<reqwest::blocking::Response, MatchError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            let response = make_req().send();
            match response {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < self.max_retries && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < self.max_retries && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(MatchError::EncodeHttp(err.to_string()));
                }
            }
        }
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, MatchError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "ENCODE request failed".to_string());
        Err(MatchError::EncodeStatus { status, message })
    }
}

impl EncodeClient for EncodeHttpClient {
    fn search(&self, query: &SearchQuery) -> Result<Vec<String>, MatchError> {
        let url = format!("{}/search/", self.base_url);
        let pairs = query.query_pairs();
        let response = self.send_with_retries(|| self.client.get(&url).query(&pairs))?;
        // The portal answers an empty search with 404 and an empty graph.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let response = Self::handle_status(response)?;
        let result: SearchResult = response
            .json()
            .map_err(|err| MatchError::EncodeDecode(err.to_string()))?;
        Ok(result
            .graph
            .into_iter()
            .map(|entry| entry.accession)
            .collect())
    }

    fn experiment(&self, accession: &ExperimentAccession) -> Result<ExperimentRecord, MatchError> {
        let url = experiment_url(&self.base_url, accession);
        let response =
            self.send_with_retries(|| self.client.get(&url).query(&[("format", "json")]))?;
        let response = Self::handle_status(response)?;
        response
            .json()
            .map_err(|err| MatchError::EncodeDecode(err.to_string()))
    }

    fn count_peaks(&self, url: &str) -> Result<u64, MatchError> {
        let response = self.send_with_retries(|| self.client.get(url))?;
        let response = Self::handle_status(response)?;
        count_gz_lines(response)
    }
}

pub fn experiment_url(base_url: &str, accession: &ExperimentAccession) -> String {
    format!("{}/experiments/{}/", base_url.trim_end_matches('/'), accession)
}

pub fn count_gz_lines<R: std::io::Read>(reader: R) -> Result<u64, MatchError> {
    let mut count = 0u64;
    for line in BufReader::new(GzDecoder::new(reader)).lines() {
        line.map_err(|err| MatchError::EncodeDecode(err.to_string()))?;
        count += 1;
    }
    Ok(count)
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request() || err.is_body()
}
