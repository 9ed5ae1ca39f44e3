use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::domain::StudyAccession;
use crate::error::SamplesheetError;

pub const ENA_PORTAL_BASE: &str = "https://www.ebi.ac.uk/ena/portal/api";

pub const DEFAULT_FIELDS: &[&str] = &[
    "run_accession",
    "library_layout",
    "library_source",
    "library_strategy",
    "study_title",
    "fastq_ftp",
    "instrument_platform",
];

pub trait EnaClient: Send + Sync {
    fn fetch_read_runs(
        &self,
        study: &StudyAccession,
        fields: &[String],
    ) -> Result<String, SamplesheetError>;
}

#[derive(Clone)]
pub struct EnaHttpClient {
    client: Client,
    base_url: String,
}

impl EnaHttpClient {
    pub fn new() -> Result<Self, SamplesheetError> {
        Self::with_base_url(ENA_PORTAL_BASE)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, SamplesheetError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("ena-samplesheet/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| SamplesheetError::EnaHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| SamplesheetError::EnaHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn send_with_retries<F>(
        &self,
        mut make_req: F,
    ) -> Result<reqwest::blocking::Response, SamplesheetError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            match make_req().send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        tracing::warn!(status, attempt, delay_ms = delay, "retrying ENA request");
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        tracing::warn!(error = %err, attempt, delay_ms = delay, "retrying ENA request");
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(SamplesheetError::EnaHttp(err.to_string()));
                }
            }
        }
    }
}

impl EnaClient for EnaHttpClient {
    fn fetch_read_runs(
        &self,
        study: &StudyAccession,
        fields: &[String],
    ) -> Result<String, SamplesheetError> {
        let url = format!("{}/filereport", self.base_url);
        let query = filereport_query(study, fields);
        tracing::info!(study = %study, "downloading ENA metadata");
        let response = self.send_with_retries(|| self.client.get(&url).query(&query))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "ENA request failed".to_string());
            return Err(SamplesheetError::EnaStatus { status, message });
        }
        response
            .text()
            .map_err(|err| SamplesheetError::EnaHttp(err.to_string()))
    }
}

pub fn filereport_query(study: &StudyAccession, fields: &[String]) -> Vec<(&'static str, String)> {
    vec![
        ("accession", study.as_str().to_string()),
        ("result", "read_run".to_string()),
        ("fields", fields.join(",")),
        ("format", "tsv".to_string()),
        ("download", "true".to_string()),
        ("limit", "0".to_string()),
    ]
}

pub fn merge_fields(extra: &[String]) -> Result<Vec<String>, SamplesheetError> {
    let mut fields: Vec<String> = DEFAULT_FIELDS.iter().map(|field| field.to_string()).collect();
    for field in extra {
        let field = field.trim();
        let is_valid = !field.is_empty()
            && field
                .chars()
                .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_');
        if !is_valid {
            return Err(SamplesheetError::InvalidFieldList(field.to_string()));
        }
        if !fields.iter().any(|known| known == field) {
            fields.push(field.to_string());
        }
    }
    Ok(fields)
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
