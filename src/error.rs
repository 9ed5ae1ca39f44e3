use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SamplesheetError {
    #[error("metadata data row {row} is missing required field `{field}`")]
    #[diagnostic(help(
        "every metadata row must carry a run accession; data rows are counted from 1 after the header, skipping blank lines"
    ))]
    MissingRequiredField { field: &'static str, row: usize },

    #[error("invalid study accession: {0}")]
    InvalidStudyAccession(String),

    #[error("invalid run accession: {0}")]
    InvalidRunAccession(String),

    #[error("invalid metadata field name: {0}")]
    InvalidFieldList(String),

    #[error("failed to read allowed runs file at {0}")]
    AllowListRead(PathBuf),

    #[error("missing required setting `{0}`")]
    #[diagnostic(help("pass it on the command line or set it in the config file"))]
    MissingSetting(&'static str),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("ENA request failed: {0}")]
    EnaHttp(String),

    #[error("ENA returned status {status}: {message}")]
    EnaStatus { status: u16, message: String },

    #[error("malformed table: {0}")]
    Table(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl SamplesheetError {
    /// True for errors raised before any metadata row is processed.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SamplesheetError::InvalidStudyAccession(_)
                | SamplesheetError::InvalidRunAccession(_)
                | SamplesheetError::InvalidFieldList(_)
                | SamplesheetError::AllowListRead(_)
                | SamplesheetError::MissingSetting(_)
                | SamplesheetError::ConfigRead(_)
                | SamplesheetError::ConfigParse(_)
        )
    }
}
