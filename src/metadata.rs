use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::SamplesheetError;

pub const RUN_ACCESSION: &str = "run_accession";
pub const FASTQ_FTP: &str = "fastq_ftp";
pub const LIBRARY_LAYOUT: &str = "library_layout";
pub const LIBRARY_SOURCE: &str = "library_source";
pub const LIBRARY_STRATEGY: &str = "library_strategy";
pub const INSTRUMENT_PLATFORM: &str = "instrument_platform";
pub const ASSEMBLY_ACCESSION: &str = "assembly_accession";
pub const ASSEMBLY_FTP: &str = "assembly_ftp";

pub type RawRow = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FastqUrls(Vec<String>);

impl FastqUrls {
    pub fn parse(raw: &str) -> Self {
        Self(
            raw.split(';')
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataRecord {
    pub run_accession: String,
    pub fastq_urls: FastqUrls,
    pub library_layout: String,
    pub library_source: String,
    pub library_strategy: String,
    pub platform: String,
    pub assembly_accession: Option<String>,
    pub assembly_url: Option<String>,
}

impl MetadataRecord {
    /// `row` is the 1-based data row index (blank lines excluded), for error reporting only.
    pub fn from_row(raw: &RawRow, row: usize) -> Result<Self, SamplesheetError> {
        let run_accession = raw
            .get(RUN_ACCESSION)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .ok_or(SamplesheetError::MissingRequiredField {
                field: RUN_ACCESSION,
                row,
            })?
            .to_string();

        Ok(Self {
            run_accession,
            fastq_urls: FastqUrls::parse(field(raw, FASTQ_FTP)),
            library_layout: field(raw, LIBRARY_LAYOUT).to_string(),
            library_source: field(raw, LIBRARY_SOURCE).to_string(),
            library_strategy: field(raw, LIBRARY_STRATEGY).to_string(),
            platform: field(raw, INSTRUMENT_PLATFORM).to_string(),
            assembly_accession: optional(raw, ASSEMBLY_ACCESSION),
            assembly_url: optional(raw, ASSEMBLY_FTP),
        })
    }

    pub fn is_paired(&self) -> bool {
        self.library_layout.trim().eq_ignore_ascii_case("paired")
    }

    pub fn has_reads(&self) -> bool {
        !self.fastq_urls.is_empty()
    }
}

fn field<'a>(raw: &'a RawRow, key: &str) -> &'a str {
    raw.get(key).map(String::as_str).unwrap_or("")
}

fn optional(raw: &RawRow, key: &str) -> Option<String> {
    raw.get(key)
        .filter(|value| !value.trim().is_empty())
        .map(|value| value.trim().to_string())
}
