use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::SamplesheetError;

const STUDY_PREFIXES: &[&str] = &["PRJEB", "PRJNA", "PRJDB", "ERP", "SRP", "DRP"];
const RUN_PREFIXES: &[&str] = &["ERR", "SRR", "DRR"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ManifestSchema {
    Ggp,
    Miassembler,
}

impl ManifestSchema {
    pub fn default_output(&self) -> &'static str {
        match self {
            ManifestSchema::Ggp => "ggp_samplesheet.csv",
            ManifestSchema::Miassembler => "samplesheet.csv",
        }
    }
}

impl fmt::Display for ManifestSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestSchema::Ggp => write!(f, "ggp"),
            ManifestSchema::Miassembler => write!(f, "miassembler"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StudyAccession(String);

impl StudyAccession {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StudyAccession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StudyAccession {
    type Err = SamplesheetError;

    // Used verbatim as a path segment, so only separators and whitespace are rejected.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty()
            || trimmed == "."
            || trimmed == ".."
            || trimmed
                .chars()
                .any(|ch| ch == '/' || ch == '\\' || ch.is_whitespace())
        {
            return Err(SamplesheetError::InvalidStudyAccession(value.to_string()));
        }
        if !has_numbered_prefix(&trimmed.to_uppercase(), STUDY_PREFIXES) {
            tracing::warn!(study = trimmed, "unrecognised study accession prefix");
        }
        Ok(Self(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunAccession(String);

impl RunAccession {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunAccession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RunAccession {
    type Err = SamplesheetError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_uppercase();
        if !has_numbered_prefix(&normalized, RUN_PREFIXES) {
            return Err(SamplesheetError::InvalidRunAccession(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

fn has_numbered_prefix(value: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|prefix| {
        value
            .strip_prefix(prefix)
            .map(|rest| !rest.is_empty() && rest.chars().all(|ch| ch.is_ascii_digit()))
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn study_accession_is_kept_verbatim() {
        let acc: StudyAccession = " prjeb12345 ".parse().unwrap();
        assert_eq!(acc.as_str(), "prjeb12345");
        for value in ["SRP1", "MGYS00001234", "SAMEA7654321", "ERA123456"] {
            let acc: StudyAccession = value.parse().unwrap();
            assert_eq!(acc.as_str(), value);
        }
    }

    #[test]
    fn study_accession_must_be_one_path_segment() {
        for value in ["", "   ", "..", "PRJEB1/x", "PRJ EB1"] {
            let err = value.parse::<StudyAccession>().unwrap_err();
            assert_matches!(err, SamplesheetError::InvalidStudyAccession(_));
        }
    }

    #[test]
    fn parse_run_accession() {
        let run: RunAccession = "err123456".parse().unwrap();
        assert_eq!(run.as_str(), "ERR123456");
        let err = "SRX42".parse::<RunAccession>().unwrap_err();
        assert_matches!(err, SamplesheetError::InvalidRunAccession(_));
    }
}
