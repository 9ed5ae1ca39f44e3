use std::fs;
use std::path::PathBuf;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::domain::{ManifestSchema, RunAccession};
use crate::error::SamplesheetError;
use crate::manifest::{DEFAULT_ASSEMBLER, DEFAULT_MEMORY};

pub const DEFAULT_CONFIG_FILE: &str = "ena-samplesheet.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub schema: Option<ManifestSchema>,
    #[serde(default)]
    pub outdir: Option<String>,
    #[serde(default)]
    pub assembler: Option<String>,
    #[serde(default)]
    pub memory: Option<MemoryEntry>,
    #[serde(default)]
    pub contaminant_reference: Option<String>,
    #[serde(default)]
    pub library_strategy_filter: Option<String>,
    #[serde(default)]
    pub allowed_runs_file: Option<String>,
    #[serde(default)]
    pub extra_fields: Vec<String>,
}

/// Assembly memory, written either as `"350"` or `350`.
#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum MemoryEntry {
    Text(String),
    Number(u64),
}

impl MemoryEntry {
    fn into_string(self) -> String {
        match self {
            MemoryEntry::Text(value) => value.trim().to_string(),
            MemoryEntry::Number(value) => value.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub schema: ManifestSchema,
    pub outdir: Option<Utf8PathBuf>,
    pub assembler: String,
    pub memory: String,
    pub contaminant_reference: String,
    pub library_strategy_filter: Option<String>,
    pub allowed_runs_file: Option<Utf8PathBuf>,
    pub extra_fields: Vec<String>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        ConfigLoader::resolve_config(Config::default())
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `ena-samplesheet.json` from the current directory
    /// when no path is given. A missing default file yields defaults.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, SamplesheetError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(ResolvedConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| SamplesheetError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| SamplesheetError::ConfigParse(err.to_string()))?;
        tracing::debug!(path = %config_path.display(), "loaded config");

        Ok(Self::resolve_config(config))
    }

    pub fn resolve_config(config: Config) -> ResolvedConfig {
        ResolvedConfig {
            schema_version: config.schema_version.unwrap_or(1),
            schema: config.schema.unwrap_or(ManifestSchema::Miassembler),
            outdir: non_blank(config.outdir).map(Utf8PathBuf::from),
            assembler: non_blank(config.assembler)
                .unwrap_or_else(|| DEFAULT_ASSEMBLER.to_string()),
            memory: config
                .memory
                .map(MemoryEntry::into_string)
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| DEFAULT_MEMORY.to_string()),
            contaminant_reference: config.contaminant_reference.unwrap_or_default(),
            library_strategy_filter: non_blank(config.library_strategy_filter),
            allowed_runs_file: non_blank(config.allowed_runs_file).map(Utf8PathBuf::from),
            extra_fields: config.extra_fields,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn load_allowed_runs(path: &Utf8Path) -> Result<Vec<RunAccession>, SamplesheetError> {
    let content = fs::read_to_string(path.as_std_path())
        .map_err(|_| SamplesheetError::AllowListRead(path.as_std_path().to_path_buf()))?;
    let runs = parse_allowed_runs(&content)?;
    tracing::info!(path = %path, runs = runs.len(), "loaded allowed runs");
    Ok(runs)
}

pub fn parse_allowed_runs(content: &str) -> Result<Vec<RunAccession>, SamplesheetError> {
    content
        .lines()
        .map(|line| line.split('#').next().unwrap_or(""))
        .flat_map(str::split_whitespace)
        .map(str::parse::<RunAccession>)
        .collect()
}
