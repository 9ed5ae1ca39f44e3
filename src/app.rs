use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use serde::Serialize;

use crate::config::load_allowed_runs;
use crate::domain::{ManifestSchema, StudyAccession};
use crate::ena::{EnaClient, merge_fields};
use crate::error::SamplesheetError;
use crate::filter::{FilterCriteria, FilterStats, filter_rows};
use crate::manifest::{Manifest, ManifestContext, build_manifest};
use crate::metadata::RawRow;
use crate::table;

#[derive(Debug, Clone)]
pub struct MetadataRequest {
    pub study: StudyAccession,
    pub output: Utf8PathBuf,
    pub extra_fields: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SamplesheetRequest {
    pub metadata: Utf8PathBuf,
    pub schema: ManifestSchema,
    pub context: ManifestContext,
    pub output: Utf8PathBuf,
    pub library_strategy_filter: Option<String>,
    pub allowed_runs_file: Option<Utf8PathBuf>,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetadataResult {
    pub study: String,
    pub path: String,
    pub rows: usize,
    pub fields: Vec<String>,
    pub fetched_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SamplesheetResult {
    pub schema: ManifestSchema,
    pub study: String,
    pub metadata: String,
    pub output: String,
    pub columns: Vec<String>,
    pub filter: FilterStats,
    pub samples: usize,
    pub written: bool,
    pub generated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub metadata: MetadataResult,
    pub samplesheet: SamplesheetResult,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Clone)]
pub struct App<E: EnaClient> {
    ena: E,
}

impl<E: EnaClient> App<E> {
    pub fn new(ena: E) -> Self {
        Self { ena }
    }

    pub fn fetch_metadata(
        &self,
        request: &MetadataRequest,
        sink: &dyn ProgressSink,
    ) -> Result<MetadataResult, SamplesheetError> {
        let fields = merge_fields(&request.extra_fields)?;
        sink.event(ProgressEvent {
            message: format!("phase=Fetch; ENA read runs for {}", request.study),
            elapsed: None,
        });
        let started = Instant::now();
        let text = self.ena.fetch_read_runs(&request.study, &fields)?;
        let rows = table::parse_metadata_tsv(&text)?;
        table::write_bytes_atomic(&request.output, text.as_bytes())?;
        sink.event(ProgressEvent {
            message: format!("phase=Store; {} runs -> {}", rows.len(), request.output),
            elapsed: Some(started.elapsed()),
        });
        tracing::info!(study = %request.study, rows = rows.len(), path = %request.output, "saved metadata");

        Ok(MetadataResult {
            study: request.study.to_string(),
            path: request.output.to_string(),
            rows: rows.len(),
            fields,
            fetched_at: iso_timestamp(),
        })
    }

    pub fn build_samplesheet(
        &self,
        request: &SamplesheetRequest,
        sink: &dyn ProgressSink,
    ) -> Result<SamplesheetResult, SamplesheetError> {
        let criteria = load_criteria(request)?;

        sink.event(ProgressEvent {
            message: format!("phase=Read; {}", request.metadata),
            elapsed: None,
        });
        let rows = table::read_metadata_file(&request.metadata)?;

        let started = Instant::now();
        let (manifest, stats) = transform(&rows, request.schema, &criteria, &request.context)?;
        sink.event(ProgressEvent {
            message: format!(
                "phase=Resolve; {} of {} runs admitted",
                stats.admitted, stats.rows
            ),
            elapsed: Some(started.elapsed()),
        });

        if !request.dry_run {
            table::write_manifest(&request.output, &manifest)?;
            sink.event(ProgressEvent {
                message: format!("phase=Write; {} samples -> {}", manifest.len(), request.output),
                elapsed: None,
            });
        }

        Ok(SamplesheetResult {
            schema: request.schema,
            study: request.context.study.to_string(),
            metadata: request.metadata.to_string(),
            output: request.output.to_string(),
            columns: manifest.columns().iter().map(|col| col.to_string()).collect(),
            filter: stats,
            samples: manifest.len(),
            written: !request.dry_run,
            generated_at: iso_timestamp(),
        })
    }

    pub fn run(
        &self,
        metadata: &MetadataRequest,
        samplesheet: &SamplesheetRequest,
        sink: &dyn ProgressSink,
    ) -> Result<RunResult, SamplesheetError> {
        // Allow-list problems must surface before anything is downloaded.
        load_criteria(samplesheet)?;
        let metadata = self.fetch_metadata(metadata, sink)?;
        let samplesheet = self.build_samplesheet(samplesheet, sink)?;
        Ok(RunResult {
            metadata,
            samplesheet,
        })
    }
}

pub fn transform(
    rows: &[RawRow],
    schema: ManifestSchema,
    criteria: &FilterCriteria,
    context: &ManifestContext,
) -> Result<(Manifest, FilterStats), SamplesheetError> {
    let outcome = filter_rows(rows, criteria)?;
    let manifest = build_manifest(&outcome.records, schema, context);
    Ok((manifest, outcome.stats))
}

fn load_criteria(request: &SamplesheetRequest) -> Result<FilterCriteria, SamplesheetError> {
    let allowed = match &request.allowed_runs_file {
        Some(path) => load_allowed_runs(path)?,
        None => Vec::new(),
    };
    Ok(FilterCriteria::new(
        request.library_strategy_filter.as_deref(),
        allowed,
    ))
}

fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
