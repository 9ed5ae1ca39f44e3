use std::io::{self, Write};

use serde::Serialize;

use crate::app::{MetadataResult, ProgressEvent, ProgressSink, RunResult, SamplesheetResult};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_metadata(result: &MetadataResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_samplesheet(result: &SamplesheetResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_run(result: &RunResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

pub struct TextOutput;

impl TextOutput {
    pub fn print_metadata(result: &MetadataResult) {
        println!(
            "Downloaded metadata for study {} to {} ({} runs)",
            result.study, result.path, result.rows
        );
    }

    pub fn print_samplesheet(result: &SamplesheetResult) {
        let verb = if result.written { "Created" } else { "Would create" };
        println!(
            "{verb} {} samplesheet with {} samples: {}",
            result.schema, result.samples, result.output
        );
        let filter = &result.filter;
        if filter.rows != filter.admitted {
            println!(
                "  skipped {} of {} runs (no reads: {}, excluded strategy: {}, not allowed: {})",
                filter.rows - filter.admitted,
                filter.rows,
                filter.no_reads,
                filter.excluded_strategy,
                filter.not_allowed
            );
        }
    }
}

impl ProgressSink for TextOutput {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => eprintln!("{} ({:.2?})", event.message, elapsed),
            None => eprintln!("{}", event.message),
        }
    }
}
