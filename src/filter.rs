use std::collections::BTreeSet;

use serde::Serialize;

use crate::domain::RunAccession;
use crate::error::SamplesheetError;
use crate::metadata::{MetadataRecord, RawRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    NotAllowed,
    ExcludedStrategy,
    NoReads,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    exclude_strategy: Option<String>,
    allowed_runs: BTreeSet<String>,
}

impl FilterCriteria {
    pub fn new<I>(exclude_strategy: Option<&str>, allowed_runs: I) -> Self
    where
        I: IntoIterator<Item = RunAccession>,
    {
        Self {
            exclude_strategy: exclude_strategy
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_lowercase),
            allowed_runs: allowed_runs
                .into_iter()
                .map(|run| run.as_str().to_string())
                .collect(),
        }
    }

    pub fn evaluate(&self, record: &MetadataRecord) -> Option<RejectReason> {
        if !self.is_allowed(record) {
            return Some(RejectReason::NotAllowed);
        }
        if self.is_excluded_strategy(record) {
            return Some(RejectReason::ExcludedStrategy);
        }
        if !record.has_reads() {
            return Some(RejectReason::NoReads);
        }
        None
    }

    pub fn is_allowed(&self, record: &MetadataRecord) -> bool {
        self.allowed_runs.is_empty()
            || self
                .allowed_runs
                .contains(&record.run_accession.to_uppercase())
    }

    pub fn is_excluded_strategy(&self, record: &MetadataRecord) -> bool {
        self.exclude_strategy
            .as_deref()
            .map(|strategy| record.library_strategy.to_lowercase() == strategy)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterStats {
    pub rows: usize,
    pub admitted: usize,
    pub not_allowed: usize,
    pub excluded_strategy: usize,
    pub no_reads: usize,
}

impl FilterStats {
    fn record(&mut self, reason: Option<RejectReason>) {
        self.rows += 1;
        match reason {
            None => self.admitted += 1,
            Some(RejectReason::NotAllowed) => self.not_allowed += 1,
            Some(RejectReason::ExcludedStrategy) => self.excluded_strategy += 1,
            Some(RejectReason::NoReads) => self.no_reads += 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub records: Vec<MetadataRecord>,
    pub stats: FilterStats,
}

/// A row without a run accession aborts the whole batch.
pub fn filter_rows(
    rows: &[RawRow],
    criteria: &FilterCriteria,
) -> Result<FilterOutcome, SamplesheetError> {
    let records = rows
        .iter()
        .enumerate()
        .map(|(index, row)| MetadataRecord::from_row(row, index + 1))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(filter_records(records, criteria))
}

pub fn filter_records(records: Vec<MetadataRecord>, criteria: &FilterCriteria) -> FilterOutcome {
    let mut stats = FilterStats::default();
    let mut admitted = Vec::with_capacity(records.len());
    for record in records {
        let reason = criteria.evaluate(&record);
        stats.record(reason);
        match reason {
            None => admitted.push(record),
            Some(reason) => {
                tracing::debug!(run = %record.run_accession, ?reason, "row rejected");
            }
        }
    }
    tracing::info!(
        rows = stats.rows,
        admitted = stats.admitted,
        not_allowed = stats.not_allowed,
        excluded_strategy = stats.excluded_strategy,
        no_reads = stats.no_reads,
        "filtered metadata rows"
    );
    FilterOutcome {
        records: admitted,
        stats,
    }
}
