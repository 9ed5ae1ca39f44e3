use camino::Utf8PathBuf;
use serde::Serialize;

use crate::domain::StudyAccession;
use crate::metadata::MetadataRecord;

const READ_1_MARKER: &str = "_1.fastq";
const READ_2_MARKER: &str = "_2.fastq";
/// Below this many URLs a paired run is assumed to be listed in canonical order.
const MARKER_SEARCH_MIN_URLS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingStrategy {
    ContentMarker,
    Positional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadSelection<'a> {
    pub strategy: PairingStrategy,
    pub read_1: Option<&'a str>,
    pub read_2: Option<&'a str>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedPaths {
    pub fastq_1: String,
    pub fastq_2: String,
    pub assembly_path: String,
}

/// Falls back to the trimmed input when no segment can be extracted.
pub fn url_filename(url: &str) -> &str {
    let trimmed = url.trim();
    let without_fragment = trimmed.split('#').next().unwrap_or(trimmed);
    let without_query = without_fragment
        .split('?')
        .next()
        .unwrap_or(without_fragment);
    let path = match without_query.split_once("://") {
        Some((_, rest)) => rest.find('/').map(|idx| &rest[idx..]).unwrap_or(""),
        None => without_query,
    };
    let name = path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or("");
    if name.is_empty() { trimmed } else { name }
}

pub fn marker_pair(urls: &[String]) -> Option<(&str, &str)> {
    let read_1 = urls.iter().find(|url| url.contains(READ_1_MARKER))?;
    let read_2 = urls.iter().find(|url| url.contains(READ_2_MARKER))?;
    Some((read_1.as_str(), read_2.as_str()))
}

pub fn positional_pair(urls: &[String]) -> (Option<&str>, Option<&str>) {
    (
        urls.first().map(String::as_str),
        urls.get(1).map(String::as_str),
    )
}

pub fn select_reads(record: &MetadataRecord) -> ReadSelection<'_> {
    let urls = record.fastq_urls.as_slice();
    if record.is_paired() && urls.len() >= MARKER_SEARCH_MIN_URLS {
        if let Some((read_1, read_2)) = marker_pair(urls) {
            return ReadSelection {
                strategy: PairingStrategy::ContentMarker,
                read_1: Some(read_1),
                read_2: Some(read_2),
            };
        }
    }
    let (read_1, read_2) = positional_pair(urls);
    ReadSelection {
        strategy: PairingStrategy::Positional,
        read_1,
        read_2,
    }
}

#[derive(Debug, Clone)]
pub struct PathResolver {
    outdir: Utf8PathBuf,
    study: StudyAccession,
}

impl PathResolver {
    pub fn new(outdir: impl Into<Utf8PathBuf>, study: StudyAccession) -> Self {
        Self {
            outdir: outdir.into(),
            study,
        }
    }

    pub fn resolve(&self, record: &MetadataRecord) -> ResolvedPaths {
        let selection = select_reads(record);
        tracing::debug!(
            run = %record.run_accession,
            strategy = ?selection.strategy,
            urls = record.fastq_urls.len(),
            "selected read files"
        );
        let run = record.run_accession.as_str();
        ResolvedPaths {
            fastq_1: selection
                .read_1
                .map(|url| self.local_path(run, url))
                .unwrap_or_default(),
            fastq_2: selection
                .read_2
                .map(|url| self.local_path(run, url))
                .unwrap_or_default(),
            assembly_path: self.assembly_path(record),
        }
    }

    fn assembly_path(&self, record: &MetadataRecord) -> String {
        let Some(url) = record.assembly_url.as_deref() else {
            return String::new();
        };
        // No accession: fall back to the run directory rather than an empty segment.
        let dir = record
            .assembly_accession
            .as_deref()
            .unwrap_or(record.run_accession.as_str());
        self.local_path(dir, url)
    }

    pub fn local_path(&self, dir: &str, url: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.outdir.as_str().trim_end_matches('/'),
            self.study,
            dir,
            url_filename(url)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::FastqUrls;

    fn record(layout: &str, fastq: &str) -> MetadataRecord {
        MetadataRecord {
            run_accession: "SRR001".to_string(),
            fastq_urls: FastqUrls::parse(fastq),
            library_layout: layout.to_string(),
            library_source: "METAGENOMIC".to_string(),
            library_strategy: "WGS".to_string(),
            platform: "ILLUMINA".to_string(),
            assembly_accession: None,
            assembly_url: None,
        }
    }

    fn resolver() -> PathResolver {
        PathResolver::new("/data", "SRP1".parse().unwrap())
    }

    #[test]
    fn filename_strips_scheme_query_and_fragment() {
        assert_eq!(
            url_filename("ftp://ftp.sra.ebi.ac.uk/vol1/fastq/SRR001/SRR001_1.fastq.gz"),
            "SRR001_1.fastq.gz"
        );
        assert_eq!(
            url_filename("ftp.sra.ebi.ac.uk/vol1/fastq/SRR001/SRR001_1.fastq.gz"),
            "SRR001_1.fastq.gz"
        );
        assert_eq!(
            url_filename("https://host/path/reads.fq.gz?token=abc#frag"),
            "reads.fq.gz"
        );
        assert_eq!(url_filename("https://host/dir/"), "dir");
    }

    #[test]
    fn filename_degrades_to_raw_string() {
        assert_eq!(url_filename("ftp://host-only"), "ftp://host-only");
        assert_eq!(url_filename(" ??? "), "???");
    }

    #[test]
    fn marker_pair_requires_both_markers() {
        let urls = vec!["x/a_1.fastq.gz".to_string(), "x/a.fastq.gz".to_string()];
        assert_eq!(marker_pair(&urls), None);
        let urls = vec![
            "x/a_2.fastq.gz".to_string(),
            "x/a.fastq.gz".to_string(),
            "x/a_1.fastq.gz".to_string(),
        ];
        assert_eq!(marker_pair(&urls), Some(("x/a_1.fastq.gz", "x/a_2.fastq.gz")));
    }

    #[test]
    fn paired_two_urls_resolve_positionally() {
        let record = record(
            "PAIRED",
            "ftp://x/SRR001_1.fastq.gz;ftp://x/SRR001_2.fastq.gz",
        );
        let paths = resolver().resolve(&record);
        assert_eq!(select_reads(&record).strategy, PairingStrategy::Positional);
        assert_eq!(paths.fastq_1, "/data/SRP1/SRR001/SRR001_1.fastq.gz");
        assert_eq!(paths.fastq_2, "/data/SRP1/SRR001/SRR001_2.fastq.gz");
        assert_eq!(paths.assembly_path, "");
    }

    #[test]
    fn paired_three_urls_use_markers() {
        let record = record(
            "PAIRED",
            "ftp://x/SRR001.fastq.gz;ftp://x/SRR001_1.fastq.gz;ftp://x/SRR001_2.fastq.gz",
        );
        assert_eq!(
            select_reads(&record).strategy,
            PairingStrategy::ContentMarker
        );
        let paths = resolver().resolve(&record);
        assert_eq!(paths.fastq_1, "/data/SRP1/SRR001/SRR001_1.fastq.gz");
        assert_eq!(paths.fastq_2, "/data/SRP1/SRR001/SRR001_2.fastq.gz");
    }

    #[test]
    fn paired_three_urls_without_markers_fall_back() {
        let record = record("paired", "ftp://x/a.fq;ftp://x/b.fq;ftp://x/c.fq");
        let selection = select_reads(&record);
        assert_eq!(selection.strategy, PairingStrategy::Positional);
        assert_eq!(selection.read_1, Some("ftp://x/a.fq"));
        assert_eq!(selection.read_2, Some("ftp://x/b.fq"));
    }

    #[test]
    fn single_end_leaves_second_read_empty() {
        let record = record("SINGLE", "ftp://x/SRR001.fastq.gz");
        let paths = resolver().resolve(&record);
        assert_eq!(paths.fastq_1, "/data/SRP1/SRR001/SRR001.fastq.gz");
        assert_eq!(paths.fastq_2, "");
    }

    #[test]
    fn single_end_with_markers_stays_positional() {
        let record = record(
            "SINGLE",
            "ftp://x/SRR001.fastq.gz;ftp://x/SRR001_2.fastq.gz;ftp://x/SRR001_1.fastq.gz",
        );
        let paths = resolver().resolve(&record);
        assert_eq!(paths.fastq_1, "/data/SRP1/SRR001/SRR001.fastq.gz");
        assert_eq!(paths.fastq_2, "/data/SRP1/SRR001/SRR001_2.fastq.gz");
    }

    #[test]
    fn assembly_path_uses_assembly_accession() {
        let mut record = record("PAIRED", "ftp://x/SRR001_1.fastq.gz");
        record.assembly_accession = Some("GCA_1".to_string());
        record.assembly_url = Some("ftp://x/contigs.fa".to_string());
        let paths = resolver().resolve(&record);
        assert_eq!(paths.assembly_path, "/data/SRP1/GCA_1/contigs.fa");
    }

    #[test]
    fn assembly_path_without_accession_uses_run_dir() {
        let mut record = record("PAIRED", "ftp://x/SRR001_1.fastq.gz");
        record.assembly_url = Some("ftp://x/contigs.fa".to_string());
        let paths = resolver().resolve(&record);
        assert_eq!(paths.assembly_path, "/data/SRP1/SRR001/contigs.fa");
    }

    #[test]
    fn study_segment_keeps_caller_case() {
        let resolver = PathResolver::new("/data", "srp1".parse().unwrap());
        let paths = resolver.resolve(&record("SINGLE", "ftp://x/a.fq"));
        assert_eq!(paths.fastq_1, "/data/srp1/SRR001/a.fq");
    }

    #[test]
    fn trailing_slash_in_outdir_is_not_doubled() {
        let resolver = PathResolver::new("/data/", "SRP1".parse().unwrap());
        assert_eq!(
            resolver.local_path("SRR001", "ftp://x/r.fq"),
            "/data/SRP1/SRR001/r.fq"
        );
    }

    #[test]
    fn resolution_is_idempotent() {
        let record = record(
            "PAIRED",
            "ftp://x/SRR001.fastq.gz;ftp://x/SRR001_1.fastq.gz;ftp://x/SRR001_2.fastq.gz",
        );
        let resolver = resolver();
        let first = resolver.resolve(&record);
        for _ in 0..5 {
            assert_eq!(resolver.resolve(&record), first);
        }
    }
}
