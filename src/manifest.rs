use camino::Utf8PathBuf;

use crate::domain::{ManifestSchema, StudyAccession};
use crate::metadata::MetadataRecord;
use crate::resolve::{PathResolver, ResolvedPaths};

const GGP_COLUMNS: &[&str] = &[
    "id",
    "fastq_1",
    "fastq_2",
    "assembly_accession",
    "assembly",
    "assembler",
];

const MIASSEMBLER_COLUMNS: &[&str] = &[
    "study_accession",
    "reads_accession",
    "fastq_1",
    "fastq_2",
    "library_layout",
    "library_source",
    "library_strategy",
    "platform",
    "assembler",
    "assembly_memory",
    "assembler_config",
    "contaminant_reference",
    "human_reference",
    "phix_reference",
];

pub const DEFAULT_ASSEMBLER: &str = "metaspades";
pub const DEFAULT_MEMORY: &str = "350";

#[derive(Debug, Clone)]
pub struct ManifestContext {
    pub study: StudyAccession,
    pub outdir: Utf8PathBuf,
    pub assembler: String,
    pub memory: String,
    pub contaminant_reference: String,
}

impl ManifestContext {
    pub fn new(study: StudyAccession, outdir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            study,
            outdir: outdir.into(),
            assembler: DEFAULT_ASSEMBLER.to_string(),
            memory: DEFAULT_MEMORY.to_string(),
            contaminant_reference: String::new(),
        }
    }

    pub fn resolver(&self) -> PathResolver {
        PathResolver::new(self.outdir.clone(), self.study.clone())
    }
}

impl ManifestSchema {
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            ManifestSchema::Ggp => GGP_COLUMNS,
            ManifestSchema::Miassembler => MIASSEMBLER_COLUMNS,
        }
    }

    pub fn derive(
        &self,
        record: &MetadataRecord,
        paths: &ResolvedPaths,
        context: &ManifestContext,
    ) -> SampleManifestRow {
        let values = match self {
            ManifestSchema::Ggp => vec![
                record.run_accession.clone(),
                paths.fastq_1.clone(),
                paths.fastq_2.clone(),
                record.assembly_accession.clone().unwrap_or_default(),
                paths.assembly_path.clone(),
                String::new(),
            ],
            ManifestSchema::Miassembler => vec![
                context.study.to_string(),
                record.run_accession.clone(),
                paths.fastq_1.clone(),
                paths.fastq_2.clone(),
                record.library_layout.to_lowercase(),
                record.library_source.to_lowercase(),
                record.library_strategy.to_lowercase(),
                record.platform.clone(),
                context.assembler.clone(),
                context.memory.clone(),
                String::new(),
                context.contaminant_reference.clone(),
                String::new(),
                String::new(),
            ],
        };
        debug_assert_eq!(values.len(), self.columns().len());
        SampleManifestRow {
            schema: *self,
            values,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleManifestRow {
    schema: ManifestSchema,
    values: Vec<String>,
}

impl SampleManifestRow {
    pub fn schema(&self) -> ManifestSchema {
        self.schema
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        let idx = self
            .schema
            .columns()
            .iter()
            .position(|name| *name == column)?;
        self.values.get(idx).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub schema: ManifestSchema,
    pub rows: Vec<SampleManifestRow>,
}

impl Manifest {
    pub fn columns(&self) -> &'static [&'static str] {
        self.schema.columns()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub fn build_manifest(
    records: &[MetadataRecord],
    schema: ManifestSchema,
    context: &ManifestContext,
) -> Manifest {
    let resolver = context.resolver();
    let rows = records
        .iter()
        .map(|record| schema.derive(record, &resolver.resolve(record), context))
        .collect();
    Manifest { schema, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::FastqUrls;

    fn record(run: &str, fastq: &str) -> MetadataRecord {
        MetadataRecord {
            run_accession: run.to_string(),
            fastq_urls: FastqUrls::parse(fastq),
            library_layout: "PAIRED".to_string(),
            library_source: "METAGENOMIC".to_string(),
            library_strategy: "WGS".to_string(),
            platform: "ILLUMINA".to_string(),
            assembly_accession: None,
            assembly_url: None,
        }
    }

    fn context() -> ManifestContext {
        let mut context = ManifestContext::new("SRP1".parse().unwrap(), "/data");
        context.contaminant_reference = "/refs/host.fa".to_string();
        context
    }

    #[test]
    fn ggp_row_carries_assembly() {
        let mut record = record("SRR001", "ftp://x/SRR001_1.fastq.gz;ftp://x/SRR001_2.fastq.gz");
        record.assembly_accession = Some("GCA_1".to_string());
        record.assembly_url = Some("ftp://x/contigs.fa".to_string());

        let manifest = build_manifest(&[record], ManifestSchema::Ggp, &context());
        let row = &manifest.rows[0];
        assert_eq!(row.get("id"), Some("SRR001"));
        assert_eq!(row.get("assembly_accession"), Some("GCA_1"));
        assert_eq!(row.get("assembly"), Some("/data/SRP1/GCA_1/contigs.fa"));
        assert_eq!(row.get("assembler"), Some(""));
    }

    #[test]
    fn miassembler_row_lowercases_library_fields() {
        let manifest = build_manifest(
            &[record("SRR001", "ftp://x/SRR001_1.fastq.gz")],
            ManifestSchema::Miassembler,
            &context(),
        );
        let row = &manifest.rows[0];
        assert_eq!(row.get("study_accession"), Some("SRP1"));
        assert_eq!(row.get("reads_accession"), Some("SRR001"));
        assert_eq!(row.get("library_layout"), Some("paired"));
        assert_eq!(row.get("library_source"), Some("metagenomic"));
        assert_eq!(row.get("library_strategy"), Some("wgs"));
        assert_eq!(row.get("platform"), Some("ILLUMINA"));
        assert_eq!(row.get("assembler"), Some("metaspades"));
        assert_eq!(row.get("assembly_memory"), Some("350"));
        assert_eq!(row.get("contaminant_reference"), Some("/refs/host.fa"));
        assert_eq!(row.get("fastq_2"), Some(""));
        assert_eq!(row.get("phix_reference"), Some(""));
    }

    #[test]
    fn every_row_fills_every_column() {
        let records = vec![
            record("SRR001", "ftp://x/a.fq"),
            record("SRR002", "ftp://x/b_1.fastq;ftp://x/b_2.fastq;ftp://x/b.fastq"),
        ];
        for schema in [ManifestSchema::Ggp, ManifestSchema::Miassembler] {
            let manifest = build_manifest(&records, schema, &context());
            assert_eq!(manifest.len(), records.len());
            for row in &manifest.rows {
                assert_eq!(row.values().len(), schema.columns().len());
                for column in schema.columns() {
                    assert!(row.get(column).is_some());
                }
            }
        }
    }

    #[test]
    fn rows_follow_record_order() {
        let records = vec![
            record("SRR009", "ftp://x/a.fq"),
            record("SRR001", "ftp://x/b.fq"),
        ];
        let manifest = build_manifest(&records, ManifestSchema::Ggp, &context());
        let ids: Vec<_> = manifest
            .rows
            .iter()
            .filter_map(|row| row.get("id"))
            .collect();
        assert_eq!(ids, vec!["SRR009", "SRR001"]);
    }

    #[test]
    fn empty_input_gives_empty_manifest() {
        let manifest = build_manifest(&[], ManifestSchema::Miassembler, &context());
        assert!(manifest.is_empty());
        assert_eq!(manifest.columns().len(), 14);
    }
}
