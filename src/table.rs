use std::fs;
use std::io::Write;

use camino::Utf8Path;
use csv::{ReaderBuilder, WriterBuilder};

use crate::error::SamplesheetError;
use crate::manifest::Manifest;
use crate::metadata::RawRow;

// Portal TSV is unquoted; study titles may contain literal `"`.
pub fn parse_metadata_tsv(text: &str) -> Result<Vec<RawRow>, SamplesheetError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b'\t')
        .quoting(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|err| SamplesheetError::Table(err.to_string()))?
        .iter()
        .map(|header| header.trim_matches('\u{feff}').trim().to_string())
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| SamplesheetError::Table(err.to_string()))?;
        if record.iter().all(|value| value.trim().is_empty()) {
            continue;
        }
        let row = headers
            .iter()
            .zip(record.iter())
            .map(|(key, value)| (key.clone(), value.to_string()))
            .collect::<RawRow>();
        rows.push(row);
    }
    Ok(rows)
}

pub fn read_metadata_file(path: &Utf8Path) -> Result<Vec<RawRow>, SamplesheetError> {
    let text = fs::read_to_string(path.as_std_path())
        .map_err(|err| SamplesheetError::Filesystem(format!("read {path}: {err}")))?;
    let rows = parse_metadata_tsv(&text)?;
    tracing::info!(path = %path, rows = rows.len(), "read metadata table");
    Ok(rows)
}

pub fn render_manifest(manifest: &Manifest) -> Result<Vec<u8>, SamplesheetError> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer
        .write_record(manifest.columns())
        .map_err(|err| SamplesheetError::Table(err.to_string()))?;
    for row in &manifest.rows {
        writer
            .write_record(row.values())
            .map_err(|err| SamplesheetError::Table(err.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|err| SamplesheetError::Table(err.to_string()))
}

pub fn write_manifest(path: &Utf8Path, manifest: &Manifest) -> Result<(), SamplesheetError> {
    let content = render_manifest(manifest)?;
    write_bytes_atomic(path, &content)?;
    tracing::info!(path = %path, rows = manifest.len(), schema = %manifest.schema, "wrote samplesheet");
    Ok(())
}

/// Writes through a temp file in the destination directory, then renames it into place.
pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), SamplesheetError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| SamplesheetError::Filesystem(err.to_string()))?;
    let mut temp = tempfile::Builder::new()
        .prefix(".ena-samplesheet")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| SamplesheetError::Filesystem(err.to_string()))?;
    temp.write_all(content)
        .map_err(|err| SamplesheetError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| SamplesheetError::Filesystem(err.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ManifestSchema;

    #[test]
    fn parse_tsv_with_bom_and_blank_lines() {
        let text = "\u{feff}run_accession\tfastq_ftp\tlibrary_layout\n\
                    SRR001\tftp://x/a_1.fastq.gz;ftp://x/a_2.fastq.gz\tPAIRED\n\
                    \n\
                    SRR002\t\tSINGLE\n";
        let rows = parse_metadata_tsv(text).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["run_accession"], "SRR001");
        assert_eq!(rows[1]["fastq_ftp"], "");
        assert_eq!(rows[1]["library_layout"], "SINGLE");
    }

    #[test]
    fn short_rows_omit_missing_columns() {
        let text = "run_accession\tfastq_ftp\tlibrary_layout\nSRR001\tftp://x/a.fq\n";
        let rows = parse_metadata_tsv(text).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].contains_key("library_layout"));
    }

    #[test]
    fn quotes_in_titles_are_literal() {
        let text = "run_accession\tstudy_title\tfastq_ftp\nSRR001\t\"Soil\" samples\tftp://x/a.fq\n";
        let rows = parse_metadata_tsv(text).unwrap();
        assert_eq!(rows[0]["study_title"], "\"Soil\" samples");
        assert_eq!(rows[0]["fastq_ftp"], "ftp://x/a.fq");
    }

    #[test]
    fn empty_manifest_renders_header_only() {
        let manifest = Manifest {
            schema: ManifestSchema::Ggp,
            rows: Vec::new(),
        };
        let rendered = String::from_utf8(render_manifest(&manifest).unwrap()).unwrap();
        assert_eq!(
            rendered,
            "id,fastq_1,fastq_2,assembly_accession,assembly,assembler\n"
        );
    }

    #[test]
    fn write_manifest_creates_parent_dirs() {
        let temp = tempfile::tempdir().unwrap();
        let path = camino::Utf8PathBuf::from_path_buf(temp.path().join("out/sheet.csv")).unwrap();
        let manifest = Manifest {
            schema: ManifestSchema::Miassembler,
            rows: Vec::new(),
        };
        write_manifest(&path, &manifest).unwrap();
        let content = std::fs::read_to_string(path.as_std_path()).unwrap();
        assert!(content.starts_with("study_accession,reads_accession,"));
    }
}
