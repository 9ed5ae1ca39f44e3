use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use ena_samplesheet::app::{App, MetadataRequest, SamplesheetRequest};
use ena_samplesheet::config::{ConfigLoader, ResolvedConfig};
use ena_samplesheet::domain::{ManifestSchema, StudyAccession};
use ena_samplesheet::ena::{EnaClient, EnaHttpClient};
use ena_samplesheet::error::SamplesheetError;
use ena_samplesheet::manifest::ManifestContext;
use ena_samplesheet::output::{JsonOutput, OutputMode, TextOutput};

#[derive(Parser)]
#[command(name = "ena-samplesheet")]
#[command(about = "Build assembly pipeline samplesheets from ENA run metadata")]
#[command(version, author)]
struct Cli {
    /// Print JSON results instead of a text summary
    #[arg(long, global = true)]
    non_interactive: bool,

    /// JSON config file (default: ./ena-samplesheet.json if present)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Download run metadata for a study as TSV")]
    Metadata(MetadataArgs),
    #[command(about = "Create a samplesheet from a metadata TSV")]
    Samplesheet(SamplesheetArgs),
    #[command(about = "Download metadata and create the samplesheet")]
    Run(RunArgs),
}

#[derive(Args)]
struct MetadataArgs {
    /// ENA study accession (e.g. SRP493956)
    study_accession: String,

    #[arg(long, default_value = "metadata.tsv")]
    output: Utf8PathBuf,

    /// Extra filereport fields to request (comma separated)
    #[arg(long, value_delimiter = ',')]
    fields: Vec<String>,
}

#[derive(Args)]
struct SamplesheetArgs {
    /// Metadata TSV as downloaded from ENA
    metadata_file: Utf8PathBuf,

    #[arg(long)]
    study_accession: String,

    #[command(flatten)]
    build: BuildArgs,
}

#[derive(Args)]
struct RunArgs {
    study_accession: String,

    /// Where the downloaded metadata TSV is kept
    #[arg(long)]
    metadata_output: Option<Utf8PathBuf>,

    #[arg(long, value_delimiter = ',')]
    fields: Vec<String>,

    #[command(flatten)]
    build: BuildArgs,
}

#[derive(Args)]
struct BuildArgs {
    /// Directory the read files will be downloaded into
    #[arg(long)]
    outdir: Option<Utf8PathBuf>,

    #[arg(long, value_enum)]
    schema: Option<ManifestSchema>,

    #[arg(long)]
    output: Option<Utf8PathBuf>,

    #[arg(long)]
    assembler: Option<String>,

    #[arg(long)]
    memory: Option<String>,

    #[arg(long)]
    contaminant_reference: Option<String>,

    /// Library strategy to exclude (case-insensitive)
    #[arg(long)]
    library_strategy_filter: Option<String>,

    /// File listing the only run accessions to keep
    #[arg(long)]
    allowed_runs: Option<Utf8PathBuf>,

    /// Resolve everything but do not write the samplesheet
    #[arg(long)]
    dry_run: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<SamplesheetError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &SamplesheetError) -> u8 {
    match error {
        SamplesheetError::EnaHttp(_) | SamplesheetError::EnaStatus { .. } => 3,
        SamplesheetError::MissingRequiredField { .. } | SamplesheetError::Table(_) => 2,
        other if other.is_configuration() => 2,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };
    let config = ConfigLoader::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Metadata(args) => run_metadata(args, &config, output_mode),
        Commands::Samplesheet(args) => run_samplesheet(args, &config, output_mode),
        Commands::Run(args) => run_all(args, &config, output_mode),
    }
}

fn run_metadata(
    args: MetadataArgs,
    config: &ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let request = MetadataRequest {
        study: args.study_accession.parse()?,
        output: args.output,
        extra_fields: merged_fields(config, args.fields),
    };
    let app = App::new(EnaHttpClient::new()?);

    match output_mode {
        OutputMode::NonInteractive => {
            let result = app.fetch_metadata(&request, &JsonOutput)?;
            JsonOutput::print_metadata(&result).into_diagnostic()?;
        }
        OutputMode::Interactive => {
            let result = app.fetch_metadata(&request, &TextOutput)?;
            TextOutput::print_metadata(&result);
        }
    }
    Ok(())
}

fn run_samplesheet(
    args: SamplesheetArgs,
    config: &ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let study: StudyAccession = args.study_accession.parse()?;
    let request = build_request(args.build, config, study, args.metadata_file)?;
    let app = App::new(NopEna);

    match output_mode {
        OutputMode::NonInteractive => {
            let result = app.build_samplesheet(&request, &JsonOutput)?;
            JsonOutput::print_samplesheet(&result).into_diagnostic()?;
        }
        OutputMode::Interactive => {
            let result = app.build_samplesheet(&request, &TextOutput)?;
            TextOutput::print_samplesheet(&result);
        }
    }
    Ok(())
}

fn run_all(args: RunArgs, config: &ResolvedConfig, output_mode: OutputMode) -> miette::Result<()> {
    let study: StudyAccession = args.study_accession.parse()?;
    let metadata_output = args
        .metadata_output
        .unwrap_or_else(|| Utf8PathBuf::from(format!("{study}_metadata.tsv")));
    let metadata = MetadataRequest {
        study: study.clone(),
        output: metadata_output.clone(),
        extra_fields: merged_fields(config, args.fields),
    };
    let samplesheet = build_request(args.build, config, study, metadata_output)?;
    let app = App::new(EnaHttpClient::new()?);

    match output_mode {
        OutputMode::NonInteractive => {
            let result = app.run(&metadata, &samplesheet, &JsonOutput)?;
            JsonOutput::print_run(&result).into_diagnostic()?;
        }
        OutputMode::Interactive => {
            let result = app.run(&metadata, &samplesheet, &TextOutput)?;
            TextOutput::print_metadata(&result.metadata);
            TextOutput::print_samplesheet(&result.samplesheet);
        }
    }
    Ok(())
}

struct NopEna;

impl EnaClient for NopEna {
    fn fetch_read_runs(
        &self,
        _study: &StudyAccession,
        _fields: &[String],
    ) -> Result<String, SamplesheetError> {
        Err(SamplesheetError::EnaHttp(
            "ENA client not configured".to_string(),
        ))
    }
}

fn merged_fields(config: &ResolvedConfig, fields: Vec<String>) -> Vec<String> {
    let mut merged = config.extra_fields.clone();
    merged.extend(fields);
    merged
}

fn build_request(
    args: BuildArgs,
    config: &ResolvedConfig,
    study: StudyAccession,
    metadata: Utf8PathBuf,
) -> miette::Result<SamplesheetRequest> {
    let outdir = args
        .outdir
        .or_else(|| config.outdir.clone())
        .ok_or(SamplesheetError::MissingSetting("outdir"))?;
    let schema = args.schema.unwrap_or(config.schema);

    let mut context = ManifestContext::new(study, outdir);
    context.assembler = args.assembler.unwrap_or_else(|| config.assembler.clone());
    context.memory = args.memory.unwrap_or_else(|| config.memory.clone());
    context.contaminant_reference = args
        .contaminant_reference
        .unwrap_or_else(|| config.contaminant_reference.clone());

    Ok(SamplesheetRequest {
        metadata,
        schema,
        context,
        output: args
            .output
            .unwrap_or_else(|| Utf8PathBuf::from(schema.default_output())),
        library_strategy_filter: args
            .library_strategy_filter
            .or_else(|| config.library_strategy_filter.clone()),
        allowed_runs_file: args
            .allowed_runs
            .or_else(|| config.allowed_runs_file.clone()),
        dry_run: args.dry_run,
    })
}
