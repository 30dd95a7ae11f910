use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{error, info};
use std::fs;
use std::path::PathBuf;

use olaf_rs::exif::{BuiltinMetadata, ExiftoolMetadata, MetadataSource};
use olaf_rs::pipeline::{self, RunOptions, RunReport};
use olaf_rs::source::{SourceConfig, SourceKind};
use olaf_rs::strategy::TimestampStrategy;

#[derive(Parser)]
#[command(name = "olaf")]
#[command(version)]
#[command(about = "Rename photos chronologically from their EXIF capture date")]
#[command(long_about = "Renames every photo of a folder (local or Google Drive) to its capture time.

Output format: YYYY-MM-DD_HH-MM-SS[_Photographer].<ext>
Tie-breaking: files whose name is already taken get _1, _2, etc. suffixes
Files already following the format are left alone, so runs can be repeated.")]
struct Cli {
    /// Increase verbosity (-v=INFO, -vv=DEBUG, -vvv=TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rename using the EXIF capture date as is
    Process {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Rename using a corrected date: shift the camera time by an offset and
    /// replace the calendar date
    Fixdate {
        #[command(flatten)]
        source: SourceArgs,
        /// Real capture date (format: YYYY-MM-DD)
        #[arg(long)]
        date: String,
        /// Camera clock offset, e.g. +1h, -30m, -2h15m30s
        #[arg(long, allow_hyphen_values = true)]
        offset: String,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum MetadataBackend {
    /// External exiftool binary
    Exiftool,
    /// Built-in EXIF reader
    Builtin,
}

#[derive(Args)]
struct SourceArgs {
    /// Where the photos live
    #[arg(long, value_enum)]
    source: SourceKind,
    /// Local folder with the photos (local source)
    #[arg(long)]
    path: Option<PathBuf>,
    /// Google Drive folder id (drive source)
    #[arg(long)]
    folder_id: Option<String>,
    /// Google service-account key, or a file holding an OAuth access token
    /// (drive source)
    #[arg(long)]
    credentials: Option<PathBuf>,
    /// Directory under which Drive downloads are staged (default: system temp)
    #[arg(long)]
    staging_dir: Option<PathBuf>,
    /// Append the photographer name found in the original file name
    #[arg(long)]
    extract_name: bool,
    /// How capture dates are read
    #[arg(long, value_enum, default_value = "exiftool")]
    metadata: MetadataBackend,
    /// Write a JSON report of the run to this file
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = setup_logging(cli.verbose) {
        eprintln!("Failed to set up logging: {:#}", e);
        std::process::exit(1);
    }

    info!("Starting olaf");

    if let Err(e) = run_command(cli.command) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run_command(command: Commands) -> Result<()> {
    match command {
        Commands::Process { source } => execute(&source, TimestampStrategy::DirectExif),
        Commands::Fixdate { source, date, offset } => {
            let strategy = TimestampStrategy::manual_correction(&date, &offset)?;
            execute(&source, strategy)
        }
    }
}

fn setup_logging(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    Ok(())
}

fn execute(args: &SourceArgs, strategy: TimestampStrategy) -> Result<()> {
    let config = source_config(args);
    config.validate()?;

    let metadata = build_metadata(args.metadata)?;
    let mut source = config.build()?;

    let options = RunOptions {
        extract_photographer: args.extract_name,
        show_progress: true,
    };
    let report = pipeline::run(source.as_mut(), &strategy, metadata.as_ref(), &options)?;

    print_summary(&report);

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize run report")?;
        fs::write(path, json).with_context(|| format!("Failed to write report: {}", path.display()))?;
        info!("Report written to {}", path.display());
    }

    Ok(())
}

fn build_metadata(backend: MetadataBackend) -> Result<Box<dyn MetadataSource>> {
    let metadata: Box<dyn MetadataSource> = match backend {
        MetadataBackend::Exiftool => Box::new(ExiftoolMetadata::new()?),
        MetadataBackend::Builtin => Box::new(BuiltinMetadata::new()),
    };
    Ok(metadata)
}

fn source_config(args: &SourceArgs) -> SourceConfig {
    SourceConfig {
        kind: args.source,
        path: args.path.clone(),
        folder_id: args.folder_id.clone(),
        credentials: args.credentials.clone(),
        staging_root: args.staging_dir.clone(),
    }
}

fn print_summary(report: &RunReport) {
    println!("\nSummary:");
    println!("Files found: {}", report.files_found);
    println!("Already renamed: {}", report.already_renamed.len());
    println!("Without capture date: {}", report.without_timestamp.len());
    println!("Renamed: {}", report.renamed_count());
    println!("Errors: {}", report.failed_count());

    for outcome in report.outcomes.iter().filter(|o| !o.success) {
        println!(
            "  {}: {}",
            outcome.display_name,
            outcome.error.as_deref().unwrap_or("unknown error")
        );
    }
}
