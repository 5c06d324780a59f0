use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use jrdb_fwf_to_csv::{ConversionReport, ConvertOptions, Layout, WidthMode, convert_file};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "fwf2csv",
    version,
    about = "Convert fixed-width Shift-JIS text into quoted UTF-8 CSV"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Convert one fixed-width file.
    Convert(ConvertArgs),
}

#[derive(Debug, Args)]
struct ConvertArgs {
    /// Input fixed-width text path.
    #[arg(short, long)]
    input: PathBuf,

    /// Output CSV path.
    #[arg(short, long)]
    output: PathBuf,

    /// Metadata table with index,name,byte columns.
    #[arg(long, conflicts_with = "columns", required_unless_present = "columns")]
    layout: Option<PathBuf>,

    /// Inline layout like name:3,code:2.
    #[arg(long)]
    columns: Option<String>,

    /// Count widths in decoded characters instead of bytes.
    #[arg(long)]
    chars: bool,

    /// Output delimiter character.
    #[arg(long, default_value = ",")]
    delimiter: char,

    /// Print every warning, not just the count.
    #[arg(short, long)]
    verbose: bool,
}

fn load_layout(args: &ConvertArgs) -> Result<Layout> {
    if let Some(path) = &args.layout {
        return Layout::from_metadata_path(path)
            .with_context(|| format!("failed to load layout from '{}'", path.display()));
    }

    let inline = args
        .columns
        .as_deref()
        .ok_or_else(|| anyhow!("either --layout or --columns is required"))?;
    Layout::from_str(inline).context("failed to parse --columns")
}

fn parse_options(args: &ConvertArgs) -> Result<ConvertOptions> {
    if !args.delimiter.is_ascii() {
        anyhow::bail!("delimiter must be a single ASCII character");
    }

    Ok(ConvertOptions {
        width_mode: if args.chars {
            WidthMode::Chars
        } else {
            WidthMode::Bytes
        },
        delimiter: args.delimiter as u8,
    })
}

fn log_report(report: &ConversionReport, verbose: bool) {
    if report.warnings.is_empty() {
        return;
    }

    eprintln!(
        "warning: {} issue(s) detected, {} truncated row(s)",
        report.warnings.len(),
        report.truncated_rows
    );
    if verbose {
        for warning in &report.warnings {
            eprintln!(
                "  - {:?} line={:?} column={:?}: {}",
                warning.code, warning.line, warning.column, warning.message
            );
        }
    }
}

fn run_convert(args: &ConvertArgs) -> Result<ConversionReport> {
    let layout = load_layout(args)?;
    let options = parse_options(args)?;
    convert_file(&args.input, &args.output, &layout, &options)
        .with_context(|| format!("failed to convert '{}'", args.input.display()))
}

fn main() -> ExitCode {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("jrdb_fwf_to_csv=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Convert(args) => match run_convert(&args) {
            Ok(report) => {
                log_report(&report, args.verbose);
                if report.truncated_rows == 0 {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::from(2)
                }
            }
            Err(error) => {
                eprintln!("error: {error:#}");
                ExitCode::from(1)
            }
        },
    }
}
