use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use jrdb_loader::archive::{ArchiveFetcher, FetchOutcome};
use jrdb_loader::calendar::{EventCalendar, fetch_event_dates};
use jrdb_loader::config::LoaderConfig;
use jrdb_loader::driver::{RunOutcome, RunResult, run_trigger};
use jrdb_loader::http_client::BlockingHttpClient;
use jrdb_loader::layouts::LayoutCatalog;
use jrdb_loader::models::{Credentials, LAYOUT_FILE_TYPES, RaceDate};
use jrdb_loader::storage::{GcsStore, LocalStore};
use jrdb_loader::trigger::{decode_envelope, today_in_japan};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "jrdb-loader",
    version,
    about = "Load JRDB fixed-width archives into partitioned cloud storage as CSV"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Process one trigger message.
    Handle(HandleArgs),
    /// Print the event dates published on the members index.
    EventDates(SiteArgs),
    /// Download and extract one archive without converting it.
    Fetch(FetchArgs),
}

#[derive(Debug, Args)]
struct HandleArgs {
    /// Trigger message file; read from stdin when omitted.
    #[arg(long)]
    payload: Option<PathBuf>,

    /// Override today's date (YYYY-MM-DD, Japan time by default).
    #[arg(long)]
    today: Option<String>,

    /// Write objects under this directory instead of Cloud Storage.
    #[arg(long)]
    local_store: Option<PathBuf>,

    /// Directory holding <type>.csv layout tables.
    #[arg(long)]
    layout_dir: Option<PathBuf>,

    /// Members site base URL.
    #[arg(long)]
    base_url: Option<String>,
}

#[derive(Debug, Args)]
struct SiteArgs {
    #[arg(long)]
    account: String,

    #[arg(long)]
    password: String,

    /// Members site base URL.
    #[arg(long)]
    base_url: Option<String>,
}

#[derive(Debug, Args)]
struct FetchArgs {
    #[command(flatten)]
    site: SiteArgs,

    /// Archive type code such as sed or kza.
    #[arg(long)]
    zip_type: String,

    /// Race date as YYYY-MM-DD.
    #[arg(long)]
    date: String,

    /// Extraction directory.
    #[arg(long)]
    dest: PathBuf,
}

fn init_tracing(debug: bool) {
    let default_filter = if debug {
        "debug"
    } else {
        "jrdb_loader=info,jrdb_fwf_to_csv=warn"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn read_payload(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read trigger message '{}'", path.display())),
        None => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("failed to read trigger message from stdin")?;
            Ok(raw)
        }
    }
}

fn load_config(base_url: Option<&String>) -> Result<LoaderConfig> {
    let mut config = LoaderConfig::from_env().context("invalid environment configuration")?;
    if let Some(base_url) = base_url {
        config.base_url.clone_from(base_url);
    }
    Ok(config)
}

fn log_outcomes(outcomes: &[RunOutcome]) {
    for outcome in outcomes {
        let zip_type = outcome.zip_type.as_deref().unwrap_or("-");
        match &outcome.result {
            RunResult::Failed(message) => {
                eprintln!("failed: date={} zip_type={zip_type}: {message}", outcome.date);
            }
            RunResult::Completed {
                uploaded,
                skipped,
                failed,
            } => {
                eprintln!(
                    "done: date={} zip_type={zip_type} uploaded={uploaded} skipped={skipped} failed={failed}",
                    outcome.date
                );
            }
            RunResult::NotEventDate | RunResult::Skipped => {}
        }
    }
}

fn run_handle(args: &HandleArgs) -> Result<()> {
    let raw = read_payload(args.payload.as_deref())?;
    let trigger = decode_envelope(&raw);
    init_tracing(trigger.as_ref().is_ok_and(|trigger| trigger.debug));
    let trigger = trigger.context("failed to decode trigger message")?;

    let mut config = load_config(args.base_url.as_ref())?;
    if let Some(layout_dir) = &args.layout_dir {
        config.layout_dir.clone_from(layout_dir);
    }
    let today = match &args.today {
        Some(value) => RaceDate::parse_iso(value).context("invalid --today")?,
        None => today_in_japan(Utc::now()),
    };

    let layouts = LayoutCatalog::load_dir(&config.layout_dir, &LAYOUT_FILE_TYPES)
        .context("failed to initialise layout catalog")?;
    let client = BlockingHttpClient::new(config.http_timeout)?;

    let outcomes = if let Some(root) = &args.local_store {
        run_trigger(&trigger, &config, client, LocalStore::new(root), layouts, today)?
    } else {
        let store = GcsStore::new(GcsStore::build_client(config.http_timeout)?, &config)
            .context("failed to initialise Cloud Storage uploads")?;
        run_trigger(&trigger, &config, client, store, layouts, today)?
    };

    log_outcomes(&outcomes);
    Ok(())
}

fn run_event_dates(args: &SiteArgs) -> Result<()> {
    let config = load_config(args.base_url.as_ref())?;
    let client = BlockingHttpClient::new(config.http_timeout)?;
    let credentials = Credentials::new(&args.account, &args.password);

    let dates = fetch_event_dates(&client, &config.base_url, &credentials)
        .context("failed to fetch event dates")?;
    for date in dates {
        println!("{date}");
    }
    Ok(())
}

fn run_fetch(args: &FetchArgs) -> Result<()> {
    let config = load_config(args.site.base_url.as_ref())?;
    let client = BlockingHttpClient::new(config.http_timeout)?;
    let credentials = Credentials::new(&args.site.account, &args.site.password);
    let date = RaceDate::parse_iso(&args.date).context("invalid --date")?;

    let calendar = EventCalendar::load(&client, &config.base_url, &credentials)
        .context("failed to fetch event dates")?;
    let fetcher = ArchiveFetcher::new(client, config.base_url.clone(), credentials, calendar);
    match fetcher
        .fetch_and_extract(&args.zip_type, date, &args.dest)
        .with_context(|| format!("failed to fetch '{}' for {date}", args.zip_type))?
    {
        FetchOutcome::Skipped => println!("{date} is not an event date"),
        FetchOutcome::Fetched(files) => {
            for file in files {
                println!("{}", file.display());
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match &cli.command {
        Commands::Handle(args) => run_handle(args),
        Commands::EventDates(args) => {
            init_tracing(false);
            run_event_dates(args)
        }
        Commands::Fetch(args) => {
            init_tracing(false);
            run_fetch(args)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(1)
        }
    }
}
