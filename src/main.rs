//! Gleaner main entry point
//!
//! This is the command-line interface for running one extraction job.

use clap::Parser;
use gleaner::config::{default_config, load_config_with_hash, validate, Config};
use gleaner::crawler::{Coordinator, HttpFetcher, PageSource, RateLimiter};
use gleaner::extract::{DedupStrategy, Deduplicator, Record};
use gleaner::framework::inspect_page;
use gleaner::output::{
    append_jsonl, load_job_statistics, print_job_statistics, print_run_summary, write_jsonl,
    JsonlWriter, RunSummary,
};
use gleaner::robots::RobotsPolicy;
use gleaner::schema::load_schema;
use gleaner::storage::SqliteStateStore;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Gleaner: polite crawl and schema-driven extraction
///
/// Fetches a listing page (and its next pages) while respecting robots.txt
/// and per-domain rate limits, applies an extraction schema, and writes one
/// JSON record per line.
#[derive(Parser, Debug)]
#[command(name = "gleaner")]
#[command(version)]
#[command(about = "Polite crawl and schema-driven extraction", long_about = None)]
struct Cli {
    /// Path to the extraction schema (TOML, or JSON with a .json extension)
    #[arg(value_name = "SCHEMA", required_unless_present = "stats")]
    schema: Option<PathBuf>,

    /// Start URL; defaults to the schema's `url`
    #[arg(long)]
    url: Option<String>,

    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Job name; enables resume cursors, failure tracking, and item storage
    #[arg(long)]
    job: Option<String>,

    /// Maximum pages to fetch (overrides the schema)
    #[arg(long)]
    max_pages: Option<u32>,

    /// Fetch only the start page, ignoring pagination
    #[arg(long, conflicts_with_all = ["max_pages", "resume"])]
    single: bool,

    /// Continue from the job's saved cursor
    #[arg(long, requires = "job")]
    resume: bool,

    /// Omit the `_meta` member from records
    #[arg(long)]
    no_meta: bool,

    /// Deduplicate on these fields instead of whole records (repeatable)
    #[arg(long = "dedup-key", value_name = "FIELD")]
    dedup_keys: Vec<String>,

    /// Keep the last copy of a duplicate instead of the first
    #[arg(long)]
    keep_last: bool,

    /// Write records to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Append to the output file instead of replacing it
    #[arg(long, requires = "output")]
    append: bool,

    /// Override the state database path
    #[arg(long)]
    state_db: Option<PathBuf>,

    /// Override the default requests per second per domain
    #[arg(long)]
    rps: Option<f64>,

    /// Skip robots.txt checks
    #[arg(long)]
    ignore_robots: bool,

    /// Fetch the start page and print framework detection results and exit
    #[arg(long, conflicts_with_all = ["stats", "job"])]
    detect: bool,

    /// Show the job's stored state and exit
    #[arg(long, requires = "job", conflicts_with = "detect")]
    stats: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = load_effective_config(&cli)?;

    if cli.stats {
        handle_stats(&config, cli.job.as_deref().unwrap_or_default())?;
    } else {
        handle_run(cli, config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr; stdout carries the record stream.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("gleaner=info,warn"),
            1 => EnvFilter::new("gleaner=debug,info"),
            2 => EnvFilter::new("gleaner=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// File (or defaults), then environment, then command-line flags
fn load_effective_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => default_config()?,
    };

    if let Some(rps) = cli.rps {
        config.politeness.requests_per_second = rps;
    }
    if cli.ignore_robots {
        config.politeness.ignore_robots = true;
    }
    if let Some(path) = &cli.state_db {
        config.storage.state_path = path.to_string_lossy().into_owned();
    }
    validate(&config)?;

    Ok(config)
}

/// Handles the --stats mode: shows the job's persisted state
fn handle_stats(config: &Config, job: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = SqliteStateStore::new(Path::new(&config.storage.state_path))?;
    let stats = load_job_statistics(&store, job)?;
    print_job_statistics(&stats);
    Ok(())
}

async fn handle_run(cli: Cli, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let schema_path = cli.schema.as_deref().ok_or("a schema path is required")?;
    let schema = Arc::new(load_schema(schema_path)?);
    let start_url = cli
        .url
        .clone()
        .or_else(|| schema.url.clone())
        .ok_or("no start URL: pass --url or set `url` in the schema")?;

    let limiter = Arc::new(RateLimiter::from_config(&config.politeness));
    let robots = Arc::new(RobotsPolicy::from_config(&config.politeness, &config.storage)?);

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current request");
            interrupt.cancel();
        }
    });

    let fetcher =
        HttpFetcher::from_config(&config, limiter, robots)?.with_cancel_token(cancel.clone());

    if cli.detect {
        let html = fetcher.fetch_page(&start_url).await?;
        println!("{}", serde_json::to_string_pretty(&inspect_page(&html))?);
        return Ok(());
    }

    let mut coordinator = Coordinator::new(fetcher, Arc::clone(&schema)).with_cancel_token(cancel);
    if let Some(job) = &cli.job {
        let store = SqliteStateStore::new(Path::new(&config.storage.state_path))?;
        coordinator = coordinator.with_job(job.clone(), Arc::new(Mutex::new(store)));
    }

    let include_metadata = !cli.no_meta;
    let records = if cli.single {
        coordinator.fetch_url(&start_url, include_metadata).await?
    } else if cli.resume {
        coordinator
            .resume_with_pagination(&start_url, cli.max_pages, include_metadata)
            .await?
    } else {
        coordinator
            .fetch_with_pagination(&start_url, cli.max_pages, include_metadata)
            .await?
    };

    let (unique, duplicates) = deduplicate(records, &cli.dedup_keys, cli.keep_last);
    finish(&cli, &coordinator, unique, duplicates)
}

/// Drops in-stream duplicates, returning the survivors and the duplicate count
fn deduplicate(records: Vec<Record>, keys: &[String], keep_last: bool) -> (Vec<Record>, u64) {
    let strategy = if keep_last {
        DedupStrategy::Last
    } else {
        DedupStrategy::First
    };
    let mut dedup = Deduplicator::new()
        .with_key_fields(keys.iter().cloned())
        .with_strategy(strategy);

    match strategy {
        DedupStrategy::First => {
            let unique = dedup.filter(records);
            (unique, dedup.duplicate_count())
        }
        DedupStrategy::Last => {
            for record in &records {
                dedup.is_duplicate(record);
            }
            let duplicates = dedup.duplicate_count();
            (dedup.into_unique_records(), duplicates)
        }
    }
}

/// Persists, writes, and summarizes the surviving records
fn finish<F: PageSource>(
    cli: &Cli,
    coordinator: &Coordinator<F>,
    records: Vec<Record>,
    duplicates: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let new_items = match &cli.job {
        Some(_) => Some(coordinator.persist_items(&records)?),
        None => None,
    };

    let written = match &cli.output {
        Some(path) if cli.append => append_jsonl(path, &records)?,
        Some(path) => write_jsonl(path, &records)?,
        None => {
            let stdout = std::io::stdout();
            let mut writer = JsonlWriter::new(stdout.lock());
            writer.write_all(&records)?;
            writer.flush()?;
            writer.count()
        }
    };

    if !cli.quiet {
        print_run_summary(&RunSummary {
            schema: coordinator.schema().name.clone(),
            job: cli.job.clone(),
            crawl: coordinator.get_stats().clone(),
            duplicates,
            new_items,
            written,
        });
    }
    Ok(())
}
