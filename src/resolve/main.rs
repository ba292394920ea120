//! Route location resolution pipeline.
//!
//! Reads the listing crawl's link/grade files, runs the tier chain against
//! the catalog site, and writes the enriched dataset plus the unresolved
//! report.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use cragmap::config::Config;
use cragmap::dataset::RouteTable;
use cragmap::fetch::RetryingClient;
use cragmap::models::RouteRecord;
use cragmap::pip::{load_world_boundaries, ContainmentService, CountryIndex};
use cragmap::resolver::TierRunner;

#[derive(Parser, Debug)]
#[command(name = "resolve")]
#[command(about = "Resolve coordinates and countries for scraped climbing routes")]
struct Args {
    /// Route reference paths, one per line
    #[arg(short, long)]
    links: PathBuf,

    /// Parallel list of grade labels from the listing crawl
    #[arg(long)]
    grades: Option<PathBuf>,

    /// World boundary polygon layer (GeoJSON)
    #[arg(long)]
    boundaries: Option<PathBuf>,

    /// Enriched dataset (CSV), rewritten after every tier pass
    #[arg(short, long, default_value = "routes_with_locations.csv")]
    output: PathBuf,

    /// Plain-text report of links still lacking a location
    #[arg(long, default_value = "unresolved_links.txt")]
    unresolved: PathBuf,

    /// TOML run configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Resume from an existing output dataset instead of starting fresh
    #[arg(long)]
    resume: bool,

    /// Override the configured worker pool size
    #[arg(long)]
    concurrency: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };
    let concurrency = args.concurrency.unwrap_or(config.concurrency);

    info!("Cragmap resolution pipeline");
    info!("Links: {}", args.links.display());

    // Input lists from the listing crawl
    let links = read_lines(&args.links)?;
    let grades = match &args.grades {
        Some(path) => read_lines(path)?,
        None => Vec::new(),
    };
    if !grades.is_empty() && grades.len() != links.len() {
        warn!(
            "Grade list length {} does not match link list length {}",
            grades.len(),
            links.len()
        );
    }

    // Start from the previous dataset when resuming, so already-resolved
    // entities are not re-fetched.
    let mut table = if args.resume && args.output.exists() {
        RouteTable::load_csv(&args.output)?
    } else {
        RouteTable::new()
    };

    for (i, link) in links.iter().enumerate() {
        let mut record = RouteRecord::new(link.clone());
        record.grade = grades.get(i).cloned();
        table.upsert(record);
    }
    info!("Route table holds {} entities", table.len());

    // Boundary layer for the containment tier
    let containment = match &args.boundaries {
        Some(path) => {
            let boundaries = load_world_boundaries(path)?;
            Some(ContainmentService::new(CountryIndex::build(boundaries)))
        }
        None => {
            warn!("No boundary layer given; country containment tier will be skipped");
            None
        }
    };

    let client = RetryingClient::new(&config.fetch);
    let mut runner = TierRunner::new(&client, &config.base_url)
        .context("Invalid base URL in configuration")?
        .with_concurrency(concurrency);
    if let Some(service) = &containment {
        runner = runner.with_containment(service);
    }

    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
        .progress_chars("#>-");

    // The runner persists the table at every tier barrier, so an interrupted
    // run resumes from the last completed tier.
    let report = runner
        .run(
            &mut table,
            |_| Some(ProgressBar::new(0).with_style(style.clone())),
            |_, table| table.write_csv(&args.output),
        )
        .await?;

    for failure in &report.failures {
        warn!(
            "{} [{}] failed at {} tier: {}",
            failure.key,
            failure.link,
            failure.tier.name(),
            failure.error
        );
    }
    let failure_count = report.failures.len();

    table.write_unresolved(&args.unresolved)?;

    let summary = table.summary();
    info!(
        "Run complete: {} fully resolved, {} partially resolved, {} unresolved ({} entity failures recorded)",
        summary.resolved, summary.partial, summary.unresolved, failure_count
    );
    info!("Dataset: {}", args.output.display());
    info!("Unresolved report: {}", args.unresolved.display());

    Ok(())
}

fn read_lines(path: &PathBuf) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read input list {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}
