//! Offline hierarchy resolution.
//!
//! Loads administrative boundaries and places, assigns province, district,
//! municipality and ward to every place, builds search documents and
//! replaces the Elasticsearch index with them.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use thegana::elasticsearch::{EsBackend, EsClient};
use thegana::models::{BoostTable, Place, SearchDocument};
use thegana::pip::{BoundaryCatalog, HierarchyResolver, ResolveReport, ResolvedPlace};
use thegana::search::SearchBackend;
use thegana::source::{load_boundaries, load_places};
use thegana::{AdminLevel, Config};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "resolve")]
#[command(about = "Resolve administrative hierarchy and rebuild the search index")]
struct Args {
    /// Administrative boundaries (JSON lines)
    #[arg(short, long)]
    boundaries: PathBuf,

    /// Places, points of interest and roads (JSON lines)
    #[arg(short, long)]
    places: PathBuf,

    /// Optional TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Elasticsearch URL (overrides config)
    #[arg(long)]
    es_url: Option<String>,

    /// Elasticsearch index name (overrides config)
    #[arg(long)]
    index: Option<String>,

    /// Resolution worker threads (overrides config)
    #[arg(long)]
    workers: Option<usize>,

    /// Batch size for bulk indexing (overrides config)
    #[arg(long)]
    batch_size: Option<usize>,

    /// Write documents as JSON lines to this file instead of indexing
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Do not index administrative boundaries as searchable places
    #[arg(long)]
    skip_boundary_places: bool,
}

impl Args {
    fn config(&self) -> Result<Config> {
        let mut config = Config::load_or_default(self.config.as_ref())
            .context("Failed to load configuration")?;
        if let Some(url) = &self.es_url {
            config.elasticsearch.url = url.clone();
        }
        if let Some(index) = &self.index {
            config.elasticsearch.index = index.clone();
        }
        if let Some(workers) = self.workers {
            config.resolve.workers = workers;
        }
        if let Some(batch_size) = self.batch_size {
            config.resolve.batch_size = batch_size;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let config = args.config()?;

    info!("Thegana hierarchy resolution");

    let (boundaries, boundary_report) =
        load_boundaries(&args.boundaries).context("Failed to read boundaries")?;
    if boundaries.is_empty() {
        anyhow::bail!("No usable boundaries in {}", args.boundaries.display());
    }

    let (mut places, place_report) = load_places(&args.places).context("Failed to read places")?;
    if !args.skip_boundary_places {
        places.extend(boundaries.iter().map(Place::from_boundary));
    }

    let catalog = Arc::new(BoundaryCatalog::build(boundaries));
    for level in AdminLevel::all() {
        info!(
            "Catalog {:?}: {} boundaries",
            level,
            catalog.count_at_level(*level)
        );
    }
    info!(
        "Boundaries: {} loaded, {} ignored, {} malformed; places: {} loaded, {} ignored, {} malformed",
        boundary_report.loaded,
        boundary_report.ignored,
        boundary_report.malformed,
        place_report.loaded,
        place_report.ignored,
        place_report.malformed
    );

    let resolver = HierarchyResolver::new(catalog);
    let pb = ProgressBar::new(places.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})",
            )?
            .progress_chars("#>-"),
    );

    let workers = config.resolve.workers;
    let bar = pb.clone();
    let (resolved, report) =
        tokio::task::spawn_blocking(move || resolver.resolve_all(places, workers, Some(&bar)))
            .await
            .context("Resolution task panicked")??;
    pb.finish_and_clear();
    log_report(&report);

    let documents = build_documents(&resolved, &config.boost, &config.document.country);
    info!("Built {} search documents", documents.len());

    match &args.output {
        Some(path) => {
            write_documents(path, &documents)?;
            info!("Wrote {} documents to {}", documents.len(), path.display());
        }
        None => {
            let client = EsClient::from_config(&config.elasticsearch)
                .context("Failed to configure Elasticsearch client")?;
            let backend = EsBackend::new(client, config.resolve.batch_size);
            if !backend.is_available().await {
                anyhow::bail!("Elasticsearch cluster is not healthy");
            }

            let indexed = backend
                .replace_all(documents)
                .await
                .context("Failed to replace index contents")?;
            let doc_count = backend.client().doc_count().await?;
            info!(
                "Indexed {} documents; index '{}' now holds {}",
                indexed, config.elasticsearch.index, doc_count
            );
        }
    }

    Ok(())
}

fn build_documents(
    resolved: &[ResolvedPlace],
    boosts: &BoostTable,
    country: &str,
) -> Vec<SearchDocument> {
    resolved
        .iter()
        .filter_map(|rp| SearchDocument::build(&rp.place, rp.location, boosts, country))
        .collect()
}

fn write_documents(path: &Path, documents: &[SearchDocument]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for doc in documents {
        serde_json::to_writer(&mut writer, doc)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

fn log_report(report: &ResolveReport) {
    info!(
        "Resolved {} of {} places ({} without geometry)",
        report.resolved, report.total, report.without_geometry
    );
    if report.skipped > 0 {
        warn!("Skipped {} places with malformed geometry", report.skipped);
    }
    for level in AdminLevel::all() {
        let filled = report.filled.get(level).copied().unwrap_or(0);
        info!("  {:?}: {} places", level, filled);
    }
}
