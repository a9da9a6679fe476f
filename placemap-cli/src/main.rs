//! `placemap`: turn spreadsheet rows into GeoJSON map points.
//!
//! Examples:
//!   placemap points --rows sheet.csv --params "coordsLabels=lat,lon&labels=name"
//!   placemap points --rows sheet.csv --index places.db --location-label city
//!   placemap search --index places.db "Wrocław"
//!   placemap info --index places.db

mod output;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use placemap_core::{CsvRowSource, MapConfig, MapSession, PlaceIndex, PlaceLookup};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "placemap", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve rows from a CSV export and print a GeoJSON FeatureCollection.
    Points(PointsArgs),
    /// Search the place index and print ranked matches.
    Search {
        /// Place index database.
        #[arg(long)]
        index: PathBuf,
        /// Free-text place name.
        text: String,
        /// Maximum number of matches.
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Print place index statistics.
    Info {
        #[arg(long)]
        index: PathBuf,
    },
}

#[derive(Args)]
struct PointsArgs {
    /// CSV file with a header row.
    #[arg(long)]
    rows: PathBuf,

    /// Place index database, needed for place-name lookup.
    #[arg(long)]
    index: Option<PathBuf>,

    /// Query string or full URL carrying id, coordsLabels, locationLabel, labels.
    #[arg(long)]
    params: Option<String>,

    /// JSON file with the same settings as --params.
    #[arg(long, conflicts_with = "params")]
    config: Option<PathBuf>,

    /// Latitude and longitude columns, comma-joined (e.g. "lat,lon").
    #[arg(long)]
    coords_labels: Option<String>,

    /// Column holding a place name to look up in the index.
    #[arg(long)]
    location_label: Option<String>,

    /// Columns shown in each popup, comma-joined.
    #[arg(long)]
    labels: Option<String>,

    /// Pretty-print the GeoJSON.
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Points(args) => run_points(args).await,
        Command::Search { index, text, limit } => run_search(&index, &text, limit),
        Command::Info { index } => run_info(&index),
    }
}

async fn run_points(args: PointsArgs) -> Result<()> {
    let config = build_config(&args)?;
    let strategy = config.strategy();

    let index = match &args.index {
        Some(path) => Some(open_index(path)?),
        None => None,
    };

    if strategy.as_ref().is_some_and(|s| s.needs_index()) && index.is_none() {
        bail!("place-name lookup needs a place index (--index)");
    }
    if strategy.is_none() {
        tracing::warn!("no coordinate or location column configured; no rows will resolve");
    }

    let mut session = MapSession::new(config, index);
    session
        .refresh(&CsvRowSource::new(&args.rows))
        .await
        .with_context(|| format!("Failed to read rows from {}", args.rows.display()))?;

    let summary = session.summary();
    eprintln!(
        "Resolved {} of {} rows ({} dropped)",
        summary.resolved,
        summary.total,
        summary.dropped_total()
    );
    for (kind, count) in &summary.dropped {
        eprintln!("  {kind}: {count}");
    }

    let collection = output::feature_collection(&session.payload());
    let json = if args.pretty {
        serde_json::to_string_pretty(&collection)?
    } else {
        serde_json::to_string(&collection)?
    };
    println!("{json}");

    Ok(())
}

fn build_config(args: &PointsArgs) -> Result<MapConfig> {
    let mut config = if let Some(params) = &args.params {
        if params.contains("://") {
            MapConfig::from_url(params).context("Invalid --params URL")?
        } else {
            MapConfig::from_query(params)
        }
    } else if let Some(path) = &args.config {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))?
    } else {
        MapConfig::default()
    };

    if let Some(coords) = &args.coords_labels {
        config = config.with_coords_labels(coords);
    }
    if let Some(label) = &args.location_label {
        config = config.with_location_label(label.as_str());
    }
    if let Some(labels) = &args.labels {
        config = config.with_labels(labels);
    }

    Ok(config)
}

fn open_index(path: &Path) -> Result<PlaceIndex> {
    PlaceIndex::open(path)
        .with_context(|| format!("Failed to open place index {}", path.display()))
}

fn run_search(path: &Path, text: &str, limit: usize) -> Result<()> {
    let index = open_index(path)?;
    let hits = index.search_with_limit(text, limit)?;

    if hits.is_empty() {
        println!("No matches for {text:?}");
        return Ok(());
    }

    for (rank, hit) in hits.iter().enumerate() {
        let Some(record) = index.get_record(hit.place)? else {
            continue;
        };
        println!(
            "{}. {} [{}] ({:.5}, {:.5}) {} score={:.3}",
            rank + 1,
            record.name,
            record.id,
            record.lat,
            record.lon,
            record.region_names.join(", "),
            hit.score
        );
    }

    Ok(())
}

fn run_info(path: &Path) -> Result<()> {
    let index = open_index(path)?;
    println!("Places: {}", index.count()?);
    for key in ["dataset", "record_count"] {
        if let Some(value) = index.get_metadata(key)? {
            println!("{key}: {value}");
        }
    }
    Ok(())
}
