#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal client for the rescue live complaint feed.
//!
//! `rescue watch` runs the full reconciler against a backend: initial
//! nearby fetch, real-time push stream, and periodic refresh, rendered
//! as terminal lines until interrupted. `rescue nearby` is the one-shot
//! variant without the live sources.

mod sink;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use rescue_client::location::DEFAULT_GEOIP_ENDPOINT;
use rescue_client::push::PushStream;
use rescue_client::{ComplaintApi, ComplaintFetcher, IpLocation};
use rescue_complaint_models::Category;
use rescue_feed::{FeedController, RenderSink, resolve_viewer_location, run_feed};
use rescue_feed_models::{FeedConfig, FeedNotice, IngestSource};
use rescue_geo::{Coordinates, LocationProvider, StaticLocation};
use tokio::sync::oneshot;

use crate::sink::ConsoleSink;

#[derive(Parser)]
#[command(name = "rescue", about = "Live complaint feed for the rescue platform")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream the live complaint feed until interrupted
    Watch {
        /// Path to a TOML config file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Base URL of the complaint API (overrides the config)
        #[arg(long)]
        api_url: Option<String>,
        /// WebSocket URL of the push stream (overrides the config)
        #[arg(long)]
        socket_url: Option<String>,
        /// Viewer latitude; skips the IP lookup when paired with --lng
        #[arg(long, allow_negative_numbers = true)]
        lat: Option<f64>,
        /// Viewer longitude; skips the IP lookup when paired with --lat
        #[arg(long, allow_negative_numbers = true)]
        lng: Option<f64>,
        /// Drop complaints farther than this many kilometers
        #[arg(long)]
        max_distance_km: Option<f64>,
    },
    /// Fetch the complaints near a location once and print them
    Nearby {
        /// Path to a TOML config file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Base URL of the complaint API (overrides the config)
        #[arg(long)]
        api_url: Option<String>,
        /// Viewer latitude; skips the IP lookup when paired with --lng
        #[arg(long, allow_negative_numbers = true)]
        lat: Option<f64>,
        /// Viewer longitude; skips the IP lookup when paired with --lat
        #[arg(long, allow_negative_numbers = true)]
        lng: Option<f64>,
    },
    /// List the complaint categories and their map styling
    Categories,
}

#[allow(clippy::too_many_lines)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Watch {
            config,
            api_url,
            socket_url,
            lat,
            lng,
            max_distance_km,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(api_url) = api_url {
                config.api_url = api_url;
            }
            if let Some(socket_url) = socket_url {
                config.socket_url = socket_url;
            }
            if let Some(cutoff) = max_distance_km {
                config.max_distance_km = Some(cutoff);
            }

            let fetcher: Arc<dyn ComplaintFetcher> =
                Arc::new(ComplaintApi::new(&config.api_url, config.nearby_radius_km)?);
            let push = PushStream::new(config.socket_url.clone()).spawn();
            let location = location_provider(lat, lng)?;
            let sink: Arc<dyn RenderSink> = Arc::new(ConsoleSink);

            println!("Watching complaints near you (Ctrl-C to stop)");
            let (shutdown_tx, shutdown_rx) = oneshot::channel();
            let feed = tokio::spawn(run_feed(config, fetcher, push, location, sink, shutdown_rx));

            tokio::signal::ctrl_c().await?;
            log::info!("interrupt received, shutting down");
            if shutdown_tx.send(()).is_err() {
                log::debug!("feed already stopped");
            }
            let stats = feed.await?;
            println!("Session summary: {stats}");
        }
        Commands::Nearby {
            config,
            api_url,
            lat,
            lng,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(api_url) = api_url {
                config.api_url = api_url;
            }

            let fetcher = ComplaintApi::new(&config.api_url, config.nearby_radius_km)?;
            let location = location_provider(lat, lng)?;
            let (viewer, degraded) = resolve_viewer_location(
                location.as_ref(),
                config.location_timeout(),
                config.default_location,
            )
            .await;

            let sink: Arc<dyn RenderSink> = Arc::new(ConsoleSink);
            let mut controller = FeedController::new(config, Arc::clone(&sink));
            controller.set_sink_ready();
            controller.set_viewer_location(viewer);
            if degraded {
                sink.notice(&FeedNotice::DegradedLocation);
            }

            let batch = fetcher.nearby(viewer).await?;
            if batch.is_empty() {
                sink.notice(&FeedNotice::NoRecentReports);
            }
            for raw in sorted_by_distance(batch, viewer) {
                controller.ingest(raw, IngestSource::InitialFetch);
            }
            println!("{} complaint(s) nearby", controller.stats().materialized);
        }
        Commands::Categories => {
            println!("{:<12} {:<6} COLOR", "CATEGORY", "ICON");
            println!("{}", "-".repeat(32));
            for category in Category::all() {
                println!(
                    "{:<12} {:<6} {}",
                    category.as_ref(),
                    category.icon(),
                    category.color()
                );
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<FeedConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(FeedConfig::load(path)?),
        None => Ok(FeedConfig::default()),
    }
}

/// Orders a one-shot batch nearest first. Records without usable
/// coordinates sort last (the pipeline drops them anyway).
fn sorted_by_distance(
    batch: Vec<serde_json::Value>,
    viewer: Coordinates,
) -> Vec<serde_json::Value> {
    let mut keyed: Vec<(Option<f64>, serde_json::Value)> = batch
        .into_iter()
        .map(|raw| {
            let km = rescue_geo::extract_coordinates(&raw)
                .map(|coordinates| rescue_geo::haversine_km(viewer, coordinates));
            (km, raw)
        })
        .collect();
    keyed.sort_by(|(a, _), (b, _)| match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(b),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    keyed.into_iter().map(|(_, raw)| raw).collect()
}

/// Builds the location provider for the session: a fixed position when
/// both flags are given, otherwise the IP lookup.
fn location_provider(
    lat: Option<f64>,
    lng: Option<f64>,
) -> Result<Arc<dyn LocationProvider>, Box<dyn std::error::Error>> {
    match (lat, lng) {
        (Some(lat), Some(lng)) => {
            let coordinates = Coordinates::validated(lat, lng)
                .ok_or_else(|| format!("coordinates out of range: ({lat}, {lng})"))?;
            Ok(Arc::new(StaticLocation::new(coordinates)))
        }
        (None, None) => Ok(Arc::new(IpLocation::new(DEFAULT_GEOIP_ENDPOINT)?)),
        _ => Err("--lat and --lng must be given together".into()),
    }
}
