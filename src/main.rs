//! CLI entry point for the TTC route map tool.
//!
//! Provides subcommands for rendering a route's map with live vehicle
//! positions and for dumping decoded vehicle observations as JSON.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use ttc_route_map::{
    fetch::{BasicClient, fetch_bytes},
    realtime::{decode_vehicles, feed_header_timestamp},
    render::{LeafletRenderer, MapRenderer},
    topology::GtfsStatic,
    view::compose,
};

const DEFAULT_STATIC_DIR: &str = "TTC-GTFS-Static";
const DEFAULT_VEHICLES_URL: &str = "https://bustime.ttc.ca/gtfsrt/vehicles";

#[derive(Parser)]
#[command(name = "ttc_route_map")]
#[command(about = "Render a TTC route with live vehicle positions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the interactive map for a bus number
    Render {
        /// Rider-facing bus number (e.g. 504)
        #[arg(value_name = "BUS_NUMBER")]
        bus_number: String,

        /// Directory containing the GTFS static tables
        #[arg(short, long)]
        static_dir: Option<String>,

        /// Realtime feed source: URL or path to a protobuf file
        #[arg(short, long)]
        feed: Option<String>,

        /// Directory the map document is written to
        #[arg(short, long, default_value = ".")]
        output_dir: String,
    },
    /// Decode the realtime feed and print a route's vehicles as JSON
    Vehicles {
        /// Rider-facing bus number (e.g. 504)
        #[arg(value_name = "BUS_NUMBER")]
        bus_number: String,

        /// Directory containing the GTFS static tables
        #[arg(short, long)]
        static_dir: Option<String>,

        /// Realtime feed source: URL or path to a protobuf file
        #[arg(short, long)]
        feed: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/ttc_route_map.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("ttc_route_map.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            bus_number,
            static_dir,
            feed,
            output_dir,
        } => {
            render_route(
                &bus_number,
                &static_dir_or_default(static_dir),
                &feed_or_default(feed),
                &output_dir,
            )
            .await?;
        }
        Commands::Vehicles {
            bus_number,
            static_dir,
            feed,
        } => {
            dump_vehicles(
                &bus_number,
                &static_dir_or_default(static_dir),
                &feed_or_default(feed),
            )
            .await?;
        }
    }

    Ok(())
}

fn static_dir_or_default(arg: Option<String>) -> String {
    arg.or_else(|| std::env::var("TTC_GTFS_STATIC_DIR").ok())
        .unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string())
}

fn feed_or_default(arg: Option<String>) -> String {
    arg.or_else(|| std::env::var("TTC_VEHICLES_URL").ok())
        .unwrap_or_else(|| DEFAULT_VEHICLES_URL.to_string())
}

/// Runs one full fetch, decode, resolve, compose, render cycle.
#[tracing::instrument(skip(static_dir, feed, output_dir))]
async fn render_route(
    bus_number: &str,
    static_dir: &str,
    feed: &str,
    output_dir: &str,
) -> Result<()> {
    let gtfs = GtfsStatic::open(static_dir);

    let route_id = match gtfs.resolve_route(bus_number) {
        Ok(id) => id,
        Err(e) if e.is_user_facing() => {
            error!("{e}");
            println!("Invalid bus number or no data found: {bus_number}");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let shapes = match gtfs.route_shapes(&route_id) {
        Ok(shapes) => shapes,
        Err(e) if e.is_user_facing() => {
            error!("{e}");
            println!("No route geometry available for bus {bus_number}");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    let color = gtfs.route_color(&route_id);

    let (vehicles, updated_at) = match fetcher(feed).await {
        Ok(bytes) => (
            decode_vehicles(&bytes, &route_id),
            feed_header_timestamp(&bytes),
        ),
        Err(e) => {
            warn!(error = %e, "Realtime fetch failed, rendering without vehicles");
            (Vec::new(), None)
        }
    };

    let artifact = compose(&route_id, &shapes, &color, &vehicles)?;
    let path = LeafletRenderer::new(output_dir).render(&artifact)?;

    info!(
        route_id,
        vehicle_count = artifact.markers.len(),
        path = %path.display(),
        "Route rendered"
    );
    if let Some(ts) = updated_at {
        println!("Feed last updated: {ts}");
    }
    println!("Map written to {}", path.display());

    Ok(())
}

/// Decodes the feed for a route and prints the observations as JSON.
#[tracing::instrument(skip(static_dir, feed))]
async fn dump_vehicles(bus_number: &str, static_dir: &str, feed: &str) -> Result<()> {
    let gtfs = GtfsStatic::open(static_dir);

    let route_id = match gtfs.resolve_route(bus_number) {
        Ok(id) => id,
        Err(e) if e.is_user_facing() => {
            error!("{e}");
            println!("Invalid bus number or no data found: {bus_number}");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let vehicles = match fetcher(feed).await {
        Ok(bytes) => decode_vehicles(&bytes, &route_id),
        Err(e) => {
            warn!(error = %e, "Realtime fetch failed");
            Vec::new()
        }
    };

    info!(route_id, vehicle_count = vehicles.len(), "Feed decoded");
    println!("{}", serde_json::to_string_pretty(&vehicles)?);

    Ok(())
}

/// Loads feed data from a local file path or fetches it over HTTP.
#[tracing::instrument(fields(source = %url))]
async fn fetcher(url: &str) -> Result<Vec<u8>> {
    let bytes = if url.starts_with("http") {
        let client = BasicClient::new();
        fetch_bytes(&client, url).await?
    } else {
        std::fs::read(url)?
    };
    Ok(bytes)
}
