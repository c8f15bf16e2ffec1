//! CLI entry point for province_flows.
//!
//! Provides subcommands for coloring a single day of provincial trips,
//! the per-capita variant, whole months, side-by-side comparisons and a
//! join-field diagnostic.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use province_flows::config::AppConfig;
use province_flows::mapping::aggregate::aggregate_day;
use province_flows::mapping::detect::detect_province_field;
use province_flows::mapping::types::{ColoredMap, KeyedValues, MapKind};
use province_flows::mapping::{MapContext, MapRequest};
use province_flows::names::normalize_name;
use province_flows::output::{append_summary, print_json, print_pretty, write_geojson, write_json};
use province_flows::progress::{CancelToken, LogProgress};
use province_flows::sequence::{SeriesSpec, compare_sequence, month_sequence};
use province_flows::stats::MapSummary;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "province_flows")]
#[command(about = "Choropleth maps of trips between Spanish provinces", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when it does not exist
    #[arg(short, long, global = true, default_value = "province_flows.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct DayArgs {
    /// Province under study (names the trip file and gets highlighted)
    province: String,

    /// Month of the trip file, 1-12
    #[arg(short, long)]
    month: u32,

    /// Day of month to map
    #[arg(short, long)]
    day: u32,

    /// Contrast of the color ramp; defaults to `[color] sensitivity`
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=10))]
    sensitivity: Option<u8>,

    /// Initial zoom level for renderers
    #[arg(short, long, default_value_t = 6, value_parser = clap::value_parser!(u8).range(4..=10))]
    zoom: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Map the trips leaving each province on one day
    Day(DayArgs),
    /// Map trips per 1000 inhabitants on one day
    Relative(DayArgs),
    /// Build the map of every day in a month
    Month {
        /// Province under study
        province: String,

        /// Month of the trip file, 1-12
        #[arg(short, long)]
        month: u32,

        #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=10))]
        sensitivity: Option<u8>,

        #[arg(short, long, default_value_t = 6, value_parser = clap::value_parser!(u8).range(4..=10))]
        zoom: u8,

        /// Gzip compress the JSON bundle
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Pair the maps of two series over the days they share
    Compare {
        /// First province
        province_a: String,

        /// Second province
        province_b: String,

        #[arg(long)]
        month_a: u32,

        #[arg(long)]
        month_b: u32,

        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=10))]
        sensitivity_a: Option<u8>,

        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=10))]
        sensitivity_b: Option<u8>,

        #[arg(short, long, default_value_t = 6, value_parser = clap::value_parser!(u8).range(4..=10))]
        zoom: u8,

        /// Gzip compress the JSON bundle
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Show which geometry column joins with a day of trips
    Detect {
        province: String,

        #[arg(short, long)]
        month: u32,

        #[arg(short, long)]
        day: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/province_flows.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("province_flows.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let ctx = MapContext::new(config)?;
    let results_dir = ctx.config.paths.results_dir.clone();
    std::fs::create_dir_all(&results_dir)
        .with_context(|| format!("creating {}", results_dir.display()))?;

    match cli.command {
        Commands::Day(args) => run_day(&ctx, &results_dir, MapKind::Trips, args)?,
        Commands::Relative(args) => run_day(&ctx, &results_dir, MapKind::Relative, args)?,
        Commands::Month {
            province,
            month,
            sensitivity,
            zoom,
            gzip,
        } => {
            let series = SeriesSpec {
                subject: province,
                month,
                sensitivity: ctx.sensitivity_or_default(sensitivity.map(f64::from)),
            };
            let path = bundle_path(
                &results_dir,
                &format!("{}-{:02}", file_stem(&series.subject), month),
                gzip,
            );
            let cancel = cancel_on_ctrl_c();

            let bundle = tokio::task::spawn_blocking(move || {
                month_sequence(&ctx, &series, zoom, &LogProgress::new("month"), &cancel)
                    .map(|bundle| (ctx, bundle))
            })
            .await?;
            let (ctx, bundle) = bundle.context("building month")?;

            write_json(&path, &bundle, gzip)?;
            for map in &bundle.maps {
                record(&ctx, map)?;
            }
            info!(days = bundle.days.len(), path = %path.display(), "Month finished");
        }
        Commands::Compare {
            province_a,
            province_b,
            month_a,
            month_b,
            sensitivity_a,
            sensitivity_b,
            zoom,
            gzip,
        } => {
            let series_a = SeriesSpec {
                subject: province_a,
                month: month_a,
                sensitivity: ctx.sensitivity_or_default(sensitivity_a.map(f64::from)),
            };
            let series_b = SeriesSpec {
                subject: province_b,
                month: month_b,
                sensitivity: ctx.sensitivity_or_default(sensitivity_b.map(f64::from)),
            };
            let path = bundle_path(
                &results_dir,
                &format!(
                    "{}-{:02}_vs_{}-{:02}",
                    file_stem(&series_a.subject),
                    month_a,
                    file_stem(&series_b.subject),
                    month_b
                ),
                gzip,
            );
            let cancel = cancel_on_ctrl_c();

            let bundle = tokio::task::spawn_blocking(move || {
                compare_sequence(
                    &ctx,
                    &series_a,
                    &series_b,
                    zoom,
                    &LogProgress::new("compare"),
                    &cancel,
                )
            })
            .await?
            .context("comparing series")?;

            write_json(&path, &bundle, gzip)?;
            info!(days = bundle.days.len(), path = %path.display(), "Comparison finished");
        }
        Commands::Detect {
            province,
            month,
            day,
        } => {
            let geometry = ctx.load_geometry()?;
            let trips = ctx.load_trips(&province, month)?;
            let aggregate = aggregate_day(&trips, day, &ctx.aliases)?;
            let detection = detect_province_field(&geometry, &aggregate.keys(), &ctx.aliases)?;

            info!(
                field = %detection.field,
                score = detection.score,
                keys = aggregate.totals.len(),
                features = geometry.len(),
                "Join field detected"
            );
            print_json(&detection)?;
        }
    }

    Ok(())
}

/// Builds one day's map, writes it as GeoJSON and logs a summary row.
#[tracing::instrument(skip(ctx, results_dir, args), fields(province = %args.province, day = args.day))]
fn run_day(ctx: &MapContext, results_dir: &Path, kind: MapKind, args: DayArgs) -> Result<()> {
    let request = MapRequest {
        kind,
        subject: args.province,
        day: args.day,
        month: args.month,
        sensitivity: ctx.sensitivity_or_default(args.sensitivity.map(f64::from)),
        zoom: args.zoom,
    };

    let (geometry, map) = ctx.day_map(&request)?;

    let suffix = match kind {
        MapKind::Trips => "",
        MapKind::Relative => "-relativo",
    };
    let path = results_dir.join(format!(
        "{}-{:02}-{:02}{}.geojson",
        file_stem(&request.subject),
        request.month,
        request.day,
        suffix
    ));
    write_geojson(&path, &geometry, &map)
        .with_context(|| format!("writing {}", path.display()))?;

    if map.highlighted().is_none() {
        warn!(subject = %request.subject, "Subject province not found in the geometry");
    }
    record(ctx, &map)
}

fn record(ctx: &MapContext, map: &ColoredMap) -> Result<()> {
    let summary = MapSummary::from_map(map);
    print_pretty(&summary);
    let path = ctx.config.paths.results_dir.join("summary.csv");
    append_summary(&path, &summary).with_context(|| format!("appending to {}", path.display()))?;
    Ok(())
}

/// Cancels the returned token on the first Ctrl+C.
fn cancel_on_ctrl_c() -> CancelToken {
    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current day");
            trigger.cancel();
        }
    });
    cancel
}

fn file_stem(province: &str) -> String {
    normalize_name(Some(province)).replace([' ', '/'], "_")
}

fn bundle_path(dir: &Path, stem: &str, gzip: bool) -> PathBuf {
    if gzip {
        dir.join(format!("{stem}.json.gz"))
    } else {
        dir.join(format!("{stem}.json"))
    }
}
