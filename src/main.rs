//! # Tide Window Application Entry Point
//!
//! Command-line front end for the tide window engine. It loads the station
//! configuration, fetches extrema through the configured provider, and prints
//! the requested windows (or raw curve points, or a low-tide event sheet) as
//! JSON on stdout. Diagnostics go to stderr through `env_logger`.
//!
//! ```text
//! tide-window --start 2024-08-01 --end 2024-08-03 --window 1.5 --window 1.5:2.0
//! tide-window --start 2024-08-01 --events
//! tide-window --start 2024-08-01 --raw --sample-minutes 15
//! ```


use anyhow::Context;
use chrono::{Duration, NaiveDate, Utc};
use clap::Parser;
use serde_json::json;
use std::path::PathBuf;
use tide_window_lib::config::{Config, SourceConfig};
use tide_window_lib::events::low_tide_events;
use tide_window_lib::format::FormattedPoint;
use tide_window_lib::provider::{ChsProvider, ExtremaProvider, JsonFileProvider};
use tide_window_lib::{
    aggregate, BandWindows, Curve, CurvePoint, DateRange, Extremum, ExtremumSeries, Formatter,
    HeightBand, RawExtremum, WindowReport, WindowRequest,
};

/// Find when the tide sits inside a height band.
#[derive(Debug, Parser)]
#[command(name = "tide-window", version, about)]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = "tide-config.toml")]
    config: PathBuf,

    /// Station id, overriding the configured one
    #[arg(long)]
    station: Option<String>,

    /// First local date (YYYY-MM-DD); defaults to today in the station timezone
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Local date after the last one reported; defaults to the day after start
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Height band as LOW:HIGH or HIGH (meaning "below HIGH"); repeatable
    #[arg(long = "window", value_name = "BAND")]
    windows: Vec<HeightBand>,

    /// Output timezone, overriding the station timezone
    #[arg(long)]
    tz: Option<String>,

    /// Print curve points instead of windows
    #[arg(long, conflicts_with = "events")]
    raw: bool,

    /// Print one row per low tide with its windows
    #[arg(long)]
    events: bool,

    /// Raw-mode sample spacing in minutes
    #[arg(long)]
    sample_minutes: Option<u32>,

    /// Read extrema from this JSON file instead of the configured source
    #[arg(long, value_name = "FILE")]
    extrema: Option<PathBuf>,
}

/// High or low waters inside `range`, formatted like raw curve points.
fn listing<'a>(
    extrema: impl Iterator<Item = &'a Extremum>,
    range: &DateRange,
    formatter: &Formatter,
) -> Vec<FormattedPoint> {
    let points: Vec<CurvePoint> = extrema
        .filter(|e| range.contains(e.time))
        .map(|e| CurvePoint {
            time: e.time,
            height: e.height,
        })
        .collect();
    formatter.points(&points)
}

/// Shape a report into the JSON printed on stdout.
///
/// The event sheet lists every low water even when no bands were requested;
/// its rows then carry no windows.
fn render(
    series: &ExtremumSeries,
    report: &WindowReport,
    formatter: &Formatter,
    range: &DateRange,
    events: bool,
) -> serde_json::Value {
    let station = series.station_id();
    if events {
        let sets: &[BandWindows] = match report {
            WindowReport::Windows(sets) => sets,
            WindowReport::Raw(_) => &[],
        };
        return json!({
            "station": station,
            "events": low_tide_events(series, sets, formatter, Some(range)),
        });
    }

    match report {
        WindowReport::Raw(points) => json!({
            "station": station,
            "points": formatter.points(points),
        }),
        WindowReport::Windows(sets) => json!({
            "station": station,
            "bands": formatter.bands(sets),
            "highs": listing(series.highs(), range, formatter),
            "lows": listing(series.lows(), range, formatter),
        }),
    }
}

/// Fetch raw extrema through any provider.
async fn fetch<P: ExtremaProvider>(
    provider: &P,
    station_id: &str,
    range: &DateRange,
) -> anyhow::Result<Vec<RawExtremum>> {
    provider
        .extrema(station_id, range)
        .await
        .with_context(|| format!("fetching extrema for station {station_id}"))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = Config::load_from_path(&cli.config);
    let station_id = cli.station.clone().unwrap_or(config.station.id.clone());

    // Dates are always station-local; --tz only changes how results are printed
    let station_formatter = Formatter::new(&config.station.timezone)
        .context("invalid station timezone in configuration")?;
    let formatter = match &cli.tz {
        Some(tz) => Formatter::new(tz)?,
        None => station_formatter,
    };

    let start = cli
        .start
        .unwrap_or_else(|| station_formatter.local_date(Utc::now()));
    let end = match cli.end {
        Some(end) => end,
        None => start
            .checked_add_days(chrono::Days::new(1))
            .context("start date out of range")?,
    };
    let range = DateRange::from_local_dates(start, end, station_formatter.timezone())?;
    log::info!(
        "station {station_id}: {} to {}",
        formatter.local_time(range.start()),
        formatter.local_time(range.end())
    );

    // Create Tokio runtime for the provider's async fetch
    let rt = tokio::runtime::Runtime::new()?;
    let raw = rt.block_on(async {
        match (&cli.extrema, &config.source) {
            (Some(path), _) => fetch(&JsonFileProvider::new(path), &station_id, &range).await,
            (None, SourceConfig::File { path }) => {
                fetch(&JsonFileProvider::new(path), &station_id, &range).await
            }
            (None, SourceConfig::Chs { base_url }) => {
                fetch(&ChsProvider::new(base_url.as_str()), &station_id, &range).await
            }
        }
    })?;

    let series = ExtremumSeries::new(station_id.as_str(), &raw)
        .with_context(|| format!("station {station_id} returned unusable extrema"))?;

    let curve = Curve::new(&series);
    if let Ok(height) = curve.height_at(Utc::now()) {
        log::info!("current height at {}: {height:.2} m", config.station.name);
    }

    let bands = if cli.raw {
        Vec::new()
    } else if cli.windows.is_empty() {
        config.windows.bands.clone()
    } else {
        cli.windows.clone()
    };
    let mut request = WindowRequest::new(bands).with_range(range);
    if let Some(minutes) = cli.sample_minutes.or(config.windows.sample_minutes) {
        request = request.with_sample_step(Duration::minutes(i64::from(minutes)));
    }

    let report = aggregate(&series, &request)?;
    let output = render(&series, &report, &formatter, &range, cli.events);
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
