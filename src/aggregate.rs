//! # Window Aggregation
//!
//! Runs the band intersector once per requested band and shapes the results
//! for the request: clipped to the requested date range, ordered by start, and
//! checked to be non-overlapping within each band.
//!
//! Bands never interact. Two overlapping bands produce two overlapping result
//! sets, each tagged with the band that produced it.
//!
//! With no bands at all the request is a raw-data request and the aggregator
//! returns sampled curve points instead of windows.

use crate::curve::Curve;
use crate::error::Result;
use crate::intersect::{describe, intersect, TideWindowInterval};
use crate::range::DateRange;
use crate::series::ExtremumSeries;
use crate::{CurvePoint, HeightBand};
use chrono::{DateTime, Duration, Utc};

/// What the caller wants computed from a series.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WindowRequest {
    /// Bands to window; empty selects raw mode
    pub bands: Vec<HeightBand>,
    /// Clip results to this span; `None` keeps the whole series
    pub range: Option<DateRange>,
    /// Extra sample density for raw mode, on top of the extrema
    pub sample_step: Option<Duration>,
}

impl WindowRequest {
    pub fn new(bands: Vec<HeightBand>) -> Self {
        Self {
            bands,
            ..Self::default()
        }
    }

    pub fn with_range(mut self, range: DateRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_sample_step(mut self, step: Duration) -> Self {
        self.sample_step = Some(step);
        self
    }
}

/// Windows found for one band, ordered by start.
#[derive(Clone, Debug, PartialEq)]
pub struct BandWindows {
    pub band: HeightBand,
    pub intervals: Vec<TideWindowInterval>,
}

impl BandWindows {
    /// The window covering `time`, if any.
    pub fn window_at(&self, time: DateTime<Utc>) -> Option<&TideWindowInterval> {
        let candidate = self.intervals.partition_point(|w| w.end < time);
        self.intervals.get(candidate).filter(|w| w.contains(time))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum WindowReport {
    /// One entry per requested band, in request order
    Windows(Vec<BandWindows>),
    /// Raw curve samples (no bands requested)
    Raw(Vec<CurvePoint>),
}

/// Compute windows (or raw samples) for `request` over `series`.
///
/// Every band is validated before any work is done, so a bad band never yields
/// partial results.
pub fn aggregate(series: &ExtremumSeries, request: &WindowRequest) -> Result<WindowReport> {
    for band in &request.bands {
        band.validate()?;
    }

    let curve = Curve::new(series);

    if request.bands.is_empty() {
        let mut points = curve.sample(request.sample_step);
        if let Some(range) = &request.range {
            points.retain(|p| range.contains(p.time));
        }
        log::debug!(
            "station {}: raw mode, {} curve points",
            series.station_id(),
            points.len()
        );
        return Ok(WindowReport::Raw(points));
    }

    let sets = request
        .bands
        .iter()
        .map(|&band| {
            let mut intervals = intersect(&curve, band);
            if let Some(range) = &request.range {
                intervals = intervals
                    .into_iter()
                    .filter_map(|window| clip(&curve, window, range))
                    .collect();
            }
            intervals.sort_by_key(|w| w.start);
            debug_assert!(
                intervals.windows(2).all(|w| w[0].end <= w[1].start),
                "overlapping windows for band {band}"
            );

            log::debug!(
                "station {}: band {} produced {} windows",
                series.station_id(),
                band,
                intervals.len()
            );
            BandWindows { band, intervals }
        })
        .collect();

    Ok(WindowReport::Windows(sets))
}

/// Restrict `window` to `range`. Clipped ends count as truncated, since the real
/// window carries on past the requested span.
fn clip(
    curve: &Curve<'_>,
    window: TideWindowInterval,
    range: &DateRange,
) -> Option<TideWindowInterval> {
    let start = window.start.max(range.start());
    let end = window.end.min(range.end());
    if start >= end {
        return None;
    }
    if start == window.start && end == window.end {
        return Some(window);
    }

    Some(describe(
        curve,
        window.band,
        start,
        end,
        window.truncated_start || start > window.start,
        window.truncated_end || end < window.end,
    ))
}
