//! # Tide Curve Reconstruction
//!
//! Rebuilds a continuous water level between consecutive extrema using a
//! half-cosine profile:
//!
//! ```text
//! f(t) = h0 + (h1 - h0) * (1 - cos(π·(t - t0)/(t1 - t0))) / 2
//! ```
//!
//! The profile has zero slope at both extrema, matching the slack water at high
//! and low tide, and is strictly monotonic in between whenever `h0 != h1`. That
//! makes it one-to-one on every segment and analytically invertible:
//!
//! ```text
//! t = t0 + (t1 - t0) * acos(1 - 2p) / π,   p = (y - h0)/(h1 - h0)
//! ```
//!
//! Instants are resolved to the nanosecond; the inverse is exact at both
//! segment endpoints, and the curve returns the extremum heights exactly there.

use crate::error::{Result, TideError};
use crate::series::ExtremumSeries;
use crate::{CurvePoint, Extremum, ExtremumKind};
use chrono::{DateTime, Duration, Utc};
use std::f64::consts::PI;

/// How a computed crossing is snapped to a whole nanosecond.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rounding {
    Nearest,
    /// Never before the exact crossing
    Later,
    /// Never after the exact crossing
    Earlier,
}

/// Nanoseconds in `duration` as a float; saturates far beyond any tidal span.
fn nanos(duration: Duration) -> f64 {
    duration
        .num_nanoseconds()
        .map_or(duration.num_milliseconds() as f64 * 1e6, |n| n as f64)
}

/// The curve between two consecutive extrema.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub start: Extremum,
    pub end: Extremum,
}

impl Segment {
    pub fn new(start: Extremum, end: Extremum) -> Self {
        Self { start, end }
    }

    /// True when the segment runs from a low up to a high.
    pub fn is_rising(&self) -> bool {
        self.start.kind == ExtremumKind::Low
    }

    /// `(min, max)` height reached on the segment.
    pub fn height_range(&self) -> (f64, f64) {
        let (a, b) = (self.start.height, self.end.height);
        (a.min(b), a.max(b))
    }

    fn span_ns(&self) -> f64 {
        nanos(self.end.time - self.start.time)
    }

    /// Height at `time`, which is clamped into the segment.
    pub fn height_at(&self, time: DateTime<Utc>) -> f64 {
        let progress = nanos(time - self.start.time) / self.span_ns();
        if progress <= 0.0 {
            return self.start.height;
        }
        if progress >= 1.0 {
            return self.end.height;
        }
        let (h0, h1) = (self.start.height, self.end.height);
        h0 + (h1 - h0) * (1.0 - (PI * progress).cos()) / 2.0
    }

    /// Instant at which the segment reaches `height`, if it ever does.
    ///
    /// A flat segment only answers for its own height, and then with its start.
    pub fn time_at(&self, height: f64) -> Option<DateTime<Utc>> {
        self.time_at_rounded(height, Rounding::Nearest)
    }

    /// Like [`Segment::time_at`], snapping the crossing in the given direction.
    pub fn time_at_rounded(&self, height: f64, rounding: Rounding) -> Option<DateTime<Utc>> {
        let (h0, h1) = (self.start.height, self.end.height);
        if height == h0 {
            return Some(self.start.time);
        }
        if height == h1 {
            return Some(self.end.time);
        }
        if h0 == h1 {
            return None;
        }

        let p = (height - h0) / (h1 - h0);
        if !(0.0..=1.0).contains(&p) {
            return None;
        }

        let progress = (1.0 - 2.0 * p).clamp(-1.0, 1.0).acos() / PI;
        let offset = progress * self.span_ns();
        let offset = match rounding {
            Rounding::Nearest => offset.round(),
            Rounding::Later => offset.ceil(),
            Rounding::Earlier => offset.floor(),
        };
        let time = self.start.time + Duration::nanoseconds(offset as i64);
        Some(time.clamp(self.start.time, self.end.time))
    }
}

/// Piecewise half-cosine curve over a whole [`ExtremumSeries`].
#[derive(Clone, Copy, Debug)]
pub struct Curve<'a> {
    series: &'a ExtremumSeries,
}

impl<'a> Curve<'a> {
    pub fn new(series: &'a ExtremumSeries) -> Self {
        Self { series }
    }

    pub fn series(&self) -> &'a ExtremumSeries {
        self.series
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.series.start()
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.series.end()
    }

    /// Segments in time order.
    pub fn segments(&self) -> impl Iterator<Item = Segment> + 'a {
        self.series
            .extrema()
            .windows(2)
            .map(|pair| Segment::new(pair[0], pair[1]))
    }

    /// The segment covering `time`. Shared boundaries resolve to the later segment,
    /// except at the very end of the series.
    pub fn segment_at(&self, time: DateTime<Utc>) -> Option<Segment> {
        if time < self.start() || time > self.end() {
            return None;
        }
        let extrema = self.series.extrema();
        let next = extrema
            .partition_point(|e| e.time <= time)
            .min(extrema.len() - 1);
        Some(Segment::new(extrema[next - 1], extrema[next]))
    }

    /// Height anywhere inside the series span.
    pub fn height_at(&self, time: DateTime<Utc>) -> Result<f64> {
        self.segment_at(time)
            .map(|segment| segment.height_at(time))
            .ok_or(TideError::OutOfRange {
                time,
                start: self.start(),
                end: self.end(),
            })
    }

    /// Sample the curve: every extremum, plus a point every `step` from the
    /// series start when a positive step is given.
    ///
    /// Points come back in time order with no duplicate instants, which is what
    /// both raw-data consumers and plot overlays expect.
    pub fn sample(&self, step: Option<Duration>) -> Vec<CurvePoint> {
        let mut points: Vec<CurvePoint> = self
            .series
            .extrema()
            .iter()
            .map(|e| CurvePoint {
                time: e.time,
                height: e.height,
            })
            .collect();

        if let Some(step) = step.filter(|s| *s > Duration::zero()) {
            let mut segments = self.segments().peekable();
            let mut time = self.start() + step;
            while time < self.end() {
                while segments.next_if(|s| s.end.time < time).is_some() {}
                if let Some(segment) = segments.peek() {
                    points.push(CurvePoint {
                        time,
                        height: segment.height_at(time),
                    });
                }
                time += step;
            }
        }

        points.sort_by_key(|p| p.time);
        points.dedup_by_key(|p| p.time);
        points
    }
}
