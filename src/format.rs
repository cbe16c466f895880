//! # Interval Formatting
//!
//! Turns computed windows into records for presentation layers: instants in
//! the caller's timezone as RFC 3339 strings with second precision (e.g.
//! `2024-08-01T07:18:37-07:00`), durations in seconds and hours, heights rounded
//! to the centimeter.
//!
//! Formatting is separate from computation. An unknown timezone fails here and
//! leaves already computed windows untouched; a caller can always fall back to
//! [`Formatter::utc`].

use crate::aggregate::BandWindows;
use crate::error::{Result, TideError};
use crate::intersect::{PeakKind, TideWindowInterval};
use crate::CurvePoint;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use chrono_tz::Tz;
use serde::Serialize;

/// Parse an IANA timezone identifier such as `America/Vancouver`.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| TideError::UnknownTimezone(name.to_string()))
}

/// Round to two decimals, the precision used for every reported height and hour count.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A window ready for JSON output.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FormattedWindow {
    pub band: String,
    pub start: String,
    pub end: String,
    pub duration_seconds: i64,
    pub hours: f64,
    pub start_height_m: f64,
    pub end_height_m: f64,
    pub min_height_m: f64,
    pub max_height_m: f64,
    pub peak_kind: PeakKind,
    pub truncated_start: bool,
    pub truncated_end: bool,
}

/// All formatted windows of one band.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FormattedBand {
    pub band: String,
    pub windows: Vec<FormattedWindow>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FormattedPoint {
    pub time: String,
    pub height_m: f64,
}

/// Converts UTC results into one target timezone.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Formatter {
    tz: Tz,
}

impl Formatter {
    pub fn new(tz_name: &str) -> Result<Self> {
        Ok(Self::with_timezone(parse_timezone(tz_name)?))
    }

    pub fn with_timezone(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn utc() -> Self {
        Self { tz: Tz::UTC }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn local_time(&self, time: DateTime<Utc>) -> String {
        time.with_timezone(&self.tz)
            .to_rfc3339_opts(SecondsFormat::Secs, false)
    }

    pub fn local_date(&self, time: DateTime<Utc>) -> NaiveDate {
        time.with_timezone(&self.tz).date_naive()
    }

    pub fn window(&self, window: &TideWindowInterval) -> FormattedWindow {
        let duration = window.duration();
        FormattedWindow {
            band: window.band.label(),
            start: self.local_time(window.start),
            end: self.local_time(window.end),
            duration_seconds: duration.num_seconds(),
            hours: round2(duration.num_seconds() as f64 / 3600.0),
            start_height_m: round2(window.start_height),
            end_height_m: round2(window.end_height),
            min_height_m: round2(window.min_height),
            max_height_m: round2(window.max_height),
            peak_kind: window.peak_kind,
            truncated_start: window.truncated_start,
            truncated_end: window.truncated_end,
        }
    }

    pub fn bands(&self, sets: &[BandWindows]) -> Vec<FormattedBand> {
        sets.iter()
            .map(|set| FormattedBand {
                band: set.band.label(),
                windows: set.intervals.iter().map(|w| self.window(w)).collect(),
            })
            .collect()
    }

    pub fn points(&self, points: &[CurvePoint]) -> Vec<FormattedPoint> {
        points
            .iter()
            .map(|p| FormattedPoint {
                time: self.local_time(p.time),
                height_m: round2(p.height),
            })
            .collect()
    }
}
