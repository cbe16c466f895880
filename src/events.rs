//! Low-tide event sheet.
//!
//! One row per low water with the windows that contain it, one per band. This
//! is the shape tide-pool and beach-walk planners read: "low of 0.77 m at
//! 05:49, under 1.5 m from 04:12 to 07:30".

use crate::aggregate::BandWindows;
use crate::format::{round2, Formatter};
use crate::range::DateRange;
use crate::series::ExtremumSeries;
use chrono::NaiveDate;
use serde::Serialize;

/// The window (if any) of one band around a low tide.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EventWindow {
    pub band: String,
    pub start: Option<String>,
    pub end: Option<String>,
    pub hours: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LowTideEvent {
    pub low_tide_date: NaiveDate,
    pub low_tide_height_m: f64,
    pub low_tide_time: String,
    pub windows: Vec<EventWindow>,
}

/// Build the event sheet for every low inside `range` (or the whole series).
///
/// The local date comes from `formatter`, so a low just after local midnight
/// lands on the day a reader expects.
pub fn low_tide_events(
    series: &ExtremumSeries,
    sets: &[BandWindows],
    formatter: &Formatter,
    range: Option<&DateRange>,
) -> Vec<LowTideEvent> {
    series
        .lows()
        .filter(|low| range.map_or(true, |r| r.contains(low.time)))
        .map(|low| {
            let windows = sets
                .iter()
                .map(|set| {
                    let window = set.window_at(low.time);
                    EventWindow {
                        band: set.band.label(),
                        start: window.map(|w| formatter.local_time(w.start)),
                        end: window.map(|w| formatter.local_time(w.end)),
                        hours: window.map(|w| round2(w.duration().num_seconds() as f64 / 3600.0)),
                    }
                })
                .collect();

            LowTideEvent {
                low_tide_date: formatter.local_date(low.time),
                low_tide_height_m: round2(low.height),
                low_tide_time: formatter.local_time(low.time),
                windows,
            }
        })
        .collect()
}
