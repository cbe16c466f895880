//! # Band Intersection
//!
//! Finds every maximal stretch of the reconstructed curve whose height stays
//! inside one [`HeightBand`].
//!
//! ## Algorithm
//! Segments are walked in time order. Each segment is monotonic, so its overlap
//! with the band is a single sub-interval bounded by the two instants where the
//! curve reaches the clipped band edges. Those instants come straight from the
//! closed-form inverse in [`Segment::time_at`].
//!
//! Pieces from neighbouring segments that touch at a shared extremum are merged:
//! a "below 1.5 m" window usually spans the falling segment into a low tide and
//! the rising segment out of it.
//!
//! ## Edges
//! A window touching the first or last extremum may really continue beyond the
//! available data. It is kept and flagged with `truncated_start` /
//! `truncated_end` instead of being dropped.

use crate::curve::{Curve, Rounding, Segment};
use crate::HeightBand;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Direction the tide was moving while inside the window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeakKind {
    /// Entirely on a rising (flood) segment
    Rising,
    /// Entirely on a falling (ebb) segment
    Falling,
    /// Straddles at least one high or low water
    Mixed,
}

/// One contiguous window during which the tide stays inside `band`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TideWindowInterval {
    pub band: HeightBand,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub start_height: f64,
    pub end_height: f64,
    pub min_height: f64,
    pub max_height: f64,
    pub peak_kind: PeakKind,
    /// The window may have begun before the available data
    pub truncated_start: bool,
    /// The window may continue after the available data
    pub truncated_end: bool,
}

impl TideWindowInterval {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        self.start <= time && time <= self.end
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated_start || self.truncated_end
    }
}

/// All windows where `curve` stays inside `band`, in time order.
///
/// The band is assumed valid; [`crate::aggregate`] checks bands before calling in.
pub fn intersect(curve: &Curve<'_>, band: HeightBand) -> Vec<TideWindowInterval> {
    let mut spans: Vec<(DateTime<Utc>, DateTime<Utc>)> = Vec::new();

    for segment in curve.segments() {
        let Some((start, end)) = clip_segment(&segment, band) else {
            continue;
        };
        match spans.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => spans.push((start, end)),
        }
    }

    spans
        .into_iter()
        .map(|(start, end)| {
            describe(
                curve,
                band,
                start,
                end,
                start == curve.start(),
                end == curve.end(),
            )
        })
        .collect()
}

/// Furthest a rounded crossing is moved to land inside the band.
const MAX_SETTLE_NS: i64 = 1_000_000;

/// The part of one segment inside `band`, or `None` when it is empty or a
/// single instant.
///
/// The entry crossing is rounded up and the exit crossing down, so both ends
/// sit on the band side of the exact crossing.
fn clip_segment(segment: &Segment, band: HeightBand) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let (min, max) = segment.height_range();
    if max < band.low || min > band.high {
        return None;
    }

    if min == max {
        return Some((segment.start.time, segment.end.time));
    }

    let (low, high) = (band.low.max(min), band.high.min(max));
    let (entry, exit) = if segment.is_rising() {
        (low, high)
    } else {
        (high, low)
    };
    let start = segment.time_at_rounded(entry, Rounding::Later)?;
    let end = segment.time_at_rounded(exit, Rounding::Earlier)?;
    if start >= end {
        return None;
    }

    let start = settle(segment, band, start, end);
    let end = settle(segment, band, end, start);
    (start < end).then_some((start, end))
}

/// Step `time` towards `limit` until the curve at `time` is inside `band`.
///
/// Near slack water the curve moves less than one ulp per nanosecond, so float
/// noise in the inverse can leave a rounded crossing just outside the band.
/// Steps double, keeping the correction within a factor of two of the noise.
fn settle(
    segment: &Segment,
    band: HeightBand,
    mut time: DateTime<Utc>,
    limit: DateTime<Utc>,
) -> DateTime<Utc> {
    let forward = limit > time;
    let mut step = 1;
    while time != limit && !band.contains(segment.height_at(time)) && step <= MAX_SETTLE_NS {
        let delta = Duration::nanoseconds(step);
        time = if forward {
            (time + delta).min(limit)
        } else {
            (time - delta).max(limit)
        };
        step *= 2;
    }
    time
}

/// Build the full interval record for `[start, end]` on `curve`.
///
/// Heights at the endpoints are read back from the curve; min/max also account
/// for any extremum strictly inside the window, which is also what decides
/// whether the window is [`PeakKind::Mixed`].
pub(crate) fn describe(
    curve: &Curve<'_>,
    band: HeightBand,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    truncated_start: bool,
    truncated_end: bool,
) -> TideWindowInterval {
    let height = |t| curve.height_at(t).unwrap_or(f64::NAN);
    let start_height = height(start);
    let end_height = height(end);

    let extrema = curve.series().extrema();
    let first_inside = extrema.partition_point(|e| e.time <= start);
    let past_inside = extrema.partition_point(|e| e.time < end);
    let inside = &extrema[first_inside..past_inside.max(first_inside)];

    let (min_height, max_height) = inside.iter().fold(
        (start_height.min(end_height), start_height.max(end_height)),
        |(lo, hi), e| (lo.min(e.height), hi.max(e.height)),
    );

    let peak_kind = if !inside.is_empty() {
        PeakKind::Mixed
    } else {
        let midpoint = start + (end - start) / 2;
        match curve.segment_at(midpoint) {
            Some(segment) if segment.is_rising() => PeakKind::Rising,
            _ => PeakKind::Falling,
        }
    };

    TideWindowInterval {
        band,
        start,
        end,
        start_height,
        end_height,
        min_height,
        max_height,
        peak_kind,
        truncated_start,
        truncated_end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::ExtremumSeries;
    use crate::RawExtremum;
    use chrono::TimeZone;

    fn at_hours(hours: f64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap()
            + Duration::milliseconds((hours * 3_600_000.0) as i64)
    }

    fn build(points: &[(f64, f64)]) -> ExtremumSeries {
        let raw: Vec<_> = points
            .iter()
            .map(|&(h, height)| RawExtremum::new(at_hours(h), height))
            .collect();
        ExtremumSeries::new("test", &raw).unwrap()
    }

    fn low_high_low() -> ExtremumSeries {
        build(&[(0.0, 0.5), (6.0, 2.5), (12.0, 0.3)])
    }

    fn band(low: f64, high: f64) -> HeightBand {
        HeightBand::new(low, high).unwrap()
    }

    #[test]
    fn test_band_crossed_on_both_segments() {
        let series = low_high_low();
        let windows = intersect(&Curve::new(&series), band(1.5, 2.0));

        assert_eq!(windows.len(), 2);

        let rising = &windows[0];
        assert_eq!(rising.peak_kind, PeakKind::Rising);
        assert!(rising.start > at_hours(0.0) && rising.end < at_hours(6.0));
        assert!((rising.start - at_hours(3.0)).num_milliseconds().abs() <= 1);
        assert!((rising.end - at_hours(4.0)).num_milliseconds().abs() <= 1);
        assert!(!rising.is_truncated());

        let falling = &windows[1];
        assert_eq!(falling.peak_kind, PeakKind::Falling);
        assert!(falling.start > at_hours(6.0) && falling.end < at_hours(12.0));
        assert!((falling.start_height - 2.0).abs() < 1e-6);
        assert!((falling.end_height - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_band_covering_everything() {
        let series = low_high_low();
        let windows = intersect(&Curve::new(&series), band(0.0, 3.0));

        assert_eq!(windows.len(), 1);
        let window = &windows[0];
        assert_eq!(window.start, at_hours(0.0));
        assert_eq!(window.end, at_hours(12.0));
        assert_eq!(window.peak_kind, PeakKind::Mixed);
        assert!(window.truncated_start && window.truncated_end);
        assert_eq!(window.min_height, 0.3);
        assert_eq!(window.max_height, 2.5);
    }

    #[test]
    fn test_unreachable_band() {
        let series = low_high_low();
        assert!(intersect(&Curve::new(&series), band(10.0, 11.0)).is_empty());
    }

    #[test]
    fn test_low_band_merges_across_trough() {
        let series = build(&[(0.0, 3.0), (6.0, 0.2), (12.0, 3.2)]);
        let windows = intersect(&Curve::new(&series), HeightBand::below(1.0));

        assert_eq!(windows.len(), 1);
        let window = &windows[0];
        assert!(window.start > at_hours(0.0) && window.start < at_hours(6.0));
        assert!(window.end > at_hours(6.0) && window.end < at_hours(12.0));
        assert_eq!(window.peak_kind, PeakKind::Mixed);
        assert_eq!(window.min_height, 0.2);
        assert!(!window.is_truncated());
    }

    #[test]
    fn test_band_touching_a_single_extremum_is_dropped() {
        let series = low_high_low();
        assert!(intersect(&Curve::new(&series), band(2.5, 3.0)).is_empty());
    }

    #[test]
    fn test_window_ending_at_series_edge_is_truncated() {
        let series = low_high_low();
        let windows = intersect(&Curve::new(&series), band(0.0, 1.0));

        assert_eq!(windows.len(), 2);
        assert!(windows[0].truncated_start && !windows[0].truncated_end);
        assert_eq!(windows[0].start, at_hours(0.0));
        assert!(!windows[1].truncated_start && windows[1].truncated_end);
        assert_eq!(windows[1].end, at_hours(12.0));
    }

    #[test]
    fn test_window_starting_at_extremum_is_single_direction() {
        let series = low_high_low();
        let windows = intersect(&Curve::new(&series), band(2.0, 2.5));

        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].peak_kind, PeakKind::Mixed);
        assert_eq!(windows[0].max_height, 2.5);

        let windows = intersect(&Curve::new(&series), band(0.3, 1.0));
        let last = windows.last().unwrap();
        assert_eq!(last.peak_kind, PeakKind::Falling);
        assert_eq!(last.end, at_hours(12.0));
    }

    #[test]
    fn test_flat_segment_inside_band() {
        let series = build(&[(0.0, 0.5), (6.0, 1.0)]);
        let raw = vec![
            RawExtremum::with_kind(at_hours(0.0), 1.0, crate::ExtremumKind::Low),
            RawExtremum::with_kind(at_hours(6.0), 1.0, crate::ExtremumKind::High),
        ];
        let flat = ExtremumSeries::new("flat", &raw).unwrap();

        let windows = intersect(&Curve::new(&flat), band(0.5, 1.5));
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].duration(), Duration::hours(6));

        assert_eq!(intersect(&Curve::new(&series), band(1.0, 1.5)).len(), 0);
    }

    #[test]
    fn test_edges_are_inside_band_to_the_nanosecond() {
        let series = low_high_low();
        let curve = Curve::new(&series);
        let one_ns = Duration::nanoseconds(1);

        for i in 0..200 {
            let low = -0.2 + i as f64 * 0.015;
            let band = band(low, low + 0.3);
            for window in intersect(&curve, band) {
                for t in [
                    window.start,
                    window.start + one_ns,
                    window.end - one_ns,
                    window.end,
                ] {
                    let h = curve.height_at(t).unwrap();
                    assert!(band.contains(h), "{h} outside {band} at {t}");
                }
                assert!(band.contains(window.start_height));
                assert!(band.contains(window.end_height));
                assert!(band.contains(window.min_height) && band.contains(window.max_height));
            }
        }
    }

    #[test]
    fn test_band_just_above_first_low_is_not_truncated() {
        let series = low_high_low();
        let curve = Curve::new(&series);
        let band = band(0.5 + 1e-9, 1.0);

        let windows = intersect(&curve, band);
        let first = &windows[0];
        assert!(first.start > at_hours(0.0));
        assert!(!first.truncated_start);
        assert!(band.contains(first.start_height));
    }

    #[test]
    fn test_window_at_series_end_reports_exact_height() {
        let series = low_high_low();
        let windows = intersect(&Curve::new(&series), band(0.3, 1.0));
        let last = windows.last().unwrap();

        assert_eq!(last.end, at_hours(12.0));
        assert_eq!(last.end_height, 0.3);
        assert_eq!(last.min_height, 0.3);
    }

    #[test]
    fn test_containment_and_boundary_exclusion() {
        let series = build(&[
            (0.0, 0.4),
            (6.2, 3.1),
            (12.5, 0.9),
            (18.6, 2.7),
            (24.9, 0.2),
        ]);
        let curve = Curve::new(&series);
        let band = band(1.2, 2.2);
        let windows = intersect(&curve, band);
        assert!(!windows.is_empty());

        for window in &windows {
            let span = (window.end - window.start).num_milliseconds();
            for i in 1..=100 {
                let t = window.start + Duration::milliseconds(span * i / 101);
                let h = curve.height_at(t).unwrap();
                assert!(band.contains(h), "{h} outside {band} at {t}");
            }

            let before = window.start - Duration::seconds(60);
            if !window.truncated_start {
                assert!(!band.contains(curve.height_at(before).unwrap()));
            }
            let after = window.end + Duration::seconds(60);
            if !window.truncated_end {
                assert!(!band.contains(curve.height_at(after).unwrap()));
            }
        }
    }
}
