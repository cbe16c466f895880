//! # Extremum Series
//!
//! Validated, time-ordered run of alternating high and low water events for one
//! station. This is the only entry point into the engine: once a series exists,
//! every later stage can rely on its invariants without rechecking them.
//!
//! ## Invariants
//! - at least two extrema
//! - finite heights
//! - strictly increasing timestamps
//! - kinds strictly alternate (high, low, high, ...)
//! - a high is never lower than the lows on either side of it
//!
//! Violations are upstream data-quality problems and are reported, never
//! repaired.

use crate::error::{Result, TideError};
use crate::{Extremum, ExtremumKind, RawExtremum};
use chrono::{DateTime, Utc};

/// Immutable, validated sequence of extrema for one station.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtremumSeries {
    station_id: String,
    extrema: Vec<Extremum>,
}

impl ExtremumSeries {
    /// Build a series from upstream records, inferring any missing kinds.
    ///
    /// A missing kind is inferred by comparing the point with its neighbours:
    /// higher than all of them makes it a high, lower than all of them a low.
    /// Anything else (a shoulder on a monotonic run, a plateau) is not an
    /// extremum and makes the series malformed.
    ///
    /// # Example
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use tide_window_lib::{ExtremumKind, ExtremumSeries, RawExtremum};
    ///
    /// let t0 = Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap();
    /// let raw = vec![
    ///     RawExtremum::new(t0, 0.5),
    ///     RawExtremum::new(t0 + chrono::Duration::hours(6), 2.5),
    ///     RawExtremum::new(t0 + chrono::Duration::hours(12), 0.3),
    /// ];
    /// let series = ExtremumSeries::new("7735", &raw).unwrap();
    ///
    /// assert_eq!(series.extrema()[1].kind, ExtremumKind::High);
    /// assert_eq!(series.lows().count(), 2);
    /// ```
    pub fn new(station_id: impl Into<String>, raw: &[RawExtremum]) -> Result<Self> {
        check_shape(raw, |p| (p.time, p.height))?;

        let extrema = raw
            .iter()
            .enumerate()
            .map(|(index, point)| {
                let kind = match point.kind {
                    Some(kind) => kind,
                    None => infer_kind(raw, index)?,
                };
                Ok(Extremum {
                    time: point.time,
                    height: point.height,
                    kind,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Self::from_extrema(station_id, extrema)
    }

    /// Build a series from extrema whose kinds are already known.
    pub fn from_extrema(station_id: impl Into<String>, extrema: Vec<Extremum>) -> Result<Self> {
        check_shape(&extrema, |e| (e.time, e.height))?;
        check_alternation(&extrema)?;

        let series = Self {
            station_id: station_id.into(),
            extrema,
        };
        log::debug!(
            "station {}: built series of {} extrema from {} to {}",
            series.station_id,
            series.len(),
            series.start(),
            series.end()
        );
        Ok(series)
    }

    pub fn station_id(&self) -> &str {
        &self.station_id
    }

    pub fn extrema(&self) -> &[Extremum] {
        &self.extrema
    }

    pub fn len(&self) -> usize {
        self.extrema.len()
    }

    /// Always false: a series holds at least two extrema.
    pub fn is_empty(&self) -> bool {
        self.extrema.is_empty()
    }

    /// Time of the first extremum; the curve is undefined before it.
    pub fn start(&self) -> DateTime<Utc> {
        self.extrema[0].time
    }

    /// Time of the last extremum; the curve is undefined after it.
    pub fn end(&self) -> DateTime<Utc> {
        self.extrema[self.extrema.len() - 1].time
    }

    pub fn highs(&self) -> impl Iterator<Item = &Extremum> {
        self.of_kind(ExtremumKind::High)
    }

    pub fn lows(&self) -> impl Iterator<Item = &Extremum> {
        self.of_kind(ExtremumKind::Low)
    }

    fn of_kind(&self, kind: ExtremumKind) -> impl Iterator<Item = &Extremum> {
        self.extrema.iter().filter(move |e| e.kind == kind)
    }
}

/// Count, finiteness and ordering checks shared by both constructors.
fn check_shape<T>(points: &[T], at: impl Fn(&T) -> (DateTime<Utc>, f64)) -> Result<()> {
    if points.len() < 2 {
        return Err(TideError::InsufficientData {
            count: points.len(),
        });
    }

    if let Some(index) = points.iter().position(|p| !at(p).1.is_finite()) {
        return Err(malformed(index, "height is not a finite number"));
    }

    if let Some(index) = points.windows(2).position(|w| at(&w[1]).0 <= at(&w[0]).0) {
        return Err(malformed(
            index + 1,
            format!(
                "timestamp {} does not follow {}",
                at(&points[index + 1]).0,
                at(&points[index]).0
            ),
        ));
    }

    Ok(())
}

fn check_alternation(extrema: &[Extremum]) -> Result<()> {
    for (offset, pair) in extrema.windows(2).enumerate() {
        let (prev, next) = (&pair[0], &pair[1]);
        let index = offset + 1;

        if next.kind != prev.kind.opposite() {
            return Err(malformed(
                index,
                format!("two consecutive {} extrema", next.kind),
            ));
        }

        let (high, low) = match prev.kind {
            ExtremumKind::High => (prev, next),
            ExtremumKind::Low => (next, prev),
        };
        if high.height < low.height {
            return Err(malformed(
                index,
                format!(
                    "high of {} m sits below adjacent low of {} m",
                    high.height, low.height
                ),
            ));
        }
    }
    Ok(())
}

fn infer_kind(raw: &[RawExtremum], index: usize) -> Result<ExtremumKind> {
    let height = raw[index].height;
    let neighbours = [
        index.checked_sub(1).map(|i| raw[i].height),
        raw.get(index + 1).map(|p| p.height),
    ];
    let neighbours = neighbours.iter().flatten();

    if neighbours.clone().all(|&h| h < height) {
        Ok(ExtremumKind::High)
    } else if neighbours.clone().all(|&h| h > height) {
        Ok(ExtremumKind::Low)
    } else {
        Err(malformed(
            index,
            "kind not supplied and the point is not a local extremum",
        ))
    }
}

fn malformed(index: usize, reason: impl Into<String>) -> TideError {
    TideError::MalformedSeries {
        index,
        reason: reason.into(),
    }
}
