//! # Tide Window Core Library
//!
//! This library reconstructs a continuous tide curve from a station's discrete
//! high/low extrema and finds the **tide windows**: the stretches of time during
//! which the water sits inside a caller-chosen height band (for example "between
//! 1.5 m and 2.0 m", or "below 1.5 m" for a low-tide walk).
//!
//! ## Design Philosophy
//!
//! ### Pure computation
//! - **No I/O in the engine**: extrema arrive through the [`provider`] module and
//!   everything downstream is plain arithmetic on owned values
//! - **No shared state**: every request builds its own [`ExtremumSeries`] and drops
//!   it when done, so concurrent requests never coordinate
//! - **Closed-form math**: the half-cosine curve is inverted analytically, so band
//!   crossings need no iterative root-finding
//!
//! ### Data Flow
//! 1. **Ingest**: raw `(time, height, kind?)` records → validated [`ExtremumSeries`]
//! 2. **Reconstruct**: consecutive extrema → half-cosine [`curve::Segment`]s
//! 3. **Intersect**: one pass per [`HeightBand`] → merged [`TideWindowInterval`]s
//! 4. **Aggregate**: clip to the requested [`range::DateRange`], order, check
//! 5. **Format**: UTC instants → station-local strings via [`format::Formatter`]
//!
//! ## Core Types
//!
//! - [`Extremum`]: a single high or low water event
//! - [`RawExtremum`]: an upstream record whose kind may still need inferring
//! - [`HeightBand`]: the height range a window must stay inside
//! - [`CurvePoint`]: one sampled point on the reconstructed curve

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod aggregate;
pub mod config;
pub mod curve;
pub mod error;
pub mod events;
pub mod format;
pub mod intersect;
pub mod provider;
pub mod range;
pub mod series;

pub use aggregate::{aggregate, BandWindows, WindowReport, WindowRequest};
pub use curve::{Curve, Segment};
pub use error::{Result, TideError};
pub use format::Formatter;
pub use intersect::{PeakKind, TideWindowInterval};
pub use range::DateRange;
pub use series::ExtremumSeries;

/// Whether an extremum is a high or a low water event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtremumKind {
    High,
    Low,
}

impl ExtremumKind {
    /// The kind that must follow this one in a well-formed series.
    pub fn opposite(self) -> Self {
        match self {
            ExtremumKind::High => ExtremumKind::Low,
            ExtremumKind::Low => ExtremumKind::High,
        }
    }
}

impl fmt::Display for ExtremumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtremumKind::High => f.write_str("high"),
            ExtremumKind::Low => f.write_str("low"),
        }
    }
}

/// A validated high or low water event.
///
/// Heights are in meters above chart datum, times are UTC.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Extremum {
    pub time: DateTime<Utc>,
    pub height: f64,
    pub kind: ExtremumKind,
}

/// An extremum as supplied by a data provider.
///
/// Some upstream feeds (CHS `wlp-hilo`, for instance) only publish the time and
/// height of each event; `kind` is then left empty and inferred from the
/// neighbouring heights when the [`ExtremumSeries`] is built.
///
/// # Example
/// ```
/// use tide_window_lib::{ExtremumKind, RawExtremum};
///
/// let json = r#"[
///     {"time": "2024-08-01T05:49:00Z", "height": 0.77, "kind": "low"},
///     {"time": "2024-08-01T12:02:00Z", "height": 4.1}
/// ]"#;
/// let raw: Vec<RawExtremum> = serde_json::from_str(json).unwrap();
///
/// assert_eq!(raw[0].kind, Some(ExtremumKind::Low));
/// assert_eq!(raw[1].kind, None);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawExtremum {
    pub time: DateTime<Utc>,
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ExtremumKind>,
}

impl RawExtremum {
    pub fn new(time: DateTime<Utc>, height: f64) -> Self {
        Self {
            time,
            height,
            kind: None,
        }
    }

    pub fn with_kind(time: DateTime<Utc>, height: f64, kind: ExtremumKind) -> Self {
        Self {
            time,
            height,
            kind: Some(kind),
        }
    }
}

/// Height range, in meters, that a tide window must stay inside.
///
/// `low` may be negative infinity, which is how a plain "below X meters"
/// window is expressed. Bands are never merged with each other: every band
/// requested produces its own result set.
///
/// Parses from `"LOW:HIGH"` or from a single `"HIGH"`:
/// ```
/// use tide_window_lib::HeightBand;
///
/// let band: HeightBand = "1.5:2.0".parse().unwrap();
/// assert_eq!(band, HeightBand { low: 1.5, high: 2.0 });
/// assert!(band.contains(1.75));
///
/// let below: HeightBand = "1.5".parse().unwrap();
/// assert!(below.contains(-3.0));
/// assert_eq!(below.label(), "1.5m");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeightBand {
    pub low: f64,
    pub high: f64,
}

impl HeightBand {
    /// Build a band, rejecting `low > high` and NaN bounds.
    pub fn new(low: f64, high: f64) -> Result<Self> {
        let band = Self { low, high };
        band.validate()?;
        Ok(band)
    }

    /// A band with no lower bound.
    pub fn below(high: f64) -> Self {
        Self {
            low: f64::NEG_INFINITY,
            high,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.low.is_nan() || self.high.is_nan() || self.low > self.high {
            return Err(TideError::InvalidBand {
                low: self.low,
                high: self.high,
            });
        }
        Ok(())
    }

    pub fn contains(&self, height: f64) -> bool {
        self.low <= height && height <= self.high
    }

    /// Short label used as a key in formatted output, e.g. `1.5m` or `1.5..2.0m`.
    pub fn label(&self) -> String {
        if self.low == f64::NEG_INFINITY {
            format!("{:?}m", self.high)
        } else {
            format!("{:?}..{:?}m", self.low, self.high)
        }
    }
}

impl fmt::Display for HeightBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.low, self.high)
    }
}

impl FromStr for HeightBand {
    type Err = TideError;

    fn from_str(s: &str) -> Result<Self> {
        let parse = |part: &str| {
            part.trim()
                .parse::<f64>()
                .map_err(|_| TideError::BandSyntax(s.to_string()))
        };

        match s.split_once(':') {
            Some((low, high)) => HeightBand::new(parse(low)?, parse(high)?),
            None => {
                let band = HeightBand::below(parse(s)?);
                band.validate()?;
                Ok(band)
            }
        }
    }
}

/// A point on the reconstructed tide curve.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub time: DateTime<Utc>,
    pub height: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_rejects_inverted_bounds() {
        let err = HeightBand::new(2.0, 1.5).unwrap_err();
        assert!(matches!(err, TideError::InvalidBand { .. }));
    }

    #[test]
    fn test_band_rejects_nan() {
        assert!(HeightBand::new(f64::NAN, 1.0).is_err());
        assert!(HeightBand::below(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_band_allows_single_height() {
        let band = HeightBand::new(1.0, 1.0).unwrap();
        assert!(band.contains(1.0));
        assert!(!band.contains(1.0001));
    }

    #[test]
    fn test_band_parse() {
        assert_eq!(
            "0.5 : 1.25".parse::<HeightBand>().unwrap(),
            HeightBand {
                low: 0.5,
                high: 1.25
            }
        );
        assert!(matches!(
            "abc".parse::<HeightBand>(),
            Err(TideError::BandSyntax(_))
        ));
        assert!(matches!(
            "3:1".parse::<HeightBand>(),
            Err(TideError::InvalidBand { .. })
        ));
    }

    #[test]
    fn test_band_labels() {
        assert_eq!(HeightBand::below(2.0).label(), "2.0m");
        assert_eq!(HeightBand::new(1.5, 2.0).unwrap().label(), "1.5..2.0m");
    }

    #[test]
    fn test_kind_opposite() {
        assert_eq!(ExtremumKind::High.opposite(), ExtremumKind::Low);
        assert_eq!(ExtremumKind::Low.opposite(), ExtremumKind::High);
    }
}
