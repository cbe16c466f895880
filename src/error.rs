//! # Engine Errors
//!
//! Every failure the windowing engine can report. They are all deterministic:
//! the same input fails the same way every time, so nothing here is ever
//! retried. Data-provider failures (network, files) live in
//! [`crate::provider::ProviderError`] instead, keeping the engine free of I/O.

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

/// Errors raised while building a series, windowing it, or formatting results.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TideError {
    /// Fewer than two extrema: no curve segment can be reconstructed
    #[error("need at least 2 extrema to build a tide curve, got {count}")]
    InsufficientData { count: usize },

    /// Upstream extrema break the ordering or high/low alternation rules
    #[error("malformed extremum series at index {index}: {reason}")]
    MalformedSeries { index: usize, reason: String },

    /// A requested band has `low > high` or a NaN bound
    #[error("invalid height band [{low}, {high}]")]
    InvalidBand { low: f64, high: f64 },

    /// A band argument could not be parsed at all
    #[error("cannot parse height band {0:?}, expected HIGH or LOW:HIGH")]
    BandSyntax(String),

    /// Timezone identifier not found in the IANA database
    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),

    /// Requested date range is empty or inverted
    #[error("range end {end} must be after range start {start}")]
    InvalidRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// Local midnight does not exist in the station timezone (DST gap)
    #[error("local time {0} does not exist in the requested timezone")]
    NonexistentLocalTime(NaiveDateTime),

    /// Point lookup outside the span covered by the extrema
    #[error("{time} is outside the series span [{start}, {end}]")]
    OutOfRange {
        time: DateTime<Utc>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

pub type Result<T> = std::result::Result<T, TideError>;
