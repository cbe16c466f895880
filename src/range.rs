//! Requested time span for a windowing request.
//!
//! Callers usually think in station-local calendar days ("August 1st to 3rd in
//! Vancouver"), so a range is built from local dates and stored as a UTC span.

use crate::error::{Result, TideError};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Half-open UTC span `[start, end)`, never empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end <= start {
            return Err(TideError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// From local midnight on `start` to local midnight on `end`, in `tz`.
    pub fn from_local_dates(start: NaiveDate, end: NaiveDate, tz: Tz) -> Result<Self> {
        Self::new(local_midnight(start, tz)?, local_midnight(end, tz)?)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        self.start <= time && time < self.end
    }

    /// The same range widened by `margin` on both sides.
    pub fn widen(&self, margin: Duration) -> Self {
        Self {
            start: self.start - margin,
            end: self.end + margin,
        }
    }

    /// Split into consecutive pieces no longer than `max`.
    pub fn chunks(&self, max: Duration) -> Vec<DateRange> {
        if max <= Duration::zero() {
            return vec![*self];
        }
        let mut pieces = Vec::new();
        let mut cursor = self.start;
        while cursor < self.end {
            let next = (cursor + max).min(self.end);
            pieces.push(Self {
                start: cursor,
                end: next,
            });
            cursor = next;
        }
        pieces
    }
}

/// First instant of `date` in `tz`.
///
/// Where midnight falls in a DST gap the day starts at the first valid local
/// time, one hour later.
fn local_midnight(date: NaiveDate, tz: Tz) -> Result<DateTime<Utc>> {
    let midnight = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| {
            tz.from_local_datetime(&(midnight + Duration::hours(1)))
                .earliest()
        })
        .map(|local| local.with_timezone(&Utc))
        .ok_or(TideError::NonexistentLocalTime(midnight))
}
