//! # Extrema Data Providers
//!
//! The engine never fetches anything itself. Station extrema are handed to it by
//! an [`ExtremaProvider`], passed in explicitly per request, so tests can feed
//! synthetic extrema and the service layer can swap sources freely.
//!
//! ## Providers
//!
//! ### JSON file
//! A JSON array of `{ "time", "height", "kind"? }` records, typically a saved
//! copy of an upstream response. Handy offline and in tests.
//!
//! ### CHS IWLS
//! The Canadian Hydrographic Service water level API publishes predicted highs
//! and lows as the `wlp-hilo` time series:
//! ```text
//! GET {base}/stations/{id}/data?time-series-code=wlp-hilo&from=..Z&to=..Z
//! [{"eventDate": "2024-08-01T12:49:00Z", "value": 0.77, ...}, ...]
//! ```
//! - Requests are split into chunks of at most 30 days
//! - Kinds are not published and are inferred from neighbouring heights
//! - The span is widened by half a day each side so the curve covers the
//!   edges of the requested range
//!
//! ## Bracketing
//! Every provider returns the extrema inside the range **plus** the last one
//! before it and the first one after it. Without those, the curve would start
//! at the first in-range extremum and a window already open at the range start
//! would look shorter than it is.
//!
//! ## Error Handling
//! All failures surface as [`ProviderError`]; nothing is retried here.

use crate::range::DateRange;
use crate::RawExtremum;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::{fs, io, path::PathBuf};
use thiserror::Error;

/// Default CHS IWLS API root.
pub const CHS_BASE_URL: &str = "https://api.iwls-sine.azure.cloud-nuage.dfo-mpo.gc.ca/api/v1";

/// Longest span the CHS API will serve in one request.
const CHS_CHUNK_DAYS: i64 = 30;

/// Extra span fetched on each side of the range so it is bracketed by extrema.
/// Diurnal stations can go about 12.5 hours between a high and a low.
const EDGE_MARGIN_HOURS: i64 = 13;

/// Errors that can occur while obtaining extrema.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// HTTP request failed (network, TLS, or body decoding)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Extrema file could not be read
    #[error("extrema file IO: {0}")]
    Io(#[from] io::Error),

    /// Extrema file is not valid JSON of the expected shape
    #[error("extrema decode: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Source of raw extrema for a station.
///
/// Implementations return records in time order, bracketing `range` as
/// described in the module docs.
#[allow(async_fn_in_trait)]
pub trait ExtremaProvider {
    async fn extrema(
        &self,
        station_id: &str,
        range: &DateRange,
    ) -> Result<Vec<RawExtremum>, ProviderError>;
}

/// Keep the extrema inside `range` plus one neighbour on each side.
///
/// Input is sorted by time and exact duplicates (same instant) are dropped,
/// which happens where CHS chunks overlap.
pub fn bracket_range(mut extrema: Vec<RawExtremum>, range: &DateRange) -> Vec<RawExtremum> {
    extrema.sort_by_key(|e| e.time);
    extrema.dedup_by_key(|e| e.time);

    let first = extrema
        .partition_point(|e| e.time < range.start())
        .saturating_sub(1);
    let last = (extrema.partition_point(|e| e.time < range.end()) + 1).min(extrema.len());

    if first >= last {
        return Vec::new();
    }
    extrema.drain(first..last).collect()
}

/// Extrema read from a JSON file on disk.
#[derive(Clone, Debug)]
pub struct JsonFileProvider {
    path: PathBuf,
}

impl JsonFileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ExtremaProvider for JsonFileProvider {
    async fn extrema(
        &self,
        station_id: &str,
        range: &DateRange,
    ) -> Result<Vec<RawExtremum>, ProviderError> {
        let data = fs::read(&self.path)?;
        let all: Vec<RawExtremum> = serde_json::from_slice(&data)?;
        let total = all.len();
        let kept = bracket_range(all, range);

        log::info!(
            "station {station_id}: loaded {} of {total} extrema from {}",
            kept.len(),
            self.path.display()
        );
        Ok(kept)
    }
}

/// One record of a CHS `wlp-hilo` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChsEvent {
    event_date: DateTime<Utc>,
    value: f64,
}

impl From<ChsEvent> for RawExtremum {
    fn from(event: ChsEvent) -> Self {
        RawExtremum::new(event.event_date, event.value)
    }
}

/// Extrema from the CHS IWLS API.
#[derive(Clone, Debug)]
pub struct ChsProvider {
    client: reqwest::Client,
    base_url: String,
}

impl ChsProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn chunk_url(&self, station_id: &str, chunk: &DateRange) -> String {
        format!(
            "{}/stations/{}/data?time-series-code=wlp-hilo&from={}&to={}",
            self.base_url,
            station_id,
            chunk.start().format("%Y-%m-%dT%H:%M:%SZ"),
            chunk.end().format("%Y-%m-%dT%H:%M:%SZ"),
        )
    }
}

impl Default for ChsProvider {
    fn default() -> Self {
        Self::new(CHS_BASE_URL)
    }
}

impl ExtremaProvider for ChsProvider {
    async fn extrema(
        &self,
        station_id: &str,
        range: &DateRange,
    ) -> Result<Vec<RawExtremum>, ProviderError> {
        let span = range.widen(Duration::hours(EDGE_MARGIN_HOURS));
        let mut extrema = Vec::new();

        for chunk in span.chunks(Duration::days(CHS_CHUNK_DAYS)) {
            let url = self.chunk_url(station_id, &chunk);
            log::debug!("GET {url}");

            let response = self.client.get(&url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(ProviderError::Status {
                    status: status.as_u16(),
                    body: response.text().await.unwrap_or_default(),
                });
            }

            let events: Vec<ChsEvent> = response.json().await?;
            extrema.extend(events.into_iter().map(RawExtremum::from));
        }

        let kept = bracket_range(extrema, range);
        log::info!(
            "station {station_id}: fetched {} extrema from CHS",
            kept.len()
        );
        Ok(kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn at_hours(hours: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap() + Duration::hours(hours)
    }

    fn every_six_hours(count: i64) -> Vec<RawExtremum> {
        (0..count)
            .map(|i| RawExtremum::new(at_hours(i * 6), if i % 2 == 0 { 0.5 } else { 3.0 }))
            .collect()
    }

    #[test]
    fn test_bracket_keeps_one_neighbour_each_side() {
        let range = DateRange::new(at_hours(7), at_hours(20)).unwrap();
        let kept = bracket_range(every_six_hours(8), &range);

        let hours: Vec<i64> = kept
            .iter()
            .map(|e| (e.time - at_hours(0)).num_hours())
            .collect();
        assert_eq!(hours, vec![6, 12, 18, 24]);
    }

    #[test]
    fn test_bracket_sorts_and_dedups() {
        let mut extrema = every_six_hours(4);
        extrema.reverse();
        extrema.push(extrema[0]);

        let range = DateRange::new(at_hours(0), at_hours(18)).unwrap();
        let kept = bracket_range(extrema, &range);
        assert_eq!(kept.len(), 4);
        assert!(kept.windows(2).all(|w| w[0].time < w[1].time));
    }

    #[test]
    fn test_bracket_range_outside_data() {
        let range = DateRange::new(at_hours(100), at_hours(120)).unwrap();
        let kept = bracket_range(every_six_hours(4), &range);
        assert_eq!(kept.len(), 1);

        assert!(bracket_range(Vec::new(), &range).is_empty());
    }

    #[tokio::test]
    async fn test_json_file_provider() {
        let mut file = NamedTempFile::new().unwrap();
        let json = serde_json::to_vec(&every_six_hours(10)).unwrap();
        file.write_all(&json).unwrap();

        let provider = JsonFileProvider::new(file.path());
        let range = DateRange::new(at_hours(12), at_hours(24)).unwrap();
        let extrema = provider.extrema("7735", &range).await.unwrap();

        assert_eq!(extrema.len(), 4);
        assert_eq!(extrema[0].time, at_hours(6));
        assert_eq!(extrema[3].time, at_hours(24));
    }

    #[tokio::test]
    async fn test_json_file_provider_errors() {
        let range = DateRange::new(at_hours(0), at_hours(24)).unwrap();

        let missing = JsonFileProvider::new("/nonexistent/extrema.json");
        assert!(matches!(
            missing.extrema("7735", &range).await,
            Err(ProviderError::Io(_))
        ));

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{not json").unwrap();
        let corrupt = JsonFileProvider::new(file.path());
        assert!(matches!(
            corrupt.extrema("7735", &range).await,
            Err(ProviderError::Decode(_))
        ));
    }

    #[test]
    fn test_chs_response_parsing() {
        let body = r#"[
            {"eventDate": "2024-08-01T12:49:00Z", "value": 0.77, "qcFlagCode": "2", "timeSeriesId": "abc"},
            {"eventDate": "2024-08-01T19:02:00Z", "value": 4.12, "qcFlagCode": "2", "timeSeriesId": "abc"}
        ]"#;
        let events: Vec<ChsEvent> = serde_json::from_str(body).unwrap();
        let raw: Vec<RawExtremum> = events.into_iter().map(RawExtremum::from).collect();

        assert_eq!(raw.len(), 2);
        assert_eq!(raw[0].height, 0.77);
        assert_eq!(raw[0].kind, None);
        assert_eq!(
            raw[1].time,
            Utc.with_ymd_and_hms(2024, 8, 1, 19, 2, 0).unwrap()
        );
    }

    #[test]
    fn test_chs_chunk_url() {
        let provider = ChsProvider::new("https://example.test/api/v1/");
        let range = DateRange::new(at_hours(0), at_hours(24)).unwrap();
        assert_eq!(
            provider.chunk_url("5cebf1de3d0f4a073c4bbd1d", &range),
            "https://example.test/api/v1/stations/5cebf1de3d0f4a073c4bbd1d/data\
             ?time-series-code=wlp-hilo&from=2024-08-01T00:00:00Z&to=2024-08-02T00:00:00Z"
        );
    }
}
