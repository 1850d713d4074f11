// Telemetry data domain models
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Column carrying the row timestamps in columnar responses.
pub const TIME_COLUMN: &str = "time";

/// One reading. A `None` value is a gap and is not connected when drawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub time_ms: i64,
    pub value: Option<f64>,
}

impl Sample {
    pub fn new(time_ms: i64, value: Option<f64>) -> Self {
        Self { time_ms, value }
    }
}

/// Visible window of a chart's time axis, in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, serde::Deserialize)]
pub struct TimeRange {
    pub min: f64,
    pub max: f64,
}

impl TimeRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Extent of a series, if it has at least one sample.
    pub fn of_series(series: &[Sample]) -> Option<Self> {
        let first = series.first()?;
        let last = series.last()?;
        Some(Self::new(first.time_ms as f64, last.time_ms as f64))
    }

    pub fn span_ms(&self) -> f64 {
        self.max - self.min
    }

    /// Exact bound equality; echoed extremes carry identical numbers.
    pub fn same_as(&self, other: &TimeRange) -> bool {
        self.min == other.min && self.max == other.max
    }

    pub fn start_iso(&self) -> String {
        format_iso(self.min as i64)
    }

    pub fn stop_iso(&self) -> String {
        format_iso(self.max as i64)
    }
}

/// Columnar bulk response: one time column and one value column per sensor.
#[derive(Debug, Clone, Default)]
pub struct BulkData {
    pub time_ms: Vec<i64>,
    pub columns: HashMap<String, Vec<Option<f64>>>,
}

impl BulkData {
    pub fn new(time_ms: Vec<i64>, columns: HashMap<String, Vec<Option<f64>>>) -> Self {
        Self { time_ms, columns }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    /// Zip the time column with one sensor column.
    pub fn series_for(&self, column: &str) -> Option<Vec<Sample>> {
        let values = self.columns.get(column)?;
        if values.len() != self.time_ms.len() {
            tracing::warn!(
                "Column {} has {} values for {} timestamps, truncating",
                column,
                values.len(),
                self.time_ms.len()
            );
        }
        Some(
            self.time_ms
                .iter()
                .zip(values)
                .map(|(&t, &v)| Sample::new(t, v))
                .collect(),
        )
    }

    /// Remove one sensor column, returning its series.
    pub fn take_series(&mut self, column: &str) -> Option<Vec<Sample>> {
        let series = self.series_for(column);
        self.columns.remove(column);
        series
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// One reading per sensor at a single instant (`?current`).
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub time_ms: i64,
    pub values: HashMap<String, Option<f64>>,
}

/// Parse a timestamp as sent by the data API. Offsets are honoured, naive
/// timestamps are read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<i64> {
    if let Ok(time) = DateTime::parse_from_rfc3339(raw) {
        return Some(time.timestamp_millis());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc().timestamp_millis())
}

/// RFC 3339, UTC, millisecond precision.
pub fn format_iso(time_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(time_ms)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}
