// HTTP data source - Client for the fridge sensor data API
use crate::application::data_source::{AvgPeriod, SensorDataSource};
use crate::domain::fridge::FridgeRef;
use crate::domain::sensor::Sensor;
use crate::domain::telemetry::{parse_timestamp, BulkData, Snapshot, TimeRange, TIME_COLUMN};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpDataSource {
    base_url: String,
    client: reqwest::Client,
}

impl HttpDataSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: format!("{}/", base_url.trim_end_matches('/')),
            client,
        })
    }

    fn fridge_url(&self, fridge: &FridgeRef) -> String {
        let mut url = format!("{}{}", self.base_url, urlencoding::encode(&fridge.fridge));
        if let Some(supp) = &fridge.supp {
            url.push_str("/supp/");
            url.push_str(&urlencoding::encode(supp));
        }
        url
    }

    fn sensors_url(&self, fridge: &FridgeRef) -> String {
        format!("{}?sensors", self.fridge_url(fridge))
    }

    fn current_url(&self, fridge: &FridgeRef) -> String {
        format!("{}?current", self.fridge_url(fridge))
    }

    fn recent_url(&self, fridge: &FridgeRef, count: usize) -> String {
        format!("{}?count={}", self.fridge_url(fridge), count)
    }

    fn averaged_url(&self, fridge: &FridgeRef, period: AvgPeriod) -> String {
        format!("{}?avg_period={}", self.fridge_url(fridge), period.as_str())
    }

    fn window_url(&self, fridge: &FridgeRef, range: TimeRange, column: Option<&str>) -> String {
        let mut url = self.fridge_url(fridge);
        if let Some(column) = column {
            url.push('/');
            url.push_str(&urlencoding::encode(column));
        }
        format!(
            "{}?start={}&stop={}",
            url,
            urlencoding::encode(&range.start_iso()),
            urlencoding::encode(&range.stop_iso())
        )
    }

    fn summary_url(&self, fridge: &str) -> String {
        format!("{}{}?summary", self.base_url, urlencoding::encode(fridge))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .header("Cache-Control", "no-store")
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Data API request failed with status {}: {}", status, body);
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))
    }
}

/// `{time: iso, <column>: number|null, ...}`. Non-numeric readings are
/// dropped with a warning.
fn parse_snapshot(mut raw: Map<String, Value>) -> Result<Snapshot> {
    let time = raw
        .remove(TIME_COLUMN)
        .context("Snapshot has no time field")?;
    let time_ms = time
        .as_str()
        .and_then(parse_timestamp)
        .with_context(|| format!("Invalid snapshot timestamp: {}", time))?;

    let mut values = HashMap::with_capacity(raw.len());
    for (column, value) in raw {
        match value {
            Value::Null => {
                values.insert(column, None);
            }
            Value::Number(n) => {
                values.insert(column, n.as_f64());
            }
            other => tracing::warn!("Ignoring non-numeric reading for {}: {}", column, other),
        }
    }
    Ok(Snapshot { time_ms, values })
}

/// Columnar `{time: [iso...], <column>: [number|null...], ...}`. Rows with an
/// unreadable timestamp are dropped from every column.
fn parse_bulk(mut raw: Map<String, Value>) -> Result<BulkData> {
    let times = match raw.remove(TIME_COLUMN) {
        Some(Value::Array(times)) => times,
        Some(_) => anyhow::bail!("Bulk data time column is not a list"),
        None => return Ok(BulkData::default()),
    };

    let parsed: Vec<Option<i64>> = times
        .iter()
        .map(|t| t.as_str().and_then(parse_timestamp))
        .collect();
    let dropped = parsed.iter().filter(|t| t.is_none()).count();
    if dropped > 0 {
        tracing::warn!("Dropping {} rows with unreadable timestamps", dropped);
    }
    let time_ms = parsed.iter().flatten().copied().collect();

    let mut columns = HashMap::with_capacity(raw.len());
    for (column, values) in raw {
        let Value::Array(values) = values else {
            tracing::warn!("Ignoring column {}: not a list", column);
            continue;
        };
        let mut bad = 0;
        let series = values
            .iter()
            .zip(&parsed)
            .filter(|(_, time)| time.is_some())
            .map(|(value, _)| match value {
                Value::Null => None,
                Value::Number(n) => n.as_f64(),
                _ => {
                    bad += 1;
                    None
                }
            })
            .collect();
        if bad > 0 {
            tracing::warn!("Column {} has {} non-numeric readings", column, bad);
        }
        columns.insert(column, series);
    }

    Ok(BulkData::new(time_ms, columns))
}

#[async_trait]
impl SensorDataSource for HttpDataSource {
    async fn list_sensors(&self, fridge: &FridgeRef) -> Result<Vec<Sensor>> {
        self.get_json(&self.sensors_url(fridge)).await
    }

    async fn current(&self, fridge: &FridgeRef) -> Result<Snapshot> {
        let raw = self.get_json(&self.current_url(fridge)).await?;
        parse_snapshot(raw)
    }

    async fn recent(&self, fridge: &FridgeRef, count: usize) -> Result<BulkData> {
        let raw = self.get_json(&self.recent_url(fridge, count)).await?;
        parse_bulk(raw)
    }

    async fn averaged(&self, fridge: &FridgeRef, period: AvgPeriod) -> Result<BulkData> {
        let raw = self.get_json(&self.averaged_url(fridge, period)).await?;
        parse_bulk(raw)
    }

    async fn window(
        &self,
        fridge: &FridgeRef,
        range: TimeRange,
        column: Option<&str>,
    ) -> Result<BulkData> {
        let raw = self.get_json(&self.window_url(fridge, range, column)).await?;
        parse_bulk(raw)
    }

    async fn summary(&self, fridge: &str) -> Result<Vec<Option<f64>>> {
        self.get_json(&self.summary_url(fridge)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source() -> HttpDataSource {
        HttpDataSource::new("https://qphys1114.research.ext.sydney.edu.au/therm/data", Duration::from_secs(5))
            .unwrap()
    }

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_urls() {
        let source = source();
        let blue = FridgeRef::new("Blue Fridge", None);
        let supp = FridgeRef::new("BlueFors_LD", Some("Maxigauge".into()));
        let base = "https://qphys1114.research.ext.sydney.edu.au/therm/data/";

        assert_eq!(source.sensors_url(&blue), format!("{}Blue%20Fridge?sensors", base));
        assert_eq!(
            source.current_url(&supp),
            format!("{}BlueFors_LD/supp/Maxigauge?current", base)
        );
        assert_eq!(source.recent_url(&blue, 2000), format!("{}Blue%20Fridge?count=2000", base));
        assert_eq!(
            source.averaged_url(&supp, AvgPeriod::Hour),
            format!("{}BlueFors_LD/supp/Maxigauge?avg_period=hour", base)
        );
        assert_eq!(source.summary_url("Red_Fridge"), format!("{}Red_Fridge?summary", base));
    }

    #[test]
    fn test_window_urls() {
        let source = source();
        let fridge = FridgeRef::new("Red_Fridge", None);
        let range = TimeRange::new(1_700_000_000_000.0, 1_700_086_400_000.0);
        let base = "https://qphys1114.research.ext.sydney.edu.au/therm/data/Red_Fridge";
        let query = "start=2023-11-14T22%3A13%3A20.000Z&stop=2023-11-15T22%3A13%3A20.000Z";

        assert_eq!(source.window_url(&fridge, range, None), format!("{}?{}", base, query));
        assert_eq!(
            source.window_url(&fridge, range, Some("mc")),
            format!("{}/mc?{}", base, query)
        );
    }

    #[test]
    fn test_parse_snapshot() {
        let snapshot = parse_snapshot(as_map(json!({
            "time": "2024-03-01T10:00:00Z",
            "mc": 0.0123,
            "still": null,
            "status": "ok",
        })))
        .unwrap();

        assert_eq!(snapshot.time_ms, 1_709_287_200_000);
        assert_eq!(snapshot.values.len(), 2);
        assert_eq!(snapshot.values["mc"], Some(0.0123));
        assert_eq!(snapshot.values["still"], None);
        assert!(parse_snapshot(as_map(json!({"mc": 1.0}))).is_err());
    }

    #[test]
    fn test_parse_bulk() {
        let data = parse_bulk(as_map(json!({
            "time": ["2024-03-01T10:00:00Z", "garbage", "2024-03-01T10:00:10"],
            "mc": [0.01, 0.02, null],
            "pt1": [45.0, "x", 44.0],
            "note": "n/a",
        })))
        .unwrap();

        assert_eq!(data.time_ms, vec![1_709_287_200_000, 1_709_287_210_000]);
        assert_eq!(data.columns["mc"], vec![Some(0.01), None]);
        assert_eq!(data.columns["pt1"], vec![Some(45.0), Some(44.0)]);
        assert!(!data.has_column("note"));

        assert!(parse_bulk(Map::new()).unwrap().is_empty());
    }

    #[test]
    fn test_parse_sensor_list() {
        let sensors: Vec<Sensor> = serde_json::from_value(json!([
            {"name": "Mixing Chamber", "column_name": "mc", "view_order": 2},
            {"name": "Still", "column_name": "still"},
        ]))
        .unwrap();
        assert_eq!(sensors[0].view_order, 2);
        assert_eq!(sensors[1].view_order, 0);
    }
}
