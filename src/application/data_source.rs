// Port for the sensor data API
use crate::domain::fridge::FridgeRef;
use crate::domain::sensor::Sensor;
use crate::domain::telemetry::{BulkData, Snapshot, TimeRange};
use async_trait::async_trait;
use serde::Deserialize;

/// Averaging period accepted by the data API for aggregated series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvgPeriod {
    #[default]
    Hour,
    Day,
    Month,
}

impl AvgPeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            AvgPeriod::Hour => "hour",
            AvgPeriod::Day => "day",
            AvgPeriod::Month => "month",
        }
    }
}

#[async_trait]
pub trait SensorDataSource: Send + Sync {
    /// List the visible sensors of a fridge
    async fn list_sensors(&self, fridge: &FridgeRef) -> anyhow::Result<Vec<Sensor>>;

    /// Latest reading of every sensor
    async fn current(&self, fridge: &FridgeRef) -> anyhow::Result<Snapshot>;

    /// Last `count` raw readings of every sensor (live backfill)
    async fn recent(&self, fridge: &FridgeRef, count: usize) -> anyhow::Result<BulkData>;

    /// Full history averaged over `period` (historic backfill)
    async fn averaged(&self, fridge: &FridgeRef, period: AvgPeriod) -> anyhow::Result<BulkData>;

    /// Raw readings inside `range`, for one column or for every sensor
    async fn window(
        &self,
        fridge: &FridgeRef,
        range: TimeRange,
        column: Option<&str>,
    ) -> anyhow::Result<BulkData>;

    /// Coldest reading per row over the last two hours, for sparklines
    async fn summary(&self, fridge: &str) -> anyhow::Result<Vec<Option<f64>>>;
}
