//! In-memory data source for unit tests
use crate::application::data_source::{AvgPeriod, SensorDataSource};
use crate::domain::fridge::FridgeRef;
use crate::domain::sensor::Sensor;
use crate::domain::telemetry::{BulkData, Snapshot, TimeRange};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Default)]
pub struct FakeSource {
    sensors: Vec<Sensor>,
    bulk: BulkData,
    window: BulkData,
    snapshots: Mutex<VecDeque<Snapshot>>,
    summaries: HashMap<String, Vec<Option<f64>>>,
    calls: Mutex<Vec<String>>,
    hang: bool,
    fail_window: bool,
}

impl FakeSource {
    pub fn new(sensors: Vec<Sensor>, bulk: BulkData) -> Self {
        Self {
            sensors,
            bulk,
            ..Default::default()
        }
    }

    pub fn with_window(mut self, window: BulkData) -> Self {
        self.window = window;
        self
    }

    /// Snapshots are served in order; the last one repeats.
    pub fn with_snapshots(self, snapshots: Vec<Snapshot>) -> Self {
        *self.snapshots.lock().unwrap() = snapshots.into();
        self
    }

    pub fn with_summary(mut self, fridge: &str, points: Vec<Option<f64>>) -> Self {
        self.summaries.insert(fridge.to_string(), points);
        self
    }

    /// Every request stays pending forever.
    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    pub fn failing_window(mut self) -> Self {
        self.fail_window = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
        if self.hang {
            futures::future::pending::<()>().await;
        }
    }
}

#[async_trait]
impl SensorDataSource for FakeSource {
    async fn list_sensors(&self, _fridge: &FridgeRef) -> anyhow::Result<Vec<Sensor>> {
        self.record("sensors".into()).await;
        Ok(self.sensors.clone())
    }

    async fn current(&self, _fridge: &FridgeRef) -> anyhow::Result<Snapshot> {
        self.record("current".into()).await;
        let mut snapshots = self.snapshots.lock().unwrap();
        let snapshot = if snapshots.len() > 1 {
            snapshots.pop_front()
        } else {
            snapshots.front().cloned()
        };
        snapshot.ok_or_else(|| anyhow::anyhow!("no snapshot"))
    }

    async fn recent(&self, _fridge: &FridgeRef, count: usize) -> anyhow::Result<BulkData> {
        self.record(format!("recent:{}", count)).await;
        Ok(self.bulk.clone())
    }

    async fn averaged(&self, _fridge: &FridgeRef, period: AvgPeriod) -> anyhow::Result<BulkData> {
        self.record(format!("averaged:{}", period.as_str())).await;
        Ok(self.bulk.clone())
    }

    async fn window(
        &self,
        _fridge: &FridgeRef,
        _range: TimeRange,
        column: Option<&str>,
    ) -> anyhow::Result<BulkData> {
        self.record(format!("window:{}", column.unwrap_or("all"))).await;
        if self.fail_window {
            anyhow::bail!("HTTP 502");
        }
        Ok(self.window.clone())
    }

    async fn summary(&self, fridge: &str) -> anyhow::Result<Vec<Option<f64>>> {
        self.record(format!("summary:{}", fridge)).await;
        self.summaries
            .get(fridge)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown fridge {}", fridge))
    }
}
