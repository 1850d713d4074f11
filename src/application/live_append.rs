// Live append - Applies "current" snapshots to the values table and charts
use crate::application::chart_registry::ChartRegistry;
use crate::domain::sensor::Sensor;
use crate::domain::telemetry::{Sample, Snapshot};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Same timestamp as the previous snapshot; nothing changed.
    Duplicate,
    Updated { appended: usize },
}

/// Latest reading per sensor plus the time of the last accepted snapshot.
#[derive(Debug, Clone, Default)]
pub struct LiveValues {
    values: BTreeMap<String, Option<f64>>,
    last_updated: Option<i64>,
}

impl LiveValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every sensor starts without a reading.
    pub fn reset(&mut self, sensors: &[Sensor]) {
        self.values = sensors
            .iter()
            .map(|s| (s.column_name.clone(), None))
            .collect();
    }

    pub fn values(&self) -> &BTreeMap<String, Option<f64>> {
        &self.values
    }

    pub fn value(&self, column: &str) -> Option<f64> {
        self.values.get(column).copied().flatten()
    }

    pub fn last_updated(&self) -> Option<i64> {
        self.last_updated
    }

    pub fn clear_last_updated(&mut self) {
        self.last_updated = None;
    }

    /// Accept a snapshot unless its timestamp was already seen. When `charts`
    /// is given, one point is appended to every chart present in the snapshot.
    pub fn apply(&mut self, snapshot: &Snapshot, charts: Option<&mut ChartRegistry>) -> AppendOutcome {
        if self.last_updated == Some(snapshot.time_ms) {
            return AppendOutcome::Duplicate;
        }
        self.last_updated = Some(snapshot.time_ms);

        for (column, value) in &snapshot.values {
            self.values.insert(column.clone(), *value);
        }

        let mut appended = 0;
        if let Some(charts) = charts {
            for column in charts.columns() {
                if let Some(value) = snapshot.values.get(&column) {
                    let sample = Sample::new(snapshot.time_ms, *value);
                    if charts.append(&column, sample, true) {
                        appended += 1;
                    }
                }
            }
        }
        AppendOutcome::Updated { appended }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::chart_registry::SyncSettings;
    use crate::application::chart_surface::recording::{Call, RecordingSurface};
    use std::collections::HashMap;

    fn snapshot(time_ms: i64) -> Snapshot {
        let mut values = HashMap::new();
        values.insert("mc".to_string(), Some(0.012));
        values.insert("still".to_string(), None);
        values.insert("pt1".to_string(), Some(45.0));
        Snapshot { time_ms, values }
    }

    fn charts(surface: &RecordingSurface) -> ChartRegistry {
        let mut charts = ChartRegistry::new(SyncSettings::live());
        for column in ["mc", "still"] {
            charts.insert(column, surface.widget(column)).unwrap();
            charts.populate(column, vec![Sample::new(0, Some(1.0))]);
        }
        surface.clear();
        charts
    }

    #[test]
    fn test_new_timestamp_appends_one_point_per_chart() {
        let surface = RecordingSurface::new();
        let mut charts = charts(&surface);
        let mut live = LiveValues::new();
        live.reset(&[Sensor::new("mc", "MC"), Sensor::new("he3", "He3 pot")]);

        let outcome = live.apply(&snapshot(5_000), Some(&mut charts));

        assert_eq!(outcome, AppendOutcome::Updated { appended: 2 });
        assert_eq!(live.last_updated(), Some(5_000));
        assert_eq!(live.value("mc"), Some(0.012));
        assert_eq!(live.value("he3"), None);
        assert_eq!(
            surface.calls_for("mc"),
            vec![Call::AddPoint(Sample::new(5_000, Some(0.012)), true)]
        );
        assert_eq!(
            surface.calls_for("still"),
            vec![Call::AddPoint(Sample::new(5_000, None), true)]
        );
    }

    #[test]
    fn test_repeated_timestamp_is_ignored() {
        let surface = RecordingSurface::new();
        let mut charts = charts(&surface);
        let mut live = LiveValues::new();
        live.apply(&snapshot(5_000), Some(&mut charts));
        surface.clear();

        let mut repeat = snapshot(5_000);
        repeat.values.insert("mc".to_string(), Some(99.0));
        assert_eq!(live.apply(&repeat, Some(&mut charts)), AppendOutcome::Duplicate);
        assert_eq!(live.last_updated(), Some(5_000));
        assert_eq!(live.value("mc"), Some(0.012));
        assert!(surface.calls.lock().unwrap().is_empty());

        assert_eq!(
            live.apply(&snapshot(10_000), Some(&mut charts)),
            AppendOutcome::Updated { appended: 2 }
        );
    }

    #[test]
    fn test_values_only_without_charts() {
        let mut live = LiveValues::new();
        assert_eq!(
            live.apply(&snapshot(1_000), None),
            AppendOutcome::Updated { appended: 0 }
        );
        assert_eq!(live.value("pt1"), Some(45.0));
        live.clear_last_updated();
        assert_eq!(live.last_updated(), None);
    }
}
