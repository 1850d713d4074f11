// Chart registry - Owns the charts of a view and keeps their time axes linked
use crate::application::chart_surface::ChartWidget;
use crate::application::error::ViewError;
use crate::domain::chart::ChartState;
use crate::domain::telemetry::{BulkData, Sample, TimeRange};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const LOADING_MESSAGE: &str = "Loading Data...";

/// Five days plus one second, so the "5d" quick range reliably counts as a
/// narrow window.
pub const DEFAULT_DETAIL_THRESHOLD_MS: f64 = (5 * 24 * 60 * 60 * 1000 + 1000) as f64;

/// Which charts refetch fine-resolution data on a narrow historic zoom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefetchScope {
    /// Every chart of the view, through one whole-fridge window query.
    #[default]
    All,
    /// Only the chart the user zoomed, through a per-sensor window query.
    Source,
}

#[derive(Debug, Clone, Copy)]
pub struct SyncSettings {
    pub historic: bool,
    pub detail_threshold_ms: f64,
    pub scope: RefetchScope,
}

impl SyncSettings {
    pub fn live() -> Self {
        Self {
            historic: false,
            detail_threshold_ms: DEFAULT_DETAIL_THRESHOLD_MS,
            scope: RefetchScope::All,
        }
    }

    pub fn historic(scope: RefetchScope) -> Self {
        Self {
            historic: true,
            detail_threshold_ms: DEFAULT_DETAIL_THRESHOLD_MS,
            scope,
        }
    }

    fn wants_detail(&self, range: &TimeRange) -> bool {
        self.historic && range.span_ms() <= self.detail_threshold_ms
    }
}

/// Fine-resolution fetch the caller has to perform after a narrow historic zoom.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefetchPlan {
    pub source: String,
    pub range: TimeRange,
    pub columns: Vec<String>,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    Unknown,
    /// The chart was being updated programmatically; the event is an echo.
    Ignored,
    /// Same extremes as before.
    Unchanged,
    Mirrored { charts: usize },
    Refetch(RefetchPlan),
    Restored { charts: usize },
}

struct ChartHandle {
    widget: Box<dyn ChartWidget>,
    state: ChartState,
    range: Option<TimeRange>,
    zoomed: bool,
    loading: bool,
    series: Vec<Sample>,
    original: Option<Vec<Sample>>,
    pending_refetch: Option<u64>,
}

impl ChartHandle {
    fn new(widget: Box<dyn ChartWidget>) -> Self {
        Self {
            widget,
            state: ChartState::Idle,
            range: None,
            zoomed: false,
            loading: false,
            series: Vec::new(),
            original: None,
            pending_refetch: None,
        }
    }

    /// Move the axis to `range` without letting the echo re-enter the
    /// synchronizer. The previous state is kept so a pending refetch survives.
    fn mirror(&mut self, range: TimeRange) {
        let prev = self.state;
        self.state = ChartState::LinkedUpdate;
        self.widget.set_extremes(range);
        self.range = Some(range);
        self.state = prev;
    }

    fn show_loading(&mut self) {
        self.widget.show_loading(LOADING_MESSAGE);
        self.loading = true;
    }

    fn hide_loading(&mut self) {
        self.widget.hide_loading();
        self.loading = false;
    }

    /// Forget a pending refetch; its result will be dropped as stale.
    fn release_refetch(&mut self) {
        if self.pending_refetch.take().is_some() && self.loading {
            self.hide_loading();
        }
    }

    /// Swap fine-resolution data back to the cached original series.
    fn restore(&mut self) -> bool {
        if !self.zoomed {
            return false;
        }
        let prev = self.state;
        self.state = ChartState::LinkedUpdate;
        if let Some(original) = &self.original {
            self.widget.set_data(original);
            self.series = original.clone();
        }
        self.zoomed = false;
        self.state = prev;
        true
    }
}

/// Read-only view of one chart.
#[derive(Debug, Clone, Serialize)]
pub struct ChartView {
    pub column: String,
    pub state: ChartState,
    pub range: Option<TimeRange>,
    pub zoomed: bool,
    pub loading: bool,
    pub points: usize,
}

pub struct ChartRegistry {
    settings: SyncSettings,
    charts: BTreeMap<String, ChartHandle>,
    generation: u64,
}

impl ChartRegistry {
    pub fn new(settings: SyncSettings) -> Self {
        Self {
            settings,
            charts: BTreeMap::new(),
            generation: 0,
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Register a freshly created chart; it shows a loading indicator until
    /// its first data arrives.
    pub fn insert(&mut self, column: &str, widget: Box<dyn ChartWidget>) -> Result<(), ViewError> {
        if self.charts.contains_key(column) {
            return Err(ViewError::AlreadyMounted(column.to_string()));
        }
        let mut chart = ChartHandle::new(widget);
        chart.show_loading();
        self.charts.insert(column.to_string(), chart);
        Ok(())
    }

    pub fn remove(&mut self, column: &str) -> bool {
        match self.charts.remove(column) {
            Some(mut chart) => {
                chart.widget.destroy();
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, column: &str) -> bool {
        self.charts.contains_key(column)
    }

    pub fn len(&self) -> usize {
        self.charts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.charts.is_empty()
    }

    pub fn columns(&self) -> Vec<String> {
        self.charts.keys().cloned().collect()
    }

    pub fn series(&self, column: &str) -> Option<&[Sample]> {
        self.charts.get(column).map(|c| c.series.as_slice())
    }

    pub fn range(&self, column: &str) -> Option<TimeRange> {
        self.charts.get(column).and_then(|c| c.range)
    }

    pub fn state(&self, column: &str) -> Option<ChartState> {
        self.charts.get(column).map(|c| c.state)
    }

    pub fn is_zoomed(&self, column: &str) -> bool {
        self.charts.get(column).is_some_and(|c| c.zoomed)
    }

    pub fn views(&self) -> Vec<ChartView> {
        self.charts
            .iter()
            .map(|(column, chart)| ChartView {
                column: column.clone(),
                state: chart.state,
                range: chart.range,
                zoomed: chart.zoomed,
                loading: chart.loading,
                points: chart.series.len(),
            })
            .collect()
    }

    /// Load a chart's initial series. Historic series are kept as the
    /// original to restore after a fine-resolution zoom.
    pub fn populate(&mut self, column: &str, series: Vec<Sample>) -> bool {
        let historic = self.settings.historic;
        let Some(chart) = self.charts.get_mut(column) else {
            tracing::warn!("Couldn't find chart for column: {}", column);
            return false;
        };

        let prev = chart.state;
        chart.state = ChartState::LinkedUpdate;
        chart.widget.set_data(&series);
        if historic {
            chart.original = Some(series.clone());
        }
        chart.range = TimeRange::of_series(&series);
        chart.series = series;
        chart.zoomed = false;
        chart.hide_loading();
        chart.state = prev;
        true
    }

    /// Append one live point without re-triggering range propagation.
    pub fn append(&mut self, column: &str, sample: Sample, shift: bool) -> bool {
        let Some(chart) = self.charts.get_mut(column) else {
            return false;
        };

        let prev = chart.state;
        chart.state = ChartState::LinkedUpdate;
        chart.widget.add_point(sample, shift);
        let had_points = !chart.series.is_empty();
        chart.series.push(sample);
        if shift && had_points {
            chart.series.remove(0);
        }
        chart.state = prev;
        true
    }

    pub fn is_loading(&self, column: &str) -> bool {
        self.charts.get(column).is_some_and(|c| c.loading)
    }

    /// Handle an extremes change reported by one chart.
    pub fn after_set_extremes(&mut self, source: &str, range: TimeRange) -> SyncOutcome {
        let Some(chart) = self.charts.get_mut(source) else {
            return SyncOutcome::Unknown;
        };

        if chart.state == ChartState::LinkedUpdate {
            chart.range = Some(range);
            return SyncOutcome::Ignored;
        }
        if chart.range.is_some_and(|current| current.same_as(&range)) {
            return SyncOutcome::Unchanged;
        }

        chart.range = Some(range);
        chart.state = ChartState::UserZoom;

        let outcome = if self.settings.wants_detail(&range) {
            self.begin_refetch(source, range)
        } else if self.settings.historic && self.has_fine_data() {
            self.restore_original(source, range)
        } else {
            self.mirror_others(source, range)
        };

        if let Some(chart) = self.charts.get_mut(source) {
            chart.state = ChartState::Idle;
        }
        outcome
    }

    /// Any chart showing, or waiting for, fine-resolution data.
    fn has_fine_data(&self) -> bool {
        self.charts
            .values()
            .any(|c| c.zoomed || c.pending_refetch.is_some())
    }

    fn begin_refetch(&mut self, source: &str, range: TimeRange) -> SyncOutcome {
        self.generation += 1;
        let generation = self.generation;
        let scope = self.settings.scope;

        let mut columns = Vec::new();
        for (column, chart) in self.charts.iter_mut() {
            let is_source = column == source;
            if !is_source {
                chart.mirror(range);
            }

            let refetch = match scope {
                RefetchScope::All => true,
                RefetchScope::Source => is_source,
            };
            if refetch {
                if !chart.loading {
                    chart.show_loading();
                }
                chart.pending_refetch = Some(generation);
                columns.push(column.clone());
            } else {
                // Fine data of an earlier window does not cover this one
                chart.release_refetch();
                chart.restore();
            }
        }

        tracing::debug!(
            "Fine-resolution refetch {} for {} charts ({} - {})",
            generation,
            columns.len(),
            range.start_iso(),
            range.stop_iso()
        );
        SyncOutcome::Refetch(RefetchPlan {
            source: source.to_string(),
            range,
            columns,
            generation,
        })
    }

    fn restore_original(&mut self, source: &str, range: TimeRange) -> SyncOutcome {
        let mut restored = 0;
        for (column, chart) in self.charts.iter_mut() {
            if column != source {
                chart.mirror(range);
            }
            chart.release_refetch();
            if chart.restore() {
                restored += 1;
            }
        }
        SyncOutcome::Restored { charts: restored }
    }

    fn mirror_others(&mut self, source: &str, range: TimeRange) -> SyncOutcome {
        let mut mirrored = 0;
        for (column, chart) in self.charts.iter_mut() {
            if column == source {
                continue;
            }
            chart.mirror(range);
            mirrored += 1;
        }
        SyncOutcome::Mirrored { charts: mirrored }
    }

    /// Install the fine-resolution series of a finished refetch. Charts that
    /// have since been re-zoomed or restored are skipped.
    pub fn apply_refetch(&mut self, plan: &RefetchPlan, data: &BulkData) -> usize {
        let mut applied = 0;
        for column in &plan.columns {
            let Some(chart) = self.charts.get_mut(column) else {
                continue;
            };
            if chart.pending_refetch != Some(plan.generation) {
                tracing::debug!("Dropping stale refetch {} for {}", plan.generation, column);
                continue;
            }
            chart.pending_refetch = None;

            match data.series_for(column) {
                Some(series) => {
                    let prev = chart.state;
                    chart.state = ChartState::LinkedUpdate;
                    chart.widget.set_data(&series);
                    chart.series = series;
                    chart.zoomed = true;
                    chart.state = prev;
                    applied += 1;
                }
                None => tracing::warn!("Refetch returned no data for column {}", column),
            }
            chart.hide_loading();
        }
        applied
    }

    /// Release charts waiting on a refetch that failed or was aborted.
    pub fn abort_refetch(&mut self, plan: &RefetchPlan) {
        for column in &plan.columns {
            if let Some(chart) = self.charts.get_mut(column) {
                if chart.pending_refetch == Some(plan.generation) {
                    chart.release_refetch();
                }
            }
        }
    }

    pub fn destroy_all(&mut self) {
        for chart in self.charts.values_mut() {
            chart.widget.destroy();
        }
        self.charts.clear();
    }
}
