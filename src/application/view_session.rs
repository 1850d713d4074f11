// View session - Orchestrates one open fridge view
use crate::application::chart_registry::{ChartRegistry, ChartView, RefetchPlan, RefetchScope, SyncOutcome};
use crate::application::chart_surface::ChartSurface;
use crate::application::data_source::SensorDataSource;
use crate::application::error::ViewError;
use crate::application::initial_load::InitialLoadJoin;
use crate::application::live_append::{AppendOutcome, LiveValues};
use crate::application::request_tracker::RequestTracker;
use crate::application::style_registry::StyleRegistry;
use crate::domain::chart::ChartOptions;
use crate::domain::fridge::{FridgeRef, ViewMode};
use crate::domain::sensor::Sensor;
use crate::domain::telemetry::{format_iso, TimeRange};
use crate::infrastructure::config::ViewConfig;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::time::{Instant, MissedTickBehavior};

struct ViewState {
    sensors: Vec<Sensor>,
    live: LiveValues,
    charts: ChartRegistry,
    join: InitialLoadJoin,
    closed: bool,
}

impl ViewState {
    /// Bulk data not yet received, or held for charts still to mount.
    fn initial_data_pending(&self) -> bool {
        !self.join.has_arrived() || self.join.is_buffering()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SensorRow {
    pub column_name: String,
    pub name: String,
    pub value: Option<f64>,
    pub display: String,
    pub color: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ViewSnapshot {
    pub id: u64,
    pub title: String,
    pub fridge: FridgeRef,
    pub mode: ViewMode,
    pub last_updated: Option<String>,
    pub sensors: Vec<SensorRow>,
    pub charts: Vec<ChartView>,
    pub pending_requests: usize,
    pub initial_data_pending: bool,
    pub closed: bool,
}

pub struct ViewSession {
    id: u64,
    fridge: FridgeRef,
    mode: ViewMode,
    config: ViewConfig,
    source: Arc<dyn SensorDataSource>,
    surface: Arc<dyn ChartSurface>,
    styles: Arc<StyleRegistry>,
    requests: RequestTracker,
    state: Mutex<ViewState>,
}

impl ViewSession {
    pub fn new(
        id: u64,
        fridge: FridgeRef,
        mode: ViewMode,
        config: ViewConfig,
        source: Arc<dyn SensorDataSource>,
        surface: Arc<dyn ChartSurface>,
        styles: Arc<StyleRegistry>,
    ) -> Arc<Self> {
        let charts = ChartRegistry::new(config.sync_settings(mode.is_historic()));
        Arc::new(Self {
            id,
            fridge,
            mode,
            config,
            source,
            surface,
            styles,
            requests: RequestTracker::new(),
            state: Mutex::new(ViewState {
                sensors: Vec::new(),
                live: LiveValues::new(),
                charts,
                join: InitialLoadJoin::new(),
                closed: false,
            }),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn in_flight(&self) -> usize {
        self.requests.in_flight()
    }

    fn state(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start loading: the sensor list and the bulk backfill run concurrently.
    pub fn enter(self: &Arc<Self>) {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.load_sensors().await });
        let this = Arc::clone(self);
        tokio::spawn(async move { this.load_initial_data().await });
    }

    pub async fn load_sensors(self: &Arc<Self>) {
        let mut sensors = match self
            .requests
            .run("sensors", self.source.list_sensors(&self.fridge))
            .await
        {
            Ok(sensors) => sensors,
            Err(e) => {
                e.log("sensors");
                return;
            }
        };
        sensors.sort_by_key(|s| s.view_order);

        {
            let mut state = self.state();
            if state.closed {
                return;
            }
            state.live.reset(&sensors);
            state
                .join
                .set_sensors(sensors.iter().map(|s| s.column_name.clone()));
            state.sensors = sensors;
            tracing::info!(
                "Loaded {} sensors for fridge {} ({:?})",
                state.sensors.len(),
                self.fridge.fridge,
                self.fridge.supp
            );
        }

        if !self.mode.is_historic() {
            self.spawn_poller();
        }
        // Fill the values table once, historic views included
        self.poll_current().await;
    }

    pub async fn load_initial_data(&self) {
        let request = async {
            match self.mode {
                ViewMode::Live => self.source.recent(&self.fridge, self.config.point_count).await,
                ViewMode::Historic => {
                    self.source
                        .averaged(&self.fridge, self.config.historic_avg_period)
                        .await
                }
            }
        };
        let data = match self.requests.run("initial data", request).await {
            Ok(data) => data,
            Err(e) => {
                e.log("initial data");
                return;
            }
        };

        let mut state = self.state();
        if state.closed {
            return;
        }
        let mounted = state.charts.columns();
        let ready = state.join.on_data(data, &mounted);
        for (column, series) in ready {
            state.charts.populate(&column, series);
        }
    }

    /// A chart widget for `column` is ready to receive data.
    pub fn mount_chart(&self, column: &str) -> Result<(), ViewError> {
        let mut state = self.state();
        if state.closed {
            return Err(ViewError::Closed);
        }
        let sensor = state
            .sensors
            .iter()
            .find(|s| s.column_name == column)
            .cloned()
            .ok_or_else(|| ViewError::UnknownSensor(column.to_string()))?;
        if state.charts.contains(column) {
            return Err(ViewError::AlreadyMounted(column.to_string()));
        }

        let options =
            ChartOptions::for_sensor(&sensor, self.styles.resolve(column), self.mode.is_historic());
        let widget = self.surface.create_chart(column, &options);
        state.charts.insert(column, widget)?;

        if let Some(series) = state.join.on_mount(column) {
            state.charts.populate(column, series);
        }
        Ok(())
    }

    pub fn unmount_chart(&self, column: &str) -> Result<(), ViewError> {
        if self.state().charts.remove(column) {
            Ok(())
        } else {
            Err(ViewError::UnknownChart(column.to_string()))
        }
    }

    /// The user changed the visible range of one chart.
    pub fn on_user_extremes(
        self: &Arc<Self>,
        column: &str,
        range: TimeRange,
    ) -> Result<SyncOutcome, ViewError> {
        let outcome = {
            let mut state = self.state();
            if state.closed {
                return Err(ViewError::Closed);
            }
            state.charts.after_set_extremes(column, range)
        };

        match &outcome {
            SyncOutcome::Unknown => return Err(ViewError::UnknownChart(column.to_string())),
            SyncOutcome::Refetch(plan) => {
                let this = Arc::clone(self);
                let plan = plan.clone();
                tokio::spawn(async move { this.refetch(plan).await });
            }
            _ => {}
        }
        Ok(outcome)
    }

    /// Fetch and install the fine-resolution series of a narrow historic zoom.
    pub async fn refetch(&self, plan: RefetchPlan) {
        let column = match self.config.refetch_scope {
            RefetchScope::All => None,
            RefetchScope::Source => Some(plan.source.as_str()),
        };
        let result = self
            .requests
            .run(
                "fine-resolution window",
                self.source.window(&self.fridge, plan.range, column),
            )
            .await;

        let mut state = self.state();
        if state.closed {
            return;
        }
        match result {
            Ok(data) => {
                state.charts.apply_refetch(&plan, &data);
            }
            Err(e) => {
                e.log("fine-resolution window");
                state.charts.abort_refetch(&plan);
            }
        }
    }

    /// Fetch the current snapshot and apply it. Charts are only appended to in
    /// live views.
    pub async fn poll_current(&self) -> Option<AppendOutcome> {
        let snapshot = match self
            .requests
            .run("current values", self.source.current(&self.fridge))
            .await
        {
            Ok(snapshot) => snapshot,
            Err(e) => {
                e.log("current values");
                return None;
            }
        };

        let mut state = self.state();
        if state.closed {
            return None;
        }
        let ViewState { live, charts, .. } = &mut *state;
        let charts = (!self.mode.is_historic()).then_some(charts);
        Some(live.apply(&snapshot, charts))
    }

    fn spawn_poller(self: &Arc<Self>) {
        let this = Arc::clone(self);
        let token = self.requests.token().clone();
        let period = self.config.poll_interval();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        this.poll_current().await;
                    }
                }
            }
            tracing::debug!("Stopped polling for view {}", this.id);
        });
    }

    /// Cancel every outstanding request and the poll timer, destroy the
    /// charts. Returns the number of requests that were aborted.
    pub fn teardown(&self) -> usize {
        let cancelled = self.requests.cancel_all();
        let mut state = self.state();
        state.closed = true;
        state.charts.destroy_all();
        state.live.clear_last_updated();
        tracing::info!(
            "Closed view {} of {}, {} in-progress requests cancelled",
            self.id,
            self.fridge.fridge,
            cancelled
        );
        cancelled
    }

    pub fn initial_data_pending(&self) -> bool {
        self.state().initial_data_pending()
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        let state = self.state();
        let sensors = state
            .sensors
            .iter()
            .map(|sensor| {
                let style = self.styles.resolve(&sensor.column_name);
                let value = state.live.value(&sensor.column_name);
                SensorRow {
                    column_name: sensor.column_name.clone(),
                    name: sensor.name.clone(),
                    value,
                    display: value
                        .map(|v| style.format_reading(v))
                        .unwrap_or_else(|| "-".to_string()),
                    color: style.color,
                }
            })
            .collect();

        ViewSnapshot {
            id: self.id,
            title: self.fridge.title(),
            fridge: self.fridge.clone(),
            mode: self.mode,
            last_updated: state.live.last_updated().map(format_iso),
            sensors,
            charts: state.charts.views(),
            pending_requests: self.requests.in_flight(),
            initial_data_pending: state.initial_data_pending(),
            closed: state.closed,
        }
    }
}
