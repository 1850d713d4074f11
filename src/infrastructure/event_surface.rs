// Chart surface that forwards every widget call as a command to the browser
use crate::application::chart_surface::{ChartSurface, ChartWidget};
use crate::domain::chart::ChartOptions;
use crate::domain::telemetry::{Sample, TimeRange};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};

/// One instruction for the charting library running in the browser.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ChartCommand {
    Create {
        column: String,
        options: ChartOptions,
    },
    SetData {
        column: String,
        /// `[time_ms, value]` pairs; gaps are `null`
        data: Vec<(i64, Option<f64>)>,
    },
    AddPoint {
        column: String,
        point: (i64, Option<f64>),
        shift: bool,
    },
    SetExtremes {
        column: String,
        min: f64,
        max: f64,
    },
    ShowLoading {
        column: String,
        message: String,
    },
    HideLoading {
        column: String,
    },
    Destroy {
        column: String,
    },
}

pub type CommandReceiver = mpsc::Receiver<ChartCommand>;

/// Commands are queued up to `capacity`; beyond that they are dropped.
#[derive(Clone)]
pub struct EventSurface {
    tx: mpsc::Sender<ChartCommand>,
}

impl EventSurface {
    pub fn new(capacity: usize) -> (Self, CommandReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Surface factory for the view service.
    pub fn for_view(view_id: u64, capacity: usize) -> (Arc<dyn ChartSurface>, CommandReceiver) {
        tracing::debug!("Creating chart command stream for view {}", view_id);
        let (surface, rx) = Self::new(capacity);
        (Arc::new(surface), rx)
    }
}

impl ChartSurface for EventSurface {
    fn create_chart(&self, column: &str, options: &ChartOptions) -> Box<dyn ChartWidget> {
        let chart = EventChart {
            column: column.to_string(),
            tx: self.tx.clone(),
        };
        chart.send(ChartCommand::Create {
            column: column.to_string(),
            options: options.clone(),
        });
        Box::new(chart)
    }
}

pub struct EventChart {
    column: String,
    tx: mpsc::Sender<ChartCommand>,
}

impl EventChart {
    fn send(&self, command: ChartCommand) {
        // State is still tracked server-side when a command is dropped
        match self.tx.try_send(command) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::debug!("Command queue full, dropping command for chart {}", self.column);
            }
            Err(TrySendError::Closed(_)) => {
                tracing::trace!("No listener for chart {}", self.column);
            }
        }
    }

    fn column(&self) -> String {
        self.column.clone()
    }
}

fn point(sample: &Sample) -> (i64, Option<f64>) {
    (sample.time_ms, sample.value)
}

impl ChartWidget for EventChart {
    fn set_data(&mut self, series: &[Sample]) {
        self.send(ChartCommand::SetData {
            column: self.column(),
            data: series.iter().map(point).collect(),
        });
    }

    fn add_point(&mut self, sample: Sample, shift: bool) {
        self.send(ChartCommand::AddPoint {
            column: self.column(),
            point: point(&sample),
            shift,
        });
    }

    fn set_extremes(&mut self, range: TimeRange) {
        self.send(ChartCommand::SetExtremes {
            column: self.column(),
            min: range.min,
            max: range.max,
        });
    }

    fn show_loading(&mut self, message: &str) {
        self.send(ChartCommand::ShowLoading {
            column: self.column(),
            message: message.to_string(),
        });
    }

    fn hide_loading(&mut self) {
        self.send(ChartCommand::HideLoading {
            column: self.column(),
        });
    }

    fn destroy(&mut self) {
        self.send(ChartCommand::Destroy {
            column: self.column(),
        });
    }
}
