// Port for the charting collaborator
use crate::domain::chart::ChartOptions;
use crate::domain::telemetry::{Sample, TimeRange};

/// One rendered chart. Calls are programmatic: implementations must not
/// report the resulting extremes change as a user zoom.
pub trait ChartWidget: Send {
    fn set_data(&mut self, series: &[Sample]);

    /// Append one point, dropping the oldest one when `shift` is set.
    fn add_point(&mut self, sample: Sample, shift: bool);

    fn set_extremes(&mut self, range: TimeRange);

    fn show_loading(&mut self, message: &str);

    fn hide_loading(&mut self);

    fn destroy(&mut self);
}

pub trait ChartSurface: Send + Sync {
    fn create_chart(&self, column: &str, options: &ChartOptions) -> Box<dyn ChartWidget>;
}

#[cfg(test)]
pub mod recording {
    //! Chart surface that records every call, for tests.
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Create,
        SetData(Vec<Sample>),
        AddPoint(Sample, bool),
        SetExtremes(TimeRange),
        ShowLoading,
        HideLoading,
        Destroy,
    }

    pub type CallLog = Arc<Mutex<Vec<(String, Call)>>>;

    #[derive(Clone, Default)]
    pub struct RecordingSurface {
        pub calls: CallLog,
    }

    impl RecordingSurface {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls_for(&self, column: &str) -> Vec<Call> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(c, _)| c == column)
                .map(|(_, call)| call.clone())
                .collect()
        }

        pub fn extremes_calls(&self) -> Vec<(String, TimeRange)> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter_map(|(c, call)| match call {
                    Call::SetExtremes(range) => Some((c.clone(), *range)),
                    _ => None,
                })
                .collect()
        }

        pub fn clear(&self) {
            self.calls.lock().unwrap().clear();
        }

        pub fn widget(&self, column: &str) -> Box<dyn ChartWidget> {
            Box::new(RecordingWidget {
                column: column.to_string(),
                calls: self.calls.clone(),
            })
        }
    }

    impl ChartSurface for RecordingSurface {
        fn create_chart(&self, column: &str, _options: &ChartOptions) -> Box<dyn ChartWidget> {
            self.calls
                .lock()
                .unwrap()
                .push((column.to_string(), Call::Create));
            self.widget(column)
        }
    }

    pub struct RecordingWidget {
        column: String,
        calls: CallLog,
    }

    impl RecordingWidget {
        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push((self.column.clone(), call));
        }
    }

    impl ChartWidget for RecordingWidget {
        fn set_data(&mut self, series: &[Sample]) {
            self.record(Call::SetData(series.to_vec()));
        }

        fn add_point(&mut self, sample: Sample, shift: bool) {
            self.record(Call::AddPoint(sample, shift));
        }

        fn set_extremes(&mut self, range: TimeRange) {
            self.record(Call::SetExtremes(range));
        }

        fn show_loading(&mut self, _message: &str) {
            self.record(Call::ShowLoading);
        }

        fn hide_loading(&mut self) {
            self.record(Call::HideLoading);
        }

        fn destroy(&mut self) {
            self.record(Call::Destroy);
        }
    }
}
