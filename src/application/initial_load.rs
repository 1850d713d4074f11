// Join between the bulk backfill request and chart mounts
use crate::domain::telemetry::{BulkData, Sample};
use std::collections::HashSet;

/// Charts can mount before or after the bulk data arrives. Data that arrives
/// first is held here until every sensor's chart has taken its slice.
#[derive(Debug, Default)]
pub struct InitialLoadJoin {
    buffer: Option<BulkData>,
    expected: Option<HashSet<String>>,
    consumed: HashSet<String>,
    arrived: bool,
}

impl InitialLoadJoin {
    pub fn new() -> Self {
        Self::default()
    }

    /// The sensor list is known; the buffer can go once all of these consumed.
    pub fn set_sensors<I>(&mut self, columns: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.expected = Some(columns.into_iter().collect());
        self.discard_if_done();
    }

    /// Bulk data arrived. Returns the slices of the charts already mounted.
    pub fn on_data(&mut self, mut data: BulkData, mounted: &[String]) -> Vec<(String, Vec<Sample>)> {
        self.arrived = true;
        let ready = mounted
            .iter()
            .filter_map(|column| {
                self.take(&mut data, column)
                    .map(|series| (column.clone(), series))
            })
            .collect();

        self.buffer = Some(data);
        self.discard_if_done();
        if self.buffer.is_some() {
            tracing::debug!(
                "Keeping initial data for {} charts still to mount",
                self.buffer.as_ref().map(|b| b.columns.len()).unwrap_or(0)
            );
        }
        ready
    }

    /// A chart mounted. Returns its slice if the data is already here.
    pub fn on_mount(&mut self, column: &str) -> Option<Vec<Sample>> {
        let mut data = self.buffer.take()?;
        let series = self.take(&mut data, column);
        self.buffer = Some(data);
        self.discard_if_done();
        series
    }

    pub fn is_buffering(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn has_arrived(&self) -> bool {
        self.arrived
    }

    fn take(&mut self, data: &mut BulkData, column: &str) -> Option<Vec<Sample>> {
        if !self.consumed.insert(column.to_string()) {
            return None;
        }
        Some(data.take_series(column).unwrap_or_else(|| {
            tracing::warn!("Initial data has no column {}", column);
            Vec::new()
        }))
    }

    fn discard_if_done(&mut self) {
        let Some(expected) = &self.expected else {
            return;
        };
        if self.buffer.is_some() && expected.iter().all(|c| self.consumed.contains(c)) {
            tracing::debug!("All charts loaded, dropping initial data");
            self.buffer = None;
        }
    }
}
