// Chart domain models
use super::sensor::{Sensor, SensorStyle};
use serde::Serialize;

/// Synchronizer state of one chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartState {
    #[default]
    Idle,
    /// Extremes or data are being changed programmatically; echo events from
    /// this chart must not re-enter the synchronizer.
    LinkedUpdate,
    /// The chart is the source of the range change being propagated.
    UserZoom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeUnit {
    Minute,
    Hour,
    Day,
    Month,
    Year,
    All,
}

/// Quick-range button of the chart's range selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangeButton {
    #[serde(rename = "type")]
    pub unit: RangeUnit,
    pub count: Option<u32>,
    pub text: String,
}

impl RangeButton {
    fn new(unit: RangeUnit, count: Option<u32>, text: &str) -> Self {
        Self {
            unit,
            count,
            text: text.to_string(),
        }
    }

    pub fn live_defaults() -> Vec<RangeButton> {
        vec![
            Self::new(RangeUnit::Minute, Some(10), "10m"),
            Self::new(RangeUnit::Hour, Some(1), "1h"),
            Self::new(RangeUnit::Hour, Some(2), "2h"),
            Self::new(RangeUnit::Hour, Some(5), "5h"),
            Self::new(RangeUnit::Day, Some(1), "1d"),
            Self::new(RangeUnit::Day, Some(3), "3d"),
            Self::new(RangeUnit::All, None, "All"),
        ]
    }

    pub fn historic_defaults() -> Vec<RangeButton> {
        vec![
            Self::new(RangeUnit::Day, Some(1), "1d"),
            Self::new(RangeUnit::Day, Some(3), "3d"),
            Self::new(RangeUnit::Day, Some(7), "7d"),
            Self::new(RangeUnit::Month, Some(1), "1m"),
            Self::new(RangeUnit::Month, Some(3), "3m"),
            Self::new(RangeUnit::Year, Some(1), "1y"),
            Self::new(RangeUnit::All, None, "All"),
        ]
    }
}

/// Everything the charting collaborator needs to create one sensor chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartOptions {
    pub title: String,
    pub style: SensorStyle,
    pub series_type: String,
    pub range_buttons: Vec<RangeButton>,
    pub selected_button: usize,
    /// Historic charts keep the navigator on the aggregated series.
    pub navigator_follows_data: bool,
}

impl ChartOptions {
    pub fn for_sensor(sensor: &Sensor, style: SensorStyle, historic: bool) -> Self {
        let (range_buttons, selected_button) = if historic {
            (RangeButton::historic_defaults(), 6)
        } else {
            (RangeButton::live_defaults(), 1)
        };
        Self {
            title: sensor.name.clone(),
            style,
            series_type: "area".to_string(),
            range_buttons,
            selected_button,
            navigator_follows_data: !historic,
        }
    }
}
