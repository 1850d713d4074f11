// Sensor domain models
use serde::{Deserialize, Serialize};

/// A sensor descriptor as listed by the data API (`?sensors`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub column_name: String,
    pub name: String,
    #[serde(default)]
    pub view_order: i32,
}

impl Sensor {
    pub fn new(column_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            column_name: column_name.into(),
            name: name.into(),
            view_order: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisScale {
    #[default]
    Linear,
    Logarithmic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BandLevel {
    Warning,
    Error,
}

/// Shaded region of the value axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub from: f64,
    pub to: f64,
    pub level: BandLevel,
}

/// Fully resolved presentation metadata for one sensor column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorStyle {
    pub unit: String,
    pub scale: AxisScale,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub bands: Vec<Band>,
    pub color: String,
}

impl SensorStyle {
    pub fn format_reading(&self, value: f64) -> String {
        format_reading(value, &self.unit)
    }
}

/// Small readings (below 0.01, e.g. millikelvin or mbar) switch to
/// exponential notation.
pub fn format_reading(value: f64, unit: &str) -> String {
    let number = if value < 0.01 {
        format!("{:.3e}", value)
    } else {
        format!("{:.3}", value)
    };
    if unit.is_empty() {
        number
    } else {
        format!("{} {}", number, unit)
    }
}
