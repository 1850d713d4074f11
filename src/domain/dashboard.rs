// Dashboard overview domain model
use serde::Serialize;

/// Sparkline summary of one fridge for the overview page.
#[derive(Debug, Clone, Serialize)]
pub struct FridgeSummary {
    pub name: String,
    pub fridge: String,
    pub color: String,
    pub points: Vec<Option<f64>>,
}

impl FridgeSummary {
    pub fn new(name: String, fridge: String, color: String, points: Vec<Option<f64>>) -> Self {
        Self {
            name,
            fridge,
            color,
            points,
        }
    }

    /// Latest non-gap reading.
    pub fn latest(&self) -> Option<f64> {
        self.points.iter().rev().find_map(|p| *p)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub fridges: Vec<FridgeSummary>,
}

impl Overview {
    pub fn new(fridges: Vec<FridgeSummary>) -> Self {
        Self { fridges }
    }
}
