// Fridge domain model
use serde::{Deserialize, Serialize};

/// Which data set of a fridge a view is bound to: the fridge itself or one of
/// its supplementary instruments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FridgeRef {
    pub fridge: String,
    #[serde(default)]
    pub supp: Option<String>,
}

impl FridgeRef {
    pub fn new(fridge: impl Into<String>, supp: Option<String>) -> Self {
        Self {
            fridge: fridge.into(),
            supp,
        }
    }

    /// Convert "Blue_Fridge" to "Blue Fridge"
    pub fn title(&self) -> String {
        self.fridge.replace('_', " ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Rolling window of the most recent raw samples, polled.
    Live,
    /// Aggregated data with fine-resolution refetch on narrow zooms.
    Historic,
}

impl ViewMode {
    pub fn from_historic(historic: bool) -> Self {
        if historic {
            ViewMode::Historic
        } else {
            ViewMode::Live
        }
    }

    pub fn is_historic(self) -> bool {
        self == ViewMode::Historic
    }
}
