// Dashboard service - Use case for building the fridge overview
use crate::application::data_source::SensorDataSource;
use crate::application::style_registry::StyleRegistry;
use crate::domain::dashboard::{FridgeSummary, Overview};
use crate::infrastructure::config::FridgeConfig;
use futures::future::join_all;
use std::sync::Arc;

#[derive(Clone)]
pub struct DashboardService {
    source: Arc<dyn SensorDataSource>,
    styles: Arc<StyleRegistry>,
    fridges: Vec<FridgeConfig>,
}

impl DashboardService {
    pub fn new(
        source: Arc<dyn SensorDataSource>,
        styles: Arc<StyleRegistry>,
        fridges: Vec<FridgeConfig>,
    ) -> Self {
        Self {
            source,
            styles,
            fridges,
        }
    }

    /// Sparklines of every configured fridge, fetched concurrently.
    pub async fn overview(&self) -> Overview {
        let summaries = join_all(self.fridges.iter().map(|fridge| self.summarize(fridge))).await;
        Overview::new(summaries)
    }

    async fn summarize(&self, fridge: &FridgeConfig) -> FridgeSummary {
        let points = match self.source.summary(&fridge.fridge).await {
            Ok(points) => points
                .into_iter()
                .map(|p| p.map(|v| v * fridge.multiplier))
                .collect(),
            Err(e) => {
                tracing::error!("Error fetching summary for {}: {:#}", fridge.fridge, e);
                Vec::new()
            }
        };

        FridgeSummary::new(
            fridge.name.clone(),
            fridge.fridge.clone(),
            self.styles.color(&fridge.color_class),
            points,
        )
    }
}
