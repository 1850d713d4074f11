use crate::application::chart_registry::{RefetchScope, SyncSettings};
use crate::application::data_source::AvgPeriod;
use crate::domain::sensor::{AxisScale, Band};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    pub server: ServerSettings,
    pub data_api: DataApiSettings,
    #[serde(default)]
    pub view: ViewConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub listen: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataApiSettings {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ViewConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Samples requested for the live backfill
    #[serde(default = "default_point_count")]
    pub point_count: usize,
    #[serde(default)]
    pub historic_avg_period: AvgPeriod,
    /// Historic zooms at or below this span fetch fine-resolution data
    #[serde(default = "default_detail_threshold_secs")]
    pub detail_threshold_secs: u64,
    #[serde(default = "default_detail_tolerance_ms")]
    pub detail_tolerance_ms: u64,
    #[serde(default)]
    pub refetch_scope: RefetchScope,
    /// Chart commands queued per view before new ones are dropped
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,
    /// Views whose event stream is not opened within this time are closed
    #[serde(default = "default_attach_timeout_secs")]
    pub attach_timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_point_count() -> usize {
    2000
}

fn default_detail_threshold_secs() -> u64 {
    5 * 24 * 60 * 60
}

fn default_detail_tolerance_ms() -> u64 {
    1000
}

fn default_command_buffer() -> usize {
    1024
}

fn default_attach_timeout_secs() -> u64 {
    60
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            point_count: default_point_count(),
            historic_avg_period: AvgPeriod::default(),
            detail_threshold_secs: default_detail_threshold_secs(),
            detail_tolerance_ms: default_detail_tolerance_ms(),
            refetch_scope: RefetchScope::default(),
            command_buffer: default_command_buffer(),
            attach_timeout_secs: default_attach_timeout_secs(),
        }
    }
}

impl ViewConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn attach_timeout(&self) -> Duration {
        Duration::from_secs(self.attach_timeout_secs.max(1))
    }

    pub fn sync_settings(&self, historic: bool) -> SyncSettings {
        SyncSettings {
            historic,
            detail_threshold_ms: self
                .detail_threshold_secs
                .saturating_mul(1000)
                .saturating_add(self.detail_tolerance_ms) as f64,
            scope: self.refetch_scope,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StylesConfig {
    #[serde(default)]
    pub theme: ThemeConfig,
    #[serde(default)]
    pub default: StyleOverride,
    #[serde(default)]
    pub sensors: HashMap<String, StyleOverride>,
    #[serde(default)]
    pub fridges: Vec<FridgeConfig>,
}

/// Colour class name to colour string.
#[derive(Debug, Deserialize, Clone)]
pub struct ThemeConfig {
    #[serde(default = "default_fallback_color")]
    pub fallback: String,
    #[serde(default)]
    pub colors: HashMap<String, String>,
}

fn default_fallback_color() -> String {
    "#57889c".to_string()
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            fallback: default_fallback_color(),
            colors: HashMap::new(),
        }
    }
}

/// Partial sensor style; unset fields fall back to the default style.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct StyleOverride {
    pub unit: Option<String>,
    pub scale: Option<AxisScale>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub bands: Option<Vec<Band>>,
    pub color_class: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FridgeConfig {
    pub name: String,
    pub fridge: String,
    pub color_class: String,
    /// Scale applied to summary readings, e.g. 1000 to show mK
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_multiplier() -> f64 {
    1.0
}

pub fn load_dashboard_config() -> anyhow::Result<DashboardConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/dashboard"))
        .add_source(config::Environment::with_prefix("DASHBOARD").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

pub fn load_styles_config() -> anyhow::Result<StylesConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/styles").required(false))
        .build()?;

    Ok(settings.try_deserialize()?)
}
