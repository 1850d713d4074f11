// Sensor style registry - Immutable per-column presentation table
use crate::domain::sensor::SensorStyle;
use crate::infrastructure::config::{StyleOverride, StylesConfig, ThemeConfig};
use std::collections::HashMap;

/// Built once from configuration and shared by every view.
#[derive(Debug, Clone, Default)]
pub struct StyleRegistry {
    theme: ThemeConfig,
    default: StyleOverride,
    sensors: HashMap<String, StyleOverride>,
}

impl StyleOverride {
    /// Field-by-field merge; fields set on `self` win.
    fn merged_over(&self, base: &StyleOverride) -> StyleOverride {
        StyleOverride {
            unit: self.unit.clone().or_else(|| base.unit.clone()),
            scale: self.scale.or(base.scale),
            min: self.min.or(base.min),
            max: self.max.or(base.max),
            bands: self.bands.clone().or_else(|| base.bands.clone()),
            color_class: self.color_class.clone().or_else(|| base.color_class.clone()),
        }
    }
}

impl StyleRegistry {
    pub fn new(config: &StylesConfig) -> Self {
        Self {
            theme: config.theme.clone(),
            default: config.default.clone(),
            sensors: config.sensors.clone(),
        }
    }

    pub fn resolve(&self, column: &str) -> SensorStyle {
        let merged = match self.sensors.get(column) {
            Some(custom) => custom.merged_over(&self.default),
            None => self.default.clone(),
        };

        SensorStyle {
            unit: merged.unit.unwrap_or_default(),
            scale: merged.scale.unwrap_or_default(),
            min: merged.min,
            max: merged.max,
            bands: merged.bands.unwrap_or_default(),
            color: merged
                .color_class
                .as_deref()
                .map(|class| self.color(class))
                .unwrap_or_else(|| self.theme.fallback.clone()),
        }
    }

    /// Resolve a colour class through the theme table.
    pub fn color(&self, class: &str) -> String {
        match self.theme.colors.get(class) {
            Some(color) => color.clone(),
            None => {
                tracing::warn!("Unknown colour class {}, using fallback", class);
                self.theme.fallback.clone()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sensor::{AxisScale, Band, BandLevel};

    fn registry() -> StyleRegistry {
        let mut config = StylesConfig::default();
        config
            .theme
            .colors
            .insert("txt-color-blue".into(), "#57889c".into());
        config
            .theme
            .colors
            .insert("txt-color-red".into(), "#a90329".into());
        config.default = StyleOverride {
            unit: Some("K".into()),
            scale: Some(AxisScale::Logarithmic),
            color_class: Some("txt-color-blue".into()),
            ..Default::default()
        };
        config.sensors.insert(
            "p1".into(),
            StyleOverride {
                unit: Some("mbar".into()),
                max: Some(1000.0),
                bands: Some(vec![Band {
                    from: 1.0,
                    to: 1000.0,
                    level: BandLevel::Warning,
                }]),
                color_class: Some("txt-color-red".into()),
                ..Default::default()
            },
        );
        config.sensors.insert(
            "flow".into(),
            StyleOverride {
                color_class: Some("txt-color-purple".into()),
                scale: Some(AxisScale::Linear),
                ..Default::default()
            },
        );
        StyleRegistry::new(&config)
    }

    #[test]
    fn test_unknown_sensor_gets_default_style() {
        let style = registry().resolve("mc");
        assert_eq!(style.unit, "K");
        assert_eq!(style.scale, AxisScale::Logarithmic);
        assert_eq!(style.color, "#57889c");
        assert!(style.bands.is_empty());
    }

    #[test]
    fn test_override_merges_field_by_field() {
        let style = registry().resolve("p1");
        assert_eq!(style.unit, "mbar");
        assert_eq!(style.scale, AxisScale::Logarithmic);
        assert_eq!(style.max, Some(1000.0));
        assert_eq!(style.min, None);
        assert_eq!(style.bands.len(), 1);
        assert_eq!(style.color, "#a90329");
    }

    #[test]
    fn test_unknown_colour_class_falls_back() {
        let style = registry().resolve("flow");
        assert_eq!(style.scale, AxisScale::Linear);
        assert_eq!(style.unit, "K");
        assert_eq!(style.color, "#57889c");
    }
}
