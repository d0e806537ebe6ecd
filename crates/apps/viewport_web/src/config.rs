use formats::DEFAULT_LAYER_CONFIG_URL;
use foundation::{Coordinate, Millis, ViewportState};
use serde::{Deserialize, Serialize};

/// Map view settings. Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MapViewConfig {
    pub enable_map_click: bool,
    /// Gates hover-rest, hover-rest-end and pointer-move together.
    pub enable_map_hover: bool,
    pub enable_permalink: bool,
    pub round_permalink_coords: bool,
    pub layer_config_url: String,
    pub layer_config_timeout_ms: u64,
    /// Total fetch attempts; `0` behaves like `1`.
    pub layer_config_attempts: u32,
    pub pointer_rest_interval_ms: u64,
    pub initial_view: ViewportState,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for MapViewConfig {
    fn default() -> Self {
        Self {
            enable_map_click: true,
            enable_map_hover: true,
            enable_permalink: true,
            round_permalink_coords: true,
            layer_config_url: DEFAULT_LAYER_CONFIG_URL.to_string(),
            layer_config_timeout_ms: 10_000,
            layer_config_attempts: 1,
            pointer_rest_interval_ms: 500,
            initial_view: ViewportState::new(Coordinate::from_lon_lat(-8.0, 53.5), 8.0, 0.0),
            min_zoom: 0.0,
            max_zoom: 28.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Json(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Json(msg) => write!(f, "map config is not valid JSON: {msg}"),
            ConfigError::Invalid(msg) => write!(f, "map config rejected: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl MapViewConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let trimmed = s.trim();
        let config: Self = if trimmed.is_empty() {
            Self::default()
        } else {
            serde_json::from_str(trimmed).map_err(|e| ConfigError::Json(e.to_string()))?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.initial_view.is_finite() {
            return Err(ConfigError::Invalid("initialView must be finite".to_string()));
        }
        if !(self.min_zoom.is_finite() && self.max_zoom.is_finite()) || self.min_zoom > self.max_zoom {
            return Err(ConfigError::Invalid(format!(
                "zoom range {}..{} is empty",
                self.min_zoom, self.max_zoom
            )));
        }
        Ok(())
    }

    pub fn layer_config_timeout(&self) -> Millis {
        Millis(self.layer_config_timeout_ms)
    }

    pub fn pointer_rest_interval(&self) -> Millis {
        Millis(self.pointer_rest_interval_ms)
    }

    pub fn layer_config_attempts(&self) -> u32 {
        self.layer_config_attempts.max(1)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{ConfigError, MapViewConfig};

    #[test]
    fn empty_object_is_all_defaults() {
        let c = MapViewConfig::from_json_str("{}").expect("config");
        assert_eq!(c, MapViewConfig::default());
        assert!(c.enable_map_click && c.enable_map_hover && c.enable_permalink);
        assert!(c.round_permalink_coords);
        assert_eq!(c.initial_view.zoom, 8.0);
        assert_eq!(c.layer_config_url, "resources/data/layers/default.json");
    }

    #[test]
    fn camel_case_flags_and_unknown_fields() {
        let c = MapViewConfig::from_json_str(
            r#"{"enableMapHover": false, "roundPermalinkCoords": false, "addScaleBarToMap": true}"#,
        )
        .expect("config");
        assert!(!c.enable_map_hover);
        assert!(!c.round_permalink_coords);
        assert!(c.enable_map_click);
    }

    #[test]
    fn zero_attempts_means_one() {
        let c = MapViewConfig::from_json_str(r#"{"layerConfigAttempts": 0}"#).expect("config");
        assert_eq!(c.layer_config_attempts(), 1);
    }

    #[test]
    fn rejects_inverted_zoom_range() {
        let err = MapViewConfig::from_json_str(r#"{"minZoom": 9, "maxZoom": 3}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_bad_json() {
        assert!(matches!(
            MapViewConfig::from_json_str("{"),
            Err(ConfigError::Json(_))
        ));
    }
}
