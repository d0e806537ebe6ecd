use serde::{Deserialize, Serialize};

/// Default location of the layer configuration document.
pub const DEFAULT_LAYER_CONFIG_URL: &str = "resources/data/layers/default.json";

/// Top-level layer configuration document: `{ "layers": [ ... ] }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerConfigDocument {
    pub layers: Vec<LayerConfigEntry>,
}

/// Declarative description of one layer.
///
/// Only the fields the loader and factory inspect are typed; everything else
/// is preserved in `extra` and handed to the layer factory untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerConfigEntry {
    pub layer_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default = "default_visibility")]
    pub visibility: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_visibility() -> bool {
    true
}

impl LayerConfigEntry {
    pub fn new(layer_type: impl Into<String>) -> Self {
        Self {
            layer_type: layer_type.into(),
            layer_key: None,
            text: None,
            url: None,
            visibility: true,
            disabled: false,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.layer_key = Some(key.into());
        self
    }

    /// Human-readable label for logs: key, then title, then type.
    pub fn label(&self) -> &str {
        self.layer_key
            .as_deref()
            .or(self.text.as_deref())
            .unwrap_or(&self.layer_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerConfigError {
    Json(String),
}

impl std::fmt::Display for LayerConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerConfigError::Json(msg) => write!(f, "malformed layer configuration: {msg}"),
        }
    }
}

impl std::error::Error for LayerConfigError {}

impl LayerConfigDocument {
    /// Parse the whole document up front; a corrupt document yields no
    /// entries at all rather than a partial list.
    pub fn from_json_str(s: &str) -> Result<Self, LayerConfigError> {
        serde_json::from_str(s).map_err(|e| LayerConfigError::Json(e.to_string()))
    }
}
