use crate::error::{PermalinkError, PermalinkResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_version() -> String {
    "1.0".to_string()
}

const fn default_opacity() -> f64 {
    1.0
}

/// Visibility and styling of one layer inside a theme snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerState {
    pub name: String,
    pub visible: bool,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_style: Option<String>,
}

/// Full layer-state snapshot carried in the `theme` parameter as JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeState {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_theme: Option<String>,
    #[serde(default)]
    pub layer_states: BTreeMap<String, LayerState>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub available_themes: Vec<String>,
}

impl Default for ThemeState {
    fn default() -> Self {
        Self {
            version: default_version(),
            current_theme: None,
            layer_states: BTreeMap::new(),
            available_themes: vec![],
        }
    }
}

/// The optional theme/layer-visibility part of a view
#[derive(Debug, Clone, PartialEq)]
pub enum ThemeToken {
    /// Name of a map theme defined in the project
    Named(String),
    State(ThemeState),
}

impl ThemeToken {
    /// Reads an already percent-decoded `theme` value; empty means no theme.
    pub fn parse(value: &str) -> PermalinkResult<Option<Self>> {
        let value = value.trim();
        if value.is_empty() {
            return Ok(None);
        }
        if value.starts_with('{') {
            let state: ThemeState = serde_json::from_str(value)
                .map_err(|e| PermalinkError::InvalidTheme(e.to_string()))?;
            return Ok(Some(Self::State(state)));
        }
        Ok(Some(Self::Named(value.to_string())))
    }

    /// Value for the `theme` query parameter, before percent-encoding
    pub fn to_param(&self) -> String {
        match self {
            Self::Named(name) => name.clone(),
            // A struct of strings, bools, floats and string maps always serializes
            Self::State(state) => serde_json::to_string(state).unwrap_or_default(),
        }
    }

    /// The map theme the host should switch to, if the token names one
    pub fn theme_name(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name.as_str()),
            Self::State(state) => state.current_theme.as_deref(),
        }
    }
}
