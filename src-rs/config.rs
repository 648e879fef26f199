use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EditorError;
use crate::history::DEFAULT_HISTORY_DEPTH;
use crate::layers::HitOrder;

pub const HANDLE_SIZE: f64 = 8.0;
pub const MIN_SIZE: f64 = 10.0;
pub const ENDPOINT_RADIUS: f64 = 10.0;
pub const TEXT_BOX_WIDTH: f64 = 200.0;
pub const TEXT_BOX_HEIGHT: f64 = 50.0;
pub const DEFAULT_TEXT: &str = "Text";

/// Values the tool panel hands to newly created layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolSettings {
    pub blur_radius: f64,
    pub highlight_color: String,
    pub text_color: String,
    pub font_size: f64,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            blur_radius: 5.0,
            highlight_color: "#ff0000".to_string(),
            text_color: "#ff0000".to_string(),
            font_size: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
    pub handle_size: f64,
    pub min_size: f64,
    pub history_depth: usize,
    pub endpoint_radius: f64,
    pub text_box_width: f64,
    pub text_box_height: f64,
    pub default_text: String,
    pub hit_order: HitOrder,
    pub handle_color: String,
    pub crop_dim_color: String,
    pub crop_border_color: String,
    pub tools: ToolSettings,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            handle_size: HANDLE_SIZE,
            min_size: MIN_SIZE,
            history_depth: DEFAULT_HISTORY_DEPTH,
            endpoint_radius: ENDPOINT_RADIUS,
            text_box_width: TEXT_BOX_WIDTH,
            text_box_height: TEXT_BOX_HEIGHT,
            default_text: DEFAULT_TEXT.to_string(),
            hit_order: HitOrder::Insertion,
            handle_color: "#0096ff".to_string(),
            crop_dim_color: "rgba(0, 0, 0, 0.5)".to_string(),
            crop_border_color: "#ffffff".to_string(),
            tools: ToolSettings::default(),
        }
    }
}

impl EditorConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, EditorError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load(path: &Path) -> Result<Self, EditorError> {
        let raw = fs::read_to_string(path).map_err(|source| EditorError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = EditorConfig::from_json_str(
            r#"{"hit_order": "topmost", "tools": {"font_size": 32}}"#,
        )
        .unwrap();
        assert_eq!(cfg.hit_order, HitOrder::Topmost);
        assert_eq!(cfg.tools.font_size, 32.0);
        assert_eq!(cfg.tools.blur_radius, 5.0);
        assert_eq!(cfg.history_depth, 20);
        assert_eq!(cfg.min_size, 10.0);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = EditorConfig::from_json_str(r#"{"handle_sise": 4}"#).unwrap_err();
        assert!(matches!(err, EditorError::Config(_)));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = EditorConfig::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(err.to_string().contains("missing.json"));
    }
}
