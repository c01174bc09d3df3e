/// Showcase configuration parsed from a JSON file.
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

pub const CONFIG_ENV_VAR: &str = "SHOWCASE_CONFIG";
pub const DEFAULT_HOME_SCREEN: &str = "home";
pub const DEFAULT_APP_TITLE: &str = "Showcase";
pub const DEFAULT_MODEL_ASSET: &str = "model.stl";

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        // 7" kiosk panel
        Self { width: 1024, height: 600 }
    }
}

/// Mesh viewer tuning. Angles are radians.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub default_angle_x: f32,
    pub default_angle_y: f32,
    pub default_zoom: f32,
    pub drag_sensitivity: f32,
    pub rotate_step: f32,
    pub zoom_step: f32,
    pub hold_repeat_ms: u64,
    pub auto_rotate_speed: f32,
    /// Share of the shorter viewport side the model's larger extent maps to
    pub fit_fraction: f32,
    /// Applied after the fit so models keep a margin
    pub fit_damping: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            default_angle_x: -0.5,
            default_angle_y: 0.6,
            default_zoom: 8.0,
            drag_sensitivity: 0.01,
            rotate_step: 0.1,
            zoom_step: 1.1,
            hold_repeat_ms: 100,
            auto_rotate_speed: 0.01,
            fit_fraction: 0.7,
            fit_damping: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ShowcaseConfig {
    pub app_title: String,
    pub home_screen: String,
    pub screens_dir: Option<PathBuf>,
    pub assets_dir: PathBuf,
    pub model_asset: String,
    pub viewport: Viewport,
    pub log_file: Option<PathBuf>,
    pub viewer: ViewerConfig,
}

impl Default for ShowcaseConfig {
    fn default() -> Self {
        Self {
            app_title: DEFAULT_APP_TITLE.to_string(),
            home_screen: DEFAULT_HOME_SCREEN.to_string(),
            screens_dir: None,
            assets_dir: PathBuf::from("assets"),
            model_asset: DEFAULT_MODEL_ASSET.to_string(),
            viewport: Viewport::default(),
            log_file: None,
            viewer: ViewerConfig::default(),
        }
    }
}

impl ShowcaseConfig {
    /// Load config from a JSON file. Missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Load from the file named by `SHOWCASE_CONFIG`, or defaults when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path.trim()),
            _ => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = ShowcaseConfig::from_json("{}").unwrap();
        assert_eq!(config, ShowcaseConfig::default());
        assert_eq!(config.home_screen, "home");
        assert_eq!(config.viewer.hold_repeat_ms, 100);
    }

    #[test]
    fn test_partial_viewer_override() {
        let config = ShowcaseConfig::from_json(
            r#"{"model_asset": "IM0004.STL", "viewer": {"zoom_step": 1.25}, "viewport": {"width": 800}}"#,
        )
        .unwrap();
        assert_eq!(config.model_asset, "IM0004.STL");
        assert_eq!(config.viewer.zoom_step, 1.25);
        assert_eq!(config.viewer.rotate_step, 0.1);
        assert_eq!(config.viewport, Viewport { width: 800, height: 600 });
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"app_title": "Kiosk", "log_file": "/tmp/kiosk.log"}}"#).unwrap();
        let config = ShowcaseConfig::from_file(file.path()).unwrap();
        assert_eq!(config.app_title, "Kiosk");
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/kiosk.log")));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            ShowcaseConfig::from_file("/definitely/not/here.json"),
            Err(ConfigError::Read { .. })
        ));
        assert!(matches!(ShowcaseConfig::from_json("{"), Err(ConfigError::Parse(_))));
    }
}
