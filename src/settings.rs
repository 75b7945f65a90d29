use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::render::{Background, BackgroundMode, PathStyle};
use crate::TracerApp;

/// Returns the path to the settings file: `~/.config/path-trace/settings.json`
fn settings_path() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("path-trace");
    path.push("settings.json");
    path
}

/// Persisted application settings.
///
/// Serialized as JSON to the platform config directory.
/// Fields use `#[serde(default)]` so that adding new settings
/// won't break existing config files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    // Path style
    pub path_color: [u8; 3],
    pub thickness: u32,
    pub show_dots: bool,

    // Sampling and playback
    pub sample_rate_hz: u32,
    pub speed: f32,

    // Background
    pub background_mode: BackgroundMode,
    pub background_color: [u8; 3],
    pub background_image: Option<PathBuf>,

    // Display
    pub monitor_index: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        let style = PathStyle::default();
        let background = Background::default();
        Self {
            path_color: style.color,
            thickness: style.thickness,
            show_dots: style.show_dots,

            sample_rate_hz: style.sample_rate_hz,
            speed: style.speed,

            background_mode: background.mode,
            background_color: background.color,
            background_image: background.image_path,

            monitor_index: 0,
        }
    }
}

impl AppSettings {
    /// Load settings from disk, falling back to defaults on any error.
    pub fn load() -> Self {
        Self::load_from(&settings_path())
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<Self>(&contents) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    settings.sanitized()
                }
                Err(e) => {
                    log::warn!("Failed to parse settings ({}), using defaults", e);
                    Self::default()
                }
            },
            Err(e) => {
                log::info!("No settings file found ({}), using defaults", e);
                Self::default()
            }
        }
    }

    /// Save settings to disk as pretty JSON.
    pub fn save(&self) {
        self.save_to(&settings_path());
    }

    pub fn save_to(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::warn!("Failed to create config directory: {}", e);
                return;
            }
        }
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = std::fs::write(path, json) {
                    log::warn!("Failed to write settings: {}", e);
                } else {
                    log::info!("Saved settings to {}", path.display());
                }
            }
            Err(e) => {
                log::warn!("Failed to serialize settings: {}", e);
            }
        }
    }

    /// Clamp values from a hand-edited or older file into range
    fn sanitized(self) -> Self {
        let style = self.style().sanitized();
        Self {
            path_color: style.color,
            thickness: style.thickness,
            show_dots: style.show_dots,
            sample_rate_hz: style.sample_rate_hz,
            speed: style.speed,
            ..self
        }
    }

    pub fn style(&self) -> PathStyle {
        PathStyle {
            color: self.path_color,
            thickness: self.thickness,
            show_dots: self.show_dots,
            sample_rate_hz: self.sample_rate_hz,
            speed: self.speed,
        }
    }

    pub fn background(&self) -> Background {
        Background {
            mode: self.background_mode,
            color: self.background_color,
            image_path: self.background_image.clone(),
        }
    }

    /// Extract current settings from the running application.
    pub fn from_app(app: &TracerApp) -> Self {
        Self {
            path_color: app.style.color,
            thickness: app.style.thickness,
            show_dots: app.style.show_dots,

            sample_rate_hz: app.style.sample_rate_hz,
            speed: app.style.speed,

            background_mode: app.background.mode,
            background_color: app.background.color,
            background_image: app.background.image_path.clone(),

            monitor_index: app.selected_monitor,
        }
    }

    /// Apply loaded settings to the running application.
    pub fn apply(&self, app: &mut TracerApp) {
        app.style = self.style();
        app.background = self.background();
        app.selected_monitor = if self.monitor_index < app.monitors.len() {
            self.monitor_index
        } else {
            0
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_settings(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("path-trace-settings-{}-{}", std::process::id(), name))
            .join("settings.json")
    }

    #[test]
    fn test_round_trip() {
        let path = temp_settings("round-trip");
        let settings = AppSettings {
            path_color: [1, 2, 3],
            thickness: 12,
            show_dots: false,
            sample_rate_hz: 60,
            speed: 2.5,
            background_mode: BackgroundMode::Image,
            background_color: [4, 5, 6],
            background_image: Some(PathBuf::from("/tmp/bg.png")),
            monitor_index: 1,
        };

        settings.save_to(&path);
        let loaded = AppSettings::load_from(&path);
        std::fs::remove_dir_all(path.parent().unwrap()).ok();

        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let loaded: AppSettings = serde_json::from_str(r#"{ "thickness": 9 }"#).unwrap();

        assert_eq!(loaded.thickness, 9);
        assert_eq!(loaded.sample_rate_hz, AppSettings::default().sample_rate_hz);
        assert_eq!(loaded.background_mode, BackgroundMode::Color);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let path = temp_settings("clamp");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{ "thickness": 500, "sample_rate_hz": 0, "speed": 99.0 }"#).unwrap();

        let loaded = AppSettings::load_from(&path);
        std::fs::remove_dir_all(path.parent().unwrap()).ok();

        assert_eq!(loaded.thickness, 30);
        assert_eq!(loaded.sample_rate_hz, 1);
        assert_eq!(loaded.speed, 10.0);
    }

    #[test]
    fn test_corrupt_file_falls_back() {
        let path = temp_settings("corrupt");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        let loaded = AppSettings::load_from(&path);
        std::fs::remove_dir_all(path.parent().unwrap()).ok();

        assert_eq!(loaded, AppSettings::default());
    }
}
