use directories::ProjectDirs;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::LibraryError;
use crate::geometry::Orientation;

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
#[serde(default)]
pub struct CanvasConfig {
    pub orientation: Orientation,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(default)]
pub struct ManipulationConfig {
    /// Distance of the rotation handle below the bottom edge, in viewport px.
    pub rotation_handle_offset_px: f64,
    /// Pick radius for corner and rotation handles, in viewport px.
    pub handle_radius_px: f64,
    /// Smallest on-screen half extent a resize may produce.
    pub min_handle_px: f64,
    /// Smallest half extent as a fraction of the canvas' shorter side.
    pub min_size_fraction: f64,
    /// Window (seconds) around the playhead in which an existing keyframe is
    /// reused instead of creating a new one.
    pub keyframe_tolerance: f64,
}

impl Default for ManipulationConfig {
    fn default() -> Self {
        Self {
            rotation_handle_offset_px: 30.0,
            handle_radius_px: 10.0,
            min_handle_px: 4.0,
            min_size_fraction: 0.02,
            keyframe_tolerance: 0.02,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(default)]
pub struct TimelineConfig {
    /// Horizontal scale at timeline zoom 1.0.
    pub pixels_per_second: f64,
    /// Overlaps shorter than this many on-screen pixels are resolved by
    /// snapping.
    pub snap_threshold_px: f64,
    pub min_duration: f64,
    pub row_height: f64,
    pub track_spacing: f64,
    /// Band around a row boundary that counts as "between layers".
    pub between_zone_px: f64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            pixels_per_second: 50.0,
            snap_threshold_px: 50.0,
            min_duration: 0.1,
            row_height: 40.0,
            track_spacing: 2.0,
            between_zone_px: 6.0,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
#[serde(default)]
pub struct EditorConfig {
    pub canvas: CanvasConfig,
    pub manipulation: ManipulationConfig,
    pub timeline: TimelineConfig,
}

impl EditorConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, LibraryError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, LibraryError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Loads the user's config file, falling back to defaults when it is
    /// missing or unreadable.
    pub fn load() -> Self {
        if let Some(path) = config_path() {
            if path.exists() {
                match Self::from_path(&path) {
                    Ok(config) => {
                        info!("Loaded editor config from {}", path.display());
                        return config;
                    }
                    Err(e) => warn!("Failed to load config file, using defaults: {}", e),
                }
            }
        }
        Self::default()
    }

    pub fn save(&self) {
        let Some(path) = config_path() else {
            return;
        };
        match toml::to_string_pretty(self) {
            Ok(text) => {
                if let Err(e) = fs::write(&path, text) {
                    error!("Failed to write config file: {}", e);
                } else {
                    info!("Editor config saved to {}", path.display());
                }
            }
            Err(e) => error!("Failed to serialize config: {}", e),
        }
    }
}

fn config_path() -> Option<PathBuf> {
    let dirs = ProjectDirs::from("me", "comic", "comic_editor")?;
    let config_dir = dirs.config_dir();
    if !config_dir.exists() {
        if let Err(e) = fs::create_dir_all(config_dir) {
            error!("Failed to create config directory: {}", e);
            return None;
        }
    }
    Some(config_dir.join("editor.toml"))
}
