//! Engine configuration.
//!
//! Every field has a default so a partial JSON document is enough to override
//! a single setting.

use crate::freehand::FreehandOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Highlighter-specific settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlighterOptions {
    /// Minimum effective size in screen pixels.
    pub min_size: f64,
    /// Strokes wider than this (canvas units) may be flattened.
    pub flatten_min_width: f64,
    /// Strokes with a vertical spread below this (canvas units) may be flattened.
    pub flatten_max_spread: f64,
}

impl Default for HighlighterOptions {
    fn default() -> Self {
        Self {
            min_size: 12.0,
            flatten_min_width: 20.0,
            flatten_max_spread: 15.0,
        }
    }
}

/// Tunables for the canvas engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Eraser radius in screen pixels.
    pub eraser_radius: f64,
    /// Minimum selection width and height in canvas units.
    pub selection_min_size: f64,
    /// Distance kept between the selection menu and the viewport edges.
    pub menu_padding: f64,
    /// Vertical gap between the selection anchor and the menu.
    pub menu_gap: f64,
    /// How long a laser point survives.
    pub laser_lifetime_ms: u64,
    /// Interval of the laser decay tick.
    pub laser_tick_ms: u64,
    /// Zoom factor applied per wheel notch.
    pub wheel_zoom_step: f64,
    pub freehand: FreehandOptions,
    pub highlighter: HighlighterOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            eraser_radius: 20.0,
            selection_min_size: 10.0,
            menu_padding: 20.0,
            menu_gap: 8.0,
            laser_lifetime_ms: 700,
            laser_tick_ms: 30,
            wheel_zoom_step: 1.1,
            freehand: FreehandOptions::default(),
            highlighter: HighlighterOptions::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_json_str(&json)?;
        log::debug!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    /// Check that every setting is usable.
    pub fn validate(&self) -> ConfigResult<()> {
        positive("eraser_radius", self.eraser_radius)?;
        positive("selection_min_size", self.selection_min_size)?;
        non_negative("menu_padding", self.menu_padding)?;
        non_negative("menu_gap", self.menu_gap)?;
        if self.laser_lifetime_ms == 0 {
            return Err(invalid("laser_lifetime_ms", "must be greater than zero"));
        }
        if self.laser_tick_ms == 0 {
            return Err(invalid("laser_tick_ms", "must be greater than zero"));
        }
        if !(self.wheel_zoom_step.is_finite() && self.wheel_zoom_step > 1.0) {
            return Err(invalid("wheel_zoom_step", "must be greater than 1"));
        }
        unit_interval("freehand.smoothing", self.freehand.smoothing)?;
        unit_interval("freehand.streamline", self.freehand.streamline)?;
        if !(-1.0..=1.0).contains(&self.freehand.thinning) {
            return Err(invalid("freehand.thinning", "must be within [-1, 1]"));
        }
        positive("highlighter.min_size", self.highlighter.min_size)?;
        non_negative("highlighter.flatten_min_width", self.highlighter.flatten_min_width)?;
        non_negative("highlighter.flatten_max_spread", self.highlighter.flatten_max_spread)?;
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

fn positive(field: &'static str, value: f64) -> ConfigResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, "must be a positive number"))
    }
}

fn non_negative(field: &'static str, value: f64) -> ConfigResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, "must not be negative"))
    }
}

fn unit_interval(field: &'static str, value: f64) -> ConfigResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, "must be within [0, 1]"))
    }
}
